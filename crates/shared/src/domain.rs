use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub i64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A product selected into the cart.
///
/// Prices are whole currency units, matching the catalog the products remote
/// publishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: ItemId,
    pub name: String,
    pub price: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl CartItem {
    pub fn new(id: i64, name: impl Into<String>, price: u64) -> Self {
        Self {
            id: ItemId(id),
            name: name.into(),
            price,
            category: None,
            image: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }
}

/// Where a remote publishes its entry manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteDescriptor {
    pub name: String,
    pub remote_entry_url: Url,
}

impl RemoteDescriptor {
    pub fn new(name: impl Into<String>, remote_entry_url: Url) -> Self {
        Self {
            name: name.into(),
            remote_entry_url,
        }
    }
}

impl fmt::Display for RemoteDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.remote_entry_url)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorParseError {
    #[error("remote descriptor '{0}' must have the form name@url")]
    MissingSeparator(String),
    #[error("remote descriptor '{0}' has an empty name")]
    EmptyName(String),
    #[error("remote descriptor '{input}' has an invalid url: {reason}")]
    InvalidUrl { input: String, reason: String },
}

/// Parses the `name@url` form used in host configuration, e.g.
/// `cart@http://localhost:3002/remoteEntry.json`.
impl FromStr for RemoteDescriptor {
    type Err = DescriptorParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        let Some((name, url)) = raw.split_once('@') else {
            return Err(DescriptorParseError::MissingSeparator(raw.to_string()));
        };
        let name = name.trim();
        if name.is_empty() {
            return Err(DescriptorParseError::EmptyName(raw.to_string()));
        }
        let remote_entry_url =
            Url::parse(url.trim()).map_err(|e| DescriptorParseError::InvalidUrl {
                input: raw.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self::new(name, remote_entry_url))
    }
}
