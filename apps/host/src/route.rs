use std::{fmt, str::FromStr};

use thiserror::Error;

/// Host navigation table. Each remote-backed page names the remote and the
/// export it mounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Home,
    Products,
    Cart,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown route '{0}'")]
pub struct UnknownRoute(pub String);

impl Route {
    pub fn path(self) -> &'static str {
        match self {
            Self::Home => "/",
            Self::Products => "/products",
            Self::Cart => "/cart",
        }
    }

    /// `(remote, export)` for remote-backed pages.
    pub fn target(self) -> Option<(&'static str, &'static str)> {
        match self {
            Self::Home => None,
            Self::Products => Some(("products", "./ProductsApp")),
            Self::Cart => Some(("cart", "./CartApp")),
        }
    }

    pub fn loading_label(self) -> Option<&'static str> {
        match self {
            Self::Home => None,
            Self::Products => Some("Loading Products..."),
            Self::Cart => Some("Loading Cart..."),
        }
    }
}

impl FromStr for Route {
    type Err = UnknownRoute;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim_end_matches('/') {
            "" => Ok(Self::Home),
            "/products" => Ok(Self::Products),
            "/cart" => Ok(Self::Cart),
            _ => Err(UnknownRoute(s.to_string())),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}
