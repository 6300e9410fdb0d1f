use std::{collections::BTreeMap, fs, io, path::Path};

use anyhow::{bail, Context};
use serde::Deserialize;
use shared::protocol::{ComponentKind, ExposedModule, RemoteEntry, SharedDependencySpec};

pub const DEFAULT_CONFIG_PATH: &str = "remote.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub bind_addr: String,
    pub name: String,
    pub exposes: BTreeMap<String, ExposedModule>,
    pub shared: Vec<SharedDependencySpec>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3001".into(),
            name: "products".into(),
            exposes: BTreeMap::from([(
                "./ProductsApp".to_string(),
                ExposedModule {
                    component: ComponentKind::Products,
                },
            )]),
            shared: Vec::new(),
        }
    }
}

impl Settings {
    pub fn remote_entry(&self) -> anyhow::Result<RemoteEntry> {
        if self.name.trim().is_empty() {
            bail!("remote name must not be empty");
        }
        if self.exposes.is_empty() {
            bail!("remote '{}' must expose at least one module", self.name);
        }
        Ok(RemoteEntry {
            name: self.name.clone(),
            exposes: self.exposes.clone(),
            shared: self.shared.clone(),
        })
    }
}

pub fn load_settings() -> anyhow::Result<Settings> {
    let path = std::env::var("REMOTE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
    load_settings_from(Path::new(&path), |key| std::env::var(key).ok())
}

/// Defaults, then the TOML file at `path` if present, then environment
/// overrides looked up through `env`.
pub fn load_settings_from(
    path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Settings> {
    let mut settings = match fs::read_to_string(path) {
        Ok(raw) => toml::from_str::<Settings>(&raw)
            .with_context(|| format!("failed to parse remote config '{}'", path.display()))?,
        Err(error) if error.kind() == io::ErrorKind::NotFound => Settings::default(),
        Err(error) => {
            return Err(error)
                .with_context(|| format!("failed to read remote config '{}'", path.display()))
        }
    };

    if let Some(v) = env("REMOTE_BIND") {
        settings.bind_addr = v;
    }
    if let Some(v) = env("APP__BIND_ADDR") {
        settings.bind_addr = v;
    }
    if let Some(v) = env("APP__REMOTE_NAME") {
        settings.name = v;
    }

    Ok(settings)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
