use std::{fs, io, path::Path, time::Duration};

use anyhow::Context;
use semver::{Version, VersionReq};
use serde::Deserialize;
use shared::{domain::RemoteDescriptor, protocol::SharedDependencySpec};

pub const DEFAULT_CONFIG_PATH: &str = "host.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HostSettings {
    /// `name@url` pairs, one per remote.
    pub remotes: Vec<String>,
    pub shared: Vec<SharedDependencySpec>,
    pub fetch_timeout_secs: u64,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            remotes: vec![
                "products@http://localhost:3001/remoteEntry.json".into(),
                "cart@http://localhost:3002/remoteEntry.json".into(),
            ],
            shared: vec![
                host_singleton("react", "^18.2.0", Version::new(18, 2, 0)),
                host_singleton("react-dom", "^18.2.0", Version::new(18, 2, 0)),
            ],
            fetch_timeout_secs: 10,
        }
    }
}

fn host_singleton(key: &str, range: &str, version: Version) -> SharedDependencySpec {
    let required = VersionReq::parse(range).unwrap_or(VersionReq::STAR);
    SharedDependencySpec::new(key, required)
        .singleton()
        .eager()
        .with_version(version)
}

impl HostSettings {
    pub fn descriptors(&self) -> anyhow::Result<Vec<RemoteDescriptor>> {
        self.remotes
            .iter()
            .map(|raw| raw.parse::<RemoteDescriptor>().map_err(anyhow::Error::from))
            .collect()
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs.max(1))
    }
}

pub fn load_settings(path: Option<&Path>) -> anyhow::Result<HostSettings> {
    let fallback = std::env::var("HOST_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
    let path = path.unwrap_or_else(|| Path::new(&fallback));
    load_settings_from(path, |key| std::env::var(key).ok())
}

pub fn load_settings_from(
    path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<HostSettings> {
    let mut settings = match fs::read_to_string(path) {
        Ok(raw) => toml::from_str::<HostSettings>(&raw)
            .with_context(|| format!("failed to parse host config '{}'", path.display()))?,
        Err(error) if error.kind() == io::ErrorKind::NotFound => HostSettings::default(),
        Err(error) => {
            return Err(error)
                .with_context(|| format!("failed to read host config '{}'", path.display()))
        }
    };

    if let Some(v) = env("APP__REMOTES") {
        settings.remotes = v
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
    }
    if let Some(v) = env("APP__FETCH_TIMEOUT_SECS") {
        settings.fetch_timeout_secs = v
            .parse()
            .with_context(|| format!("APP__FETCH_TIMEOUT_SECS must be a number, got '{v}'"))?;
    }

    Ok(settings)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
