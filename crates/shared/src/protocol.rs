use std::collections::BTreeMap;

use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};

/// Channel standalone remotes use to hand cart additions to each other.
pub const CART_ADD_CHANNEL: &str = "mfe:cart:add";

/// Path a remote server publishes its entry manifest under.
pub const REMOTE_ENTRY_PATH: &str = "/remoteEntry.json";

/// A shared library contribution, declared by the host or by a remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedDependencySpec {
    pub key: String,
    pub required_version: VersionReq,
    #[serde(default)]
    pub singleton: bool,
    #[serde(default)]
    pub eager: bool,
    /// Version of the copy bundled with the contributor. When absent the
    /// lowest version admitted by `required_version` is assumed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Version>,
}

impl SharedDependencySpec {
    pub fn new(key: impl Into<String>, required_version: VersionReq) -> Self {
        Self {
            key: key.into(),
            required_version,
            singleton: false,
            eager: false,
            version: None,
        }
    }

    pub fn singleton(mut self) -> Self {
        self.singleton = true;
        self
    }

    pub fn eager(mut self) -> Self {
        self.eager = true;
        self
    }

    pub fn with_version(mut self, version: Version) -> Self {
        self.version = Some(version);
        self
    }
}

/// Component implementations an exposed module can bind to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Cart,
    Products,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExposedModule {
    pub component: ComponentKind,
}

/// The container manifest a remote publishes at its entry url.
///
/// `exposes` backs the container's `get(export)` surface and `shared` backs
/// its `init(share_scope)` surface; both are required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntry {
    pub name: String,
    pub exposes: BTreeMap<String, ExposedModule>,
    pub shared: Vec<SharedDependencySpec>,
}
