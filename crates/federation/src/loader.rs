use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use futures::{
    future::{BoxFuture, Shared},
    FutureExt,
};
use parking_lot::{Mutex, RwLock};
use reqwest::Client;
use shared::{
    domain::RemoteDescriptor,
    protocol::{ExposedModule, RemoteEntry},
};
use tokio::runtime::Handle;
use tracing::{debug, info, info_span, warn, Instrument};
use url::Url;

use crate::{
    error::FederationError,
    resolver::{DependencyRegistry, ShareReport},
};

/// Retrieves the raw remote entry body for a descriptor.
#[async_trait]
pub trait ManifestFetcher: Send + Sync {
    async fn fetch(&self, remote: &RemoteDescriptor) -> Result<String, FederationError>;
}

pub struct HttpManifestFetcher {
    client: Client,
}

impl HttpManifestFetcher {
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ManifestFetcher for HttpManifestFetcher {
    async fn fetch(&self, remote: &RemoteDescriptor) -> Result<String, FederationError> {
        let response = self
            .client
            .get(remote.remote_entry_url.clone())
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| FederationError::unavailable(&remote.name, e))?;
        response
            .text()
            .await
            .map_err(|e| FederationError::unavailable(&remote.name, e))
    }
}

/// A validated remote entry: the container a remote exposes.
#[derive(Debug, Clone)]
pub struct RemoteContainer {
    entry: RemoteEntry,
}

impl RemoteContainer {
    /// Checks that `body` describes a container for `expected_name` offering
    /// at least one export.
    pub fn parse(expected_name: &str, body: &str) -> Result<Self, FederationError> {
        let entry: RemoteEntry = serde_json::from_str(body)
            .map_err(|e| FederationError::malformed(expected_name, e))?;
        if entry.name != expected_name {
            return Err(FederationError::malformed(
                expected_name,
                format!("container declares name '{}'", entry.name),
            ));
        }
        if entry.exposes.is_empty() {
            return Err(FederationError::malformed(
                expected_name,
                "container exposes no modules",
            ));
        }
        Ok(Self { entry })
    }

    pub fn name(&self) -> &str {
        &self.entry.name
    }

    /// Binds this container's shared declarations into the share scope.
    pub fn init(&self, registry: &mut DependencyRegistry) -> ShareReport {
        registry.resolve(&self.entry.name, self.entry.shared.iter().cloned())
    }

    pub fn get(&self, export: &str) -> Result<&ExposedModule, FederationError> {
        self.entry
            .exposes
            .get(export)
            .ok_or_else(|| FederationError::ExportNotFound {
                remote: self.entry.name.clone(),
                export: export.to_string(),
            })
    }

    pub fn entry(&self) -> &RemoteEntry {
        &self.entry
    }
}

/// The namespace a successful `load` resolves to: an initialized container.
#[derive(Debug)]
pub struct RemoteModule {
    descriptor: RemoteDescriptor,
    container: RemoteContainer,
    share: ShareReport,
}

impl RemoteModule {
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn descriptor(&self) -> &RemoteDescriptor {
        &self.descriptor
    }

    pub fn get(&self, export: &str) -> Result<&ExposedModule, FederationError> {
        self.container.get(export)
    }

    pub fn exports(&self) -> impl Iterator<Item = &str> {
        self.container.entry().exposes.keys().map(String::as_str)
    }

    pub fn share_report(&self) -> &ShareReport {
        &self.share
    }
}

/// Liveness flag for a view waiting on a load.
#[derive(Debug, Clone)]
pub struct ViewLifetime(Arc<AtomicBool>);

impl ViewLifetime {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn deactivate(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_active(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl Default for ViewLifetime {
    fn default() -> Self {
        Self::new()
    }
}

type LoadResult = Result<Arc<RemoteModule>, FederationError>;
type PendingLoad = Shared<BoxFuture<'static, LoadResult>>;

enum Slot {
    Pending(PendingLoad),
    Ready(Arc<RemoteModule>),
}

/// Registry of remotes plus a per-name cache of loaded modules.
///
/// Nothing is fetched until the first `load` for a name. Callers arriving
/// while that load is in flight await the same pending operation. The load
/// runs on its own task, so a caller giving up does not cancel it.
pub struct RemoteLoader {
    remotes: RwLock<BTreeMap<String, RemoteDescriptor>>,
    slots: Arc<Mutex<HashMap<String, Slot>>>,
    fetcher: Arc<dyn ManifestFetcher>,
    registry: Arc<Mutex<DependencyRegistry>>,
}

impl RemoteLoader {
    pub fn new(fetcher: Arc<dyn ManifestFetcher>, registry: Arc<Mutex<DependencyRegistry>>) -> Self {
        Self {
            remotes: RwLock::new(BTreeMap::new()),
            slots: Arc::new(Mutex::new(HashMap::new())),
            fetcher,
            registry,
        }
    }

    /// Re-registering an identical descriptor is a no-op; a different url
    /// for a known name is rejected.
    pub fn register(&self, descriptor: RemoteDescriptor) -> Result<(), FederationError> {
        let mut remotes = self.remotes.write();
        if let Some(existing) = remotes.get(&descriptor.name) {
            if existing.remote_entry_url == descriptor.remote_entry_url {
                return Ok(());
            }
            return Err(FederationError::DuplicateRemote {
                name: descriptor.name,
                existing: existing.remote_entry_url.to_string(),
            });
        }
        info!(remote = %descriptor.name, url = %descriptor.remote_entry_url, "remote registered");
        remotes.insert(descriptor.name.clone(), descriptor);
        Ok(())
    }

    pub fn register_url(&self, name: &str, url: Url) -> Result<(), FederationError> {
        self.register(RemoteDescriptor::new(name, url))
    }

    pub fn descriptor(&self, name: &str) -> Option<RemoteDescriptor> {
        self.remotes.read().get(name).cloned()
    }

    pub fn registered(&self) -> Vec<RemoteDescriptor> {
        self.remotes.read().values().cloned().collect()
    }

    pub fn is_cached(&self, name: &str) -> bool {
        matches!(self.slots.lock().get(name), Some(Slot::Ready(_)))
    }

    /// Resolves `name` to its initialized module.
    ///
    /// Must be polled inside a Tokio runtime; the first load for a name runs
    /// on a spawned task. Outside one it fails with `RemoteUnavailable`.
    pub async fn load(&self, name: &str) -> LoadResult {
        let pending = {
            let mut slots = self.slots.lock();
            match slots.get(name) {
                Some(Slot::Ready(module)) => return Ok(Arc::clone(module)),
                Some(Slot::Pending(pending)) => {
                    debug!(remote = name, "joining in-flight load");
                    pending.clone()
                }
                None => {
                    let descriptor = self
                        .descriptor(name)
                        .ok_or_else(|| FederationError::UnknownRemote(name.to_string()))?;
                    let handle = Handle::try_current()
                        .map_err(|e| FederationError::unavailable(name, e))?;
                    let span = info_span!("remote_load", remote = %descriptor.name);
                    let pending = fetch_and_init(
                        Arc::clone(&self.fetcher),
                        Arc::clone(&self.registry),
                        descriptor,
                    )
                    .instrument(span)
                    .boxed()
                    .shared();
                    slots.insert(name.to_string(), Slot::Pending(pending.clone()));
                    handle.spawn(settle(
                        Arc::clone(&self.slots),
                        name.to_string(),
                        pending.clone(),
                    ));
                    pending
                }
            }
        };
        let result = pending.clone().await;
        promote(&self.slots, name, &pending, &result);
        result
    }

    /// Like [`RemoteLoader::load`], but yields `None` if `lifetime` ended
    /// before the load settled. The cache is populated either way.
    pub async fn load_for_view(
        &self,
        name: &str,
        lifetime: &ViewLifetime,
    ) -> Result<Option<Arc<RemoteModule>>, FederationError> {
        let result = self.load(name).await;
        if !lifetime.is_active() {
            debug!(remote = name, "view inactive, discarding late load result");
            return Ok(None);
        }
        result.map(Some)
    }
}

async fn fetch_and_init(
    fetcher: Arc<dyn ManifestFetcher>,
    registry: Arc<Mutex<DependencyRegistry>>,
    descriptor: RemoteDescriptor,
) -> LoadResult {
    info!(remote = %descriptor.name, url = %descriptor.remote_entry_url, "fetching remote entry");
    let body = fetcher.fetch(&descriptor).await?;
    let container = RemoteContainer::parse(&descriptor.name, &body)?;

    let share = {
        let mut registry = registry.lock();
        registry.initialize_eager();
        container.init(&mut registry)
    };
    if share.is_degraded() {
        warn!(
            remote = %descriptor.name,
            conflicts = share.conflicts.len(),
            "remote loaded with bundled fallbacks"
        );
    }

    info!(remote = %descriptor.name, exports = container.entry().exposes.len(), "remote ready");
    Ok(Arc::new(RemoteModule {
        descriptor,
        container,
        share,
    }))
}

async fn settle(slots: Arc<Mutex<HashMap<String, Slot>>>, name: String, pending: PendingLoad) {
    let result = pending.clone().await;
    promote(&slots, &name, &pending, &result);
}

/// Moves a finished load into the cache, or forgets it on failure so the
/// next `load` fetches again. Only the first caller to observe the settled
/// load for this slot acts.
fn promote(
    slots: &Mutex<HashMap<String, Slot>>,
    name: &str,
    pending: &PendingLoad,
    result: &LoadResult,
) {
    let mut slots = slots.lock();
    let current = matches!(slots.get(name), Some(Slot::Pending(slot)) if slot.ptr_eq(pending));
    if !current {
        return;
    }
    match result {
        Ok(module) => {
            slots.insert(name.to_string(), Slot::Ready(Arc::clone(module)));
        }
        Err(error) => {
            warn!(remote = name, %error, "remote load failed");
            slots.remove(name);
        }
    }
}

#[cfg(test)]
#[path = "tests/loader_tests.rs"]
mod tests;
