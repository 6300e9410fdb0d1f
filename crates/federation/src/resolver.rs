use std::{
    collections::{BTreeMap, HashSet},
    sync::Arc,
};

use semver::{BuildMetadata, Comparator, Op, Version, VersionReq};
use shared::{error::ErrorCode, protocol::SharedDependencySpec};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Provider name recorded for the host's own contributions.
pub const HOST_PROVIDER: &str = "host";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u64);

/// One initialized copy of a shared library.
#[derive(Debug, PartialEq, Eq)]
pub struct ResolvedSharedInstance {
    pub id: InstanceId,
    pub key: String,
    pub version: Version,
    pub required_version: VersionReq,
    pub provider: String,
    pub singleton: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "shared dependency '{key}': {consumer} requires {required}, \
     incompatible with {canonical_version} provided by {canonical_provider}"
)]
pub struct SharedDependencyConflict {
    pub key: String,
    pub consumer: String,
    pub required: VersionReq,
    pub canonical_version: Version,
    pub canonical_provider: String,
}

impl SharedDependencyConflict {
    pub fn code(&self) -> ErrorCode {
        ErrorCode::SharedDependencyConflict
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingSource {
    /// This contribution became the canonical singleton.
    Canonical,
    /// Bound to a canonical singleton contributed earlier.
    Shared,
    /// Not a singleton; the contributor keeps its own copy.
    Bundled,
    /// Singleton conflict; the contributor degraded to its own copy.
    Fallback,
}

#[derive(Debug, Clone)]
pub struct SharedBinding {
    pub key: String,
    pub instance: Arc<ResolvedSharedInstance>,
    pub source: BindingSource,
}

/// Outcome of initializing one contributor against the share scope.
#[derive(Debug, Clone, Default)]
pub struct ShareReport {
    pub provider: String,
    pub bindings: Vec<SharedBinding>,
    pub conflicts: Vec<SharedDependencyConflict>,
}

impl ShareReport {
    pub fn binding(&self, key: &str) -> Option<&SharedBinding> {
        self.bindings.iter().find(|binding| binding.key == key)
    }

    pub fn is_degraded(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub seq: usize,
    pub provider: String,
    pub spec: SharedDependencySpec,
}

/// Share scope owned by the application root.
///
/// Contributions are recorded in arrival order; for a singleton key the first
/// registration decides the canonical instance, whether it is instantiated
/// eagerly at startup or lazily on first use.
#[derive(Debug, Default)]
pub struct DependencyRegistry {
    registrations: Vec<Registration>,
    canonical: BTreeMap<String, Arc<ResolvedSharedInstance>>,
    eager_instances: BTreeMap<usize, Arc<ResolvedSharedInstance>>,
    instances: Vec<Arc<ResolvedSharedInstance>>,
    conflicts: Vec<SharedDependencyConflict>,
    next_instance: u64,
}

impl DependencyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the host's declarations. Call before any remote loads.
    pub fn register_host(&mut self, specs: impl IntoIterator<Item = SharedDependencySpec>) {
        for spec in specs {
            self.register(HOST_PROVIDER, spec);
        }
    }

    fn register(&mut self, provider: &str, spec: SharedDependencySpec) -> usize {
        let seq = self.registrations.len();
        debug!(provider, key = %spec.key, required = %spec.required_version, seq, "shared dependency registered");
        self.registrations.push(Registration {
            seq,
            provider: provider.to_string(),
            spec,
        });
        seq
    }

    /// Instantiates every eager registration not yet instantiated.
    ///
    /// Idempotent; returns the instances created by this call.
    pub fn initialize_eager(&mut self) -> Vec<Arc<ResolvedSharedInstance>> {
        let pending: Vec<usize> = self
            .registrations
            .iter()
            .filter(|registration| registration.spec.eager)
            .filter(|registration| !self.eager_instances.contains_key(&registration.seq))
            .map(|registration| registration.seq)
            .collect();

        let mut created = Vec::new();
        for seq in pending {
            let registration = self.registrations[seq].clone();
            let key = registration.spec.key.clone();
            let instance = if registration.spec.singleton {
                match self.canonical.get(&key) {
                    Some(existing) => Arc::clone(existing),
                    None => {
                        let instance = self.instantiate_canonical(&key, &registration);
                        created.push(Arc::clone(&instance));
                        instance
                    }
                }
            } else {
                let instance = self.instantiate(&registration);
                created.push(Arc::clone(&instance));
                instance
            };
            self.eager_instances.insert(seq, instance);
        }

        for instance in &created {
            info!(key = %instance.key, version = %instance.version, provider = %instance.provider, "eager shared dependency initialized");
        }
        created
    }

    pub fn eager_ready(&self) -> bool {
        self.registrations
            .iter()
            .filter(|registration| registration.spec.eager)
            .all(|registration| self.eager_instances.contains_key(&registration.seq))
    }

    /// Registers `provider`'s declarations and binds each one.
    ///
    /// Conflicts never fail the call: they are logged, recorded, and the
    /// provider falls back to its own copy.
    pub fn resolve(
        &mut self,
        provider: &str,
        specs: impl IntoIterator<Item = SharedDependencySpec>,
    ) -> ShareReport {
        let mut report = ShareReport {
            provider: provider.to_string(),
            ..ShareReport::default()
        };
        let mut seen = HashSet::new();

        for spec in specs {
            if !seen.insert(spec.key.clone()) {
                warn!(provider, key = %spec.key, "duplicate shared declaration ignored");
                continue;
            }
            let seq = self.register(provider, spec);
            let registration = self.registrations[seq].clone();

            let (instance, source) = if !registration.spec.singleton {
                (self.instantiate(&registration), BindingSource::Bundled)
            } else {
                self.bind_singleton(provider, &registration, &mut report)
            };
            if registration.spec.eager {
                self.eager_instances.insert(seq, Arc::clone(&instance));
            }
            report.bindings.push(SharedBinding {
                key: registration.spec.key.clone(),
                instance,
                source,
            });
        }

        report
    }

    fn bind_singleton(
        &mut self,
        provider: &str,
        registration: &Registration,
        report: &mut ShareReport,
    ) -> (Arc<ResolvedSharedInstance>, BindingSource) {
        let key = registration.spec.key.as_str();
        let canonical = match self.canonical.get(key) {
            Some(existing) => Arc::clone(existing),
            None => {
                let first = self
                    .registrations
                    .iter()
                    .find(|candidate| candidate.spec.singleton && candidate.spec.key == key)
                    .cloned()
                    .unwrap_or_else(|| registration.clone());
                self.instantiate_canonical(key, &first)
            }
        };

        if canonical.provider == provider {
            return (canonical, BindingSource::Canonical);
        }
        if ranges_compatible(&canonical, &registration.spec.required_version) {
            debug!(provider, key, instance = ?canonical.id, "bound to canonical shared instance");
            return (canonical, BindingSource::Shared);
        }

        let conflict = SharedDependencyConflict {
            key: key.to_string(),
            consumer: provider.to_string(),
            required: registration.spec.required_version.clone(),
            canonical_version: canonical.version.clone(),
            canonical_provider: canonical.provider.clone(),
        };
        warn!(%conflict, "falling back to bundled copy");
        self.conflicts.push(conflict.clone());
        report.conflicts.push(conflict);
        (self.instantiate(registration), BindingSource::Fallback)
    }

    pub fn instance(&self, key: &str) -> Option<Arc<ResolvedSharedInstance>> {
        self.canonical.get(key).cloned()
    }

    pub fn registrations(&self) -> &[Registration] {
        &self.registrations
    }

    pub fn conflicts(&self) -> &[SharedDependencyConflict] {
        &self.conflicts
    }

    /// Every instance created so far, canonical and bundled, in creation order.
    pub fn instances(&self) -> &[Arc<ResolvedSharedInstance>] {
        &self.instances
    }

    fn instantiate_canonical(
        &mut self,
        key: &str,
        registration: &Registration,
    ) -> Arc<ResolvedSharedInstance> {
        let instance = self.instantiate(registration);
        info!(key, version = %instance.version, provider = %instance.provider, "canonical shared instance selected");
        self.canonical.insert(key.to_string(), Arc::clone(&instance));
        instance
    }

    fn instantiate(&mut self, registration: &Registration) -> Arc<ResolvedSharedInstance> {
        self.next_instance += 1;
        let spec = &registration.spec;
        let instance = Arc::new(ResolvedSharedInstance {
            id: InstanceId(self.next_instance),
            key: spec.key.clone(),
            version: spec
                .version
                .clone()
                .unwrap_or_else(|| version_floor(&spec.required_version)),
            required_version: spec.required_version.clone(),
            provider: registration.provider.clone(),
            singleton: spec.singleton,
        });
        self.instances.push(Arc::clone(&instance));
        instance
    }
}

/// Whether some version satisfies both the canonical range and `required`.
///
/// Candidates are the canonical version and the lowest version `required`
/// admits.
pub fn ranges_compatible(canonical: &ResolvedSharedInstance, required: &VersionReq) -> bool {
    [canonical.version.clone(), version_floor(required)]
        .iter()
        .any(|candidate| canonical.required_version.matches(candidate) && required.matches(candidate))
}

/// Lowest version admitted by `req` (`18.x` -> 18.0.0, `^18.2` -> 18.2.0).
pub fn version_floor(req: &VersionReq) -> Version {
    req.comparators
        .iter()
        .filter_map(comparator_floor)
        .max()
        .unwrap_or_else(|| Version::new(0, 0, 0))
}

fn comparator_floor(comparator: &Comparator) -> Option<Version> {
    let minor = comparator.minor.unwrap_or(0);
    let patch = comparator.patch.unwrap_or(0);
    match comparator.op {
        Op::Exact | Op::GreaterEq | Op::Tilde | Op::Caret | Op::Wildcard => Some(Version {
            major: comparator.major,
            minor,
            patch,
            pre: comparator.pre.clone(),
            build: BuildMetadata::EMPTY,
        }),
        // `>u64::MAX` admits nothing, so it has no floor.
        Op::Greater => match (comparator.minor, comparator.patch) {
            (None, _) => Some(Version::new(comparator.major.checked_add(1)?, 0, 0)),
            (Some(minor), None) => Some(Version::new(comparator.major, minor.checked_add(1)?, 0)),
            (Some(minor), Some(patch)) => {
                Some(Version::new(comparator.major, minor, patch.checked_add(1)?))
            }
        },
        _ => None,
    }
}

#[cfg(test)]
#[path = "tests/resolver_tests.rs"]
mod tests;
