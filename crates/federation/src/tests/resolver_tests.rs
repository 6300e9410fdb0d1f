use super::*;

fn req(raw: &str) -> VersionReq {
    VersionReq::parse(raw).expect("version req")
}

fn lib(range: &str) -> SharedDependencySpec {
    SharedDependencySpec::new("lib", req(range)).singleton()
}

#[test]
fn eager_host_singleton_is_shared_with_compatible_remote() {
    let mut registry = DependencyRegistry::new();
    registry.register_host([lib("18.x").eager()]);
    let created = registry.initialize_eager();
    assert_eq!(created.len(), 1);
    assert!(registry.eager_ready());

    let report = registry.resolve("cart", [lib("18.2")]);
    let binding = report.binding("lib").expect("binding");
    assert_eq!(binding.source, BindingSource::Shared);
    assert!(Arc::ptr_eq(&binding.instance, &created[0]));
    assert!(!report.is_degraded());
}

#[test]
fn incompatible_remote_falls_back_to_bundled_copy() {
    let mut registry = DependencyRegistry::new();
    registry.register_host([lib("18.x").eager()]);
    registry.initialize_eager();
    let canonical = registry.instance("lib").expect("canonical");

    registry.resolve("cart", [lib("18.2")]);
    let report = registry.resolve("legacy", [lib("17.x")]);

    assert!(report.is_degraded());
    let conflict = &report.conflicts[0];
    assert_eq!(conflict.key, "lib");
    assert_eq!(conflict.consumer, "legacy");
    assert_eq!(conflict.canonical_provider, HOST_PROVIDER);
    assert_eq!(conflict.code(), ErrorCode::SharedDependencyConflict);

    let binding = report.binding("lib").expect("binding");
    assert_eq!(binding.source, BindingSource::Fallback);
    assert!(!Arc::ptr_eq(&binding.instance, &canonical));
    assert_eq!(binding.instance.provider, "legacy");
    assert_eq!(binding.instance.version, Version::new(17, 0, 0));

    // the canonical instance is untouched by the conflict
    assert!(Arc::ptr_eq(&registry.instance("lib").expect("canonical"), &canonical));
    assert_eq!(registry.conflicts().len(), 1);
}

#[test]
fn initialize_eager_is_idempotent() {
    let mut registry = DependencyRegistry::new();
    registry.register_host([
        lib("18.x").eager(),
        SharedDependencySpec::new("router", req("^6")).eager(),
    ]);

    assert_eq!(registry.initialize_eager().len(), 2);
    assert!(registry.initialize_eager().is_empty());
    assert_eq!(registry.instances().len(), 2);
}

#[test]
fn first_registered_host_spec_is_canonical_even_when_lazy() {
    let mut registry = DependencyRegistry::new();
    registry.register_host([lib("^18.0.0").with_version(Version::new(18, 2, 0))]);
    assert!(registry.initialize_eager().is_empty());
    assert!(registry.instance("lib").is_none());

    let report = registry.resolve("products", [lib("^18.1")]);
    let binding = report.binding("lib").expect("binding");
    assert_eq!(binding.source, BindingSource::Shared);
    assert_eq!(binding.instance.provider, HOST_PROVIDER);
    assert_eq!(binding.instance.version, Version::new(18, 2, 0));
}

#[test]
fn first_remote_becomes_canonical_without_host_declaration() {
    let mut registry = DependencyRegistry::new();

    let first = registry.resolve("products", [lib("^18.2")]);
    assert_eq!(first.binding("lib").expect("binding").source, BindingSource::Canonical);

    let second = registry.resolve("cart", [lib("18.x")]);
    let binding = second.binding("lib").expect("binding");
    assert_eq!(binding.source, BindingSource::Shared);
    assert_eq!(binding.instance.provider, "products");
}

#[test]
fn non_singleton_contributions_each_get_their_own_copy() {
    let mut registry = DependencyRegistry::new();
    let spec = SharedDependencySpec::new("icons", req("^2"));

    let a = registry.resolve("products", [spec.clone()]);
    let b = registry.resolve("cart", [spec]);

    let a = a.binding("icons").expect("binding");
    let b = b.binding("icons").expect("binding");
    assert_eq!(a.source, BindingSource::Bundled);
    assert_eq!(b.source, BindingSource::Bundled);
    assert_ne!(a.instance.id, b.instance.id);
    assert!(registry.instance("icons").is_none());
}

#[test]
fn registration_order_is_recorded() {
    let mut registry = DependencyRegistry::new();
    registry.register_host([lib("18.x").eager()]);
    registry.resolve("cart", [lib("18.2")]);
    registry.resolve("products", [lib("^18")]);

    let order: Vec<(usize, &str)> = registry
        .registrations()
        .iter()
        .map(|registration| (registration.seq, registration.provider.as_str()))
        .collect();
    assert_eq!(order, vec![(0, "host"), (1, "cart"), (2, "products")]);
}

#[test]
fn duplicate_declarations_within_one_contributor_are_ignored() {
    let mut registry = DependencyRegistry::new();
    let report = registry.resolve("cart", [lib("18.x"), lib("17.x")]);
    assert_eq!(report.bindings.len(), 1);
    assert_eq!(registry.registrations().len(), 1);
}

#[test]
fn eager_remote_declaration_is_not_instantiated_twice() {
    let mut registry = DependencyRegistry::new();
    registry.resolve("cart", [SharedDependencySpec::new("icons", req("^2")).eager()]);
    assert_eq!(registry.instances().len(), 1);

    assert!(registry.initialize_eager().is_empty());
    assert_eq!(registry.instances().len(), 1);
}

#[test]
fn version_floor_handles_common_range_forms() {
    assert_eq!(version_floor(&req("18.x")), Version::new(18, 0, 0));
    assert_eq!(version_floor(&req("18.2")), Version::new(18, 2, 0));
    assert_eq!(version_floor(&req("~1.4.7")), Version::new(1, 4, 7));
    assert_eq!(version_floor(&req(">=2.1, <3")), Version::new(2, 1, 0));
    assert_eq!(version_floor(&req(">1.2")), Version::new(1, 3, 0));
    assert_eq!(version_floor(&req("*")), Version::new(0, 0, 0));
}

#[test]
fn unsatisfiable_lower_bound_conflicts_instead_of_overflowing() {
    assert_eq!(version_floor(&req(">18446744073709551615")), Version::new(0, 0, 0));
    assert_eq!(version_floor(&req(">1.18446744073709551615")), Version::new(0, 0, 0));
    assert_eq!(version_floor(&req(">1.2")), Version::new(1, 3, 0));

    let mut registry = DependencyRegistry::new();
    registry.register_host([lib("18.x").eager()]);
    registry.initialize_eager();

    let report = registry.resolve("rogue", [lib(">18446744073709551615")]);
    let binding = report.binding("lib").expect("binding");
    assert_eq!(binding.source, BindingSource::Fallback);
    assert_eq!(report.conflicts.len(), 1);
    assert_eq!(registry.instance("lib").expect("canonical").provider, HOST_PROVIDER);
}
