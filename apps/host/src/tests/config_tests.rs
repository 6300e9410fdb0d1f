use super::*;

use std::{
    env,
    time::{SystemTime, UNIX_EPOCH},
};

fn temp_config(contents: &str) -> std::path::PathBuf {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let path = env::temp_dir().join(format!("host_config_{suffix}.toml"));
    fs::write(&path, contents).expect("write config");
    path
}

fn no_env(_: &str) -> Option<String> {
    None
}

#[test]
fn defaults_register_products_and_cart_with_eager_singletons() {
    let settings =
        load_settings_from(Path::new("/nonexistent/host.toml"), no_env).expect("settings");
    let names: Vec<_> = settings
        .descriptors()
        .expect("descriptors")
        .into_iter()
        .map(|d| d.name)
        .collect();
    assert_eq!(names, ["products", "cart"]);
    assert!(settings.shared.iter().all(|s| s.singleton && s.eager));
    assert_eq!(settings.fetch_timeout(), Duration::from_secs(10));
}

#[test]
fn file_replaces_remotes_and_env_overrides_them() {
    let path = temp_config(
        r#"
remotes = ["cart@http://127.0.0.1:4002/remoteEntry.json"]
fetch_timeout_secs = 3

[[shared]]
key = "react"
required_version = "^18.0.0"
singleton = true
eager = true
version = "18.3.1"
"#,
    );

    let settings = load_settings_from(&path, no_env).expect("settings");
    assert_eq!(settings.remotes.len(), 1);
    assert_eq!(settings.shared[0].version, Some(Version::new(18, 3, 1)));
    assert_eq!(settings.fetch_timeout(), Duration::from_secs(3));

    let settings = load_settings_from(&path, |key| match key {
        "APP__REMOTES" => Some(
            "products@http://a.test/remoteEntry.json, legacy@http://b.test/remoteEntry.json".into(),
        ),
        "APP__FETCH_TIMEOUT_SECS" => Some("0".into()),
        _ => None,
    })
    .expect("settings");
    let names: Vec<_> = settings
        .descriptors()
        .expect("descriptors")
        .into_iter()
        .map(|d| d.name)
        .collect();
    assert_eq!(names, ["products", "legacy"]);
    assert_eq!(settings.fetch_timeout(), Duration::from_secs(1));

    fs::remove_file(path).expect("cleanup");
}

#[test]
fn malformed_remote_descriptor_is_an_error() {
    let settings = HostSettings {
        remotes: vec!["products-without-url".into()],
        ..HostSettings::default()
    };
    assert!(settings.descriptors().is_err());
}

#[test]
fn non_numeric_timeout_override_is_rejected() {
    let err = load_settings_from(Path::new("/nonexistent/host.toml"), |key| {
        (key == "APP__FETCH_TIMEOUT_SECS").then(|| "soon".to_string())
    })
    .expect_err("bad timeout");
    assert!(err.to_string().contains("APP__FETCH_TIMEOUT_SECS"));
}
