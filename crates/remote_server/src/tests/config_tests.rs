use super::*;

use std::{
    collections::HashMap,
    env,
    time::{SystemTime, UNIX_EPOCH},
};

fn temp_config(contents: &str) -> std::path::PathBuf {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let path = env::temp_dir().join(format!("remote_server_config_{suffix}.toml"));
    fs::write(&path, contents).expect("write config");
    path
}

fn no_env(_: &str) -> Option<String> {
    None
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let settings =
        load_settings_from(Path::new("/nonexistent/remote.toml"), no_env).expect("settings");
    assert_eq!(settings.bind_addr, "127.0.0.1:3001");
    assert_eq!(settings.name, "products");
    assert!(settings.remote_entry().is_ok());
}

#[test]
fn file_values_are_read_and_env_wins() {
    let path = temp_config(
        r#"
bind_addr = "127.0.0.1:3002"
name = "cart"

[exposes."./CartApp"]
component = "cart"

[[shared]]
key = "react"
required_version = "^18.2.0"
singleton = true
version = "18.2.0"
"#,
    );

    let settings = load_settings_from(&path, no_env).expect("settings");
    assert_eq!(settings.bind_addr, "127.0.0.1:3002");
    let entry = settings.remote_entry().expect("entry");
    assert_eq!(entry.name, "cart");
    assert_eq!(
        entry.exposes.get("./CartApp").map(|module| module.component),
        Some(ComponentKind::Cart)
    );
    assert!(entry.shared[0].singleton);
    assert_eq!(entry.shared[0].version, Some(semver::Version::new(18, 2, 0)));

    let overrides: HashMap<&str, &str> =
        HashMap::from([("APP__BIND_ADDR", "0.0.0.0:4000"), ("APP__REMOTE_NAME", "cart-v2")]);
    let settings = load_settings_from(&path, |key| overrides.get(key).map(|v| v.to_string()))
        .expect("settings");
    assert_eq!(settings.bind_addr, "0.0.0.0:4000");
    assert_eq!(settings.name, "cart-v2");

    fs::remove_file(path).expect("cleanup");
}

#[test]
fn invalid_file_is_reported() {
    let path = temp_config("bind_addr = [");
    let err = load_settings_from(&path, no_env).expect_err("parse error");
    assert!(err.to_string().contains("failed to parse remote config"));
    fs::remove_file(path).expect("cleanup");
}

#[test]
fn entry_requires_an_export() {
    let settings = Settings {
        exposes: BTreeMap::new(),
        ..Settings::default()
    };
    assert!(settings.remote_entry().is_err());
}
