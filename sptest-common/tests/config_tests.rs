//! Configuration discovery and records-root resolution
//!
//! Tests that touch SPTEST_RECORDS_ROOT or SPTEST_CONFIG are marked #[serial]
//! so they never run in parallel with each other.

use serial_test::serial;
use sptest_common::config::{
    RootFolderResolver, TomlConfig, CONFIG_ENV_VAR, DEFAULT_RECORDS_ROOT, RECORDS_ROOT_ENV_VAR,
};
use sptest_common::Error;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
#[serial]
fn test_resolver_with_no_overrides_uses_default() {
    env::remove_var(RECORDS_ROOT_ENV_VAR);

    let resolver = RootFolderResolver::new(None, &TomlConfig::default());
    assert_eq!(resolver.resolve(), PathBuf::from(DEFAULT_RECORDS_ROOT));
}

#[test]
#[serial]
fn test_resolver_toml_root_used_without_env() {
    env::remove_var(RECORDS_ROOT_ENV_VAR);

    let config = TomlConfig {
        records_root: Some(PathBuf::from("/tmp/sptest-toml-root")),
        ..TomlConfig::default()
    };
    let resolver = RootFolderResolver::new(None, &config);
    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/sptest-toml-root"));
}

#[test]
#[serial]
fn test_resolver_env_beats_toml() {
    env::set_var(RECORDS_ROOT_ENV_VAR, "/tmp/sptest-env-root");

    let config = TomlConfig {
        records_root: Some(PathBuf::from("/tmp/sptest-toml-root")),
        ..TomlConfig::default()
    };
    let resolver = RootFolderResolver::new(None, &config);
    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/sptest-env-root"));

    env::remove_var(RECORDS_ROOT_ENV_VAR);
}

#[test]
#[serial]
fn test_resolver_cli_beats_env() {
    env::set_var(RECORDS_ROOT_ENV_VAR, "/tmp/sptest-env-root");

    let resolver = RootFolderResolver::new(
        Some(PathBuf::from("/tmp/sptest-cli-root")),
        &TomlConfig::default(),
    );
    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/sptest-cli-root"));

    env::remove_var(RECORDS_ROOT_ENV_VAR);
}

#[test]
#[serial]
fn test_discover_explicit_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        "use_roster = true\n[[point_scale]]\nposition = 1\npoints = 2\nlabel = \"Yes\"\n",
    )
    .unwrap();

    let config = TomlConfig::discover(Some(&path)).unwrap();
    assert!(config.use_roster);
    assert_eq!(config.global_point_scale().unwrap().unwrap().max_point_value(), 2);
}

#[test]
#[serial]
fn test_discover_from_env_var() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("env-config.toml");
    std::fs::write(&path, "records_root = \"/tmp/from-env-config\"\n").unwrap();
    env::set_var(CONFIG_ENV_VAR, &path);

    let config = TomlConfig::discover(None).unwrap();
    assert_eq!(config.records_root, Some(PathBuf::from("/tmp/from-env-config")));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_discover_missing_explicit_file_is_error() {
    let dir = TempDir::new().unwrap();
    let result = TomlConfig::discover(Some(&dir.path().join("missing.toml")));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_invalid_toml_is_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "use_roster = [not toml").unwrap();
    assert!(matches!(TomlConfig::load(&path), Err(Error::Toml(_))));
}

#[test]
fn test_invalid_point_scale_is_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("scale.toml");
    std::fs::write(
        &path,
        "[classes.\"5A\"]\npoint_scale = [ { position = 9, points = 1, label = \"x\" } ]\n",
    )
    .unwrap();
    assert!(matches!(TomlConfig::load(&path), Err(Error::Config(_))));
}
