//! Configuration loading through the public API.

mod helpers;

use std::sync::Arc;

use helpers::{load_config, write_config, Threading};
use table_loader::{ConfigError, ConfigLoader, Driver, Loader, LoaderError, LogLevel};

#[test]
fn test_load_is_cached_until_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), 50, &Threading::disabled(), 4);
    let loader = ConfigLoader::new(&path);

    let first = loader.load().unwrap();
    let second = loader.load().unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    let reloaded = loader.reload().unwrap();
    assert!(!Arc::ptr_eq(&first, &reloaded));
    assert!(Arc::ptr_eq(&reloaded, &loader.load().unwrap()));
}

#[test]
fn test_reload_picks_up_edits() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), 50, &Threading::disabled(), 4);
    let loader = ConfigLoader::new(&path);
    assert_eq!(loader.load().unwrap().batch_size(), 50);

    write_config(dir.path(), 75, &Threading::enabled(2, 10), 4);
    // Still the cached value until an explicit reload
    assert_eq!(loader.load().unwrap().batch_size(), 50);

    let config = loader.reload().unwrap();
    assert_eq!(config.batch_size(), 75);
    assert!(config.is_threading_enabled());
}

#[test]
fn test_environment_settings() {
    let dir = tempfile::tempdir().unwrap();
    let config = load_config(dir.path(), 50, &Threading::disabled(), 4);

    assert_eq!(config.current_environment(), "development");
    assert_eq!(config.environments(), vec!["development", "staging"]);
    assert_eq!(config.table_name().unwrap(), "room_listing");
    assert_eq!(config.log_level(), LogLevel::Debug);

    let staging = config.database_config(Some("staging")).unwrap();
    assert_eq!(staging.driver, Driver::Sqlite);
    assert!(staging.dbname.ends_with("staging.db"));

    assert!(matches!(
        config.database_config(Some("qa")),
        Err(ConfigError::EnvironmentNotFound(env)) if env == "qa"
    ));
}

#[test]
fn test_missing_and_malformed_files() {
    let dir = tempfile::tempdir().unwrap();

    let missing = ConfigLoader::new(dir.path().join("nope.yml"));
    assert!(matches!(missing.load(), Err(ConfigError::Missing(_))));

    let path = dir.path().join("broken.yml");
    std::fs::write(&path, "database: [unterminated").unwrap();
    assert!(matches!(
        ConfigLoader::new(&path).load(),
        Err(ConfigError::Malformed(_))
    ));
}

#[tokio::test]
async fn test_loader_rejects_unknown_environment() {
    let dir = tempfile::tempdir().unwrap();
    let config = load_config(dir.path(), 50, &Threading::disabled(), 4);

    let result = Loader::new(config, Some("production")).await;
    assert!(matches!(
        result,
        Err(LoaderError::Config(ConfigError::EnvironmentNotFound(env))) if env == "production"
    ));
}

#[tokio::test]
async fn test_loader_selects_environment() {
    let dir = tempfile::tempdir().unwrap();
    let config = load_config(dir.path(), 50, &Threading::disabled(), 4);

    let loader = Loader::new(Arc::clone(&config), None).await.unwrap();
    assert_eq!(loader.environment(), "development");

    let loader = Loader::new(config, Some("staging")).await.unwrap();
    assert_eq!(loader.environment(), "staging");
    loader.create_table(None).await.unwrap();
    assert!(dir.path().join("staging.db").exists());
    assert!(!dir.path().join("dev.db").exists());
}
