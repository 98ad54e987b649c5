//! Cached configuration file loading.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use log::{debug, error, info};

use crate::config::types::AppConfig;
use crate::error_handling::ConfigError;

/// Loads the YAML configuration file once and hands out the cached result.
///
/// `load()` parses the file on first use and afterwards returns the same
/// `Arc`. `reload()` re-reads the file and replaces the cached value; callers
/// holding the previous `Arc` keep their snapshot.
#[derive(Debug)]
pub struct ConfigLoader {
    path: PathBuf,
    cache: RwLock<Option<Arc<AppConfig>>>,
}

impl ConfigLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        debug!("Configuration file: {}", path.display());
        Self {
            path,
            cache: RwLock::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the cached configuration, reading the file if nothing is cached.
    pub fn load(&self) -> Result<Arc<AppConfig>, ConfigError> {
        if let Some(config) = self
            .cache
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
        {
            return Ok(Arc::clone(config));
        }

        let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
        // Another caller may have filled the cache while we waited for the lock
        if let Some(config) = cache.as_ref() {
            return Ok(Arc::clone(config));
        }
        let config = Arc::new(read_config(&self.path)?);
        *cache = Some(Arc::clone(&config));
        debug!("Configuration loaded into cache");
        Ok(config)
    }

    /// Re-reads the file and replaces the cached configuration.
    ///
    /// On failure the previously cached configuration is left in place.
    pub fn reload(&self) -> Result<Arc<AppConfig>, ConfigError> {
        info!("Reloading configuration file {}", self.path.display());
        let config = Arc::new(read_config(&self.path)?);
        *self.cache.write().unwrap_or_else(|e| e.into_inner()) = Some(Arc::clone(&config));
        Ok(config)
    }
}

fn read_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            error!("Configuration file not found: {}", path.display());
            ConfigError::Missing(path.to_path_buf())
        } else {
            error!("Failed to read configuration file {}: {e}", path.display());
            ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;

    AppConfig::from_yaml_str(&contents).map_err(|e| {
        error!("Configuration file {} is malformed: {e}", path.display());
        match e {
            ConfigError::Malformed(reason) => {
                ConfigError::Malformed(format!("{}: {reason}", path.display()))
            }
            other => other,
        }
    })
}
