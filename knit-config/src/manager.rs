// Key/value configuration store

use crate::{ConfigError, ConfigLoader, EnvLoader, FileFormat, Result};
use knit_core::logging::debug;
use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Configuration values keyed by name.
///
/// Clones share the same store. Later loads overwrite keys from earlier ones.
#[derive(Clone, Debug, Default)]
pub struct ConfigManager {
    values: Arc<RwLock<HashMap<String, Value>>>,
    env_prefix: Option<String>,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Manager whose environment loads only see variables under `prefix`
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            values: Arc::default(),
            env_prefix: Some(prefix.into()),
        }
    }

    /// Load configuration from environment variables
    pub fn load_env(&self) -> Result<()> {
        let loader = EnvLoader::new(self.env_prefix.clone());
        let vars = loader.load();
        debug!(count = vars.len(), prefix = ?self.env_prefix, "Loaded environment configuration");

        self.values
            .write()
            .extend(vars.into_iter().map(|(k, v)| (k, Value::String(v))));
        Ok(())
    }

    /// Load a `.env` file into the process environment, then load the
    /// environment. Without a path a missing `.env` is ignored.
    pub fn load_dotenv(&self, path: Option<&Path>) -> Result<()> {
        match path {
            Some(path) => {
                dotenvy::from_path(path).map_err(|e| ConfigError::LoadError(e.to_string()))?;
            }
            None => {
                if let Err(err) = dotenvy::dotenv() {
                    debug!(error = %err, "No .env file loaded");
                }
            }
        }
        self.load_env()
    }

    /// Load the top-level keys of a configuration file
    pub fn load_file(&self, path: impl AsRef<Path>, format: FileFormat) -> Result<()> {
        let path = path.as_ref();
        let data = ConfigLoader::new(format).load_file(path)?;
        self.merge_value(data)?;
        debug!(path = %path.display(), ?format, "Loaded configuration file");
        Ok(())
    }

    /// Merge the top-level keys of a JSON object
    pub fn merge_value(&self, data: Value) -> Result<()> {
        match data {
            Value::Object(map) => {
                self.values.write().extend(map);
                Ok(())
            }
            other => Err(ConfigError::ParseError(format!(
                "Configuration root must be an object, found {}",
                other
            ))),
        }
    }

    /// Set a configuration value
    pub fn set<T: Serialize>(&self, key: &str, value: T) -> Result<()> {
        let value =
            serde_json::to_value(value).map_err(|e| ConfigError::SerializationError(e.to_string()))?;
        self.values.write().insert(key.to_string(), value);
        Ok(())
    }

    /// Raw value for `key`
    pub fn value(&self, key: &str) -> Option<Value> {
        self.values.read().get(key).cloned()
    }

    /// Get a configuration value
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self
            .value(key)
            .ok_or_else(|| ConfigError::KeyNotFound(key.to_string()))?;

        serde_json::from_value(value).map_err(|e| ConfigError::DeserializationError {
            key: key.to_string(),
            message: e.to_string(),
        })
    }

    /// Get a configuration value with default
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    pub fn get_string(&self, key: &str) -> Result<String> {
        self.get(key)
    }

    pub fn get_int(&self, key: &str) -> Result<i64> {
        self.get(key)
    }

    pub fn get_bool(&self, key: &str) -> Result<bool> {
        self.get(key)
    }

    pub fn get_float(&self, key: &str) -> Result<f64> {
        self.get(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.values.read().contains_key(key)
    }

    /// All keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.values.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Copy every value of `other` into this manager
    pub fn merge(&self, other: &ConfigManager) {
        if Arc::ptr_eq(&self.values, &other.values) {
            return;
        }
        let snapshot = other.values.read().clone();
        self.values.write().extend(snapshot);
    }
}
