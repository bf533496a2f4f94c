// Environment variable loading

use crate::{ConfigError, Result};
use std::collections::HashMap;
use std::env;

/// Reads environment variables, optionally restricted to a prefix.
///
/// Keys are lowercased and stripped of the prefix and its separator, so with
/// prefix `APP` the variable `APP_DATABASE_URL` becomes `database_url`.
#[derive(Debug, Clone, Default)]
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Load the process environment
    pub fn load(&self) -> HashMap<String, String> {
        self.collect(env::vars())
    }

    /// Apply prefix filtering and key normalisation to `vars`
    pub fn collect<I>(&self, vars: I) -> HashMap<String, String>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        vars.into_iter()
            .filter_map(|(key, value)| match &self.prefix {
                Some(prefix) => key
                    .strip_prefix(prefix.as_str())
                    .map(|rest| (rest.trim_start_matches('_').to_lowercase(), value)),
                None => Some((key.to_lowercase(), value)),
            })
            .filter(|(key, _)| !key.is_empty())
            .collect()
    }

    /// Name of the variable `key` is read from
    pub fn var_name(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix, key.to_uppercase()),
            None => key.to_uppercase(),
        }
    }

    /// Load a specific environment variable
    pub fn load_var(&self, key: &str) -> Result<String> {
        env::var(self.var_name(key)).map_err(ConfigError::EnvError)
    }

    /// Load with default value
    pub fn load_var_or(&self, key: &str, default: &str) -> String {
        self.load_var(key).unwrap_or_else(|_| default.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_collect_without_prefix_lowercases_keys() {
        let loaded = EnvLoader::default().collect(vars(&[("HOME", "/root"), ("Port", "80")]));
        assert_eq!(loaded.get("home").map(String::as_str), Some("/root"));
        assert_eq!(loaded.get("port").map(String::as_str), Some("80"));
    }

    #[test]
    fn test_collect_with_prefix() {
        let loader = EnvLoader::new(Some("APP".to_string()));
        let loaded = loader.collect(vars(&[
            ("APP_DATABASE_URL", "postgres://"),
            ("APP", "bare"),
            ("OTHER_KEY", "ignored"),
        ]));
        assert_eq!(loaded.len(), 1);
        assert_eq!(
            loaded.get("database_url").map(String::as_str),
            Some("postgres://")
        );
    }

    #[test]
    fn test_var_name() {
        assert_eq!(EnvLoader::default().var_name("port"), "PORT");
        assert_eq!(
            EnvLoader::new(Some("APP".into())).var_name("port"),
            "APP_PORT"
        );
    }

    #[test]
    fn test_missing_var_uses_default() {
        let loader = EnvLoader::new(Some("KNIT_TEST".to_string()));
        assert!(loader.load_var("MISSING_VAR_67890").is_err());
        assert_eq!(loader.load_var_or("MISSING_VAR_67890", "fallback"), "fallback");
    }
}
