// Environment and configuration values as container tokens

use crate::ConfigManager;
use knit_core::logging::debug;
use knit_core::{Container, Error, Lifecycle, Token};
use serde::de::DeserializeOwned;
use std::env;

/// Token under which the environment variable `key` is bound
pub fn env_token(key: &str) -> Token {
    Token::named(format!("env:{}", key))
}

/// Token under which the configuration value `key` is bound
pub fn config_token(key: &str) -> Token {
    Token::named(format!("config:{}", key))
}

/// Bind the environment variable `key` as the prototype token `env:KEY`.
///
/// Each resolution reads the variable again and yields a `String`: its value,
/// else `default`, else the empty string. Binding the same key again replaces
/// the earlier binding.
pub fn bind_env(container: &Container, key: &str, default: Option<&str>) -> Token {
    let token = env_token(key);
    let var = key.to_string();
    let default = default.unwrap_or_default().to_string();

    container.provide_unchecked(token.clone(), Lifecycle::Prototype, move |_| {
        Ok(env::var(&var).unwrap_or_else(|_| default.clone()))
    });
    debug!(token = %token, "Bound environment variable");
    token
}

/// Bind the configuration value `key` as `config:KEY`, deserialized as `T`.
///
/// The value is read from the container's [`ConfigManager`] each time the
/// factory runs, so register one with [`register_config`] before resolving.
pub fn bind_config<T>(container: &Container, key: &str, lifecycle: Lifecycle) -> knit_core::Result<Token>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    let token = config_token(key);
    let key = key.to_string();

    container.provide_with(token.clone(), lifecycle, move |resolver| {
        let manager = resolver.resolve::<ConfigManager>()?;
        manager.get::<T>(&key).map_err(Error::from)
    })?;
    debug!(token = %token, lifecycle = lifecycle.as_str(), "Bound configuration value");
    Ok(token)
}

/// Install `manager` as the container's configuration singleton
pub fn register_config(container: &Container, manager: ConfigManager) -> knit_core::Result<()> {
    container.provide_value(Token::of::<ConfigManager>(), manager)?;
    Ok(())
}
