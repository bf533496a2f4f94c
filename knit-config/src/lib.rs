// Configuration management for knit
// Environment, dotenv and file sources, and bindings of their values into a container

pub mod bindings;
pub mod env;
pub mod error;
pub mod loader;
pub mod manager;

pub use bindings::{bind_config, bind_env, config_token, env_token, register_config};
pub use env::EnvLoader;
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};
pub use manager::ConfigManager;
