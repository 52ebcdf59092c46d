//! Configuration: TOML file merged with `SHELVER_`-prefixed environment
//! variables.

mod loader;
mod types;
mod validate;

pub use loader::{load_config, load_config_from_str};
pub use types::{Config, ConfigError, DatabaseConfig, EventsConfig};
pub use validate::validate_config;
