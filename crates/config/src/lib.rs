//! Configuration schema, discovery, and persistence.
//!
//! Config files: `elector.toml` or `elector.json`,
//! searched in `./` then `~/.config/elector/`.
//!
//! The config is read once at process start and can be replaced at runtime
//! through the control API, which persists the new value back to disk.

pub mod loader;
pub mod schema;

pub use {
    loader::{
        clear_config_dir, config_dir, discover_and_load, find_or_default_config_path, load_config,
        save_config, set_config_dir,
    },
    schema::{BrowserConfig, ElectorConfig, ServerConfig},
};
