use std::{
    path::{Path, PathBuf},
    sync::{PoisonError, RwLock},
};

use tracing::{debug, warn};

use crate::schema::ElectorConfig;

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["elector.toml", "elector.json"];

/// Process-wide override for the user config directory, set by the CLI
/// (`--config-dir`) or by tests.
static CONFIG_DIR_OVERRIDE: RwLock<Option<PathBuf>> = RwLock::new(None);

/// Override the user config directory.
pub fn set_config_dir(path: PathBuf) {
    *CONFIG_DIR_OVERRIDE
        .write()
        .unwrap_or_else(PoisonError::into_inner) = Some(path);
}

/// Clear the user config directory override.
pub fn clear_config_dir() {
    *CONFIG_DIR_OVERRIDE
        .write()
        .unwrap_or_else(PoisonError::into_inner) = None;
}

/// Returns the user config directory: the override if set, else
/// `~/.config/elector/`.
pub fn config_dir() -> Option<PathBuf> {
    if let Some(dir) = CONFIG_DIR_OVERRIDE
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
    {
        return Some(dir);
    }
    directories::ProjectDirs::from("", "", "elector").map(|d| d.config_dir().to_path_buf())
}

/// Load config from the given path (TOML or JSON by extension).
pub fn load_config(path: &Path) -> anyhow::Result<ElectorConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./elector.{toml,json}` (project-local)
/// 2. `~/.config/elector/elector.{toml,json}` (user-global)
///
/// Returns `ElectorConfig::default()` if no config file is found.
pub fn discover_and_load() -> ElectorConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    ElectorConfig::default()
}

/// Find the first config file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    if let Some(dir) = config_dir() {
        for name in CONFIG_FILENAMES {
            let p = dir.join(name);
            if p.exists() {
                return Some(p);
            }
        }
    }

    None
}

/// Returns the path of an existing config file, or the default TOML path.
pub fn find_or_default_config_path() -> PathBuf {
    if let Some(path) = find_config_file() {
        return path;
    }
    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("elector.toml")
}

/// Serialize `config` and write it to the config path in use.
///
/// TOML unless an existing `.json` file is being replaced. Creates parent
/// directories if needed. Returns the path written to.
pub fn save_config(config: &ElectorConfig) -> anyhow::Result<PathBuf> {
    let path = find_or_default_config_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let rendered = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::to_string_pretty(config)?,
        _ => toml::to_string_pretty(config)
            .map_err(|e| anyhow::anyhow!("serialize config: {e}"))?,
    };
    std::fs::write(&path, rendered)?;
    debug!(path = %path.display(), "saved config");
    Ok(path)
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<ElectorConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_toml_and_json() {
        let dir = tempfile::tempdir().expect("tempdir");

        let toml_path = dir.path().join("elector.toml");
        std::fs::write(&toml_path, "[server]\nport = 9000\n").expect("write");
        let cfg = load_config(&toml_path).expect("load toml");
        assert_eq!(cfg.server.port, 9000);

        let json_path = dir.path().join("elector.json");
        std::fs::write(&json_path, r#"{"browser":{"headless":false}}"#).expect("write");
        let cfg = load_config(&json_path).expect("load json");
        assert!(!cfg.browser.headless);
    }

    #[test]
    fn load_rejects_unknown_extension() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("elector.ini");
        std::fs::write(&path, "nope").expect("write");
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn save_then_discover_round_trip() {
        // The override is process-global, so everything depending on it
        // lives in this one test.
        let dir = tempfile::tempdir().expect("tempdir");
        set_config_dir(dir.path().to_path_buf());

        let mut config = ElectorConfig::default();
        config.browser.browser_path = Some("/opt/chromium/chrome".into());
        let written = save_config(&config).expect("save");
        assert_eq!(written, dir.path().join("elector.toml"));

        let loaded = discover_and_load();
        assert_eq!(
            loaded.browser.browser_path.as_deref(),
            Some("/opt/chromium/chrome")
        );

        // A second save reuses the same file.
        let written_again = save_config(&loaded).expect("save again");
        assert_eq!(written, written_again);

        clear_config_dir();
    }
}
