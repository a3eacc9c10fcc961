//! Config schema types (control server address, browser launch settings).

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ElectorConfig {
    pub server: ServerConfig,
    pub browser: BrowserConfig,
}

/// Control API server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to. Defaults to "127.0.0.1".
    pub bind: String,
    /// Port to listen on.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 7786,
        }
    }
}

/// Launch settings for the shared browser instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Path to the Chrome/Chromium binary (auto-detected if not set).
    pub browser_path: Option<String>,
    /// Whether to run in headless mode.
    pub headless: bool,
    /// User agent override (browser default if not set).
    pub user_agent: Option<String>,
    /// Additional Chrome arguments.
    pub chrome_args: Vec<String>,
    /// CDP request / navigation timeout in milliseconds.
    pub navigation_timeout_ms: u64,
    /// Timeout for selector waits (login marker, election result) in
    /// milliseconds.
    pub wait_timeout_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            browser_path: None,
            headless: true,
            user_agent: None,
            chrome_args: Vec::new(),
            navigation_timeout_ms: 30000,
            wait_timeout_ms: 30000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ElectorConfig::default();
        assert_eq!(config.server.bind, "127.0.0.1");
        assert_eq!(config.server.port, 7786);
        assert!(config.browser.headless);
        assert!(config.browser.browser_path.is_none());
        assert_eq!(config.browser.navigation_timeout_ms, 30000);
        assert_eq!(config.browser.wait_timeout_ms, 30000);
    }

    #[test]
    fn toml_round_trip() {
        let mut config = ElectorConfig::default();
        config.browser.browser_path = Some("/usr/bin/chromium".into());
        config.browser.headless = false;
        config.browser.chrome_args = vec!["--lang=zh-CN".into()];

        let rendered = toml::to_string_pretty(&config).expect("serialize");
        let parsed: ElectorConfig = toml::from_str(&rendered).expect("parse");
        assert_eq!(parsed.browser.browser_path.as_deref(), Some("/usr/bin/chromium"));
        assert!(!parsed.browser.headless);
        assert_eq!(parsed.browser.chrome_args, vec!["--lang=zh-CN".to_string()]);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let parsed: ElectorConfig =
            toml::from_str("[browser]\nheadless = false\n").expect("parse");
        assert!(!parsed.browser.headless);
        assert_eq!(parsed.server.port, 7786);
        assert_eq!(parsed.browser.wait_timeout_ms, 30000);
    }

    #[test]
    fn json_round_trip() {
        let config = ElectorConfig::default();
        let rendered = serde_json::to_string(&config).expect("serialize");
        let parsed: ElectorConfig = serde_json::from_str(&rendered).expect("parse");
        assert_eq!(parsed.server.port, config.server.port);
        assert_eq!(parsed.browser.headless, config.browser.headless);
    }
}
