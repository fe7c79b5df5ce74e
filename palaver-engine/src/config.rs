//! Engine configuration loading
//!
//! Reads the engine section from the shared config file, falling back to
//! defaults when the file is missing or unparseable.

use std::path::PathBuf;
use std::time::Duration;

use palaver_protocol::DEFAULT_MESSAGE_PAGE_SIZE;

/// Get the config file path (~/.config/palaver/config.toml)
fn config_file() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("palaver")
        .join("config.toml")
}

/// Engine configuration
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Server endpoint, e.g. `tcp://127.0.0.1:8000`
    pub endpoint: String,
    /// Fixed delay before the first connect attempt, damping connect storms
    /// on rapid identity changes
    pub connect_delay_ms: u64,
    /// Fixed delay between reconnect attempts (constant backoff)
    pub reconnect_delay_ms: u64,
    /// Messages requested per pagination page
    pub page_size: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            endpoint: "tcp://127.0.0.1:8000".into(),
            connect_delay_ms: 100,
            reconnect_delay_ms: 1000,
            page_size: DEFAULT_MESSAGE_PAGE_SIZE,
        }
    }
}

impl EngineConfig {
    /// Load configuration from the config file
    ///
    /// Returns defaults if the file doesn't exist or can't be parsed.
    pub fn load() -> Self {
        let path = config_file();

        if !path.exists() {
            tracing::debug!("Config file not found, using default engine config");
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => match toml::from_str::<EngineConfig>(&content) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to parse config file: {}, using defaults", e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read config file: {}, using defaults", e);
                Self::default()
            }
        }
    }

    pub fn connect_delay(&self) -> Duration {
        Duration::from_millis(self.connect_delay_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.endpoint, "tcp://127.0.0.1:8000");
        assert_eq!(config.connect_delay_ms, 100);
        assert_eq!(config.reconnect_delay_ms, 1000);
        assert_eq!(config.page_size, 5);
    }

    #[test]
    fn test_parse_empty_config() {
        let config: EngineConfig = toml::from_str("").unwrap();
        assert_eq!(config.endpoint, "tcp://127.0.0.1:8000");
    }

    #[test]
    fn test_parse_partial_config() {
        let toml = r#"
            endpoint = "tcp://chat.example.org:9000"
        "#;
        let config: EngineConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.endpoint, "tcp://chat.example.org:9000");
        // Defaults for unspecified
        assert_eq!(config.reconnect_delay_ms, 1000);
        assert_eq!(config.page_size, 5);
    }

    #[test]
    fn test_durations() {
        let config = EngineConfig {
            connect_delay_ms: 250,
            reconnect_delay_ms: 2000,
            ..EngineConfig::default()
        };
        assert_eq!(config.connect_delay(), Duration::from_millis(250));
        assert_eq!(config.reconnect_delay(), Duration::from_millis(2000));
    }
}
