//! Client configuration.

use crate::crypto::KdfParams;
use crate::{DomovikError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Relay used when the user does not pick one at link time.
pub const DEFAULT_SERVER_URL: &str = "https://domovik.app/api/v1/";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub default_server_url: String,
    pub default_browser_name: String,
    pub request_timeout_secs: u64,
    /// Lower bound of the random pause before a token renewal.
    pub renewal_backoff_min_ms: u64,
    /// Upper bound of the random pause before a token renewal.
    pub renewal_backoff_max_ms: u64,
    pub refresh_interval_secs: u64,
    pub field_limits: FieldLimits,
    pub key_derivation: KdfParams,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            default_server_url: DEFAULT_SERVER_URL.to_string(),
            default_browser_name: default_browser_name(),
            request_timeout_secs: 30,
            renewal_backoff_min_ms: 500,
            renewal_backoff_max_ms: 3500,
            refresh_interval_secs: 180,
            field_limits: FieldLimits::default(),
            key_derivation: KdfParams::default(),
        }
    }
}

impl ClientConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DomovikError::Config(format!("{}: {}", path.display(), e)))?;
        let config: Self =
            toml::from_str(&content).map_err(|e| DomovikError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::info!("No config file at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.renewal_backoff_min_ms > self.renewal_backoff_max_ms {
            return Err(DomovikError::Config(
                "renewal_backoff_min_ms must not exceed renewal_backoff_max_ms".to_string(),
            ));
        }
        if self.refresh_interval_secs == 0 {
            return Err(DomovikError::Config(
                "refresh_interval_secs must be positive".to_string(),
            ));
        }
        if self.key_derivation.iterations == 0 {
            return Err(DomovikError::Config(
                "key_derivation.iterations must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

/// Plaintext length ceilings for encrypted fields.
///
/// A field longer than its ceiling is sent as an empty string, never truncated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldLimits {
    pub max_title_len: usize,
    pub max_url_len: usize,
    pub max_favicon_len: usize,
}

impl Default for FieldLimits {
    fn default() -> Self {
        Self {
            max_title_len: 8000,
            max_url_len: 8000,
            max_favicon_len: 32000,
        }
    }
}

fn default_browser_name() -> String {
    format!("Browser on {}", std::env::consts::OS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.default_server_url, DEFAULT_SERVER_URL);
        assert_eq!(config.renewal_backoff_min_ms, 500);
        assert_eq!(config.renewal_backoff_max_ms, 3500);
        assert_eq!(config.field_limits.max_url_len, 8000);
        assert_eq!(config.field_limits.max_favicon_len, 32000);
        assert_eq!(config.key_derivation.iterations, 15_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: ClientConfig = toml::from_str(
            r#"
            default_server_url = "http://127.0.0.1:4000/api/v1/"
            refresh_interval_secs = 60

            [field_limits]
            max_url_len = 100
            "#,
        )
        .unwrap();

        assert_eq!(config.default_server_url, "http://127.0.0.1:4000/api/v1/");
        assert_eq!(config.refresh_interval_secs, 60);
        assert_eq!(config.field_limits.max_url_len, 100);
        assert_eq!(config.field_limits.max_favicon_len, 32000);
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn inverted_backoff_rejected() {
        let config = ClientConfig {
            renewal_backoff_min_ms: 10,
            renewal_backoff_max_ms: 5,
            ..ClientConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("domovik.toml");
        std::fs::write(&path, "request_timeout_secs = 5\n").unwrap();

        let config = ClientConfig::load(&path).unwrap();
        assert_eq!(config.request_timeout(), Duration::from_secs(5));

        let missing = ClientConfig::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(missing.request_timeout_secs, 30);
    }
}
