//! Configuration loading and validation.
//!
//! Supports JSON5 format. Config location: `~/.yakap/yakap.json`, or
//! `$YAKAP_STATE_DIR/yakap.json` when the environment variable is set.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default session lifetime in hours.
const DEFAULT_SESSION_TTL_HOURS: u64 = 8;

/// Minimum decoded signing-secret length in bytes.
const MIN_SECRET_BYTES: usize = 32;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON5 parsing error.
    #[error("Parse error: {0}")]
    Parse(#[from] json5::Error),

    /// Config validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The session signing secret is absent.
    ///
    /// The secret is the trust anchor for every issued session; without it
    /// the process must not start.
    #[error("Session secret is not configured (set session.secret or YAKAP_SESSION_SECRET)")]
    MissingSecret,
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Gateway server configuration.
    #[serde(default)]
    pub gateway: GatewaySettings,

    /// Session signing configuration.
    #[serde(default)]
    pub session: SessionSettings,
}

/// Gateway server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewaySettings {
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Bind address.
    #[serde(default = "default_bind")]
    pub bind_address: String,

    /// Enable CORS.
    #[serde(default = "default_true")]
    pub cors: bool,
}

/// Session signing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Signing secret (hex-encoded, at least 32 bytes decoded). Required.
    #[serde(default)]
    pub secret: Option<String>,

    /// Session lifetime in hours.
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: u64,

    /// Mark the session cookie `Secure` (production-like deployments).
    #[serde(default)]
    pub cookie_secure: bool,
}

fn default_port() -> u16 {
    8787
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_true() -> bool {
    true
}

fn default_ttl_hours() -> u64 {
    DEFAULT_SESSION_TTL_HOURS
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: default_bind(),
            cors: default_true(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            secret: None,
            ttl_hours: default_ttl_hours(),
            cookie_secure: false,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// A missing file yields the defaults; env overrides still apply.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        let config = if path.exists() {
            Self::load(&path)?
        } else {
            Self::default()
        };
        Ok(config.with_env_overrides())
    }

    /// Load configuration from a specific path.
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        if content.len() > crate::validation::limits::MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Validation("Config file too large".to_string()));
        }
        let config: Self = json5::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a path.
    ///
    /// # Errors
    ///
    /// Returns error if serialization or file write fails.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Validation(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default config file path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        Self::state_dir().join("yakap.json")
    }

    /// Get the Yakap state directory.
    ///
    /// Uses `YAKAP_STATE_DIR` env var if set, otherwise `~/.yakap`.
    #[must_use]
    pub fn state_dir() -> PathBuf {
        if let Ok(dir) = std::env::var("YAKAP_STATE_DIR") {
            PathBuf::from(dir)
        } else if let Some(home) = dirs::home_dir() {
            home.join(".yakap")
        } else {
            PathBuf::from(".yakap")
        }
    }

    /// Get the data directory for persistent stores.
    #[must_use]
    pub fn data_dir() -> PathBuf {
        Self::state_dir().join("data")
    }

    /// Apply environment variable overrides.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(secret) = std::env::var("YAKAP_SESSION_SECRET") {
            self.session.secret = Some(secret);
        }

        if std::env::var("YAKAP_COOKIE_SECURE")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
        {
            self.session.cookie_secure = true;
        }

        self
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.gateway.port == 0 {
            return Err(ConfigError::Validation(
                "Gateway port cannot be 0".to_string(),
            ));
        }

        if self.session.ttl_hours == 0 {
            return Err(ConfigError::Validation(
                "Session TTL cannot be 0".to_string(),
            ));
        }

        if let Some(secret) = &self.session.secret {
            decode_secret(secret)?;
        }

        Ok(())
    }
}

impl SessionSettings {
    /// Get the session lifetime as a Duration.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_hours * 3600)
    }

    /// Decode the configured signing secret.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingSecret` when no secret is configured and
    /// a validation error when it is not valid hex or too short. Callers
    /// treat either as fatal at startup.
    pub fn require_secret(&self) -> Result<Vec<u8>, ConfigError> {
        let secret = self.secret.as_ref().ok_or(ConfigError::MissingSecret)?;
        decode_secret(secret)
    }
}

fn decode_secret(hex_secret: &str) -> Result<Vec<u8>, ConfigError> {
    let bytes = hex::decode(hex_secret)
        .map_err(|e| ConfigError::Validation(format!("Session secret is not valid hex: {e}")))?;

    if bytes.len() < MIN_SECRET_BYTES {
        return Err(ConfigError::Validation(format!(
            "Session secret must be at least {MIN_SECRET_BYTES} bytes, got {}",
            bytes.len()
        )));
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex_secret() -> String {
        hex::encode([7u8; 32])
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.gateway.port, 8787);
        assert_eq!(config.gateway.bind_address, "127.0.0.1");
        assert_eq!(config.session.ttl_hours, 8);
        assert!(config.session.secret.is_none());
        assert!(!config.session.cookie_secure);
    }

    #[test]
    fn test_ttl_duration() {
        let settings = SessionSettings {
            ttl_hours: 8,
            ..SessionSettings::default()
        };
        assert_eq!(settings.ttl(), Duration::from_secs(8 * 3600));
    }

    #[test]
    fn test_missing_secret_is_an_error() {
        let settings = SessionSettings::default();
        assert!(matches!(
            settings.require_secret(),
            Err(ConfigError::MissingSecret)
        ));
    }

    #[test]
    fn test_secret_decoding() {
        let settings = SessionSettings {
            secret: Some(hex_secret()),
            ..SessionSettings::default()
        };
        let bytes = settings.require_secret().unwrap();
        assert_eq!(bytes.len(), 32);
    }

    #[test]
    fn test_short_secret_rejected() {
        let settings = SessionSettings {
            secret: Some(hex::encode([1u8; 8])),
            ..SessionSettings::default()
        };
        assert!(matches!(
            settings.require_secret(),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_parse_json5() {
        let config: Config = json5::from_str(
            r#"{
                // local dev settings
                gateway: { port: 9000 },
                session: { ttl_hours: 2 },
            }"#,
        )
        .unwrap();
        assert_eq!(config.gateway.port, 9000);
        assert_eq!(config.session.ttl_hours, 2);
        assert!(config.gateway.cors);
    }

    #[test]
    fn test_load_rejects_zero_port() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("yakap.json");
        std::fs::write(&path, r#"{ gateway: { port: 0 } }"#).unwrap();
        assert!(matches!(
            Config::load(&path),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("yakap.json");

        let mut config = Config::default();
        config.session.secret = Some(hex_secret());
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.session.secret, config.session.secret);
    }
}
