//! Application configuration management.
//!
//! This module handles loading and saving the client configuration, which
//! includes the API base URL, the HTTP request timeout, the last identity
//! used to sign in and the purpose of a pending verification code.
//!
//! Configuration is stored at `~/.config/qanuni/config.json`. The base URL
//! can be overridden with the `QANUNI_API_BASE` environment variable.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Application name used for config directory paths
pub const APP_NAME: &str = "qanuni";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding the configured API base URL
pub const API_BASE_ENV: &str = "QANUNI_API_BASE";

/// HTTP request timeout in seconds when none is configured.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub api_base: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub last_identity: Option<String>,
    /// Purpose marker returned by `/Forget-Password`, echoed back when the
    /// WhatsApp code is verified in a later run
    pub pending_verification: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Resolve the API base URL.
    ///
    /// Precedence: explicit override, then `QANUNI_API_BASE`, then the config
    /// file. A trailing slash is dropped so endpoint paths can be appended.
    pub fn api_base(&self, explicit: Option<&str>) -> Result<String> {
        let env = std::env::var(API_BASE_ENV).ok();
        Self::pick_api_base(explicit, env.as_deref(), self.api_base.as_deref())
    }

    fn pick_api_base(
        explicit: Option<&str>,
        env: Option<&str>,
        configured: Option<&str>,
    ) -> Result<String> {
        let base = explicit
            .into_iter()
            .chain(env)
            .chain(configured)
            .map(str::trim)
            .find(|s| !s.is_empty())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "API base URL is not configured (use --api-base or set {})",
                    API_BASE_ENV
                )
            })?;
        Ok(base.trim_end_matches('/').to_string())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_base_precedence() {
        let picked = Config::pick_api_base(
            Some("https://cli.example/api/"),
            Some("https://env.example/api"),
            Some("https://file.example/api"),
        )
        .expect("explicit base should win");
        assert_eq!(picked, "https://cli.example/api");

        let picked = Config::pick_api_base(None, Some("https://env.example/api"), Some("x"))
            .expect("env base should win over file");
        assert_eq!(picked, "https://env.example/api");

        let picked = Config::pick_api_base(None, Some("  "), Some("https://file.example/api"))
            .expect("blank env is ignored");
        assert_eq!(picked, "https://file.example/api");
    }

    #[test]
    fn test_api_base_missing() {
        let err = Config::pick_api_base(None, None, None).unwrap_err();
        assert!(err.to_string().contains(API_BASE_ENV));
    }

    #[test]
    fn test_request_timeout_default() {
        assert_eq!(Config::default().request_timeout(), Duration::from_secs(30));
        let config = Config {
            request_timeout_secs: Some(5),
            ..Config::default()
        };
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_config_roundtrip_json() {
        let json = r#"{"api_base": "https://portal.example/api", "last_identity": "1098765432"}"#;
        let config: Config = serde_json::from_str(json).expect("Failed to parse config");
        assert_eq!(config.api_base.as_deref(), Some("https://portal.example/api"));
        assert!(config.request_timeout_secs.is_none());
    }
}
