//! Run configuration.
//!
//! [`Settings::load`] reads a TOML file once at startup. A missing file is fatal; the
//! API token may come from `PAGERDUTY_API_TOKEN` instead of the file.

use std::path::Path;

use serde::Deserialize;

use crate::error::AppError;

pub const TOKEN_ENV: &str = "PAGERDUTY_API_TOKEN";
pub const DEFAULT_BASE_URL: &str = "https://api.pagerduty.com";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub api_token: String,
    pub escalation_policies: Vec<String>,
    #[serde(default = "default_days")]
    pub default_days: u32,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_days() -> u32 {
    7
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn invalid(message: &str) -> AppError {
    AppError::new("CONFIG_INVALID", message)
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            let code = if e.kind() == std::io::ErrorKind::NotFound {
                "CONFIG_NOT_FOUND"
            } else {
                "CONFIG_READ_FAILED"
            };
            AppError::new(code, "Failed to read configuration file")
                .with_details(format!("path={}; err={e}", path.display()))
        })?;
        Self::from_toml_str(&text, std::env::var(TOKEN_ENV).ok())
    }

    /// Parse and validate. `env_token` fills in an empty `api_token`.
    pub fn from_toml_str(text: &str, env_token: Option<String>) -> Result<Self, AppError> {
        let mut settings: Settings = toml::from_str(text).map_err(|e| {
            AppError::new("CONFIG_INVALID", "Failed to parse configuration")
                .with_details(e.to_string())
        })?;

        if settings.api_token.trim().is_empty() {
            settings.api_token = env_token.unwrap_or_default();
        }
        settings.base_url = settings.base_url.trim_end_matches('/').to_string();
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.api_token.trim().is_empty() {
            return Err(invalid("API token is required")
                .with_details(format!("set api_token or {TOKEN_ENV}")));
        }
        if self.escalation_policies.is_empty()
            || self.escalation_policies.iter().any(|p| p.trim().is_empty())
        {
            return Err(invalid("At least one non-empty escalation policy id is required"));
        }
        if self.default_days == 0 {
            return Err(invalid("default_days must be at least 1"));
        }
        if self.timeout_secs == 0 {
            return Err(invalid("timeout_secs must be at least 1"));
        }
        Ok(())
    }
}
