//! Configuration management for the ZenCorp service.
//!
//! Configuration can be set via environment variables:
//! - `HOST` - Optional. Server host. Defaults to `127.0.0.1`.
//! - `PORT` - Optional. Server port. Defaults to `3000`.
//! - `DEV_MODE` - Optional. Disables the auth middleware. Defaults to `true`.
//! - `JWT_SECRET` - Required when `DEV_MODE=false`. Signs session tokens.
//! - `JWT_TTL_DAYS` - Optional. Session lifetime. Defaults to `30`.
//! - `DATA_DIR` - Optional. Where the SQLite file lives. Defaults to `./data`.
//! - `STORE_TYPE` - Optional. `memory` or `sqlite`. Defaults to `sqlite`.
//! - `HR_HEAD_ID` - Optional. User id of the HR head reviewing chains. Defaults to `u-hr-1`.
//! - `WORKDAY_START` - Optional. `HH:MM` after which a clock-in is late. Defaults to `09:00`.
//! - `SUBTASK_GATE_ROLES` - Optional. Roles that must finish every sub-task
//!   before completing a task. Defaults to `employee`.
//! - `EVENT_BUFFER` - Optional. Change feed capacity per subscriber. Defaults to `1024`.

use chrono::NaiveTime;
use std::path::PathBuf;
use thiserror::Error;

use crate::store::StoreType;
use crate::util::{env_var_bool, parse_clock};
use crate::workflow::CompletionPolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Session token settings.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: Option<String>,
    pub jwt_ttl_days: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            jwt_ttl_days: 30,
        }
    }
}

impl AuthConfig {
    /// Whether requests must carry a valid token.
    pub fn auth_required(&self, dev_mode: bool) -> bool {
        !dev_mode
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub dev_mode: bool,
    pub auth: AuthConfig,
    pub data_dir: PathBuf,
    pub store_type: StoreType,
    /// Reviewer stamped on new tasks and seeded as the HR head account
    pub hr_head_id: String,
    pub workday_start: NaiveTime,
    pub completion_policy: CompletionPolicy,
    pub event_buffer: usize,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    /// Returns `ConfigError::MissingEnvVar` if `JWT_SECRET` is unset outside
    /// dev mode, and `ConfigError::InvalidValue` for unparsable numbers or times.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue("PORT".to_string(), format!("{}", e)))?;

        let dev_mode = env_var_bool("DEV_MODE", true);

        let jwt_secret = std::env::var("JWT_SECRET").ok().filter(|s| !s.is_empty());
        if !dev_mode && jwt_secret.is_none() {
            return Err(ConfigError::MissingEnvVar("JWT_SECRET".to_string()));
        }
        let jwt_ttl_days = std::env::var("JWT_TTL_DAYS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue("JWT_TTL_DAYS".to_string(), format!("{}", e)))?;

        let data_dir = std::env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));

        let store_type = std::env::var("STORE_TYPE")
            .map(|v| StoreType::parse(&v))
            .unwrap_or_default();

        let hr_head_id = std::env::var("HR_HEAD_ID").unwrap_or_else(|_| "u-hr-1".to_string());

        let raw_start = std::env::var("WORKDAY_START").unwrap_or_else(|_| "09:00".to_string());
        let workday_start = parse_clock(&raw_start).ok_or_else(|| {
            ConfigError::InvalidValue("WORKDAY_START".to_string(), raw_start.clone())
        })?;

        let completion_policy = std::env::var("SUBTASK_GATE_ROLES")
            .map(|v| CompletionPolicy::parse(&v))
            .unwrap_or_default();

        let event_buffer = std::env::var("EVENT_BUFFER")
            .unwrap_or_else(|_| "1024".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue("EVENT_BUFFER".to_string(), format!("{}", e)))?;

        Ok(Self {
            host,
            port,
            dev_mode,
            auth: AuthConfig {
                jwt_secret,
                jwt_ttl_days,
            },
            data_dir,
            store_type,
            hr_head_id,
            workday_start,
            completion_policy,
            event_buffer,
        })
    }

    /// In-memory, dev-mode config (useful for testing).
    pub fn for_tests() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            dev_mode: true,
            auth: AuthConfig {
                jwt_secret: Some("test-secret".to_string()),
                jwt_ttl_days: 1,
            },
            data_dir: PathBuf::from("./data"),
            store_type: StoreType::Memory,
            hr_head_id: "u-hr-1".to_string(),
            workday_start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            completion_policy: CompletionPolicy::default(),
            event_buffer: 64,
        }
    }
}
