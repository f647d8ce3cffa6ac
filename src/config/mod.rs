//! Configuration loading for the HR service.
//!
//! Loads layered `.env` files and environment variables prefixed with
//! `HR_`, producing a typed [`AppConfig`].

use std::{collections::BTreeMap, env, net::SocketAddr, path::PathBuf};

use chrono::{Duration, FixedOffset, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rules::attendance::AttendancePolicy;

const ENV_PREFIX: &str = "HR_";
const MIN_JWT_SECRET_LEN: usize = 32;
const DEV_JWT_SECRET: &str = "local-development-jwt-secret-not-for-production";

/// Application configuration derived from `HR_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AppConfig {
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default = "default_api_bind_addr")]
    pub api_bind_addr: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_db_acquire_timeout_ms")]
    pub db_acquire_timeout_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwt_secret: Option<String>,
    #[serde(default = "default_access_token_ttl_seconds")]
    pub access_token_ttl_seconds: u64,
    #[serde(default = "default_refresh_token_ttl_seconds")]
    pub refresh_token_ttl_seconds: u64,
    #[serde(default = "default_cors_allowed_origins")]
    pub cors_allowed_origins: Vec<String>,
    /// Nominal start of the working day, `HH:MM` in local time.
    #[serde(default = "default_work_start")]
    pub work_start: String,
    #[serde(default = "default_late_grace_minutes")]
    pub late_grace_minutes: u32,
    #[serde(default = "default_half_day_hours")]
    pub half_day_hours: u32,
    /// Offset from UTC that defines "local time" for attendance.
    #[serde(default)]
    pub utc_offset_minutes: i32,
    #[serde(default = "default_seed_admin_email")]
    pub seed_admin_email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_admin_password: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            api_bind_addr: default_api_bind_addr(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            database_url: default_database_url(),
            db_max_connections: default_db_max_connections(),
            db_acquire_timeout_ms: default_db_acquire_timeout_ms(),
            jwt_secret: None,
            access_token_ttl_seconds: default_access_token_ttl_seconds(),
            refresh_token_ttl_seconds: default_refresh_token_ttl_seconds(),
            cors_allowed_origins: default_cors_allowed_origins(),
            work_start: default_work_start(),
            late_grace_minutes: default_late_grace_minutes(),
            half_day_hours: default_half_day_hours(),
            utc_offset_minutes: 0,
            seed_admin_email: default_seed_admin_email(),
            seed_admin_password: None,
        }
    }
}

impl AppConfig {
    /// Returns the configured bind address as a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.api_bind_addr.parse()
    }

    fn is_dev_profile(&self) -> bool {
        matches!(self.profile.as_str(), "local" | "test")
    }

    /// Secret used to sign session tokens. Local and test profiles fall back
    /// to a fixed development secret when none is configured.
    pub fn jwt_secret(&self) -> Result<&str, ConfigError> {
        match self.jwt_secret.as_deref() {
            Some(secret) => Ok(secret),
            None if self.is_dev_profile() => Ok(DEV_JWT_SECRET),
            None => Err(ConfigError::MissingJwtSecret),
        }
    }

    /// Password for the bootstrap admin. Only local/test profiles get the
    /// well-known default.
    pub fn seed_admin_password(&self) -> Option<&str> {
        match self.seed_admin_password.as_deref() {
            Some(password) => Some(password),
            None if self.is_dev_profile() => Some("password"),
            None => None,
        }
    }

    /// Builds the attendance rules from the configured working hours.
    pub fn attendance_policy(&self) -> Result<AttendancePolicy, ConfigError> {
        let work_start = NaiveTime::parse_from_str(&self.work_start, "%H:%M").map_err(|_| {
            ConfigError::InvalidWorkStart {
                value: self.work_start.clone(),
            }
        })?;
        let offset = FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or(
            ConfigError::InvalidUtcOffset {
                value: self.utc_offset_minutes,
            },
        )?;

        Ok(AttendancePolicy {
            work_start,
            late_grace: Duration::minutes(i64::from(self.late_grace_minutes)),
            half_day_threshold: Duration::hours(i64::from(self.half_day_hours)),
            offset,
        })
    }

    /// Returns a redacted JSON representation (secrets are redacted).
    pub fn redacted_json(&self) -> serde_json::Result<String> {
        let mut config = self.clone();
        if config.jwt_secret.is_some() {
            config.jwt_secret = Some("[REDACTED]".to_string());
        }
        if config.seed_admin_password.is_some() {
            config.seed_admin_password = Some("[REDACTED]".to_string());
        }
        serde_json::to_string_pretty(&config)
    }

    /// Validates the configuration, returning an error if required settings are missing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let secret = self.jwt_secret()?;
        if secret.len() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::JwtSecretTooShort {
                length: secret.len(),
            });
        }

        if self.access_token_ttl_seconds == 0 {
            return Err(ConfigError::InvalidTokenTtl {
                field: "ACCESS_TOKEN_TTL_SECONDS",
                value: self.access_token_ttl_seconds,
            });
        }
        if self.refresh_token_ttl_seconds <= self.access_token_ttl_seconds {
            return Err(ConfigError::InvalidTokenTtl {
                field: "REFRESH_TOKEN_TTL_SECONDS",
                value: self.refresh_token_ttl_seconds,
            });
        }

        if self.db_max_connections == 0 {
            return Err(ConfigError::InvalidDbMaxConnections);
        }

        if self.half_day_hours == 0 || self.half_day_hours > 24 {
            return Err(ConfigError::InvalidHalfDayHours {
                value: self.half_day_hours,
            });
        }

        self.attendance_policy()?;
        Ok(())
    }
}

fn default_profile() -> String {
    "local".to_string()
}

fn default_api_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_database_url() -> String {
    "sqlite://hr_system.db?mode=rwc".to_string()
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_acquire_timeout_ms() -> u64 {
    5000
}

fn default_access_token_ttl_seconds() -> u64 {
    86_400
}

fn default_refresh_token_ttl_seconds() -> u64 {
    604_800
}

fn default_cors_allowed_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://localhost:3001".to_string(),
    ]
}

fn default_work_start() -> String {
    "09:00".to_string()
}

fn default_late_grace_minutes() -> u32 {
    15
}

fn default_half_day_hours() -> u32 {
    4
}

fn default_seed_admin_email() -> String {
    "admin@hr.com".to_string()
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load environment file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },
    #[error("invalid api bind address '{value}': {source}")]
    InvalidBindAddr {
        value: String,
        source: std::net::AddrParseError,
    },
    #[error("invalid value for {key}: '{value}'")]
    InvalidNumber { key: &'static str, value: String },
    #[error("JWT secret is missing; set HR_JWT_SECRET environment variable")]
    MissingJwtSecret,
    #[error("JWT secret must be at least 32 bytes, got {length} bytes")]
    JwtSecretTooShort { length: usize },
    #[error("{field} is out of range: {value}")]
    InvalidTokenTtl { field: &'static str, value: u64 },
    #[error("database max connections must be at least 1")]
    InvalidDbMaxConnections,
    #[error("work start must be formatted as HH:MM, got '{value}'")]
    InvalidWorkStart { value: String },
    #[error("half-day threshold must be between 1 and 24 hours, got {value}")]
    InvalidHalfDayHours { value: u32 },
    #[error("UTC offset of {value} minutes is out of range")]
    InvalidUtcOffset { value: i32 },
}

/// Loads configuration using layered `.env` files and `HR_*` env vars.
pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    /// Creates a new loader rooted at the current working directory.
    pub fn new() -> Self {
        Self {
            base_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Creates a loader rooted at the provided directory (useful for tests).
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Loads and validates configuration. The process environment wins over
    /// every dotenv layer.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let (mut layered, profile_hint) = self.collect_layered_env()?;

        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                layered.insert(stripped.to_string(), value);
            }
        }

        let profile = layered
            .remove("PROFILE")
            .filter(|v| !v.is_empty())
            .unwrap_or(profile_hint);
        let api_bind_addr = layered
            .remove("API_BIND_ADDR")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_api_bind_addr);
        let log_level = layered
            .remove("LOG_LEVEL")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_log_level);
        let log_format = layered
            .remove("LOG_FORMAT")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_log_format);
        let database_url = layered
            .remove("DATABASE_URL")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_database_url);
        let db_max_connections = parse_number(&mut layered, "DB_MAX_CONNECTIONS")?
            .unwrap_or_else(default_db_max_connections);
        let db_acquire_timeout_ms = parse_number(&mut layered, "DB_ACQUIRE_TIMEOUT_MS")?
            .unwrap_or_else(default_db_acquire_timeout_ms);

        let jwt_secret = layered
            .remove("JWT_SECRET")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        let access_token_ttl_seconds = parse_number(&mut layered, "ACCESS_TOKEN_TTL_SECONDS")?
            .unwrap_or_else(default_access_token_ttl_seconds);
        let refresh_token_ttl_seconds = parse_number(&mut layered, "REFRESH_TOKEN_TTL_SECONDS")?
            .unwrap_or_else(default_refresh_token_ttl_seconds);

        let cors_allowed_origins = layered
            .remove("CORS_ALLOWED_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|origins| !origins.is_empty())
            .unwrap_or_else(default_cors_allowed_origins);

        let work_start = layered
            .remove("WORK_START")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_work_start);
        let late_grace_minutes = parse_number(&mut layered, "LATE_GRACE_MINUTES")?
            .unwrap_or_else(default_late_grace_minutes);
        let half_day_hours =
            parse_number(&mut layered, "HALF_DAY_HOURS")?.unwrap_or_else(default_half_day_hours);
        let utc_offset_minutes = parse_number(&mut layered, "UTC_OFFSET_MINUTES")?.unwrap_or(0);

        let seed_admin_email = layered
            .remove("SEED_ADMIN_EMAIL")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_seed_admin_email);
        let seed_admin_password = layered.remove("SEED_ADMIN_PASSWORD").filter(|v| !v.is_empty());

        let config = AppConfig {
            profile,
            api_bind_addr,
            log_level,
            log_format,
            database_url,
            db_max_connections,
            db_acquire_timeout_ms,
            jwt_secret,
            access_token_ttl_seconds,
            refresh_token_ttl_seconds,
            cors_allowed_origins,
            work_start,
            late_grace_minutes,
            half_day_hours,
            utc_offset_minutes,
            seed_admin_email,
            seed_admin_password,
        };

        config.validate()?;

        match config.bind_addr() {
            Ok(_) => Ok(config),
            Err(source) => Err(ConfigError::InvalidBindAddr {
                value: config.api_bind_addr.clone(),
                source,
            }),
        }
    }

    fn collect_layered_env(&self) -> Result<(BTreeMap<String, String>, String), ConfigError> {
        let mut values = BTreeMap::new();

        self.merge_dotenv(self.base_dir.join(".env"), &mut values)?;
        self.merge_dotenv(self.base_dir.join(".env.local"), &mut values)?;

        let profile = env::var("HR_PROFILE")
            .ok()
            .or_else(|| values.get("PROFILE").cloned())
            .unwrap_or_else(default_profile);

        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}", &profile)),
            &mut values,
        )?;
        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}.local", &profile)),
            &mut values,
        )?;

        Ok((values, profile))
    }

    fn merge_dotenv(
        &self,
        path: PathBuf,
        values: &mut BTreeMap<String, String>,
    ) -> Result<(), ConfigError> {
        match dotenvy::from_path_iter(&path) {
            Ok(iter) => {
                for item in iter {
                    let (key, value) = item.map_err(|source| ConfigError::EnvFile {
                        path: path.clone(),
                        source,
                    })?;
                    if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                        values.insert(stripped.to_string(), value);
                    }
                }
                Ok(())
            }
            Err(dotenvy::Error::Io(ref io_err))
                if io_err.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(())
            }
            Err(err) => Err(ConfigError::EnvFile { path, source: err }),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_number<T: std::str::FromStr>(
    layered: &mut BTreeMap<String, String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    match layered.remove(key).filter(|v| !v.trim().is_empty()) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber { key, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid_for_local_profile() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.jwt_secret().unwrap(), DEV_JWT_SECRET);
        assert_eq!(config.seed_admin_password(), Some("password"));
    }

    #[test]
    fn production_profile_requires_jwt_secret() {
        let config = AppConfig {
            profile: "production".to_string(),
            ..AppConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingJwtSecret)
        ));
        assert_eq!(config.seed_admin_password(), None);
    }

    #[test]
    fn short_jwt_secret_is_rejected() {
        let config = AppConfig {
            jwt_secret: Some("too-short".to_string()),
            ..AppConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::JwtSecretTooShort { length: 9 })
        ));
    }

    #[test]
    fn refresh_ttl_must_exceed_access_ttl() {
        let config = AppConfig {
            access_token_ttl_seconds: 3600,
            refresh_token_ttl_seconds: 3600,
            ..AppConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTokenTtl { .. })
        ));
    }

    #[test]
    fn invalid_work_start_is_rejected() {
        let config = AppConfig {
            work_start: "9am".to_string(),
            ..AppConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidWorkStart { .. })
        ));
    }

    #[test]
    fn attendance_policy_reflects_settings() {
        let config = AppConfig {
            work_start: "08:30".to_string(),
            late_grace_minutes: 10,
            half_day_hours: 5,
            utc_offset_minutes: 330,
            ..AppConfig::default()
        };
        let policy = config.attendance_policy().unwrap();
        assert_eq!(policy.work_start, NaiveTime::from_hms_opt(8, 30, 0).unwrap());
        assert_eq!(policy.late_grace, Duration::minutes(10));
        assert_eq!(policy.half_day_threshold, Duration::hours(5));
        assert_eq!(policy.offset.local_minus_utc(), 330 * 60);
    }

    #[test]
    fn redacted_json_hides_secrets() {
        let config = AppConfig {
            jwt_secret: Some("super-secret-value-that-is-long-enough".to_string()),
            seed_admin_password: Some("hunter22".to_string()),
            ..AppConfig::default()
        };
        let json = config.redacted_json().unwrap();
        assert!(!json.contains("super-secret-value"));
        assert!(!json.contains("hunter22"));
        assert!(json.contains("[REDACTED]"));
    }
}
