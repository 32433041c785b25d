//! Configuration system for pantry-watch.
//!
//! Configuration is loaded from multiple sources with the following precedence:
//! 1. Environment variables (highest priority)
//! 2. `pantry.toml` file
//! 3. Default values (lowest priority)
//!
//! # Environment Variables
//!
//! - `PANTRY_DATABASE_TYPE` - Database backend (`sqlite` or `postgres`)
//! - `PANTRY_DATABASE_URL` - Database connection URL
//! - `PANTRY_LOGGING_ENABLED` - Enable the tracing subscriber
//! - `PANTRY_LOG_LEVEL` - Log level (trace, debug, info, warn, error)
//! - `PANTRY_OWNER_ID` - Inventory owner the daemon schedules checks for
//! - `PANTRY_CHECK_INTERVAL_HOURS` - Interval between expiration checks
//! - `PANTRY_HORIZON_DAYS` - Days ahead of today that count as "due"
//! - `PANTRY_UTC_OFFSET_MINUTES` - Reference time zone for day arithmetic
//! - `PANTRY_RUN_ON_START` - Run the check once when the daemon registers it
//! - `PANTRY_NOTIFICATION_SINK` - `log` or `webhook`
//! - `PANTRY_WEBHOOK_URL` - Target URL for the webhook sink
//! - `PANTRY_NOTIFICATIONS_PERMITTED` - Whether notifications may be posted

use chrono::FixedOffset;
use config::Config;
use serde::Deserialize;
use std::env;
use std::sync::OnceLock;
use std::time::Duration;

use crate::errors::{PantryError, PantryResult};
use crate::validation::validate_channel_id;

/// Global configuration singleton.
static CONFIG: OnceLock<PantryConfig> = OnceLock::new();

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PantryConfig {
    /// Database configuration
    pub database: DatabaseConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Expiration check scheduling
    pub jobs: JobsConfig,
    /// Notification delivery
    pub notifications: NotificationConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database type: "sqlite" or "postgres"
    pub db_type: String,
    /// SQLite connection URL
    pub sqlite_url: String,
    /// PostgreSQL connection URL
    pub postgres_url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            db_type: "sqlite".to_string(),
            sqlite_url: "sqlite://pantry.db?mode=rwc".to_string(),
            postgres_url: "postgres://localhost/pantry".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Enable logging
    pub enabled: bool,
    /// Log level: trace, debug, info, warn, error
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
        }
    }
}

/// Scheduling and retry settings for the expiration check.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JobsConfig {
    /// Unique registration name of the recurring check
    pub name: String,
    /// Hours between two scheduled runs
    pub interval_hours: u64,
    /// Number of days after today that are still inside the due window
    pub horizon_days: u32,
    /// Offset from UTC, in minutes, used to decide calendar days
    pub utc_offset_minutes: i32,
    /// Owner whose inventory the daemon checks
    pub owner_id: Option<String>,
    /// First retry delay after a transient failure
    pub retry_initial_secs: u64,
    /// Upper bound for the retry delay
    pub retry_max_secs: u64,
    /// Attempts per scheduled run, including the first one
    pub retry_max_attempts: u32,
    /// Run the check once as soon as a fresh registration is created
    pub run_on_start: bool,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            name: "expirationCheckWork".to_string(),
            interval_hours: 24,
            horizon_days: 3,
            utc_offset_minutes: 0,
            owner_id: None,
            retry_initial_secs: 30,
            retry_max_secs: 5 * 60 * 60,
            retry_max_attempts: 5,
            run_on_start: true,
        }
    }
}

impl JobsConfig {
    /// Interval between scheduled runs.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_hours * 60 * 60)
    }

    /// Reference time zone for calendar-day arithmetic.
    pub fn reference_zone(&self) -> PantryResult<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or_else(|| {
            PantryError::ConfigError(format!(
                "jobs.utc_offset_minutes out of range: {}",
                self.utc_offset_minutes
            ))
        })
    }
}

/// Notification delivery configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Sink kind: "log" or "webhook"
    pub sink: String,
    /// Target URL when `sink = "webhook"`
    pub webhook_url: Option<String>,
    /// Whether the user allowed notifications
    pub permission_granted: bool,
    /// Stable channel identifier
    pub channel_id: String,
    /// Channel display name
    pub channel_name: String,
    /// Channel description
    pub channel_description: String,
    /// Title shown on every reminder
    pub title: String,
    /// Where tapping a reminder leads
    pub tap_target: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            sink: "log".to_string(),
            webhook_url: None,
            permission_granted: true,
            channel_id: "EXPIRATION_REMINDER_CHANNEL".to_string(),
            channel_name: "Expiration reminders".to_string(),
            channel_description: "Reminders for ingredients that are about to expire."
                .to_string(),
            title: "Expiring soon".to_string(),
            tap_target: "pantry".to_string(),
        }
    }
}

fn config_err(e: config::ConfigError) -> PantryError {
    PantryError::ConfigError(e.to_string())
}

impl PantryConfig {
    /// Load configuration from file and environment.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. `pantry.toml` file (optional)
    /// 3. Environment variables
    pub fn load() -> PantryResult<Self> {
        let defaults = PantryConfig::default();

        let builder = Config::builder()
            .set_default("database.db_type", defaults.database.db_type)
            .map_err(config_err)?
            .set_default("database.sqlite_url", defaults.database.sqlite_url)
            .map_err(config_err)?
            .set_default("database.postgres_url", defaults.database.postgres_url)
            .map_err(config_err)?
            .set_default("logging.enabled", defaults.logging.enabled)
            .map_err(config_err)?
            .set_default("logging.level", defaults.logging.level)
            .map_err(config_err)?
            .set_default("jobs.name", defaults.jobs.name)
            .map_err(config_err)?
            .set_default("jobs.interval_hours", defaults.jobs.interval_hours as i64)
            .map_err(config_err)?
            .set_default("jobs.horizon_days", defaults.jobs.horizon_days as i64)
            .map_err(config_err)?
            .set_default("jobs.utc_offset_minutes", defaults.jobs.utc_offset_minutes as i64)
            .map_err(config_err)?
            .set_default("jobs.retry_initial_secs", defaults.jobs.retry_initial_secs as i64)
            .map_err(config_err)?
            .set_default("jobs.retry_max_secs", defaults.jobs.retry_max_secs as i64)
            .map_err(config_err)?
            .set_default("jobs.retry_max_attempts", defaults.jobs.retry_max_attempts as i64)
            .map_err(config_err)?
            .set_default("jobs.run_on_start", defaults.jobs.run_on_start)
            .map_err(config_err)?
            .set_default("notifications.sink", defaults.notifications.sink)
            .map_err(config_err)?
            .set_default(
                "notifications.permission_granted",
                defaults.notifications.permission_granted,
            )
            .map_err(config_err)?
            // Load from pantry.toml (optional)
            .add_source(config::File::with_name("pantry").required(false))
            // Override with environment variables
            .set_override_option("database.db_type", env::var("PANTRY_DATABASE_TYPE").ok())
            .map_err(config_err)?
            .set_override_option(
                "database.sqlite_url",
                env::var("PANTRY_DATABASE_URL")
                    .ok()
                    .filter(|url| url.starts_with("sqlite")),
            )
            .map_err(config_err)?
            .set_override_option(
                "database.postgres_url",
                env::var("PANTRY_DATABASE_URL")
                    .ok()
                    .filter(|url| url.starts_with("postgres")),
            )
            .map_err(config_err)?
            .set_override_option(
                "logging.enabled",
                env::var("PANTRY_LOGGING_ENABLED")
                    .ok()
                    .and_then(|v| v.parse::<bool>().ok()),
            )
            .map_err(config_err)?
            .set_override_option("logging.level", env::var("PANTRY_LOG_LEVEL").ok())
            .map_err(config_err)?
            .set_override_option("jobs.owner_id", env::var("PANTRY_OWNER_ID").ok())
            .map_err(config_err)?
            .set_override_option(
                "jobs.interval_hours",
                env::var("PANTRY_CHECK_INTERVAL_HOURS")
                    .ok()
                    .and_then(|v| v.parse::<i64>().ok()),
            )
            .map_err(config_err)?
            .set_override_option(
                "jobs.horizon_days",
                env::var("PANTRY_HORIZON_DAYS")
                    .ok()
                    .and_then(|v| v.parse::<i64>().ok()),
            )
            .map_err(config_err)?
            .set_override_option(
                "jobs.utc_offset_minutes",
                env::var("PANTRY_UTC_OFFSET_MINUTES")
                    .ok()
                    .and_then(|v| v.parse::<i64>().ok()),
            )
            .map_err(config_err)?
            .set_override_option(
                "jobs.run_on_start",
                env::var("PANTRY_RUN_ON_START")
                    .ok()
                    .and_then(|v| v.parse::<bool>().ok()),
            )
            .map_err(config_err)?
            .set_override_option("notifications.sink", env::var("PANTRY_NOTIFICATION_SINK").ok())
            .map_err(config_err)?
            .set_override_option(
                "notifications.webhook_url",
                env::var("PANTRY_WEBHOOK_URL").ok(),
            )
            .map_err(config_err)?
            .set_override_option(
                "notifications.permission_granted",
                env::var("PANTRY_NOTIFICATIONS_PERMITTED")
                    .ok()
                    .and_then(|v| v.parse::<bool>().ok()),
            )
            .map_err(config_err)?;

        let settings = builder
            .build()
            .map_err(|e| PantryError::ConfigError(format!("failed to build config: {e}")))?;

        settings
            .try_deserialize()
            .map_err(|e| PantryError::ConfigError(format!("failed to deserialize config: {e}")))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> PantryResult<()> {
        match self.database.db_type.as_str() {
            "sqlite" | "postgres" => {}
            other => {
                return Err(PantryError::ConfigError(format!(
                    "database.db_type must be 'sqlite' or 'postgres', got '{other}'"
                )));
            }
        }

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(PantryError::ConfigError(format!(
                    "logging.level must be one of: trace, debug, info, warn, error. Got '{other}'"
                )));
            }
        }

        if self.jobs.name.trim().is_empty() {
            return Err(PantryError::ConfigError(
                "jobs.name cannot be empty".to_string(),
            ));
        }
        if self.jobs.interval_hours == 0 {
            return Err(PantryError::ConfigError(
                "jobs.interval_hours must be greater than 0".to_string(),
            ));
        }
        if self.jobs.retry_max_attempts == 0 {
            return Err(PantryError::ConfigError(
                "jobs.retry_max_attempts must be at least 1".to_string(),
            ));
        }
        self.jobs.reference_zone()?;

        validate_channel_id(&self.notifications.channel_id, "notifications.channel_id")
            .map_err(|e| PantryError::ConfigError(e.to_string()))?;

        match self.notifications.sink.as_str() {
            "log" => {}
            "webhook" => {
                if self
                    .notifications
                    .webhook_url
                    .as_deref()
                    .map_or(true, |url| url.trim().is_empty())
                {
                    return Err(PantryError::ConfigError(
                        "notifications.webhook_url is required when notifications.sink is 'webhook'"
                            .to_string(),
                    ));
                }
            }
            other => {
                return Err(PantryError::ConfigError(format!(
                    "notifications.sink must be 'log' or 'webhook', got '{other}'"
                )));
            }
        }

        Ok(())
    }
}

/// Get the global configuration.
///
/// This loads the configuration on first access and caches it.
/// Returns an error if configuration loading or validation fails.
pub fn get_config() -> PantryResult<&'static PantryConfig> {
    if let Some(config) = CONFIG.get() {
        return Ok(config);
    }

    let config = PantryConfig::load()?;
    config.validate()?;

    // Another thread may have won the race; either value is valid.
    Ok(CONFIG.get_or_init(|| config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = PantryConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.jobs.name, "expirationCheckWork");
        assert_eq!(config.jobs.interval(), Duration::from_secs(86_400));
        assert_eq!(config.jobs.horizon_days, 3);
    }

    #[test]
    fn webhook_sink_requires_url() {
        let mut config = PantryConfig::default();
        config.notifications.sink = "webhook".to_string();
        assert!(config.validate().is_err());

        config.notifications.webhook_url = Some("http://localhost:9000/hook".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_zero_interval() {
        let mut config = PantryConfig::default();
        config.jobs.interval_hours = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_offset() {
        let mut config = PantryConfig::default();
        config.jobs.utc_offset_minutes = 24 * 60;
        assert!(config.validate().is_err());

        config.jobs.utc_offset_minutes = 9 * 60;
        let zone = config.jobs.reference_zone().unwrap();
        assert_eq!(zone.local_minus_utc(), 9 * 3600);
    }
}
