use serial_test::serial;
use std::env;
use std::time::Duration;

use pantry_watch::config::PantryConfig;

const VARS: &[&str] = &[
    "PANTRY_DATABASE_TYPE",
    "PANTRY_DATABASE_URL",
    "PANTRY_LOG_LEVEL",
    "PANTRY_OWNER_ID",
    "PANTRY_CHECK_INTERVAL_HOURS",
    "PANTRY_HORIZON_DAYS",
    "PANTRY_UTC_OFFSET_MINUTES",
    "PANTRY_NOTIFICATION_SINK",
    "PANTRY_WEBHOOK_URL",
    "PANTRY_NOTIFICATIONS_PERMITTED",
    "PANTRY_RUN_ON_START",
];

fn clear_env() {
    for var in VARS {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn load_without_overrides_uses_defaults() {
    clear_env();

    let config = PantryConfig::load().expect("config loads");

    assert_eq!(config.database.db_type, "sqlite");
    assert_eq!(config.jobs.name, "expirationCheckWork");
    assert_eq!(config.jobs.interval(), Duration::from_secs(24 * 60 * 60));
    assert_eq!(config.jobs.horizon_days, 3);
    assert!(config.jobs.owner_id.is_none());
    assert_eq!(config.notifications.sink, "log");
    assert!(config.notifications.permission_granted);
    assert!(config.jobs.run_on_start);
    assert!(config.validate().is_ok());
}

#[test]
#[serial]
fn env_overrides_take_precedence() {
    clear_env();
    env::set_var("PANTRY_OWNER_ID", "owner-uid");
    env::set_var("PANTRY_CHECK_INTERVAL_HOURS", "6");
    env::set_var("PANTRY_HORIZON_DAYS", "5");
    env::set_var("PANTRY_UTC_OFFSET_MINUTES", "540");
    env::set_var("PANTRY_NOTIFICATION_SINK", "webhook");
    env::set_var("PANTRY_WEBHOOK_URL", "http://localhost:9000/push");
    env::set_var("PANTRY_NOTIFICATIONS_PERMITTED", "false");
    env::set_var("PANTRY_RUN_ON_START", "false");

    let config = PantryConfig::load().expect("config loads");
    clear_env();

    assert_eq!(config.jobs.owner_id.as_deref(), Some("owner-uid"));
    assert_eq!(config.jobs.interval(), Duration::from_secs(6 * 60 * 60));
    assert_eq!(config.jobs.horizon_days, 5);
    assert_eq!(config.jobs.reference_zone().unwrap().local_minus_utc(), 9 * 3600);
    assert_eq!(config.notifications.sink, "webhook");
    assert_eq!(
        config.notifications.webhook_url.as_deref(),
        Some("http://localhost:9000/push")
    );
    assert!(!config.notifications.permission_granted);
    assert!(!config.jobs.run_on_start);
    assert!(config.validate().is_ok());
}

#[test]
#[serial]
fn database_url_is_routed_by_scheme() {
    clear_env();
    env::set_var("PANTRY_DATABASE_TYPE", "postgres");
    env::set_var("PANTRY_DATABASE_URL", "postgres://db.internal/pantry");

    let config = PantryConfig::load().expect("config loads");
    clear_env();

    assert_eq!(config.database.db_type, "postgres");
    assert_eq!(config.database.postgres_url, "postgres://db.internal/pantry");
    assert_eq!(config.database.sqlite_url, "sqlite://pantry.db?mode=rwc");
}

#[test]
#[serial]
fn unparsable_numbers_fall_back_to_defaults() {
    clear_env();
    env::set_var("PANTRY_HORIZON_DAYS", "three");

    let config = PantryConfig::load().expect("config loads");
    clear_env();

    assert_eq!(config.jobs.horizon_days, 3);
}

#[test]
#[serial]
fn invalid_values_fail_validation() {
    clear_env();
    env::set_var("PANTRY_NOTIFICATION_SINK", "carrier-pigeon");
    env::set_var("PANTRY_LOG_LEVEL", "loud");

    let config = PantryConfig::load().expect("config loads");
    clear_env();

    assert!(config.validate().is_err());
}

#[test]
fn channel_id_must_be_a_plain_identifier() {
    let mut config = PantryConfig::default();
    config.notifications.channel_id = "expiration reminders".to_string();
    assert!(config.validate().is_err());
}
