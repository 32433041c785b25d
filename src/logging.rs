//! Tracing setup and structured item events.
//!
//! Job failures never reach a user interface; they are only observable
//! through these logs and through the scheduler's retry bookkeeping.

use std::sync::Once;

use tracing::{info, info_span, warn, Level};

use crate::config::LoggingConfig;

static INIT: Once = Once::new();

/// Install the global fmt subscriber according to `config`.
///
/// Later calls are no-ops, as is a call with logging disabled.
pub fn init_logging(config: &LoggingConfig) {
    if !config.enabled {
        return;
    }

    let level = parse_level(&config.level);
    INIT.call_once(|| {
        // A host application may already own the global subscriber.
        let _ = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_target(true)
            .try_init();
    });
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// State changes and decisions taken for a single inventory record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemEvent {
    /// A reminder was posted
    Notified,
    /// Status moved to SENT
    MarkedSent,
    /// Record was not processed
    Skipped,
    /// Reminder withheld because notifications are not permitted
    PermissionDenied,
    /// Reminder could not be delivered
    DeliveryFailed,
    /// Status update failed after a reminder was posted
    UpdateFailed,
}

impl std::fmt::Display for ItemEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ItemEvent::Notified => "notified",
            ItemEvent::MarkedSent => "marked_sent",
            ItemEvent::Skipped => "skipped",
            ItemEvent::PermissionDenied => "permission_denied",
            ItemEvent::DeliveryFailed => "delivery_failed",
            ItemEvent::UpdateFailed => "update_failed",
        };
        write!(f, "{}", s)
    }
}

/// Log an item event inside an `item_event` span.
///
/// # Arguments
///
/// * `event` - What happened to the record
/// * `item_id` - Store identifier of the record
/// * `details` - Optional additional context
pub fn log_item_event(event: ItemEvent, item_id: &str, details: Option<&str>) {
    let span = info_span!(
        "item_event",
        event = %event,
        item_id = %item_id,
    );
    let _enter = span.enter();

    match event {
        ItemEvent::Skipped
        | ItemEvent::PermissionDenied
        | ItemEvent::DeliveryFailed
        | ItemEvent::UpdateFailed => {
            if let Some(d) = details {
                warn!(reason = %d, "Item event occurred");
            } else {
                warn!("Item event occurred");
            }
        }
        _ => {
            if let Some(d) = details {
                info!(details = %d, "Item event occurred");
            } else {
                info!("Item event occurred");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_parsing_defaults_to_info() {
        assert_eq!(parse_level("DEBUG"), Level::DEBUG);
        assert_eq!(parse_level("warn"), Level::WARN);
        assert_eq!(parse_level("verbose"), Level::INFO);
    }

    #[test]
    fn event_names_are_snake_case() {
        assert_eq!(ItemEvent::MarkedSent.to_string(), "marked_sent");
        assert_eq!(ItemEvent::PermissionDenied.to_string(), "permission_denied");
    }

    #[test]
    fn disabled_logging_is_a_noop() {
        let config = LoggingConfig {
            enabled: false,
            level: "debug".to_string(),
        };
        init_logging(&config);
        log_item_event(ItemEvent::Skipped, "item-1", Some("no name"));
    }
}
