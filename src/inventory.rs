//! Inventory records tracked for expiration reminders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Reminder lifecycle of a single inventory record.
///
/// Only `Pending -> Sent` is ever performed by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationStatus {
    #[default]
    Pending,
    Sent,
}

impl NotificationStatus {
    /// Representation used by the store.
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Pending => "PENDING",
            NotificationStatus::Sent => "SENT",
        }
    }
}

impl fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored status string that is neither `PENDING` nor `SENT`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown notification status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for NotificationStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(NotificationStatus::Pending),
            "SENT" => Ok(NotificationStatus::Sent),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// One inventory record eligible for expiration tracking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiringItem {
    /// Store-assigned identifier
    pub id: String,
    /// Owner of the inventory the record belongs to
    pub owner_id: String,
    /// Display label; records without one are never notified
    pub ingredient_name: Option<String>,
    /// Expiration instant; only its calendar day matters
    pub expiration_date: Option<DateTime<Utc>>,
    pub notification_status: NotificationStatus,
}

impl ExpiringItem {
    /// Create a pending record.
    pub fn new(
        id: impl Into<String>,
        owner_id: impl Into<String>,
        ingredient_name: impl Into<String>,
        expiration_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            owner_id: owner_id.into(),
            ingredient_name: Some(ingredient_name.into()),
            expiration_date: Some(expiration_date),
            notification_status: NotificationStatus::Pending,
        }
    }

    /// Non-empty ingredient name, if any.
    pub fn display_name(&self) -> Option<&str> {
        self.ingredient_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
    }

    /// Whether the record carries everything needed to build a reminder.
    pub fn is_processable(&self) -> bool {
        self.display_name().is_some() && self.expiration_date.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_store_strings() {
        assert_eq!("PENDING".parse::<NotificationStatus>().unwrap(), NotificationStatus::Pending);
        assert_eq!("SENT".parse::<NotificationStatus>().unwrap(), NotificationStatus::Sent);
        let err = "sent".parse::<NotificationStatus>().unwrap_err();
        assert_eq!(err, UnknownStatus("sent".to_string()));
        assert_eq!(err.to_string(), "unknown notification status 'sent'");
    }

    #[test]
    fn blank_name_is_not_processable() {
        let mut item = ExpiringItem::new("a", "owner", "milk", Utc::now());
        assert!(item.is_processable());

        item.ingredient_name = Some("  ".to_string());
        assert!(!item.is_processable());

        item.ingredient_name = Some("milk".to_string());
        item.expiration_date = None;
        assert!(!item.is_processable());
    }
}
