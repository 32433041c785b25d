//! The "due for a reminder" filter.
//!
//! A record is due when it belongs to the owner, is still `PENDING`, and its
//! expiration falls on a calendar day between today and `today + horizon`
//! (both inclusive) in the reference zone. The bound is expressed as the
//! half-open instant range `[starts_at, ends_before)`.
//!
//! Records that expired before they ever entered the window never match and
//! stay `PENDING`; nothing here cleans them up.

use chrono::{DateTime, Days, FixedOffset, NaiveDate, NaiveTime, TimeDelta, Utc};

use crate::inventory::{ExpiringItem, NotificationStatus};

/// Filter describing the records due for a reminder at a given instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpirationWindow {
    pub owner_id: String,
    pub status: NotificationStatus,
    /// Start of the current day in the reference zone
    pub starts_at: DateTime<Utc>,
    /// Start of the first day past the horizon
    pub ends_before: DateTime<Utc>,
    pub horizon_days: u32,
}

impl ExpirationWindow {
    /// Build the window for `owner_id` as seen at `now`.
    pub fn build(owner_id: &str, now: DateTime<Utc>, horizon_days: u32, tz: &FixedOffset) -> Self {
        let today = now.with_timezone(tz).date_naive();
        let past_horizon = today
            .checked_add_days(Days::new(u64::from(horizon_days) + 1))
            .unwrap_or(NaiveDate::MAX);

        Self {
            owner_id: owner_id.to_string(),
            status: NotificationStatus::Pending,
            starts_at: start_of_day(today, tz),
            ends_before: start_of_day(past_horizon, tz),
            horizon_days,
        }
    }

    /// Whether `expiration` falls inside the window's date range.
    pub fn contains(&self, expiration: DateTime<Utc>) -> bool {
        self.starts_at <= expiration && expiration < self.ends_before
    }

    /// Evaluate the full filter against a record.
    pub fn matches(&self, item: &ExpiringItem) -> bool {
        item.owner_id == self.owner_id
            && item.notification_status == self.status
            && item.expiration_date.is_some_and(|d| self.contains(d))
    }
}

/// UTC instant at which `date` begins in `tz`.
fn start_of_day(date: NaiveDate, tz: &FixedOffset) -> DateTime<Utc> {
    let local_midnight = date.and_time(NaiveTime::MIN);
    local_midnight
        .checked_sub_signed(TimeDelta::seconds(i64::from(tz.local_minus_utc())))
        .unwrap_or(local_midnight)
        .and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn item_expiring(at: DateTime<Utc>) -> ExpiringItem {
        ExpiringItem::new("item-1", "owner-1", "milk", at)
    }

    #[test]
    fn bounds_cover_today_through_horizon() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 15, 30, 0).unwrap();
        let window = ExpirationWindow::build("owner-1", now, 3, &utc());

        assert_eq!(window.starts_at, Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
        assert_eq!(window.ends_before, Utc.with_ymd_and_hms(2024, 6, 5, 0, 0, 0).unwrap());
        assert_eq!(window.status, NotificationStatus::Pending);
    }

    #[test]
    fn earlier_today_matches_and_day_four_does_not() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 15, 30, 0).unwrap();
        let window = ExpirationWindow::build("owner-1", now, 3, &utc());

        assert!(window.matches(&item_expiring(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap())));
        assert!(window.matches(&item_expiring(Utc.with_ymd_and_hms(2024, 6, 4, 23, 59, 59).unwrap())));
        assert!(!window.matches(&item_expiring(Utc.with_ymd_and_hms(2024, 6, 5, 0, 0, 0).unwrap())));
        assert!(!window.matches(&item_expiring(Utc.with_ymd_and_hms(2024, 5, 31, 23, 59, 59).unwrap())));
    }

    #[test]
    fn other_owner_and_sent_items_never_match() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
        let window = ExpirationWindow::build("owner-1", now, 3, &utc());
        let due = Utc.with_ymd_and_hms(2024, 6, 2, 8, 0, 0).unwrap();

        let mut foreign = item_expiring(due);
        foreign.owner_id = "owner-2".to_string();
        assert!(!window.matches(&foreign));

        let mut sent = item_expiring(due);
        sent.notification_status = NotificationStatus::Sent;
        assert!(!window.matches(&sent));

        let mut undated = item_expiring(due);
        undated.expiration_date = None;
        assert!(!window.matches(&undated));
    }

    #[test]
    fn reference_zone_moves_bounds() {
        let kst = FixedOffset::east_opt(9 * 3600).unwrap();
        // Already 2024-06-02 in KST.
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 20, 0, 0).unwrap();
        let window = ExpirationWindow::build("owner-1", now, 0, &kst);

        assert_eq!(window.starts_at, Utc.with_ymd_and_hms(2024, 6, 1, 15, 0, 0).unwrap());
        assert_eq!(window.ends_before, Utc.with_ymd_and_hms(2024, 6, 2, 15, 0, 0).unwrap());
    }
}
