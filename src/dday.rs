//! Calendar-day distance between "now" and an expiration date.
//!
//! Both instants are projected into the same reference time zone and reduced
//! to their calendar day before subtracting, so the time of day never affects
//! the result. Any screen that shows a D-Day badge must use the same zone as
//! the expiration job, otherwise the two disagree around midnight.

use chrono::{DateTime, TimeZone, Utc};
use std::fmt;

/// Whole calendar days from `now` until `expiration`.
///
/// `0` means the item expires today; negative values mean it already expired.
///
/// # Example
/// ```
/// use chrono::{FixedOffset, TimeZone, Utc};
/// use pantry_watch::dday::days_remaining;
///
/// let utc = FixedOffset::east_opt(0).unwrap();
/// let now = Utc.with_ymd_and_hms(2024, 5, 1, 23, 0, 0).unwrap();
/// let expires = Utc.with_ymd_and_hms(2024, 5, 3, 1, 0, 0).unwrap();
/// assert_eq!(days_remaining(now, expires, &utc), 2);
/// ```
pub fn days_remaining<Tz: TimeZone>(now: DateTime<Utc>, expiration: DateTime<Utc>, tz: &Tz) -> i64 {
    let today = now.with_timezone(tz).date_naive();
    let expiry_day = expiration.with_timezone(tz).date_naive();
    (expiry_day - today).num_days()
}

/// D-Day classification used by display layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DDay {
    /// Expired this many days ago
    Expired(i64),
    Today,
    /// Expires in this many days
    Upcoming(i64),
}

/// How urgently an item should be highlighted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Urgency {
    Expired,
    Today,
    /// One week or less left
    Soon,
    Later,
}

/// Days left at or below which an item counts as [`Urgency::Soon`].
pub const SOON_THRESHOLD_DAYS: i64 = 7;

impl DDay {
    pub fn from_days(days: i64) -> Self {
        match days {
            d if d < 0 => DDay::Expired(-d),
            0 => DDay::Today,
            d => DDay::Upcoming(d),
        }
    }

    pub fn compute<Tz: TimeZone>(now: DateTime<Utc>, expiration: DateTime<Utc>, tz: &Tz) -> Self {
        Self::from_days(days_remaining(now, expiration, tz))
    }

    pub fn urgency(&self) -> Urgency {
        match *self {
            DDay::Expired(_) => Urgency::Expired,
            DDay::Today => Urgency::Today,
            DDay::Upcoming(d) if d <= SOON_THRESHOLD_DAYS => Urgency::Soon,
            DDay::Upcoming(_) => Urgency::Later,
        }
    }
}

impl fmt::Display for DDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DDay::Expired(_) => f.write_str("Expired"),
            DDay::Today => f.write_str("D-Day"),
            DDay::Upcoming(d) => write!(f, "D-{d}"),
        }
    }
}
