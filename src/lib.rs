//! pantry-watch - expiration reminders for a household food inventory
//!
//! A recurring background job scans an owner's inventory for items that
//! expire within the next few days and posts one reminder per item. The
//! `notificationStatus` flag stored on each record (`PENDING` → `SENT`)
//! guarantees an item is never reminded twice.
//!
//! # Features
//!
//! - `database` - SQL inventory store.
//! - `sqlite` - SQLite backend. Enabled by default.
//! - `postgres` - PostgreSQL backend.
//!
//! # Example
//!
//! ```toml
//! # Use defaults (SQLite store)
//! pantry-watch = { path = "." }
//!
//! # Bring your own store (no SQL dependencies)
//! pantry-watch = { path = ".", default-features = false }
//! ```

pub mod config;
pub mod dday;
pub mod errors;
pub mod inventory;
pub mod jobs;
pub mod logging;
pub mod notify;
pub mod store;
pub mod validation;
pub mod window;

pub use errors::{PantryError, PantryResult};
pub use inventory::{ExpiringItem, NotificationStatus, UnknownStatus};
pub use jobs::{ExpirationCheckJob, JobInput, JobOutcome, RegistrationGuard};
pub use window::ExpirationWindow;
