//! Inventory store seam.
//!
//! The expiration job only ever needs two operations from the store: fetch
//! the records matching an [`ExpirationWindow`] and flip one record's
//! notification status. Both are awaited one at a time.
//!
//! - `memory`   → in-process store for embedding hosts and tests
//! - `database` → SQLite/Postgres store (requires the `database` feature)

use async_trait::async_trait;

use crate::errors::PantryResult;
use crate::inventory::{ExpiringItem, NotificationStatus};
use crate::window::ExpirationWindow;

pub mod memory;

#[cfg(feature = "database")]
pub mod database;

pub use memory::MemoryStore;

#[cfg(feature = "database")]
pub use database::Database;

/// Keyed record store holding inventory items per owner.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Records matching `window`, in store order.
    async fn query_due(&self, window: &ExpirationWindow) -> PantryResult<Vec<ExpiringItem>>;

    /// Set the notification status of a single record.
    async fn update_status(&self, item_id: &str, status: NotificationStatus) -> PantryResult<()>;
}
