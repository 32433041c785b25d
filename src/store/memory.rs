use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::errors::{PantryError, PantryResult};
use crate::inventory::{ExpiringItem, NotificationStatus};
use crate::window::ExpirationWindow;

use super::InventoryStore;

/// In-memory inventory store.
///
/// Records keep insertion order, which is the order `query_due` returns them in.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: RwLock<Vec<ExpiringItem>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-filled with `items`.
    pub fn with_items(items: impl IntoIterator<Item = ExpiringItem>) -> Self {
        Self {
            items: RwLock::new(items.into_iter().collect()),
        }
    }

    /// Insert a record, replacing any record with the same id in place.
    pub async fn insert(&self, item: ExpiringItem) {
        let mut items = self.items.write().await;
        match items.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => *existing = item,
            None => items.push(item),
        }
    }

    /// Fetch a record by id.
    pub async fn get(&self, item_id: &str) -> Option<ExpiringItem> {
        self.items
            .read()
            .await
            .iter()
            .find(|item| item.id == item_id)
            .cloned()
    }

    /// Snapshot of every record.
    pub async fn items(&self) -> Vec<ExpiringItem> {
        self.items.read().await.clone()
    }
}

#[async_trait]
impl InventoryStore for MemoryStore {
    async fn query_due(&self, window: &ExpirationWindow) -> PantryResult<Vec<ExpiringItem>> {
        Ok(self
            .items
            .read()
            .await
            .iter()
            .filter(|item| window.matches(item))
            .cloned()
            .collect())
    }

    async fn update_status(&self, item_id: &str, status: NotificationStatus) -> PantryResult<()> {
        let mut items = self.items.write().await;
        let item = items
            .iter_mut()
            .find(|item| item.id == item_id)
            .ok_or_else(|| PantryError::NotFound(item_id.to_string()))?;

        item.notification_status = status;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, FixedOffset, Utc};

    #[tokio::test]
    async fn query_preserves_insertion_order_and_filters() {
        let now = Utc::now();
        let store = MemoryStore::new();
        store.insert(ExpiringItem::new("b", "owner", "eggs", now + Duration::days(1))).await;
        store.insert(ExpiringItem::new("a", "owner", "milk", now + Duration::days(2))).await;
        store.insert(ExpiringItem::new("c", "other", "tofu", now + Duration::days(1))).await;
        store.insert(ExpiringItem::new("d", "owner", "kimchi", now + Duration::days(30))).await;

        let window = ExpirationWindow::build("owner", now, 3, &FixedOffset::east_opt(0).unwrap());
        let due: Vec<String> = store
            .query_due(&window)
            .await
            .unwrap()
            .into_iter()
            .map(|item| item.id)
            .collect();

        assert_eq!(due, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn update_unknown_item_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .update_status("missing", NotificationStatus::Sent)
            .await
            .unwrap_err();
        assert!(matches!(err, PantryError::NotFound(id) if id == "missing"));
    }

    #[tokio::test]
    async fn insert_replaces_in_place() {
        let now = Utc::now();
        let store = MemoryStore::with_items([
            ExpiringItem::new("a", "owner", "milk", now),
            ExpiringItem::new("b", "owner", "eggs", now),
        ]);
        store.insert(ExpiringItem::new("a", "owner", "oat milk", now)).await;

        let items = store.items().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].ingredient_name.as_deref(), Some("oat milk"));
    }
}
