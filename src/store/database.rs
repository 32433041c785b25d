use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{query, query_as, FromRow};
use tracing::{error, warn};

#[cfg(feature = "sqlite")]
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

#[cfg(feature = "postgres")]
use sqlx::PgPool;

use crate::config::{get_config, DatabaseConfig};
use crate::errors::{PantryError, PantryResult};
use crate::inventory::{ExpiringItem, NotificationStatus};
use crate::window::ExpirationWindow;

use super::InventoryStore;

/// Raw row of the `expiring_ingredients` table.
///
/// The status column stays a string here; it is turned into
/// [`NotificationStatus`] on the way out of this module.
#[derive(Debug, Clone, FromRow)]
struct ExpiringItemRow {
    id: String,
    owner_id: String,
    ingredient_name: Option<String>,
    expiration_date: Option<DateTime<Utc>>,
    notification_status: String,
}

impl TryFrom<ExpiringItemRow> for ExpiringItem {
    type Error = PantryError;

    fn try_from(row: ExpiringItemRow) -> Result<Self, Self::Error> {
        let notification_status = row
            .notification_status
            .parse::<NotificationStatus>()
            .map_err(|e| PantryError::InvalidRecord {
                id: row.id.clone(),
                reason: e.to_string(),
            })?;

        Ok(ExpiringItem {
            id: row.id,
            owner_id: row.owner_id,
            ingredient_name: row.ingredient_name,
            expiration_date: row.expiration_date,
            notification_status,
        })
    }
}

fn rows_to_items(rows: Vec<ExpiringItemRow>) -> Vec<ExpiringItem> {
    rows.into_iter()
        .filter_map(|row| match ExpiringItem::try_from(row) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!("Ignoring unreadable inventory row: {e}");
                None
            }
        })
        .collect()
}

/// SQL inventory store over SQLite and Postgres.
///
/// Available variants depend on enabled features:
/// - `sqlite` feature enables `Database::SQLite`
/// - `postgres` feature enables `Database::Postgres`
#[derive(Debug, Clone)]
pub enum Database {
    #[cfg(feature = "sqlite")]
    SQLite(SqlitePool),
    #[cfg(feature = "postgres")]
    Postgres(PgPool),
}

impl Database {
    /// Connect using the global configuration.
    pub async fn new() -> PantryResult<Self> {
        let config = get_config()?;
        Self::connect(&config.database).await
    }

    /// Connect to the backend selected by `db_config.db_type`.
    pub async fn connect(db_config: &DatabaseConfig) -> PantryResult<Self> {
        match db_config.db_type.as_str() {
            #[cfg(feature = "sqlite")]
            "sqlite" => {
                let pool = SqlitePool::connect(&db_config.sqlite_url)
                    .await
                    .map_err(|e| {
                        error!("Failed to connect to SQLite: {e}");
                        PantryError::StoreError(format!("failed to connect to SQLite: {e}"))
                    })?;

                Ok(Database::SQLite(pool))
            }
            #[cfg(not(feature = "sqlite"))]
            "sqlite" => Err(PantryError::ConfigError(
                "SQLite support not compiled in. Enable the 'sqlite' feature.".to_string(),
            )),
            #[cfg(feature = "postgres")]
            "postgres" => {
                let pool = PgPool::connect(&db_config.postgres_url)
                    .await
                    .map_err(|e| {
                        error!("Failed to connect to PostgreSQL: {e}");
                        PantryError::StoreError(format!("failed to connect to PostgreSQL: {e}"))
                    })?;

                Ok(Database::Postgres(pool))
            }
            #[cfg(not(feature = "postgres"))]
            "postgres" => Err(PantryError::ConfigError(
                "PostgreSQL support not compiled in. Enable the 'postgres' feature.".to_string(),
            )),
            other => Err(PantryError::ConfigError(format!(
                "unsupported database type: {other}"
            ))),
        }
    }

    /// Private in-memory SQLite database.
    ///
    /// Uses a single connection, since every `:memory:` connection is its own database.
    #[cfg(feature = "sqlite")]
    pub async fn sqlite_in_memory() -> PantryResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| PantryError::StoreError(format!("failed to open SQLite: {e}")))?;

        Ok(Database::SQLite(pool))
    }

    /// Create the inventory table and its due-window index if missing.
    pub async fn ensure_schema(&self) -> PantryResult<()> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => {
                for statement in [
                    r#"
                    CREATE TABLE IF NOT EXISTS expiring_ingredients (
                        id                  TEXT PRIMARY KEY,
                        owner_id            TEXT NOT NULL,
                        ingredient_name     TEXT,
                        expiration_date     TEXT,
                        notification_status TEXT NOT NULL DEFAULT 'PENDING'
                    )
                    "#,
                    r#"
                    CREATE INDEX IF NOT EXISTS idx_expiring_ingredients_due
                        ON expiring_ingredients (owner_id, notification_status, expiration_date)
                    "#,
                ] {
                    query(statement).execute(pool).await.map_err(|e| {
                        error!("SQLite ensure_schema failed: {e}");
                        PantryError::StoreError(format!("database error: {e}"))
                    })?;
                }
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                for statement in [
                    r#"
                    CREATE TABLE IF NOT EXISTS expiring_ingredients (
                        id                  TEXT PRIMARY KEY,
                        owner_id            TEXT NOT NULL,
                        ingredient_name     TEXT,
                        expiration_date     TIMESTAMPTZ,
                        notification_status TEXT NOT NULL DEFAULT 'PENDING'
                    )
                    "#,
                    r#"
                    CREATE INDEX IF NOT EXISTS idx_expiring_ingredients_due
                        ON expiring_ingredients (owner_id, notification_status, expiration_date)
                    "#,
                ] {
                    query(statement).execute(pool).await.map_err(|e| {
                        error!("Postgres ensure_schema failed: {e}");
                        PantryError::StoreError(format!("database error: {e}"))
                    })?;
                }
            }
        }

        Ok(())
    }

    /// Insert a record or overwrite the existing one with the same id.
    pub async fn upsert_item(&self, item: &ExpiringItem) -> PantryResult<()> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => {
                query(
                    r#"
                    INSERT INTO expiring_ingredients (
                        id,
                        owner_id,
                        ingredient_name,
                        expiration_date,
                        notification_status
                    )
                    VALUES (?, ?, ?, ?, ?)
                    ON CONFLICT(id) DO UPDATE SET
                        owner_id            = excluded.owner_id,
                        ingredient_name     = excluded.ingredient_name,
                        expiration_date     = excluded.expiration_date,
                        notification_status = excluded.notification_status
                    "#,
                )
                .bind(&item.id)
                .bind(&item.owner_id)
                .bind(&item.ingredient_name)
                .bind(item.expiration_date)
                .bind(item.notification_status.as_str())
                .execute(pool)
                .await
                .map_err(|e| {
                    error!("SQLite upsert_item failed: {e}");
                    PantryError::StoreError(format!("database error: {e}"))
                })?;
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                query(
                    r#"
                    INSERT INTO expiring_ingredients (
                        id,
                        owner_id,
                        ingredient_name,
                        expiration_date,
                        notification_status
                    )
                    VALUES ($1, $2, $3, $4, $5)
                    ON CONFLICT (id) DO UPDATE SET
                        owner_id            = EXCLUDED.owner_id,
                        ingredient_name     = EXCLUDED.ingredient_name,
                        expiration_date     = EXCLUDED.expiration_date,
                        notification_status = EXCLUDED.notification_status
                    "#,
                )
                .bind(&item.id)
                .bind(&item.owner_id)
                .bind(&item.ingredient_name)
                .bind(item.expiration_date)
                .bind(item.notification_status.as_str())
                .execute(pool)
                .await
                .map_err(|e| {
                    error!("Postgres upsert_item failed: {e}");
                    PantryError::StoreError(format!("database error: {e}"))
                })?;
            }
        }

        Ok(())
    }

    /// Fetch a record by its id.
    ///
    /// Returns:
    /// - `Ok(Some(item))` if found
    /// - `Ok(None)` if not found
    /// - `Err(PantryError::InvalidRecord)` if the stored status is unreadable
    pub async fn get_item(&self, item_id: &str) -> PantryResult<Option<ExpiringItem>> {
        let row = match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => query_as::<_, ExpiringItemRow>(
                "SELECT id, owner_id, ingredient_name, expiration_date, notification_status \
                 FROM expiring_ingredients WHERE id = ?",
            )
            .bind(item_id)
            .fetch_optional(pool)
            .await
            .map_err(|e| {
                error!("SQLite get_item failed: {e}");
                PantryError::StoreError(format!("database error: {e}"))
            })?,
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => query_as::<_, ExpiringItemRow>(
                "SELECT id, owner_id, ingredient_name, expiration_date, notification_status \
                 FROM expiring_ingredients WHERE id = $1",
            )
            .bind(item_id)
            .fetch_optional(pool)
            .await
            .map_err(|e| {
                error!("Postgres get_item failed: {e}");
                PantryError::StoreError(format!("database error: {e}"))
            })?,
        };

        row.map(ExpiringItem::try_from).transpose()
    }
}

#[async_trait]
impl InventoryStore for Database {
    async fn query_due(&self, window: &ExpirationWindow) -> PantryResult<Vec<ExpiringItem>> {
        let rows = match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => query_as::<_, ExpiringItemRow>(
                "SELECT id, owner_id, ingredient_name, expiration_date, notification_status \
                 FROM expiring_ingredients \
                 WHERE owner_id = ? \
                   AND notification_status = ? \
                   AND expiration_date >= ? \
                   AND expiration_date < ? \
                 ORDER BY expiration_date, id",
            )
            .bind(&window.owner_id)
            .bind(window.status.as_str())
            .bind(window.starts_at)
            .bind(window.ends_before)
            .fetch_all(pool)
            .await
            .map_err(|e| {
                error!("SQLite query_due failed: {e}");
                PantryError::StoreError(format!("database error: {e}"))
            })?,
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => query_as::<_, ExpiringItemRow>(
                "SELECT id, owner_id, ingredient_name, expiration_date, notification_status \
                 FROM expiring_ingredients \
                 WHERE owner_id = $1 \
                   AND notification_status = $2 \
                   AND expiration_date >= $3 \
                   AND expiration_date < $4 \
                 ORDER BY expiration_date, id",
            )
            .bind(&window.owner_id)
            .bind(window.status.as_str())
            .bind(window.starts_at)
            .bind(window.ends_before)
            .fetch_all(pool)
            .await
            .map_err(|e| {
                error!("Postgres query_due failed: {e}");
                PantryError::StoreError(format!("database error: {e}"))
            })?,
        };

        Ok(rows_to_items(rows))
    }

    async fn update_status(&self, item_id: &str, status: NotificationStatus) -> PantryResult<()> {
        let rows_affected = match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => query(
                "UPDATE expiring_ingredients \
                     SET notification_status = ? \
                     WHERE id = ?",
            )
            .bind(status.as_str())
            .bind(item_id)
            .execute(pool)
            .await
            .map_err(|e| {
                error!("SQLite update_status failed: {e}");
                PantryError::StoreError(format!("database error: {e}"))
            })?
            .rows_affected(),
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => query(
                "UPDATE expiring_ingredients \
                     SET notification_status = $1 \
                     WHERE id = $2",
            )
            .bind(status.as_str())
            .bind(item_id)
            .execute(pool)
            .await
            .map_err(|e| {
                error!("Postgres update_status failed: {e}");
                PantryError::StoreError(format!("database error: {e}"))
            })?
            .rows_affected(),
        };

        if rows_affected == 0 {
            return Err(PantryError::NotFound(item_id.to_string()));
        }

        Ok(())
    }
}
