//! Integration tests for the SQLite inventory store.

#![cfg(feature = "sqlite")]

use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
use std::sync::Arc;

use pantry_watch::errors::PantryError;
use pantry_watch::jobs::{ExpirationCheckJob, JobInput};
use pantry_watch::notify::RecordingSink;
use pantry_watch::store::{Database, InventoryStore};
use pantry_watch::{ExpirationWindow, ExpiringItem, NotificationStatus};

const OWNER: &str = "owner-uid";

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap()
}

fn utc() -> FixedOffset {
    FixedOffset::east_opt(0).unwrap()
}

/// Helper to create a test database with the inventory table.
async fn setup_test_db() -> Database {
    let db = Database::sqlite_in_memory()
        .await
        .expect("failed to open database");
    db.ensure_schema().await.expect("failed to create schema");
    db
}

async fn seed(db: &Database, items: &[ExpiringItem]) {
    for item in items {
        db.upsert_item(item).await.expect("failed to insert item");
    }
}

#[tokio::test]
async fn ensure_schema_is_idempotent() {
    let db = setup_test_db().await;
    db.ensure_schema().await.expect("second call succeeds");
}

#[tokio::test]
async fn upsert_and_get_round_trip() {
    let db = setup_test_db().await;
    let item = ExpiringItem::new("milk", OWNER, "우유", now() + Duration::days(2));
    seed(&db, &[item.clone()]).await;

    let stored = db.get_item("milk").await.unwrap().expect("item exists");
    assert_eq!(stored, item);
    assert!(db.get_item("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn query_due_applies_owner_status_and_date_range() {
    let db = setup_test_db().await;
    let mut sent = ExpiringItem::new("sent", OWNER, "milk", now() + Duration::days(1));
    sent.notification_status = NotificationStatus::Sent;

    seed(
        &db,
        &[
            ExpiringItem::new("today", OWNER, "tofu", Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()),
            ExpiringItem::new("d3", OWNER, "kimchi", Utc.with_ymd_and_hms(2024, 6, 4, 23, 59, 59).unwrap()),
            ExpiringItem::new("d4", OWNER, "butter", Utc.with_ymd_and_hms(2024, 6, 5, 0, 0, 0).unwrap()),
            ExpiringItem::new("past", OWNER, "cheese", now() - Duration::days(1)),
            ExpiringItem::new("foreign", "someone-else", "eggs", now()),
            sent,
        ],
    )
    .await;

    let window = ExpirationWindow::build(OWNER, now(), 3, &utc());
    let ids: Vec<String> = db
        .query_due(&window)
        .await
        .unwrap()
        .into_iter()
        .map(|item| item.id)
        .collect();

    assert_eq!(ids, vec!["today", "d3"]);
}

#[tokio::test]
async fn update_status_persists_and_reports_unknown_ids() {
    let db = setup_test_db().await;
    seed(&db, &[ExpiringItem::new("milk", OWNER, "milk", now())]).await;

    db.update_status("milk", NotificationStatus::Sent).await.unwrap();
    let stored = db.get_item("milk").await.unwrap().unwrap();
    assert_eq!(stored.notification_status, NotificationStatus::Sent);

    let err = db
        .update_status("missing", NotificationStatus::Sent)
        .await
        .unwrap_err();
    assert!(matches!(err, PantryError::NotFound(_)));
}

#[tokio::test]
async fn rows_with_unknown_status_are_ignored() {
    let db = setup_test_db().await;
    seed(&db, &[ExpiringItem::new("good", OWNER, "milk", now())]).await;

    match &db {
        Database::SQLite(pool) => {
            sqlx::query(
                "INSERT INTO expiring_ingredients \
                 (id, owner_id, ingredient_name, expiration_date, notification_status) \
                 VALUES ('odd', ?, 'eggs', ?, 'pending')",
            )
            .bind(OWNER)
            .bind(now())
            .execute(pool)
            .await
            .unwrap();
        }
        #[allow(unreachable_patterns)]
        _ => unreachable!("in-memory database is SQLite"),
    }

    let window = ExpirationWindow::build(OWNER, now(), 3, &utc());
    let items = db.query_due(&window).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, "good");

    match db.get_item("odd").await {
        Err(PantryError::InvalidRecord { id, reason }) => {
            assert_eq!(id, "odd");
            assert_eq!(reason, "unknown notification status 'pending'");
        }
        other => panic!("expected InvalidRecord, got {other:?}"),
    }
}

#[tokio::test]
async fn job_marks_sqlite_records_sent_once() {
    let db = Arc::new(setup_test_db().await);
    let mut nameless = ExpiringItem::new("nameless", OWNER, "", now() + Duration::days(1));
    nameless.ingredient_name = None;
    seed(
        &db,
        &[
            ExpiringItem::new("milk", OWNER, "우유", now() + Duration::days(2)),
            ExpiringItem::new("cheese", OWNER, "치즈", now() - Duration::days(1)),
            nameless,
        ],
    )
    .await;

    let sink = Arc::new(RecordingSink::new());
    let job = ExpirationCheckJob::new(db.clone(), sink.clone());
    let input = JobInput::for_owner(OWNER);

    let first = job.run_at(&input, now()).await;
    let report = first.report().expect("run succeeds");
    assert_eq!(report.notified, vec!["milk"]);
    assert_eq!(report.skipped_incomplete, vec!["nameless"]);

    let second = job.run_at(&input, now()).await;
    assert!(second.report().unwrap().notified.is_empty());

    let posted = sink.posted().await;
    assert_eq!(posted.len(), 1);
    assert_eq!(posted[0].body, "우유 expires in 2 days.");

    let status = |id: &'static str| {
        let db = db.clone();
        async move { db.get_item(id).await.unwrap().unwrap().notification_status }
    };
    assert_eq!(status("milk").await, NotificationStatus::Sent);
    assert_eq!(status("cheese").await, NotificationStatus::Pending);
    assert_eq!(status("nameless").await, NotificationStatus::Pending);
}
