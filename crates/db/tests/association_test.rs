//! Association linker integration tests: join rows are unique per pair,
//! links are idempotent and failed calls leave the join tables untouched.

mod common;

use chrono::Utc;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, EntityTrait, PaginatorTrait, Set};
use uuid::Uuid;

use cadence_core::{ActivityError, ErrorKind};
use cadence_db::entities::{activity_entries, entry_work_items, report_entries};

use common::Fixture;

async fn report_links(fx: &Fixture) -> u64 {
    report_entries::Entity::find()
        .count(&fx.db)
        .await
        .expect("Failed to count links")
}

async fn work_item_links(fx: &Fixture) -> u64 {
    entry_work_items::Entity::find()
        .count(&fx.db)
        .await
        .expect("Failed to count links")
}

/// An entry row with no links, as left behind by an external import.
async fn loose_entry(fx: &Fixture) -> Uuid {
    let now = Utc::now().into();
    activity_entries::ActiveModel {
        id: Set(Uuid::new_v4()),
        entry_date: Set(common::march(7)),
        quantity_hundredths: Set(100),
        unit_price_cents: Set(50000),
        line_total_cents: Set(50000),
        description: Set(None),
        created_by: Set(fx.owner.user_id.into_inner()),
        deleted_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&fx.db)
    .await
    .expect("Failed to insert entry")
    .id
}

#[tokio::test]
async fn test_link_entry_is_idempotent() {
    let fx = Fixture::new().await;
    let report = fx.draft().await;
    let entry_id = loose_entry(&fx).await;
    let associations = fx.associations();

    let first = associations.link_entry(report.id, entry_id).await.unwrap();
    let second = associations.link_entry(report.id, entry_id).await.unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(report_links(&fx).await, 1);

    let first = associations.link_work_item(entry_id, fx.work_item).await.unwrap();
    let second = associations.link_work_item(entry_id, fx.work_item).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(work_item_links(&fx).await, 1);
}

#[tokio::test]
async fn test_link_requires_both_sides() {
    let fx = Fixture::new().await;
    let report = fx.draft().await;
    let entry_id = loose_entry(&fx).await;
    let associations = fx.associations();

    let err = associations
        .link_entry(Uuid::new_v4(), entry_id)
        .await
        .unwrap_err();
    assert!(matches!(err, ActivityError::ReportNotFound(_)));

    let err = associations
        .link_entry(report.id, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, ActivityError::EntryNotFound(_)));

    let err = associations
        .link_work_item(entry_id, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, ActivityError::WorkItemNotFound(_)));

    assert_eq!(report_links(&fx).await, 0);
    assert_eq!(work_item_links(&fx).await, 0);
}

#[tokio::test]
async fn test_unlink_missing_pair_is_not_found() {
    let fx = Fixture::new().await;
    let report = fx.draft().await;
    let outcome = fx.add_entry(report.id, fx.work_item, 3, dec!(1), 60000).await;
    let associations = fx.associations();

    let err = associations
        .unlink_entry(report.id, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, ActivityError::LinkNotFound { .. }));
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = associations
        .unlink_work_item(outcome.entry.id, fx.second_work_item)
        .await
        .unwrap_err();
    assert!(matches!(err, ActivityError::LinkNotFound { .. }));
    assert_eq!(report_links(&fx).await, 1);
    assert_eq!(work_item_links(&fx).await, 1);

    associations
        .unlink_work_item(outcome.entry.id, fx.work_item)
        .await
        .unwrap();
    associations
        .unlink_entry(report.id, outcome.entry.id)
        .await
        .unwrap();
    assert_eq!(report_links(&fx).await, 0);
    assert_eq!(work_item_links(&fx).await, 0);
}

#[tokio::test]
async fn test_reports_for_work_item_walks_join_rows() {
    let fx = Fixture::new().await;
    let march = fx.draft().await;
    let other = fx.draft().await;
    fx.add_entry(march.id, fx.work_item, 3, dec!(1), 60000).await;
    fx.add_entry(other.id, fx.second_work_item, 3, dec!(1), 60000).await;
    let removed = fx.add_entry(other.id, fx.work_item, 4, dec!(1), 60000).await;
    fx.entries().destroy(&fx.owner, removed.entry.id).await.unwrap();

    let reports = fx
        .associations()
        .reports_for_work_item(fx.work_item)
        .await
        .unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].id, march.id);

    let none = fx
        .associations()
        .reports_for_work_item(Uuid::new_v4())
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_debug_info_never_fails() {
    let fx = Fixture::new().await;
    let report = fx.draft().await;
    fx.add_entry(report.id, fx.work_item, 3, dec!(1), 60000).await;
    fx.add_entry(report.id, fx.work_item, 4, dec!(1), 60000).await;
    let associations = fx.associations();

    let info = associations.debug_info(report.id, fx.work_item).await;
    assert!(info.report_exists);
    assert!(info.work_item_exists);
    assert_eq!(info.linked_entry_count, 2);
    assert!(info.error.is_none());

    let info = associations
        .debug_info(Uuid::new_v4(), Uuid::new_v4())
        .await;
    assert!(!info.report_exists);
    assert!(!info.work_item_exists);
    assert!(!info.is_linked());
    assert!(info.error.is_none());
}

#[tokio::test]
async fn test_orphaned_work_item_link_gets_placeholder_label() {
    let fx = Fixture::new().await;
    let report = fx.draft().await;
    let outcome = fx.add_entry(report.id, fx.work_item, 3, dec!(1), 60000).await;

    // Repoint the link at a work item that does not exist.
    let link = entry_work_items::Entity::find()
        .one(&fx.db)
        .await
        .unwrap()
        .unwrap();
    let dangling = Uuid::new_v4();
    let mut active: entry_work_items::ActiveModel = link.into();
    active.work_item_id = Set(dangling);
    active.update(&fx.db).await.unwrap();

    let detail = fx.reports().get(&fx.owner, report.id).await.unwrap();
    assert_eq!(detail.entries.len(), 1);
    assert_eq!(detail.entries[0].entry_id, outcome.entry.id);
    // The link still carries its id; only the label is lost.
    assert_eq!(detail.entries[0].work_item_id, Some(dangling));
    assert!(detail.entries[0].work_item_label.is_none());

    let submitted = fx.reports().submit(&fx.owner, report.id).await.unwrap();
    assert_eq!(submitted.total_amount_cents, 60000);
}
