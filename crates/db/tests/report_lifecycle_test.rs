//! Report lifecycle integration tests against an in-memory database.
//!
//! Covers create/submit/lock/update, the audit commit written at lock time,
//! and the guards that keep a locked report immutable.

#![allow(clippy::too_many_lines)]

mod common;

use std::sync::Arc;

use chrono::NaiveDate;
use mockall::mock;
use rust_decimal_macros::dec;
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, IntoActiveModel, PaginatorTrait, Set,
};
use uuid::Uuid;

use cadence_core::audit::{AuditError, AuditLedger, AuditReceipt, AuditSnapshot};
use cadence_core::report::{NewReport, ReportFilter, ReportPatch};
use cadence_core::validation::Rule;
use cadence_core::{ActivityError, ErrorKind, ReportStatus};
use cadence_db::entities::{activity_reports, audit_commits};
use cadence_shared::types::{AuditCommitId, PageRequest};

use common::{Fixture, entry, march_report};

mock! {
    pub Ledger {}

    #[async_trait::async_trait]
    impl AuditLedger for Ledger {
        async fn append(&self, snapshot: &AuditSnapshot) -> Result<AuditReceipt, AuditError>;
    }
}

/// Ledger that lets a competing writer change the report while the snapshot
/// is being appended.
struct InterleavedWriteLedger {
    db: DatabaseConnection,
    report_id: Uuid,
}

#[async_trait::async_trait]
impl AuditLedger for InterleavedWriteLedger {
    async fn append(&self, _snapshot: &AuditSnapshot) -> Result<AuditReceipt, AuditError> {
        let row = activity_reports::Entity::find_by_id(self.report_id)
            .one(&self.db)
            .await
            .expect("Failed to load report")
            .expect("Report missing");
        let mut active = row.into_active_model();
        active.period_month = Set(7);
        active.currency = Set("USD".into());
        active.updated_at = Set(chrono::Utc::now().into());
        active.update(&self.db).await.expect("Failed to write report");

        Ok(AuditReceipt {
            commit_id: AuditCommitId::new(),
            content_hash: "0".repeat(64),
            committed_at: chrono::Utc::now(),
        })
    }
}

async fn stored_payload(fx: &Fixture, report_id: Uuid) -> serde_json::Value {
    let commit = fx
        .ledger()
        .find_by_report(report_id)
        .await
        .expect("Failed to read ledger")
        .expect("No commit for report");
    serde_json::from_str(&commit.payload).expect("Payload is not JSON")
}

async fn commit_count(fx: &Fixture) -> u64 {
    audit_commits::Entity::find()
        .count(&fx.db)
        .await
        .expect("Failed to count commits")
}

/// Draft report with one 1.5 day entry at 600.00.
async fn submitted(fx: &Fixture) -> Uuid {
    let report = fx.draft().await;
    fx.add_entry(report.id, fx.work_item, 3, dec!(1.5), 60000).await;
    fx.reports()
        .submit(&fx.owner, report.id)
        .await
        .expect("Failed to submit");
    report.id
}

#[tokio::test]
async fn test_full_lifecycle_scenario() {
    let fx = Fixture::new().await;
    let reports = fx.reports();
    let entries = fx.entries();

    let report = reports
        .create(
            &fx.owner,
            NewReport {
                month: Some(1),
                year: Some(2024),
                currency: Some("EUR".into()),
                description: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(report.core_status(), ReportStatus::Draft);
    assert_eq!(report.total_amount_cents, 0);
    assert_eq!(report.owner_id, fx.owner.user_id.into_inner());

    let day = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
    for (work_item, price) in [(fx.work_item, 60000), (fx.second_work_item, 70000)] {
        let mut input = entry(work_item, 1, dec!(0.5), price);
        input.date = Some(day);
        entries.create(&fx.owner, report.id, input).await.unwrap();
    }

    let report = reports.submit(&fx.owner, report.id).await.unwrap();
    assert_eq!(report.core_status(), ReportStatus::Submitted);
    assert_eq!(report.stored_totals().total_days, dec!(1.00));
    assert_eq!(report.total_amount_cents, 65000);
    assert!(report.submitted_at.is_some());
    assert!(report.locked_at.is_none());

    let outcome = reports.lock(&fx.owner, report.id).await.unwrap();
    assert_eq!(outcome.report.core_status(), ReportStatus::Locked);
    assert!(outcome.report.locked_at.is_some());
    assert_eq!(outcome.report.total_amount_cents, 65000);
    assert_eq!(outcome.receipt.content_hash.len(), 64);

    let commit = fx
        .ledger()
        .find_by_report(report.id)
        .await
        .unwrap()
        .expect("lock must leave an audit commit");
    assert_eq!(commit.sequence, 1);
    assert!(commit.previous_hash.is_none());
    assert_eq!(commit.content_hash, outcome.receipt.content_hash);
    assert!(commit.payload.contains("\"total_amount_cents\":65000"));
}

#[tokio::test]
async fn test_locked_report_rejects_every_update() {
    let fx = Fixture::new().await;
    let report_id = submitted(&fx).await;
    let reports = fx.reports();
    reports.lock(&fx.owner, report_id).await.unwrap();

    let patches = [
        ReportPatch {
            description: Some("Late edit".into()),
            ..Default::default()
        },
        ReportPatch {
            status: Some("draft".into()),
            ..Default::default()
        },
        ReportPatch {
            status: Some("bogus".into()),
            ..Default::default()
        },
        ReportPatch::default(),
    ];
    for patch in patches {
        let err = reports.update(&fx.owner, report_id, patch).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    let detail = reports.get(&fx.owner, report_id).await.unwrap();
    assert_eq!(detail.report.core_status(), ReportStatus::Locked);
    assert_eq!(detail.report.description.as_deref(), Some("March engagement"));
}

#[tokio::test]
async fn test_relock_and_resubmit_conflict() {
    let fx = Fixture::new().await;
    let report_id = submitted(&fx).await;
    let reports = fx.reports();

    let err = reports.submit(&fx.owner, report_id).await.unwrap_err();
    assert!(matches!(err, ActivityError::StateConflict { .. }));

    reports.lock(&fx.owner, report_id).await.unwrap();
    let err = reports.lock(&fx.owner, report_id).await.unwrap_err();
    assert!(matches!(
        err,
        ActivityError::StateConflict {
            status: ReportStatus::Locked,
            ..
        }
    ));
    assert_eq!(commit_count(&fx).await, 1);
}

#[tokio::test]
async fn test_lock_requires_submitted() {
    let fx = Fixture::new().await;
    let report = fx.draft().await;

    let err = fx.reports().lock(&fx.owner, report.id).await.unwrap_err();
    assert!(matches!(
        err,
        ActivityError::StateConflict {
            status: ReportStatus::Draft,
            ..
        }
    ));
    assert_eq!(commit_count(&fx).await, 0);
}

#[tokio::test]
async fn test_submit_without_entries_is_invalid_payload() {
    let fx = Fixture::new().await;
    let report = fx.draft().await;

    let err = fx.reports().submit(&fx.owner, report.id).await.unwrap_err();
    let ActivityError::InvalidPayload(failure) = err else {
        panic!("expected InvalidPayload, got {err:?}");
    };
    assert!(failure.has_rule(Rule::NoActiveEntries));

    let detail = fx.reports().get(&fx.owner, report.id).await.unwrap();
    assert_eq!(detail.report.core_status(), ReportStatus::Draft);
}

#[tokio::test]
async fn test_submit_ignores_deleted_entries() {
    let fx = Fixture::new().await;
    let report = fx.draft().await;
    let outcome = fx.add_entry(report.id, fx.work_item, 3, dec!(1), 60000).await;
    fx.entries().destroy(&fx.owner, outcome.entry.id).await.unwrap();

    let err = fx.reports().submit(&fx.owner, report.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidPayload);
}

#[tokio::test]
async fn test_lock_rolls_back_when_ledger_fails() {
    let fx = Fixture::new().await;
    let report_id = submitted(&fx).await;

    let mut ledger = MockLedger::new();
    ledger
        .expect_append()
        .times(1)
        .returning(|_| Err(AuditError::Unavailable("ledger offline".into())));
    let reports = fx.reports_with_ledger(Arc::new(ledger));

    let err = reports.lock(&fx.owner, report_id).await.unwrap_err();
    assert!(matches!(err, ActivityError::AuditAppendFailed(_)));
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert_eq!(err.status_code(), 500);
    assert!(!err.public_message().contains("ledger offline"));

    let detail = fx.reports().get(&fx.owner, report_id).await.unwrap();
    assert_eq!(detail.report.core_status(), ReportStatus::Submitted);
    assert!(detail.report.locked_at.is_none());
    assert_eq!(detail.report.total_amount_cents, 90000);
    assert_eq!(commit_count(&fx).await, 0);

    // The real ledger accepts the retry.
    let outcome = fx.reports().lock(&fx.owner, report_id).await.unwrap();
    assert_eq!(outcome.report.core_status(), ReportStatus::Locked);
}

#[tokio::test]
async fn test_lock_hands_snapshot_to_ledger() {
    let fx = Fixture::new().await;
    let report_id = submitted(&fx).await;
    let owner_id = fx.owner.user_id;

    let mut ledger = MockLedger::new();
    ledger
        .expect_append()
        .withf(move |snapshot| {
            snapshot.report_id == report_id
                && snapshot.owner_id == owner_id
                && snapshot.total_amount_cents == 90000
                && snapshot.entries.len() == 1
                && snapshot.entries[0].work_item_label == "Platform migration"
        })
        .times(1)
        .returning(move |_| {
            Ok(AuditReceipt {
                commit_id: AuditCommitId::new(),
                content_hash: "0".repeat(64),
                committed_at: chrono::Utc::now(),
            })
        });

    let outcome = fx
        .reports_with_ledger(Arc::new(ledger))
        .lock(&fx.owner, report_id)
        .await
        .unwrap();
    assert_eq!(outcome.report.core_status(), ReportStatus::Locked);
}

#[tokio::test]
async fn test_update_fields_in_draft_and_submitted() {
    let fx = Fixture::new().await;
    let reports = fx.reports();
    let report = fx.draft().await;

    let updated = reports
        .update(
            &fx.owner,
            report.id,
            ReportPatch {
                month: Some(4),
                currency: Some("usd".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.period_month, 4);
    assert_eq!(updated.currency, "USD");
    assert_eq!(updated.core_status(), ReportStatus::Draft);

    fx.add_entry(report.id, fx.work_item, 3, dec!(1), 60000).await;
    reports.submit(&fx.owner, report.id).await.unwrap();

    let updated = reports
        .update(
            &fx.owner,
            report.id,
            ReportPatch {
                description: Some("Reviewed".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.description.as_deref(), Some("Reviewed"));
    assert_eq!(updated.core_status(), ReportStatus::Submitted);
}

#[tokio::test]
async fn test_update_status_transitions() {
    let fx = Fixture::new().await;
    let reports = fx.reports();
    let report = fx.draft().await;
    fx.add_entry(report.id, fx.work_item, 3, dec!(2), 50000).await;

    let err = reports
        .update(
            &fx.owner,
            report.id,
            ReportPatch {
                status: Some("locked".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ActivityError::InvalidTransition { .. }));

    let err = reports
        .update(
            &fx.owner,
            report.id,
            ReportPatch {
                status: Some("archived".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);

    let report = reports
        .update(
            &fx.owner,
            report.id,
            ReportPatch {
                description: Some("Ready".into()),
                status: Some("submitted".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(report.core_status(), ReportStatus::Submitted);
    assert_eq!(report.total_amount_cents, 100_000);
    assert_eq!(report.description.as_deref(), Some("Ready"));

    let err = reports
        .update(
            &fx.owner,
            report.id,
            ReportPatch {
                status: Some("draft".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ActivityError::StatusChangeNotAllowed { .. }));
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);

    let report = reports
        .update(
            &fx.owner,
            report.id,
            ReportPatch {
                status: Some("locked".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(report.core_status(), ReportStatus::Locked);
    assert_eq!(commit_count(&fx).await, 1);
}

#[tokio::test]
async fn test_update_validation() {
    let fx = Fixture::new().await;
    let reports = fx.reports();
    let report = fx.draft().await;

    let err = reports
        .update(&fx.owner, report.id, ReportPatch::default())
        .await
        .unwrap_err();
    let ActivityError::InvalidPayload(failure) = err else {
        panic!("expected InvalidPayload, got {err:?}");
    };
    assert!(failure.has_rule(Rule::EmptyPatch));

    let err = reports
        .update(
            &fx.owner,
            report.id,
            ReportPatch {
                month: Some(13),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    let ActivityError::InvalidPayload(failure) = err else {
        panic!("expected InvalidPayload, got {err:?}");
    };
    assert!(failure.has("month", Rule::OutOfRange));
}

#[tokio::test]
async fn test_create_validation_and_permission() {
    let fx = Fixture::new().await;
    let reports = fx.reports();

    let err = reports
        .create(
            &fx.owner,
            NewReport {
                month: Some(0),
                year: Some(1999),
                currency: Some("JPY".into()),
                description: None,
            },
        )
        .await
        .unwrap_err();
    let ActivityError::InvalidPayload(failure) = err else {
        panic!("expected InvalidPayload, got {err:?}");
    };
    assert!(failure.has("month", Rule::OutOfRange));
    assert!(failure.has("year", Rule::OutOfRange));
    assert!(failure.has("currency", Rule::UnsupportedCurrency));

    let err = reports.create(&fx.viewer, march_report()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
}

#[tokio::test]
async fn test_only_owner_can_read_or_mutate() {
    let fx = Fixture::new().await;
    let reports = fx.reports();
    let report = fx.draft().await;

    for actor in [&fx.colleague, &fx.viewer, &fx.outsider] {
        let err = reports.get(actor, report.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
        let err = reports.submit(actor, report.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }

    let err = reports.get(&fx.owner, Uuid::new_v4()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_list_filters_and_orders() {
    let fx = Fixture::new().await;
    let reports = fx.reports();

    for (year, month) in [(2025, 1), (2025, 3), (2024, 12)] {
        reports
            .create(
                &fx.owner,
                NewReport {
                    month: Some(month),
                    year: Some(year),
                    currency: Some("EUR".into()),
                    description: None,
                },
            )
            .await
            .unwrap();
    }
    reports.create(&fx.colleague, march_report()).await.unwrap();

    let page = reports
        .list(&fx.owner, ReportFilter::default(), PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.meta.total, 3);
    let periods: Vec<(i32, i32)> = page
        .items
        .iter()
        .map(|r| (r.period_year, r.period_month))
        .collect();
    assert_eq!(periods, vec![(2025, 3), (2025, 1), (2024, 12)]);

    let page = reports
        .list(
            &fx.owner,
            ReportFilter {
                year: Some(2025),
                ..Default::default()
            },
            PageRequest::new(1, 1),
        )
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.meta.total, 2);
    assert_eq!(page.meta.total_pages, 2);

    let page = reports
        .list(
            &fx.owner,
            ReportFilter {
                status: Some(ReportStatus::Submitted),
                ..Default::default()
            },
            PageRequest::default(),
        )
        .await
        .unwrap();
    assert!(page.items.is_empty());

    let err = reports
        .list(&fx.viewer, ReportFilter::default(), PageRequest::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
}

#[tokio::test]
async fn test_audit_chain_links_commits() {
    let fx = Fixture::new().await;
    let first = submitted(&fx).await;
    let second = submitted(&fx).await;
    let reports = fx.reports();

    reports.lock(&fx.owner, first).await.unwrap();
    reports.lock(&fx.owner, second).await.unwrap();

    let ledger = fx.ledger();
    let first_commit = ledger.find_by_report(first).await.unwrap().unwrap();
    let second_commit = ledger.find_by_report(second).await.unwrap().unwrap();
    assert_eq!(second_commit.sequence, 2);
    assert_eq!(
        second_commit.previous_hash.as_deref(),
        Some(first_commit.chain_hash.as_str())
    );
    assert_eq!(ledger.verify_chain().await.unwrap(), None);
}

#[tokio::test]
async fn test_get_returns_active_entries_in_order() {
    let fx = Fixture::new().await;
    let report = fx.draft().await;
    fx.add_entry(report.id, fx.work_item, 10, dec!(1), 60000).await;
    let removed = fx.add_entry(report.id, fx.work_item, 5, dec!(1), 60000).await;
    fx.add_entry(report.id, fx.second_work_item, 2, dec!(0.25), 60000).await;
    fx.entries().destroy(&fx.owner, removed.entry.id).await.unwrap();

    let detail = fx.reports().get(&fx.owner, report.id).await.unwrap();
    let days: Vec<u32> = detail
        .entries
        .iter()
        .map(|line| chrono::Datelike::day(&line.date))
        .collect();
    assert_eq!(days, vec![2, 10]);
    assert_eq!(detail.report.total_amount_cents, 75000);
}

#[tokio::test]
async fn test_update_persists_every_patched_field() {
    let fx = Fixture::new().await;
    let report = fx.draft().await;

    fx.reports()
        .update(
            &fx.owner,
            report.id,
            ReportPatch {
                month: Some(6),
                year: Some(2024),
                currency: Some("GBP".into()),
                description: Some("Re-scoped".into()),
                status: None,
            },
        )
        .await
        .unwrap();

    let stored = fx.reports().get(&fx.owner, report.id).await.unwrap().report;
    assert_eq!(stored.period_month, 6);
    assert_eq!(stored.period_year, 2024);
    assert_eq!(stored.currency, "GBP");
    assert_eq!(stored.description.as_deref(), Some("Re-scoped"));
    assert!(stored.updated_at > report.updated_at);
}

#[tokio::test]
async fn test_lock_through_update_records_patched_header() {
    let fx = Fixture::new().await;
    let report_id = submitted(&fx).await;

    let locked = fx
        .reports()
        .update(
            &fx.owner,
            report_id,
            ReportPatch {
                month: Some(5),
                currency: Some("CHF".into()),
                status: Some("locked".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(locked.core_status(), ReportStatus::Locked);
    assert_eq!(locked.period_month, 5);
    assert_eq!(locked.currency, "CHF");

    let payload = stored_payload(&fx, report_id).await;
    assert_eq!(payload["period"]["month"], 5);
    assert_eq!(payload["currency"], "CHF");
}

#[tokio::test]
async fn test_lock_refuses_report_changed_after_snapshot() {
    let fx = Fixture::new().await;
    let report_id = submitted(&fx).await;
    let ledger = InterleavedWriteLedger {
        db: fx.db.clone(),
        report_id,
    };

    let err = fx
        .reports_with_ledger(Arc::new(ledger))
        .lock(&fx.owner, report_id)
        .await
        .unwrap_err();
    assert!(matches!(err, ActivityError::StateConflict { operation: "lock", .. }));

    let stored = fx.reports().get(&fx.owner, report_id).await.unwrap().report;
    assert_eq!(stored.core_status(), ReportStatus::Submitted);
    assert!(stored.locked_at.is_none());

    // A fresh lock snapshots the header that is actually stored.
    let outcome = fx.reports().lock(&fx.owner, report_id).await.unwrap();
    assert_eq!(outcome.report.period_month, 7);
    let payload = stored_payload(&fx, report_id).await;
    assert_eq!(payload["period"]["month"], 7);
    assert_eq!(payload["currency"], "USD");
}

#[tokio::test]
async fn test_lock_through_update_refuses_report_changed_after_snapshot() {
    let fx = Fixture::new().await;
    let report_id = submitted(&fx).await;
    let ledger = InterleavedWriteLedger {
        db: fx.db.clone(),
        report_id,
    };

    let err = fx
        .reports_with_ledger(Arc::new(ledger))
        .update(
            &fx.owner,
            report_id,
            ReportPatch {
                description: Some("Final".into()),
                status: Some("locked".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ActivityError::StateConflict { operation: "update", .. }));

    let stored = fx.reports().get(&fx.owner, report_id).await.unwrap().report;
    assert_eq!(stored.core_status(), ReportStatus::Submitted);
    assert_ne!(stored.description.as_deref(), Some("Final"));
}
