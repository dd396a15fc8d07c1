//! Entry service: create, update and soft-delete activity entries.
//!
//! Order for every mutation: permission gate on the parent report, draft
//! guard, validation, work-item checks, duplicate check. Writes, link rows
//! and the totals recompute then share one transaction.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, TransactionTrait,
};
use tracing::info;
use uuid::Uuid;

use cadence_core::access::{AccessContextProvider, Actor};
use cadence_core::entry::{EntryPatch, NewEntry, ValidEntry};
use cadence_core::{
    ActivityError, AggregationEngine, ReportLifecycle, ReportTotals, ValidationGate,
    ValidationPolicy,
};
use cadence_shared::types::amount::quantity_to_hundredths;

use crate::entities::{activity_entries, activity_reports, entry_work_items, work_items};

use super::access::authorize_report;
use super::activity_report::find_in;
use super::aggregation::{load_lines, recalculate_and_persist};
use super::association::{
    db_err, link_entry, link_work_item, report_id_for_entry, unlink_work_item,
};

/// An entry together with its report after the totals recompute.
#[derive(Debug, Clone)]
pub struct EntryOutcome {
    /// The entry row.
    pub entry: activity_entries::Model,
    /// Linked work item.
    pub work_item_id: Option<Uuid>,
    /// The parent report, totals persisted.
    pub report: activity_reports::Model,
    /// Recomputed totals.
    pub totals: ReportTotals,
}

/// Entry service.
#[derive(Clone)]
pub struct EntryRepository {
    db: DatabaseConnection,
    access: Arc<dyn AccessContextProvider>,
    policy: ValidationPolicy,
}

impl std::fmt::Debug for EntryRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryRepository")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl EntryRepository {
    /// Creates a new entry repository.
    #[must_use]
    pub fn new(
        db: DatabaseConnection,
        access: Arc<dyn AccessContextProvider>,
        policy: ValidationPolicy,
    ) -> Self {
        Self { db, access, policy }
    }

    /// Creates an entry on a draft report.
    ///
    /// # Errors
    ///
    /// * `ReportNotFound` / `Forbidden` before anything else
    /// * `StateConflict` unless the report is a draft
    /// * `InvalidPayload` for rule violations
    /// * `WorkItemNotFound` / `WorkItemNotAccessible` for bad work items
    /// * `DuplicateEntry` if the work item is already billed on that date
    pub async fn create(
        &self,
        actor: &Actor,
        report_id: Uuid,
        input: NewEntry,
    ) -> Result<EntryOutcome, ActivityError> {
        let report = self.find_report(report_id).await?;
        authorize_report(&self.access, actor, &report).await?;

        let txn = self.db.begin().await.map_err(db_err)?;
        let report = find_in(&txn, report_id).await?;
        ReportLifecycle::ensure_draft(report.core_status(), "add entries to")?;

        let valid = ValidationGate::validate_new_entry(&input, today(), &self.policy)
            .map_err(ActivityError::InvalidPayload)?;
        ensure_work_item_accessible(&txn, &report, valid.work_item_id).await?;
        ensure_unique(&txn, report_id, &valid, None).await?;

        let now = Utc::now().into();
        let entry = activity_entries::ActiveModel {
            id: Set(Uuid::now_v7()),
            entry_date: Set(valid.date),
            quantity_hundredths: Set(hundredths(&valid)?),
            unit_price_cents: Set(valid.unit_price_cents),
            line_total_cents: Set(AggregationEngine::line_total(
                valid.quantity,
                valid.unit_price_cents,
            )?),
            description: Set(valid.description.clone()),
            created_by: Set(actor.user_id.into_inner()),
            deleted_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(db_err)?;

        link_entry(&txn, report_id, entry.id).await?;
        link_work_item(&txn, entry.id, valid.work_item_id).await?;
        let (report, totals) = recalculate_and_persist(&txn, report).await?;

        txn.commit().await.map_err(db_err)?;

        info!(%report_id, entry_id = %entry.id, "activity entry created");
        Ok(EntryOutcome {
            entry,
            work_item_id: Some(valid.work_item_id),
            report,
            totals,
        })
    }

    /// Applies a partial update to an entry of a draft report.
    ///
    /// Changing the work item swaps the entry's work-item link.
    ///
    /// # Errors
    ///
    /// As [`Self::create`], plus `EntryNotFound` and `InvalidPayload` for an
    /// empty patch.
    pub async fn update(
        &self,
        actor: &Actor,
        entry_id: Uuid,
        patch: EntryPatch,
    ) -> Result<EntryOutcome, ActivityError> {
        let report_id = self.parent_report_id(entry_id).await?;
        let report = self.find_report(report_id).await?;
        authorize_report(&self.access, actor, &report).await?;

        let txn = self.db.begin().await.map_err(db_err)?;
        let report = find_in(&txn, report_id).await?;
        ReportLifecycle::ensure_draft(report.core_status(), "update entries of")?;

        ValidationGate::ensure_entry_patch_not_empty(&patch)
            .map_err(ActivityError::InvalidPayload)?;
        let entry = find_active_entry(&txn, entry_id).await?;
        let current_work_item = current_work_item_id(&txn, entry_id).await?;
        let current = NewEntry {
            work_item_id: current_work_item,
            date: Some(entry.entry_date),
            quantity: Some(entry.quantity()),
            unit_price_cents: Some(entry.unit_price_cents.into()),
            description: entry.description.clone(),
        };

        let merged = patch.merge_onto(current);
        let valid = ValidationGate::validate_new_entry(&merged, today(), &self.policy)
            .map_err(ActivityError::InvalidPayload)?;

        let work_item_changed = current_work_item != Some(valid.work_item_id);
        if work_item_changed {
            ensure_work_item_accessible(&txn, &report, valid.work_item_id).await?;
        }
        ensure_unique(&txn, report_id, &valid, Some(entry_id)).await?;

        let mut active: activity_entries::ActiveModel = entry.into();
        active.entry_date = Set(valid.date);
        active.quantity_hundredths = Set(hundredths(&valid)?);
        active.unit_price_cents = Set(valid.unit_price_cents);
        active.line_total_cents = Set(AggregationEngine::line_total(
            valid.quantity,
            valid.unit_price_cents,
        )?);
        active.description = Set(valid.description.clone());
        active.updated_at = Set(Utc::now().into());
        let entry = active.update(&txn).await.map_err(db_err)?;

        if work_item_changed {
            if let Some(old) = current_work_item {
                unlink_work_item(&txn, entry_id, old).await?;
            }
            link_work_item(&txn, entry_id, valid.work_item_id).await?;
        }
        let (report, totals) = recalculate_and_persist(&txn, report).await?;

        txn.commit().await.map_err(db_err)?;

        info!(%report_id, %entry_id, work_item_changed, "activity entry updated");
        Ok(EntryOutcome {
            entry,
            work_item_id: Some(valid.work_item_id),
            report,
            totals,
        })
    }

    /// Soft-deletes an entry of a draft report.
    ///
    /// # Errors
    ///
    /// `EntryNotFound`, `Forbidden` or `StateConflict`.
    pub async fn destroy(
        &self,
        actor: &Actor,
        entry_id: Uuid,
    ) -> Result<EntryOutcome, ActivityError> {
        let report_id = self.parent_report_id(entry_id).await?;
        let report = self.find_report(report_id).await?;
        authorize_report(&self.access, actor, &report).await?;

        let txn = self.db.begin().await.map_err(db_err)?;
        let report = find_in(&txn, report_id).await?;
        ReportLifecycle::ensure_draft(report.core_status(), "delete entries of")?;

        let entry = find_active_entry(&txn, entry_id).await?;
        let work_item_id = current_work_item_id(&txn, entry_id).await?;
        let now = Utc::now().into();
        let mut active: activity_entries::ActiveModel = entry.into();
        active.deleted_at = Set(Some(now));
        active.updated_at = Set(now);
        let entry = active.update(&txn).await.map_err(db_err)?;

        let (report, totals) = recalculate_and_persist(&txn, report).await?;
        txn.commit().await.map_err(db_err)?;

        info!(%report_id, %entry_id, "activity entry deleted");
        Ok(EntryOutcome {
            entry,
            work_item_id,
            report,
            totals,
        })
    }

    /// Finds an entry whether or not it was soft-deleted.
    ///
    /// # Errors
    ///
    /// `EntryNotFound` or `Forbidden`.
    pub async fn find_entry_including_deleted(
        &self,
        actor: &Actor,
        entry_id: Uuid,
    ) -> Result<activity_entries::Model, ActivityError> {
        let report_id = self.parent_report_id(entry_id).await?;
        let report = self.find_report(report_id).await?;
        authorize_report(&self.access, actor, &report).await?;

        activity_entries::Entity::find_by_id(entry_id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or(ActivityError::EntryNotFound(entry_id))
    }

    async fn find_report(&self, report_id: Uuid) -> Result<activity_reports::Model, ActivityError> {
        find_in(&self.db, report_id).await
    }

    async fn parent_report_id(&self, entry_id: Uuid) -> Result<Uuid, ActivityError> {
        report_id_for_entry(&self.db, entry_id)
            .await?
            .ok_or(ActivityError::EntryNotFound(entry_id))
    }
}

fn today() -> chrono::NaiveDate {
    Utc::now().date_naive()
}

fn hundredths(valid: &ValidEntry) -> Result<i64, ActivityError> {
    quantity_to_hundredths(valid.quantity).map_err(|_| ActivityError::AmountOverflow("quantity"))
}

async fn find_active_entry<C: ConnectionTrait>(
    conn: &C,
    entry_id: Uuid,
) -> Result<activity_entries::Model, ActivityError> {
    activity_entries::Entity::find_by_id(entry_id)
        .filter(activity_entries::Column::DeletedAt.is_null())
        .one(conn)
        .await
        .map_err(db_err)?
        .ok_or(ActivityError::EntryNotFound(entry_id))
}

async fn current_work_item_id<C: ConnectionTrait>(
    conn: &C,
    entry_id: Uuid,
) -> Result<Option<Uuid>, ActivityError> {
    Ok(entry_work_items::Entity::find()
        .filter(entry_work_items::Column::EntryId.eq(entry_id))
        .one(conn)
        .await
        .map_err(db_err)?
        .map(|link| link.work_item_id))
}

/// The work item must exist, belong to the report's organization and be active.
async fn ensure_work_item_accessible<C: ConnectionTrait>(
    conn: &C,
    report: &activity_reports::Model,
    work_item_id: Uuid,
) -> Result<(), ActivityError> {
    let work_item = work_items::Entity::find_by_id(work_item_id)
        .one(conn)
        .await
        .map_err(db_err)?
        .ok_or(ActivityError::WorkItemNotFound(work_item_id))?;

    if work_item.organization_id != report.organization_id || !work_item.is_active {
        return Err(ActivityError::WorkItemNotAccessible(work_item_id));
    }
    Ok(())
}

/// No two active entries of a report may share (work item, date).
async fn ensure_unique<C: ConnectionTrait>(
    conn: &C,
    report_id: Uuid,
    candidate: &ValidEntry,
    exclude: Option<Uuid>,
) -> Result<(), ActivityError> {
    let clash = load_lines(conn, report_id, false).await?.into_iter().any(|line| {
        Some(line.entry_id) != exclude
            && line.work_item_id == Some(candidate.work_item_id)
            && line.date == candidate.date
    });

    if clash {
        return Err(ActivityError::DuplicateEntry {
            work_item_id: candidate.work_item_id,
            date: candidate.date,
        });
    }
    Ok(())
}
