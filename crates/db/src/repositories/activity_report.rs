//! Report lifecycle service.
//!
//! Every operation runs the permission gate first. State guards are
//! evaluated again on rows re-read inside the writing transaction, so a
//! competing transition that committed first makes the call fail its guard.
//!
//! Locking appends to the audit ledger before the status transaction opens.
//! The ledger is retry-safe, so a failed status write can simply be retried.
//! The lock transaction refuses to flip the status if the row changed after
//! its snapshot was taken.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
    TryIntoModel,
};
use tracing::{error, info, warn};
use uuid::Uuid;

use cadence_core::access::{AccessContextProvider, Actor};
use cadence_core::audit::{AuditLedger, AuditReceipt, AuditSnapshot};
use cadence_core::report::{
    LifecycleTransition, NewReport, ReportFilter, ReportPatch, ValidReportPatch,
};
use cadence_core::{
    ActivityError, AggregationEngine, EntryLine, ReportLifecycle, ReportStatus, ValidationGate,
    ValidationPolicy,
};
use cadence_shared::types::{PageRequest, PageResponse};

use crate::entities::{activity_reports, sea_orm_active_enums};

use super::access::{authorize_context, authorize_report};
use super::aggregation::{load_lines, recalculate_and_persist};
use super::association::db_err;

/// A report with its active entries.
#[derive(Debug, Clone)]
pub struct ReportDetail {
    /// The report row.
    pub report: activity_reports::Model,
    /// Active entries in chronological order.
    pub entries: Vec<EntryLine>,
}

/// Result of a lock.
#[derive(Debug, Clone)]
pub struct LockOutcome {
    /// The locked report.
    pub report: activity_reports::Model,
    /// Audit ledger receipt.
    pub receipt: AuditReceipt,
}

/// Report lifecycle service.
#[derive(Clone)]
pub struct ReportRepository {
    db: DatabaseConnection,
    access: Arc<dyn AccessContextProvider>,
    ledger: Arc<dyn AuditLedger>,
    policy: ValidationPolicy,
}

impl std::fmt::Debug for ReportRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportRepository")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl ReportRepository {
    /// Creates a new report repository.
    #[must_use]
    pub fn new(
        db: DatabaseConnection,
        access: Arc<dyn AccessContextProvider>,
        ledger: Arc<dyn AuditLedger>,
        policy: ValidationPolicy,
    ) -> Self {
        Self {
            db,
            access,
            ledger,
            policy,
        }
    }

    /// Creates a draft report owned by the actor, with zero totals.
    ///
    /// # Errors
    ///
    /// `Forbidden` for ineligible roles, `InvalidPayload` for rule violations.
    pub async fn create(
        &self,
        actor: &Actor,
        input: NewReport,
    ) -> Result<activity_reports::Model, ActivityError> {
        authorize_context(&self.access, actor).await?;
        let valid = ValidationGate::validate_new_report(&input, &self.policy)
            .map_err(ActivityError::InvalidPayload)?;

        let now = Utc::now().into();
        let report = activity_reports::ActiveModel {
            id: Set(Uuid::now_v7()),
            organization_id: Set(actor.organization_id.into_inner()),
            owner_id: Set(actor.user_id.into_inner()),
            period_year: Set(valid.period.year),
            period_month: Set(month_column(valid.period.month)),
            currency: Set(valid.currency.code().to_string()),
            status: Set(sea_orm_active_enums::ReportStatus::Draft),
            description: Set(valid.description),
            total_days_hundredths: Set(0),
            total_amount_cents: Set(0),
            submitted_at: Set(None),
            locked_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await
        .map_err(db_err)?;

        info!(report_id = %report.id, period = %valid.period, "activity report created");
        Ok(report)
    }

    /// Returns a report with its active entries.
    ///
    /// # Errors
    ///
    /// `ReportNotFound` or `Forbidden`.
    pub async fn get(&self, actor: &Actor, report_id: Uuid) -> Result<ReportDetail, ActivityError> {
        let report = self.find(report_id).await?;
        authorize_report(&self.access, actor, &report).await?;

        let mut entries = load_lines(&self.db, report_id, false).await?;
        AggregationEngine::sort_chronological(&mut entries);
        Ok(ReportDetail { report, entries })
    }

    /// Lists the actor's own reports in their business context, newest period first.
    ///
    /// # Errors
    ///
    /// `Forbidden` for ineligible roles.
    pub async fn list(
        &self,
        actor: &Actor,
        filter: ReportFilter,
        page: PageRequest,
    ) -> Result<PageResponse<activity_reports::Model>, ActivityError> {
        authorize_context(&self.access, actor).await?;

        let mut query = activity_reports::Entity::find()
            .filter(activity_reports::Column::OrganizationId.eq(actor.organization_id.into_inner()))
            .filter(activity_reports::Column::OwnerId.eq(actor.user_id.into_inner()));
        if let Some(status) = filter.status {
            query = query.filter(
                activity_reports::Column::Status.eq(sea_orm_active_enums::ReportStatus::from(status)),
            );
        }
        if let Some(year) = filter.year {
            query = query.filter(activity_reports::Column::PeriodYear.eq(year));
        }
        if let Some(month) = filter.month {
            query = query.filter(activity_reports::Column::PeriodMonth.eq(month_column(month)));
        }

        let total = query.clone().count(&self.db).await.map_err(db_err)?;
        let items = query
            .order_by_desc(activity_reports::Column::PeriodYear)
            .order_by_desc(activity_reports::Column::PeriodMonth)
            .order_by_desc(activity_reports::Column::CreatedAt)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(PageResponse::new(items, page.page, page.per_page, total))
    }

    /// Submits a draft report: recomputes and freezes its totals.
    ///
    /// # Errors
    ///
    /// `Forbidden`, `StateConflict` unless draft, `InvalidPayload` without
    /// active entries.
    pub async fn submit(
        &self,
        actor: &Actor,
        report_id: Uuid,
    ) -> Result<activity_reports::Model, ActivityError> {
        let report = self.find(report_id).await?;
        authorize_report(&self.access, actor, &report).await?;

        let txn = self.db.begin().await.map_err(db_err)?;
        let report = find_in(&txn, report_id).await?;
        let report = submit_in(&txn, report).await?;
        txn.commit().await.map_err(db_err)?;

        info!(%report_id, total_amount_cents = report.total_amount_cents, "activity report submitted");
        Ok(report)
    }

    /// Locks a submitted report after appending its snapshot to the audit ledger.
    ///
    /// # Errors
    ///
    /// `Forbidden`, `StateConflict` unless submitted or if the report changed
    /// after its snapshot was taken, `AuditAppendFailed` if the ledger
    /// refuses (the report stays submitted).
    pub async fn lock(&self, actor: &Actor, report_id: Uuid) -> Result<LockOutcome, ActivityError> {
        let report = self.find(report_id).await?;
        authorize_report(&self.access, actor, &report).await?;
        ReportLifecycle::lock(report.core_status())?;

        let receipt = self.append_snapshot(&report).await?;

        let txn = self.db.begin().await.map_err(db_err)?;
        let current = find_in(&txn, report_id).await?;
        ensure_unchanged_since(&current, &report, "lock")?;
        let report = lock_in(&txn, current).await?;
        txn.commit().await.map_err(db_err)?;

        info!(%report_id, commit_id = %receipt.commit_id, "activity report locked");
        Ok(LockOutcome { report, receipt })
    }

    /// Updates report fields and optionally moves the report one step forward.
    ///
    /// # Errors
    ///
    /// * `StateConflict` for locked reports, whatever the patch holds
    /// * `InvalidTransition` / `StatusChangeNotAllowed` for bad status values
    /// * `InvalidPayload` for an empty patch or rule violations
    /// * anything `submit` or `lock` can return when a status is requested
    pub async fn update(
        &self,
        actor: &Actor,
        report_id: Uuid,
        patch: ReportPatch,
    ) -> Result<activity_reports::Model, ActivityError> {
        let report = self.find(report_id).await?;
        authorize_report(&self.access, actor, &report).await?;

        let transition = ReportLifecycle::plan_update(report.core_status(), patch.status.as_deref())?;
        let fields = ValidationGate::validate_report_patch(&patch, &self.policy)
            .map_err(ActivityError::InvalidPayload)?;

        if transition == Some(LifecycleTransition::Lock) {
            let patched = apply_fields(report.clone(), &fields)
                .try_into_model()
                .map_err(db_err)?;
            self.append_snapshot(&patched).await?;
        }

        let txn = self.db.begin().await.map_err(db_err)?;
        let current = find_in(&txn, report_id).await?;
        if ReportLifecycle::plan_update(current.core_status(), patch.status.as_deref())? != transition {
            return Err(ActivityError::conflict("update", current.core_status()));
        }
        if transition == Some(LifecycleTransition::Lock) {
            ensure_unchanged_since(&current, &report, "update")?;
        }

        let mut report = current;
        if patch.has_field_changes() {
            let mut active = apply_fields(report, &fields);
            active.updated_at = Set(Utc::now().into());
            report = active.update(&txn).await.map_err(db_err)?;
        }

        report = match transition {
            Some(LifecycleTransition::Submit) => submit_in(&txn, report).await?,
            Some(LifecycleTransition::Lock) => lock_in(&txn, report).await?,
            None => report,
        };
        txn.commit().await.map_err(db_err)?;

        info!(%report_id, status = %report.core_status(), "activity report updated");
        Ok(report)
    }

    async fn find(&self, report_id: Uuid) -> Result<activity_reports::Model, ActivityError> {
        find_in(&self.db, report_id).await
    }

    async fn append_snapshot(
        &self,
        report: &activity_reports::Model,
    ) -> Result<AuditReceipt, ActivityError> {
        let lines = load_lines(&self.db, report.id, false).await?;
        let snapshot = AuditSnapshot::capture(report.snapshot_header()?, &lines, Utc::now())?;

        self.ledger.append(&snapshot).await.map_err(|e| {
            error!(report_id = %report.id, error = %e, "audit ledger append failed");
            ActivityError::from(e)
        })
    }
}

/// Loads a report by id.
///
/// # Errors
///
/// `ReportNotFound` or `Database`.
pub async fn find_in<C: ConnectionTrait>(
    conn: &C,
    report_id: Uuid,
) -> Result<activity_reports::Model, ActivityError> {
    activity_reports::Entity::find_by_id(report_id)
        .one(conn)
        .await
        .map_err(db_err)?
        .ok_or(ActivityError::ReportNotFound(report_id))
}

/// Draft → submitted on an already-authorized report.
///
/// # Errors
///
/// `StateConflict`, `InvalidPayload` (no active entries), `Database`.
pub async fn submit_in<C: ConnectionTrait>(
    conn: &C,
    report: activity_reports::Model,
) -> Result<activity_reports::Model, ActivityError> {
    let lines = load_lines(conn, report.id, false).await?;
    ReportLifecycle::submit(report.core_status(), AggregationEngine::active_count(&lines))?;

    let (report, _) = recalculate_and_persist(conn, report).await?;

    let now = Utc::now().into();
    let mut active: activity_reports::ActiveModel = report.into();
    active.status = Set(ReportStatus::Submitted.into());
    active.submitted_at = Set(Some(now));
    active.updated_at = Set(now);
    active.update(conn).await.map_err(db_err)
}

/// Submitted → locked on an already-authorized report whose snapshot was appended.
///
/// # Errors
///
/// `StateConflict` or `Database`.
pub async fn lock_in<C: ConnectionTrait>(
    conn: &C,
    report: activity_reports::Model,
) -> Result<activity_reports::Model, ActivityError> {
    ReportLifecycle::lock(report.core_status())?;

    let now = Utc::now().into();
    let mut active: activity_reports::ActiveModel = report.into();
    active.status = Set(ReportStatus::Locked.into());
    active.locked_at = Set(Some(now));
    active.updated_at = Set(now);
    active.update(conn).await.map_err(db_err)
}

/// Fails with a conflict if the row was written after `snapshotted` was read.
fn ensure_unchanged_since(
    current: &activity_reports::Model,
    snapshotted: &activity_reports::Model,
    operation: &'static str,
) -> Result<(), ActivityError> {
    if current.updated_at == snapshotted.updated_at {
        Ok(())
    } else {
        warn!(report_id = %current.id, operation, "report changed after its audit snapshot");
        Err(ActivityError::conflict(operation, current.core_status()))
    }
}

fn apply_fields(
    report: activity_reports::Model,
    fields: &ValidReportPatch,
) -> activity_reports::ActiveModel {
    let mut active = report.into_active_model();
    if let Some(month) = fields.month {
        active.period_month = Set(month_column(month));
    }
    if let Some(year) = fields.year {
        active.period_year = Set(year);
    }
    if let Some(currency) = fields.currency {
        active.currency = Set(currency.code().to_string());
    }
    if let Some(description) = &fields.description {
        active.description = Set(Some(description.clone()));
    }
    active
}

/// Months are validated to 1..=12 before they reach this point.
fn month_column(month: u32) -> i32 {
    i32::try_from(month).unwrap_or(i32::MAX)
}
