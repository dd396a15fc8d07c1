//! Activity report routes.

use axum::{
    Router,
    extract::State,
    http::{
        StatusCode,
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cadence_core::report::{NewReport, ReportPatch, ReportQuery};
use cadence_core::{
    ActivityError, AggregationEngine, EntryLine, ExportOptions, ValidationGate,
};
use cadence_db::entities::activity_reports;
use cadence_db::repositories::{LockOutcome, ReportDetail};
use cadence_shared::types::PageRequest;
use cadence_shared::types::amount::{format_major, format_quantity};

use crate::error::{ApiError, respond};
use crate::extractors::{IdPath, QueryParams, Wrapped};
use crate::{AppState, middleware::AuthUser};

/// Creates the report routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/reports", get(list_reports).post(create_report))
        .route("/reports/{id}", get(get_report).patch(update_report))
        .route("/reports/{id}/submit", post(submit_report))
        .route("/reports/{id}/lock", post(lock_report))
        .route("/reports/{id}/export", get(export_report))
}

// ============================================================================
// Query Parameters
// ============================================================================

/// Query parameters for listing reports.
#[derive(Debug, Default, Deserialize)]
pub struct ListReportsQuery {
    /// Filter by status.
    pub status: Option<String>,
    /// Filter by year.
    pub year: Option<i64>,
    /// Filter by month.
    pub month: Option<i64>,
    /// Page number (1-indexed, default: 1).
    pub page: Option<u32>,
    /// Items per page (default: 20, max: 100).
    pub per_page: Option<u32>,
}

// ============================================================================
// Response Types
// ============================================================================

/// Response for a report.
#[derive(Debug, Serialize)]
pub struct ReportResponse {
    /// Report ID.
    pub id: Uuid,
    /// Business context.
    pub organization_id: Uuid,
    /// Owner.
    pub owner_id: Uuid,
    /// Period as `YYYY-MM`.
    pub period: String,
    /// Year.
    pub year: i32,
    /// Month.
    pub month: i32,
    /// Currency code.
    pub currency: String,
    /// Lifecycle status.
    pub status: String,
    /// Free text.
    pub description: Option<String>,
    /// Total days, two decimals.
    pub total_days: String,
    /// Total amount in cents.
    pub total_amount_cents: i64,
    /// Total amount in major units, two decimals.
    pub total_amount: String,
    /// When the report was submitted.
    pub submitted_at: Option<DateTime<FixedOffset>>,
    /// When the report was locked.
    pub locked_at: Option<DateTime<FixedOffset>>,
    /// Creation timestamp.
    pub created_at: DateTime<FixedOffset>,
    /// Last update timestamp.
    pub updated_at: DateTime<FixedOffset>,
}

impl From<activity_reports::Model> for ReportResponse {
    fn from(report: activity_reports::Model) -> Self {
        let totals = report.stored_totals();
        Self {
            id: report.id,
            organization_id: report.organization_id,
            owner_id: report.owner_id,
            period: format!("{}-{:02}", report.period_year, report.period_month),
            year: report.period_year,
            month: report.period_month,
            status: report.core_status().to_string(),
            currency: report.currency,
            description: report.description,
            total_days: format_quantity(totals.total_days),
            total_amount_cents: totals.total_amount_cents,
            total_amount: format_major(totals.total_amount_cents),
            submitted_at: report.submitted_at,
            locked_at: report.locked_at,
            created_at: report.created_at,
            updated_at: report.updated_at,
        }
    }
}

/// An entry as listed under its report.
#[derive(Debug, Serialize)]
pub struct EntryLineResponse {
    /// Entry ID.
    pub id: Uuid,
    /// Day the work happened.
    pub date: NaiveDate,
    /// Linked work item.
    pub work_item_id: Option<Uuid>,
    /// Work item label, or the placeholder for a dangling link.
    pub work_item_label: String,
    /// Days worked, two decimals.
    pub quantity: String,
    /// Price of one day in cents.
    pub unit_price_cents: i64,
    /// Quantity times unit price, in cents.
    pub line_total_cents: Option<i64>,
    /// Free text.
    pub description: Option<String>,
}

impl From<&EntryLine> for EntryLineResponse {
    fn from(line: &EntryLine) -> Self {
        Self {
            id: line.entry_id,
            date: line.date,
            work_item_id: line.work_item_id,
            work_item_label: AggregationEngine::label_for(line).to_string(),
            quantity: format_quantity(line.quantity),
            unit_price_cents: line.unit_price_cents,
            line_total_cents: AggregationEngine::line_total(line.quantity, line.unit_price_cents)
                .ok(),
            description: line.description.clone(),
        }
    }
}

/// A report with its active entries.
#[derive(Debug, Serialize)]
pub struct ReportDetailResponse {
    /// The report.
    pub report: ReportResponse,
    /// Active entries in chronological order.
    pub entries: Vec<EntryLineResponse>,
}

impl From<ReportDetail> for ReportDetailResponse {
    fn from(detail: ReportDetail) -> Self {
        Self {
            entries: detail.entries.iter().map(EntryLineResponse::from).collect(),
            report: detail.report.into(),
        }
    }
}

/// Audit receipt returned by a lock.
#[derive(Debug, Serialize)]
pub struct AuditReceiptResponse {
    /// Audit commit ID.
    pub commit_id: Uuid,
    /// SHA-256 of the snapshot content.
    pub content_hash: String,
    /// When the commit was appended.
    pub committed_at: String,
}

/// Response for a lock.
#[derive(Debug, Serialize)]
pub struct LockResponse {
    /// The locked report.
    pub report: ReportResponse,
    /// Audit receipt.
    pub audit: AuditReceiptResponse,
}

impl From<LockOutcome> for LockResponse {
    fn from(outcome: LockOutcome) -> Self {
        Self {
            report: outcome.report.into(),
            audit: AuditReceiptResponse {
                commit_id: outcome.receipt.commit_id.into_inner(),
                content_hash: outcome.receipt.content_hash,
                committed_at: outcome.receipt.committed_at.to_rfc3339(),
            },
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST `/reports` - Create a draft report.
async fn create_report(
    State(state): State<AppState>,
    auth: AuthUser,
    Wrapped(input): Wrapped<NewReport>,
) -> Result<Response, ApiError> {
    let report = state.reports().create(&auth.actor(), input).await?;
    Ok(respond(StatusCode::CREATED, ReportResponse::from(report)))
}

/// GET `/reports` - List the caller's reports.
async fn list_reports(
    State(state): State<AppState>,
    auth: AuthUser,
    QueryParams(query): QueryParams<ListReportsQuery>,
) -> Result<Response, ApiError> {
    let filter = ValidationGate::validate_report_query(
        &ReportQuery {
            status: query.status,
            year: query.year,
            month: query.month,
        },
        &state.policy,
    )
    .map_err(ActivityError::InvalidPayload)?;
    let defaults = PageRequest::default();
    let page = PageRequest::new(
        query.page.unwrap_or(defaults.page),
        query.per_page.unwrap_or(defaults.per_page),
    );

    let reports = state.reports().list(&auth.actor(), filter, page).await?;
    Ok(respond(StatusCode::OK, reports.map(ReportResponse::from)))
}

/// GET `/reports/{id}` - Report with its active entries.
async fn get_report(
    State(state): State<AppState>,
    auth: AuthUser,
    IdPath(id): IdPath,
) -> Result<Response, ApiError> {
    let detail = state.reports().get(&auth.actor(), id).await?;
    Ok(respond(StatusCode::OK, ReportDetailResponse::from(detail)))
}

/// PATCH `/reports/{id}` - Update fields, optionally moving the status one step.
async fn update_report(
    State(state): State<AppState>,
    auth: AuthUser,
    IdPath(id): IdPath,
    Wrapped(patch): Wrapped<ReportPatch>,
) -> Result<Response, ApiError> {
    let report = state.reports().update(&auth.actor(), id, patch).await?;
    Ok(respond(StatusCode::OK, ReportResponse::from(report)))
}

/// POST `/reports/{id}/submit` - Freeze totals and submit.
async fn submit_report(
    State(state): State<AppState>,
    auth: AuthUser,
    IdPath(id): IdPath,
) -> Result<Response, ApiError> {
    let report = state.reports().submit(&auth.actor(), id).await?;
    Ok(respond(StatusCode::OK, ReportResponse::from(report)))
}

/// POST `/reports/{id}/lock` - Append the audit commit and lock.
async fn lock_report(
    State(state): State<AppState>,
    auth: AuthUser,
    IdPath(id): IdPath,
) -> Result<Response, ApiError> {
    let outcome = state.reports().lock(&auth.actor(), id).await?;
    Ok(respond(StatusCode::OK, LockResponse::from(outcome)))
}

/// GET `/reports/{id}/export` - CSV attachment.
async fn export_report(
    State(state): State<AppState>,
    auth: AuthUser,
    IdPath(id): IdPath,
    QueryParams(options): QueryParams<ExportOptions>,
) -> Result<Response, ApiError> {
    let document = state.exports().export(&auth.actor(), id, options).await?;
    let disposition = format!("attachment; filename=\"{}\"", document.filename);

    Ok((
        StatusCode::OK,
        [
            (CONTENT_TYPE, document.content_type.to_string()),
            (CONTENT_DISPOSITION, disposition),
        ],
        document.body,
    )
        .into_response())
}
