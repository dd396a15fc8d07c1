//! Activity entry routes.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Response,
    routing::{patch, post},
};
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::Serialize;
use uuid::Uuid;

use cadence_core::entry::{EntryPatch, NewEntry};
use cadence_db::repositories::EntryOutcome;
use cadence_shared::types::amount::{format_major, format_quantity};

use crate::error::{ApiError, respond};
use crate::extractors::{IdPath, Wrapped};
use crate::{AppState, middleware::AuthUser};

/// Creates the entry routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/reports/{id}/entries", post(create_entry))
        .route("/entries/{id}", patch(update_entry).delete(destroy_entry))
}

/// Response for an entry mutation.
#[derive(Debug, Serialize)]
pub struct EntryResponse {
    /// Entry ID.
    pub id: Uuid,
    /// Parent report.
    pub report_id: Uuid,
    /// Linked work item.
    pub work_item_id: Option<Uuid>,
    /// Day the work happened.
    pub date: NaiveDate,
    /// Days worked, two decimals.
    pub quantity: String,
    /// Price of one day in cents.
    pub unit_price_cents: i64,
    /// Quantity times unit price, in cents.
    pub line_total_cents: i64,
    /// Free text.
    pub description: Option<String>,
    /// Soft-delete marker.
    pub deleted_at: Option<DateTime<FixedOffset>>,
    /// Report totals after the recompute.
    pub report_totals: ReportTotalsResponse,
}

/// Report totals after an entry mutation.
#[derive(Debug, Serialize)]
pub struct ReportTotalsResponse {
    /// Total days, two decimals.
    pub total_days: String,
    /// Total amount in cents.
    pub total_amount_cents: i64,
    /// Total amount in major units, two decimals.
    pub total_amount: String,
}

impl From<EntryOutcome> for EntryResponse {
    fn from(outcome: EntryOutcome) -> Self {
        let entry = outcome.entry;
        Self {
            id: entry.id,
            report_id: outcome.report.id,
            work_item_id: outcome.work_item_id,
            date: entry.entry_date,
            quantity: format_quantity(entry.quantity()),
            unit_price_cents: entry.unit_price_cents,
            line_total_cents: entry.line_total_cents,
            description: entry.description,
            deleted_at: entry.deleted_at,
            report_totals: ReportTotalsResponse {
                total_days: format_quantity(outcome.totals.total_days),
                total_amount_cents: outcome.totals.total_amount_cents,
                total_amount: format_major(outcome.totals.total_amount_cents),
            },
        }
    }
}

/// POST `/reports/{id}/entries` - Add an entry to a draft report.
async fn create_entry(
    State(state): State<AppState>,
    auth: AuthUser,
    IdPath(report_id): IdPath,
    Wrapped(input): Wrapped<NewEntry>,
) -> Result<Response, ApiError> {
    let outcome = state.entries().create(&auth.actor(), report_id, input).await?;
    Ok(respond(StatusCode::CREATED, EntryResponse::from(outcome)))
}

/// PATCH `/entries/{id}` - Partially update an entry.
async fn update_entry(
    State(state): State<AppState>,
    auth: AuthUser,
    IdPath(entry_id): IdPath,
    Wrapped(changes): Wrapped<EntryPatch>,
) -> Result<Response, ApiError> {
    let outcome = state.entries().update(&auth.actor(), entry_id, changes).await?;
    Ok(respond(StatusCode::OK, EntryResponse::from(outcome)))
}

/// DELETE `/entries/{id}` - Soft-delete an entry.
async fn destroy_entry(
    State(state): State<AppState>,
    auth: AuthUser,
    IdPath(entry_id): IdPath,
) -> Result<Response, ApiError> {
    let outcome = state.entries().destroy(&auth.actor(), entry_id).await?;
    Ok(respond(StatusCode::OK, EntryResponse::from(outcome)))
}
