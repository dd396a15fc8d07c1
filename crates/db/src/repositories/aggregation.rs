//! Loads the lines reachable through a report's join rows and persists totals.
//!
//! Walks `report_entries` → `activity_entries` → `entry_work_items` →
//! `work_items`. A link whose work item no longer resolves still yields a
//! line; its label is left empty and rendered as the placeholder.

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use tracing::debug;
use uuid::Uuid;

use cadence_core::{ActivityError, AggregationEngine, EntryLine, ReportTotals};
use cadence_shared::types::amount::quantity_to_hundredths;

use crate::entities::{activity_entries, activity_reports, work_items};

use super::association::{db_err, entries_for_report_in, work_item_links_for_entries};

/// Builds the aggregation lines of a report.
///
/// # Errors
///
/// Returns `ActivityError::Database` if a query fails.
pub async fn load_lines<C: ConnectionTrait>(
    conn: &C,
    report_id: Uuid,
    include_deleted: bool,
) -> Result<Vec<EntryLine>, ActivityError> {
    let entries = entries_for_report_in(conn, report_id, include_deleted).await?;
    lines_for_entries(conn, entries).await
}

/// Builds aggregation lines for already loaded entries.
///
/// # Errors
///
/// Returns `ActivityError::Database` if a query fails.
pub async fn lines_for_entries<C: ConnectionTrait>(
    conn: &C,
    entries: Vec<activity_entries::Model>,
) -> Result<Vec<EntryLine>, ActivityError> {
    let links = work_item_links_for_entries(conn, entries.iter().map(|e| e.id).collect()).await?;

    // First link wins; an entry carries at most one work item.
    let mut work_item_by_entry: HashMap<Uuid, Uuid> = HashMap::new();
    for link in &links {
        work_item_by_entry
            .entry(link.entry_id)
            .or_insert(link.work_item_id);
    }

    let work_item_ids: Vec<Uuid> = work_item_by_entry.values().copied().collect();
    let labels: HashMap<Uuid, String> = if work_item_ids.is_empty() {
        HashMap::new()
    } else {
        work_items::Entity::find()
            .filter(work_items::Column::Id.is_in(work_item_ids))
            .all(conn)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(|w| (w.id, w.label))
            .collect()
    };

    Ok(entries
        .into_iter()
        .map(|entry| {
            let work_item_id = work_item_by_entry.get(&entry.id).copied();
            EntryLine {
                entry_id: entry.id,
                date: entry.entry_date,
                quantity: entry.quantity(),
                unit_price_cents: entry.unit_price_cents,
                work_item_id,
                work_item_label: work_item_id.and_then(|id| labels.get(&id).cloned()),
                description: entry.description.clone(),
                is_active: entry.is_active(),
            }
        })
        .collect())
}

/// Recomputes a report's totals from its active entries and persists them.
///
/// # Errors
///
/// Returns `AmountOverflow` or `Database` on failure.
pub async fn recalculate_and_persist<C: ConnectionTrait>(
    conn: &C,
    report: activity_reports::Model,
) -> Result<(activity_reports::Model, ReportTotals), ActivityError> {
    let lines = load_lines(conn, report.id, false).await?;
    let totals = AggregationEngine::recalculate(&lines)?;
    let report = persist_totals(conn, report, &totals).await?;
    Ok((report, totals))
}

/// Writes totals onto the report row.
///
/// # Errors
///
/// Returns `AmountOverflow` or `Database` on failure.
pub async fn persist_totals<C: ConnectionTrait>(
    conn: &C,
    report: activity_reports::Model,
    totals: &ReportTotals,
) -> Result<activity_reports::Model, ActivityError> {
    let total_days_hundredths = quantity_to_hundredths(totals.total_days)
        .map_err(|_| ActivityError::AmountOverflow("total days"))?;
    let report_id = report.id;

    let mut active: activity_reports::ActiveModel = report.into();
    active.total_days_hundredths = Set(total_days_hundredths);
    active.total_amount_cents = Set(totals.total_amount_cents);
    active.updated_at = Set(Utc::now().into());

    let updated = active.update(conn).await.map_err(db_err)?;
    debug!(
        %report_id,
        total_days_hundredths,
        total_amount_cents = totals.total_amount_cents,
        "report totals recalculated"
    );
    Ok(updated)
}
