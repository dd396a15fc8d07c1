//! CSV export orchestration.

use std::sync::Arc;

use sea_orm::DatabaseConnection;
use tracing::{error, info, warn};
use uuid::Uuid;

use cadence_core::access::{AccessContextProvider, Actor};
use cadence_core::{
    ActivityError, AggregationEngine, ExportDocument, ExportEngine, ExportOptions, ReportLifecycle,
};

use super::access::authorize_report;
use super::activity_report::find_in;
use super::aggregation::load_lines;

/// Builds CSV documents for submitted and locked reports.
#[derive(Clone)]
pub struct ExportRepository {
    db: DatabaseConnection,
    access: Arc<dyn AccessContextProvider>,
}

impl std::fmt::Debug for ExportRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportRepository").finish_non_exhaustive()
    }
}

impl ExportRepository {
    /// Creates a new export repository.
    #[must_use]
    pub fn new(db: DatabaseConnection, access: Arc<dyn AccessContextProvider>) -> Self {
        Self { db, access }
    }

    /// Renders the report as CSV.
    ///
    /// Totals are recomputed from the linked entries; if that fails the
    /// stored totals are used instead. Nothing is written back.
    ///
    /// # Errors
    ///
    /// `ReportNotFound`, `Forbidden`, `StateConflict` for drafts,
    /// `ExportFailed` if rendering fails.
    pub async fn export(
        &self,
        actor: &Actor,
        report_id: Uuid,
        options: ExportOptions,
    ) -> Result<ExportDocument, ActivityError> {
        let report = find_in(&self.db, report_id).await?;
        authorize_report(&self.access, actor, &report).await?;
        ReportLifecycle::ensure_exportable(report.core_status())?;

        let lines = load_lines(&self.db, report_id, false).await?;
        let totals = AggregationEngine::recalculate(&lines).unwrap_or_else(|e| {
            warn!(%report_id, error = %e, "export recompute failed, using stored totals");
            report.stored_totals()
        });

        let document = ExportEngine::render(&report.export_header()?, &lines, &totals, options)
            .inspect_err(|e| error!(%report_id, error = %e, "export rendering failed"))?;

        info!(
            %report_id,
            rows = document.row_count,
            totals_only = options.totals_only,
            "activity report exported"
        );
        Ok(document)
    }
}
