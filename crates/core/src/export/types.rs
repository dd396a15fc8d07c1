//! Export types.

use cadence_shared::types::Currency;
use serde::Deserialize;
use uuid::Uuid;

use crate::report::ReportPeriod;

/// Content type of rendered exports.
pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

/// Rendering options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ExportOptions {
    /// Omit per-entry rows and emit only the header and the `TOTAL` row.
    #[serde(default)]
    pub totals_only: bool,
}

/// Report facts printed into the export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportHeader {
    /// Report id.
    pub report_id: Uuid,
    /// Covered period.
    pub period: ReportPeriod,
    /// Billing currency.
    pub currency: Currency,
}

impl ExportHeader {
    /// Deterministic file name, e.g. `activity-report-2026-03-<id>.csv`.
    #[must_use]
    pub fn filename(&self) -> String {
        format!(
            "activity-report-{}-{:02}-{}.csv",
            self.period.year, self.period.month, self.report_id
        )
    }
}

/// A fully rendered export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDocument {
    /// Suggested file name.
    pub filename: String,
    /// MIME type.
    pub content_type: &'static str,
    /// UTF-8 bytes including the byte-order mark.
    pub body: Vec<u8>,
    /// Number of per-entry rows written.
    pub row_count: usize,
}
