//! Export rendering.

use cadence_shared::types::amount::{format_major, format_quantity};

use crate::aggregation::{AggregationEngine, EntryLine, ReportTotals};
use crate::error::ActivityError;
use crate::export::types::{CSV_CONTENT_TYPE, ExportDocument, ExportHeader, ExportOptions};

/// Leading byte-order mark so spreadsheet tools detect UTF-8.
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Stateless CSV renderer.
pub struct ExportEngine;

impl ExportEngine {
    /// Renders the report as CSV.
    ///
    /// Only active lines are written, in chronological order. The `TOTAL`
    /// row uses `totals` as given; callers decide whether those are freshly
    /// recomputed or stored.
    ///
    /// # Errors
    ///
    /// Returns `ActivityError::ExportFailed` or `AmountOverflow` if any row
    /// cannot be produced. No partial document is returned.
    pub fn render(
        header: &ExportHeader,
        lines: &[EntryLine],
        totals: &ReportTotals,
        options: ExportOptions,
    ) -> Result<ExportDocument, ActivityError> {
        let mut active: Vec<EntryLine> = lines.iter().filter(|l| l.is_active).cloned().collect();
        AggregationEngine::sort_chronological(&mut active);

        let mut body = UTF8_BOM.to_vec();
        let mut row_count = 0;
        {
            let mut writer = csv::Writer::from_writer(&mut body);
            let currency = header.currency.code();

            writer
                .write_record([
                    "Date".to_string(),
                    "Work item".to_string(),
                    "Quantity".to_string(),
                    format!("Unit price ({currency})"),
                    format!("Line total ({currency})"),
                    "Description".to_string(),
                ])
                .map_err(export_failed)?;

            if !options.totals_only {
                for line in &active {
                    let line_total =
                        AggregationEngine::line_total(line.quantity, line.unit_price_cents)?;
                    writer
                        .write_record([
                            line.date.format("%Y-%m-%d").to_string(),
                            AggregationEngine::label_for(line).to_string(),
                            format_quantity(line.quantity),
                            format_major(line.unit_price_cents),
                            format_major(line_total),
                            line.description.clone().unwrap_or_default(),
                        ])
                        .map_err(export_failed)?;
                    row_count += 1;
                }
            }

            writer
                .write_record([
                    "TOTAL".to_string(),
                    String::new(),
                    format_quantity(totals.total_days),
                    String::new(),
                    format_major(totals.total_amount_cents),
                    String::new(),
                ])
                .map_err(export_failed)?;

            writer
                .flush()
                .map_err(|e| ActivityError::ExportFailed(e.to_string()))?;
        }

        Ok(ExportDocument {
            filename: header.filename(),
            content_type: CSV_CONTENT_TYPE,
            body,
            row_count,
        })
    }
}

fn export_failed(err: csv::Error) -> ActivityError {
    ActivityError::ExportFailed(err.to_string())
}
