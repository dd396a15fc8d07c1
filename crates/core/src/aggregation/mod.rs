//! Totals recompute over the entries linked to a report.
//!
//! The engine is handed every line reachable through the report's join rows
//! and sums the active ones. It never reads a cached total.

pub mod engine;

#[cfg(test)]
mod engine_props;

pub use engine::{AggregationEngine, EntryLine, ReportTotals, UNLINKED_WORK_ITEM_LABEL};
