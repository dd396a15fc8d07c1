//! Activity report types and the lifecycle state machine.
//!
//! Reports move `draft` → `submitted` → `locked`. There is no way back and
//! no skipping; `locked` is terminal.

pub mod lifecycle;
pub mod types;

#[cfg(test)]
mod lifecycle_props;

pub use lifecycle::ReportLifecycle;
pub use types::{
    LifecycleTransition, NewReport, ReportFilter, ReportPatch, ReportPeriod, ReportQuery,
    ReportStatus, ValidReport, ValidReportPatch,
};
