//! Core activity ledger logic for Cadence.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Gates, the report state machine, the totals arithmetic and the export
//! rendering live here; persistence and orchestration live in `cadence-db`.
//!
//! # Modules
//!
//! - `access` - Permission gate and the access-context seam
//! - `validation` - Field and business-rule checks
//! - `report` - Report types and the lifecycle state machine
//! - `entry` - Entry inputs and patches
//! - `aggregation` - Totals recompute over linked entries
//! - `audit` - Lock-time snapshot and the audit ledger seam
//! - `export` - Deterministic CSV rendering
//! - `error` - Error taxonomy shared by every operation

pub mod access;
pub mod aggregation;
pub mod audit;
pub mod entry;
pub mod error;
pub mod export;
pub mod report;
pub mod validation;

pub use access::{AccessContextProvider, AccessDecision, Actor, MemberRole, PermissionGate};
pub use aggregation::{AggregationEngine, EntryLine, ReportTotals};
pub use audit::{AuditError, AuditLedger, AuditReceipt, AuditSnapshot};
pub use error::{ActivityError, ErrorKind};
pub use export::{ExportDocument, ExportEngine, ExportOptions};
pub use report::{ReportLifecycle, ReportStatus};
pub use validation::{ValidationFailure, ValidationGate, ValidationPolicy};
