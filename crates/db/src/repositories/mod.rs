//! Repository services for the activity ledger.
//!
//! Each service owns a `DatabaseConnection` and runs the pure gates from
//! `cadence-core` before touching storage. Connection-generic helpers are
//! exposed where another service needs them inside its own transaction.

pub mod access;
pub mod activity_entry;
pub mod activity_report;
pub mod aggregation;
pub mod association;
pub mod audit_ledger;
pub mod export;

pub use access::MembershipAccessProvider;
pub use activity_entry::{EntryOutcome, EntryRepository};
pub use activity_report::{LockOutcome, ReportDetail, ReportRepository};
pub use association::{AssociationRepository, LinkDebugInfo};
pub use audit_ledger::DbAuditLedger;
pub use export::ExportRepository;
