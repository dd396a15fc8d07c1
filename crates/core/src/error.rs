//! Error taxonomy for activity ledger operations.
//!
//! Every gate and service returns `ActivityError`. Each variant belongs to
//! exactly one `ErrorKind`, and each kind maps to one stable transport code.

use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::access::ForbiddenReason;
use crate::report::ReportStatus;
use crate::validation::ValidationFailure;

/// Failure kinds exposed to transport adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Missing top-level parameters.
    BadRequest,
    /// Permission denied.
    Forbidden,
    /// Missing entity or work item.
    NotFound,
    /// Field or business-rule violation.
    InvalidPayload,
    /// Lifecycle guard or duplicate entry.
    Conflict,
    /// Unrecognized or state-skipping status change.
    InvalidTransition,
    /// Appender, export or storage failure.
    Internal,
}

impl ErrorKind {
    /// Returns the HTTP status code for this kind.
    #[must_use]
    pub const fn status_code(self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::InvalidPayload | Self::InvalidTransition => 422,
            Self::Internal => 500,
        }
    }

    /// Returns the kind name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BadRequest => "bad_request",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not_found",
            Self::InvalidPayload => "invalid_payload",
            Self::Conflict => "conflict",
            Self::InvalidTransition => "invalid_transition",
            Self::Internal => "internal_error",
        }
    }
}

/// Errors that can occur during activity ledger operations.
#[derive(Debug, Error)]
pub enum ActivityError {
    // ========== Request Errors ==========
    /// Missing or malformed top-level parameters.
    #[error("Bad request: {0}")]
    BadRequest(String),

    // ========== Permission Errors ==========
    /// The permission gate rejected the actor.
    #[error("Access denied: {0}")]
    Forbidden(ForbiddenReason),

    /// The work item exists but the actor may not bill against it.
    #[error("Work item {0} is not accessible")]
    WorkItemNotAccessible(Uuid),

    // ========== Lookup Errors ==========
    /// Report not found.
    #[error("Report {0} not found")]
    ReportNotFound(Uuid),

    /// Entry not found (or soft-deleted).
    #[error("Entry {0} not found")]
    EntryNotFound(Uuid),

    /// Work item not found.
    #[error("Work item {0} not found")]
    WorkItemNotFound(Uuid),

    /// Join row not found.
    #[error("No {association} link between {left} and {right}")]
    LinkNotFound {
        /// Join table name.
        association: &'static str,
        /// Left-hand id.
        left: Uuid,
        /// Right-hand id.
        right: Uuid,
    },

    // ========== Payload Errors ==========
    /// One or more validation rules were violated.
    #[error("Invalid payload: {0}")]
    InvalidPayload(ValidationFailure),

    // ========== State Errors ==========
    /// The operation is not allowed in the report's current status.
    #[error("Cannot {operation} a {status} report")]
    StateConflict {
        /// Attempted operation.
        operation: &'static str,
        /// Current status.
        status: ReportStatus,
    },

    /// Another active entry already bills this work item on this date.
    #[error("An active entry for work item {work_item_id} on {date} already exists")]
    DuplicateEntry {
        /// Work item.
        work_item_id: Uuid,
        /// Entry date.
        date: NaiveDate,
    },

    /// Unrecognized or state-skipping status change.
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        /// Current status.
        from: ReportStatus,
        /// Requested target, as received.
        to: String,
    },

    /// A submitted report may only change non-status fields (or be locked).
    #[error("Status of a {from} report cannot be changed to {to}")]
    StatusChangeNotAllowed {
        /// Current status.
        from: ReportStatus,
        /// Requested status.
        to: ReportStatus,
    },

    // ========== Internal Errors ==========
    /// The audit ledger refused or failed the append.
    #[error("Audit ledger append failed: {0}")]
    AuditAppendFailed(String),

    /// Export rendering failed.
    #[error("Export failed: {0}")]
    ExportFailed(String),

    /// Amount arithmetic overflowed.
    #[error("Amount overflow while computing {0}")]
    AmountOverflow(&'static str),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl ActivityError {
    /// Returns the failure kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::BadRequest(_) => ErrorKind::BadRequest,
            Self::Forbidden(_) | Self::WorkItemNotAccessible(_) => ErrorKind::Forbidden,
            Self::ReportNotFound(_)
            | Self::EntryNotFound(_)
            | Self::WorkItemNotFound(_)
            | Self::LinkNotFound { .. } => ErrorKind::NotFound,
            Self::InvalidPayload(_) => ErrorKind::InvalidPayload,
            Self::StateConflict { .. } | Self::DuplicateEntry { .. } => ErrorKind::Conflict,
            Self::InvalidTransition { .. } | Self::StatusChangeNotAllowed { .. } => {
                ErrorKind::InvalidTransition
            }
            Self::AuditAppendFailed(_)
            | Self::ExportFailed(_)
            | Self::AmountOverflow(_)
            | Self::Database(_) => ErrorKind::Internal,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        self.kind().status_code()
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::WorkItemNotAccessible(_) => "WORK_ITEM_NOT_ACCESSIBLE",
            Self::ReportNotFound(_) => "REPORT_NOT_FOUND",
            Self::EntryNotFound(_) => "ENTRY_NOT_FOUND",
            Self::WorkItemNotFound(_) => "WORK_ITEM_NOT_FOUND",
            Self::LinkNotFound { .. } => "LINK_NOT_FOUND",
            Self::InvalidPayload(_) => "INVALID_PAYLOAD",
            Self::StateConflict { .. } => "STATE_CONFLICT",
            Self::DuplicateEntry { .. } => "DUPLICATE_ENTRY",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::StatusChangeNotAllowed { .. } => "STATUS_CHANGE_NOT_ALLOWED",
            Self::AuditAppendFailed(_)
            | Self::ExportFailed(_)
            | Self::AmountOverflow(_)
            | Self::Database(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the message safe to show to callers.
    ///
    /// Internal failures are reduced to a generic message; details stay in logs.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::Internal => "An internal error occurred".to_string(),
            _ => self.to_string(),
        }
    }

    /// Shorthand for a state-guard conflict.
    #[must_use]
    pub const fn conflict(operation: &'static str, status: ReportStatus) -> Self {
        Self::StateConflict { operation, status }
    }
}
