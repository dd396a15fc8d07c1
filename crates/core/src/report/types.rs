//! Report domain types.

use cadence_shared::types::Currency;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Report status in the activity lifecycle.
///
/// The valid transitions are:
/// - Draft → Submitted (submit)
/// - Submitted → Locked (lock)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    /// Report is open; entries can be attached and changed.
    Draft,
    /// Totals are frozen; only the lock remains.
    Submitted,
    /// Terminal. An audit commit exists for the report.
    Locked,
}

impl ReportStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::Locked => "locked",
        }
    }

    /// Parses a status from a string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "draft" => Some(Self::Draft),
            "submitted" => Some(Self::Submitted),
            "locked" => Some(Self::Locked),
            _ => None,
        }
    }

    /// Returns true if the report can be exported.
    #[must_use]
    pub const fn is_exportable(self) -> bool {
        matches!(self, Self::Submitted | Self::Locked)
    }

    /// Returns true if no further mutation is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Locked)
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Calendar month a report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReportPeriod {
    /// Year, e.g. 2026.
    pub year: i32,
    /// Month, 1 to 12.
    pub month: u32,
}

impl fmt::Display for ReportPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

/// Unvalidated input for creating a report.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewReport {
    /// Month, 1 to 12.
    pub month: Option<i64>,
    /// Year within the configured range.
    pub year: Option<i64>,
    /// ISO currency code.
    pub currency: Option<String>,
    /// Free text.
    pub description: Option<String>,
}

/// Validated report input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidReport {
    /// Covered period.
    pub period: ReportPeriod,
    /// Billing currency.
    pub currency: Currency,
    /// Free text.
    pub description: Option<String>,
}

/// Unvalidated partial update of a report.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportPatch {
    /// New month.
    pub month: Option<i64>,
    /// New year.
    pub year: Option<i64>,
    /// New currency code.
    pub currency: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// Requested status, as received.
    pub status: Option<String>,
}

impl ReportPatch {
    /// Returns true if the patch carries no field at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.month.is_none()
            && self.year.is_none()
            && self.currency.is_none()
            && self.description.is_none()
            && self.status.is_none()
    }

    /// Returns true if the patch changes any non-status field.
    #[must_use]
    pub const fn has_field_changes(&self) -> bool {
        self.month.is_some()
            || self.year.is_some()
            || self.currency.is_some()
            || self.description.is_some()
    }
}

/// Validated non-status fields of a report patch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidReportPatch {
    /// New month.
    pub month: Option<u32>,
    /// New year.
    pub year: Option<i32>,
    /// New currency.
    pub currency: Option<Currency>,
    /// New description.
    pub description: Option<String>,
}

/// Filter for listing reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportFilter {
    /// Only reports in this status.
    pub status: Option<ReportStatus>,
    /// Only reports of this year.
    pub year: Option<i32>,
    /// Only reports of this month.
    pub month: Option<u32>,
}

/// Unvalidated list filters, as received.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportQuery {
    /// Status name.
    pub status: Option<String>,
    /// Year.
    pub year: Option<i64>,
    /// Month.
    pub month: Option<i64>,
}

/// Status change carried by an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleTransition {
    /// Draft → Submitted.
    Submit,
    /// Submitted → Locked.
    Lock,
}

impl LifecycleTransition {
    /// Returns the status after the transition.
    #[must_use]
    pub const fn target(self) -> ReportStatus {
        match self {
            Self::Submit => ReportStatus::Submitted,
            Self::Lock => ReportStatus::Locked,
        }
    }
}
