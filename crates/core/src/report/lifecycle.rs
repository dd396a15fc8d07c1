//! Report lifecycle state machine.
//!
//! Pure guards only. Persistence applies the returned decisions inside its
//! own transaction.

use crate::error::ActivityError;
use crate::report::types::{LifecycleTransition, ReportStatus};
use crate::validation::{Rule, ValidationFailure, Violation};

/// Stateless guards for report status changes.
pub struct ReportLifecycle;

impl ReportLifecycle {
    /// Requires a draft report for `operation`.
    ///
    /// # Errors
    ///
    /// Returns `ActivityError::StateConflict` for submitted and locked reports.
    pub fn ensure_draft(status: ReportStatus, operation: &'static str) -> Result<(), ActivityError> {
        match status {
            ReportStatus::Draft => Ok(()),
            other => Err(ActivityError::conflict(operation, other)),
        }
    }

    /// Checks a draft → submitted transition.
    ///
    /// # Arguments
    /// * `status` - The current status of the report
    /// * `active_entries` - Number of linked, non-deleted entries
    ///
    /// # Errors
    ///
    /// * `ActivityError::StateConflict` if the report is not a draft
    /// * `ActivityError::InvalidPayload` with rule `no_active_entries` if empty
    pub fn submit(status: ReportStatus, active_entries: usize) -> Result<ReportStatus, ActivityError> {
        Self::ensure_draft(status, "submit")?;
        if active_entries == 0 {
            return Err(ActivityError::InvalidPayload(ValidationFailure::single(
                Violation::new("entries", Rule::NoActiveEntries),
            )));
        }
        Ok(ReportStatus::Submitted)
    }

    /// Checks a submitted → locked transition.
    ///
    /// # Errors
    ///
    /// Returns `ActivityError::StateConflict` unless the report is submitted.
    pub fn lock(status: ReportStatus) -> Result<ReportStatus, ActivityError> {
        match status {
            ReportStatus::Submitted => Ok(ReportStatus::Locked),
            other => Err(ActivityError::conflict("lock", other)),
        }
    }

    /// Plans the status part of a report update.
    ///
    /// Returns `None` when the update carries no status.
    ///
    /// # Errors
    ///
    /// * `StateConflict` for locked reports, whatever the patch holds
    /// * `InvalidTransition` for unknown targets and, from draft, anything but `submitted`
    /// * `StatusChangeNotAllowed` from submitted to anything but `locked`
    pub fn plan_update(
        status: ReportStatus,
        requested: Option<&str>,
    ) -> Result<Option<LifecycleTransition>, ActivityError> {
        if status.is_terminal() {
            return Err(ActivityError::conflict("update", status));
        }
        let Some(raw) = requested else {
            return Ok(None);
        };
        let Some(target) = ReportStatus::parse(raw) else {
            return Err(ActivityError::InvalidTransition {
                from: status,
                to: raw.to_string(),
            });
        };

        match (status, target) {
            (ReportStatus::Draft, ReportStatus::Submitted) => Ok(Some(LifecycleTransition::Submit)),
            (ReportStatus::Submitted, ReportStatus::Locked) => Ok(Some(LifecycleTransition::Lock)),
            (ReportStatus::Submitted, to) => {
                Err(ActivityError::StatusChangeNotAllowed { from: status, to })
            }
            (from, to) => Err(ActivityError::InvalidTransition {
                from,
                to: to.as_str().to_string(),
            }),
        }
    }

    /// Requires a submitted or locked report for export.
    ///
    /// # Errors
    ///
    /// Returns `ActivityError::StateConflict` for drafts.
    pub fn ensure_exportable(status: ReportStatus) -> Result<(), ActivityError> {
        if status.is_exportable() {
            Ok(())
        } else {
            Err(ActivityError::conflict("export", status))
        }
    }

    /// Returns true if `from` → `to` is a single forward step.
    #[must_use]
    pub const fn is_valid_transition(from: ReportStatus, to: ReportStatus) -> bool {
        matches!(
            (from, to),
            (ReportStatus::Draft, ReportStatus::Submitted)
                | (ReportStatus::Submitted, ReportStatus::Locked)
        )
    }
}
