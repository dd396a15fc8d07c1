//! Lock-time snapshot and the audit ledger seam.
//!
//! When a report is locked, a snapshot of its header, totals and active
//! entries is appended to an immutable ledger. The lock only happens if the
//! append succeeds.

use async_trait::async_trait;
use cadence_shared::types::{AuditCommitId, Currency, OrganizationId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::aggregation::{AggregationEngine, EntryLine};
use crate::error::ActivityError;
use crate::report::ReportPeriod;

/// One active entry as frozen in the audit snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotEntry {
    /// Entry id.
    pub entry_id: Uuid,
    /// Day the work happened.
    pub date: NaiveDate,
    /// Linked work item.
    pub work_item_id: Option<Uuid>,
    /// Work-item label at lock time.
    pub work_item_label: String,
    /// Days worked.
    pub quantity: Decimal,
    /// Price of one day in cents.
    pub unit_price_cents: i64,
    /// Rounded line total in cents.
    pub line_total_cents: i64,
    /// Free text.
    pub description: Option<String>,
}

/// Content appended to the audit ledger when a report is locked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditSnapshot {
    /// Report id.
    pub report_id: Uuid,
    /// Report owner.
    pub owner_id: UserId,
    /// Business context.
    pub organization_id: OrganizationId,
    /// Covered period.
    pub period: ReportPeriod,
    /// Billing currency.
    pub currency: Currency,
    /// Sum of quantities.
    pub total_days: Decimal,
    /// Sum of line totals in cents.
    pub total_amount_cents: i64,
    /// Active entries in chronological order.
    pub entries: Vec<SnapshotEntry>,
    /// When the snapshot was taken.
    pub captured_at: DateTime<Utc>,
}

/// Header facts of the report being locked.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotHeader {
    /// Report id.
    pub report_id: Uuid,
    /// Report owner.
    pub owner_id: UserId,
    /// Business context.
    pub organization_id: OrganizationId,
    /// Covered period.
    pub period: ReportPeriod,
    /// Billing currency.
    pub currency: Currency,
}

impl AuditSnapshot {
    /// Builds a snapshot from the lines linked to the report.
    ///
    /// Totals are recomputed from the lines, so the snapshot is always
    /// self-consistent.
    ///
    /// # Errors
    ///
    /// Returns `ActivityError::AmountOverflow` if a total does not fit.
    pub fn capture(
        header: SnapshotHeader,
        lines: &[EntryLine],
        captured_at: DateTime<Utc>,
    ) -> Result<Self, ActivityError> {
        let totals = AggregationEngine::recalculate(lines)?;

        let mut active: Vec<EntryLine> = lines.iter().filter(|l| l.is_active).cloned().collect();
        AggregationEngine::sort_chronological(&mut active);

        let entries = active
            .iter()
            .map(|l| {
                Ok(SnapshotEntry {
                    entry_id: l.entry_id,
                    date: l.date,
                    work_item_id: l.work_item_id,
                    work_item_label: AggregationEngine::label_for(l).to_string(),
                    quantity: l.quantity,
                    unit_price_cents: l.unit_price_cents,
                    line_total_cents: AggregationEngine::line_total(l.quantity, l.unit_price_cents)?,
                    description: l.description.clone(),
                })
            })
            .collect::<Result<Vec<_>, ActivityError>>()?;

        Ok(Self {
            report_id: header.report_id,
            owner_id: header.owner_id,
            organization_id: header.organization_id,
            period: header.period,
            currency: header.currency,
            total_days: totals.total_days,
            total_amount_cents: totals.total_amount_cents,
            entries,
            captured_at,
        })
    }

    /// Serializes the full snapshot, as stored in the ledger payload.
    ///
    /// # Errors
    ///
    /// Returns `AuditError::Serialization` if encoding fails.
    pub fn to_payload(&self) -> Result<serde_json::Value, AuditError> {
        serde_json::to_value(self).map_err(|e| AuditError::Serialization(e.to_string()))
    }

    /// Canonical bytes the content hash is computed over.
    ///
    /// Keys are sorted and the capture time is left out, so retrying an
    /// append for unchanged content yields the same bytes.
    ///
    /// # Errors
    ///
    /// Returns `AuditError::Serialization` if encoding fails.
    pub fn canonical_content(&self) -> Result<Vec<u8>, AuditError> {
        let mut value = self.to_payload()?;
        if let Some(map) = value.as_object_mut() {
            map.remove("captured_at");
        }
        serde_json::to_vec(&value).map_err(|e| AuditError::Serialization(e.to_string()))
    }
}

/// Proof of a successful append.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditReceipt {
    /// Ledger row id.
    pub commit_id: AuditCommitId,
    /// Hex SHA-256 of the canonical content.
    pub content_hash: String,
    /// When the commit was written.
    pub committed_at: DateTime<Utc>,
}

/// Errors from the audit ledger.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuditError {
    /// The ledger could not be reached or failed to write.
    #[error("audit ledger unavailable: {0}")]
    Unavailable(String),

    /// The ledger refused the snapshot.
    #[error("audit ledger rejected snapshot: {0}")]
    Rejected(String),

    /// The snapshot could not be encoded.
    #[error("audit snapshot serialization failed: {0}")]
    Serialization(String),
}

impl From<AuditError> for ActivityError {
    fn from(err: AuditError) -> Self {
        Self::AuditAppendFailed(err.to_string())
    }
}

/// Append-only store of lock-time snapshots.
///
/// Appends must be retry-safe: appending the same content for a report that
/// already has a commit returns the existing receipt.
#[async_trait]
pub trait AuditLedger: Send + Sync {
    /// Appends a snapshot and returns the receipt.
    async fn append(&self, snapshot: &AuditSnapshot) -> Result<AuditReceipt, AuditError>;
}
