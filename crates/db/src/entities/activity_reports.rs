//! `SeaORM` Entity for activity_reports table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use cadence_core::access::ReportAccess;
use cadence_core::audit::SnapshotHeader;
use cadence_core::export::ExportHeader;
use cadence_core::report::ReportPeriod;
use cadence_core::{ActivityError, ReportStatus as CoreReportStatus, ReportTotals};
use cadence_shared::types::amount::hundredths_to_quantity;
use cadence_shared::types::{Currency, OrganizationId, UserId};

use super::sea_orm_active_enums::ReportStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "activity_reports")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub organization_id: Uuid,
    pub owner_id: Uuid,
    pub period_year: i32,
    pub period_month: i32,
    pub currency: String,
    pub status: ReportStatus,
    pub description: Option<String>,
    pub total_days_hundredths: i64,
    pub total_amount_cents: i64,
    pub submitted_at: Option<DateTimeWithTimeZone>,
    pub locked_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::report_entries::Entity")]
    ReportEntries,
    #[sea_orm(has_one = "super::audit_commits::Entity")]
    AuditCommits,
}

impl Related<super::report_entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ReportEntries.def()
    }
}

impl Related<super::audit_commits::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AuditCommits.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Lifecycle status.
    #[must_use]
    pub fn core_status(&self) -> CoreReportStatus {
        self.status.into()
    }

    /// Ownership facts for the permission gate.
    #[must_use]
    pub const fn access(&self) -> ReportAccess {
        ReportAccess {
            owner_id: UserId::from_uuid(self.owner_id),
            organization_id: OrganizationId::from_uuid(self.organization_id),
        }
    }

    /// Covered period.
    ///
    /// # Errors
    ///
    /// Returns `ActivityError::Database` if the stored month is negative.
    pub fn period(&self) -> Result<ReportPeriod, ActivityError> {
        let month = u32::try_from(self.period_month)
            .map_err(|_| ActivityError::Database(format!("invalid month on report {}", self.id)))?;
        Ok(ReportPeriod {
            year: self.period_year,
            month,
        })
    }

    /// Billing currency.
    ///
    /// # Errors
    ///
    /// Returns `ActivityError::Database` if the stored code is unknown.
    pub fn currency(&self) -> Result<Currency, ActivityError> {
        self.currency
            .parse()
            .map_err(|e: String| ActivityError::Database(format!("report {}: {e}", self.id)))
    }

    /// Totals as last persisted.
    #[must_use]
    pub fn stored_totals(&self) -> ReportTotals {
        ReportTotals {
            total_days: hundredths_to_quantity(self.total_days_hundredths).normalize(),
            total_amount_cents: self.total_amount_cents,
        }
    }

    /// Header facts for the audit snapshot.
    ///
    /// # Errors
    ///
    /// Returns `ActivityError::Database` if stored values are malformed.
    pub fn snapshot_header(&self) -> Result<SnapshotHeader, ActivityError> {
        let access = self.access();
        Ok(SnapshotHeader {
            report_id: self.id,
            owner_id: access.owner_id,
            organization_id: access.organization_id,
            period: self.period()?,
            currency: self.currency()?,
        })
    }

    /// Header facts for exports.
    ///
    /// # Errors
    ///
    /// Returns `ActivityError::Database` if stored values are malformed.
    pub fn export_header(&self) -> Result<ExportHeader, ActivityError> {
        Ok(ExportHeader {
            report_id: self.id,
            period: self.period()?,
            currency: self.currency()?,
        })
    }
}
