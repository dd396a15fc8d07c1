//! `SeaORM` active enums, stored as text.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use cadence_core::{MemberRole as CoreMemberRole, ReportStatus as CoreReportStatus};

/// Report status column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "submitted")]
    Submitted,
    #[sea_orm(string_value = "locked")]
    Locked,
}

impl From<ReportStatus> for CoreReportStatus {
    fn from(status: ReportStatus) -> Self {
        match status {
            ReportStatus::Draft => Self::Draft,
            ReportStatus::Submitted => Self::Submitted,
            ReportStatus::Locked => Self::Locked,
        }
    }
}

impl From<CoreReportStatus> for ReportStatus {
    fn from(status: CoreReportStatus) -> Self {
        match status {
            CoreReportStatus::Draft => Self::Draft,
            CoreReportStatus::Submitted => Self::Submitted,
            CoreReportStatus::Locked => Self::Locked,
        }
    }
}

/// Organization member role column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    #[sea_orm(string_value = "owner")]
    Owner,
    #[sea_orm(string_value = "admin")]
    Admin,
    #[sea_orm(string_value = "contractor")]
    Contractor,
    #[sea_orm(string_value = "viewer")]
    Viewer,
}

impl From<MemberRole> for CoreMemberRole {
    fn from(role: MemberRole) -> Self {
        match role {
            MemberRole::Owner => Self::Owner,
            MemberRole::Admin => Self::Admin,
            MemberRole::Contractor => Self::Contractor,
            MemberRole::Viewer => Self::Viewer,
        }
    }
}

impl From<CoreMemberRole> for MemberRole {
    fn from(role: CoreMemberRole) -> Self {
        match role {
            CoreMemberRole::Owner => Self::Owner,
            CoreMemberRole::Admin => Self::Admin,
            CoreMemberRole::Contractor => Self::Contractor,
            CoreMemberRole::Viewer => Self::Viewer,
        }
    }
}
