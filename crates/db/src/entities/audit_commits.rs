//! `SeaORM` Entity for audit_commits table.
//!
//! Append-only. One row per locked report; rows form a hash chain ordered by
//! `sequence`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "audit_commits")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub report_id: Uuid,
    #[sea_orm(unique)]
    pub sequence: i64,
    pub content_hash: String,
    pub previous_hash: Option<String>,
    pub chain_hash: String,
    #[sea_orm(column_type = "Text")]
    pub payload: String,
    pub committed_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::activity_reports::Entity",
        from = "Column::ReportId",
        to = "super::activity_reports::Column::Id"
    )]
    ActivityReports,
}

impl Related<super::activity_reports::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ActivityReports.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
