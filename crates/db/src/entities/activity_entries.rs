//! `SeaORM` Entity for activity_entries table.

use sea_orm::entity::prelude::*;
use cadence_shared::types::amount::hundredths_to_quantity;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "activity_entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub entry_date: Date,
    pub quantity_hundredths: i64,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
    pub description: Option<String>,
    pub created_by: Uuid,
    pub deleted_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::report_entries::Entity")]
    ReportEntries,
    #[sea_orm(has_many = "super::entry_work_items::Entity")]
    EntryWorkItems,
}

impl Related<super::report_entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ReportEntries.def()
    }
}

impl Related<super::entry_work_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EntryWorkItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Days worked.
    #[must_use]
    pub fn quantity(&self) -> Decimal {
        hundredths_to_quantity(self.quantity_hundredths).normalize()
    }

    /// False once soft-deleted.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}
