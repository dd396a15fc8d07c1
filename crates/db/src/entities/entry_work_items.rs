//! `SeaORM` Entity for entry_work_items join table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "entry_work_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub entry_id: Uuid,
    /// Not a foreign key: work items live in an external registry.
    pub work_item_id: Uuid,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::activity_entries::Entity",
        from = "Column::EntryId",
        to = "super::activity_entries::Column::Id"
    )]
    ActivityEntries,
}

impl Related<super::activity_entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ActivityEntries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
