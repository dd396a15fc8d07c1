//! `SeaORM` entity definitions.

pub mod activity_entries;
pub mod activity_reports;
pub mod audit_commits;
pub mod entry_work_items;
pub mod organization_members;
pub mod report_entries;
pub mod sea_orm_active_enums;
pub mod work_items;
