//! Activity ledger schema.
//!
//! Plain SQL that runs unchanged on PostgreSQL and SQLite: no server-side
//! defaults, no extensions, one statement per call.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        for statement in UP {
            db.execute_unprepared(statement).await?;
        }
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        for statement in DOWN {
            db.execute_unprepared(statement).await?;
        }
        Ok(())
    }
}

const UP: &[&str] = &[
    // External registries, read-only for the engine
    r"
CREATE TABLE organization_members (
    organization_id UUID NOT NULL,
    user_id UUID NOT NULL,
    role VARCHAR(16) NOT NULL,
    is_active BOOLEAN NOT NULL,
    created_at TIMESTAMPTZ NOT NULL,
    PRIMARY KEY (organization_id, user_id),
    CONSTRAINT chk_member_role CHECK (role IN ('owner', 'admin', 'contractor', 'viewer'))
)",
    r"
CREATE TABLE work_items (
    id UUID PRIMARY KEY,
    organization_id UUID NOT NULL,
    label VARCHAR(255) NOT NULL,
    is_active BOOLEAN NOT NULL,
    created_at TIMESTAMPTZ NOT NULL
)",
    "CREATE INDEX idx_work_items_org ON work_items(organization_id)",
    // Reports
    r"
CREATE TABLE activity_reports (
    id UUID PRIMARY KEY,
    organization_id UUID NOT NULL,
    owner_id UUID NOT NULL,
    period_year INTEGER NOT NULL,
    period_month INTEGER NOT NULL,
    currency VARCHAR(3) NOT NULL,
    status VARCHAR(16) NOT NULL,
    description TEXT,
    total_days_hundredths BIGINT NOT NULL,
    total_amount_cents BIGINT NOT NULL,
    submitted_at TIMESTAMPTZ,
    locked_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL,
    CONSTRAINT chk_report_status CHECK (status IN ('draft', 'submitted', 'locked')),
    CONSTRAINT chk_report_month CHECK (period_month BETWEEN 1 AND 12),
    CONSTRAINT chk_report_totals CHECK (total_days_hundredths >= 0 AND total_amount_cents >= 0),
    CONSTRAINT chk_report_locked_at CHECK (status <> 'locked' OR locked_at IS NOT NULL)
)",
    "CREATE INDEX idx_reports_owner_period ON activity_reports(organization_id, owner_id, period_year, period_month)",
    "CREATE INDEX idx_reports_status ON activity_reports(organization_id, status)",
    // Entries
    r"
CREATE TABLE activity_entries (
    id UUID PRIMARY KEY,
    entry_date DATE NOT NULL,
    quantity_hundredths BIGINT NOT NULL,
    unit_price_cents BIGINT NOT NULL,
    line_total_cents BIGINT NOT NULL,
    description TEXT,
    created_by UUID NOT NULL,
    deleted_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL,
    CONSTRAINT chk_entry_quantity CHECK (quantity_hundredths > 0),
    CONSTRAINT chk_entry_price CHECK (unit_price_cents >= 0)
)",
    "CREATE INDEX idx_entries_active ON activity_entries(entry_date) WHERE deleted_at IS NULL",
    // Join tables
    r"
CREATE TABLE report_entries (
    id UUID PRIMARY KEY,
    report_id UUID NOT NULL REFERENCES activity_reports(id) ON DELETE CASCADE,
    entry_id UUID NOT NULL REFERENCES activity_entries(id) ON DELETE CASCADE,
    created_at TIMESTAMPTZ NOT NULL,
    CONSTRAINT uq_report_entries UNIQUE (report_id, entry_id)
)",
    "CREATE INDEX idx_report_entries_entry ON report_entries(entry_id)",
    r"
CREATE TABLE entry_work_items (
    id UUID PRIMARY KEY,
    entry_id UUID NOT NULL REFERENCES activity_entries(id) ON DELETE CASCADE,
    work_item_id UUID NOT NULL,
    created_at TIMESTAMPTZ NOT NULL,
    CONSTRAINT uq_entry_work_items UNIQUE (entry_id, work_item_id)
)",
    "CREATE INDEX idx_entry_work_items_work_item ON entry_work_items(work_item_id)",
    // Audit ledger
    r"
CREATE TABLE audit_commits (
    id UUID PRIMARY KEY,
    report_id UUID NOT NULL REFERENCES activity_reports(id),
    sequence BIGINT NOT NULL,
    content_hash VARCHAR(64) NOT NULL,
    previous_hash VARCHAR(64),
    chain_hash VARCHAR(64) NOT NULL,
    payload TEXT NOT NULL,
    committed_at TIMESTAMPTZ NOT NULL,
    CONSTRAINT uq_audit_commits_report UNIQUE (report_id),
    CONSTRAINT uq_audit_commits_sequence UNIQUE (sequence)
)",
];

const DOWN: &[&str] = &[
    "DROP TABLE IF EXISTS audit_commits",
    "DROP TABLE IF EXISTS entry_work_items",
    "DROP TABLE IF EXISTS report_entries",
    "DROP TABLE IF EXISTS activity_entries",
    "DROP TABLE IF EXISTS activity_reports",
    "DROP TABLE IF EXISTS work_items",
    "DROP TABLE IF EXISTS organization_members",
];
