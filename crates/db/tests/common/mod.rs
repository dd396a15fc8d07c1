//! Shared fixture for the activity ledger integration tests.
//!
//! Each fixture owns a fresh in-memory SQLite database with the schema
//! migrated, one organization with members of every role, and a handful of
//! work items.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use sea_orm_migration::MigratorTrait;
use uuid::Uuid;

use cadence_core::access::{AccessContextProvider, Actor};
use cadence_core::audit::AuditLedger;
use cadence_core::entry::NewEntry;
use cadence_core::report::NewReport;
use cadence_core::ValidationPolicy;
use cadence_db::entities::sea_orm_active_enums::MemberRole;
use cadence_db::entities::{activity_reports, organization_members, work_items};
use cadence_db::migration::Migrator;
use cadence_db::repositories::EntryOutcome;
use cadence_db::{
    AssociationRepository, DbAuditLedger, EntryRepository, ExportRepository,
    MembershipAccessProvider, ReportRepository,
};
use cadence_shared::types::{OrganizationId, UserId};

pub async fn setup_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options)
        .await
        .expect("Failed to open in-memory database");
    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    db
}

pub struct Fixture {
    pub db: DatabaseConnection,
    pub organization_id: Uuid,
    /// Contractor who owns the reports created through [`Fixture::draft`].
    pub owner: Actor,
    /// Admin of the same organization, not the owner.
    pub colleague: Actor,
    pub viewer: Actor,
    /// Active user of another organization.
    pub outsider: Actor,
    pub work_item: Uuid,
    pub second_work_item: Uuid,
    pub inactive_work_item: Uuid,
    pub foreign_work_item: Uuid,
}

impl Fixture {
    pub async fn new() -> Self {
        let db = setup_db().await;
        let organization_id = Uuid::new_v4();
        let other_organization_id = Uuid::new_v4();

        let owner = insert_member(&db, organization_id, MemberRole::Contractor).await;
        let colleague = insert_member(&db, organization_id, MemberRole::Admin).await;
        let viewer = insert_member(&db, organization_id, MemberRole::Viewer).await;
        let outsider = insert_member(&db, other_organization_id, MemberRole::Owner).await;

        let work_item = insert_work_item(&db, organization_id, "Platform migration", true).await;
        let second_work_item = insert_work_item(&db, organization_id, "Code review", true).await;
        let inactive_work_item = insert_work_item(&db, organization_id, "Archived", false).await;
        let foreign_work_item =
            insert_work_item(&db, other_organization_id, "Other client", true).await;

        Self {
            db,
            organization_id,
            owner,
            colleague,
            viewer,
            outsider,
            work_item,
            second_work_item,
            inactive_work_item,
            foreign_work_item,
        }
    }

    pub fn access(&self) -> Arc<dyn AccessContextProvider> {
        Arc::new(MembershipAccessProvider::new(self.db.clone()))
    }

    pub fn ledger(&self) -> DbAuditLedger {
        DbAuditLedger::new(self.db.clone())
    }

    pub fn reports(&self) -> ReportRepository {
        self.reports_with_ledger(Arc::new(self.ledger()))
    }

    pub fn reports_with_ledger(&self, ledger: Arc<dyn AuditLedger>) -> ReportRepository {
        ReportRepository::new(
            self.db.clone(),
            self.access(),
            ledger,
            ValidationPolicy::default(),
        )
    }

    pub fn entries(&self) -> EntryRepository {
        EntryRepository::new(self.db.clone(), self.access(), ValidationPolicy::default())
    }

    pub fn exports(&self) -> ExportRepository {
        ExportRepository::new(self.db.clone(), self.access())
    }

    pub fn associations(&self) -> AssociationRepository {
        AssociationRepository::new(self.db.clone())
    }

    /// Creates a March 2025 EUR draft owned by [`Fixture::owner`].
    pub async fn draft(&self) -> activity_reports::Model {
        self.reports()
            .create(&self.owner, march_report())
            .await
            .expect("Failed to create draft")
    }

    pub async fn add_entry(
        &self,
        report_id: Uuid,
        work_item_id: Uuid,
        day: u32,
        quantity: Decimal,
        unit_price_cents: i64,
    ) -> EntryOutcome {
        self.entries()
            .create(
                &self.owner,
                report_id,
                entry(work_item_id, day, quantity, unit_price_cents),
            )
            .await
            .expect("Failed to create entry")
    }
}

pub fn march_report() -> NewReport {
    NewReport {
        month: Some(3),
        year: Some(2025),
        currency: Some("EUR".into()),
        description: Some("March engagement".into()),
    }
}

pub fn march(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, day).expect("valid day")
}

pub fn entry(work_item_id: Uuid, day: u32, quantity: Decimal, unit_price_cents: i64) -> NewEntry {
    NewEntry {
        work_item_id: Some(work_item_id),
        date: Some(march(day)),
        quantity: Some(quantity),
        unit_price_cents: Some(Decimal::from(unit_price_cents)),
        description: None,
    }
}

async fn insert_member(
    db: &DatabaseConnection,
    organization_id: Uuid,
    role: MemberRole,
) -> Actor {
    let user_id = Uuid::new_v4();
    organization_members::ActiveModel {
        organization_id: Set(organization_id),
        user_id: Set(user_id),
        role: Set(role),
        is_active: Set(true),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await
    .expect("Failed to insert member");

    Actor::new(
        UserId::from_uuid(user_id),
        OrganizationId::from_uuid(organization_id),
    )
}

async fn insert_work_item(
    db: &DatabaseConnection,
    organization_id: Uuid,
    label: &str,
    is_active: bool,
) -> Uuid {
    work_items::ActiveModel {
        id: Set(Uuid::new_v4()),
        organization_id: Set(organization_id),
        label: Set(label.to_string()),
        is_active: Set(is_active),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await
    .expect("Failed to insert work item")
    .id
}
