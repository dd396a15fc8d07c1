//! Database seeder for Cadence development and testing.
//!
//! Seeds one business context with a contractor, a viewer and a handful of
//! work items, then prints a bearer token for the contractor so the API can
//! be exercised with curl.
//!
//! Usage: cargo run --bin seeder

use anyhow::Context;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use uuid::Uuid;

use cadence_db::entities::{organization_members, sea_orm_active_enums::MemberRole, work_items};
use cadence_shared::{AppConfig, JwtConfig, JwtService};

/// Development business context (stable across runs).
const SEED_ORG_ID: Uuid = Uuid::from_u128(0x0000_0000_0000_0000_0000_0000_0000_0001);
/// Development contractor.
const SEED_CONTRACTOR_ID: Uuid = Uuid::from_u128(0x0000_0000_0000_0000_0000_0000_0000_0002);
/// Development viewer.
const SEED_VIEWER_ID: Uuid = Uuid::from_u128(0x0000_0000_0000_0000_0000_0000_0000_0003);

const WORK_ITEMS: [(u128, &str, bool); 4] = [
    (0x10, "Platform migration", true),
    (0x11, "Code review", true),
    (0x12, "On-call support", true),
    (0x13, "Legacy billing (closed)", false),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("loading configuration")?;

    println!("Connecting to database...");
    let db = cadence_db::connect(&config.database.url)
        .await
        .context("connecting to database")?;

    println!("Seeding memberships...");
    seed_member(&db, SEED_CONTRACTOR_ID, MemberRole::Contractor).await?;
    seed_member(&db, SEED_VIEWER_ID, MemberRole::Viewer).await?;

    println!("Seeding work items...");
    seed_work_items(&db).await?;

    let jwt = JwtService::new(JwtConfig {
        secret: config.jwt.secret.clone(),
        access_token_expires_minutes: 24 * 60,
    });
    let token = jwt
        .generate_token(SEED_CONTRACTOR_ID, SEED_ORG_ID, "contractor")
        .context("minting contractor token")?;

    println!("Seeding complete!");
    println!("  organization: {SEED_ORG_ID}");
    println!("  contractor token (24h): {token}");
    Ok(())
}

/// Inserts a membership unless it already exists.
async fn seed_member(db: &DatabaseConnection, user_id: Uuid, role: MemberRole) -> anyhow::Result<()> {
    if organization_members::Entity::find_by_id((SEED_ORG_ID, user_id))
        .one(db)
        .await?
        .is_some()
    {
        println!("  Member {user_id} already exists, skipping...");
        return Ok(());
    }

    organization_members::ActiveModel {
        organization_id: Set(SEED_ORG_ID),
        user_id: Set(user_id),
        role: Set(role),
        is_active: Set(true),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await
    .with_context(|| format!("inserting member {user_id}"))?;
    println!("  Created member {user_id} ({role:?})");
    Ok(())
}

async fn seed_work_items(db: &DatabaseConnection) -> anyhow::Result<()> {
    let mut inserted = 0;
    for (raw_id, label, is_active) in WORK_ITEMS {
        let id = Uuid::from_u128(raw_id);
        if work_items::Entity::find_by_id(id).one(db).await?.is_some() {
            continue;
        }

        work_items::ActiveModel {
            id: Set(id),
            organization_id: Set(SEED_ORG_ID),
            label: Set(label.to_string()),
            is_active: Set(is_active),
            created_at: Set(Utc::now().into()),
        }
        .insert(db)
        .await
        .with_context(|| format!("inserting work item {label}"))?;
        inserted += 1;
    }

    println!("  Inserted {inserted} work items");
    Ok(())
}
