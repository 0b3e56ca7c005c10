//! Database configuration module for PetForce.
//!
//! This module handles database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with
//! `Schema::create_table_from_entity`, so the schema always matches the Rust models.
//! The same code runs against `SQLite` (development and tests) and Postgres.

use crate::entities::{
    AccessRequest, Activity, Expense, FeedingLog, FeedingSchedule, HealthRecord, Household,
    Invitation, Medication, Member, Pet, feeding_log, member,
};
use crate::errors::Result;
use sea_orm::sea_query::{Index, IndexCreateStatement, TableCreateStatement};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use std::path::Path;
use tracing::{debug, info, instrument};

/// Fallback used when neither the config file nor `DATABASE_URL` names a database.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/petforce.sqlite?mode=rwc";

/// Establishes a connection to the database at `database_url`.
#[instrument]
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    debug!("Connecting to database");
    Database::connect(database_url).await.map_err(Into::into)
}

fn table_for<E: EntityTrait>(schema: &Schema, entity: E) -> TableCreateStatement {
    let mut stmt = schema.create_table_from_entity(entity);
    stmt.if_not_exists();
    stmt
}

fn unique_indexes() -> Vec<IndexCreateStatement> {
    vec![
        // One membership per user per household
        Index::create()
            .name("idx_members_household_user")
            .table(Member)
            .col(member::Column::HouseholdId)
            .col(member::Column::UserId)
            .unique()
            .if_not_exists()
            .to_owned(),
        // One completion per schedule per day
        Index::create()
            .name("idx_feeding_logs_schedule_date")
            .table(FeedingLog)
            .col(feeding_log::Column::ScheduleId)
            .col(feeding_log::Column::Date)
            .unique()
            .if_not_exists()
            .to_owned(),
    ]
}

/// Creates all tables and unique indexes if they do not exist yet.
///
/// Tables are created parents-first so that the foreign keys declared on the entity
/// relations (with their cascade rules) can be resolved.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let tables = [
        table_for(&schema, Household),
        table_for(&schema, Member),
        table_for(&schema, Pet),
        table_for(&schema, Activity),
        table_for(&schema, Invitation),
        table_for(&schema, AccessRequest),
        table_for(&schema, FeedingSchedule),
        table_for(&schema, FeedingLog),
        table_for(&schema, HealthRecord),
        table_for(&schema, Medication),
        table_for(&schema, Expense),
    ];

    for table in &tables {
        db.execute(builder.build(table)).await?;
    }
    for index in &unique_indexes() {
        db.execute(builder.build(index)).await?;
    }

    info!("Database tables ensured ({} tables)", tables.len());
    Ok(())
}

/// Creates the parent directory of a file-backed `SQLite` database.
fn ensure_sqlite_dir(database_url: &str) -> Result<()> {
    let Some(rest) = database_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let path = rest.split('?').next().unwrap_or_default();
    if path.is_empty() || path.contains(":memory:") {
        return Ok(());
    }
    if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Connects and makes sure the schema exists. Used at startup.
pub async fn init_database(database_url: &str) -> Result<DatabaseConnection> {
    ensure_sqlite_dir(database_url)?;
    let db = create_connection(database_url).await?;
    create_tables(&db).await?;
    Ok(db)
}
