//! Shared test utilities for PetForce.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    api::AppState,
    core::{
        household,
        membership::Membership,
        pet::{self, NewPet},
    },
    entities::{self, member},
    errors::{Error, Result},
    identity::JwtVerifier,
    models::Role,
    storage::AvatarStorage,
};
use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use serde_json::json;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};
use tracing_subscriber::EnvFilter;

/// HS256 secret shared by [`mint_token`] and [`test_state`].
pub const TEST_JWT_SECRET: &str = "petforce-test-secret";

/// Signs a one-hour token for `user_id` with [`TEST_JWT_SECRET`].
pub fn mint_token(user_id: &str) -> String {
    let claims = json!({ "sub": user_id, "exp": Utc::now().timestamp() + 3600 });
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .unwrap_or_default()
}

/// Application state over `db` with an HS256 verifier and in-memory storage.
pub fn test_state(db: DatabaseConnection) -> (AppState, Arc<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::default());
    let state = AppState {
        db,
        verifier: Arc::new(JwtVerifier::hs256(TEST_JWT_SECRET.as_bytes(), None)),
        storage: Arc::clone(&storage) as Arc<dyn AvatarStorage>,
    };
    (state, storage)
}

/// Installs a tracing subscriber that writes through the test harness.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    init_test_tracing();
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a household owned by `user_id` and returns it with the owner's membership.
pub async fn create_test_household(
    db: &DatabaseConnection,
    name: &str,
    user_id: &str,
) -> Result<(entities::household::Model, Membership)> {
    let (household, owner) =
        household::create_household(db, user_id, name, Some(format!("{user_id} display"))).await?;
    Ok((household, Membership::from_model(owner)?))
}

/// Sets up a database with one household owned by `"owner_user"`.
/// Returns (db, household, owner membership) for common test scenarios.
pub async fn setup_with_household() -> Result<(
    DatabaseConnection,
    entities::household::Model,
    Membership,
)> {
    let db = setup_test_db().await?;
    let (household, owner) = create_test_household(&db, "Test Household", "owner_user").await?;
    Ok((db, household, owner))
}

/// Inserts a member directly, bypassing invitation and access-request flows.
pub async fn add_member(
    db: &DatabaseConnection,
    household_id: i64,
    user_id: &str,
    role: Role,
) -> Result<Membership> {
    let model = member::ActiveModel {
        household_id: Set(household_id),
        user_id: Set(user_id.to_string()),
        role: Set(role.as_str().to_string()),
        display_name: Set(user_id.to_string()),
        joined_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Membership::from_model(model)
}

/// Creates a test pet with sensible defaults.
///
/// # Defaults
/// * `species`: "dog"
/// * every optional field: None
pub async fn create_test_pet(
    db: &DatabaseConnection,
    actor: &Membership,
    name: &str,
) -> Result<entities::pet::Model> {
    pet::create_pet(
        db,
        actor,
        NewPet {
            name: name.to_string(),
            species: "dog".to_string(),
            ..Default::default()
        },
    )
    .await
}

/// Object storage double that keeps uploads in memory.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    objects: Mutex<HashMap<String, (Vec<u8>, String)>>,
}

impl MemoryStorage {
    /// Paths of every stored object, sorted.
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .objects
            .lock()
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default();
        paths.sort();
        paths
    }
}

#[async_trait]
impl AvatarStorage for MemoryStorage {
    async fn put(&self, path: &str, bytes: Vec<u8>, mime_type: &str) -> Result<String> {
        self.objects
            .lock()
            .map_err(|e| Error::Storage {
                message: e.to_string(),
            })?
            .insert(path.to_string(), (bytes, mime_type.to_string()));
        Ok(self.public_url(path))
    }

    async fn remove(&self, path: &str) -> Result<()> {
        self.objects
            .lock()
            .map_err(|e| Error::Storage {
                message: e.to_string(),
            })?
            .remove(path);
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("https://storage.test/public/{path}")
    }

    fn path_from_url(&self, url: &str) -> Option<String> {
        url.strip_prefix("https://storage.test/public/")
            .map(ToString::to_string)
    }
}
