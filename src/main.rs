use dotenvy::dotenv;
use petforce::{
    api::{self, AppState},
    config::{self, database},
    errors::Result,
    identity::JwtVerifier,
    storage::{AvatarStorage, DisabledStorage, SupabaseStorage},
};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; variables may also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load the application configuration
    let app_config = config::load_app_configuration()
        .inspect_err(|e| error!("Critical error loading application configuration: {e}"))?;
    info!("Successfully processed application configuration.");

    // 4. Connect and create the schema
    let db = database::init_database(&app_config.database.url)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {e}"))?;

    // 5. External collaborators
    let verifier = JwtVerifier::from_config(&app_config.auth)
        .inspect_err(|e| error!("Failed to build token verifier: {e}"))?;
    let storage: Arc<dyn AvatarStorage> = match SupabaseStorage::from_config(&app_config.storage) {
        Some(storage) => Arc::new(storage),
        None => {
            warn!("Object storage is not configured; avatar uploads are disabled");
            Arc::new(DisabledStorage)
        }
    };

    // 6. Serve
    let state = AppState {
        db,
        verifier: Arc::new(verifier),
        storage,
    };
    api::serve(state, &app_config.server).await
}
