//! HTTP API: one `POST /rpc/<router>.<procedure>` endpoint per procedure.
//!
//! Every handler is a thin adapter. Extractors verify the bearer token and resolve the
//! caller's membership from the `X-Household-Id` header, the body is decoded into the
//! core input type, and the core function's result is returned as JSON. Errors render
//! as `{"error":{"code","message"}}` (see [`error`]).

/// Access request procedures
pub mod access_request;
/// Activity procedures
pub mod activity;
/// HTTP rendering of the service error type
pub mod error;
/// Expense procedures
pub mod expense;
/// Identity, household context and JSON body extractors
pub mod extract;
/// Feeding schedule and completion procedures
pub mod feeding;
/// Health record and medication procedures
pub mod health;
/// Household and member procedures
pub mod household;
/// Invitation procedures
pub mod invitation;
/// Pet and avatar procedures
pub mod pet;
/// Dashboard, finance and calendar procedures
pub mod reports;

use crate::{
    config::settings::ServerConfig, errors::Result, identity::IdentityVerifier,
    storage::AvatarStorage,
};
use axum::{
    Json, Router,
    http::{
        HeaderName, HeaderValue, Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::get,
};
use sea_orm::DatabaseConnection;
use serde_json::{Value, json};
use std::{sync::Arc, time::Duration};
use tokio::{net::TcpListener, signal::ctrl_c};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Connection pool
    pub db: DatabaseConnection,
    /// Bearer token verifier
    pub verifier: Arc<dyn IdentityVerifier>,
    /// Pet avatar storage
    pub storage: Arc<dyn AvatarStorage>,
}

/// Body returned by procedures that have nothing else to say.
pub(crate) fn ok() -> Json<Value> {
    Json(json!({ "success": true }))
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match origin.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!("Ignoring invalid CORS origin {origin:?}");
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            CONTENT_TYPE,
            AUTHORIZATION,
            HeaderName::from_static(extract::HOUSEHOLD_HEADER),
        ])
        .max_age(Duration::from_secs(60 * 60))
}

/// Builds the full router.
pub fn router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .merge(household::routes())
        .merge(pet::routes())
        .merge(activity::routes())
        .merge(invitation::routes())
        .merge(access_request::routes())
        .merge(feeding::routes())
        .merge(health::routes())
        .merge(expense::routes())
        .merge(reports::routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origins))
        .with_state(state)
}

/// Binds `config.bind` and serves until Ctrl+C or SIGTERM.
pub async fn serve(state: AppState, config: &ServerConfig) -> Result<()> {
    let app = router(state, &config.cors_origins);
    let listener = TcpListener::bind(&config.bind).await?;
    info!("Listening on {}", config.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}


#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::test_support::{call, raw};
    use crate::test_utils::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use serde_json::json;

    #[tokio::test]
    async fn test_health_endpoint() {
        let (state, _storage) = test_state(setup_test_db().await.unwrap());
        let request = Request::get("/api/health").body(Body::empty()).unwrap();
        let (status, body) = raw(&state, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn test_missing_or_bad_token_is_unauthorized() {
        let (state, _storage) = test_state(setup_test_db().await.unwrap());

        let (status, body) = call(&state, "household.list", None, json!({})).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");

        let request = Request::post("/rpc/household.list")
            .header(header::AUTHORIZATION, "Bearer forged.token.value")
            .body(Body::empty())
            .unwrap();
        let (status, _) = raw(&state, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_missing_household_header_is_bad_request() {
        let (state, _storage) = test_state(setup_test_db().await.unwrap());
        let (status, body) = call(&state, "pet.list", Some("user_1"), json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let (state, _storage) = test_state(setup_test_db().await.unwrap());
        let request = Request::post("/rpc/household.create")
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", mint_token("user_1")),
            )
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = raw(&state, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_unknown_procedure_is_not_found() {
        let (state, _storage) = test_state(setup_test_db().await.unwrap());
        let (status, _) = call(&state, "household.explode", Some("user_1"), json!({})).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
