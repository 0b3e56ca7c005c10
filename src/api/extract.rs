//! Request extractors: caller identity, household context and JSON input.

use crate::{
    api::AppState,
    core::membership::{self, Membership},
    errors::{Error, Result},
};
use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Request},
    http::{header::AUTHORIZATION, request::Parts},
};
use serde::{Deserialize, de::DeserializeOwned};

/// Header naming the household a request is scoped to.
pub const HOUSEHOLD_HEADER: &str = "x-household-id";

/// The verified user id of the caller.
#[derive(Debug, Clone)]
pub struct AuthUser(pub String);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(Error::Unauthorized)?;

        state
            .verifier
            .verify(token)
            .map(Self)
            .ok_or(Error::Unauthorized)
    }
}

/// The caller's membership in the household named by [`HOUSEHOLD_HEADER`].
#[derive(Debug, Clone)]
pub struct HouseholdMember(pub Membership);

#[async_trait]
impl FromRequestParts<AppState> for HouseholdMember {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let AuthUser(user_id) = AuthUser::from_request_parts(parts, state).await?;
        let raw = parts
            .headers
            .get(HOUSEHOLD_HEADER)
            .ok_or_else(|| Error::bad_request("Missing X-Household-Id header"))?;
        let household_id: i64 = raw
            .to_str()
            .ok()
            .and_then(|value| value.trim().parse().ok())
            .ok_or_else(|| Error::bad_request("X-Household-Id must be an integer"))?;

        membership::resolve(&state.db, household_id, &user_id)
            .await
            .map(Self)
    }
}

/// JSON request body. An empty body is read as `{}`, so procedures whose input
/// fields are all optional can be called without one.
#[derive(Debug, Clone)]
pub struct Input<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for Input<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| Error::bad_request(e.body_text()))?;
        let body: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
            b"{}"
        } else {
            &bytes
        };
        serde_json::from_slice(body)
            .map(Input)
            .map_err(|e| Error::bad_request(format!("Invalid request body: {e}")))
    }
}

/// Input naming a single row.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ById {
    /// Row id
    pub id: i64,
}

/// Input for update procedures: the row id plus the changed fields.
#[derive(Debug, Clone, Deserialize)]
pub struct Patch<T> {
    /// Row id
    pub id: i64,
    /// Changed fields
    #[serde(flatten)]
    pub changes: T,
}

/// Optional per-pet filter for list procedures.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PetFilter {
    /// Only rows for this pet
    #[serde(default)]
    pub pet_id: Option<i64>,
}
