//! Identity verification for bearer tokens.
//!
//! Authentication itself is handled by an external identity provider that issues JWTs.
//! The service only checks the signature, expiry and (optionally) issuer, and takes the
//! `sub` claim as the caller's user id.

use crate::config::settings::AuthConfig;
use crate::errors::{Error, Result};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::Deserialize;
use tracing::debug;

/// Maps a bearer token to a user id.
pub trait IdentityVerifier: Send + Sync {
    /// Returns the user id the token was issued to, or `None` if it does not verify.
    fn verify(&self, token: &str) -> Option<String>;
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
}

/// Verifies JWTs signed with HS256 or RS256.
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    fn with_key(key: DecodingKey, algorithm: Algorithm, issuer: Option<&str>) -> Self {
        let mut validation = Validation::new(algorithm);
        validation.validate_aud = false;
        if let Some(issuer) = issuer {
            validation.set_issuer(&[issuer]);
        }
        Self { key, validation }
    }

    /// Verifier for tokens signed with a shared HS256 secret.
    #[must_use]
    pub fn hs256(secret: &[u8], issuer: Option<&str>) -> Self {
        Self::with_key(DecodingKey::from_secret(secret), Algorithm::HS256, issuer)
    }

    /// Verifier for tokens signed with RS256, given the PEM encoded public key.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if the PEM cannot be parsed.
    pub fn rs256_pem(pem: &[u8], issuer: Option<&str>) -> Result<Self> {
        let key = DecodingKey::from_rsa_pem(pem).map_err(|e| Error::Config {
            message: format!("Invalid JWT public key: {e}"),
        })?;
        Ok(Self::with_key(key, Algorithm::RS256, issuer))
    }

    /// Builds the verifier described by the `[auth]` configuration section.
    pub fn from_config(config: &AuthConfig) -> Result<Self> {
        let issuer = config.issuer.as_deref();
        match (&config.jwt_secret, &config.jwt_public_key_pem) {
            (Some(secret), None) => Ok(Self::hs256(secret.as_bytes(), issuer)),
            (None, Some(pem)) => Self::rs256_pem(pem.as_bytes(), issuer),
            _ => Err(Error::Config {
                message: "exactly one of auth.jwt_secret and auth.jwt_public_key_pem must be set"
                    .to_string(),
            }),
        }
    }
}

impl IdentityVerifier for JwtVerifier {
    fn verify(&self, token: &str) -> Option<String> {
        match decode::<Claims>(token, &self.key, &self.validation) {
            Ok(data) if !data.claims.sub.is_empty() => Some(data.claims.sub),
            Ok(_) => None,
            Err(e) => {
                debug!("Rejected bearer token: {e}");
                None
            }
        }
    }
}
