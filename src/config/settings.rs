//! Application settings loaded from `config.toml` and the environment.
//!
//! The TOML file is optional; every value can also be provided through an
//! environment variable (environment wins). Secrets are normally supplied through
//! the environment or a `.env` file loaded by `dotenvy` in `main`.

use crate::config::database::DEFAULT_DATABASE_URL;
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP server settings
    pub server: ServerConfig,
    /// Database settings
    pub database: DatabaseConfig,
    /// Identity provider settings
    pub auth: AuthConfig,
    /// Object storage settings
    pub storage: StorageConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to bind, e.g. `0.0.0.0:8080`
    pub bind: String,
    /// Allowed CORS origins; empty allows any origin
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
            cors_origins: Vec::new(),
        }
    }
}

/// Database settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SeaORM` connection URL (`sqlite://...` or `postgres://...`)
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
        }
    }
}

/// JWT verification settings. Exactly one of `jwt_secret` and
/// `jwt_public_key_pem` must be set.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Shared secret for HS256 tokens
    pub jwt_secret: Option<String>,
    /// PEM encoded RSA public key for RS256 tokens
    pub jwt_public_key_pem: Option<String>,
    /// Expected `iss` claim, if any
    pub issuer: Option<String>,
}

/// Object storage settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Base URL of the Supabase project
    pub url: Option<String>,
    /// Service role key used for uploads and deletions
    pub service_key: Option<String>,
    /// Bucket holding pet avatars
    pub avatar_bucket: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            url: None,
            service_key: None,
            avatar_bucket: "pet-avatars".to_string(),
        }
    }
}

impl AppConfig {
    /// Applies environment overrides using `lookup` to read variables.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(bind) = lookup("PETFORCE_BIND") {
            self.server.bind = bind;
        }
        if let Some(origins) = lookup("PETFORCE_CORS_ORIGINS") {
            self.server.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(ToString::to_string)
                .collect();
        }
        if let Some(secret) = lookup("PETFORCE_JWT_SECRET") {
            self.auth.jwt_secret = Some(secret);
        }
        if let Some(pem) = lookup("PETFORCE_JWT_PUBLIC_KEY") {
            self.auth.jwt_public_key_pem = Some(pem);
        }
        if let Some(issuer) = lookup("PETFORCE_JWT_ISSUER") {
            self.auth.issuer = Some(issuer);
        }
        if let Some(url) = lookup("SUPABASE_URL") {
            self.storage.url = Some(url);
        }
        if let Some(key) = lookup("SUPABASE_SERVICE_KEY") {
            self.storage.service_key = Some(key);
        }
        if let Some(bucket) = lookup("PETFORCE_AVATAR_BUCKET") {
            self.storage.avatar_bucket = bucket;
        }
    }

    /// Checks that the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        match (&self.auth.jwt_secret, &self.auth.jwt_public_key_pem) {
            (None, None) => Err(Error::Config {
                message: "either auth.jwt_secret or auth.jwt_public_key_pem must be set"
                    .to_string(),
            }),
            (Some(_), Some(_)) => Err(Error::Config {
                message: "auth.jwt_secret and auth.jwt_public_key_pem are mutually exclusive"
                    .to_string(),
            }),
            _ => Ok(()),
        }
    }
}

/// Loads configuration from a TOML file.
///
/// # Errors
/// Returns an error if the file cannot be read or the TOML is invalid.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse {}: {e}", path_ref.display()),
    })
}

/// Loads the full application configuration.
///
/// Reads the file named by `PETFORCE_CONFIG` (default `config.toml`) when it exists,
/// applies environment overrides and validates the result.
pub fn load_app_configuration() -> Result<AppConfig> {
    let path = std::env::var("PETFORCE_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    let mut config = if Path::new(&path).exists() {
        load_config(&path)?
    } else {
        info!("No config file at {path}, using defaults and environment");
        AppConfig::default()
    };
    config.apply_overrides(|key| std::env::var(key).ok());
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
            [server]
            bind = "127.0.0.1:9000"
            cors_origins = ["http://localhost:3000"]

            [database]
            url = "postgres://localhost/petforce"

            [auth]
            jwt_secret = "dev-secret"
            issuer = "https://clerk.example.com"

            [storage]
            url = "https://project.supabase.co"
            avatar_bucket = "avatars"
        "#;

        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:9000");
        assert_eq!(config.server.cors_origins, vec!["http://localhost:3000"]);
        assert_eq!(config.database.url, "postgres://localhost/petforce");
        assert_eq!(config.auth.jwt_secret.as_deref(), Some("dev-secret"));
        assert_eq!(config.storage.avatar_bucket, "avatars");
        assert!(config.storage.service_key.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults_when_sections_missing() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:8080");
        assert_eq!(config.database.url, DEFAULT_DATABASE_URL);
        assert_eq!(config.storage.avatar_bucket, "pet-avatars");
    }

    #[test]
    fn test_environment_overrides_file_values() {
        let mut config = AppConfig::default();
        let env: HashMap<&str, &str> = [
            ("DATABASE_URL", "sqlite::memory:"),
            ("PETFORCE_JWT_SECRET", "from-env"),
            ("PETFORCE_CORS_ORIGINS", "http://a.test, http://b.test,"),
            ("PETFORCE_AVATAR_BUCKET", "custom"),
        ]
        .into_iter()
        .collect();

        config.apply_overrides(|key| env.get(key).map(ToString::to_string));

        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.auth.jwt_secret.as_deref(), Some("from-env"));
        assert_eq!(
            config.server.cors_origins,
            vec!["http://a.test", "http://b.test"]
        );
        assert_eq!(config.storage.avatar_bucket, "custom");
    }

    #[test]
    fn test_validate_requires_exactly_one_key() {
        let mut config = AppConfig::default();
        assert!(matches!(config.validate(), Err(Error::Config { .. })));

        config.auth.jwt_secret = Some("s".to_string());
        config.auth.jwt_public_key_pem = Some("pem".to_string());
        assert!(matches!(config.validate(), Err(Error::Config { .. })));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[auth]\njwt_secret = \"file-secret\"").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.auth.jwt_secret.as_deref(), Some("file-secret"));
    }

    #[test]
    fn test_load_config_reports_bad_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[auth\njwt_secret = 1").unwrap();

        assert!(matches!(load_config(file.path()), Err(Error::Config { .. })));
    }
}
