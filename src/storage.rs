//! Avatar object storage.
//!
//! Pet avatars live in an external object store. [`AvatarStorage`] is the seam the
//! core logic talks to; [`SupabaseStorage`] implements it against the Supabase
//! Storage REST API. Uploads are limited to JPEG, PNG and WebP images of at most
//! [`MAX_AVATAR_BYTES`].

use crate::config::settings::StorageConfig;
use crate::errors::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

/// Largest accepted avatar upload.
pub const MAX_AVATAR_BYTES: usize = 5 * 1024 * 1024;

/// Accepted mime types and the file extension stored for each.
const ALLOWED_MIME_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/webp", "webp"),
];

/// Object store used for avatar images.
#[async_trait]
pub trait AvatarStorage: Send + Sync {
    /// Stores `bytes` at `path` and returns the public URL.
    async fn put(&self, path: &str, bytes: Vec<u8>, mime_type: &str) -> Result<String>;

    /// Deletes the object at `path`. Missing objects are not an error.
    async fn remove(&self, path: &str) -> Result<()>;

    /// Public URL for an object path.
    fn public_url(&self, path: &str) -> String;

    /// Reverses [`AvatarStorage::public_url`]; `None` for URLs this store did not issue.
    fn path_from_url(&self, url: &str) -> Option<String>;
}

/// Checks size and mime type, returning the file extension to use.
pub fn validate_avatar(len: usize, mime_type: &str) -> Result<&'static str> {
    if len == 0 {
        return Err(Error::bad_request("Avatar image is empty"));
    }
    if len > MAX_AVATAR_BYTES {
        return Err(Error::bad_request(format!(
            "Avatar image is {len} bytes, the limit is {MAX_AVATAR_BYTES}"
        )));
    }
    ALLOWED_MIME_TYPES
        .iter()
        .find(|(allowed, _)| *allowed == mime_type)
        .map(|(_, ext)| *ext)
        .ok_or_else(|| Error::bad_request(format!("Unsupported image type: {mime_type}")))
}

/// Object path for a new avatar: `{household}/{pet}/{uuid}.{ext}`.
#[must_use]
pub fn avatar_path(household_id: i64, pet_id: i64, ext: &str) -> String {
    format!("{household_id}/{pet_id}/{}.{ext}", uuid::Uuid::new_v4())
}

/// Validates and uploads a pet avatar, returning its public URL.
pub async fn upload_avatar(
    storage: &dyn AvatarStorage,
    household_id: i64,
    pet_id: i64,
    bytes: Vec<u8>,
    mime_type: &str,
) -> Result<String> {
    let ext = validate_avatar(bytes.len(), mime_type)?;
    let path = avatar_path(household_id, pet_id, ext);
    debug!(%path, size = bytes.len(), "Uploading avatar");
    storage.put(&path, bytes, mime_type).await
}

/// Supabase Storage client.
#[derive(Debug, Clone)]
pub struct SupabaseStorage {
    http_client: Client,
    base_url: String,
    service_key: String,
    bucket: String,
}

impl SupabaseStorage {
    /// Creates a client for `bucket` in the project at `base_url`.
    pub fn new(base_url: &str, service_key: &str, bucket: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key: service_key.to_string(),
            bucket: bucket.to_string(),
        }
    }

    /// Builds a client from configuration, or `None` when storage is not configured.
    pub fn from_config(config: &StorageConfig) -> Option<Self> {
        match (&config.url, &config.service_key) {
            (Some(url), Some(key)) => Some(Self::new(url, key, &config.avatar_bucket)),
            _ => None,
        }
    }

    fn object_url(&self, path: &str) -> String {
        format!("{}/storage/v1/object/{}/{path}", self.base_url, self.bucket)
    }

    fn public_prefix(&self) -> String {
        format!("{}/storage/v1/object/public/{}/", self.base_url, self.bucket)
    }
}

#[async_trait]
impl AvatarStorage for SupabaseStorage {
    async fn put(&self, path: &str, bytes: Vec<u8>, mime_type: &str) -> Result<String> {
        let response = self
            .http_client
            .post(self.object_url(path))
            .header("apikey", &self.service_key)
            .header("Authorization", format!("Bearer {}", self.service_key))
            .header("Content-Type", mime_type)
            .header("x-upsert", "true")
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response.text().await?;
            warn!(%status, %path, "Avatar upload rejected");
            return Err(Error::Storage { message });
        }

        Ok(self.public_url(path))
    }

    async fn remove(&self, path: &str) -> Result<()> {
        let url = format!("{}/storage/v1/object/{}", self.base_url, self.bucket);
        let payload = serde_json::json!({ "prefixes": [path] });

        let response = self
            .http_client
            .delete(url)
            .header("apikey", &self.service_key)
            .header("Authorization", format!("Bearer {}", self.service_key))
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let message = response.text().await?;
            return Err(Error::Storage { message });
        }
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}{path}", self.public_prefix())
    }

    fn path_from_url(&self, url: &str) -> Option<String> {
        url.strip_prefix(&self.public_prefix())
            .map(ToString::to_string)
    }
}

/// Stand-in used when no storage is configured; every upload fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledStorage;

#[async_trait]
impl AvatarStorage for DisabledStorage {
    async fn put(&self, _path: &str, _bytes: Vec<u8>, _mime_type: &str) -> Result<String> {
        Err(Error::Config {
            message: "avatar storage is not configured".to_string(),
        })
    }

    async fn remove(&self, _path: &str) -> Result<()> {
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        path.to_string()
    }

    fn path_from_url(&self, _url: &str) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_avatar_accepts_supported_types() {
        assert_eq!(validate_avatar(10, "image/jpeg").ok(), Some("jpg"));
        assert_eq!(validate_avatar(10, "image/png").ok(), Some("png"));
        assert_eq!(validate_avatar(MAX_AVATAR_BYTES, "image/webp").ok(), Some("webp"));
    }

    #[test]
    fn test_validate_avatar_rejects_bad_input() {
        assert!(matches!(
            validate_avatar(10, "image/gif"),
            Err(Error::BadRequest { .. })
        ));
        assert!(matches!(
            validate_avatar(MAX_AVATAR_BYTES + 1, "image/png"),
            Err(Error::BadRequest { .. })
        ));
        assert!(matches!(
            validate_avatar(0, "image/png"),
            Err(Error::BadRequest { .. })
        ));
    }

    #[test]
    fn test_avatar_path_layout() {
        let path = avatar_path(3, 9, "png");
        assert!(path.starts_with("3/9/"));
        assert!(path.ends_with(".png"));
    }

    #[test]
    fn test_supabase_urls_round_trip() {
        let storage = SupabaseStorage::new("https://proj.supabase.co/", "key", "pet-avatars");
        let url = storage.public_url("1/2/abc.png");
        assert_eq!(
            url,
            "https://proj.supabase.co/storage/v1/object/public/pet-avatars/1/2/abc.png"
        );
        assert_eq!(storage.path_from_url(&url).as_deref(), Some("1/2/abc.png"));
        assert_eq!(storage.path_from_url("https://elsewhere.test/x.png"), None);
        assert_eq!(
            storage.object_url("1/2/abc.png"),
            "https://proj.supabase.co/storage/v1/object/pet-avatars/1/2/abc.png"
        );
    }

    #[test]
    fn test_from_config_requires_url_and_key() {
        let mut config = StorageConfig::default();
        assert!(SupabaseStorage::from_config(&config).is_none());
        config.url = Some("https://proj.supabase.co".to_string());
        config.service_key = Some("key".to_string());
        assert!(SupabaseStorage::from_config(&config).is_some());
    }

    #[tokio::test]
    async fn test_disabled_storage_rejects_uploads() {
        let result = upload_avatar(&DisabledStorage, 1, 1, vec![1, 2, 3], "image/png").await;
        assert!(matches!(result, Err(Error::Config { .. })));
    }
}
