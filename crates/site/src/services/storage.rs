//! Object storage for uploaded images.
//!
//! Objects live in the BaaS storage service under
//! `{bucket}/{folder}/{millis}-{sanitized-name}` and are served from its
//! public URL space. Uploads run with the admin's access token so the
//! bucket's policies decide who may write.

use chrono::Utc;
use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use crate::config::SupabaseConfig;

/// Largest accepted upload.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Marker separating the host part of a public object URL from `{bucket}/{path}`.
const PUBLIC_MARKER: &str = "/storage/v1/object/public/";

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The file is not an image.
    #[error("Please select a valid image file (PNG, JPG, WebP)")]
    NotAnImage,

    /// The file is larger than [`MAX_UPLOAD_BYTES`].
    #[error("File size exceeds 5MB limit")]
    TooLarge,

    /// The file name is empty after sanitizing.
    #[error("file name is empty")]
    EmptyName,

    /// The URL is not a public object URL of this project.
    #[error("not a storage URL: {0}")]
    NotAStorageUrl(String),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Storage service returned an error response.
    #[error("storage error: {status} - {message}")]
    Api { status: u16, message: String },
}

/// A file to upload.
#[derive(Debug)]
pub struct Upload<'a> {
    pub folder: &'a str,
    pub filename: &'a str,
    pub content_type: &'a str,
    pub bytes: Vec<u8>,
}

/// Client for the storage REST API.
#[derive(Clone)]
pub struct StorageClient {
    client: reqwest::Client,
    base_url: String,
    anon_key: SecretString,
}

impl StorageClient {
    /// Create a new storage client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &SupabaseConfig) -> Result<Self, StorageError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_owned(),
            anon_key: config.anon_key.clone(),
        })
    }

    /// Public URL of an object.
    #[must_use]
    pub fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}{PUBLIC_MARKER}{bucket}/{path}", self.base_url)
    }

    /// Upload an image and return its public URL.
    ///
    /// Validation happens before any network call.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotAnImage`, `TooLarge` or `EmptyName` for invalid
    /// input, and `Http`/`Api` if the storage service rejects the upload.
    #[tracing::instrument(skip(self, upload, access_token), fields(folder = %upload.folder, size = upload.bytes.len()))]
    pub async fn upload(
        &self,
        bucket: &str,
        upload: Upload<'_>,
        access_token: &str,
    ) -> Result<String, StorageError> {
        validate_upload(upload.content_type, upload.bytes.len())?;
        let path = object_path(upload.folder, upload.filename, Utc::now().timestamp_millis())?;

        let response = self
            .client
            .post(format!("{}/storage/v1/object/{bucket}/{path}", self.base_url))
            .header("apikey", self.anon_key.expose_secret())
            .bearer_auth(access_token)
            .header(CONTENT_TYPE, upload.content_type)
            .header(CACHE_CONTROL, "max-age=3600")
            .header("x-upsert", "false")
            .body(upload.bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StorageError::Api {
                status: status.as_u16(),
                message,
            });
        }

        tracing::info!(path = %path, "Uploaded image");
        Ok(self.public_url(bucket, &path))
    }

    /// Delete an object.
    ///
    /// # Errors
    ///
    /// Returns `Http`/`Api` if the storage service rejects the delete.
    pub async fn delete(
        &self,
        bucket: &str,
        path: &str,
        access_token: &str,
    ) -> Result<(), StorageError> {
        let response = self
            .client
            .delete(format!("{}/storage/v1/object/{bucket}", self.base_url))
            .header("apikey", self.anon_key.expose_secret())
            .bearer_auth(access_token)
            .json(&serde_json::json!({ "prefixes": [path] }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StorageError::Api {
                status: status.as_u16(),
                message,
            });
        }

        tracing::info!(bucket = %bucket, path = %path, "Deleted image");
        Ok(())
    }

    /// Delete the object behind one of our public URLs.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotAStorageUrl` if the URL has no bucket and path.
    pub async fn delete_public_url(&self, url: &str, access_token: &str) -> Result<(), StorageError> {
        let (bucket, path) = path_from_public_url(url)
            .split_once('/')
            .filter(|(bucket, path)| !bucket.is_empty() && !path.is_empty() && url.contains(PUBLIC_MARKER))
            .ok_or_else(|| StorageError::NotAStorageUrl(url.to_owned()))?;

        self.delete(bucket, path, access_token).await
    }
}

/// The `{bucket}/{path}` part of a public object URL, or the input unchanged
/// when it is not one.
#[must_use]
pub fn path_from_public_url(url: &str) -> &str {
    url.split_once(PUBLIC_MARKER).map_or(url, |(_, path)| path)
}

/// Check an upload's type and size.
///
/// # Errors
///
/// Returns `StorageError::NotAnImage` or `StorageError::TooLarge`.
pub fn validate_upload(content_type: &str, len: usize) -> Result<(), StorageError> {
    if !content_type.starts_with("image/") {
        return Err(StorageError::NotAnImage);
    }
    if len > MAX_UPLOAD_BYTES {
        return Err(StorageError::TooLarge);
    }
    Ok(())
}

/// `{folder}/{millis}-{name}` with directory parts dropped and whitespace runs turned into `-`.
fn object_path(folder: &str, filename: &str, millis: i64) -> Result<String, StorageError> {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or_default();
    let name = base.split_whitespace().collect::<Vec<_>>().join("-");
    if name.is_empty() {
        return Err(StorageError::EmptyName);
    }

    let folder = folder.trim_matches('/');
    if folder.is_empty() {
        Ok(format!("{millis}-{name}"))
    } else {
        Ok(format!("{folder}/{millis}-{name}"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_upload() {
        assert!(validate_upload("image/png", 1024).is_ok());
        assert!(validate_upload("image/webp", MAX_UPLOAD_BYTES).is_ok());
        assert!(matches!(
            validate_upload("application/pdf", 10),
            Err(StorageError::NotAnImage)
        ));
        assert!(matches!(
            validate_upload("image/jpeg", MAX_UPLOAD_BYTES + 1),
            Err(StorageError::TooLarge)
        ));
    }

    #[test]
    fn test_object_path_sanitizes() {
        assert_eq!(
            object_path("projects", "My Hero  Shot.png", 1_700_000_000_000).unwrap(),
            "projects/1700000000000-My-Hero-Shot.png"
        );
        assert_eq!(
            object_path("/blog/", "../../etc/passwd", 1).unwrap(),
            "blog/1-passwd"
        );
        assert!(matches!(
            object_path("blog", "   ", 1),
            Err(StorageError::EmptyName)
        ));
    }

    #[test]
    fn test_path_from_public_url() {
        assert_eq!(
            path_from_public_url(
                "https://abc.supabase.co/storage/v1/object/public/site-content/blog/1-a.png"
            ),
            "site-content/blog/1-a.png"
        );
        assert_eq!(path_from_public_url("blog/1-a.png"), "blog/1-a.png");
    }

    #[tokio::test]
    async fn test_upload_rejects_before_network() {
        let client = StorageClient {
            client: reqwest::Client::new(),
            base_url: "http://127.0.0.1:9".to_string(),
            anon_key: SecretString::from("anon"),
        };
        let result = client
            .upload(
                "site-content",
                Upload {
                    folder: "projects",
                    filename: "notes.txt",
                    content_type: "text/plain",
                    bytes: vec![0; 10],
                },
                "token",
            )
            .await;
        assert!(matches!(result, Err(StorageError::NotAnImage)));
    }
}
