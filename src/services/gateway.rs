//! ObjectGateway — upload, lookup and delete against one bucket.
//!
//! The gateway holds no mutable state. Every call validates its input, talks
//! to the [`ObjectStore`] and translates store failures into [`GatewayError`].
//! Nothing is retried here; callers decide whether to try again.

use std::{io, sync::Arc};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    config::AppConfig,
    models::object::{ObjectRecord, UploadRequest},
    services::{
        key_generator::{self, InvalidFilename},
        staging::StagedFile,
    },
    store::{ObjectStore, PutBody, PutMetadata, StagingMode, StoreError},
};

const MAX_OBJECT_KEY_LEN: usize = 1024;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    InvalidFilename(#[from] InvalidFilename),
    #[error("invalid key `{key}`: {reason}")]
    InvalidKey { key: String, reason: &'static str },
    #[error("object `{0}` not found")]
    NotFound(String),
    #[error("payload of {size} bytes exceeds the {limit}-byte limit")]
    PayloadTooLarge { size: usize, limit: usize },
    #[error("failed to write object `{key}`: {reason}")]
    StoreWrite { key: String, reason: String },
    #[error("failed to read object `{key}`: {reason}")]
    StoreRead { key: String, reason: String },
    #[error("failed to stage upload: {0}")]
    StagingIo(#[source] io::Error),
}

pub type GatewayResult<T> = Result<T, GatewayError>;

#[derive(Clone)]
pub struct ObjectGateway {
    store: Arc<dyn ObjectStore>,
    config: Arc<AppConfig>,
}

impl ObjectGateway {
    pub fn new(store: Arc<dyn ObjectStore>, config: Arc<AppConfig>) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> &dyn ObjectStore {
        self.store.as_ref()
    }

    /// Store `request.content` under a freshly generated key with public-read
    /// visibility.
    ///
    /// Staging files (for path-based stores) are removed on every exit path.
    /// A cleanup failure after a successful put is logged, not returned.
    pub async fn upload(&self, request: UploadRequest) -> GatewayResult<ObjectRecord> {
        let prefix = normalize_prefix(&request.prefix)?;
        let limit = self.config.max_upload_bytes;
        if request.content.len() > limit {
            return Err(GatewayError::PayloadTooLarge {
                size: request.content.len(),
                limit,
            });
        }

        let key = key_generator::generate(&request.original_filename, &prefix)?;
        // Prefix + token + extension can still run past the key limit.
        ensure_key_safe(&key)?;
        let metadata = PutMetadata::for_content(&request.content, request.content_type);

        let outcome = match self.store.staging_mode() {
            StagingMode::InMemory => {
                self.store
                    .put(&key, PutBody::Bytes(request.content), &metadata)
                    .await
            }
            StagingMode::FilePath => {
                let staged = StagedFile::write(&self.config.staging_dir, &request.content)
                    .await
                    .map_err(GatewayError::StagingIo)?;
                let outcome = self
                    .store
                    .put(&key, PutBody::File(staged.path().to_path_buf()), &metadata)
                    .await;
                if let Err(err) = staged.release().await {
                    warn!(key, "failed to clean up staging file: {}", err);
                }
                outcome
            }
        };

        outcome.map_err(|err| {
            warn!(key, store = self.store.name(), "upload failed: {}", err);
            GatewayError::StoreWrite {
                key: key.clone(),
                reason: err.to_string(),
            }
        })?;

        debug!(
            key,
            bucket = %self.config.bucket,
            size = metadata.content_length,
            content_type = %metadata.content_type,
            "uploaded object"
        );
        Ok(ObjectRecord {
            public_url: self.public_url(&key),
            key,
            prefix,
        })
    }

    /// Public URL of an existing object. Does not fetch content.
    pub async fn get_url(&self, key: &str) -> GatewayResult<String> {
        if self.exists(key).await? {
            Ok(self.public_url(key))
        } else {
            Err(GatewayError::NotFound(key.to_string()))
        }
    }

    /// Delete an existing object. Missing keys fail with `NotFound`.
    pub async fn delete(&self, key: &str) -> GatewayResult<()> {
        if !self.exists(key).await? {
            return Err(GatewayError::NotFound(key.to_string()));
        }

        match self.store.delete(key).await {
            Ok(()) => {
                debug!(key, bucket = %self.config.bucket, "deleted object");
                Ok(())
            }
            // Lost a race with another deleter.
            Err(StoreError::NotFound(_)) => Err(GatewayError::NotFound(key.to_string())),
            Err(err) => {
                warn!(key, store = self.store.name(), "delete failed: {}", err);
                Err(GatewayError::StoreWrite {
                    key: key.to_string(),
                    reason: err.to_string(),
                })
            }
        }
    }

    pub async fn exists(&self, key: &str) -> GatewayResult<bool> {
        ensure_key_safe(key)?;
        self.store.exists(key).await.map_err(|err| {
            warn!(key, store = self.store.name(), "existence check failed: {}", err);
            GatewayError::StoreRead {
                key: key.to_string(),
                reason: err.to_string(),
            }
        })
    }

    pub fn public_url(&self, key: &str) -> String {
        self.config.public_url(key)
    }
}

/// Reject keys that are empty, oversized, absolute or could escape a
/// directory-backed store.
fn ensure_key_safe(key: &str) -> GatewayResult<()> {
    let invalid = |reason| {
        Err(GatewayError::InvalidKey {
            key: key.to_string(),
            reason,
        })
    };

    if key.is_empty() {
        return invalid("must not be empty");
    }
    if key.len() > MAX_OBJECT_KEY_LEN {
        return invalid("longer than 1024 bytes");
    }
    if key.starts_with('/') || key.split('/').any(|segment| segment == "..") {
        return invalid("must be relative and must not contain `..`");
    }
    if key.bytes().any(|b| b.is_ascii_control() || b == b'\\') {
        return invalid("contains control characters or backslashes");
    }
    Ok(())
}

/// Trim surrounding whitespace and slashes; an empty result means no prefix.
fn normalize_prefix(prefix: &str) -> GatewayResult<String> {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        return Ok(String::new());
    }
    ensure_key_safe(trimmed)?;
    if trimmed.split('/').any(str::is_empty) {
        return Err(GatewayError::InvalidKey {
            key: prefix.to_string(),
            reason: "prefix contains an empty path segment",
        });
    }
    Ok(trimmed.to_string())
}
