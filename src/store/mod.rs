//! Object store collaborators.
//!
//! The gateway only ever talks to an [`ObjectStore`]; each backend owns its
//! client, its bucket and the translation of provider errors into
//! [`StoreError`]. Raw SDK errors never cross this boundary.

pub mod fs;
pub mod memory;
pub mod s3;

use async_trait::async_trait;
use bytes::Bytes;
use std::{io, path::PathBuf, sync::Arc};
use thiserror::Error;

use crate::config::{AppConfig, StoreBackend};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object `{0}` not found")]
    NotFound(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("store backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Access policy applied to a freshly written object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    PublicRead,
    Private,
}

/// How a backend wants to receive upload content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagingMode {
    /// Bytes are handed over directly.
    InMemory,
    /// The client reads from a local path; the gateway writes a scoped
    /// staging file first.
    FilePath,
}

/// Upload content as handed to [`ObjectStore::put`].
#[derive(Debug)]
pub enum PutBody {
    Bytes(Bytes),
    File(PathBuf),
}

/// Metadata sent alongside every put.
#[derive(Debug, Clone)]
pub struct PutMetadata {
    pub content_type: String,
    pub content_length: u64,
    pub md5: md5::Digest,
    pub visibility: Visibility,
}

impl PutMetadata {
    pub fn for_content(content: &[u8], content_type: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            content_length: content.len() as u64,
            md5: md5::compute(content),
            visibility: Visibility::PublicRead,
        }
    }

    /// Lowercase hex digest, the usual etag form.
    pub fn etag(&self) -> String {
        format!("{:x}", self.md5)
    }
}

/// Operations the gateway consumes from an object store. All calls are
/// scoped to the bucket the store was built for.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Short backend name for logs and health output.
    fn name(&self) -> &'static str;

    fn staging_mode(&self) -> StagingMode {
        StagingMode::InMemory
    }

    async fn put(&self, key: &str, body: PutBody, metadata: &PutMetadata) -> StoreResult<()>;

    async fn exists(&self, key: &str) -> StoreResult<bool>;

    async fn delete(&self, key: &str) -> StoreResult<()>;
}

/// Build the store selected by `cfg.backend`.
pub async fn from_config(cfg: &AppConfig) -> StoreResult<Arc<dyn ObjectStore>> {
    let store: Arc<dyn ObjectStore> = match cfg.backend {
        StoreBackend::S3 => Arc::new(s3::S3Store::new(cfg).await),
        StoreBackend::Fs => Arc::new(fs::FsStore::open(&cfg.storage_dir).await?),
        StoreBackend::Memory => Arc::new(memory::MemoryStore::default()),
    };
    Ok(store)
}
