//! Local-disk store.
//!
//! Objects live under `base_path/{shard}/{shard}/{key}` where the shards are
//! the first two bytes of MD5(key), which keeps directory fan-out bounded.
//! Writes go to a temp file beside the target and are renamed into place.
//! The client reads content from a path, so uploads are staged by the gateway.

use async_trait::async_trait;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use tokio::{fs, io::AsyncWriteExt};
use tracing::debug;
use uuid::Uuid;

use super::{ObjectStore, PutBody, PutMetadata, StagingMode, StoreError, StoreResult};

#[derive(Debug, Clone)]
pub struct FsStore {
    base_path: PathBuf,
}

impl FsStore {
    /// Open (and create if needed) a store rooted at `base_path`.
    pub async fn open(base_path: impl Into<PathBuf>) -> StoreResult<Self> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path).await?;
        Ok(Self { base_path })
    }

    fn object_shards(key: &str) -> (String, String) {
        let digest = md5::compute(key);
        (format!("{:02x}", digest[0]), format!("{:02x}", digest[1]))
    }

    fn object_path(&self, key: &str) -> PathBuf {
        let (shard_a, shard_b) = Self::object_shards(key);
        let mut path = self.base_path.clone();
        path.push(shard_a);
        path.push(shard_b);
        path.push(key);
        path
    }

    async fn write_tmp(tmp_path: &Path, body: PutBody) -> io::Result<u64> {
        match body {
            PutBody::File(source) => fs::copy(&source, tmp_path).await,
            PutBody::Bytes(bytes) => {
                let mut file = fs::File::create(tmp_path).await?;
                file.write_all(&bytes).await?;
                file.flush().await?;
                file.sync_all().await?;
                Ok(bytes.len() as u64)
            }
        }
    }

    /// Remove empty directories between `start` and the store root.
    async fn prune_empty_dirs(&self, start: &Path) {
        let mut current = start.to_path_buf();
        while current.starts_with(&self.base_path) && current != self.base_path {
            match fs::remove_dir(&current).await {
                Ok(_) => match current.parent() {
                    Some(parent) => current = parent.to_path_buf(),
                    None => break,
                },
                Err(err) if err.kind() == ErrorKind::NotFound => break,
                Err(err) if err.kind() == ErrorKind::DirectoryNotEmpty => break,
                Err(err) => {
                    debug!("failed to prune directory {}: {}", current.display(), err);
                    break;
                }
            }
        }
    }
}

#[async_trait]
impl ObjectStore for FsStore {
    fn name(&self) -> &'static str {
        "fs"
    }

    fn staging_mode(&self) -> StagingMode {
        StagingMode::FilePath
    }

    async fn put(&self, key: &str, body: PutBody, metadata: &PutMetadata) -> StoreResult<()> {
        let file_path = self.object_path(key);
        let parent = file_path
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| io::Error::new(ErrorKind::Other, "object path missing parent directory"))?;
        fs::create_dir_all(&parent).await?;

        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));
        let written = match Self::write_tmp(&tmp_path, body).await {
            Ok(written) => written,
            Err(err) => {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(StoreError::Io(err));
            }
        };
        if written != metadata.content_length {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StoreError::Backend(format!(
                "short write for `{}`: {} of {} bytes",
                key, written, metadata.content_length
            )));
        }

        if let Err(err) = fs::rename(&tmp_path, &file_path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StoreError::Io(err));
        }

        debug!(key, path = %file_path.display(), etag = %metadata.etag(), "stored object on disk");
        Ok(())
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        match fs::metadata(self.object_path(key)).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(StoreError::Io(err)),
        }
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let file_path = self.object_path(key);
        match fs::remove_file(&file_path).await {
            Ok(_) => debug!("removed physical file {}", file_path.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound(key.to_string()));
            }
            Err(err) => return Err(StoreError::Io(err)),
        }

        if let Some(parent) = file_path.parent() {
            self.prune_empty_dirs(parent).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[tokio::test]
    async fn put_exists_delete_prunes_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::open(dir.path()).await.unwrap();
        let meta = PutMetadata::for_content(b"pixels", "image/png");

        store
            .put("avatars/a.png", PutBody::Bytes(Bytes::from_static(b"pixels")), &meta)
            .await
            .unwrap();
        assert!(store.exists("avatars/a.png").await.unwrap());
        assert_eq!(
            fs::read(store.object_path("avatars/a.png")).await.unwrap(),
            b"pixels"
        );

        store.delete("avatars/a.png").await.unwrap();
        assert!(!store.exists("avatars/a.png").await.unwrap());

        let mut entries = fs::read_dir(dir.path()).await.unwrap();
        assert!(entries.next_entry().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn put_from_file_copies_content() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("staged.bin");
        fs::write(&source, b"staged").await.unwrap();
        let store = FsStore::open(dir.path().join("objects")).await.unwrap();
        let meta = PutMetadata::for_content(b"staged", "application/octet-stream");

        store
            .put("k.bin", PutBody::File(source.clone()), &meta)
            .await
            .unwrap();

        assert!(store.exists("k.bin").await.unwrap());
        assert!(fs::metadata(&source).await.is_ok());
    }

    #[tokio::test]
    async fn delete_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::open(dir.path()).await.unwrap();
        assert!(matches!(
            store.delete("nope.txt").await,
            Err(StoreError::NotFound(_))
        ));
    }
}
