//! Process-local store for development and tests.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use tokio::{fs, sync::RwLock};

use super::{ObjectStore, PutBody, PutMetadata, StoreError, StoreResult, Visibility};

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub content: Bytes,
    pub content_type: String,
    pub visibility: Visibility,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl MemoryStore {
    pub async fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.read().await.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn put(&self, key: &str, body: PutBody, metadata: &PutMetadata) -> StoreResult<()> {
        let content = match body {
            PutBody::Bytes(bytes) => bytes,
            PutBody::File(path) => Bytes::from(fs::read(&path).await?),
        };
        self.objects.write().await.insert(
            key.to_string(),
            StoredObject {
                content,
                content_type: metadata.content_type.clone(),
                visibility: metadata.visibility,
            },
        );
        Ok(())
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        Ok(self.objects.read().await.contains_key(key))
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        match self.objects.write().await.remove(key) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(key.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_delete() {
        let store = MemoryStore::default();
        let meta = PutMetadata::for_content(b"abc", "text/plain");
        store
            .put("a.txt", PutBody::Bytes(Bytes::from_static(b"abc")), &meta)
            .await
            .unwrap();

        assert!(store.exists("a.txt").await.unwrap());
        assert_eq!(store.get("a.txt").await.unwrap().content.as_ref(), b"abc");

        store.delete("a.txt").await.unwrap();
        assert!(!store.exists("a.txt").await.unwrap());
        assert!(matches!(
            store.delete("a.txt").await,
            Err(StoreError::NotFound(_))
        ));
    }
}
