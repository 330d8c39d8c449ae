use crate::models::{BlobEntry, display_name};
use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Namespaced key -> bytes object storage for uploaded documents
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write a blob under `key`. Keys are immutable once written; the
    /// upload coordinator never reuses one.
    async fn put(&self, key: &str, bytes: Bytes) -> Result<()>;

    /// List every blob in the namespace
    async fn list(&self) -> Result<Vec<BlobEntry>>;

    /// Remove a blob. Deleting an absent key succeeds, which makes
    /// file deletion idempotent.
    async fn delete(&self, key: &str) -> Result<()>;
}

/// S3-backed blob store; the namespace maps to a key prefix inside the bucket
pub struct S3BlobStore {
    client: Client,
    bucket: String,
    prefix: String,
}

impl S3BlobStore {
    pub fn new(client: Client, bucket: String, namespace: &str) -> Self {
        Self {
            client,
            bucket,
            prefix: format!("{}/", namespace),
        }
    }

    fn object_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(&self, key: &str, bytes: Bytes) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(self.object_key(key))
            .body(ByteStream::from(bytes.to_vec()))
            .send()
            .await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<BlobEntry>> {
        let mut entries = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let mut req = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(&self.prefix);
            if let Some(token) = continuation.take() {
                req = req.continuation_token(token);
            }

            let resp = req.send().await?;
            for object in resp.contents() {
                let Some(full_key) = object.key() else {
                    continue;
                };
                let key = full_key.strip_prefix(&self.prefix).unwrap_or(full_key);
                if key.is_empty() {
                    continue;
                }
                entries.push(BlobEntry {
                    key: key.to_string(),
                    name: display_name(key).to_string(),
                });
            }

            if resp.is_truncated() == Some(true) {
                continuation = resp.next_continuation_token().map(str::to_string);
                if continuation.is_none() {
                    break;
                }
            } else {
                break;
            }
        }

        Ok(entries)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        // S3 delete_object succeeds for keys that never existed
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(self.object_key(key))
            .send()
            .await?;
        Ok(())
    }
}

/// In-memory blob store for development and testing
#[derive(Default)]
pub struct MemoryBlobStore {
    objects: RwLock<HashMap<String, Bytes>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &str) -> Option<Bytes> {
        self.objects.read().await.get(key).cloned()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, bytes: Bytes) -> Result<()> {
        self.objects.write().await.insert(key.to_string(), bytes);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<BlobEntry>> {
        let mut entries: Vec<BlobEntry> = self
            .objects
            .read()
            .await
            .keys()
            .map(|key| BlobEntry {
                key: key.clone(),
                name: display_name(key).to_string(),
            })
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.objects.write().await.remove(key);
        Ok(())
    }
}

/// Blob store whose writes and deletes always fail (for testing)
#[cfg(test)]
pub struct FailingBlobStore;

#[cfg(test)]
#[async_trait]
impl BlobStore for FailingBlobStore {
    async fn put(&self, key: &str, _bytes: Bytes) -> Result<()> {
        Err(anyhow::anyhow!("simulated blob write failure for {}", key))
    }

    async fn list(&self) -> Result<Vec<BlobEntry>> {
        Ok(Vec::new())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        Err(anyhow::anyhow!("simulated blob delete failure for {}", key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryBlobStore::new();
        store
            .put("1735689600000-report.pdf", Bytes::from_static(b"%PDF"))
            .await
            .unwrap();

        let entries = store.list().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, "1735689600000-report.pdf");
        assert_eq!(entries[0].name, "report.pdf");
        assert_eq!(
            store.get("1735689600000-report.pdf").await.unwrap(),
            Bytes::from_static(b"%PDF")
        );

        store.delete("1735689600000-report.pdf").await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_memory_store_delete_absent_is_ok() {
        let store = MemoryBlobStore::new();
        store.delete("never-existed").await.unwrap();
    }
}
