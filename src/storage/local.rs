use crate::domain::ports::ObjectStorage;
use crate::storage::unique_name;
use crate::utils::error::{BenchError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Filesystem-backed object storage: buckets are directories under a base
/// path, keys are relative paths inside them. Used by the CLI driver and as
/// the backing store for the container server's R2 polyfill routes.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn object_path(&self, bucket: &str, key: &str) -> PathBuf {
        self.base_path.join(bucket).join(key)
    }

    /// Writes under the exact key, no uniquification. The R2 polyfill route
    /// uses this: proxy clients uniquify before calling.
    pub async fn put_object(&self, bucket: &str, key: &str, data: &[u8]) -> Result<()> {
        let path = self.object_path(bucket, key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, data).await?;
        Ok(())
    }
}

#[async_trait]
impl ObjectStorage for LocalStorage {
    async fn upload(&self, bucket: &str, key: &str, local_path: &Path) -> Result<String> {
        let data = tokio::fs::read(local_path).await?;
        self.upload_stream(bucket, key, &data).await
    }

    async fn upload_stream(&self, bucket: &str, key: &str, data: &[u8]) -> Result<String> {
        let key = unique_name(key);
        let path = self.object_path(bucket, &key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, data).await?;
        tracing::debug!("stored {} bytes at {}/{}", data.len(), bucket, key);
        Ok(key)
    }

    async fn download(&self, bucket: &str, key: &str, local_path: &Path) -> Result<()> {
        let data = self.download_stream(bucket, key).await?;
        if let Some(parent) = local_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(local_path, data).await?;
        Ok(())
    }

    async fn download_stream(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let path = self.object_path(bucket, key);
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(BenchError::ObjectNotFound {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>> {
        let root = self.base_path.join(bucket);
        let mut keys = Vec::new();
        let mut pending = vec![root.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                } else if let Ok(relative) = path.strip_prefix(&root) {
                    let key = relative.to_string_lossy().replace('\\', "/");
                    if key.starts_with(prefix) {
                        keys.push(key);
                    }
                }
            }
        }

        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_upload_download_roundtrip() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());

        let key = storage
            .upload_stream("bucket", "in/data.bin", b"payload")
            .await
            .unwrap();
        assert_ne!(key, "in/data.bin");

        let data = storage.download_stream("bucket", &key).await.unwrap();
        assert_eq!(data, b"payload");
    }

    #[tokio::test]
    async fn test_download_missing_object() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());

        let err = storage
            .download_stream("bucket", "missing")
            .await
            .unwrap_err();
        assert!(matches!(err, BenchError::ObjectNotFound { .. }));
    }

    #[tokio::test]
    async fn test_list_with_prefix() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());

        storage.upload_stream("b", "in/a.txt", b"1").await.unwrap();
        storage.upload_stream("b", "in/b.txt", b"2").await.unwrap();
        storage.upload_stream("b", "out/c.txt", b"3").await.unwrap();

        let keys = storage.list("b", "in/").await.unwrap();
        assert_eq!(keys.len(), 2);
        assert!(keys.iter().all(|k| k.starts_with("in/")));

        let empty = storage.list("other-bucket", "").await.unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn test_download_directory_recreates_layout() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());

        let k1 = storage
            .upload_stream("b", "in/sub/x.txt", b"x")
            .await
            .unwrap();
        let k2 = storage.upload_stream("b", "in/y.txt", b"y").await.unwrap();

        let out = TempDir::new().unwrap();
        storage
            .download_directory("b", "in", out.path())
            .await
            .unwrap();

        assert!(out.path().join(k1.strip_prefix("in/").unwrap()).exists());
        assert!(out.path().join(k2.strip_prefix("in/").unwrap()).exists());
    }
}
