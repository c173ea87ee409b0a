use crate::domain::ports::ObjectStorage;
use crate::storage::unique_name;
use crate::utils::error::{BenchError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::path::Path;

/// R2 access for containerized deployments: the container has no binding of
/// its own, so every operation goes through the fronting Worker's
/// `/r2/upload`, `/r2/download` and `/r2/list` routes.
#[derive(Debug, Clone)]
pub struct ProxyStorage {
    client: Client,
    worker_url: String,
}

#[derive(Deserialize)]
struct UploadReply {
    key: String,
}

#[derive(Deserialize)]
struct ListedObject {
    key: String,
}

#[derive(Deserialize)]
struct ListReply {
    #[serde(default)]
    objects: Vec<ListedObject>,
}

impl ProxyStorage {
    pub fn new(worker_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            worker_url: worker_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn worker_url(&self) -> &str {
        &self.worker_url
    }

    async fn put_object(&self, bucket: &str, key: &str, data: &[u8]) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/r2/upload", self.worker_url))
            .query(&[("bucket", bucket), ("key", key)])
            .header("Content-Type", "application/octet-stream")
            .body(data.to_vec())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(BenchError::StorageError {
                bucket: bucket.to_string(),
                message: format!("upload of '{}' failed: {}", key, response.status()),
            });
        }

        let reply: UploadReply = response.json().await?;
        Ok(reply.key)
    }
}

#[async_trait]
impl ObjectStorage for ProxyStorage {
    async fn upload(&self, bucket: &str, key: &str, local_path: &Path) -> Result<String> {
        let data = tokio::fs::read(local_path).await?;
        self.upload_stream(bucket, key, &data).await
    }

    async fn upload_stream(&self, bucket: &str, key: &str, data: &[u8]) -> Result<String> {
        // Uniquify on the client side; the Worker stores under the exact key.
        self.put_object(bucket, &unique_name(key), data).await
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
        let response = self
            .client
            .get(format!("{}/r2/download", self.worker_url))
            .query(&[("bucket", bucket), ("key", key)])
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(BenchError::ObjectNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
            status if status.is_success() => Ok(response.bytes().await?.to_vec()),
            status => Err(BenchError::StorageError {
                bucket: bucket.to_string(),
                message: format!("download of '{}' failed: {}", key, status),
            }),
        }
    }

    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>> {
        let response = self
            .client
            .get(format!("{}/r2/list", self.worker_url))
            .query(&[("bucket", bucket), ("prefix", prefix)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(BenchError::StorageError {
                bucket: bucket.to_string(),
                message: format!("list of prefix '{}' failed: {}", prefix, response.status()),
            });
        }

        let reply: ListReply = response.json().await?;
        Ok(reply.objects.into_iter().map(|o| o.key).collect())
    }
}
