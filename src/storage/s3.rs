use crate::domain::ports::ObjectStorage;
use crate::storage::unique_name;
use crate::utils::error::{BenchError, Result};
use async_trait::async_trait;
use aws_sdk_s3::Client as S3Client;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct S3Storage {
    client: S3Client,
}

impl S3Storage {
    pub fn new(client: S3Client) -> Self {
        Self { client }
    }

    pub async fn from_env(region: &str) -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let config = aws_sdk_s3::config::Builder::from(&config)
            .region(aws_sdk_s3::config::Region::new(region.to_string()))
            .force_path_style(true)
            .build();
        Self::new(S3Client::from_conf(config))
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    async fn upload(&self, bucket: &str, key: &str, local_path: &Path) -> Result<String> {
        let data = tokio::fs::read(local_path).await?;
        self.upload_stream(bucket, key, &data).await
    }

    async fn upload_stream(&self, bucket: &str, key: &str, data: &[u8]) -> Result<String> {
        let key = unique_name(key);
        self.client
            .put_object()
            .bucket(bucket)
            .key(&key)
            .body(data.to_vec().into())
            .send()
            .await
            .map_err(|e| BenchError::StorageError {
                bucket: bucket.to_string(),
                message: format!("S3 put_object failed: {}", e),
            })?;
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
        let resp = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let service_err = e.into_service_error();
                if service_err.is_no_such_key() {
                    BenchError::ObjectNotFound {
                        bucket: bucket.to_string(),
                        key: key.to_string(),
                    }
                } else {
                    BenchError::StorageError {
                        bucket: bucket.to_string(),
                        message: format!("S3 get_object failed: {}", service_err),
                    }
                }
            })?;

        let data = resp
            .body
            .collect()
            .await
            .map_err(|e| BenchError::StorageError {
                bucket: bucket.to_string(),
                message: format!("failed to collect S3 body: {}", e),
            })?;

        Ok(data.into_bytes().to_vec())
    }

    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let resp = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .prefix(prefix)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(|e| BenchError::StorageError {
                    bucket: bucket.to_string(),
                    message: format!("S3 list_objects_v2 failed: {}", e),
                })?;

            for object in resp.contents() {
                if let Some(key) = object.key() {
                    keys.push(key.to_string());
                }
            }

            match resp.next_continuation_token() {
                Some(token) => continuation = Some(token.to_string()),
                None => break,
            }
        }

        Ok(keys)
    }
}
