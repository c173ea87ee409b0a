use crate::domain::model::{BenchOutput, Event};
use crate::utils::error::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::Path;

/// Object storage over `(bucket, key)`, backed by the local filesystem, S3,
/// or the Worker R2 proxy. `upload` uniquifies the key and returns the key
/// actually written.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(&self, bucket: &str, key: &str, local_path: &Path) -> Result<String>;

    async fn upload_stream(&self, bucket: &str, key: &str, data: &[u8]) -> Result<String>;

    async fn download(&self, bucket: &str, key: &str, local_path: &Path) -> Result<()>;

    async fn download_stream(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;

    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>>;

    /// Fetches every object under `prefix` into `out_dir`, recreating the
    /// relative directory layout below the prefix.
    async fn download_directory(&self, bucket: &str, prefix: &str, out_dir: &Path) -> Result<()> {
        let keys = self.list(bucket, prefix).await?;
        for key in keys {
            let relative = key
                .strip_prefix(prefix)
                .map(|r| r.trim_start_matches('/'))
                .unwrap_or(&key);
            let target = out_dir.join(relative);
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            self.download(bucket, &key, &target).await?;
        }
        Ok(())
    }
}

/// A key attribute name paired with its value, e.g. `("cart_id", "abc")`.
pub type KeyAttribute<'a> = (&'a str, &'a str);

/// NoSQL table access over composite `(primary, secondary)` keys, backed by
/// the in-memory table or the Worker Durable Object proxy.
#[async_trait]
pub trait NoSqlDatabase: Send + Sync {
    async fn insert(
        &self,
        table: &str,
        primary_key: KeyAttribute<'_>,
        secondary_key: KeyAttribute<'_>,
        data: Map<String, Value>,
    ) -> Result<()>;

    async fn get(
        &self,
        table: &str,
        primary_key: KeyAttribute<'_>,
        secondary_key: KeyAttribute<'_>,
    ) -> Result<Option<Map<String, Value>>>;

    async fn update(
        &self,
        table: &str,
        primary_key: KeyAttribute<'_>,
        secondary_key: KeyAttribute<'_>,
        data: Map<String, Value>,
    ) -> Result<()>;

    /// Scans one partition; it never crosses primary keys.
    async fn query(
        &self,
        table: &str,
        primary_key: KeyAttribute<'_>,
        secondary_key_name: &str,
    ) -> Result<Vec<Map<String, Value>>>;

    async fn delete(
        &self,
        table: &str,
        primary_key: KeyAttribute<'_>,
        secondary_key: KeyAttribute<'_>,
    ) -> Result<()>;
}

/// One registered benchmark function.
#[async_trait]
pub trait Benchmark: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self, event: &Event, ctx: &BenchContext) -> Result<BenchOutput>;
}

/// Backends handed to a benchmark by the platform entrypoint.
pub struct BenchContext {
    pub storage: std::sync::Arc<dyn ObjectStorage>,
    pub nosql: std::sync::Arc<dyn NoSqlDatabase>,
    pub scratch_dir: std::path::PathBuf,
}

impl BenchContext {
    pub fn new(
        storage: std::sync::Arc<dyn ObjectStorage>,
        nosql: std::sync::Arc<dyn NoSqlDatabase>,
        scratch_dir: std::path::PathBuf,
    ) -> Self {
        Self {
            storage,
            nosql,
            scratch_dir,
        }
    }
}

pub trait ConfigProvider: Send + Sync {
    fn storage_path(&self) -> &str;
    fn scratch_path(&self) -> &str;
    fn worker_url(&self) -> Option<&str>;
}
