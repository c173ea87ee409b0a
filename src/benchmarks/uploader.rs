use crate::benchmarks::http_client;
use crate::domain::model::{BenchOutput, Event, Measurement};
use crate::domain::ports::{BenchContext, Benchmark, ObjectStorage};
use crate::utils::error::{BenchError, Result};
use async_trait::async_trait;
use serde_json::json;
use std::time::Instant;

/// Fetches a file over HTTP and republishes it into object storage, timing
/// both transfers.
pub struct Uploader;

#[async_trait]
impl Benchmark for Uploader {
    fn name(&self) -> &'static str {
        "uploader"
    }

    async fn run(&self, event: &Event, ctx: &BenchContext) -> Result<BenchOutput> {
        let bucket = event.bucket()?;
        let object = event.object()?;
        let url = object.url.ok_or_else(|| BenchError::EventError {
            message: "uploader needs 'object.url'".to_string(),
        })?;

        let name = url.rsplit('/').next().unwrap_or("download").to_string();
        let download_path = ctx.scratch_dir.join(&name);
        tokio::fs::create_dir_all(&ctx.scratch_dir).await?;

        // The fetch-and-stage phase counts as compute here; the download
        // slots stay zero for this benchmark.
        let process_begin = Instant::now();
        let response = http_client().get(&url).send().await?;
        if !response.status().is_success() {
            return Err(BenchError::EventError {
                message: format!("fetch of {} returned {}", url, response.status()),
            });
        }
        let body = response.bytes().await?;
        tokio::fs::write(&download_path, &body).await?;
        let process_time = process_begin.elapsed().as_micros() as u64;

        let size = body.len() as u64;
        let target_key = if bucket.output_prefix().is_empty() {
            name.clone()
        } else {
            format!("{}/{}", bucket.output_prefix(), name)
        };

        let upload_begin = Instant::now();
        let key = ctx
            .storage
            .upload(&bucket.bucket, &target_key, &download_path)
            .await?;
        let upload_time = upload_begin.elapsed().as_micros() as u64;

        Ok(BenchOutput::with_measurement(
            json!({
                "bucket": bucket.bucket,
                "url": url,
                "key": key,
            }),
            Measurement {
                download_time: 0,
                download_size: 0,
                compute_time: process_time,
                upload_time,
                upload_size: size,
                memory_usage_mb: None,
            },
        ))
    }
}
