use crate::domain::model::{BenchOutput, Event, Measurement};
use crate::domain::ports::{BenchContext, Benchmark, ObjectStorage};
use crate::utils::error::Result;
use async_trait::async_trait;
use serde_json::json;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use zip::write::{FileOptions, ZipWriter};

/// Pulls a directory of objects out of storage, zips it, and uploads the
/// archive.
pub struct Compression;

fn collect_files(root: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                pending.push(entry.path());
            } else {
                files.push(entry.path());
            }
        }
    }
    files.sort();
    Ok(files)
}

fn zip_directory(root: &Path) -> Result<(Vec<u8>, u64)> {
    let mut input_size = 0u64;
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

    for path in collect_files(root)? {
        let data = std::fs::read(&path)?;
        input_size += data.len() as u64;
        let name = path
            .strip_prefix(root)
            .unwrap_or(&path)
            .to_string_lossy()
            .replace('\\', "/");
        zip.start_file::<_, ()>(name, FileOptions::default())?;
        zip.write_all(&data)?;
    }

    let cursor = zip.finish()?;
    Ok((cursor.into_inner(), input_size))
}

#[async_trait]
impl Benchmark for Compression {
    fn name(&self) -> &'static str {
        "compression"
    }

    async fn run(&self, event: &Event, ctx: &BenchContext) -> Result<BenchOutput> {
        let bucket = event.bucket()?;
        let archive_name = event
            .get_str("key")
            .or_else(|| event.get("object").and_then(|o| o.get("key")).and_then(|k| k.as_str()))
            .unwrap_or("archive");

        let work_dir = ctx.scratch_dir.join(archive_name);
        tokio::fs::create_dir_all(&work_dir).await?;

        let download_begin = Instant::now();
        ctx.storage
            .download_directory(&bucket.bucket, bucket.input_prefix(), &work_dir)
            .await?;
        let download_time = download_begin.elapsed().as_micros() as u64;

        let compute_begin = Instant::now();
        let (archive, input_size) = zip_directory(&work_dir)?;
        let compute_time = compute_begin.elapsed().as_micros() as u64;

        let target_key = if bucket.output_prefix().is_empty() {
            format!("{}.zip", archive_name)
        } else {
            format!("{}/{}.zip", bucket.output_prefix(), archive_name)
        };

        let upload_begin = Instant::now();
        let archive_size = archive.len() as u64;
        let key = ctx
            .storage
            .upload_stream(&bucket.bucket, &target_key, &archive)
            .await?;
        let upload_time = upload_begin.elapsed().as_micros() as u64;

        Ok(BenchOutput::with_measurement(
            json!({
                "bucket": bucket.bucket,
                "key": key,
                "input_size": input_size,
                "archive_size": archive_size,
            }),
            Measurement {
                download_time,
                download_size: input_size,
                compute_time,
                upload_time,
                upload_size: archive_size,
                memory_usage_mb: None,
            },
        ))
    }
}
