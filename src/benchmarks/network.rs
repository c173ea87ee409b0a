use crate::domain::model::{BenchOutput, Event, Measurement};
use crate::domain::ports::{BenchContext, Benchmark, ObjectStorage};
use crate::utils::error::{BenchError, Result};
use async_trait::async_trait;
use serde_json::json;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::time::timeout;

/// Fixed socket timeout; a round that misses it fails the invocation.
const ROUND_TIMEOUT: Duration = Duration::from_secs(3);

const DEFAULT_REPETITIONS: u64 = 10;

/// UDP round-trip micro-benchmark: echoes `repetitions` datagrams against
/// the given server and uploads a CSV of per-round timestamps.
pub struct Network;

struct Round {
    id: u64,
    send_us: i64,
    recv_us: i64,
}

#[async_trait]
impl Benchmark for Network {
    fn name(&self) -> &'static str {
        "network"
    }

    async fn run(&self, event: &Event, ctx: &BenchContext) -> Result<BenchOutput> {
        let bucket = event.bucket()?;
        let address = event.require_str("server-address")?;
        let port = event.get_u64("server-port").ok_or_else(|| BenchError::EventError {
            message: "missing field 'server-port'".to_string(),
        })?;
        let repetitions = event.get_u64("repetitions").unwrap_or(DEFAULT_REPETITIONS);
        let request_id = event.request_id().unwrap_or("unknown");

        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect((address, port as u16)).await?;

        let mut rounds = Vec::with_capacity(repetitions as usize);
        let mut buf = [0u8; 64];

        let compute_begin = Instant::now();
        for id in 0..repetitions {
            let message = format!("{}:{}", request_id, id);
            let send_us = chrono::Utc::now().timestamp_micros();
            socket.send(message.as_bytes()).await?;

            match timeout(ROUND_TIMEOUT, socket.recv(&mut buf)).await {
                Ok(received) => {
                    received?;
                    let recv_us = chrono::Utc::now().timestamp_micros();
                    rounds.push(Round {
                        id,
                        send_us,
                        recv_us,
                    });
                }
                Err(_) => {
                    return Err(BenchError::NetworkTimeout {
                        attempts: id as usize + 1,
                    });
                }
            }
        }
        let compute_time = compute_begin.elapsed().as_micros() as u64;

        let rtt_sum: i64 = rounds.iter().map(|r| r.recv_us - r.send_us).sum();
        let rtt_avg_us = if rounds.is_empty() {
            0
        } else {
            rtt_sum / rounds.len() as i64
        };

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(["id", "client_send_us", "client_recv_us"])?;
        for round in &rounds {
            writer.write_record([
                round.id.to_string(),
                round.send_us.to_string(),
                round.recv_us.to_string(),
            ])?;
        }
        let csv_data = writer
            .into_inner()
            .map_err(|e| BenchError::StorageError {
                bucket: bucket.bucket.clone(),
                message: format!("failed to flush results CSV: {}", e),
            })?;

        let target_key = if bucket.output_prefix().is_empty() {
            format!("results-{}.csv", request_id)
        } else {
            format!("{}/results-{}.csv", bucket.output_prefix(), request_id)
        };

        let upload_begin = Instant::now();
        let upload_size = csv_data.len() as u64;
        let key = ctx
            .storage
            .upload_stream(&bucket.bucket, &target_key, &csv_data)
            .await?;
        let upload_time = upload_begin.elapsed().as_micros() as u64;

        Ok(BenchOutput::with_measurement(
            json!({
                "server": format!("{}:{}", address, port),
                "repetitions": rounds.len(),
                "rtt_avg_us": rtt_avg_us,
                "key": key,
            }),
            Measurement {
                download_time: 0,
                download_size: 0,
                compute_time,
                upload_time,
                upload_size,
                memory_usage_mb: None,
            },
        ))
    }
}
