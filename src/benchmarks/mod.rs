pub mod compression;
pub mod crud;
pub mod network;
pub mod uploader;

use crate::domain::ports::Benchmark;
use crate::utils::error::{BenchError, Result};
use std::sync::OnceLock;

/// Some origin servers (Wikimedia among them) reject requests without a
/// User-Agent, so every outbound benchmark request carries one.
pub const USER_AGENT: &str = "faasbench/0.1 benchmark-suite";

static HTTP_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

/// Shared outbound HTTP client, reused across warm invocations.
pub fn http_client() -> &'static reqwest::Client {
    HTTP_CLIENT.get_or_init(|| {
        reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default()
    })
}

static UPLOADER: uploader::Uploader = uploader::Uploader;
static COMPRESSION: compression::Compression = compression::Compression;
static NETWORK: network::Network = network::Network;
static CRUD: crud::CrudApi = crud::CrudApi;

pub fn lookup(name: &str) -> Result<&'static dyn Benchmark> {
    match name {
        "uploader" => Ok(&UPLOADER),
        "compression" => Ok(&COMPRESSION),
        "network" => Ok(&NETWORK),
        "crud-api" => Ok(&CRUD),
        other => Err(BenchError::UnknownBenchmark(other.to_string())),
    }
}

pub fn names() -> &'static [&'static str] {
    &["uploader", "compression", "network", "crud-api"]
}
