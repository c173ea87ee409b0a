pub mod benchmarks;
pub mod config;
pub mod domain;
pub mod nosql;
pub mod runtime;
pub mod storage;
pub mod utils;

#[cfg(feature = "server")]
pub mod server;

#[cfg(feature = "cli")]
pub use config::CliConfig;

#[cfg(feature = "lambda")]
pub use config::LambdaConfig;

pub use domain::model::{BenchOutput, Event, InvocationResponse, Measurement};
pub use domain::ports::{BenchContext, Benchmark, NoSqlDatabase, ObjectStorage};
pub use nosql::memory::MemoryDatabase;
pub use storage::local::LocalStorage;
pub use storage::proxy::ProxyStorage;
pub use utils::error::{BenchError, Result};
