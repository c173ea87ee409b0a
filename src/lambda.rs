#[cfg(feature = "lambda")]
use faasbench::config::lambda::LambdaConfig;
#[cfg(feature = "lambda")]
use faasbench::domain::model::Event;
#[cfg(feature = "lambda")]
use faasbench::domain::ports::BenchContext;
#[cfg(feature = "lambda")]
use faasbench::runtime::invoke;
#[cfg(feature = "lambda")]
use faasbench::storage::s3::S3Storage;
#[cfg(feature = "lambda")]
use faasbench::utils::monitor::SystemMonitor;
#[cfg(feature = "lambda")]
use faasbench::utils::validation::Validate;
#[cfg(feature = "lambda")]
use faasbench::MemoryDatabase;
#[cfg(feature = "lambda")]
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
#[cfg(feature = "lambda")]
use serde_json::Value;
#[cfg(feature = "lambda")]
use std::sync::Arc;
#[cfg(feature = "lambda")]
use tokio::sync::OnceCell;

#[cfg(feature = "lambda")]
static CONTEXT: OnceCell<BenchContext> = OnceCell::const_new();

/// Backends are built once and reused across warm invocations.
#[cfg(feature = "lambda")]
async fn bench_context(config: &LambdaConfig) -> &'static BenchContext {
    CONTEXT
        .get_or_init(|| async {
            let storage = S3Storage::from_env(&config.s3_region).await;
            BenchContext::new(
                Arc::new(storage),
                Arc::new(MemoryDatabase::new()),
                config.scratch_path.clone().into(),
            )
        })
        .await
}

#[cfg(feature = "lambda")]
async fn function_handler(lambda_event: LambdaEvent<Value>) -> Result<Value, Error> {
    let config = LambdaConfig::from_env()
        .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)?;
    config
        .validate()
        .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)?;

    let mut event = match Event::from_value(lambda_event.payload) {
        Ok(event) => event,
        Err(e) => {
            return Ok(serde_json::to_value(invoke::error_response(
                &e,
                &lambda_event.context.request_id,
            ))?);
        }
    };
    // Lambda's own request id beats a wrapper-minted one.
    event.insert(
        "request-id",
        Value::String(lambda_event.context.request_id.clone()),
    );

    let benchmark = event
        .get_str("benchmark")
        .unwrap_or(&config.benchmark)
        .to_string();

    let ctx = bench_context(&config).await;

    let monitor = SystemMonitor::new(false);
    match invoke::invoke(&benchmark, &mut event, ctx, &monitor).await {
        Ok(response) => Ok(serde_json::to_value(response)?),
        Err(e) => Ok(serde_json::to_value(invoke::error_response(
            &e,
            &lambda_event.context.request_id,
        ))?),
    }
}

#[cfg(feature = "lambda")]
#[tokio::main]
async fn main() -> Result<(), Error> {
    faasbench::utils::logger::init_platform_logger();
    run(service_fn(function_handler)).await
}
