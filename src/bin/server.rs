use faasbench::config::server::ServerConfig;
use faasbench::server::{serve, AppState};
use faasbench::utils::logger;
use faasbench::utils::validation::Validate;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logger::init_platform_logger();

    let config = ServerConfig::from_env()?;
    config.validate()?;

    tracing::info!(
        port = config.port,
        storage_path = %config.storage_path,
        worker_url = ?config.worker_url,
        "starting container server"
    );

    let state = AppState::new(
        &config.storage_path,
        &config.scratch_path,
        config.worker_url.clone(),
    );
    serve(state, config.port).await?;
    Ok(())
}
