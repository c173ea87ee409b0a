use clap::Parser;
use faasbench::config::file::FileConfig;
use faasbench::domain::model::Event;
use faasbench::runtime::invoke;
use faasbench::utils::monitor::SystemMonitor;
use faasbench::utils::{logger, validation::Validate};
use faasbench::CliConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut config = CliConfig::parse();

    logger::init_cli_logger(config.verbose);

    tracing::info!("Starting faasbench CLI");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    if let Some(path) = config.config.clone() {
        apply_file_config(&mut config, &path)?;
    }

    if let Err(e) = config.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        tracing::error!("Suggestion: {}", e.recovery_suggestion());
        eprintln!("{}", e.user_friendly_message());
        std::process::exit(1);
    }

    let event_json = match &config.event_file {
        Some(path) => std::fs::read_to_string(path)?,
        None => config.event.clone(),
    };
    let mut event = Event::from_request(&event_json, "")?;

    let ctx = invoke::context_from(&config);

    let monitor = SystemMonitor::new(config.monitor);
    if monitor.is_enabled() {
        tracing::info!("System monitoring enabled");
    }

    let benchmark = config.benchmark.clone().unwrap_or_default();
    match invoke::invoke(&benchmark, &mut event, &ctx, &monitor).await {
        Ok(response) => {
            monitor.log_stats("invocation complete");
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Err(e) => {
            tracing::error!(
                "Benchmark failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("Recovery suggestion: {}", e.recovery_suggestion());
            eprintln!("{}", e.user_friendly_message());

            let exit_code = match e.severity() {
                faasbench::utils::error::ErrorSeverity::Low => 0,
                faasbench::utils::error::ErrorSeverity::Medium => 2,
                faasbench::utils::error::ErrorSeverity::High => 1,
                faasbench::utils::error::ErrorSeverity::Critical => 3,
            };

            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

/// File values fill in whatever the CLI left at its default.
fn apply_file_config(config: &mut CliConfig, path: &str) -> anyhow::Result<()> {
    let file = FileConfig::load(path)?;
    let file_event = file.event_json()?;
    if config.benchmark.is_none() {
        config.benchmark = file.benchmark;
    }
    if config.storage_path == "./storage" {
        if let Some(storage_path) = file.storage_path {
            config.storage_path = storage_path;
        }
    }
    if config.scratch_path == "./scratch" {
        if let Some(scratch_path) = file.scratch_path {
            config.scratch_path = scratch_path;
        }
    }
    if config.worker_url.is_none() {
        config.worker_url = file.worker_url;
    }
    if config.event == "{}" {
        if let Some(event) = file_event {
            config.event = event;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn config_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
benchmark = "compression"
storage_path = "/data/storage"

[event]
key = "corpus"
"#
        )
        .unwrap();
        file
    }

    #[test]
    fn test_file_config_fills_cli_defaults() {
        let file = config_file();
        let mut config = CliConfig::parse_from(["faasbench"]);

        apply_file_config(&mut config, file.path().to_str().unwrap()).unwrap();

        assert_eq!(config.benchmark.as_deref(), Some("compression"));
        assert_eq!(config.storage_path, "/data/storage");
        assert_eq!(config.scratch_path, "./scratch");
        let event: serde_json::Value = serde_json::from_str(&config.event).unwrap();
        assert_eq!(event["key"], "corpus");
    }

    #[test]
    fn test_cli_flags_win_over_file_config() {
        let file = config_file();
        let mut config = CliConfig::parse_from([
            "faasbench",
            "--benchmark",
            "uploader",
            "--storage-path",
            "/cli/storage",
            "--event",
            r#"{"key": "from-flag"}"#,
        ]);

        apply_file_config(&mut config, file.path().to_str().unwrap()).unwrap();

        assert_eq!(config.benchmark.as_deref(), Some("uploader"));
        assert_eq!(config.storage_path, "/cli/storage");
        assert_eq!(config.event, r#"{"key": "from-flag"}"#);
    }
}
