use std::error::Error;
use std::path::Path;

use clap::Parser;
use tracing::info;

mod cli;
mod config;
mod deploy;
mod predict;
mod register;
mod registry;
mod tags;

use crate::cli::{Cli, Commands};
use crate::config::Settings;
use crate::registry::RegistryClient;

fn log_level(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "error" => tracing::Level::ERROR,
        "warn" => tracing::Level::WARN,
        "debug" => tracing::Level::DEBUG,
        "trace" => tracing::Level::TRACE,
        _ => tracing::Level::INFO,
    }
}

/// Main entry point for the mldeploy tool
///
/// Parses command line arguments and dispatches to the subcommands:
/// listing versions and artifacts, registering a model version from a
/// run, resolving and serving a registered version, interactive tag
/// management, and scoring a payload against a served model.
///
/// # Errors
/// Returns an error if configuration loading fails, a registry call
/// fails, or an interactive stream is closed mid-selection
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    // Load settings first
    let settings = Settings::new()?;

    // Diagnostics go to a rolling log file; the console stays reserved
    // for tables and prompts
    let log_dir = settings
        .logging
        .file
        .as_deref()
        .unwrap_or_else(|| Path::new("logs"));
    std::fs::create_dir_all(log_dir)?;
    let file_appender = tracing_appender::rolling::RollingFileAppender::new(
        tracing_appender::rolling::Rotation::DAILY,
        log_dir,
        "mldeploy",
    );
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        // Disable ANSI colors for cleaner log files
        .with_ansi(false)
        .with_line_number(true)
        .with_file(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_target(false)
        .with_max_level(log_level(&settings.logging.level))
        .init();

    info!("mldeploy starting up");

    let tracking_uri = cli
        .tracking_uri
        .unwrap_or_else(|| settings.tracking.uri.clone());
    let client = RegistryClient::new(&tracking_uri);
    println!("Using tracking URI: {}", client.tracking_uri());
    info!("Tracking URI: {}", client.tracking_uri());

    match cli.command {
        Commands::Versions { model_name } => {
            let versions = client.search_model_versions(&model_name).await?;
            deploy::display_versions(&model_name, &versions);
        }
        Commands::Artifacts { run_id, path } => {
            let artifacts = client.list_artifacts(&run_id, path.as_deref()).await?;
            let mut nested = Vec::new();
            for artifact in artifacts.iter().filter(|a| a.is_dir) {
                let children = client.list_artifacts(&run_id, Some(&artifact.path)).await?;
                nested.push((artifact.path.clone(), children));
            }
            deploy::display_artifacts(&artifacts, &nested);
        }
        Commands::Register {
            experiment,
            run_id,
            model_name,
            tags,
        } => {
            register::run(&client, &experiment, run_id, &model_name, &tags).await?;
        }
        Commands::Serve {
            model_name,
            version,
            port,
        } => {
            let opts = deploy::ServeOptions {
                host: settings.serve.host.clone(),
                port: port.unwrap_or(settings.serve.port),
                env_manager: settings.serve.env_manager.clone(),
            };
            deploy::serve(&client, &model_name, version.as_deref(), &opts).await?;
        }
        Commands::Tags {
            model_name,
            version,
        } => {
            tags::manage_tags(&client, &model_name, version.as_deref()).await?;
        }
        Commands::Predict {
            input,
            url,
            port,
            rows,
        } => {
            let payload = predict::load_payload(&input, rows)?;
            let base_url = url.unwrap_or_else(|| {
                format!("http://localhost:{}", port.unwrap_or(settings.serve.port))
            });
            predict::run(&base_url, &payload).await?;
        }
    }

    Ok(())
}
