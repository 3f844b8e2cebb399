use std::error::Error;
use std::process::ExitStatus;

use colored::*;
use tokio::process::Command;
use tracing::info;

/// Registry-style URI the serving process loads the model from.
pub fn model_uri(model_name: &str, version: &str) -> String {
    format!("models:/{}/{}", model_name, version)
}

/// URI pointing at a model directory inside a run's artifact store.
pub fn runs_uri(run_id: &str, artifact_path: &str) -> String {
    format!("runs:/{}/{}", run_id, artifact_path)
}

/// Options forwarded to the external serving process.
#[derive(Debug, Clone)]
pub struct ServeOptions {
    pub host: String,
    pub port: u16,
    /// How the serving process materializes the model environment
    /// (local, virtualenv, conda)
    pub env_manager: String,
}

/// Argument vector for `mlflow models serve`. Kept separate from the
/// spawn so the invocation can be checked without launching anything.
pub fn serve_args(model_uri: &str, opts: &ServeOptions) -> Vec<String> {
    vec![
        "models".to_string(),
        "serve".to_string(),
        "--model-uri".to_string(),
        model_uri.to_string(),
        "--port".to_string(),
        opts.port.to_string(),
        "--host".to_string(),
        opts.host.clone(),
        "--env-manager".to_string(),
        opts.env_manager.clone(),
    ]
}

/// Launches the external serving process for the resolved model and waits
/// for it to exit. The serving runtime itself is not ours; only the exit
/// status is reported.
pub async fn launch(
    model_uri: &str,
    opts: &ServeOptions,
) -> Result<ExitStatus, Box<dyn Error + Send + Sync>> {
    println!(
        "{}",
        format!("Deploying {} on {}:{}", model_uri, opts.host, opts.port).green()
    );
    info!(
        "Launching serving process for {} on {}:{}",
        model_uri, opts.host, opts.port
    );

    let status = Command::new("mlflow")
        .args(serve_args(model_uri, opts))
        .status()
        .await?;

    info!("Serving process exited with {}", status);
    Ok(status)
}
