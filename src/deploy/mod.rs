// Version resolution and deployment of registered models

mod display;
mod invoker;
mod resolver;

pub use display::{display_artifacts, display_versions};
pub use invoker::{launch, model_uri, runs_uri, ServeOptions};
pub use resolver::resolve_version;

use std::error::Error;
use std::io::BufReader;
use std::time::Duration;

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::registry::RegistryClient;

/// Resolves which version of `model_name` to deploy and hands it to the
/// external serving process. Blocks until that process exits.
pub async fn serve(
    client: &RegistryClient,
    model_name: &str,
    requested_version: Option<&str>,
    opts: &ServeOptions,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{prefix:.bold.dim} {spinner} {wide_msg}")
            .unwrap(),
    );
    pb.enable_steady_tick(Duration::from_millis(120));
    pb.set_message(format!("Fetching versions of '{}'...", model_name));

    let versions = client.search_model_versions(model_name).await;
    pb.finish_and_clear();
    let versions = versions?;

    display_versions(model_name, &versions);

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    let chosen = resolve_version(
        model_name,
        &versions,
        requested_version,
        BufReader::new(stdin.lock()),
        &mut stdout,
    )?;

    let uri = model_uri(model_name, &chosen.version);
    info!("Resolved model '{}' to {}", model_name, uri);
    if let Some(source) = &chosen.source {
        info!("Version {} was registered from {}", chosen.version, source);
    }

    let status = launch(&uri, opts).await?;
    if status.success() {
        println!("{}", "Serving process exited cleanly".green());
    } else {
        println!("{}", format!("Serving process exited with {}", status).red());
    }
    Ok(())
}
