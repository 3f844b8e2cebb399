use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Command-line surface for the deployment tool.
#[derive(Debug, Parser)]
#[command(
    name = "mldeploy",
    version,
    about = "Inspect, register and deploy models from an ML tracking registry"
)]
pub struct Cli {
    /// Tracking service URL; overrides the configured value
    #[arg(long, global = true, value_name = "URL")]
    pub tracking_uri: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the registered versions of a model
    Versions {
        #[arg(long)]
        model_name: String,
    },
    /// List a run's artifacts, directories expanded one level
    Artifacts {
        #[arg(long)]
        run_id: String,
        /// Restrict the listing to a sub-path
        #[arg(long)]
        path: Option<String>,
    },
    /// Register a model version from a run's artifacts
    Register {
        /// Experiment to take the latest successful run from
        #[arg(long)]
        experiment: String,
        /// Register from this run instead of the experiment's latest
        #[arg(long)]
        run_id: Option<String>,
        #[arg(long)]
        model_name: String,
        /// Tag to set on the registered model, repeatable
        #[arg(long = "tag", value_name = "KEY=VALUE", value_parser = parse_tag)]
        tags: Vec<(String, String)>,
    },
    /// Resolve a version of a registered model and serve it
    Serve {
        #[arg(long)]
        model_name: String,
        /// Version to deploy; with several versions and no explicit
        /// choice, an interactive prompt asks for one
        #[arg(long)]
        version: Option<String>,
        /// Port for the serving process; overrides the configured value
        #[arg(long)]
        port: Option<u16>,
    },
    /// Interactively manage tags of a model or one of its versions
    Tags {
        #[arg(long)]
        model_name: String,
        /// Manage this version's tags instead of the model's
        #[arg(long)]
        version: Option<String>,
    },
    /// Score a JSON payload against a served model
    Predict {
        /// Payload file with a dataframe_split object
        #[arg(long)]
        input: PathBuf,
        /// Base URL of the served model; wins over --port
        #[arg(long)]
        url: Option<String>,
        /// Port of a locally served model
        #[arg(long)]
        port: Option<u16>,
        /// Send only the first N rows
        #[arg(long)]
        rows: Option<usize>,
    },
}

/// Parses a `KEY=VALUE` tag argument.
fn parse_tag(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("Expected KEY=VALUE, got '{}'", raw)),
    }
}
