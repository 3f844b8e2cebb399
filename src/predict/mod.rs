// Client for a served model's /invocations endpoint

use std::error::Error;
use std::path::Path;

use colored::*;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Column-oriented frame in the serving runtime's `dataframe_split`
/// orientation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataframeSplit {
    pub columns: Vec<String>,
    pub data: Vec<Vec<serde_json::Value>>,
}

/// Request body the serving runtime's scoring endpoint expects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationsRequest {
    pub dataframe_split: DataframeSplit,
}

/// Parses a payload file's contents. Accepts both the full request shape
/// (`{"dataframe_split": {...}}`) and a bare `{"columns": ..., "data":
/// ...}` object, which gets wrapped. `rows` caps the data to its first N
/// rows.
pub fn parse_payload(
    raw: &str,
    rows: Option<usize>,
) -> Result<InvocationsRequest, Box<dyn Error + Send + Sync>> {
    let mut request = match serde_json::from_str::<InvocationsRequest>(raw) {
        Ok(request) => request,
        Err(_) => {
            let split: DataframeSplit = serde_json::from_str(raw).map_err(|e| {
                format!(
                    "Payload must be a dataframe_split object or contain one: {}",
                    e
                )
            })?;
            InvocationsRequest {
                dataframe_split: split,
            }
        }
    };

    let width = request.dataframe_split.columns.len();
    if let Some(bad) = request
        .dataframe_split
        .data
        .iter()
        .position(|row| row.len() != width)
    {
        return Err(format!(
            "Row {} has {} values but the payload declares {} columns",
            bad,
            request.dataframe_split.data[bad].len(),
            width
        )
        .into());
    }

    if let Some(n) = rows {
        request.dataframe_split.data.truncate(n);
    }
    Ok(request)
}

/// Loads and validates a payload file.
pub fn load_payload(
    path: &Path,
    rows: Option<usize>,
) -> Result<InvocationsRequest, Box<dyn Error + Send + Sync>> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read payload file {}: {}", path.display(), e))?;
    parse_payload(&raw, rows)
}

/// Sends the payload to the served model and prints the predictions.
pub async fn run(
    base_url: &str,
    request: &InvocationsRequest,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let url = format!("{}/invocations", base_url.trim_end_matches('/'));
    info!(
        "Scoring {} row(s) against {}",
        request.dataframe_split.data.len(),
        url
    );

    let client = reqwest::Client::new();
    let response = client.post(&url).json(request).send().await?;

    let status = response.status();
    let body = response.text().await?;
    if status.is_success() {
        println!("\n{}", "Received predictions:".green());
        match serde_json::from_str::<serde_json::Value>(&body) {
            Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
            Err(_) => println!("{}", body),
        }
    } else {
        println!("{}", format!("Error: {}", status.as_u16()).red());
        println!("{}", body);
    }
    Ok(())
}
