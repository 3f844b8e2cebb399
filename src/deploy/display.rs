use chrono::{TimeZone, Utc};
use colored::*;
use comfy_table::{Attribute, Cell, CellAlignment, ContentArrangement, Table};

use crate::registry::{ArtifactFile, ModelVersion};

/// Renders an epoch-millisecond timestamp the way the tracking UI does.
fn format_timestamp(millis: Option<i64>) -> String {
    match millis.and_then(|ms| Utc.timestamp_millis_opt(ms).single()) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => "-".to_string(),
    }
}

fn header_cell(text: &str) -> Cell {
    Cell::new(text)
        .fg(comfy_table::Color::Cyan)
        .add_attribute(Attribute::Bold)
}

/// Displays the registered versions of a model as a table.
///
/// # Arguments
///
/// * `model_name` - Model the versions belong to
/// * `versions` - Snapshot returned by the registry
pub fn display_versions(model_name: &str, versions: &[ModelVersion]) {
    if versions.is_empty() {
        println!(
            "{}",
            format!("No versions registered for model '{}'", model_name).yellow()
        );
        return;
    }

    let mut table = Table::new();
    table
        .set_header(vec![
            header_cell("Version"),
            header_cell("Stage"),
            header_cell("Status"),
            header_cell("Run ID"),
            header_cell("Created"),
            header_cell("Tags"),
        ])
        .load_preset(comfy_table::presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    for version in versions {
        let tags = version
            .tags
            .iter()
            .map(|t| format!("{}={}", t.key, t.value))
            .collect::<Vec<_>>()
            .join(", ");

        table.add_row(vec![
            Cell::new(&version.version)
                .fg(comfy_table::Color::Yellow)
                .set_alignment(CellAlignment::Center),
            Cell::new(version.current_stage.as_deref().unwrap_or("-"))
                .fg(comfy_table::Color::Magenta)
                .set_alignment(CellAlignment::Center),
            Cell::new(version.status.as_deref().unwrap_or("-"))
                .fg(comfy_table::Color::Green)
                .set_alignment(CellAlignment::Center),
            Cell::new(version.run_id.as_deref().unwrap_or("-")).fg(comfy_table::Color::White),
            Cell::new(format_timestamp(
                version.creation_timestamp.or(version.last_updated_timestamp),
            ))
            .fg(comfy_table::Color::DarkGrey),
            Cell::new(tags).fg(comfy_table::Color::Blue),
        ]);
    }

    println!("\nAvailable versions of '{}':", model_name);
    println!("{}", table);
    println!(
        "{}",
        format!("Total versions: {}", versions.len()).bright_green()
    );
}

/// Displays a run's artifact listing. Directory entries get a `(dir)`
/// marker; their nested files, when the caller fetched them, are printed
/// indented underneath.
pub fn display_artifacts(artifacts: &[ArtifactFile], nested: &[(String, Vec<ArtifactFile>)]) {
    if artifacts.is_empty() {
        println!("{}", "No artifacts found for this run".yellow());
        return;
    }

    println!("\nAvailable artifacts:");
    for (idx, artifact) in artifacts.iter().enumerate() {
        let kind = if artifact.is_dir { "(dir)" } else { "(file)" };
        println!("{}. {} {}", idx + 1, artifact.path, kind);

        if let Some((_, children)) = nested.iter().find(|(path, _)| *path == artifact.path) {
            for child in children {
                println!("   - {}", child.path);
            }
        }
    }
}
