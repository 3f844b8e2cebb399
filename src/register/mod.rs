// Model registration: resolve a run, pick an artifact directory, register
// it under a model name, apply tags.

use std::error::Error;
use std::io::{BufRead, BufReader, ErrorKind, Write};

use colored::*;
use tracing::info;

use crate::deploy::{display_artifacts, runs_uri};
use crate::registry::{ArtifactFile, RegistryClient, RegistryError};

/// Outcome of parsing one line of menu input.
#[derive(Debug, PartialEq, Eq)]
enum Choice {
    Picked(usize),
    OutOfRange,
    NotANumber,
}

/// Parses a 1-based menu choice against `count` entries. Non-numeric and
/// out-of-range input are distinct outcomes so each gets its own retry
/// message.
fn parse_choice(line: &str, count: usize) -> Choice {
    match line.trim().parse::<usize>() {
        Ok(n) if (1..=count).contains(&n) => Choice::Picked(n - 1),
        Ok(_) => Choice::OutOfRange,
        Err(_) => Choice::NotANumber,
    }
}

/// Picks the artifact directory to register a model from.
///
/// Zero directories is an error; one is chosen silently; several open a
/// numbered menu with unbounded retry.
pub fn select_artifact_dir<R: BufRead, W: Write>(
    run_id: &str,
    artifacts: &[ArtifactFile],
    mut input: R,
    out: &mut W,
) -> Result<ArtifactFile, RegistryError> {
    let dirs: Vec<&ArtifactFile> = artifacts.iter().filter(|a| a.is_dir).collect();

    if dirs.is_empty() {
        return Err(RegistryError::NoModelDirectories(run_id.to_string()));
    }
    if dirs.len() == 1 {
        return Ok(dirs[0].clone());
    }

    writeln!(out, "\nMultiple model directories found. Please select one:")?;
    for (idx, dir) in dirs.iter().enumerate() {
        writeln!(out, "{}. {}", idx + 1, dir.path)?;
    }

    loop {
        write!(out, "\nEnter the number of your choice: ")?;
        out.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Err(RegistryError::Io(std::io::Error::new(
                ErrorKind::UnexpectedEof,
                "input closed before a directory was chosen",
            )));
        }

        match parse_choice(&line, dirs.len()) {
            Choice::Picked(idx) => return Ok(dirs[idx].clone()),
            Choice::OutOfRange => {
                writeln!(out, "Please enter a number between 1 and {}", dirs.len())?;
            }
            Choice::NotANumber => {
                writeln!(out, "Please enter a valid number")?;
            }
        }
    }
}

/// Resolves the run to register from: an explicit run id wins, otherwise
/// the latest FINISHED run of the named experiment.
async fn resolve_run_id(
    client: &RegistryClient,
    experiment_name: &str,
    run_id: Option<String>,
) -> Result<String, RegistryError> {
    if let Some(id) = run_id {
        println!("Loading model from run ID: {}", id);
        return Ok(id);
    }

    println!(
        "Loading latest successful model from experiment: {}",
        experiment_name
    );
    let experiment = client.get_experiment_by_name(experiment_name).await?;
    let run = client.latest_finished_run(&experiment).await?;
    println!("Found latest run ID: {}", run.info.run_id);
    Ok(run.info.run_id)
}

/// Runs the whole registration flow against the registry.
pub async fn run(
    client: &RegistryClient,
    experiment_name: &str,
    run_id: Option<String>,
    model_name: &str,
    tags: &[(String, String)],
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let run_id = resolve_run_id(client, experiment_name, run_id).await?;

    let artifacts = client.list_artifacts(&run_id, None).await?;

    // Expand directories one level so the listing shows what each
    // candidate actually contains
    let mut nested = Vec::new();
    for artifact in artifacts.iter().filter(|a| a.is_dir) {
        let children = client.list_artifacts(&run_id, Some(&artifact.path)).await?;
        nested.push((artifact.path.clone(), children));
    }
    display_artifacts(&artifacts, &nested);

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    let chosen = select_artifact_dir(
        &run_id,
        &artifacts,
        BufReader::new(stdin.lock()),
        &mut stdout,
    )?;

    let source = runs_uri(&run_id, &chosen.path);
    println!("\nRegistering model from: {}", source);
    println!("Model name: {}", model_name);
    info!("Registering {} as '{}'", source, model_name);

    client.ensure_registered_model(model_name).await?;
    let version = client
        .create_model_version(model_name, &source, &run_id)
        .await?;
    println!(
        "{}",
        format!("Model registered with version: {}", version.version).green()
    );

    if !tags.is_empty() {
        for (key, value) in tags {
            client
                .set_registered_model_tag(model_name, key, value)
                .await?;
        }
        println!("Tags set successfully");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn artifact(path: &str, is_dir: bool) -> ArtifactFile {
        ArtifactFile {
            path: path.to_string(),
            is_dir,
            file_size: None,
        }
    }

    fn select_with_input(
        artifacts: &[ArtifactFile],
        input: &str,
    ) -> (Result<ArtifactFile, RegistryError>, String) {
        let mut out = Vec::new();
        let result =
            select_artifact_dir("run1", artifacts, Cursor::new(input.as_bytes()), &mut out);
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_no_directories_is_an_error() {
        let artifacts = vec![artifact("metrics.json", false)];
        let (result, _) = select_with_input(&artifacts, "");
        assert!(matches!(result, Err(RegistryError::NoModelDirectories(_))));
    }

    #[test]
    fn test_single_directory_chosen_silently() {
        let artifacts = vec![artifact("summary.json", false), artifact("rf_apples", true)];
        let (result, output) = select_with_input(&artifacts, "");
        assert_eq!(result.unwrap().path, "rf_apples");
        assert!(output.is_empty());
    }

    #[test]
    fn test_menu_retries_then_picks() {
        let artifacts = vec![
            artifact("rf_apples", true),
            artifact("gb_apples", true),
            artifact("notes.txt", false),
        ];
        let (result, output) = select_with_input(&artifacts, "abc\n9\n2\n");
        assert_eq!(result.unwrap().path, "gb_apples");
        assert_eq!(output.matches("Please enter a valid number").count(), 1);
        assert_eq!(
            output.matches("Please enter a number between 1 and 2").count(),
            1
        );
    }

    #[test]
    fn test_menu_only_offers_directories() {
        let artifacts = vec![
            artifact("notes.txt", false),
            artifact("rf_apples", true),
            artifact("gb_apples", true),
        ];
        let (_, output) = select_with_input(&artifacts, "1\n");
        assert!(output.contains("rf_apples"));
        assert!(output.contains("gb_apples"));
        assert!(!output.contains("notes.txt"));
    }

    #[test]
    fn test_closed_input_is_an_error() {
        let artifacts = vec![artifact("a", true), artifact("b", true)];
        let (result, _) = select_with_input(&artifacts, "");
        assert!(matches!(result, Err(RegistryError::Io(_))));
    }

    #[test]
    fn test_parse_choice() {
        assert_eq!(parse_choice("2\n", 3), Choice::Picked(1));
        assert_eq!(parse_choice("  1 ", 3), Choice::Picked(0));
        assert_eq!(parse_choice("0", 3), Choice::OutOfRange);
        assert_eq!(parse_choice("4", 3), Choice::OutOfRange);
        assert_eq!(parse_choice("two", 3), Choice::NotANumber);
    }
}
