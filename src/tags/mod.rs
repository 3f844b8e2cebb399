// Interactive tag management for a registered model or one of its versions

use std::error::Error;

use colored::*;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::info;

use crate::registry::{RegistryClient, RegistryError};

fn print_menu(model_name: &str, version: Option<&str>) {
    match version {
        Some(v) => println!(
            "\n{}",
            format!("Tag Management — model '{}' version {}", model_name, v).cyan()
        ),
        None => println!("\n{}", format!("Tag Management — model '{}'", model_name).cyan()),
    }
    println!("1. Add/Update tag");
    println!("2. Delete tag");
    println!("3. List current tags");
    println!("4. Exit tag management");
}

/// Reads one line, trimmed. `None` means the user closed the input.
fn prompt(rl: &mut DefaultEditor, text: &str) -> Option<String> {
    match rl.readline(text) {
        Ok(line) => Some(line.trim().to_string()),
        Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => None,
        Err(_) => None,
    }
}

async fn set_tag(
    client: &RegistryClient,
    model_name: &str,
    version: Option<&str>,
    key: &str,
    value: &str,
) -> Result<(), RegistryError> {
    match version {
        Some(v) => {
            client
                .set_model_version_tag(model_name, v, key, value)
                .await
        }
        None => client.set_registered_model_tag(model_name, key, value).await,
    }
}

async fn delete_tag(
    client: &RegistryClient,
    model_name: &str,
    version: Option<&str>,
    key: &str,
) -> Result<(), RegistryError> {
    match version {
        Some(v) => client.delete_model_version_tag(model_name, v, key).await,
        None => client.delete_registered_model_tag(model_name, key).await,
    }
}

async fn list_tags(
    client: &RegistryClient,
    model_name: &str,
    version: Option<&str>,
) -> Result<(), RegistryError> {
    let tags = match version {
        Some(v) => client.get_model_version(model_name, v).await?.tag_map(),
        None => client.get_registered_model_tags(model_name).await?,
    };

    if tags.is_empty() {
        println!("{}", "No tags set".yellow());
        return Ok(());
    }

    println!("\nCurrent tags:");
    let mut sorted: Vec<_> = tags.into_iter().collect();
    sorted.sort();
    for (key, value) in sorted {
        println!("{}: {}", key.yellow(), value);
    }
    Ok(())
}

/// Menu loop over the tag endpoints. Remote failures are printed and the
/// loop continues; end-of-input exits.
pub async fn manage_tags(
    client: &RegistryClient,
    model_name: &str,
    version: Option<&str>,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!(
        "Starting tag management for '{}' (version: {:?})",
        model_name, version
    );
    let mut rl = DefaultEditor::new()?;

    loop {
        print_menu(model_name, version);

        let choice = match prompt(&mut rl, "\nEnter your choice (1-4): ") {
            Some(c) => c,
            None => break,
        };
        if !choice.is_empty() {
            let _ = rl.add_history_entry(&choice);
        }

        match choice.as_str() {
            "1" => {
                let key = match prompt(&mut rl, "Enter tag key: ") {
                    Some(k) if !k.is_empty() => k,
                    Some(_) => {
                        println!("Tag key must not be empty");
                        continue;
                    }
                    None => break,
                };
                let value = match prompt(&mut rl, "Enter tag value: ") {
                    Some(v) => v,
                    None => break,
                };
                match set_tag(client, model_name, version, &key, &value).await {
                    Ok(()) => println!(
                        "{}",
                        format!("Tag {}={} set successfully", key, value).green()
                    ),
                    Err(e) => println!("Error: {}", e),
                }
            }
            "2" => {
                let key = match prompt(&mut rl, "Enter tag key to delete: ") {
                    Some(k) if !k.is_empty() => k,
                    Some(_) => {
                        println!("Tag key must not be empty");
                        continue;
                    }
                    None => break,
                };
                match delete_tag(client, model_name, version, &key).await {
                    Ok(()) => println!("{}", format!("Tag {} deleted successfully", key).green()),
                    Err(e) => println!("Error: {}", e),
                }
            }
            "3" => {
                if let Err(e) = list_tags(client, model_name, version).await {
                    println!("Error: {}", e);
                }
            }
            "4" => break,
            _ => println!("Invalid choice, please try again"),
        }
    }

    println!("Leaving tag management");
    Ok(())
}
