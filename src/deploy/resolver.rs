use std::io::{BufRead, ErrorKind, Write};

use crate::registry::{ModelVersion, RegistryError};

/// Outcome of matching one line of interactive input against the
/// candidate set. Invalid input is a normal outcome here, not an error.
#[derive(Debug, PartialEq, Eq)]
enum Selection {
    Chosen(usize),
    Retry,
}

/// Matches a raw input line against the candidates by exact identifier
/// equality. Identifiers are opaque tokens; "2" and "02" are different
/// versions.
fn match_selection(line: &str, versions: &[ModelVersion]) -> Selection {
    let wanted = line.trim();
    match versions.iter().position(|v| v.version == wanted) {
        Some(idx) => Selection::Chosen(idx),
        None => Selection::Retry,
    }
}

/// Picks exactly one version out of `versions` to deploy.
///
/// Resolution order:
/// - an explicitly requested version is matched by exact string equality
///   and is fatal if absent;
/// - a single candidate is returned without consuming any input;
/// - several candidates start an unbounded prompt loop on `input`.
///
/// The returned version is always a member of `versions`. Progress and
/// prompts go to `out`; registry state is never touched.
///
/// # Arguments
///
/// * `model_name` - Registered model the candidates belong to
/// * `versions` - Snapshot returned by the registry for that model
/// * `requested` - Explicit version identifier, if the caller has one
/// * `input` - Interactive input stream (stdin in production, a cursor in tests)
/// * `out` - Stream for prompts and status lines
pub fn resolve_version<R: BufRead, W: Write>(
    model_name: &str,
    versions: &[ModelVersion],
    requested: Option<&str>,
    mut input: R,
    out: &mut W,
) -> Result<ModelVersion, RegistryError> {
    if versions.is_empty() {
        return Err(RegistryError::EmptyVersionSet(model_name.to_string()));
    }

    if let Some(wanted) = requested {
        return match versions.iter().find(|v| v.version == wanted) {
            Some(version) => {
                writeln!(out, "Choosing version {}", version.version)?;
                Ok(version.clone())
            }
            None => Err(RegistryError::VersionNotFound {
                model: model_name.to_string(),
                version: wanted.to_string(),
            }),
        };
    }

    if versions.len() == 1 {
        writeln!(
            out,
            "Only one version available, choosing version={}",
            versions[0].version
        )?;
        return Ok(versions[0].clone());
    }

    writeln!(out, "\nMultiple model versions found:")?;
    for version in versions {
        writeln!(out, "  version={}", version.version)?;
    }

    loop {
        write!(out, "\nEnter the version of your choice: ")?;
        out.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            // Closed input while a choice was still pending
            return Err(RegistryError::Io(std::io::Error::new(
                ErrorKind::UnexpectedEof,
                "input closed before a version was chosen",
            )));
        }

        match match_selection(&line, versions) {
            Selection::Chosen(idx) => {
                writeln!(out, "Choosing version {}", versions[idx].version)?;
                return Ok(versions[idx].clone());
            }
            Selection::Retry => {
                writeln!(out, "Please enter one of the listed versions")?;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn version(name: &str, id: &str) -> ModelVersion {
        ModelVersion {
            name: name.to_string(),
            version: id.to_string(),
            creation_timestamp: None,
            last_updated_timestamp: None,
            current_stage: None,
            source: None,
            run_id: None,
            status: None,
            tags: Vec::new(),
        }
    }

    fn resolve_with_input(
        versions: &[ModelVersion],
        requested: Option<&str>,
        input: &str,
    ) -> (Result<ModelVersion, RegistryError>, String) {
        let mut out = Vec::new();
        let result = resolve_version(
            "apple_demand_predictor",
            versions,
            requested,
            Cursor::new(input.as_bytes()),
            &mut out,
        );
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_explicit_request_returns_matching_member() {
        let versions = vec![version("m", "1"), version("m", "2")];
        let (result, _) = resolve_with_input(&versions, Some("2"), "");
        assert_eq!(result.unwrap().version, "2");
    }

    #[test]
    fn test_explicit_request_missing_is_fatal() {
        let versions = vec![version("m", "1"), version("m", "2")];
        let (result, _) = resolve_with_input(&versions, Some("9"), "");
        match result {
            Err(RegistryError::VersionNotFound { model, version }) => {
                assert_eq!(version, "9");
                assert_eq!(model, "apple_demand_predictor");
            }
            other => panic!("expected VersionNotFound, got {:?}", other.map(|v| v.version)),
        }
    }

    #[test]
    fn test_single_candidate_needs_no_input() {
        let versions = vec![version("m", "1")];
        // Empty input stream: the fast path must not read from it
        let (result, output) = resolve_with_input(&versions, None, "");
        assert_eq!(result.unwrap().version, "1");
        assert!(output.contains("Only one version available"));
        assert!(!output.contains("Enter the version"));
    }

    #[test]
    fn test_interactive_invalid_then_valid() {
        let versions = vec![version("m", "1"), version("m", "2")];
        let (result, output) = resolve_with_input(&versions, None, "3\n2\n");
        assert_eq!(result.unwrap().version, "2");
        assert_eq!(
            output.matches("Please enter one of the listed versions").count(),
            1
        );
    }

    #[test]
    fn test_interactive_first_answer_accepted() {
        let versions = vec![version("m", "1"), version("m", "2"), version("m", "3")];
        let (result, output) = resolve_with_input(&versions, None, "1\n");
        assert_eq!(result.unwrap().version, "1");
        assert!(!output.contains("Please enter one of the listed versions"));
    }

    #[test]
    fn test_interactive_lists_all_candidates() {
        let versions = vec![version("m", "1"), version("m", "2")];
        let (_, output) = resolve_with_input(&versions, None, "1\n");
        assert!(output.contains("version=1"));
        assert!(output.contains("version=2"));
    }

    #[test]
    fn test_closed_input_is_an_error() {
        let versions = vec![version("m", "1"), version("m", "2")];
        let (result, _) = resolve_with_input(&versions, None, "");
        assert!(matches!(result, Err(RegistryError::Io(_))));
    }

    #[test]
    fn test_empty_version_set_is_a_precondition_error() {
        let (result, _) = resolve_with_input(&[], None, "");
        assert!(matches!(result, Err(RegistryError::EmptyVersionSet(_))));
    }

    #[test]
    fn test_identifiers_are_opaque_tokens() {
        // "02" must not match "2"
        let versions = vec![version("m", "2"), version("m", "10")];
        let (result, output) = resolve_with_input(&versions, None, "02\n10\n");
        assert_eq!(result.unwrap().version, "10");
        assert_eq!(
            output.matches("Please enter one of the listed versions").count(),
            1
        );
    }

    #[test]
    fn test_match_selection_trims_whitespace() {
        let versions = vec![version("m", "1"), version("m", "2")];
        assert_eq!(match_selection("  2 \n", &versions), Selection::Chosen(1));
        assert_eq!(match_selection("7\n", &versions), Selection::Retry);
        assert_eq!(match_selection("\n", &versions), Selection::Retry);
    }
}
