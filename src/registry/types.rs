use std::collections::HashMap;
use std::error::Error;
use std::fmt;

use serde::{Deserialize, Serialize};

/// One key/value tag attached to a registered model or a model version.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TagEntry {
    pub key: String,
    pub value: String,
}

/// One immutable snapshot of a registered model, as returned by the
/// registry's model-version search endpoint.
///
/// The `version` identifier is an opaque token: it is compared by exact
/// string equality and never ordered numerically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelVersion {
    /// Registered model this version belongs to
    pub name: String,
    /// Opaque version identifier, unique within `name`
    pub version: String,
    /// Epoch milliseconds
    pub creation_timestamp: Option<i64>,
    pub last_updated_timestamp: Option<i64>,
    pub current_stage: Option<String>,
    /// Artifact location the version was registered from
    pub source: Option<String>,
    pub run_id: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub tags: Vec<TagEntry>,
}

impl ModelVersion {
    /// Tags as a lookup map. The wire format is a list of pairs; a map is
    /// what callers actually want.
    pub fn tag_map(&self) -> HashMap<String, String> {
        self.tags
            .iter()
            .map(|t| (t.key.clone(), t.value.clone()))
            .collect()
    }
}

/// A file or directory in a run's artifact store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactFile {
    pub path: String,
    #[serde(default)]
    pub is_dir: bool,
    pub file_size: Option<i64>,
}

/// An experiment record from the tracking service.
#[derive(Debug, Clone, Deserialize)]
pub struct Experiment {
    pub experiment_id: String,
    pub name: String,
}

/// Run metadata subset consumed by the registration flow.
#[derive(Debug, Clone, Deserialize)]
pub struct RunInfo {
    pub run_id: String,
    pub status: Option<String>,
    /// Epoch milliseconds
    pub start_time: Option<i64>,
}

/// A tracking-service run. Only the `info` block is used here.
#[derive(Debug, Clone, Deserialize)]
pub struct Run {
    pub info: RunInfo,
}

/// Errors produced while talking to the registry or resolving a version.
#[derive(Debug)]
pub enum RegistryError {
    /// Explicitly requested version is absent from the registry's list
    VersionNotFound { model: String, version: String },
    /// Version search returned nothing for the model
    EmptyVersionSet(String),
    /// A run's artifact listing contains no directories to register from
    NoModelDirectories(String),
    /// Experiment lookup failed; carries the names that do exist
    ExperimentNotFound { name: String, available: Vec<String> },
    /// Latest-run search over an experiment found no FINISHED run
    NoFinishedRuns(String),
    /// Non-2xx response decoded from the service's error envelope
    Api {
        endpoint: String,
        status: u16,
        error_code: Option<String>,
        message: String,
    },
    /// Connection-level failure from the HTTP client
    Transport(reqwest::Error),
    /// Interactive stream failure (closed stdin during a prompt loop)
    Io(std::io::Error),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RegistryError::VersionNotFound { model, version } => write!(
                f,
                "Model version {} not found in registry for model '{}'",
                version, model
            ),
            RegistryError::EmptyVersionSet(model) => {
                write!(f, "No versions registered for model '{}'", model)
            }
            RegistryError::NoModelDirectories(run_id) => {
                write!(f, "No directories found in artifacts of run {}", run_id)
            }
            RegistryError::ExperimentNotFound { name, available } => write!(
                f,
                "Experiment '{}' not found. Available experiments: [{}]",
                name,
                available.join(", ")
            ),
            RegistryError::NoFinishedRuns(experiment) => {
                write!(f, "No successful runs found in experiment '{}'", experiment)
            }
            RegistryError::Api {
                endpoint,
                status,
                error_code,
                message,
            } => match error_code {
                Some(code) => write!(
                    f,
                    "Registry error on {} (HTTP {}, {}): {}",
                    endpoint, status, code, message
                ),
                None => write!(
                    f,
                    "Registry error on {} (HTTP {}): {}",
                    endpoint, status, message
                ),
            },
            RegistryError::Transport(e) => write!(f, "Registry request failed: {}", e),
            RegistryError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl Error for RegistryError {}

impl From<reqwest::Error> for RegistryError {
    fn from(err: reqwest::Error) -> Self {
        RegistryError::Transport(err)
    }
}

impl From<std::io::Error> for RegistryError {
    fn from(err: std::io::Error) -> Self {
        RegistryError::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_version_deserialize_with_tags() {
        let json = r#"{
            "name": "apple_demand_predictor",
            "version": "2",
            "creation_timestamp": 1714000000000,
            "last_updated_timestamp": 1714000500000,
            "current_stage": "None",
            "source": "runs:/abc123/rf_apples",
            "run_id": "abc123",
            "status": "READY",
            "tags": [{"key": "stage", "value": "candidate"}]
        }"#;

        let version: ModelVersion = serde_json::from_str(json).unwrap();
        assert_eq!(version.name, "apple_demand_predictor");
        assert_eq!(version.version, "2");
        assert_eq!(version.run_id.as_deref(), Some("abc123"));
        assert_eq!(
            version.tag_map().get("stage").map(String::as_str),
            Some("candidate")
        );
    }

    #[test]
    fn test_model_version_deserialize_minimal() {
        // The registry omits empty tag lists and optional fields entirely
        let json = r#"{"name": "m", "version": "1"}"#;
        let version: ModelVersion = serde_json::from_str(json).unwrap();
        assert_eq!(version.version, "1");
        assert!(version.tags.is_empty());
        assert!(version.current_stage.is_none());
    }

    #[test]
    fn test_artifact_file_deserialize() {
        let json = r#"{"path": "rf_apples", "is_dir": true}"#;
        let artifact: ArtifactFile = serde_json::from_str(json).unwrap();
        assert!(artifact.is_dir);
        assert_eq!(artifact.path, "rf_apples");
        assert!(artifact.file_size.is_none());

        let json = r#"{"path": "model_summary.json", "file_size": 512}"#;
        let artifact: ArtifactFile = serde_json::from_str(json).unwrap();
        assert!(!artifact.is_dir);
        assert_eq!(artifact.file_size, Some(512));
    }

    #[test]
    fn test_version_not_found_display_names_both() {
        let err = RegistryError::VersionNotFound {
            model: "apple_demand_predictor".to_string(),
            version: "9".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("9"));
        assert!(message.contains("apple_demand_predictor"));
    }

    #[test]
    fn test_experiment_not_found_lists_available() {
        let err = RegistryError::ExperimentNotFound {
            name: "missing".to_string(),
            available: vec!["Iris_Models".to_string(), "Apples".to_string()],
        };
        let message = err.to_string();
        assert!(message.contains("missing"));
        assert!(message.contains("Iris_Models"));
        assert!(message.contains("Apples"));
    }
}
