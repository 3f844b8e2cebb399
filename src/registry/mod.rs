mod client;
mod types;

// Re-export the client handle
pub use client::RegistryClient;
// Re-export wire types and the error taxonomy
pub use types::{ArtifactFile, Experiment, ModelVersion, RegistryError, Run, TagEntry};
