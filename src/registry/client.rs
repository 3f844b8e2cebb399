use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use super::types::{ArtifactFile, Experiment, ModelVersion, RegistryError, Run};

const API_PREFIX: &str = "api/2.0/mlflow";

/// Error envelope the tracking service wraps non-2xx responses in.
#[derive(Deserialize)]
struct ErrorEnvelope {
    error_code: Option<String>,
    message: Option<String>,
}

#[derive(Deserialize)]
struct SearchModelVersionsResponse {
    #[serde(default)]
    model_versions: Vec<ModelVersion>,
}

#[derive(Deserialize)]
struct ListArtifactsResponse {
    #[serde(default)]
    files: Vec<ArtifactFile>,
}

#[derive(Deserialize)]
struct GetExperimentResponse {
    experiment: Experiment,
}

#[derive(Deserialize)]
struct SearchExperimentsResponse {
    #[serde(default)]
    experiments: Vec<Experiment>,
}

#[derive(Deserialize)]
struct SearchRunsResponse {
    #[serde(default)]
    runs: Vec<Run>,
}

#[derive(Deserialize)]
struct ModelVersionResponse {
    model_version: ModelVersion,
}

#[derive(Deserialize)]
struct GetRegisteredModelResponse {
    registered_model: RegisteredModelBody,
}

#[derive(Deserialize)]
struct RegisteredModelBody {
    #[serde(default)]
    tags: Vec<super::types::TagEntry>,
}

/// Client for the tracking/registry REST API.
///
/// Every method is one remote call; failures are surfaced as
/// `RegistryError` and never retried. The client is passed explicitly to
/// the code that needs it rather than living in ambient state, so flows
/// can be exercised against a stand-in service in tests.
pub struct RegistryClient {
    http: reqwest::Client,
    base_url: String,
}

impl RegistryClient {
    /// Creates a client for the given tracking URI, e.g.
    /// `http://127.0.0.1:8080`.
    pub fn new(tracking_uri: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: tracking_uri.trim_end_matches('/').to_string(),
        }
    }

    pub fn tracking_uri(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}/{}", self.base_url, API_PREFIX, path)
    }

    /// Decodes a response, mapping non-2xx statuses through the service's
    /// `{error_code, message}` envelope.
    async fn decode<T: DeserializeOwned>(
        path: &str,
        response: reqwest::Response,
    ) -> Result<T, RegistryError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let body = response.text().await.unwrap_or_default();
        let envelope: ErrorEnvelope = serde_json::from_str(&body).unwrap_or(ErrorEnvelope {
            error_code: None,
            message: None,
        });
        Err(RegistryError::Api {
            endpoint: path.to_string(),
            status: status.as_u16(),
            error_code: envelope.error_code,
            message: envelope.message.unwrap_or(body),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, RegistryError> {
        debug!("GET {} {:?}", path, query);
        let response = self
            .http
            .get(self.endpoint(path))
            .query(query)
            .send()
            .await?;
        Self::decode(path, response).await
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, RegistryError> {
        debug!("POST {}", path);
        let response = self.http.post(self.endpoint(path)).json(body).send().await?;
        Self::decode(path, response).await
    }

    async fn delete_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, RegistryError> {
        debug!("DELETE {}", path);
        let response = self
            .http
            .delete(self.endpoint(path))
            .json(body)
            .send()
            .await?;
        Self::decode(path, response).await
    }

    /// Returns all registered versions of a model, in registry order.
    pub async fn search_model_versions(
        &self,
        model_name: &str,
    ) -> Result<Vec<ModelVersion>, RegistryError> {
        let filter = format!("name='{}'", model_name);
        let response: SearchModelVersionsResponse = self
            .get_json("model-versions/search", &[("filter", filter.as_str())])
            .await?;
        info!(
            "Registry returned {} version(s) for model '{}'",
            response.model_versions.len(),
            model_name
        );
        Ok(response.model_versions)
    }

    /// Lists artifacts of a run, optionally under a sub-path.
    pub async fn list_artifacts(
        &self,
        run_id: &str,
        path: Option<&str>,
    ) -> Result<Vec<ArtifactFile>, RegistryError> {
        let mut query = vec![("run_id", run_id)];
        if let Some(p) = path {
            query.push(("path", p));
        }
        let response: ListArtifactsResponse = self.get_json("artifacts/list", &query).await?;
        Ok(response.files)
    }

    /// Looks up an experiment by name. A missing experiment is enriched
    /// with the names of the experiments that do exist, so the caller can
    /// print something actionable.
    pub async fn get_experiment_by_name(&self, name: &str) -> Result<Experiment, RegistryError> {
        let result: Result<GetExperimentResponse, RegistryError> = self
            .get_json("experiments/get-by-name", &[("experiment_name", name)])
            .await;

        match result {
            Ok(response) => Ok(response.experiment),
            Err(RegistryError::Api { error_code, .. })
                if error_code.as_deref() == Some("RESOURCE_DOES_NOT_EXIST") =>
            {
                let available = self
                    .search_experiments()
                    .await?
                    .into_iter()
                    .map(|e| e.name)
                    .collect();
                Err(RegistryError::ExperimentNotFound {
                    name: name.to_string(),
                    available,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Returns all experiments known to the tracking service.
    pub async fn search_experiments(&self) -> Result<Vec<Experiment>, RegistryError> {
        let response: SearchExperimentsResponse = self
            .post_json("experiments/search", &json!({ "max_results": 1000 }))
            .await?;
        Ok(response.experiments)
    }

    /// Finds the most recently started FINISHED run of an experiment.
    pub async fn latest_finished_run(
        &self,
        experiment: &Experiment,
    ) -> Result<Run, RegistryError> {
        let body = json!({
            "experiment_ids": [experiment.experiment_id],
            "filter": "status = 'FINISHED'",
            "order_by": ["start_time DESC"],
            "max_results": 1
        });
        let response: SearchRunsResponse = self.post_json("runs/search", &body).await?;
        match response.runs.into_iter().next() {
            Some(run) => {
                debug!(
                    "Latest finished run for '{}': {} (status {:?}, started {:?})",
                    experiment.name, run.info.run_id, run.info.status, run.info.start_time
                );
                Ok(run)
            }
            None => Err(RegistryError::NoFinishedRuns(experiment.name.clone())),
        }
    }

    /// Creates the registered model if it does not exist yet. An existing
    /// model is not an error; versions accumulate under it.
    pub async fn ensure_registered_model(&self, name: &str) -> Result<(), RegistryError> {
        let result: Result<serde_json::Value, RegistryError> = self
            .post_json("registered-models/create", &json!({ "name": name }))
            .await;

        match result {
            Ok(_) => {
                info!("Created registered model '{}'", name);
                Ok(())
            }
            Err(RegistryError::Api { error_code, .. })
                if error_code.as_deref() == Some("RESOURCE_ALREADY_EXISTS") =>
            {
                debug!("Registered model '{}' already exists", name);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Registers a new version of a model from an artifact source URI.
    pub async fn create_model_version(
        &self,
        name: &str,
        source: &str,
        run_id: &str,
    ) -> Result<ModelVersion, RegistryError> {
        let body = json!({ "name": name, "source": source, "run_id": run_id });
        let response: ModelVersionResponse =
            self.post_json("model-versions/create", &body).await?;
        info!(
            "Registered model '{}' version {}",
            name, response.model_version.version
        );
        Ok(response.model_version)
    }

    pub async fn get_model_version(
        &self,
        name: &str,
        version: &str,
    ) -> Result<ModelVersion, RegistryError> {
        let response: ModelVersionResponse = self
            .get_json("model-versions/get", &[("name", name), ("version", version)])
            .await?;
        Ok(response.model_version)
    }

    /// Tags currently set on the registered model itself.
    pub async fn get_registered_model_tags(
        &self,
        name: &str,
    ) -> Result<HashMap<String, String>, RegistryError> {
        let response: GetRegisteredModelResponse = self
            .get_json("registered-models/get", &[("name", name)])
            .await?;
        Ok(response
            .registered_model
            .tags
            .into_iter()
            .map(|t| (t.key, t.value))
            .collect())
    }

    pub async fn set_registered_model_tag(
        &self,
        name: &str,
        key: &str,
        value: &str,
    ) -> Result<(), RegistryError> {
        let body = json!({ "name": name, "key": key, "value": value });
        let _: serde_json::Value = self.post_json("registered-models/set-tag", &body).await?;
        Ok(())
    }

    pub async fn set_model_version_tag(
        &self,
        name: &str,
        version: &str,
        key: &str,
        value: &str,
    ) -> Result<(), RegistryError> {
        let body = json!({ "name": name, "version": version, "key": key, "value": value });
        let _: serde_json::Value = self.post_json("model-versions/set-tag", &body).await?;
        Ok(())
    }

    pub async fn delete_registered_model_tag(
        &self,
        name: &str,
        key: &str,
    ) -> Result<(), RegistryError> {
        let body = json!({ "name": name, "key": key });
        let _: serde_json::Value = self
            .delete_json("registered-models/delete-tag", &body)
            .await?;
        Ok(())
    }

    pub async fn delete_model_version_tag(
        &self,
        name: &str,
        version: &str,
        key: &str,
    ) -> Result<(), RegistryError> {
        let body = json!({ "name": name, "version": version, "key": key });
        let _: serde_json::Value = self.delete_json("model-versions/delete-tag", &body).await?;
        Ok(())
    }
}

impl std::fmt::Debug for RegistryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = RegistryClient::new("http://127.0.0.1:8080/");
        assert_eq!(client.tracking_uri(), "http://127.0.0.1:8080");
        assert_eq!(
            client.endpoint("model-versions/search"),
            "http://127.0.0.1:8080/api/2.0/mlflow/model-versions/search"
        );
    }

    #[test]
    fn test_error_envelope_parsing() {
        let body = r#"{"error_code": "RESOURCE_DOES_NOT_EXIST", "message": "no such model"}"#;
        let envelope: ErrorEnvelope = serde_json::from_str(body).unwrap();
        assert_eq!(envelope.error_code.as_deref(), Some("RESOURCE_DOES_NOT_EXIST"));
        assert_eq!(envelope.message.as_deref(), Some("no such model"));
    }

    #[test]
    fn test_search_response_defaults_to_empty() {
        // The service omits the array entirely when there are no matches
        let response: SearchModelVersionsResponse = serde_json::from_str("{}").unwrap();
        assert!(response.model_versions.is_empty());

        let response: ListArtifactsResponse =
            serde_json::from_str(r#"{"root_uri": "s3://bucket"}"#).unwrap();
        assert!(response.files.is_empty());
    }
}
