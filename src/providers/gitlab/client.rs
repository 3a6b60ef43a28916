use log::{debug, info};
use reqwest::{Client, StatusCode};
use url::Url;

use super::types::{GitLabJob, GitLabPipeline, TriggeredPipeline};
use crate::auth::Token;
use crate::error::{PipeforgeError, Result};

const PRIVATE_TOKEN_HEADER: &str = "PRIVATE-TOKEN";
/// GitLab's maximum page size; the default of 20 can hide the aggregation job.
const JOBS_PER_PAGE: &str = "100";

/// Form fields of a pipeline trigger call.
#[derive(Debug, Clone)]
pub struct TriggerRequest<'a> {
    pub ref_: &'a str,
    pub token: &'a Token,
    pub config_path: &'a str,
    pub variables: Vec<(&'a str, &'a str)>,
}

impl TriggerRequest<'_> {
    fn form(&self) -> Vec<(String, String)> {
        let mut form = vec![
            ("ref".to_string(), self.ref_.to_string()),
            ("token".to_string(), self.token.as_str().to_string()),
            ("CI_CONFIG_PATH".to_string(), self.config_path.to_string()),
        ];
        form.extend(
            self.variables
                .iter()
                .map(|(key, value)| (format!("variables[{key}]"), (*value).to_string())),
        );
        form
    }
}

/// Thin client over the GitLab REST API (`/api/v4`).
///
/// No request is retried; every failure is returned to the caller.
pub struct GitLabClient {
    client: Client,
    api_url: Url,
    token: Option<Token>,
}

impl GitLabClient {
    pub fn new(base_url: &str, token: Option<Token>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("pipeforge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PipeforgeError::Config(format!("Failed to create HTTP client: {e}")))?;

        let base = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };

        let api_url = Url::parse(&base)
            .map_err(|e| PipeforgeError::Config(format!("Invalid base URL: {e}")))?
            .join("api/v4/")
            .map_err(|e| PipeforgeError::Config(format!("Invalid API base URL: {e}")))?;

        Ok(Self {
            client,
            api_url,
            token,
        })
    }

    /// Helper to build authenticated requests
    fn auth_request(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(token) = &self.token {
            request.header(PRIVATE_TOKEN_HEADER, token.as_str())
        } else {
            request
        }
    }

    /// Construct project base URL
    fn project_url(&self, project_id: u64, path: &str) -> Result<Url> {
        self.api_url
            .join(&format!("projects/{project_id}/{path}"))
            .map_err(|e| PipeforgeError::Config(format!("Invalid project URL: {e}")))
    }

    /// Fetches the current state of a pipeline.
    ///
    /// # Errors
    ///
    /// Transport failures, non-success responses and undecodable bodies are
    /// all reported as [`PipeforgeError::Poll`].
    pub async fn fetch_pipeline(&self, project_id: u64, pipeline_id: u64) -> Result<GitLabPipeline> {
        let url = self.project_url(project_id, &format!("pipelines/{pipeline_id}"))?;
        self.get_json(url).await
    }

    pub async fn fetch_pipeline_jobs(
        &self,
        project_id: u64,
        pipeline_id: u64,
    ) -> Result<Vec<GitLabJob>> {
        let mut url = self.project_url(project_id, &format!("pipelines/{pipeline_id}/jobs"))?;
        url.query_pairs_mut().append_pair("per_page", JOBS_PER_PAGE);
        self.get_json(url).await
    }

    async fn get_json<T>(&self, url: Url) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        debug!("GET {url}");
        let response = self
            .auth_request(self.client.get(url.clone()))
            .send()
            .await
            .map_err(|e| PipeforgeError::Poll(format!("Request to {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(PipeforgeError::Poll(format!(
                "GitLab returned {status} for {url}: {body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| PipeforgeError::Poll(format!("Unexpected response from {url}: {e}")))
    }

    /// Downloads a single artifact file of a job.
    ///
    /// # Errors
    ///
    /// Any response other than 200 is [`PipeforgeError::ArtifactNotFound`].
    pub async fn download_artifact(
        &self,
        project_id: u64,
        job_id: u64,
        artifact_path: &str,
    ) -> Result<Vec<u8>> {
        let url = self.project_url(project_id, &format!("jobs/{job_id}/artifacts/{artifact_path}"))?;
        debug!("GET {url}");

        let response = self
            .auth_request(self.client.get(url.clone()))
            .send()
            .await
            .map_err(|e| PipeforgeError::Poll(format!("Request to {url} failed: {e}")))?;

        if response.status() != StatusCode::OK {
            return Err(PipeforgeError::ArtifactNotFound(format!(
                "{artifact_path} of job {job_id} ({})",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| PipeforgeError::Poll(format!("Failed to read artifact: {e}")))?;
        Ok(bytes.to_vec())
    }

    /// Starts a pipeline for `request.ref_` through the trigger API.
    ///
    /// # Errors
    ///
    /// Failures are reported as [`PipeforgeError::ExternalOperation`].
    pub async fn trigger_pipeline(
        &self,
        project_id: u64,
        request: &TriggerRequest<'_>,
    ) -> Result<TriggeredPipeline> {
        let url = self.project_url(project_id, "trigger/pipeline")?;
        info!("Triggering pipeline for ref {}", request.ref_);

        let response = self
            .client
            .post(url)
            .form(&request.form())
            .send()
            .await
            .map_err(|e| PipeforgeError::external("Pipeline trigger", e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PipeforgeError::external("Pipeline trigger", e.to_string()))?;
        debug!("Trigger response {status}: {body}");

        if !status.is_success() {
            return Err(PipeforgeError::external(
                "Pipeline trigger",
                format!("GitLab returned {status}: {body}"),
            ));
        }

        serde_json::from_str(&body).map_err(|e| {
            PipeforgeError::external("Pipeline trigger", format!("Unexpected response: {e}"))
        })
    }
}
