use log::{debug, info};

use super::client::GitLabClient;
use super::types::{GitLabJob, PipelineStatus};
use crate::error::{PipeforgeError, Result};
use crate::pipeline::AGGREGATION_JOB_NAME;

/// Result of a single poll.
#[derive(Debug)]
pub enum PollOutcome {
    /// Not finished yet; poll again later.
    Pending(PipelineStatus),
    /// Finished (successfully or not) and the report bundle was fetched.
    Finished {
        status: PipelineStatus,
        bundle: Vec<u8>,
    },
}

/// Queries a pipeline once and, when it has finished, fetches its report
/// bundle.
///
/// Nothing is retried: a failed status query is an error, and the artifact
/// is requested exactly once per terminal observation.
pub struct ResultPoller<'a> {
    client: &'a GitLabClient,
    project_id: u64,
    artifact_path: &'a str,
}

impl<'a> ResultPoller<'a> {
    pub fn new(client: &'a GitLabClient, project_id: u64, artifact_path: &'a str) -> Self {
        Self {
            client,
            project_id,
            artifact_path,
        }
    }

    pub async fn poll(&self, pipeline_id: u64) -> Result<PollOutcome> {
        let pipeline = self.client.fetch_pipeline(self.project_id, pipeline_id).await?;
        debug!("Pipeline {pipeline_id} is {:?}", pipeline.status);

        if !pipeline.status.is_terminal() {
            return Ok(PollOutcome::Pending(pipeline.status));
        }

        let jobs = if pipeline.jobs.is_empty() {
            self.client
                .fetch_pipeline_jobs(self.project_id, pipeline_id)
                .await?
        } else {
            pipeline.jobs
        };

        let job = select_artifact_job(&jobs).ok_or_else(|| {
            PipeforgeError::ArtifactNotFound(format!("pipeline {pipeline_id} has no jobs"))
        })?;
        info!(
            "Pipeline {pipeline_id} finished, fetching {} from job {} ({})",
            self.artifact_path, job.id, job.name
        );

        let bundle = self
            .client
            .download_artifact(self.project_id, job.id, self.artifact_path)
            .await?;

        Ok(PollOutcome::Finished {
            status: pipeline.status,
            bundle,
        })
    }
}

/// The aggregation job holds the bundle; fall back to the first job.
fn select_artifact_job(jobs: &[GitLabJob]) -> Option<&GitLabJob> {
    jobs.iter()
        .find(|job| job.name == AGGREGATION_JOB_NAME)
        .or_else(|| jobs.first())
}
