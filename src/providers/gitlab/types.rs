use serde::{Deserialize, Serialize};

/// Pipeline status as seen by the result poller.
///
/// GitLab reports more states than these; anything that is not running or
/// finished is treated as pending and re-polled by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum PipelineStatus {
    Pending,
    Running,
    Success,
    Failed,
}

impl PipelineStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

impl From<String> for PipelineStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "running" => Self::Running,
            "success" => Self::Success,
            "failed" => Self::Failed,
            _ => Self::Pending,
        }
    }
}

/// A pipeline as returned by `GET projects/:id/pipelines/:pipeline_id`.
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabPipeline {
    pub id: u64,
    pub status: PipelineStatus,
    /// Present on some GitLab deployments; otherwise fetched separately
    #[serde(default)]
    pub jobs: Vec<GitLabJob>,
}

/// A job record, only what is needed to locate its artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GitLabJob {
    pub id: u64,
    #[serde(default)]
    pub name: String,
}

/// Response of the pipeline trigger endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggeredPipeline {
    pub id: u64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub web_url: Option<String>,
}
