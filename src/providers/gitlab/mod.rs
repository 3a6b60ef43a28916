mod client;
mod links;
mod poller;
mod provider;
mod types;

pub use provider::{GitLabProvider, ResultSummary, SubmitRequest, Submission};
pub use types::PipelineStatus;
