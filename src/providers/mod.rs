mod git;
mod gitlab;

pub use gitlab::{GitLabProvider, PipelineStatus, ResultSummary, SubmitRequest, Submission};
