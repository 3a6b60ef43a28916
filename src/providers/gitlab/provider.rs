use chrono::Local;
use log::{info, warn};
use serde::Serialize;

use crate::auth::Token;
use crate::config::{GitLabConfig, SubmitSettings};
use crate::error::Result;
use crate::output::PhaseProgress;
use crate::pipeline::{PipelineDocument, Selection};
use crate::providers::git::{branch_path, GitWorkspace};
use crate::reports::{render_text, summarize_directory, ExtractedBundle, FileSummary};

use super::client::{GitLabClient, TriggerRequest};
use super::links::pipeline_web_url;
use super::poller::{PollOutcome, ResultPoller};
use super::types::PipelineStatus;

/// Result of one `results` request.
///
/// Failures to query the pipeline or to fetch its bundle become
/// [`ResultSummary::Error`]; the caller decides whether to poll again.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ResultSummary {
    Pending {
        pipeline_status: PipelineStatus,
    },
    Ready {
        pipeline_status: PipelineStatus,
        summary: String,
        files: Vec<FileSummary>,
    },
    Error {
        error: String,
    },
}

impl ResultSummary {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }
}

/// Everything a submission needs besides credentials.
pub struct SubmitRequest<'a> {
    pub full_name: &'a str,
    pub branch: Option<&'a str>,
    pub selection: &'a Selection,
    pub document: &'a PipelineDocument,
    pub selection_variable: &'a str,
}

/// Outcome of a successful submission.
#[derive(Debug, Serialize)]
pub struct Submission {
    pub branch: String,
    pub pipeline_id: u64,
    pub status: Option<String>,
    pub web_url: Option<String>,
}

/// GitLab side of pipeforge: submits generated pipelines and collects
/// their results.
pub struct GitLabProvider {
    client: GitLabClient,
    config: GitLabConfig,
}

impl GitLabProvider {
    /// # Errors
    ///
    /// Returns an error if the API base URL is invalid.
    pub fn new(config: GitLabConfig, token: Option<Token>) -> Result<Self> {
        let client = GitLabClient::new(&config.base_url, token)?;
        Ok(Self { client, config })
    }

    /// Polls a pipeline once and, when it has finished, summarizes the
    /// reports in its result bundle.
    pub async fn collect_results(&self, pipeline_id: u64) -> ResultSummary {
        match self.try_collect_results(pipeline_id).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!("Collecting results of pipeline {pipeline_id} failed: {e}");
                ResultSummary::Error {
                    error: e.to_string(),
                }
            }
        }
    }

    async fn try_collect_results(&self, pipeline_id: u64) -> Result<ResultSummary> {
        let poller = ResultPoller::new(
            &self.client,
            self.config.project_id,
            &self.config.artifact_path,
        );

        let (status, bundle) = match poller.poll(pipeline_id).await? {
            PollOutcome::Pending(status) => {
                return Ok(ResultSummary::Pending {
                    pipeline_status: status,
                })
            }
            PollOutcome::Finished { status, bundle } => (status, bundle),
        };

        let extracted = ExtractedBundle::extract(&bundle)?;
        let files = summarize_directory(extracted.path());
        info!(
            "Summarized {} report files from {} bundle entries of pipeline {pipeline_id}",
            files.len(),
            extracted.entries()
        );

        Ok(ResultSummary::Ready {
            pipeline_status: status,
            summary: render_text(&files),
            files,
        })
    }

    /// Commits `request.document` to a fresh branch and triggers it.
    ///
    /// Progress is displayed in four phases: clone, commit, push and
    /// trigger. Any failure aborts the remaining phases, so nothing is
    /// pushed or triggered after an error. The clone is removed on return.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty name and an external
    /// operation error when git or the trigger call fails.
    pub async fn submit(
        &self,
        settings: &SubmitSettings,
        request: &SubmitRequest<'_>,
    ) -> Result<Submission> {
        let branch = branch_path(request.full_name, request.branch, Local::now())?;
        info!("Submitting pipeline on branch {branch}");

        let progress = PhaseProgress::start_clone();
        let workspace = GitWorkspace::clone_repo(
            &settings.repo_url,
            &self.config.user,
            &settings.access_token,
        )
        .await?;
        workspace.checkout_new_branch(&branch).await?;

        let progress = progress.finish_clone_start_commit();
        request
            .document
            .write_to(&workspace.path().join(&self.config.config_path))?;
        workspace
            .commit(
                &self.config.config_path,
                &format!("Generated pipeline for {}", request.selection.raw()),
            )
            .await?;

        let progress = progress.finish_commit_start_push();
        workspace.push(&branch).await?;

        let progress = progress.finish_push_start_trigger();
        let trigger = TriggerRequest {
            ref_: &branch,
            token: &settings.pipeline_token,
            config_path: &self.config.config_path,
            variables: vec![(request.selection_variable, request.selection.raw())],
        };
        let pipeline = self
            .client
            .trigger_pipeline(self.config.project_id, &trigger)
            .await?;
        progress.finish_trigger();

        let web_url = pipeline
            .web_url
            .or_else(|| pipeline_web_url(&settings.repo_url, pipeline.id));

        Ok(Submission {
            branch,
            pipeline_id: pipeline.id,
            status: pipeline.status,
            web_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipeforgeError;
    use crate::test_support::zip_bytes;

    const REPORT: &str = r#"<testsuite name="alpha">
  <testcase name="a"/>
  <testcase name="b"><failure message="boom"/></testcase>
</testsuite>"#;

    fn provider(server: &mockito::Server) -> GitLabProvider {
        let config = GitLabConfig {
            base_url: server.url(),
            ..GitLabConfig::default()
        };
        GitLabProvider::new(config, Some(Token::from("glpat-test"))).unwrap()
    }

    async fn mock_pipeline(server: &mut mockito::Server, id: u64, body: &str) {
        server
            .mock("GET", format!("/api/v4/projects/427/pipelines/{id}").as_str())
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;
    }

    #[tokio::test]
    async fn test_collect_results_ready() {
        let mut server = mockito::Server::new_async().await;
        mock_pipeline(
            &mut server,
            9,
            r#"{"id": 9, "status": "failed", "jobs": [{"id": 90, "name": "rerun_failed_tests"}]}"#,
        )
        .await;
        server
            .mock(
                "GET",
                "/api/v4/projects/427/jobs/90/artifacts/reports/test_results_bundle.zip",
            )
            .with_status(200)
            .with_body(zip_bytes(&[
                ("reports/results_alpha.xml", REPORT),
                ("reports/results_beta.xml", "<testsuite>"),
                ("reports/notes.txt", "ignored"),
            ]))
            .create_async()
            .await;

        let summary = provider(&server).collect_results(9).await;

        match summary {
            ResultSummary::Ready {
                pipeline_status,
                summary,
                files,
            } => {
                assert_eq!(pipeline_status, PipelineStatus::Failed);
                assert_eq!(files.len(), 2);
                assert!(summary.contains("File: reports/results_alpha.xml"));
                assert!(summary.contains("Total tests: 2, Failures: 1"));
                assert!(summary.contains("Error parsing file: reports/results_beta.xml"));
            }
            other => panic!("expected ready summary, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_collect_results_pending() {
        let mut server = mockito::Server::new_async().await;
        mock_pipeline(&mut server, 10, r#"{"id": 10, "status": "running"}"#).await;

        let summary = provider(&server).collect_results(10).await;
        assert!(summary.is_pending());

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["status"], "pending");
        assert_eq!(json["pipeline_status"], "running");
    }

    #[tokio::test]
    async fn test_collect_results_query_failure_is_error_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v4/projects/427/pipelines/11")
            .with_status(500)
            .create_async()
            .await;

        let summary = provider(&server).collect_results(11).await;
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["status"], "error");
        assert!(json["error"].as_str().unwrap().contains("500"));
    }

    #[tokio::test]
    async fn test_collect_results_missing_artifact_is_error_status() {
        let mut server = mockito::Server::new_async().await;
        mock_pipeline(
            &mut server,
            12,
            r#"{"id": 12, "status": "success", "jobs": [{"id": 120, "name": "test_alpha"}]}"#,
        )
        .await;
        server
            .mock(
                "GET",
                "/api/v4/projects/427/jobs/120/artifacts/reports/test_results_bundle.zip",
            )
            .with_status(404)
            .create_async()
            .await;

        match provider(&server).collect_results(12).await {
            ResultSummary::Error { error } => assert!(error.contains("Artifacts not found")),
            other => panic!("expected error summary, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_submit_rejects_empty_name_before_cloning() {
        let server = mockito::Server::new_async().await;
        let selection = Selection::parse("alpha").unwrap();
        let templates = crate::pipeline::Templates::load(&Default::default()).unwrap();
        let document =
            crate::pipeline::compose_pipeline(&selection, &templates, &Default::default())
                .unwrap();

        let settings = SubmitSettings {
            access_token: Token::from("glpat-test"),
            pipeline_token: Token::from("glptt-test"),
            repo_url: "https://gitlab.invalid/qa/games.git".to_string(),
        };
        let request = SubmitRequest {
            full_name: " ",
            branch: None,
            selection: &selection,
            document: &document,
            selection_variable: "SELECTED_GAMES",
        };

        let err = provider(&server)
            .submit(&settings, &request)
            .await
            .unwrap_err();
        assert!(matches!(err, PipeforgeError::Validation(_)));
    }
}
