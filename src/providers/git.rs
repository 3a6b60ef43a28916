use chrono::{DateTime, TimeZone};
use log::{debug, info};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::process::Command;
use url::Url;

use crate::auth::Token;
use crate::error::{PipeforgeError, Result};

const BOT_NAME: &str = "Pipeline Bot";
const BOT_EMAIL: &str = "pipeline-bot@example.com";

/// A fresh clone of the target repository in a private temporary directory.
///
/// Every git command runs with the clone as its working directory; the
/// process working directory is never changed. The clone is deleted when
/// the workspace is dropped, whether or not the submission succeeded.
pub struct GitWorkspace {
    dir: TempDir,
    repo: PathBuf,
    secret: Token,
}

impl GitWorkspace {
    pub async fn clone_repo(repo_url: &str, user: &str, token: &Token) -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("pipeforge-").tempdir()?;
        let repo = dir.path().join("repo");
        let url = authenticated_url(repo_url, user, token)?;

        info!("Cloning {repo_url}");
        let workspace = Self {
            dir,
            repo,
            secret: token.clone(),
        };

        let target = workspace.repo.to_string_lossy().to_string();
        workspace
            .run(workspace.dir.path(), "git clone", &["clone", &url, &target])
            .await?;

        Ok(workspace)
    }

    pub fn path(&self) -> &Path {
        &self.repo
    }

    pub async fn checkout_new_branch(&self, branch: &str) -> Result<()> {
        self.git("git checkout", &["checkout", "-b", branch]).await
    }

    /// Stages `file` (relative to the clone) and commits it as the bot user.
    pub async fn commit(&self, file: &str, message: &str) -> Result<()> {
        self.git("git config", &["config", "user.name", BOT_NAME]).await?;
        self.git("git config", &["config", "user.email", BOT_EMAIL]).await?;
        self.git("git add", &["add", file]).await?;
        self.git("git commit", &["commit", "-m", message]).await
    }

    pub async fn push(&self, branch: &str) -> Result<()> {
        self.git("git push", &["push", "-u", "origin", branch]).await
    }

    async fn git(&self, operation: &str, args: &[&str]) -> Result<()> {
        self.run(&self.repo, operation, args).await
    }

    async fn run(&self, cwd: &Path, operation: &str, args: &[&str]) -> Result<()> {
        debug!("{operation} in {}", cwd.display());

        let output = Command::new("git")
            .args(args)
            .current_dir(cwd)
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()
            .await
            .map_err(|e| PipeforgeError::external(operation, format!("cannot run git: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PipeforgeError::external(
                operation,
                redact(stderr.trim(), &self.secret),
            ));
        }

        Ok(())
    }
}

/// Clone URL with `user` and `token` embedded as credentials.
pub fn authenticated_url(repo_url: &str, user: &str, token: &Token) -> Result<String> {
    let mut url = Url::parse(repo_url)
        .map_err(|e| PipeforgeError::Config(format!("Invalid repository URL '{repo_url}': {e}")))?;

    url.set_username(user)
        .and_then(|()| url.set_password(Some(token.as_str())))
        .map_err(|()| {
            PipeforgeError::Config(format!("Repository URL '{repo_url}' cannot carry credentials"))
        })?;

    Ok(url.to_string())
}

fn redact(text: &str, token: &Token) -> String {
    if token.as_str().is_empty() {
        return text.to_string();
    }
    text.replace(token.as_str(), "***")
}

/// Branch receiving the generated pipeline: `pipeline/<name>/<branch>`.
///
/// The name is lowercased with spaces replaced by underscores. Without an
/// explicit branch a timestamped `generated-...` name keeps concurrent
/// submissions apart.
pub fn branch_path<Tz>(full_name: &str, branch: Option<&str>, now: DateTime<Tz>) -> Result<String>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let full_name = full_name.trim();
    if full_name.is_empty() {
        return Err(PipeforgeError::Validation("Full name is required.".into()));
    }
    let sanitized = full_name.replace(' ', "_").to_lowercase();

    let branch = match branch.map(str::trim).filter(|b| !b.is_empty()) {
        Some(branch) => branch.to_string(),
        None => format!("generated-{}", now.format("%Y-%m-%d-%H-%M-%S")),
    };

    Ok(format!("pipeline/{sanitized}/{branch}"))
}
