use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::auth::Token;
use crate::error::PipeforgeError;
use crate::pipeline::DEFAULT_RESOURCE_GROUPS;

/// Configuration file structure for Pipeforge.
///
/// Values from the file are overlaid with the `GITLAB_*` environment
/// variables, then validated once before any command runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub gitlab: GitLabConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GitLabConfig {
    /// GitLab instance base URL
    #[serde(default = "default_gitlab_base_url")]
    pub base_url: String,

    /// Numeric project identifier used for trigger and status calls
    #[serde(default = "default_project_id")]
    pub project_id: u64,

    /// User embedded in the clone URL (`oauth2` for token auth)
    #[serde(default = "default_user")]
    pub user: String,

    /// HTTPS clone URL of the repository receiving generated pipelines
    pub repo_url: Option<String>,

    /// Personal/project access token for git and API reads
    pub access_token: Option<String>,

    /// Pipeline trigger token
    pub pipeline_token: Option<String>,

    /// Repository path the generated pipeline is committed to
    #[serde(default = "default_config_path")]
    pub config_path: String,

    /// Path of the report bundle inside the aggregation job's artifacts
    #[serde(default = "default_artifact_path")]
    pub artifact_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PipelineConfig {
    /// Number of resource groups jobs are spread across
    #[serde(default = "default_resource_groups")]
    pub resource_groups: usize,

    /// CI variable carrying the raw selection string
    #[serde(default = "default_selection_variable")]
    pub selection_variable: String,

    /// Static pipeline skeleton; the bundled one is used when unset
    pub base_template: Option<PathBuf>,

    /// Per-unit job skeleton; the bundled one is used when unset
    pub job_template: Option<PathBuf>,

    /// Image of the aggregation job
    #[serde(default = "default_rerun_image")]
    pub rerun_image: String,

    /// Stage of the aggregation job
    #[serde(default = "default_rerun_stage")]
    pub rerun_stage: String,
}

impl Default for GitLabConfig {
    fn default() -> Self {
        Self {
            base_url: default_gitlab_base_url(),
            project_id: default_project_id(),
            user: default_user(),
            repo_url: None,
            access_token: None,
            pipeline_token: None,
            config_path: default_config_path(),
            artifact_path: default_artifact_path(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            resource_groups: default_resource_groups(),
            selection_variable: default_selection_variable(),
            base_template: None,
            job_template: None,
            rerun_image: default_rerun_image(),
            rerun_stage: default_rerun_stage(),
        }
    }
}

fn default_gitlab_base_url() -> String {
    "https://gitlab.com".to_string()
}

fn default_project_id() -> u64 {
    427
}

fn default_user() -> String {
    "oauth2".to_string()
}

fn default_config_path() -> String {
    ".gitlab/generated-pipeline.yml".to_string()
}

fn default_artifact_path() -> String {
    "reports/test_results_bundle.zip".to_string()
}

fn default_resource_groups() -> usize {
    DEFAULT_RESOURCE_GROUPS
}

fn default_selection_variable() -> String {
    "SELECTED_GAMES".to_string()
}

fn default_rerun_image() -> String {
    "escuxezg0/pypipe-debian:latest".to_string()
}

fn default_rerun_stage() -> String {
    "rerun_failed".to_string()
}

/// Credentials and repository needed to submit a pipeline.
#[derive(Debug, Clone)]
pub struct SubmitSettings {
    pub access_token: Token,
    pub pipeline_token: Token,
    pub repo_url: String,
}

const CANDIDATES: [&str; 4] = [
    "pipeforge.toml",
    "pipeforge.json",
    "pipeforge.yaml",
    "pipeforge.yml",
];

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./pipeforge.{toml,json,yaml,yml}
    /// 3. `<user config dir>/pipeforge/config.toml`
    ///
    /// Returns default configuration if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        let user_config = dirs::config_dir().map(|dir| dir.join("pipeforge").join("config.toml"));

        match Self::discover(Path::new("."), user_config.as_deref()) {
            Some(path) => Self::load_from_path(&path),
            None => Ok(Self::default()),
        }
    }

    fn discover(dir: &Path, user_config: Option<&Path>) -> Option<PathBuf> {
        CANDIDATES
            .iter()
            .map(|candidate| dir.join(candidate))
            .chain(user_config.map(Path::to_path_buf))
            .find(|path| path.exists())
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => toml::from_str(&contents)
                .or_else(|_| serde_json::from_str(&contents))
                .or_else(|_| serde_yaml::from_str(&contents))
                .with_context(|| format!("Failed to parse config file: {}", path.display())),
        }
    }

    /// Overlays values from `GITLAB_*` variables resolved through `lookup`.
    ///
    /// Empty values are treated as unset.
    pub fn apply_env<F>(&mut self, lookup: F) -> crate::error::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(token) = var("GITLAB_ACCESS_TOKEN") {
            self.gitlab.access_token = Some(token);
        }
        if let Some(token) = var("GITLAB_PIPELINE_TOKEN") {
            self.gitlab.pipeline_token = Some(token);
        }
        if let Some(user) = var("GITLAB_USER") {
            self.gitlab.user = user;
        }
        if let Some(repo_url) = var("GITLAB_REPO_URL") {
            self.gitlab.repo_url = Some(repo_url);
        }
        if let Some(base_url) = var("GITLAB_URL") {
            self.gitlab.base_url = base_url;
        }
        if let Some(project_id) = var("GITLAB_PROJECT_ID") {
            self.gitlab.project_id = project_id.trim().parse().map_err(|_| {
                PipeforgeError::Config(format!(
                    "GITLAB_PROJECT_ID must be numeric, got '{project_id}'"
                ))
            })?;
        }

        Ok(())
    }

    /// Checks settings every command depends on.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.pipeline.resource_groups == 0 {
            return Err(PipeforgeError::Config(
                "resource-groups must be at least 1".into(),
            ));
        }
        if self.pipeline.selection_variable.is_empty() {
            return Err(PipeforgeError::Config(
                "selection-variable must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Settings required by `submit`, or an error naming every missing one.
    pub fn require_submit(&self) -> crate::error::Result<SubmitSettings> {
        let mut missing = Vec::new();
        if self.gitlab.access_token.is_none() {
            missing.push("GITLAB_ACCESS_TOKEN");
        }
        if self.gitlab.pipeline_token.is_none() {
            missing.push("GITLAB_PIPELINE_TOKEN");
        }
        if self.gitlab.repo_url.is_none() {
            missing.push("GITLAB_REPO_URL");
        }

        match (
            &self.gitlab.access_token,
            &self.gitlab.pipeline_token,
            &self.gitlab.repo_url,
        ) {
            (Some(access), Some(pipeline), Some(repo_url)) => Ok(SubmitSettings {
                access_token: Token::from(access.as_str()),
                pipeline_token: Token::from(pipeline.as_str()),
                repo_url: repo_url.clone(),
            }),
            _ => Err(PipeforgeError::Config(format!(
                "missing {}",
                missing.join(", ")
            ))),
        }
    }

    /// Access token required by `results`.
    pub fn require_results(&self) -> crate::error::Result<Token> {
        self.gitlab
            .access_token
            .as_deref()
            .map(Token::from)
            .ok_or_else(|| PipeforgeError::Config("missing GITLAB_ACCESS_TOKEN".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.gitlab.project_id, 427);
        assert_eq!(config.gitlab.user, "oauth2");
        assert_eq!(config.gitlab.config_path, ".gitlab/generated-pipeline.yml");
        assert_eq!(config.pipeline.resource_groups, 5);
        assert_eq!(config.pipeline.selection_variable, "SELECTED_GAMES");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_toml_config() {
        let mut temp_file = NamedTempFile::with_suffix(".toml").unwrap();
        let toml_content = r#"
[gitlab]
base-url = "https://gitlab.example.com"
project-id = 31
repo-url = "https://gitlab.example.com/qa/games.git"

[pipeline]
resource-groups = 3
job-template = "templates/job.yml"
"#;
        write!(temp_file, "{toml_content}").unwrap();

        let config = Config::load(Some(temp_file.path())).unwrap();
        assert_eq!(config.gitlab.base_url, "https://gitlab.example.com");
        assert_eq!(config.gitlab.project_id, 31);
        assert_eq!(config.gitlab.user, "oauth2");
        assert_eq!(config.pipeline.resource_groups, 3);
        assert_eq!(
            config.pipeline.job_template,
            Some(PathBuf::from("templates/job.yml"))
        );
        assert_eq!(config.pipeline.selection_variable, "SELECTED_GAMES");
    }

    #[test]
    fn test_load_yaml_config() {
        let mut temp_file = NamedTempFile::with_suffix(".yml").unwrap();
        write!(
            temp_file,
            "pipeline:\n  selection-variable: SELECTED_UNITS\n  rerun-stage: rerun\n"
        )
        .unwrap();

        let config = Config::load(Some(temp_file.path())).unwrap();
        assert_eq!(config.pipeline.selection_variable, "SELECTED_UNITS");
        assert_eq!(config.pipeline.rerun_stage, "rerun");
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        assert!(Config::load(Some(Path::new("does-not-exist.toml"))).is_err());
    }

    #[test]
    fn test_discover_prefers_local_candidates() {
        let temp_dir = tempfile::tempdir().unwrap();
        let user_config = temp_dir.path().join("user.toml");
        std::fs::write(&user_config, "").unwrap();

        assert_eq!(
            Config::discover(temp_dir.path(), Some(&user_config)),
            Some(user_config.clone())
        );

        let local = temp_dir.path().join("pipeforge.yaml");
        std::fs::write(&local, "").unwrap();
        assert_eq!(
            Config::discover(temp_dir.path(), Some(&user_config)),
            Some(local)
        );
    }

    #[test]
    fn test_discover_nothing() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert_eq!(Config::discover(temp_dir.path(), None), None);
    }

    #[test]
    fn test_apply_env_overrides_file_values() {
        let mut config = Config::default();
        config
            .apply_env(env(&[
                ("GITLAB_ACCESS_TOKEN", "glpat-access"),
                ("GITLAB_PIPELINE_TOKEN", "glptt-trigger"),
                ("GITLAB_REPO_URL", "https://gitlab.example.com/qa/games.git"),
                ("GITLAB_PROJECT_ID", "99"),
                ("GITLAB_USER", ""),
            ]))
            .unwrap();

        assert_eq!(config.gitlab.project_id, 99);
        assert_eq!(config.gitlab.user, "oauth2");

        let settings = config.require_submit().unwrap();
        assert_eq!(settings.access_token.as_str(), "glpat-access");
        assert_eq!(settings.pipeline_token.as_str(), "glptt-trigger");
        assert_eq!(settings.repo_url, "https://gitlab.example.com/qa/games.git");
    }

    #[test]
    fn test_apply_env_rejects_non_numeric_project_id() {
        let mut config = Config::default();
        let err = config
            .apply_env(env(&[("GITLAB_PROJECT_ID", "games")]))
            .unwrap_err();
        assert!(matches!(err, PipeforgeError::Config(_)));
    }

    #[test]
    fn test_require_submit_names_every_missing_variable() {
        let mut config = Config::default();
        config.gitlab.pipeline_token = Some("glptt".into());

        let err = config.require_submit().unwrap_err().to_string();
        assert!(err.contains("GITLAB_ACCESS_TOKEN"));
        assert!(err.contains("GITLAB_REPO_URL"));
        assert!(!err.contains("GITLAB_PIPELINE_TOKEN"));
    }

    #[test]
    fn test_require_results() {
        let mut config = Config::default();
        assert!(matches!(
            config.require_results(),
            Err(PipeforgeError::Config(_))
        ));

        config.gitlab.access_token = Some("glpat".into());
        assert_eq!(config.require_results().unwrap().as_str(), "glpat");
    }

    #[test]
    fn test_validate_rejects_zero_resource_groups() {
        let mut config = Config::default();
        config.pipeline.resource_groups = 0;
        assert!(matches!(config.validate(), Err(PipeforgeError::Config(_))));
    }
}
