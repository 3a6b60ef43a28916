use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::Config;
use crate::output::{print_results, print_submission, waiting_spinner};
use crate::pipeline::{compose_pipeline, Selection, Templates};
use crate::providers::{GitLabProvider, ResultSummary, SubmitRequest};

#[derive(Parser)]
#[command(name = "pipeforge")]
#[command(author, version, about = "CI Pipeline Generator", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./pipeforge.{toml,json,yaml,yml})
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compose a pipeline document from a selection
    Generate {
        #[arg(short, long, env = "SELECTED_GAMES")]
        selection: String,

        /// Write the document here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Commit a generated pipeline to a new branch and trigger it
    Submit {
        /// Full name of the requester, used in the branch name
        #[arg(short, long)]
        name: String,

        #[arg(short, long, env = "SELECTED_GAMES")]
        selection: String,

        /// Branch suffix (defaults to a timestamp)
        #[arg(short, long)]
        branch: Option<String>,

        #[arg(long, default_value_t = false)]
        json: bool,

        #[arg(short, long, default_value_t = false)]
        pretty: bool,
    },

    /// Fetch and summarize the test reports of a pipeline
    Results {
        pipeline_id: u64,

        #[arg(long, default_value_t = false)]
        json: bool,

        #[arg(short, long, default_value_t = false)]
        pretty: bool,

        /// Poll until the pipeline has finished
        #[arg(short, long, default_value_t = false)]
        watch: bool,

        /// Seconds between polls with --watch
        #[arg(short, long, default_value_t = 30)]
        interval: u64,
    },
}

impl Cli {
    fn load_config(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn execute_generate(config: &Config, selection: &str, output: Option<&Path>) -> Result<()> {
        let selection = Selection::parse(selection)?;
        let templates = Templates::load(&config.pipeline)?;
        let document = compose_pipeline(&selection, &templates, &config.pipeline)?;
        info!("Generated jobs: {}", document.unit_jobs().join(", "));

        if let Some(path) = output {
            document
                .write_to(path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        } else {
            print!("{}", document.to_yaml()?);
        }

        Ok(())
    }

    async fn execute_submit(
        config: &Config,
        name: &str,
        selection: &str,
        branch: Option<&str>,
        format: OutputFormat,
    ) -> Result<()> {
        let settings = config.require_submit()?;
        let selection = Selection::parse(selection)?;
        let templates = Templates::load(&config.pipeline)?;
        let document = compose_pipeline(&selection, &templates, &config.pipeline)?;

        let provider = GitLabProvider::new(
            config.gitlab.clone(),
            Some(settings.access_token.clone()),
        )?;
        let request = SubmitRequest {
            full_name: name,
            branch,
            selection: &selection,
            document: &document,
            selection_variable: &config.pipeline.selection_variable,
        };

        let submission = provider
            .submit(&settings, &request)
            .await
            .context("Pipeline submission failed")?;
        info!("Triggered pipeline {}", submission.pipeline_id);

        match format {
            OutputFormat::Table => print_submission(&submission),
            OutputFormat::Json { pretty } => println!("{}", to_json(&submission, pretty)?),
        }

        Ok(())
    }

    async fn execute_results(
        config: &Config,
        pipeline_id: u64,
        watch: bool,
        interval: u64,
        format: OutputFormat,
    ) -> Result<()> {
        let token = config.require_results()?;
        let provider = GitLabProvider::new(config.gitlab.clone(), Some(token))?;

        let summary = loop {
            let summary = provider.collect_results(pipeline_id).await;
            if !(watch && summary.is_pending()) {
                break summary;
            }

            let spinner = waiting_spinner(format!(
                "Pipeline {pipeline_id} is still running, checking again in {interval}s"
            ));
            tokio::time::sleep(Duration::from_secs(interval)).await;
            spinner.finish_and_clear();
        };

        match format {
            OutputFormat::Table => print_results(pipeline_id, &summary),
            OutputFormat::Json { pretty } => println!("{}", to_json(&summary, pretty)?),
        }

        if let ResultSummary::Error { error } = &summary {
            bail!("Results of pipeline {pipeline_id} are unavailable: {error}");
        }

        Ok(())
    }

    pub async fn execute(&self) -> Result<()> {
        let config = self.load_config()?;

        match &self.command {
            Commands::Generate { selection, output } => {
                Self::execute_generate(&config, selection, output.as_deref())
            }
            Commands::Submit {
                name,
                selection,
                branch,
                json,
                pretty,
            } => {
                let format = OutputFormat::new(*json, *pretty);
                Self::execute_submit(&config, name, selection, branch.as_deref(), format).await
            }
            Commands::Results {
                pipeline_id,
                json,
                pretty,
                watch,
                interval,
            } => {
                let format = OutputFormat::new(*json, *pretty);
                Self::execute_results(&config, *pipeline_id, *watch, *interval, format).await
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Table,
    Json { pretty: bool },
}

impl OutputFormat {
    /// `--pretty` alone implies JSON output.
    fn new(json: bool, pretty: bool) -> Self {
        if json || pretty {
            Self::Json { pretty }
        } else {
            Self::Table
        }
    }
}

fn to_json<T: Serialize>(value: &T, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(json)
}
