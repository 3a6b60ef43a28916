use log::{debug, info};
use serde::Serialize;
use serde_yaml::{Mapping, Value};
use std::path::Path;

use super::job::{compose_job, Artifacts, Rule, When};
use super::script::REPORT_DIR;
use super::selection::{unit_section, Selection};
use super::template::Templates;
use crate::config::PipelineConfig;
use crate::error::{PipeforgeError, Result};

pub const AGGREGATION_JOB_NAME: &str = "rerun_failed_tests";
pub const RERUN_REPORT: &str = "reports/rerun_results.xml";
pub const REPORT_BUNDLE: &str = "reports/test_results_bundle.zip";
const COMBINED_REPORT: &str = "combined_reports/all_results.xml";

/// Collects every unit report, re-runs the failed test cases once and
/// bundles all reports.
#[derive(Debug, Clone, Serialize)]
struct AggregationJob {
    stage: String,
    image: String,
    script: Vec<String>,
    dependencies: Vec<String>,
    artifacts: Artifacts,
    rules: Vec<Rule>,
}

impl AggregationJob {
    fn new(config: &PipelineConfig, dependencies: Vec<String>) -> Self {
        Self {
            stage: config.rerun_stage.clone(),
            image: config.rerun_image.clone(),
            script: aggregation_script(),
            dependencies,
            artifacts: Artifacts {
                untracked: None,
                paths: vec![RERUN_REPORT.to_string(), REPORT_BUNDLE.to_string()],
                when: Some(When::Always),
            },
            rules: vec![Rule::always()],
        }
    }
}

fn aggregation_script() -> Vec<String> {
    vec![
        format!("mkdir -p combined_reports {REPORT_DIR}"),
        format!(
            "{{ echo '<testsuites>'; cat {REPORT_DIR}/results_*.xml 2>/dev/null | sed '/<?xml/d'; echo '</testsuites>'; }} > {COMBINED_REPORT}"
        ),
        format!(
            "FAILED_TESTS=$(xmllint --xpath '//testcase[./failure]/@name' {COMBINED_REPORT} 2>/dev/null | sed -E 's/ *name=\"([^\"]+)\"/\\1\\n/g' | sort -u | xargs)"
        ),
        "echo \"Detected failed tests: $FAILED_TESTS\"".to_string(),
        format!(
            "if [ -n \"$FAILED_TESTS\" ]; then\n  pytest -k \"$(echo $FAILED_TESTS | sed 's/ / or /g')\" --junitxml={RERUN_REPORT} || true\nelse\n  echo \"No failed tests to re-run.\"\n  touch {RERUN_REPORT}\nfi"
        ),
        format!("zip -r {REPORT_BUNDLE} {REPORT_DIR}/*.xml || true"),
    ]
}

/// The complete generated pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineDocument {
    root: Mapping,
    unit_jobs: Vec<String>,
}

impl PipelineDocument {
    /// Names of the generated unit jobs, in generation order.
    pub fn unit_jobs(&self) -> &[String] {
        &self.unit_jobs
    }

    #[cfg(test)]
    pub fn job(&self, name: &str) -> Option<&Value> {
        self.root.get(name)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.root)?)
    }

    /// Writes the document, creating parent directories as needed.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_yaml()?)?;
        info!("Pipeline written to: {}", path.display());
        Ok(())
    }
}

/// Merges the base skeleton with one job per selected unit and the
/// aggregation job.
///
/// Top-level keys of the skeleton come first. A generated job replaces a
/// skeleton entry of the same name entirely. The aggregation job depends on
/// every unit job, in selection order.
pub fn compose_pipeline(
    selection: &Selection,
    templates: &Templates,
    config: &PipelineConfig,
) -> Result<PipelineDocument> {
    if selection.is_empty() {
        return Err(PipeforgeError::Validation("No units selected.".into()));
    }

    let mut root = templates.base.clone();
    let mut unit_jobs = Vec::with_capacity(selection.len());

    for (index, (unit, _)) in selection.iter().enumerate() {
        // The job sees only the raw selection at run time, so its suites are
        // resolved the same way here.
        let suites = unit_section(selection.raw(), unit).unwrap_or_default();
        let job = compose_job(unit, index, &suites, config);
        root.insert(Value::from(job.name.as_str()), job.render(&templates.job)?);
        unit_jobs.push(job.name);
    }

    let aggregation = AggregationJob::new(config, unit_jobs.clone());
    root.insert(
        Value::from(AGGREGATION_JOB_NAME),
        serde_yaml::to_value(&aggregation)?,
    );

    debug!("Composed jobs: {unit_jobs:?}");
    info!("Composed pipeline with {} unit jobs", unit_jobs.len());

    Ok(PipelineDocument { root, unit_jobs })
}
