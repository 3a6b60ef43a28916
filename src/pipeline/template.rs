use log::debug;
use serde_yaml::Mapping;
use std::path::Path;

use crate::config::PipelineConfig;
use crate::error::{PipeforgeError, Result};

const BUNDLED_BASE: &str = include_str!("../../templates/base_pipeline.yml");
const BUNDLED_JOB: &str = include_str!("../../templates/unit_job_template.yml");

/// Static skeletons the generated pipeline is built on.
#[derive(Debug, Clone)]
pub struct Templates {
    pub base: Mapping,
    pub job: Mapping,
}

impl Templates {
    /// Loads the configured skeletons, falling back to the bundled ones for
    /// any path that is not configured.
    ///
    /// # Errors
    ///
    /// A configured skeleton that cannot be read or is not a YAML mapping is a
    /// configuration error.
    pub fn load(config: &PipelineConfig) -> Result<Self> {
        let base = match &config.base_template {
            Some(path) => read_skeleton(path)?,
            None => parse_skeleton(BUNDLED_BASE, "bundled base pipeline")?,
        };
        let job = match &config.job_template {
            Some(path) => read_skeleton(path)?,
            None => parse_skeleton(BUNDLED_JOB, "bundled job template")?,
        };

        Ok(Self { base, job })
    }
}

fn read_skeleton(path: &Path) -> Result<Mapping> {
    debug!("Loading skeleton from {}", path.display());
    let contents = std::fs::read_to_string(path).map_err(|e| {
        PipeforgeError::Config(format!("Cannot read template {}: {e}", path.display()))
    })?;
    parse_skeleton(&contents, &path.display().to_string())
}

fn parse_skeleton(contents: &str, origin: &str) -> Result<Mapping> {
    // An empty document is an empty skeleton.
    if contents.trim().is_empty() {
        return Ok(Mapping::new());
    }

    serde_yaml::from_str(contents).map_err(|e| {
        PipeforgeError::Config(format!("Template {origin} is not a YAML mapping: {e}"))
    })
}
