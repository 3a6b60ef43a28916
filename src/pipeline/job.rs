use log::{debug, warn};
use serde::Serialize;
use serde_yaml::{Mapping, Value};

use super::resource_group::assign_resource_group;
use super::script::{report_path, unit_script};
use super::suites::lookup;
use crate::config::PipelineConfig;
use crate::error::Result;

/// Trigger policy of a gating rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum When {
    Always,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rule {
    #[serde(rename = "if", skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    pub when: When,
}

impl Rule {
    pub fn always() -> Self {
        Self {
            condition: None,
            when: When::Always,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifacts {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub untracked: Option<bool>,
    pub paths: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub when: Option<When>,
}

/// A generated per-unit test job.
///
/// Only the unit-specific fields are held here; everything else comes from
/// the job skeleton when the job is rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobDefinition {
    #[serde(skip)]
    pub name: String,
    pub resource_group: String,
    pub script: Vec<String>,
    pub rules: Vec<Rule>,
    pub artifacts: Artifacts,
}

impl JobDefinition {
    /// Overlays the unit-specific fields onto `skeleton`; on a key clash the
    /// unit field wins.
    pub fn render(&self, skeleton: &Mapping) -> Result<Value> {
        let mut job = skeleton.clone();
        if let Value::Mapping(fields) = serde_yaml::to_value(self)? {
            for (key, value) in fields {
                job.insert(key, value);
            }
        }
        Ok(Value::Mapping(job))
    }
}

pub fn job_name(unit: &str) -> String {
    format!("test_{unit}")
}

/// Gating condition that holds when `unit` is mentioned in the raw
/// selection variable, with or without suites.
pub fn selection_condition(unit: &str, selection_variable: &str) -> String {
    let pattern = unit.replace('.', r"\.");
    format!("${selection_variable} =~ /(^|,)\\s*{pattern}(:|,|$)/")
}

/// Builds the job for the unit at `index` in selection order.
pub fn compose_job(
    unit: &str,
    index: usize,
    suites: &[String],
    config: &PipelineConfig,
) -> JobDefinition {
    let name = job_name(unit);
    let resource_group = assign_resource_group(index, config.resource_groups);
    debug!("Composing {name} in {resource_group} with suites {suites:?}");
    for token in suites.iter().filter(|token| lookup(token).is_none()) {
        warn!("Unknown suite '{token}' selected for {unit}; {name} will fail when it reaches it");
    }

    JobDefinition {
        script: unit_script(unit, &config.selection_variable),
        rules: vec![Rule {
            condition: Some(selection_condition(unit, &config.selection_variable)),
            when: When::Always,
        }],
        artifacts: Artifacts {
            untracked: Some(true),
            paths: vec![report_path(unit)],
            when: None,
        },
        name,
        resource_group,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skeleton() -> Mapping {
        serde_yaml::from_str(
            r"
stage: test
image: python:3.12
resource_group: from_skeleton
before_script:
  - pip install -r requirements.txt
",
        )
        .unwrap()
    }

    #[test]
    fn test_compose_job_fields() {
        let config = PipelineConfig::default();
        let job = compose_job("alpha", 0, &["sanity".to_string()], &config);

        assert_eq!(job.name, "test_alpha");
        assert_eq!(job.resource_group, "group_1");
        assert_eq!(job.artifacts.paths, vec!["reports/results_alpha.xml"]);
        assert_eq!(job.artifacts.untracked, Some(true));
        assert_eq!(
            job.rules[0].condition.as_deref(),
            Some("$SELECTED_GAMES =~ /(^|,)\\s*alpha(:|,|$)/")
        );
        assert_eq!(job.rules[0].when, When::Always);
    }

    #[test]
    fn test_resource_group_follows_index_not_suites() {
        let config = PipelineConfig::default();
        let a = compose_job("alpha", 6, &[], &config);
        let b = compose_job("alpha", 6, &["smoke".to_string(), "all".to_string()], &config);
        assert_eq!(a.resource_group, "group_2");
        assert_eq!(a.resource_group, b.resource_group);
    }

    #[test]
    fn test_render_overlays_unit_fields_on_skeleton() {
        let config = PipelineConfig::default();
        let job = compose_job("alpha", 2, &[], &config);
        let rendered = job.render(&skeleton()).unwrap();

        assert_eq!(rendered["stage"], Value::from("test"));
        assert_eq!(rendered["image"], Value::from("python:3.12"));
        assert_eq!(rendered["resource_group"], Value::from("group_3"));
        assert_eq!(rendered["rules"][0]["when"], Value::from("always"));
        assert_eq!(rendered["artifacts"]["untracked"], Value::from(true));
        assert!(rendered["artifacts"].get("when").is_none());
        assert!(rendered.get("name").is_none());
    }

    #[test]
    fn test_selection_condition_escapes_dots() {
        assert_eq!(
            selection_condition("v1.2", "UNITS"),
            "$UNITS =~ /(^|,)\\s*v1\\.2(:|,|$)/"
        );
    }
}
