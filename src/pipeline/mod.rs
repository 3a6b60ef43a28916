//! Pipeline composition: selection parsing, per-unit job synthesis and the
//! final merged pipeline document.

mod composer;
mod job;
mod resource_group;
mod script;
mod selection;
mod suites;
mod template;

pub use composer::{compose_pipeline, PipelineDocument, AGGREGATION_JOB_NAME};
pub use resource_group::DEFAULT_RESOURCE_GROUPS;
pub use selection::Selection;
pub use template::Templates;
