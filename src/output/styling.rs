use console::{style, StyledObject};

use crate::providers::PipelineStatus;

/// Styling helpers for terminal output
pub fn bright_yellow(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).bright().yellow()
}

pub fn bright_green(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).bright().green()
}

pub fn bright_red(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).bright().red()
}

pub fn cyan(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).cyan()
}

pub fn dim(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).dim()
}

pub fn bright(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).bright()
}

pub fn magenta_bold(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).magenta().bold()
}

/// Green for success, red for failure, yellow while the pipeline runs.
pub fn styled_status(status: PipelineStatus) -> StyledObject<String> {
    match status {
        PipelineStatus::Success => bright_green(status.as_str()),
        PipelineStatus::Failed => bright_red(status.as_str()),
        PipelineStatus::Pending | PipelineStatus::Running => bright_yellow(status.as_str()),
    }
}
