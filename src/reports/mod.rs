//! Summaries of JUnit-style report files found in a result bundle.

mod bundle;
mod junit;

use log::{debug, warn};
use serde::Serialize;
use std::fmt::Write;
use std::path::Path;
use walkdir::WalkDir;

pub use bundle::ExtractedBundle;
use junit::{parse_report, ReportCounts, ReportParseError};

pub const REPORT_SUFFIX: &str = ".xml";
const SEPARATOR_WIDTH: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FileOutcome {
    Parsed { tests: usize, failures: usize },
    Error { message: String },
}

/// Summary of one report file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileSummary {
    /// Path relative to the scanned directory
    pub file: String,
    #[serde(flatten)]
    pub outcome: FileOutcome,
}

/// Summarizes every report file under `dir`, in path order.
///
/// Files that cannot be read or parsed are recorded as errors; the scan
/// always covers every remaining file.
pub fn summarize_directory(dir: &Path) -> Vec<FileSummary> {
    let mut summaries = Vec::new();

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable path while scanning reports: {e}");
                continue;
            }
        };

        let is_report = entry.file_type().is_file()
            && entry.file_name().to_string_lossy().ends_with(REPORT_SUFFIX);
        if !is_report {
            continue;
        }

        let file = entry
            .path()
            .strip_prefix(dir)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .replace('\\', "/");

        let outcome = match summarize_file(entry.path()) {
            Ok(counts) => FileOutcome::Parsed {
                tests: counts.tests,
                failures: counts.failures,
            },
            Err(e) => {
                debug!("Failed to parse {file}: {e}");
                FileOutcome::Error {
                    message: e.to_string(),
                }
            }
        };

        summaries.push(FileSummary { file, outcome });
    }

    summaries
}

fn summarize_file(path: &Path) -> Result<ReportCounts, ReportParseError> {
    let content = std::fs::read_to_string(path)?;
    parse_report(&content)
}

/// Renders summaries as the plain-text block returned to callers.
pub fn render_text(summaries: &[FileSummary]) -> String {
    let mut output = String::new();

    for summary in summaries {
        match &summary.outcome {
            FileOutcome::Parsed { tests, failures } => {
                let _ = writeln!(output, "File: {}", summary.file);
                let _ = writeln!(output, "Total tests: {tests}, Failures: {failures}");
                let _ = writeln!(output, "{}", "-".repeat(SEPARATOR_WIDTH));
            }
            FileOutcome::Error { message } => {
                let _ = writeln!(output, "Error parsing file: {} ({message})", summary.file);
            }
        }
    }

    output
}
