use std::fmt::Write;

use comfy_table::{Cell, Color as TableColor};

use crate::providers::{ResultSummary, Submission};
use crate::reports::{FileOutcome, FileSummary};

use super::styling::{bright, bright_red, bright_yellow, cyan, dim, styled_status};
use super::tables::{color_coded_failure_cell, create_table, header_cells};

/// Prints the result summary of a pipeline to stdout.
///
/// Finished pipelines get one table row per report file, with failure
/// counts in red and unparsable files flagged in the last column.
pub fn print_results(pipeline_id: u64, summary: &ResultSummary) {
    println!("{}", render_results(pipeline_id, summary));
}

/// Prints the branch and pipeline created by a submission to stdout.
pub fn print_submission(submission: &Submission) {
    println!("{}", render_submission(submission));
}

fn add_section_header(output: &mut String, emoji: &str, title: &str) {
    let _ = writeln!(output, "{} {}", bright(emoji), bright(title).underlined());
}

fn render_results(pipeline_id: u64, summary: &ResultSummary) -> String {
    let mut output = String::new();
    add_section_header(&mut output, "🧪", "Test Results");

    match summary {
        ResultSummary::Pending { pipeline_status } => {
            let _ = writeln!(
                output,
                "  {} {}\n  {} {}\n  {}",
                dim("Pipeline:"),
                cyan(pipeline_id),
                dim("Status:"),
                styled_status(*pipeline_status),
                dim("Results are not available yet; poll again later.")
            );
        }
        ResultSummary::Ready {
            pipeline_status,
            files,
            ..
        } => {
            let _ = writeln!(
                output,
                "  {} {}\n  {} {}\n",
                dim("Pipeline:"),
                cyan(pipeline_id),
                dim("Status:"),
                styled_status(*pipeline_status)
            );
            output.push_str(&render_file_table(files));
        }
        ResultSummary::Error { error } => {
            let _ = writeln!(
                output,
                "  {} {}\n  {} {}",
                dim("Pipeline:"),
                cyan(pipeline_id),
                dim("Error:"),
                bright_red(error)
            );
        }
    }

    output
}

fn render_file_table(files: &[FileSummary]) -> String {
    if files.is_empty() {
        return format!("  {}\n", dim("No report files found in the result bundle."));
    }

    let mut table = create_table();
    table.set_header(header_cells(&["File", "Tests", "Failures", "Notes"]));

    let (mut tests_total, mut failures_total) = (0_usize, 0_usize);
    for file in files {
        match &file.outcome {
            FileOutcome::Parsed { tests, failures } => {
                tests_total += *tests;
                failures_total += *failures;
                table.add_row(vec![
                    Cell::new(&file.file),
                    Cell::new(tests),
                    color_coded_failure_cell(*failures),
                    Cell::new(""),
                ]);
            }
            FileOutcome::Error { message } => {
                table.add_row(vec![
                    Cell::new(&file.file),
                    Cell::new("-"),
                    Cell::new("-"),
                    Cell::new(format!("Error parsing file: {message}")).fg(TableColor::Red),
                ]);
            }
        }
    }

    table.add_row(vec![
        Cell::new("Total").fg(TableColor::Cyan),
        Cell::new(tests_total),
        color_coded_failure_cell(failures_total),
        Cell::new(""),
    ]);

    format!("{table}\n")
}

fn render_submission(submission: &Submission) -> String {
    let mut output = String::new();
    add_section_header(&mut output, "🚀", "Pipeline Submitted");

    let _ = writeln!(
        output,
        "  {} {}\n  {} {}\n  {} {}",
        dim("Branch:"),
        cyan(&submission.branch),
        dim("Pipeline:"),
        cyan(submission.pipeline_id),
        dim("Status:"),
        bright_yellow(submission.status.as_deref().unwrap_or("unknown")),
    );
    if let Some(web_url) = &submission.web_url {
        let _ = writeln!(output, "  {} {}", dim("URL:"), cyan(web_url));
    }

    output
}
