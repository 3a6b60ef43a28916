//! Renders unit job scripts for a bash executor.
//!
//! The job re-derives its own suites from the raw selection variable at run
//! time; [`super::selection::unit_section`] is the in-process equivalent of
//! the discovery lines rendered here.

use super::suites;

pub const REPORT_DIR: &str = "reports";
pub const UNKNOWN_SUITE_DIAGNOSTIC: &str = "Unknown suite:";

pub fn report_path(unit: &str) -> String {
    format!("{REPORT_DIR}/results_{unit}.xml")
}

/// Wraps `value` in single quotes for bash.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Full script for one unit job.
pub fn unit_script(unit: &str, selection_variable: &str) -> Vec<String> {
    let mut script = vec![format!("echo \"Running {unit} tests\"")];
    script.extend(discovery_lines(unit, selection_variable));
    script.push("TEST_CMDS=()".to_string());
    script.push(suite_loop(unit));
    script.push("echo \"Running commands:\"".to_string());
    script.push(execution_loop(unit));
    script
}

/// Lines that extract this unit's suites from the raw selection variable
/// into the `UNIT_SUITES` array and exit successfully when there are none.
///
/// Tokens are split on `:` and whitespace without any quote processing, so
/// every token reaches the suite dispatch verbatim.
pub fn discovery_lines(unit: &str, selection_variable: &str) -> Vec<String> {
    let pattern = unit.replace('.', r"\.");
    vec![
        format!(
            "UNIT_SECTION=$(printf '%s\\n' \"${selection_variable}\" | tr ',' '\\n' | sed -nE 's/^[[:space:]]*{pattern}:(.*)$/\\1/p' | tr '\\n:' '  ')"
        ),
        "read -ra UNIT_SUITES <<< \"$UNIT_SECTION\"".to_string(),
        format!(
            "if [ \"${{#UNIT_SUITES[@]}}\" -eq 0 ]; then echo \"No {unit} tests selected.\"; exit 0; fi"
        ),
    ]
}

/// The `case` dispatch over the unit's suites, as a single script element.
///
/// Every entry of the suite table gets an arm. Any other token prints a
/// diagnostic and fails the job.
fn suite_loop(unit: &str) -> String {
    let mut block =
        String::from("for SUITE in \"${UNIT_SUITES[@]}\"; do\n  case \"$SUITE\" in\n");

    for entry in suites::SUITES {
        block.push_str(&format!("    {})\n", shell_quote(entry.token)));
        for command in entry.commands {
            let command = shell_quote(&command.render(unit));
            block.push_str(&format!("      TEST_CMDS+=({command})\n"));
        }
        block.push_str("      ;;\n");
    }

    block.push_str("    *)\n");
    block.push_str(&format!(
        "      echo \"{UNKNOWN_SUITE_DIAGNOSTIC} $SUITE\"\n"
    ));
    block.push_str("      exit 1\n");
    block.push_str("      ;;\n");
    block.push_str("  esac\ndone");
    block
}

/// Echoes and runs every queued command; a failing command does not stop
/// the ones after it.
fn execution_loop(unit: &str) -> String {
    let report = report_path(unit);
    format!(
        "for CMD in \"${{TEST_CMDS[@]}}\"; do\n  echo \"$CMD\"\n  eval \"$CMD --junitxml={report} || true\"\ndone"
    )
}
