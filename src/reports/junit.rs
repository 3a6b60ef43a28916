use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Serialize;
use thiserror::Error;

const TEST_SUITES: &[u8] = b"testsuites";
const TEST_SUITE: &[u8] = b"testsuite";
const TEST_CASE: &[u8] = b"testcase";
const FAILURE: &[u8] = b"failure";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportCounts {
    pub tests: usize,
    pub failures: usize,
}

/// Why a single report file could not be summarized.
#[derive(Debug, Error)]
pub enum ReportParseError {
    #[error("cannot read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("no root element found")]
    NoRoot,

    #[error("unclosed element at end of document")]
    Unclosed,

    #[error("content after the root element")]
    TrailingContent,
}

/// Counts test cases and failures in a JUnit-style report.
///
/// `tests` counts `testcase` elements that are direct children of the root
/// element, or of a `testsuite` directly below a `testsuites` root (the
/// layout pytest writes). `failures` counts every `failure` element below
/// the root at any depth, so a test case carrying two failure markers
/// contributes two.
pub fn parse_report(content: &str) -> Result<ReportCounts, ReportParseError> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut counts = ReportCounts {
        tests: 0,
        failures: 0,
    };
    let mut open: Vec<Vec<u8>> = Vec::new();
    let mut root_seen = false;

    loop {
        match reader.read_event()? {
            Event::Start(element) => {
                let name = element.local_name().as_ref().to_vec();
                visit(&name, &open, &mut root_seen, &mut counts)?;
                open.push(name);
            }
            Event::Empty(element) => {
                visit(element.local_name().as_ref(), &open, &mut root_seen, &mut counts)?;
            }
            Event::End(_) => {
                open.pop();
            }
            Event::Text(_) | Event::CData(_) if open.is_empty() => {
                return Err(ReportParseError::TrailingContent);
            }
            Event::Decl(_) if root_seen => return Err(ReportParseError::TrailingContent),
            Event::Eof => break,
            _ => {}
        }
    }

    if !root_seen {
        return Err(ReportParseError::NoRoot);
    }
    if !open.is_empty() {
        return Err(ReportParseError::Unclosed);
    }

    Ok(counts)
}

/// `open` holds the names of the enclosing elements, root first.
fn visit(
    name: &[u8],
    open: &[Vec<u8>],
    root_seen: &mut bool,
    counts: &mut ReportCounts,
) -> Result<(), ReportParseError> {
    if open.is_empty() {
        if *root_seen {
            return Err(ReportParseError::TrailingContent);
        }
        *root_seen = true;
        return Ok(());
    }

    if name == TEST_CASE && is_case_container(open) {
        counts.tests += 1;
    }
    if name == FAILURE {
        counts.failures += 1;
    }
    Ok(())
}

fn is_case_container(open: &[Vec<u8>]) -> bool {
    match open {
        [_root] => true,
        [root, suite] => root.as_slice() == TEST_SUITES && suite.as_slice() == TEST_SUITE,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suite(cases: usize, failing: usize) -> String {
        let mut xml = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<testsuite name=\"pytest\">\n");
        for i in 0..cases {
            if i < failing {
                xml.push_str(&format!(
                    "  <testcase classname=\"t\" name=\"test_{i}\"><failure message=\"boom\">trace</failure></testcase>\n"
                ));
            } else {
                xml.push_str(&format!("  <testcase classname=\"t\" name=\"test_{i}\"/>\n"));
            }
        }
        xml.push_str("</testsuite>\n");
        xml
    }

    #[test]
    fn test_counts_cases_and_failures() {
        let counts = parse_report(&suite(10, 2)).unwrap();
        assert_eq!(
            counts,
            ReportCounts {
                tests: 10,
                failures: 2
            }
        );
    }

    #[test]
    fn test_failures_counted_at_any_depth() {
        let xml = r#"<testsuite>
            <testcase name="a">
                <failure message="first"/>
                <system-out><failure>nested marker</failure></system-out>
            </testcase>
            <testcase name="b"/>
        </testsuite>"#;
        let counts = parse_report(xml).unwrap();
        assert_eq!(counts.tests, 2);
        assert_eq!(counts.failures, 2);
    }

    #[test]
    fn test_pytest_testsuites_layout() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<testsuites>
  <testsuite name="pytest" tests="3" failures="2">
    <testcase classname="t" name="a"/>
    <testcase classname="t" name="b"><failure message="boom"/></testcase>
    <testcase classname="t" name="c"><failure message="boom"/></testcase>
  </testsuite>
</testsuites>"#;
        let counts = parse_report(xml).unwrap();
        assert_eq!(
            counts,
            ReportCounts {
                tests: 3,
                failures: 2
            }
        );
    }

    #[test]
    fn test_deeper_test_cases_are_not_counted() {
        let xml = r#"<testsuite>
            <testcase name="a"/>
            <properties><testcase name="nested"/></properties>
        </testsuite>"#;
        assert_eq!(parse_report(xml).unwrap().tests, 1);

        let xml = r#"<report><testsuite><testcase name="a"/></testsuite></report>"#;
        assert_eq!(parse_report(xml).unwrap().tests, 0);
    }

    #[test]
    fn test_empty_report_is_an_error() {
        assert!(matches!(parse_report(""), Err(ReportParseError::NoRoot)));
        assert!(matches!(
            parse_report("<?xml version=\"1.0\"?>\n"),
            Err(ReportParseError::NoRoot)
        ));
    }

    #[test]
    fn test_truncated_report_is_an_error() {
        assert!(parse_report("<testsuite><testcase name=\"a\">").is_err());
    }

    #[test]
    fn test_mismatched_tags_are_an_error() {
        assert!(parse_report("<testsuite><testcase></testsuite>").is_err());
    }

    #[test]
    fn test_concatenated_reports_are_an_error() {
        let xml = format!("{}{}", suite(1, 0), suite(1, 1));
        assert!(parse_report(&xml).is_err());
    }

    #[test]
    fn test_text_outside_root_is_an_error() {
        assert!(parse_report("not xml at all").is_err());
    }
}
