use indexmap::IndexMap;

use crate::error::{PipeforgeError, Result};

const ENTRY_DELIMITER: char = ',';
const SUITE_DELIMITER: char = ':';

/// Units selected for testing, each with its ordered suite tokens.
///
/// Iteration order is first-seen order of the units in the raw selection
/// string. Resource groups and job order are derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    raw: String,
    units: IndexMap<String, Vec<String>>,
}

impl Selection {
    /// Parses a selection string of the form `unit[:suite]*(,unit[:suite]*)*`.
    ///
    /// Blank entries and blank suite tokens are skipped. Repeated units merge
    /// their suite lists in the order they appear. A unit without suites is
    /// kept with an empty list.
    ///
    /// # Errors
    ///
    /// Returns a validation error if no unit remains after parsing, or if a
    /// unit id contains characters that cannot be used in job names.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut units: IndexMap<String, Vec<String>> = IndexMap::new();

        for entry in raw.split(ENTRY_DELIMITER) {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }

            let mut parts = entry.split(SUITE_DELIMITER);
            let unit = parts.next().unwrap_or_default();
            validate_unit_id(unit, entry)?;

            units
                .entry(unit.to_string())
                .or_default()
                .extend(parts.flat_map(str::split_whitespace).map(str::to_string));
        }

        if units.is_empty() {
            return Err(PipeforgeError::Validation("No units selected.".into()));
        }

        Ok(Self {
            raw: raw.to_string(),
            units,
        })
    }

    /// The selection string exactly as supplied.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.units
            .iter()
            .map(|(unit, suites)| (unit.as_str(), suites.as_slice()))
    }
}

fn validate_unit_id(unit: &str, entry: &str) -> Result<()> {
    if unit.is_empty() {
        return Err(PipeforgeError::Validation(format!(
            "Entry '{entry}' has no unit name."
        )));
    }

    let valid = unit
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if !valid {
        return Err(PipeforgeError::Validation(format!(
            "Unit '{unit}' may only contain letters, digits, '_', '-' and '.'."
        )));
    }

    Ok(())
}

/// Extracts the suite tokens selected for `unit` from a raw selection string.
///
/// This is the generation-time counterpart of the discovery line emitted into
/// every unit job (see [`super::script::discovery_lines`]): at execution time
/// the job only sees the raw string, and both sides must agree on which
/// tokens belong to the unit. An entry belongs to `unit` when, after leading
/// whitespace, it starts with `unit:`. Sections from repeated entries are
/// concatenated; empty tokens are dropped.
///
/// Returns `None` when the unit has no non-empty section, in which case the
/// job exits successfully without running anything.
pub fn unit_section(raw: &str, unit: &str) -> Option<Vec<String>> {
    let prefix = format!("{unit}{SUITE_DELIMITER}");

    let suites: Vec<String> = raw
        .split(ENTRY_DELIMITER)
        .filter_map(|entry| entry.trim_start().strip_prefix(prefix.as_str()))
        .flat_map(|section| section.split(SUITE_DELIMITER))
        .flat_map(str::split_whitespace)
        .map(str::to_string)
        .collect();

    (!suites.is_empty()).then_some(suites)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn units(selection: &Selection) -> Vec<(&str, Vec<&str>)> {
        selection
            .iter()
            .map(|(unit, suites)| (unit, suites.iter().map(String::as_str).collect()))
            .collect()
    }

    #[test]
    fn test_parse_units_and_suites() {
        let selection = Selection::parse("alpha:sanity:smoke,beta").unwrap();
        assert_eq!(selection.len(), 2);
        assert!(!selection.is_empty());
        assert_eq!(
            units(&selection),
            vec![("alpha", vec!["sanity", "smoke"]), ("beta", vec![])]
        );
        assert_eq!(selection.raw(), "alpha:sanity:smoke,beta");
    }

    #[test]
    fn test_parse_skips_blank_entries() {
        let selection = Selection::parse(" , alpha:smoke ,, ").unwrap();
        assert_eq!(units(&selection), vec![("alpha", vec!["smoke"])]);
    }

    #[test]
    fn test_parse_skips_blank_suite_tokens() {
        let selection = Selection::parse("alpha::smoke: ,beta:").unwrap();
        assert_eq!(
            units(&selection),
            vec![("alpha", vec!["smoke"]), ("beta", vec![])]
        );
    }

    #[test]
    fn test_parse_merges_repeated_units_in_first_seen_order() {
        let selection = Selection::parse("zeta:smoke,alpha,zeta:payouts:smoke").unwrap();
        assert_eq!(
            units(&selection),
            vec![
                ("zeta", vec!["smoke", "payouts", "smoke"]),
                ("alpha", vec![])
            ]
        );
    }

    #[test]
    fn test_parse_empty_selection_is_validation_error() {
        for raw in ["", "   ", ",,, ,"] {
            let err = Selection::parse(raw).unwrap_err();
            assert!(matches!(err, PipeforgeError::Validation(_)), "{raw:?}");
        }
    }

    #[test]
    fn test_parse_rejects_malformed_unit_ids() {
        assert!(matches!(
            Selection::parse(":smoke"),
            Err(PipeforgeError::Validation(_))
        ));
        assert!(matches!(
            Selection::parse("bad unit:smoke"),
            Err(PipeforgeError::Validation(_))
        ));
        assert!(matches!(
            Selection::parse("alpha :smoke"),
            Err(PipeforgeError::Validation(_))
        ));
        assert!(matches!(
            Selection::parse("it's:smoke"),
            Err(PipeforgeError::Validation(_))
        ));
    }

    #[test]
    fn test_unit_section_matches_parse_for_simple_selections() {
        let raw = "alpha:sanity:smoke,beta,gamma:all";
        let selection = Selection::parse(raw).unwrap();

        for (unit, suites) in selection.iter() {
            let section = unit_section(raw, unit).unwrap_or_default();
            assert_eq!(section, suites, "unit {unit}");
        }
    }

    #[test]
    fn test_unit_section_concatenates_repeated_entries() {
        assert_eq!(
            unit_section("alpha:smoke,beta:all, alpha:payouts", "alpha"),
            Some(vec!["smoke".to_string(), "payouts".to_string()])
        );
    }

    #[test]
    fn test_unit_section_requires_exact_unit_prefix() {
        assert_eq!(unit_section("betaalpha:smoke", "alpha"), None);
        assert_eq!(unit_section("alpha_2:smoke", "alpha"), None);
    }

    #[test]
    fn test_unit_section_absent_or_empty() {
        assert_eq!(unit_section("alpha:smoke,beta", "beta"), None);
        assert_eq!(unit_section("beta:", "beta"), None);
        assert_eq!(unit_section("alpha:smoke", "gamma"), None);
    }
}
