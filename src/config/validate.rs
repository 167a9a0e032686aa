//! Validation of edited sequence slices
//!
//! Map and enum slices cannot be invalid once normalized, so only the romaji
//! table and the user dictionary are checked here. A candidate is accepted as
//! a whole or rejected with every failure found.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use super::normalize::{parse_dictionary_entry, parse_romaji_row};
use super::schema::{DictionaryEntry, RomajiRule};
use crate::constants::limits::MAX_DICTIONARY_ENTRIES;

/// Why a candidate slice was rejected
///
/// Row indices refer to positions in the candidate as submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationFailure {
    #[error("row {index}: a required field is empty")]
    IncompleteEntry { index: usize },

    #[error("rows {first} and {duplicate} have the same reading and word")]
    DuplicateEntry { first: usize, duplicate: usize },

    #[error("{count} entries exceed the limit of {max}")]
    TooManyEntries { count: usize, max: usize },

    #[error("malformed input{}: {reason}", index.map(|i| format!(" at row {i}")).unwrap_or_default())]
    MalformedInput { index: Option<usize>, reason: String },
}

impl ValidationFailure {
    pub fn malformed(index: Option<usize>, reason: impl Into<String>) -> Self {
        ValidationFailure::MalformedInput {
            index,
            reason: reason.into(),
        }
    }
}

/// Check a user dictionary candidate; on success returns the trimmed entries
/// that should be persisted
pub fn validate_dictionary(entries: &[DictionaryEntry]) -> Result<Vec<DictionaryEntry>, Vec<ValidationFailure>> {
    let mut failures = Vec::new();
    let trimmed: Vec<DictionaryEntry> = entries
        .iter()
        .map(|entry| DictionaryEntry::new(entry.reading.trim(), entry.word.trim()))
        .collect();

    {
        let mut seen: HashMap<(&str, &str), usize> = HashMap::new();
        for (index, entry) in trimmed.iter().enumerate() {
            if entry.reading.is_empty() || entry.word.is_empty() {
                failures.push(ValidationFailure::IncompleteEntry { index });
                continue;
            }
            let key = (entry.reading.as_str(), entry.word.as_str());
            match seen.get(&key) {
                Some(&first) => failures.push(ValidationFailure::DuplicateEntry { first, duplicate: index }),
                None => {
                    seen.insert(key, index);
                }
            }
        }
    }

    if trimmed.len() > MAX_DICTIONARY_ENTRIES {
        failures.push(ValidationFailure::TooManyEntries {
            count: trimmed.len(),
            max: MAX_DICTIONARY_ENTRIES,
        });
    }

    if failures.is_empty() {
        Ok(trimmed)
    } else {
        Err(failures)
    }
}

/// Check a romaji table candidate; on success returns the trimmed rows with
/// blank placeholder rows removed
///
/// Duplicate rows are allowed: one input may map to several outputs.
pub fn validate_romaji_rows(rows: &[RomajiRule]) -> Result<Vec<RomajiRule>, Vec<ValidationFailure>> {
    let mut failures = Vec::new();
    let mut kept = Vec::with_capacity(rows.len());

    for (index, row) in rows.iter().enumerate() {
        let trimmed = RomajiRule::new(row.input.trim(), row.output.trim(), row.next_input.trim());
        if trimmed.input.is_empty() && trimmed.output.is_empty() && trimmed.next_input.is_empty() {
            continue;
        }
        if trimmed.input.is_empty() || trimmed.output.is_empty() {
            failures.push(ValidationFailure::IncompleteEntry { index });
            continue;
        }
        kept.push(trimmed);
    }

    if failures.is_empty() {
        Ok(kept)
    } else {
        Err(failures)
    }
}

fn parse_sequence<T>(
    raw: &Value,
    what: &str,
    parse: impl Fn(&Value) -> Option<T>,
) -> Result<Vec<T>, Vec<ValidationFailure>> {
    let Some(items) = raw.as_array() else {
        return Err(vec![ValidationFailure::malformed(None, format!("expected an array of {what}"))]);
    };

    let mut failures = Vec::new();
    let mut parsed = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        match parse(item) {
            Some(value) => parsed.push(value),
            None => failures.push(ValidationFailure::malformed(Some(index), format!("not a well-formed {what}"))),
        }
    }

    if failures.is_empty() {
        Ok(parsed)
    } else {
        Err(failures)
    }
}

/// Strictly parse caller-supplied romaji rows. Unlike normalization, a
/// malformed row rejects the whole edit.
pub fn parse_romaji_input(raw: &Value) -> Result<Vec<RomajiRule>, Vec<ValidationFailure>> {
    parse_sequence(raw, "romaji row", parse_romaji_row)
}

/// Strictly parse caller-supplied dictionary entries
pub fn parse_dictionary_input(raw: &Value) -> Result<Vec<DictionaryEntry>, Vec<ValidationFailure>> {
    parse_sequence(raw, "dictionary entry", parse_dictionary_entry)
}

/// Remove the row at `index`, rejecting positions past the end
pub fn remove_row<T>(rows: &mut Vec<T>, index: usize) -> Result<T, Vec<ValidationFailure>> {
    if index >= rows.len() {
        let reason = format!("no row at {index} (table has {} rows)", rows.len());
        return Err(vec![ValidationFailure::malformed(Some(index), reason)]);
    }
    Ok(rows.remove(index))
}

/// Map and enum slices accept a JSON object patch only
pub fn require_object(raw: &Value) -> Result<(), Vec<ValidationFailure>> {
    if raw.is_object() {
        Ok(())
    } else {
        Err(vec![ValidationFailure::malformed(None, "expected a JSON object")])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entries(pairs: &[(&str, &str)]) -> Vec<DictionaryEntry> {
        pairs.iter().map(|(reading, word)| DictionaryEntry::new(reading, word)).collect()
    }

    #[test]
    fn test_dictionary_duplicate_rejected() {
        let result = validate_dictionary(&entries(&[("あい", "愛"), ("あい", "愛")]));
        assert_eq!(result, Err(vec![ValidationFailure::DuplicateEntry { first: 0, duplicate: 1 }]));
    }

    #[test]
    fn test_dictionary_duplicate_after_trim_rejected() {
        let result = validate_dictionary(&entries(&[("あい", "愛"), ("あい", "愛 ")]));
        assert_eq!(result, Err(vec![ValidationFailure::DuplicateEntry { first: 0, duplicate: 1 }]));
    }

    #[test]
    fn test_dictionary_same_reading_different_word_ok() {
        let result = validate_dictionary(&entries(&[("あい", "愛"), ("あい", "藍")]));
        assert_eq!(result, Ok(entries(&[("あい", "愛"), ("あい", "藍")])));
    }

    #[test]
    fn test_dictionary_comparison_is_case_sensitive() {
        assert!(validate_dictionary(&entries(&[("rust", "Rust"), ("rust", "rust")])).is_ok());
    }

    #[test]
    fn test_dictionary_incomplete_entry() {
        let result = validate_dictionary(&entries(&[("あい", "愛"), ("  ", "恋"), ("こい", "")]));
        assert_eq!(
            result,
            Err(vec![
                ValidationFailure::IncompleteEntry { index: 1 },
                ValidationFailure::IncompleteEntry { index: 2 },
            ])
        );
    }

    #[test]
    fn test_dictionary_entries_trimmed_on_success() {
        let result = validate_dictionary(&entries(&[(" あい ", "\t愛")]));
        assert_eq!(result, Ok(entries(&[("あい", "愛")])));
    }

    fn unique_entries(count: usize) -> Vec<DictionaryEntry> {
        (0..count)
            .map(|i| DictionaryEntry::new(&format!("よみ{i}"), &format!("単語{i}")))
            .collect()
    }

    #[test]
    fn test_dictionary_limit() {
        assert!(validate_dictionary(&unique_entries(MAX_DICTIONARY_ENTRIES)).is_ok());
        assert_eq!(
            validate_dictionary(&unique_entries(MAX_DICTIONARY_ENTRIES + 1)),
            Err(vec![ValidationFailure::TooManyEntries { count: 51, max: 50 }])
        );
    }

    #[test]
    fn test_romaji_blank_row_dropped() {
        let rows = vec![RomajiRule::new("", "", "")];
        assert_eq!(validate_romaji_rows(&rows), Ok(Vec::new()));
        let rows = vec![RomajiRule::new(" ", "\t", "  ")];
        assert_eq!(validate_romaji_rows(&rows), Ok(Vec::new()));
    }

    #[test]
    fn test_romaji_missing_output_rejected() {
        let rows = vec![RomajiRule::new("ka", "", "")];
        assert_eq!(validate_romaji_rows(&rows), Err(vec![ValidationFailure::IncompleteEntry { index: 0 }]));
    }

    #[test]
    fn test_romaji_missing_input_with_next_input_rejected() {
        let rows = vec![RomajiRule::new("", "", "k")];
        assert_eq!(validate_romaji_rows(&rows), Err(vec![ValidationFailure::IncompleteEntry { index: 0 }]));
    }

    #[test]
    fn test_romaji_identical_rows_both_accepted() {
        let row = RomajiRule::new("ka", "か", "");
        let result = validate_romaji_rows(&[row.clone(), row.clone()]);
        assert_eq!(result, Ok(vec![row.clone(), row]));
    }

    #[test]
    fn test_romaji_failure_index_counts_blank_rows() {
        let rows = vec![
            RomajiRule::new("", "", ""),
            RomajiRule::new("a", "あ", ""),
            RomajiRule::new("ki", " ", ""),
        ];
        assert_eq!(validate_romaji_rows(&rows), Err(vec![ValidationFailure::IncompleteEntry { index: 2 }]));
    }

    #[test]
    fn test_parse_romaji_input_rejects_malformed_rows() {
        let raw = json!([{ "input": "a", "output": "あ" }, { "input": "i" }]);
        assert_eq!(
            parse_romaji_input(&raw),
            Err(vec![ValidationFailure::malformed(Some(1), "not a well-formed romaji row")])
        );
        assert!(matches!(
            parse_romaji_input(&json!({ "rows": [] })).unwrap_err().as_slice(),
            [ValidationFailure::MalformedInput { index: None, .. }]
        ));
    }

    #[test]
    fn test_parse_dictionary_input() {
        let raw = json!([{ "reading": "あい", "word": "愛" }]);
        assert_eq!(parse_dictionary_input(&raw), Ok(entries(&[("あい", "愛")])));
        assert!(parse_dictionary_input(&json!([1])).is_err());
    }

    #[test]
    fn test_require_object() {
        assert!(require_object(&json!({})).is_ok());
        assert!(require_object(&json!("half")).is_err());
    }

    #[test]
    fn test_failure_messages() {
        assert_eq!(
            ValidationFailure::malformed(Some(3), "bad").to_string(),
            "malformed input at row 3: bad"
        );
        assert_eq!(ValidationFailure::malformed(None, "bad").to_string(), "malformed input: bad");
    }

    #[test]
    fn test_remove_row_bounds() {
        let mut rows = vec![RomajiRule::new("ka", "か", ""), RomajiRule::new("ki", "き", "")];
        assert_eq!(remove_row(&mut rows, 0), Ok(RomajiRule::new("ka", "か", "")));
        assert_eq!(
            remove_row(&mut rows, 1),
            Err(vec![ValidationFailure::malformed(Some(1), "no row at 1 (table has 1 rows)")])
        );
        assert_eq!(rows.len(), 1);
    }
}
