//! Character budgets for paper text.
//!
//! Lengths are counted in Unicode scalar values, so truncation never splits
//! a character. Records are never modified in place: [`budgeted`] returns a
//! new record.

use papertrail_core::PaperRecord;

/// Appended to any value that was cut.
pub const ELLIPSIS: &str = "...";

/// `value` unchanged if it has at most `limit` characters, otherwise its
/// first `limit` characters followed by `"..."`.
///
/// With `limit == 0` a non-empty value becomes exactly `"..."` and an empty
/// value stays empty.
pub fn truncate(value: &str, limit: usize) -> String {
    match value.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}{ELLIPSIS}", &value[..cut]),
        None => value.to_string(),
    }
}

/// A copy of `record` with its abstract truncated to `abstract_limit`.
pub fn budgeted(record: &PaperRecord, abstract_limit: usize) -> PaperRecord {
    PaperRecord {
        abstract_text: truncate(&record.abstract_text, abstract_limit),
        ..record.clone()
    }
}

/// Budget every record in order.
pub fn budget_all(records: &[PaperRecord], abstract_limit: usize) -> Vec<PaperRecord> {
    records.iter().map(|r| budgeted(r, abstract_limit)).collect()
}
