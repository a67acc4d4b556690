//! Due-date normalization for task creation.

use chrono::NaiveDate;

/// Accepted input patterns, tried in order. Ambiguous inputs such as
/// `03/04/2024` resolve by pattern priority (day-first wins), not locale.
const INPUT_PATTERNS: [&str; 5] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%m/%d/%Y", "%m-%d-%Y"];

/// Canonical output pattern expected by the Asana `due_on` field.
const OUTPUT_PATTERN: &str = "%Y-%m-%d";

/// Normalize a free-form date string to `YYYY-MM-DD`.
///
/// The first pattern that parses wins. Returns `None` when no pattern
/// matches; callers omit the due date rather than failing the task.
#[must_use]
pub fn normalize_due_date(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    INPUT_PATTERNS.iter().find_map(|pattern| {
        NaiveDate::parse_from_str(trimmed, pattern)
            .ok()
            .map(|date| date.format(OUTPUT_PATTERN).to_string())
    })
}
