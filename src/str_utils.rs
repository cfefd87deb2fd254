/// Utility functions for string processing, particularly SQL identifier handling
use crate::result::{RecordError, Result};
use regex::Regex;

// Regex compiled once as a lazy static for performance
static IDENTIFIER_REGEX: once_cell::sync::Lazy<Regex> =
    once_cell::sync::Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// Check if a single name part is a plain SQL identifier (letters, digits and underscores,
/// not starting with a digit)
pub fn is_valid_identifier(name: &str) -> bool {
    IDENTIFIER_REGEX.is_match(name)
}

/// Quote a column name for use in SQL. Rejects anything that is not a plain identifier,
/// so the quoted form never needs escaping.
pub fn quote_column(name: &str) -> Result<String> {
    if is_valid_identifier(name) {
        Ok(format!("\"{name}\""))
    } else {
        Err(RecordError::new_invalid_identifier(name))
    }
}

/// Quote a table name for use in SQL. Accepts `table` or `schema.table`.
pub fn quote_table(name: &str) -> Result<String> {
    let parts: Vec<&str> = name.split('.').collect();
    if parts.len() > 2 || !parts.iter().all(|part| is_valid_identifier(part)) {
        return Err(RecordError::new_invalid_identifier(name));
    }
    Ok(parts
        .iter()
        .map(|part| format!("\"{part}\""))
        .collect::<Vec<_>>()
        .join("."))
}
