//! Shared invocation and parsing utilities for scheduler adapters.
//!
//! Every CLI-driven adapter talks to its scheduler exclusively through
//! [`command::invoke`] and turns the captured output into canonical values
//! with the parsers in this crate.

pub mod command;
pub mod table;
pub mod time;

pub use command::{bin_path, invoke, invoke_in, ssh_wrap, CommandError};
pub use table::{Table, TableError, TableSchema};
pub use time::{
    parse_duration_secs, parse_epoch_timestamp, parse_iso_timestamp, parse_past_time,
    seconds_to_duration,
};

/// Filter helper for optional string fields.
/// Returns None if the string is empty or a placeholder value.
pub fn non_empty_string(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() || trimmed == "-" || trimmed == "N/A" || trimmed == "Unknown" {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Split a delimited line and validate field count.
pub fn split_delimited<'a>(
    line: &'a str,
    delimiter: char,
    min_fields: usize,
) -> Result<Vec<&'a str>, String> {
    let fields: Vec<&str> = line.split(delimiter).collect();
    if fields.len() < min_fields {
        return Err(format!(
            "Expected {} fields, got {}: {}",
            min_fields,
            fields.len(),
            line
        ));
    }
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty_string() {
        assert_eq!(non_empty_string("hello"), Some("hello".to_string()));
        assert_eq!(non_empty_string("  hello  "), Some("hello".to_string()));
        assert_eq!(non_empty_string(""), None);
        assert_eq!(non_empty_string("-"), None);
        assert_eq!(non_empty_string("N/A"), None);
    }

    #[test]
    fn test_split_delimited() {
        let line = "a;b;c;d";
        assert_eq!(
            split_delimited(line, ';', 4).unwrap(),
            vec!["a", "b", "c", "d"]
        );
        assert!(split_delimited(line, ';', 5).is_err());
    }
}
