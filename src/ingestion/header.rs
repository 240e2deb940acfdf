//! Header record validation.

use std::collections::HashSet;

use crate::error::HeaderViolation;

/// A valid header has no empty and no repeated field names.
///
/// Reports the first violation found, scanning left to right.
pub fn validate_header<S: AsRef<str>>(header: &[S]) -> Result<(), HeaderViolation> {
    let mut seen = HashSet::with_capacity(header.len());
    for (index, name) in header.iter().enumerate() {
        let name = name.as_ref();
        if name.is_empty() {
            return Err(HeaderViolation::Empty { index });
        }
        if !seen.insert(name) {
            return Err(HeaderViolation::Duplicate { index });
        }
    }
    Ok(())
}

/// Synthetic column names for header-less input: `column_1`, `column_2`, ...
pub fn generated_header(width: usize) -> Vec<String> {
    (1..=width).map(|i| format!("column_{i}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_unique_names() {
        assert_eq!(validate_header(&["id", "name", "joined"]), Ok(()));
        assert_eq!(validate_header::<&str>(&[]), Ok(()));
    }

    #[test]
    fn duplicate_reports_index_of_repeat() {
        let err = validate_header(&["id", "id"]).unwrap_err();
        assert_eq!(err, HeaderViolation::Duplicate { index: 1 });
        assert_eq!(err.to_string(), "duplicate value at field 1");
    }

    #[test]
    fn empty_reports_index() {
        let err = validate_header(&["id", ""]).unwrap_err();
        assert_eq!(err, HeaderViolation::Empty { index: 1 });
        assert_eq!(err.to_string(), "empty value at field 1");
    }

    #[test]
    fn first_violation_wins() {
        assert_eq!(
            validate_header(&["", "a", "a"]),
            Err(HeaderViolation::Empty { index: 0 })
        );
    }

    #[test]
    fn generated_names() {
        assert_eq!(generated_header(3), vec!["column_1", "column_2", "column_3"]);
    }
}
