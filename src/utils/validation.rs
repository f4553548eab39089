use std::sync::LazyLock;

use regex::Regex;
use validator::ValidationError;

static YEAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}$").expect("year pattern is valid")
});

/// Rejects empty and whitespace-only strings.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("This field is required".into());
        return Err(err);
    }
    Ok(())
}

/// Accepts a four-digit year such as "2023".
pub fn validate_year(value: &str) -> Result<(), ValidationError> {
    if !YEAR_RE.is_match(value.trim()) {
        let mut err = ValidationError::new("invalid_year");
        err.message = Some("Year must be four digits".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_strings_rejected() {
        assert!(validate_not_blank("").is_err());
        assert!(validate_not_blank("  \t").is_err());
        assert!(validate_not_blank("القانون").is_ok());
    }

    #[test]
    fn test_year_pattern() {
        assert!(validate_year("2023").is_ok());
        assert!(validate_year(" 1999 ").is_ok());
        assert!(validate_year("23").is_err());
        assert!(validate_year("year").is_err());
    }
}
