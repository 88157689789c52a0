//! services/api/src/web/validation.rs
//!
//! Shape checks applied to request fields before they reach the core.

use regex::Regex;
use std::sync::LazyLock;

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

/// True when `email` looks like `local@domain.tld`. Surrounding whitespace is ignored.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email.trim())
}

/// Rejects a present, non-blank email that is not shaped like an address.
///
/// Blank values pass through so the core can report them as missing.
pub fn check_email(email: Option<&str>) -> Result<(), String> {
    match email.map(str::trim) {
        Some(value) if !value.is_empty() && !is_valid_email(value) => {
            Err("Email address is invalid".to_string())
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("a@b.co", true)]
    #[case("  Alice@Example.com ", true)]
    #[case("alice", false)]
    #[case("alice@", false)]
    #[case("alice@example", false)]
    #[case("al ice@example.com", false)]
    fn email_shapes(#[case] input: &str, #[case] expected: bool) {
        assert_eq!(is_valid_email(input), expected);
    }

    #[test]
    fn blank_email_is_left_to_the_core() {
        assert!(check_email(Some("   ")).is_ok());
        assert!(check_email(None).is_ok());
        assert!(check_email(Some("nope")).is_err());
    }
}
