//! POD code validation and filename extraction

use regex_lite::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

/// Italian metering point prefix
pub const POD_PREFIX: &str = "IT";

/// Accepted codes are strictly longer than this
pub const MIN_POD_LEN_EXCLUSIVE: usize = 10;

static RE_POD_IN_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"IT[0-9A-Z]{3}E[0-9]{8}").unwrap());

/// A value is a POD iff it starts with `IT` and is longer than 10 characters
pub fn is_valid_pod(value: &str) -> bool {
    value.starts_with(POD_PREFIX) && value.chars().count() > MIN_POD_LEN_EXCLUSIVE
}

/// Recover PODs embedded in a file name, deduplicated and sorted
pub fn pods_from_filename(file_name: &str) -> Vec<String> {
    RE_POD_IN_NAME
        .find_iter(&file_name.to_ascii_uppercase())
        .map(|m| m.as_str().to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_pod() {
        assert!(is_valid_pod("IT001E12345678"));
        assert!(is_valid_pod("IT012345678")); // 11 chars
        assert!(!is_valid_pod("IT01234567")); // exactly 10
        assert!(!is_valid_pod("FR001E12345678"));
        assert!(!is_valid_pod("it001e12345678"));
        assert!(!is_valid_pod(""));
    }

    #[test]
    fn test_pods_from_filename() {
        assert_eq!(
            pods_from_filename("letture_IT001E12345678_2024-11.zip"),
            vec!["IT001E12345678"]
        );
        assert_eq!(
            pods_from_filename("it001e12345678-IT002E87654321-IT001E12345678.csv"),
            vec!["IT001E12345678", "IT002E87654321"]
        );
        assert!(pods_from_filename("letture_novembre.zip").is_empty());
    }
}
