//! POD extraction from XML files
//!
//! Several schema variants exist in the wild, so this matches tag and
//! attribute patterns on the raw text instead of parsing a document tree.

use super::clean_cell;
use super::pod::is_valid_pod;
use regex_lite::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

static POD_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"<POD>\s*([^<]+?)\s*</POD>",
        r"<CodPod>\s*([^<]+?)\s*</CodPod>",
        r"<CodicePOD>\s*([^<]+?)\s*</CodicePOD>",
        r#"POD="([^"]+)""#,
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Valid PODs matched by any of the known patterns
pub fn parse_xml_pods(text: &str) -> BTreeSet<String> {
    POD_PATTERNS
        .iter()
        .flat_map(|re| re.captures_iter(text))
        .filter_map(|caps| caps.get(1).map(|m| clean_cell(m.as_str())))
        .filter(|value| is_valid_pod(value))
        .collect()
}
