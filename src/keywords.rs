//! The single bear-keyword list shared by every parser and the core filter.

/// Lowercase terms that mark an event as targeted at the bear community
pub const BEAR_KEYWORDS: &[&str] = &[
    "bear",
    "bears",
    "woof",
    "grr",
    "furry",
    "hairy",
    "daddy",
    "cub",
    "otter",
    "leather",
    "muscle bear",
    "bearracuda",
    "furball",
    "megawoof",
    "leather bears",
    "bear night",
    "bear party",
    "polar bear",
    "grizzly",
];

/// Case-insensitive substring match against the shared keyword list
pub fn contains_bear_keyword(text: &str) -> bool {
    let lower = text.to_lowercase();
    BEAR_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

/// Case-insensitive substring match against caller-supplied terms
pub fn matches_any(text: &str, terms: &[String]) -> bool {
    let lower = text.to_lowercase();
    terms
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .any(|t| lower.contains(&t))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_matching_is_case_insensitive() {
        assert!(contains_bear_keyword("MEGAWOOF America"));
        assert!(contains_bear_keyword("Daddy's Bear Night"));
        assert!(!contains_bear_keyword("Yoga Class"));
    }

    #[test]
    fn test_matches_any_ignores_blank_terms() {
        let terms = vec!["".to_string(), "  ".to_string()];
        assert!(!matches_any("anything", &terms));
        let terms = vec!["Eagle".to_string()];
        assert!(matches_any("Night at the eagle", &terms));
    }
}
