use crate::config::UrlPattern;
use regex::RegexBuilder;
use reqwest::Url;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Apply each named pattern to raw HTML and collect absolute, valid URLs.
///
/// The first capture group is the URL when the pattern has one, otherwise the
/// whole match. Each pattern contributes at most its own `max_matches` new
/// URLs; the result keeps first-seen order with no duplicates.
pub fn extract_urls(html: &str, patterns: &[UrlPattern], base_url: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut urls = Vec::new();

    for pattern in patterns {
        let regex = match RegexBuilder::new(&pattern.regex).case_insensitive(true).build() {
            Ok(re) => re,
            Err(e) => {
                warn!("Skipping invalid url pattern '{}': {}", pattern.name, e);
                continue;
            }
        };

        let cap = pattern.max_matches();
        let mut added = 0;
        for caps in regex.captures_iter(html) {
            if added >= cap {
                break;
            }
            let Some(raw) = caps.get(1).or_else(|| caps.get(0)) else {
                continue;
            };
            let Some(url) = normalize_url(raw.as_str(), base_url) else {
                continue;
            };
            if is_valid_url(&url) && seen.insert(url.clone()) {
                urls.push(url);
                added += 1;
            }
        }
        debug!("Pattern '{}' contributed {} urls", pattern.name, added);
    }

    urls
}

/// Decode the common HTML entities and resolve `//host/...` and `/path` against `base_url`
pub fn normalize_url(url: &str, base_url: &str) -> Option<String> {
    let decoded = url
        .trim()
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">");
    if decoded.is_empty() || decoded.starts_with('#') {
        return None;
    }

    if decoded.starts_with("//") {
        let base = Url::parse(base_url).ok()?;
        return Some(format!("{}:{}", base.scheme(), decoded));
    }
    if decoded.starts_with('/') {
        let base = Url::parse(base_url).ok()?;
        return base.join(&decoded).ok().map(|u| u.to_string());
    }

    Some(decoded)
}

/// An absolute http(s) URL with a host
pub fn is_valid_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_some(),
        Err(_) => false,
    }
}

/// Host of a URL without a leading `www.`
pub fn host_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(host.trim_start_matches("www.").to_lowercase())
}

/// Drop blank, repeated and already-processed URLs, keeping first occurrences in order
pub fn deduplicate_urls(urls: &[String], processed: &HashSet<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    urls.iter()
        .map(|u| u.trim())
        .filter(|u| !u.is_empty() && !processed.contains(*u))
        .filter(|u| seen.insert(u.to_string()))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(name: &str, regex: &str, max: Option<usize>) -> UrlPattern {
        UrlPattern {
            name: name.to_string(),
            regex: regex.to_string(),
            max_matches: max,
        }
    }

    #[test]
    fn test_relative_and_protocol_relative_urls_resolve_against_base() {
        let base = "https://bearracuda.com/events";
        assert_eq!(normalize_url("/events/denver", base).as_deref(), Some("https://bearracuda.com/events/denver"));
        assert_eq!(normalize_url("//cdn.example.com/a.png", base).as_deref(), Some("https://cdn.example.com/a.png"));
        assert_eq!(
            normalize_url("https://x.com/?a=1&amp;b=2", base).as_deref(),
            Some("https://x.com/?a=1&b=2")
        );
        assert_eq!(normalize_url("#top", base), None);
    }

    #[test]
    fn test_extract_urls_dedupes_and_caps_per_pattern() {
        let html = r#"
            <a href="/e/1">one</a>
            <a href="/e/2">two</a>
            <a href="/e/1">one again</a>
            <a href="/e/3">three</a>
            <a href="https://other.com/party">party</a>
            <a href="mailto:someone@example.com">mail</a>
        "#;
        let patterns = vec![
            pattern("events", r#"href="(/e/\d+)""#, Some(2)),
            pattern("external", r#"href="([^"]+party)""#, None),
            pattern("mail", r#"href="(mailto:[^"]+)""#, None),
        ];
        let urls = extract_urls(html, &patterns, "https://example.com/list");
        assert_eq!(
            urls,
            vec![
                "https://example.com/e/1".to_string(),
                "https://example.com/e/2".to_string(),
                "https://other.com/party".to_string(),
            ]
        );
    }

    #[test]
    fn test_invalid_pattern_is_skipped() {
        let patterns = vec![pattern("broken", r"(unclosed", None), pattern("ok", r#"href="([^"]+)""#, None)];
        let urls = extract_urls(r#"<a href="https://a.com/x">"#, &patterns, "https://a.com");
        assert_eq!(urls, vec!["https://a.com/x".to_string()]);
    }

    #[test]
    fn test_deduplicate_urls_skips_processed() {
        let processed: HashSet<String> = ["https://a.com/1".to_string()].into_iter().collect();
        let urls = vec![
            "https://a.com/1".to_string(),
            "https://a.com/2".to_string(),
            " ".to_string(),
            "https://a.com/2".to_string(),
        ];
        assert_eq!(deduplicate_urls(&urls, &processed), vec!["https://a.com/2".to_string()]);
    }

    #[test]
    fn test_host_of_strips_www() {
        assert_eq!(host_of("https://www.Eventbrite.com/e/123").as_deref(), Some("eventbrite.com"));
        assert_eq!(host_of("not a url"), None);
    }
}
