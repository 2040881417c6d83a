//! Small scraper helpers shared by the HTML parsers.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Selector};
use std::collections::HashSet;

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("static tag pattern"));
static ENTITY: Lazy<Regex> = Lazy::new(|| Regex::new(r"&[#a-zA-Z0-9]+;").expect("static entity pattern"));

/// Whitespace-collapsed text content of an element
pub fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text of the first descendant matching any of `selectors`, skipping empty matches
pub fn first_text(element: ElementRef<'_>, selectors: &[&Selector]) -> Option<String> {
    selectors
        .iter()
        .flat_map(|selector| element.select(selector))
        .map(text_of)
        .find(|text| !text.is_empty())
}

/// Trimmed, non-empty attribute value
pub fn attr(element: ElementRef<'_>, name: &str) -> Option<String> {
    element
        .value()
        .attr(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// First non-empty `name` attribute on the element itself or any descendant
pub fn first_attr(element: ElementRef<'_>, selector: &Selector, name: &str) -> Option<String> {
    attr(element, name).or_else(|| element.select(selector).find_map(|el| attr(el, name)))
}

/// Keep only matches that are not nested inside another match, in document order
pub fn outermost<'a>(matches: Vec<ElementRef<'a>>) -> Vec<ElementRef<'a>> {
    let ids: HashSet<_> = matches.iter().map(|el| el.id()).collect();
    matches
        .into_iter()
        .filter(|el| !el.ancestors().any(|ancestor| ids.contains(&ancestor.id())))
        .collect()
}

/// Strip markup from a raw fragment; tags and entities become spaces
pub fn clean_fragment_text(fragment: &str) -> String {
    let without_tags = TAG.replace_all(fragment, " ");
    let decoded = without_tags
        .replace("&amp;", "&")
        .replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");
    let without_entities = ENTITY.replace_all(&decoded, " ");
    without_entities.split_whitespace().collect::<Vec<_>>().join(" ")
}
