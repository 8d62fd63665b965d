//! Helpers shared by the detail-page extractors.

use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;

/// Maximum description length handed to storage.
pub const DESCRIPTION_LIMIT: usize = 1000;

/// Maximum summary length stored on a listing.
pub const SUMMARY_LIMIT: usize = 500;

/// Section headings scanned, in order, when a page has no description block.
pub const SECTION_LABELS: [&str; 5] = [
    "Requirements",
    "Responsibilities",
    "Qualifications",
    "Skills",
    "What You'll Do",
];

/// Collect all text content from an element, whitespace-collapsed.
pub fn element_text(el: &ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Drop every non-ASCII character.
pub fn sanitize_ascii(text: &str) -> String {
    text.chars().filter(char::is_ascii).collect()
}

/// Cut to [`DESCRIPTION_LIMIT`] chars, marking the cut with `...`.
pub fn truncate_description(text: &str) -> String {
    if text.chars().count() <= DESCRIPTION_LIMIT {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(DESCRIPTION_LIMIT - 3).collect();
    cut.push_str("...");
    cut
}

/// Whitespace-collapse, sanitize and cap a raw description.
pub fn clean_description(raw: &str) -> String {
    truncate_description(&sanitize_ascii(&collapse_whitespace(raw)))
}

/// First [`SUMMARY_LIMIT`] chars of a description.
pub fn summarize(description: &str) -> String {
    description.chars().take(SUMMARY_LIMIT).collect()
}

/// First element named `tag` that starts after `anchor` opens, in document
/// order. Descendants of `anchor` count.
pub fn following_element<'a>(
    document: &'a Html,
    anchor: &ElementRef<'a>,
    tag: &str,
) -> Option<ElementRef<'a>> {
    let anchor_id = anchor.id();
    document
        .tree
        .root()
        .descendants()
        .skip_while(|node| node.id() != anchor_id)
        .skip(1)
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name().eq_ignore_ascii_case(tag))
}

fn heading_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("h3, h4").expect("heading selector is valid"))
}

/// Text following recognised section headings, concatenated in
/// [`SECTION_LABELS`] order. Empty when none are present.
pub fn section_fallback(document: &Html) -> String {
    let headings: Vec<ElementRef<'_>> = document.select(heading_selector()).collect();
    let mut out = String::new();
    for label in SECTION_LABELS {
        let needle = label.to_lowercase();
        let Some(heading) = headings
            .iter()
            .find(|h| element_text(h).to_lowercase().contains(&needle))
        else {
            continue;
        };
        if let Some(block) = following_element(document, heading, "div") {
            out.push_str(label);
            out.push_str(": ");
            out.push_str(&element_text(&block));
            out.push(' ');
        }
    }
    out
}
