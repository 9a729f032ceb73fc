//! Markdown cleanup and word-budget truncation for Reddit content.

use regex::Regex;
use std::sync::LazyLock;

/// Default word budget applied to aggregated post content before summarization.
pub const DEFAULT_MAX_WORDS: usize = 3000;

static MARKDOWN_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\([^)]+\)").expect("valid link pattern"));
static EMPHASIS_MARKERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*|__|~~").expect("valid emphasis pattern"));

/// Replace `[label](url)` with `label`, drop `**`, `__` and `~~` markers, and trim.
///
/// Passes repeat until the text stops changing, so `clean(clean(x)) == clean(x)`.
pub fn clean(text: &str) -> String {
    let mut current = text.trim().to_string();
    loop {
        let next = strip_markdown(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn strip_markdown(text: &str) -> String {
    let without_links = MARKDOWN_LINK.replace_all(text, "$1");
    EMPHASIS_MARKERS
        .replace_all(&without_links, "")
        .trim()
        .to_string()
}

/// Keep the first `max_words` whitespace-delimited tokens, joined by single spaces.
pub fn truncate(text: &str, max_words: usize) -> String {
    text.split_whitespace()
        .take(max_words)
        .collect::<Vec<_>>()
        .join(" ")
}
