//! Text normalization for scraped article content.
//!
//! Strips site chrome ("Share", "Save", "Last Updated : ..." and friends)
//! and collapses whitespace.

use regex::Regex;
use std::sync::LazyLock;

static DEFAULT: LazyLock<TextNormalizer> = LazyLock::new(TextNormalizer::new);

/// Boilerplate phrases removed case-insensitively as whole words.
const BOILERPLATE: &[&str] = &[
    r"\bSummarize\b",
    r"\bComments\b",
    r"\bImprove\b",
    r"\bLike Article\b",
    r"\bSave\b",
    r"\bShare\b",
    r"\bReport\b",
    r"\bFollow\b",
    r"\bSuggest changes\b",
    r"Last Updated\s*:\s*\d{1,2} \w+, \d{4}",
];

/// Regex-based cleaner for scraped text.
pub struct TextNormalizer {
    newlines: Regex,
    boilerplate: Regex,
    whitespace: Regex,
}

impl TextNormalizer {
    pub fn new() -> Self {
        let boilerplate = format!("(?i){}", BOILERPLATE.join("|"));
        Self {
            newlines: Regex::new(r"\n{2,}").expect("Invalid regex"),
            boilerplate: Regex::new(&boilerplate).expect("Invalid regex"),
            whitespace: Regex::new(r"\s{2,}").expect("Invalid regex"),
        }
    }

    /// Clean `raw` until another pass would not change it.
    ///
    /// Removing a phrase can join its neighbours into a new phrase
    /// ("Like Share Article"), so a single pass is not idempotent. Every pass
    /// that changes the text makes it shorter, so the loop terminates.
    pub fn normalize(&self, raw: &str) -> String {
        let mut current = self.pass(raw);
        loop {
            let next = self.pass(&current);
            if next == current {
                return current;
            }
            current = next;
        }
    }

    fn pass(&self, text: &str) -> String {
        let collapsed = self.newlines.replace_all(text, "\n");
        let stripped = self.boilerplate.replace_all(collapsed.trim(), "");
        self.whitespace.replace_all(&stripped, " ").into_owned()
    }
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalize text with the default phrase list.
pub fn normalize(raw: &str) -> String {
    DEFAULT.normalize(raw)
}
