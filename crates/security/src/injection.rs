//! Prompt-injection phrase detection.
//!
//! Patterns are written against lowercased text, which also makes
//! Cyrillic phrases case-insensitive.

use regex_lite::Regex;
use std::sync::LazyLock;

const PATTERNS: &[&str] = &[
    r"ignore\s+(?:all\s+)?(?:the\s+)?(?:previous|prior|above|earlier)\s+instructions",
    r"disregard\s+(?:all\s+)?(?:the\s+)?(?:previous|prior|above)\s+(?:instructions|rules)",
    r"forget\s+(?:all\s+)?(?:your|the|previous)\s+(?:instructions|rules)",
    r"you\s+are\s+now\s+an?\b",
    r"system\s*:",
    r"act\s+as\s+if\s+you\s+are",
    r"pretend\s+(?:that\s+)?you\s+are",
    r"new\s+instructions\s*:",
    r"игнорируй\s+(?:все\s+)?(?:предыдущие\s+)?инструкции",
    r"забудь\s+(?:все\s+)?(?:предыдущие\s+)?инструкции",
    r"новые\s+инструкции\s*:",
];

static COMPILED: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    PATTERNS
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
});

/// Whether `text` contains a known manipulation phrase.
pub fn looks_like_injection(text: &str) -> bool {
    let lowered = text.to_lowercase();
    COMPILED.iter().any(|re| re.is_match(&lowered))
}
