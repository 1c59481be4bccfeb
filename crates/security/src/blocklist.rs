//! Locale word lists for the inappropriate-content check.
//!
//! Terms are lowercase; matching is a case-insensitive substring search.

use daycoach_core::Locale;

const RU_TERMS: &[&str] = &[
    "дурак",
    "идиот",
    "тупица",
    "придурок",
    "дебил",
    "кретин",
    "урод",
    "сволочь",
    "ублюдок",
    "мразь",
];

const EN_TERMS: &[&str] = &[
    "idiot",
    "stupid",
    "moron",
    "retard",
    "imbecile",
    "dumbass",
    "bastard",
    "asshole",
    "shut up",
];

/// The blocklist for `locale`.
pub fn terms(locale: Locale) -> &'static [&'static str] {
    match locale {
        Locale::Ru => RU_TERMS,
        Locale::En => EN_TERMS,
    }
}

/// Every blocklisted term that occurs in `text`, in list order.
pub fn find_terms(text: &str, locale: Locale) -> Vec<String> {
    let lowered = text.to_lowercase();
    terms(locale)
        .iter()
        .filter(|term| lowered.contains(*term))
        .map(|term| term.to_string())
        .collect()
}
