//! Search text normalization.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Lower-case a string and strip diacritics, so that "Jalapeño" and
/// "jalapeno" match the same search term.
pub fn normalize_search_text(s: &str) -> String {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .nfc()
        .collect::<String>()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_accents_and_case() {
        assert_eq!(normalize_search_text("Jalapeño Picante"), "jalapeno picante");
        assert_eq!(normalize_search_text("CRÈME brûlée"), "creme brulee");
        assert_eq!(normalize_search_text("plain"), "plain");
        assert_eq!(normalize_search_text(""), "");
    }
}
