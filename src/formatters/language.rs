//! Language code normalization for OCR detections.

/// Map a detected language code onto the small set pechas use.
///
/// Empty and undetermined codes take the document default. Dzongkha is
/// written in Tibetan script and maps to `bo`. Every other unknown code maps
/// to `en`.
pub fn normalize_language(code: &str, default_language: &str) -> String {
    match code {
        "" | "und" => default_language.to_string(),
        "bo" | "en" | "zh" => code.to_string(),
        "dz" => "bo".to_string(),
        _ => "en".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undetermined_uses_default() {
        assert_eq!(normalize_language("und", "bo"), "bo");
        assert_eq!(normalize_language("", "bo"), "bo");
        assert_eq!(normalize_language("", "zh"), "zh");
    }

    #[test]
    fn test_known_codes_pass_through() {
        for code in ["bo", "en", "zh"] {
            assert_eq!(normalize_language(code, "bo"), code);
        }
    }

    #[test]
    fn test_dzongkha_is_tibetan() {
        assert_eq!(normalize_language("dz", "en"), "bo");
    }

    #[test]
    fn test_other_codes_fall_back_to_english() {
        assert_eq!(normalize_language("fr", "bo"), "en");
        assert_eq!(normalize_language("hi", "zh"), "en");
        // Matching is exact; region-tagged codes are "other".
        assert_eq!(normalize_language("zh-Hant", "bo"), "en");
    }
}
