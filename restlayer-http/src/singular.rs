//! Default English singularization of collection names.

const IRREGULAR: &[(&str, &str)] = &[
    ("people", "person"),
    ("men", "man"),
    ("women", "woman"),
    ("children", "child"),
    ("feet", "foot"),
    ("teeth", "tooth"),
    ("mice", "mouse"),
    ("geese", "goose"),
];

const INVARIANT_SUFFIXES: &[&str] = &["ss", "us", "is", "news", "series", "species"];

const ES_SUFFIXES: &[&str] = &["sses", "shes", "ches", "xes", "zes"];

/// Returns the singular form of an English plural noun.
///
/// Names that do not look plural are returned unchanged.
pub fn singularize(plural: &str) -> String {
    let lower = plural.to_ascii_lowercase();

    if let Some((_, singular)) = IRREGULAR.iter().find(|(p, _)| *p == lower) {
        return singular.to_string();
    }
    if INVARIANT_SUFFIXES.iter().any(|suffix| lower.ends_with(suffix)) {
        return plural.to_string();
    }
    if lower.len() > 3 && lower.ends_with("ies") {
        return format!("{}y", &plural[..plural.len() - 3]);
    }
    if ES_SUFFIXES.iter().any(|suffix| lower.ends_with(suffix)) {
        return plural[..plural.len() - 2].to_string();
    }
    if lower.len() > 1 && lower.ends_with('s') {
        return plural[..plural.len() - 1].to_string();
    }

    plural.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singularizes_regular_and_irregular_nouns() {
        for (plural, singular) in [
            ("users", "user"),
            ("categories", "category"),
            ("addresses", "address"),
            ("boxes", "box"),
            ("matches", "match"),
            ("people", "person"),
            ("status", "status"),
            ("series", "series"),
            ("data", "data"),
        ] {
            assert_eq!(singularize(plural), singular, "{plural}");
        }
    }
}
