//! Unit spelling normalization.
//!
//! Every recognized spelling of a measurement unit reduces to one canonical
//! token. Lookup is case-insensitive, except for the single letters `T`
//! (tablespoon) and `t` (teaspoon), which are checked case-sensitively first.

use std::collections::HashMap;
use std::sync::LazyLock;

/// Canonical unit name and its case-insensitive spellings. Each canonical
/// name is listed among its own variants so normalization is idempotent.
const UNIT_TABLE: &[(&str, &[&str])] = &[
    ("cup", &["cup", "cups", "c"]),
    (
        "tablespoon",
        &["tablespoon", "tablespoons", "tbsp", "tbsps", "tbs", "tbl", "tb"],
    ),
    ("teaspoon", &["teaspoon", "teaspoons", "tsp", "tsps", "t"]),
    ("gram", &["gram", "grams", "g", "gm", "gms", "gr", "gramme", "grammes"]),
    ("kilogram", &["kilogram", "kilograms", "kg", "kgs", "kilo", "kilos"]),
    ("milligram", &["milligram", "milligrams", "mg"]),
    ("ounce", &["ounce", "ounces", "oz"]),
    ("pound", &["pound", "pounds", "lb", "lbs"]),
    (
        "milliliter",
        &["milliliter", "milliliters", "millilitre", "millilitres", "ml", "mls"],
    ),
    ("liter", &["liter", "liters", "litre", "litres", "l"]),
    (
        "fluid ounce",
        &["fluid ounce", "fluid ounces", "fl oz", "fl. oz.", "floz"],
    ),
    ("pint", &["pint", "pints", "pt"]),
    ("quart", &["quart", "quarts", "qt"]),
    ("gallon", &["gallon", "gallons", "gal"]),
    ("pinch", &["pinch", "pinches"]),
    ("dash", &["dash", "dashes"]),
    ("clove", &["clove", "cloves"]),
    ("can", &["can", "cans", "tin", "tins"]),
    ("package", &["package", "packages", "pkg", "packet", "packets"]),
    ("slice", &["slice", "slices"]),
    ("piece", &["piece", "pieces", "pc", "pcs"]),
    ("bunch", &["bunch", "bunches"]),
    ("stick", &["stick", "sticks"]),
    ("sprig", &["sprig", "sprigs"]),
    ("handful", &["handful", "handfuls"]),
];

/// Single letters whose meaning depends on case.
const CASE_SENSITIVE: &[(&str, &str)] = &[("T", "tablespoon"), ("t", "teaspoon")];

static VARIANT_TO_CANONICAL: LazyLock<HashMap<String, &'static str>> = LazyLock::new(|| {
    let mut map = HashMap::new();
    for (canonical, variants) in UNIT_TABLE {
        for variant in *variants {
            map.insert(variant.to_lowercase(), *canonical);
        }
    }
    map
});

/// Normalizes a unit spelling to its canonical form.
///
/// Unrecognized units are trimmed and lowercased but otherwise kept. Blank
/// input is treated as "no unit".
pub fn normalize_unit(unit: Option<&str>) -> Option<String> {
    let trimmed = unit?.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some((_, canonical)) = CASE_SENSITIVE.iter().find(|(letter, _)| *letter == trimmed) {
        return Some((*canonical).to_string());
    }

    let lowered = trimmed.to_lowercase();
    match VARIANT_TO_CANONICAL.get(&lowered) {
        Some(canonical) => Some((*canonical).to_string()),
        None => Some(lowered),
    }
}

/// All known spellings of a canonical unit, including the case-sensitive
/// single-letter forms. Empty for unknown names.
pub fn unit_variants(canonical: &str) -> Vec<&'static str> {
    let mut variants: Vec<&'static str> = UNIT_TABLE
        .iter()
        .find(|(name, _)| *name == canonical)
        .map(|(_, variants)| variants.to_vec())
        .unwrap_or_default();

    for (letter, target) in CASE_SENSITIVE {
        if *target == canonical && !variants.contains(letter) {
            variants.push(letter);
        }
    }
    variants
}

/// Whether `token` is a recognized unit spelling.
pub fn is_known_unit(token: &str) -> bool {
    let trimmed = token.trim();
    CASE_SENSITIVE.iter().any(|(letter, _)| *letter == trimmed)
        || VARIANT_TO_CANONICAL.contains_key(&trimmed.to_lowercase())
}

/// Canonical unit names, in table order.
pub fn canonical_units() -> impl Iterator<Item = &'static str> {
    UNIT_TABLE.iter().map(|(canonical, _)| *canonical)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_stays_none() {
        assert_eq!(normalize_unit(None), None);
        assert_eq!(normalize_unit(Some("   ")), None);
    }

    #[test]
    fn test_common_spellings() {
        assert_eq!(normalize_unit(Some("Cups")).as_deref(), Some("cup"));
        assert_eq!(normalize_unit(Some("TBSP")).as_deref(), Some("tablespoon"));
        assert_eq!(normalize_unit(Some(" tsp ")).as_deref(), Some("teaspoon"));
        assert_eq!(normalize_unit(Some("g")).as_deref(), Some("gram"));
        assert_eq!(normalize_unit(Some("Fl Oz")).as_deref(), Some("fluid ounce"));
    }

    #[test]
    fn test_single_letter_case_matters() {
        assert_eq!(normalize_unit(Some("T")).as_deref(), Some("tablespoon"));
        assert_eq!(normalize_unit(Some("t")).as_deref(), Some("teaspoon"));
    }

    #[test]
    fn test_unknown_is_lowercased() {
        assert_eq!(normalize_unit(Some("  Knob ")).as_deref(), Some("knob"));
    }

    #[test]
    fn test_reverse_lookup_includes_case_sensitive_letters() {
        let variants = unit_variants("tablespoon");
        assert!(variants.contains(&"tbsp"));
        assert!(variants.contains(&"T"));
        assert!(unit_variants("furlong").is_empty());
    }

    #[test]
    fn test_membership() {
        assert!(is_known_unit("T"));
        assert!(is_known_unit("Grams"));
        assert!(!is_known_unit("eggs"));
    }
}
