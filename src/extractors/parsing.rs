//! Field-level parsing shared by the structured-data extractors and the
//! recipe assembler.

use std::sync::LazyLock;

use html_escape::decode_html_entities;
use regex::Regex;
use serde_json::Value;
use url::Url;

use crate::model::{SuggestedTag, TagType};
use crate::units::{is_known_unit, normalize_unit};

static DURATION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^P(?:(\d+(?:\.\d+)?)D)?(?:T(?:(\d+(?:\.\d+)?)H)?(?:(\d+(?:\.\d+)?)M)?(?:(\d+(?:\.\d+)?)S)?)?$",
    )
    .expect("valid duration regex")
});

/// Yield patterns in priority order; the first capture group is the count.
static YIELD_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)(\d+)\s*servings?",
        r"(?i)serves\s*:?\s*(\d+)",
        r"(?i)makes\s*:?\s*(\d+)",
        r"(?i)(\d+)\s*portions?",
        r"(?i)(\d+)\s*people",
        r"(?i)yield\s*:?\s*(\d+)",
        r"^\s*(\d+)\s*$",
        r"(\d+)\s*-\s*\d+",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("valid yield regex"))
    .collect()
});

static QUANTITY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d+\s+\d+/\d+|\d+\s*[½⅓⅔¼¾⅛⅜⅝⅞]|\d+/\d+|\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:[.,]\d+)?|[½⅓⅔¼¾⅛⅜⅝⅞])\s*(.*)$")
        .expect("valid quantity regex")
});

/// `1,000` and `12,500.5`: commas here group thousands rather than mark decimals.
static THOUSANDS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{1,3}(?:,\d{3})+(?:\.\d+)?$").expect("valid thousands regex")
});

static MEAL_TYPES: &[(&str, &str)] = &[
    ("breakfast", "Breakfast"),
    ("lunch", "Lunch"),
    ("dinner", "Dinner"),
    ("dessert", "Dessert"),
    ("snack", "Snack"),
    ("appetizer", "Appetizer"),
    ("main course", "Main Course"),
    ("side dish", "Side Dish"),
];

const MAX_CUISINE_TAGS: usize = 2;

/// A single ingredient line split into its parts.
#[derive(Debug, Clone, PartialEq)]
pub struct IngredientParts {
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub name: String,
}

/// Converts an ISO-8601 duration (`PT1H30M`) to whole minutes, rounding
/// seconds up. Zero, negative and malformed durations give `None`.
pub fn parse_duration(duration: &str) -> Option<u32> {
    let trimmed = duration.trim();
    if trimmed.len() < 2 || trimmed.eq_ignore_ascii_case("PT") {
        return None;
    }
    let captures = DURATION_REGEX.captures(trimmed)?;

    let component = |index: usize| -> f64 {
        captures
            .get(index)
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .unwrap_or(0.0)
    };

    let minutes =
        component(1) * 24.0 * 60.0 + component(2) * 60.0 + component(3) + component(4) / 60.0;
    let minutes = minutes.ceil();
    if minutes <= 0.0 || minutes > u32::MAX as f64 {
        return None;
    }
    Some(minutes as u32)
}

/// Parses a quantity token: integers, decimals, simple fractions, mixed
/// numbers and unicode vulgar fractions. Division by zero gives `None`.
pub fn parse_fraction(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Some((whole, rest)) = text.split_once(char::is_whitespace) {
        let whole: f64 = whole.trim().parse().ok()?;
        let fraction = parse_fraction(rest)?;
        return Some(whole + fraction);
    }

    let mut chars = text.chars();
    if let Some(last) = chars.next_back() {
        if let Some(vulgar) = vulgar_fraction(last) {
            let head = chars.as_str();
            if head.is_empty() {
                return Some(vulgar);
            }
            let whole: f64 = head.parse().ok()?;
            return Some(whole + vulgar);
        }
    }

    if let Some((numerator, denominator)) = text.split_once('/') {
        let numerator: f64 = numerator.trim().parse().ok()?;
        let denominator: f64 = denominator.trim().parse().ok()?;
        if denominator == 0.0 {
            return None;
        }
        return Some(numerator / denominator);
    }

    let number = if THOUSANDS_REGEX.is_match(text) {
        text.replace(',', "")
    } else {
        text.replace(',', ".")
    };
    number.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn vulgar_fraction(c: char) -> Option<f64> {
    let value = match c {
        '½' => 1.0 / 2.0,
        '⅓' => 1.0 / 3.0,
        '⅔' => 2.0 / 3.0,
        '¼' => 1.0 / 4.0,
        '¾' => 3.0 / 4.0,
        '⅛' => 1.0 / 8.0,
        '⅜' => 3.0 / 8.0,
        '⅝' => 5.0 / 8.0,
        '⅞' => 7.0 / 8.0,
        _ => return None,
    };
    Some(value)
}

/// Splits an ingredient line into quantity, canonical unit and name.
///
/// A unit is only recognized directly after a quantity.
pub fn parse_ingredient_line(line: &str) -> IngredientParts {
    let line = collapse_whitespace(line);

    let Some(captures) = QUANTITY_REGEX.captures(&line) else {
        return IngredientParts {
            quantity: None,
            unit: None,
            name: line,
        };
    };

    let quantity = captures.get(1).and_then(|m| parse_fraction(m.as_str()));
    let rest = captures.get(2).map(|m| m.as_str().trim()).unwrap_or_default();

    if quantity.is_none() {
        return IngredientParts {
            quantity: None,
            unit: None,
            name: line,
        };
    }

    let (unit, name) = split_unit(rest);
    IngredientParts {
        quantity,
        unit,
        name: if name.is_empty() { rest.to_string() } else { name },
    }
}

fn split_unit(rest: &str) -> (Option<String>, String) {
    // "fl oz" is the only two-word spelling worth looking ahead for
    let mut words = rest.splitn(3, char::is_whitespace);
    let first = words.next().unwrap_or_default();
    let second = words.next().unwrap_or_default();

    if !second.is_empty() {
        let two_word = format!("{first} {second}");
        let candidate = if is_known_unit(&two_word) {
            Some(two_word.as_str())
        } else {
            Some(two_word.trim_end_matches('.')).filter(|c| is_known_unit(c))
        };
        if let Some(candidate) = candidate {
            let remainder = rest[first.len()..].trim_start()[second.len()..].trim();
            return (normalize_unit(Some(candidate)), remainder.to_string());
        }
    }

    let token = first.trim_end_matches(['.', ',']);
    if !token.is_empty() && is_known_unit(token) {
        let remainder = rest[first.len()..].trim().trim_start_matches("of ").trim();
        return (normalize_unit(Some(token)), remainder.to_string());
    }

    (None, rest.to_string())
}

/// Reads a serving count from a `recipeYield`-like value.
///
/// Numbers are taken as-is; strings go through the yield patterns in
/// priority order; arrays use the first element that yields a count.
pub fn parse_yield(value: &Value) -> Option<i32> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|f| f.round() as i64))
            .and_then(|n| i32::try_from(n).ok()),
        Value::String(text) => parse_yield_text(text),
        Value::Array(items) => items.iter().find_map(parse_yield),
        _ => None,
    }
}

pub fn parse_yield_text(text: &str) -> Option<i32> {
    YIELD_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures(text)
            .and_then(|captures| captures.get(1))
            .and_then(|m| m.as_str().parse::<i32>().ok())
    })
}

/// Derives up to two cuisine tags and at most one meal-type tag.
pub fn derive_tags(cuisine: &[String], category: &[String]) -> Vec<SuggestedTag> {
    let mut tags: Vec<SuggestedTag> = Vec::new();

    for name in cuisine
        .iter()
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|name| !name.is_empty())
    {
        if tags.len() >= MAX_CUISINE_TAGS {
            break;
        }
        if tags.iter().any(|tag| tag.name.eq_ignore_ascii_case(name)) {
            continue;
        }
        tags.push(SuggestedTag {
            tag_type: TagType::Cuisine,
            name: name.to_string(),
        });
    }

    let meal_type = category.iter().find_map(|value| {
        let lowered = value.to_lowercase();
        MEAL_TYPES
            .iter()
            .find(|(needle, _)| lowered.contains(needle))
            .map(|(_, name)| *name)
    });
    if let Some(name) = meal_type {
        tags.push(SuggestedTag {
            tag_type: TagType::MealType,
            name: name.to_string(),
        });
    }

    tags
}

/// Flattens a string-or-array JSON value into trimmed strings.
pub fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::String(text) => vec![decode_html_symbols(text)],
        Value::Array(items) => items.iter().flat_map(string_list).collect(),
        Value::Object(map) => map
            .get("name")
            .or_else(|| map.get("text"))
            .map(string_list)
            .unwrap_or_default(),
        _ => Vec::new(),
    }
    .into_iter()
    .map(|text| text.trim().to_string())
    .filter(|text| !text.is_empty())
    .collect()
}

pub fn decode_html_symbols(text: &str) -> String {
    // for some reason need to decode twice to get the correct string
    decode_html_entities(&decode_html_entities(text)).into_owned()
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Resolves `raw` against `base`, keeping only http(s) results.
pub fn resolve_url(base: Option<&Url>, raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with("data:") {
        return None;
    }
    let resolved = match Url::parse(raw) {
        Ok(url) => url,
        Err(_) => base?.join(raw).ok()?,
    };
    match resolved.scheme() {
        "http" | "https" => Some(resolved.to_string()),
        _ => None,
    }
}
