//! Turning loosely typed model output into a canonical [`ParsedRecipe`].

use crate::extractors::parsing::{
    parse_duration, parse_fraction, parse_ingredient_line, parse_yield, resolve_url, string_list,
};
use crate::model::{
    Confidence, Ingredient, IngredientSection, InputKind, Instruction, InstructionSection,
    ParsedRecipe, SourceType, SuggestedTag,
};
use crate::units::normalize_unit;
use log::debug;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

static SPOKEN_DURATION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:(?:(\d+)\s*(?:h|hrs?|hours?))?\s*(?:(\d+)\s*(?:m|mins?|minutes?))?|(\d+))$",
    )
    .expect("valid duration regex")
});

/// Builds a recipe from the model's JSON payload.
///
/// Accepts sectioned (`ingredientSections`/`instructionSections`) or flat
/// (`ingredients`/`instructions`) lists whose items are either strings or
/// objects. Never fails; required-field problems are left for validation.
pub fn assemble_recipe(
    value: &Value,
    source_type: SourceType,
    source_url: Option<&str>,
) -> ParsedRecipe {
    let name = first_string(value.get("name")).unwrap_or_default();

    let recipe = ParsedRecipe {
        name,
        description: first_string(value.get("description")),
        prep_time: value.get("prepTime").and_then(minutes),
        cook_time: value.get("cookTime").and_then(minutes),
        total_time: value.get("totalTime").and_then(minutes),
        servings: value
            .get("servings")
            .or_else(|| value.get("recipeYield"))
            .and_then(parse_yield),
        source_url: source_url.map(str::to_string),
        source_type,
        ingredient_sections: ingredient_sections(value),
        instruction_sections: instruction_sections(value),
        images: images(value),
        suggested_tags: suggested_tags(value),
    };

    canonicalize(recipe)
}

/// Drops empty items and sections, re-indexes every section from 0 and
/// normalizes units.
pub fn canonicalize(mut recipe: ParsedRecipe) -> ParsedRecipe {
    recipe.name = recipe.name.trim().to_string();

    for section in &mut recipe.ingredient_sections {
        section.ingredients.retain(|ingredient| !ingredient.name.trim().is_empty());
        for (index, ingredient) in section.ingredients.iter_mut().enumerate() {
            ingredient.index = index;
            ingredient.name = ingredient.name.trim().to_string();
            ingredient.unit = normalize_unit(ingredient.unit.as_deref());
        }
    }
    recipe
        .ingredient_sections
        .retain(|section| !section.ingredients.is_empty());

    for section in &mut recipe.instruction_sections {
        section.instructions.retain(|step| !step.instruction.trim().is_empty());
        for (index, step) in section.instructions.iter_mut().enumerate() {
            step.index = index;
            step.instruction = step.instruction.trim().to_string();
        }
    }
    recipe
        .instruction_sections
        .retain(|section| !section.instructions.is_empty());

    recipe
}

/// `high` needs at least 3 ingredients, 2 instructions and a name longer
/// than 3 characters; otherwise fewer than 2 ingredients or no instruction is
/// `low`; everything else is `medium`. Image sources never rate `high`.
pub fn compute_confidence(recipe: &ParsedRecipe, source: InputKind) -> Confidence {
    let ingredients = recipe.ingredient_count();
    let instructions = recipe.instruction_count();
    let name_length = recipe.name.trim().chars().count();

    let confidence = if ingredients >= 3 && instructions >= 2 && name_length > 3 {
        Confidence::High
    } else if ingredients < 2 || instructions < 1 {
        Confidence::Low
    } else {
        Confidence::Medium
    };

    match source {
        InputKind::Image => confidence.min(Confidence::Medium),
        _ => confidence,
    }
}

/// Fills optional fields the model left empty from the page's structured
/// data. Name, ingredients and instructions always come from the model.
pub fn merge_structured(mut recipe: ParsedRecipe, structured: &ParsedRecipe) -> ParsedRecipe {
    if recipe.description.is_none() {
        recipe.description = structured.description.clone();
    }
    recipe.prep_time = recipe.prep_time.or(structured.prep_time);
    recipe.cook_time = recipe.cook_time.or(structured.cook_time);
    recipe.total_time = recipe.total_time.or(structured.total_time);
    recipe.servings = recipe.servings.or(structured.servings);
    if recipe.images.is_empty() {
        recipe.images = structured.images.clone();
    }
    if recipe.suggested_tags.is_none() {
        recipe.suggested_tags = structured.suggested_tags.clone();
    }
    recipe
}

fn first_string(value: Option<&Value>) -> Option<String> {
    value
        .and_then(|value| string_list(value).into_iter().next())
        .filter(|text| !text.is_empty())
}

fn minutes(value: &Value) -> Option<u32> {
    match value {
        Value::Number(number) => number
            .as_f64()
            .filter(|m| *m > 0.0)
            .map(|m| m.round() as u32)
            .filter(|m| *m > 0),
        Value::String(text) => parse_duration(text).or_else(|| spoken_minutes(text)),
        _ => None,
    }
}

/// `45`, `45 min`, `1 hour`, `1h 30m`, `2 hours 15 minutes`. Anything else
/// is `None` rather than a guess.
fn spoken_minutes(text: &str) -> Option<u32> {
    let captures = SPOKEN_DURATION_REGEX.captures(text.trim())?;
    let part = |index: usize| -> Option<u32> {
        captures.get(index).and_then(|m| m.as_str().parse().ok())
    };

    let minutes = match (part(1), part(2), part(3)) {
        (None, None, Some(bare)) => bare,
        (None, None, None) => return None,
        (hours, minutes, None) => hours
            .unwrap_or(0)
            .checked_mul(60)?
            .checked_add(minutes.unwrap_or(0))?,
        _ => return None,
    };
    Some(minutes).filter(|m| *m > 0)
}

fn quantity(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => parse_fraction(text),
        _ => None,
    }
}

fn text_field(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| map.get(*key).and_then(Value::as_str))
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

fn ingredient(item: &Value) -> Option<Ingredient> {
    match item {
        Value::String(line) => {
            let parts = parse_ingredient_line(line);
            Some(Ingredient {
                index: 0,
                quantity: parts.quantity,
                unit: parts.unit,
                name: parts.name,
            })
        }
        Value::Object(map) => {
            let name = text_field(map, &["name", "ingredient", "item", "text"])?;
            Some(Ingredient {
                index: 0,
                quantity: quantity(map.get("quantity").or_else(|| map.get("amount"))),
                unit: text_field(map, &["unit"]),
                name,
            })
        }
        _ => None,
    }
}

fn instruction(item: &Value) -> Option<Instruction> {
    match item {
        Value::String(text) => Some(Instruction {
            index: 0,
            instruction: text.clone(),
            image_url: None,
        }),
        Value::Object(map) => Some(Instruction {
            index: 0,
            instruction: text_field(map, &["instruction", "text", "step", "description"])?,
            image_url: text_field(map, &["imageUrl", "image_url", "image"])
                .and_then(|url| resolve_url(None, &url)),
        }),
        _ => None,
    }
}

fn items(value: Option<&Value>) -> &[Value] {
    value.and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[])
}

fn section_name(section: &Value) -> Option<String> {
    section
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

fn ingredient_sections(value: &Value) -> Vec<IngredientSection> {
    if let Some(sections) = value.get("ingredientSections").and_then(Value::as_array) {
        return sections
            .iter()
            .map(|section| IngredientSection {
                name: section_name(section),
                ingredients: items(section.get("ingredients"))
                    .iter()
                    .filter_map(ingredient)
                    .collect(),
            })
            .collect();
    }

    debug!("Model returned flat ingredients");
    vec![IngredientSection {
        name: None,
        ingredients: items(value.get("ingredients"))
            .iter()
            .filter_map(ingredient)
            .collect(),
    }]
}

fn instruction_sections(value: &Value) -> Vec<InstructionSection> {
    if let Some(sections) = value.get("instructionSections").and_then(Value::as_array) {
        return sections
            .iter()
            .map(|section| InstructionSection {
                name: section_name(section),
                instructions: items(
                    section
                        .get("instructions")
                        .or_else(|| section.get("steps")),
                )
                .iter()
                .filter_map(instruction)
                .collect(),
            })
            .collect();
    }

    vec![InstructionSection {
        name: None,
        instructions: items(value.get("instructions"))
            .iter()
            .filter_map(instruction)
            .collect(),
    }]
}

fn images(value: &Value) -> Vec<String> {
    let mut images: Vec<String> = Vec::new();
    for key in ["images", "image"] {
        for url in value
            .get(key)
            .map(string_list)
            .unwrap_or_default()
            .iter()
            .filter_map(|url| resolve_url(None, url))
        {
            if !images.contains(&url) {
                images.push(url);
            }
        }
    }
    images
}

fn suggested_tags(value: &Value) -> Option<Vec<SuggestedTag>> {
    let tags: Vec<SuggestedTag> = items(value.get("suggestedTags"))
        .iter()
        .filter_map(|tag| serde_json::from_value(tag.clone()).ok())
        .collect();
    if tags.is_empty() {
        None
    } else {
        Some(tags)
    }
}
