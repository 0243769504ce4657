use super::parsing::{
    collapse_whitespace, decode_html_symbols, derive_tags, parse_duration, parse_ingredient_line,
    parse_yield, resolve_url, string_list,
};
use super::{Extractor, ParsingContext};
use crate::model::{
    Ingredient, IngredientSection, Instruction, InstructionSection, ParsedRecipe, SourceType,
};
use log::debug;
use regex::Regex;
use scraper::Selector;
use serde::Deserialize;
use serde_json::Value;
use std::sync::LazyLock;
use url::Url;

static JSON_LD_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("script[type='application/ld+json']").expect("valid JSON-LD selector")
});

static TAG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid tag regex"));

static TRAILING_COMMA_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*([\]}])").expect("valid trailing comma regex"));

pub struct JsonLdExtractor;

#[derive(Debug, Deserialize)]
struct JsonLdRecipe {
    name: Option<Value>,
    description: Option<Value>,
    image: Option<ImageField>,
    #[serde(rename = "recipeIngredient")]
    recipe_ingredient: Option<Value>,
    /// Pre-2016 schema.org spelling
    ingredients: Option<Value>,
    #[serde(rename = "recipeInstructions")]
    recipe_instructions: Option<InstructionNode>,
    #[serde(rename = "recipeYield")]
    recipe_yield: Option<Value>,
    #[serde(rename = "yield")]
    yield_value: Option<Value>,
    #[serde(rename = "prepTime")]
    prep_time: Option<Value>,
    #[serde(rename = "cookTime")]
    cook_time: Option<Value>,
    #[serde(rename = "totalTime")]
    total_time: Option<Value>,
    #[serde(rename = "recipeCuisine")]
    recipe_cuisine: Option<Value>,
    #[serde(rename = "recipeCategory")]
    recipe_category: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ImageField {
    Url(String),
    // Before Object: derived structs also accept sequences
    List(Vec<ImageField>),
    Object(ImageObject),
    Other(Value),
}

#[derive(Debug, Deserialize)]
struct ImageObject {
    url: Option<String>,
    #[serde(rename = "contentUrl")]
    content_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InstructionNode {
    Text(String),
    List(Vec<InstructionNode>),
    Node(HowToNode),
    Other(Value),
}

#[derive(Debug, Deserialize)]
struct HowToNode {
    #[serde(rename = "@type")]
    node_type: Option<Value>,
    text: Option<String>,
    name: Option<String>,
    image: Option<ImageField>,
    #[serde(rename = "itemListElement")]
    item_list_element: Option<Box<InstructionNode>>,
}

#[derive(Debug, Default)]
struct StepDraft {
    text: String,
    image_url: Option<String>,
}

#[derive(Debug, Default)]
struct InstructionDrafts {
    ungrouped: Vec<StepDraft>,
    sections: Vec<(String, Vec<StepDraft>)>,
}

impl ImageField {
    fn urls(&self, base: Option<&Url>) -> Vec<String> {
        match self {
            ImageField::Url(url) => resolve_url(base, &decode_html_symbols(url))
                .into_iter()
                .collect(),
            ImageField::Object(obj) => obj
                .url
                .as_deref()
                .or(obj.content_url.as_deref())
                .and_then(|url| resolve_url(base, url))
                .into_iter()
                .collect(),
            ImageField::List(items) => items.iter().flat_map(|item| item.urls(base)).collect(),
            ImageField::Other(_) => Vec::new(),
        }
    }
}

impl HowToNode {
    fn is_section(&self) -> bool {
        let declared = self
            .node_type
            .as_ref()
            .map(|t| type_matches(t, "HowToSection"))
            .unwrap_or(false);
        declared || (self.item_list_element.is_some() && self.text.is_none())
    }
}

impl InstructionDrafts {
    fn collect(&mut self, node: InstructionNode, base: Option<&Url>) {
        match node {
            InstructionNode::Text(text) => self.ungrouped.extend(split_steps(&text)),
            InstructionNode::List(items) => {
                for item in items {
                    self.collect(item, base);
                }
            }
            InstructionNode::Node(node) if node.is_section() => {
                let mut steps = Vec::new();
                if let Some(children) = node.item_list_element {
                    flatten_steps(*children, base, &mut steps);
                }
                match node.name.map(|n| clean_text(&n)).filter(|n| !n.is_empty()) {
                    Some(name) => self.sections.push((name, steps)),
                    None => self.ungrouped.extend(steps),
                }
            }
            InstructionNode::Node(node) => {
                if let Some(step) = step_from_node(node, base) {
                    self.ungrouped.push(step);
                }
            }
            InstructionNode::Other(value) => {
                debug!("JsonLdExtractor: skipping unrecognized instruction node {value}");
            }
        }
    }

    /// Ungrouped steps form the heading-less section, which always leads.
    fn into_sections(self) -> Vec<InstructionSection> {
        let mut sections = Vec::new();
        if !self.ungrouped.is_empty() {
            sections.push(build_instruction_section(None, self.ungrouped));
        }
        for (name, steps) in self.sections {
            if !steps.is_empty() {
                sections.push(build_instruction_section(Some(name), steps));
            }
        }
        sections
    }
}

fn flatten_steps(node: InstructionNode, base: Option<&Url>, out: &mut Vec<StepDraft>) {
    match node {
        InstructionNode::Text(text) => out.extend(split_steps(&text)),
        InstructionNode::List(items) => {
            for item in items {
                flatten_steps(item, base, out);
            }
        }
        InstructionNode::Node(node) if node.is_section() => {
            if let Some(children) = node.item_list_element {
                flatten_steps(*children, base, out);
            }
        }
        InstructionNode::Node(node) => out.extend(step_from_node(node, base)),
        InstructionNode::Other(_) => {}
    }
}

fn step_from_node(node: HowToNode, base: Option<&Url>) -> Option<StepDraft> {
    let text = node
        .text
        .or(node.name)
        .map(|t| clean_text(&t))
        .filter(|t| !t.is_empty())?;
    let image_url = node
        .image
        .as_ref()
        .and_then(|image| image.urls(base).into_iter().next());
    Some(StepDraft { text, image_url })
}

fn split_steps(text: &str) -> Vec<StepDraft> {
    let decoded = decode_html_symbols(text);
    let with_breaks = decoded
        .replace("<br>", "\n")
        .replace("<br/>", "\n")
        .replace("<br />", "\n")
        .replace("</p>", "\n")
        .replace("</li>", "\n");
    with_breaks
        .lines()
        .map(clean_text)
        .filter(|line| !line.is_empty())
        .map(|text| StepDraft {
            text,
            image_url: None,
        })
        .collect()
}

fn build_instruction_section(name: Option<String>, steps: Vec<StepDraft>) -> InstructionSection {
    InstructionSection {
        name,
        instructions: steps
            .into_iter()
            .enumerate()
            .map(|(index, step)| Instruction {
                index,
                instruction: step.text,
                image_url: step.image_url,
            })
            .collect(),
    }
}

fn clean_text(text: &str) -> String {
    let decoded = decode_html_symbols(text);
    collapse_whitespace(&TAG_REGEX.replace_all(&decoded, " "))
}

fn type_matches(value: &Value, wanted: &str) -> bool {
    let matches = |s: &str| {
        let local = s.rsplit(['/', ':']).next().unwrap_or(s);
        local.eq_ignore_ascii_case(wanted)
    };
    match value {
        Value::String(s) => matches(s),
        Value::Array(items) => items.iter().any(|item| item.as_str().is_some_and(matches)),
        _ => false,
    }
}

fn is_recipe_type(value: &Value) -> bool {
    value
        .get("@type")
        .map(|t| type_matches(t, "Recipe"))
        .unwrap_or(false)
}

/// Depth-first search for the first node typed `Recipe`, looking through
/// arrays, `@graph` wrappers and nested objects.
pub(crate) fn find_recipe(value: &Value) -> Option<&Value> {
    match value {
        Value::Object(map) => {
            if is_recipe_type(value) {
                return Some(value);
            }
            if let Some(found) = map.get("@graph").and_then(find_recipe) {
                return Some(found);
            }
            map.iter()
                .filter(|(key, _)| key.as_str() != "@graph")
                .find_map(|(_, child)| find_recipe(child))
        }
        Value::Array(items) => items.iter().find_map(find_recipe),
        _ => None,
    }
}

pub(crate) fn sanitize_json(json_str: &str) -> String {
    let cleaned = json_str
        .trim()
        .trim_start_matches("<![CDATA[")
        .trim_end_matches("]]>")
        .replace("<!--", "")
        .replace("-->", "");
    TRAILING_COMMA_REGEX.replace_all(&cleaned, "$1").into_owned()
}

pub(crate) fn parse_json_ld_block(raw: &str) -> Option<Value> {
    serde_json::from_str::<Value>(raw)
        .or_else(|_| serde_json::from_str::<Value>(&sanitize_json(raw)))
        .ok()
}

/// Every JSON-LD block on the page that parses as JSON, in document order.
pub(crate) fn json_ld_blocks(document: &scraper::Html) -> Vec<Value> {
    document
        .select(&JSON_LD_SELECTOR)
        .filter_map(|script| {
            let raw = script.inner_html();
            let parsed = parse_json_ld_block(&raw);
            if parsed.is_none() {
                debug!("JsonLdExtractor: skipping unparseable JSON-LD block");
            }
            parsed
        })
        .collect()
}

fn minutes(value: &Option<Value>) -> Option<u32> {
    value.as_ref().and_then(Value::as_str).and_then(parse_duration)
}

impl JsonLdExtractor {
    fn convert_to_recipe(&self, recipe: JsonLdRecipe, url: &str) -> Option<ParsedRecipe> {
        let base = Url::parse(url).ok();

        let name = recipe
            .name
            .as_ref()
            .and_then(|value| string_list(value).into_iter().next())
            .map(|name| clean_text(&name))
            .filter(|name| !name.is_empty());
        let Some(name) = name else {
            debug!("JsonLdExtractor: recipe has no name");
            return None;
        };

        let ingredient_lines: Vec<String> = recipe
            .recipe_ingredient
            .as_ref()
            .or(recipe.ingredients.as_ref())
            .map(string_list)
            .unwrap_or_default()
            .into_iter()
            .map(|line| clean_text(&line))
            .filter(|line| !line.is_empty())
            .collect();
        if ingredient_lines.is_empty() {
            debug!("JsonLdExtractor: recipe '{}' has no ingredients", name);
            return None;
        }

        let mut drafts = InstructionDrafts::default();
        if let Some(instructions) = recipe.recipe_instructions {
            drafts.collect(instructions, base.as_ref());
        }
        let instruction_sections = drafts.into_sections();
        if instruction_sections.is_empty() {
            debug!("JsonLdExtractor: recipe '{}' has no instructions", name);
            return None;
        }

        let ingredients = ingredient_lines
            .iter()
            .enumerate()
            .map(|(index, line)| {
                let parts = parse_ingredient_line(line);
                Ingredient {
                    index,
                    quantity: parts.quantity,
                    unit: parts.unit,
                    name: parts.name,
                }
            })
            .collect();

        let description = recipe
            .description
            .as_ref()
            .and_then(|value| string_list(value).into_iter().next())
            .map(|text| clean_text(&text))
            .filter(|text| !text.is_empty());

        let mut images: Vec<String> = Vec::new();
        for image in recipe
            .image
            .as_ref()
            .map(|image| image.urls(base.as_ref()))
            .unwrap_or_default()
        {
            if !images.contains(&image) {
                images.push(image);
            }
        }

        let servings = recipe
            .recipe_yield
            .as_ref()
            .or(recipe.yield_value.as_ref())
            .and_then(parse_yield);

        let cuisine = recipe.recipe_cuisine.as_ref().map(string_list).unwrap_or_default();
        let category = recipe
            .recipe_category
            .as_ref()
            .map(string_list)
            .unwrap_or_default();
        let tags = derive_tags(&cuisine, &category);

        Some(ParsedRecipe {
            name,
            description,
            prep_time: minutes(&recipe.prep_time),
            cook_time: minutes(&recipe.cook_time),
            total_time: minutes(&recipe.total_time),
            servings,
            source_url: Some(url.to_string()),
            source_type: SourceType::Url,
            ingredient_sections: vec![IngredientSection {
                name: None,
                ingredients,
            }],
            instruction_sections,
            images,
            suggested_tags: if tags.is_empty() { None } else { Some(tags) },
        })
    }
}

impl Extractor for JsonLdExtractor {
    fn name(&self) -> &'static str {
        "json_ld"
    }

    fn parse(&self, context: &ParsingContext) -> Option<ParsedRecipe> {
        debug!("JsonLdExtractor: Starting parse for URL: {}", context.url);

        let blocks = json_ld_blocks(&context.document);
        debug!("JsonLdExtractor: Found {} JSON-LD blocks", blocks.len());

        let recipe_json = blocks.iter().find_map(find_recipe)?;
        match serde_json::from_value::<JsonLdRecipe>(recipe_json.clone()) {
            Ok(recipe) => self.convert_to_recipe(recipe, &context.url),
            Err(e) => {
                debug!("JsonLdExtractor: Failed to read Recipe node: {}", e);
                None
            }
        }
    }
}
