use super::parsing::{
    collapse_whitespace, decode_html_symbols, derive_tags, parse_duration, parse_ingredient_line,
    parse_yield_text, resolve_url,
};
use super::{Extractor, ParsingContext};
use crate::model::{
    Ingredient, IngredientSection, Instruction, InstructionSection, ParsedRecipe, SourceType,
};
use log::debug;
use scraper::{ElementRef, Selector};
use std::sync::LazyLock;
use url::Url;

static ITEMSCOPE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[itemscope]").expect("valid itemscope selector"));

static LIST_ITEM_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("li").expect("valid li selector"));

/// Reads schema.org `Recipe` microdata. Produces a single heading-less
/// section for ingredients and for instructions.
pub struct MicroDataExtractor;

fn element_text(el: ElementRef) -> String {
    collapse_whitespace(&decode_html_symbols(&el.text().collect::<Vec<_>>().join(" ")))
}

fn itemprop_selector(prop: &str) -> Option<Selector> {
    Selector::parse(&format!("[itemprop='{}']", prop)).ok()
}

impl MicroDataExtractor {
    fn find_recipe_container<'a>(&self, document: &'a scraper::Html) -> Option<ElementRef<'a>> {
        document.select(&ITEMSCOPE_SELECTOR).find(|element| {
            element.value().attr("itemtype").is_some_and(|itemtype| {
                itemtype.contains("schema.org/Recipe")
                    || itemtype.contains("data-vocabulary.org/Recipe")
            })
        })
    }

    /// Machine-readable value first (`content`, `datetime`), then text.
    fn get_itemprop(&self, root: ElementRef, prop: &str) -> Option<String> {
        let selector = itemprop_selector(prop)?;
        let el = root.select(&selector).next()?;
        let value = el
            .value()
            .attr("content")
            .or_else(|| el.value().attr("datetime"))
            .map(|v| collapse_whitespace(&decode_html_symbols(v)))
            .unwrap_or_else(|| element_text(el));
        Some(value).filter(|v| !v.is_empty())
    }

    fn get_itemprop_list(&self, root: ElementRef, prop: &str) -> Vec<String> {
        let Some(selector) = itemprop_selector(prop) else {
            return Vec::new();
        };
        root.select(&selector)
            .flat_map(|el| {
                let items: Vec<String> = el
                    .select(&LIST_ITEM_SELECTOR)
                    .map(element_text)
                    .filter(|t| !t.is_empty())
                    .collect();
                if items.is_empty() {
                    vec![element_text(el)]
                } else {
                    items
                }
            })
            .filter(|t| !t.is_empty())
            .collect()
    }

    fn get_images(&self, root: ElementRef, base: Option<&Url>) -> Vec<String> {
        let Some(selector) = itemprop_selector("image") else {
            return Vec::new();
        };
        let mut images: Vec<String> = Vec::new();
        for el in root.select(&selector) {
            let raw = el
                .value()
                .attr("src")
                .or_else(|| el.value().attr("content"))
                .or_else(|| el.value().attr("href"));
            if let Some(url) = raw.and_then(|raw| resolve_url(base, raw)) {
                if !images.contains(&url) {
                    images.push(url);
                }
            }
        }
        images
    }
}

impl Extractor for MicroDataExtractor {
    fn name(&self) -> &'static str {
        "microdata"
    }

    fn parse(&self, context: &ParsingContext) -> Option<ParsedRecipe> {
        debug!("Attempting to extract recipe using MicroData extractor");

        // Scoped to the Recipe item so site-wide `itemprop="name"` noise is ignored.
        let container = self.find_recipe_container(&context.document)?;
        let base = Url::parse(&context.url).ok();

        let name = self.get_itemprop(container, "name")?;

        let mut ingredient_lines = self.get_itemprop_list(container, "recipeIngredient");
        if ingredient_lines.is_empty() {
            ingredient_lines = self.get_itemprop_list(container, "ingredients");
        }
        let steps = self.get_itemprop_list(container, "recipeInstructions");
        if ingredient_lines.is_empty() || steps.is_empty() {
            debug!("MicroDataExtractor: '{}' lacks ingredients or instructions", name);
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
        let instructions = steps
            .into_iter()
            .enumerate()
            .map(|(index, instruction)| Instruction {
                index,
                instruction,
                image_url: None,
            })
            .collect();

        let cuisine: Vec<String> = self.get_itemprop(container, "recipeCuisine").into_iter().collect();
        let category: Vec<String> = self
            .get_itemprop(container, "recipeCategory")
            .into_iter()
            .collect();
        let tags = derive_tags(&cuisine, &category);

        Some(ParsedRecipe {
            name,
            description: self.get_itemprop(container, "description"),
            prep_time: self
                .get_itemprop(container, "prepTime")
                .and_then(|t| parse_duration(&t)),
            cook_time: self
                .get_itemprop(container, "cookTime")
                .and_then(|t| parse_duration(&t)),
            total_time: self
                .get_itemprop(container, "totalTime")
                .and_then(|t| parse_duration(&t)),
            servings: self
                .get_itemprop(container, "recipeYield")
                .and_then(|y| parse_yield_text(&y)),
            source_url: Some(context.url.clone()),
            source_type: SourceType::Url,
            ingredient_sections: vec![IngredientSection {
                name: None,
                ingredients,
            }],
            instruction_sections: vec![InstructionSection {
                name: None,
                instructions,
            }],
            images: self.get_images(container, base.as_ref()),
            suggested_tags: if tags.is_empty() { None } else { Some(tags) },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn context(body: &str) -> ParsingContext {
        ParsingContext {
            url: "https://example.com/r/pancakes".to_string(),
            document: Html::parse_document(&format!("<html><body>{body}</body></html>")),
        }
    }

    #[test]
    fn test_microdata_recipe() {
        let body = r#"
        <span itemprop="name">Site title</span>
        <div itemscope itemtype="https://schema.org/Recipe">
            <h1 itemprop="name">Pancakes</h1>
            <img itemprop="image" src="/img/pancakes.jpg">
            <meta itemprop="prepTime" content="PT10M">
            <time itemprop="cookTime" datetime="PT1H">1 hour</time>
            <span itemprop="recipeYield">Serves 4</span>
            <span itemprop="recipeCuisine">French</span>
            <ul>
                <li itemprop="recipeIngredient">2 cups flour</li>
                <li itemprop="recipeIngredient">2 eggs</li>
            </ul>
            <ol itemprop="recipeInstructions">
                <li>Whisk everything.</li>
                <li>Fry in a hot pan.</li>
            </ol>
        </div>
        "#;

        let recipe = MicroDataExtractor.parse(&context(body)).unwrap();
        assert_eq!(recipe.name, "Pancakes");
        assert_eq!(recipe.prep_time, Some(10));
        assert_eq!(recipe.cook_time, Some(60));
        assert_eq!(recipe.servings, Some(4));
        assert_eq!(recipe.images, vec!["https://example.com/img/pancakes.jpg"]);
        assert_eq!(recipe.ingredient_sections[0].ingredients[1].quantity, Some(2.0));
        assert_eq!(recipe.instruction_sections[0].instructions.len(), 2);
        assert_eq!(recipe.suggested_tags.unwrap()[0].name, "French");
    }

    #[test]
    fn test_loose_itemprops_without_container_are_ignored() {
        let body = r#"
        <h1 itemprop="name">Pancakes</h1>
        <li itemprop="recipeIngredient">flour</li>
        <p itemprop="recipeInstructions">Mix</p>
        "#;
        assert!(MicroDataExtractor.parse(&context(body)).is_none());
    }
}
