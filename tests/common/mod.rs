#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use mockito::Server;
use recipe_parser::config::SocialConfig;
use recipe_parser::providers::OpenAIProvider;
use recipe_parser::{ParserConfig, RecipeParser, RecipeParserBuilder};
use serde_json::{json, Value};

/// Single fetch attempt, no backoff, every endpoint on the mock server.
pub fn test_config(server_url: &str) -> ParserConfig {
    let mut config = ParserConfig::default();
    config.fetch.max_attempts = 1;
    config.fetch.base_delay_ms = 0;
    config.fetch.timeout_secs = 5;
    config.social = SocialConfig {
        tiktok_oembed_url: format!("{server_url}/oembed"),
        instagram_oembed_url: format!("{server_url}/instagram_oembed"),
        instagram_access_token: None,
        min_caption_length: 50,
    };
    config
}

/// Builder with the model pointed at the mock server and no browser.
pub fn builder(server: &Server) -> RecipeParserBuilder {
    let provider = OpenAIProvider::with_base_url(
        "test_key".to_string(),
        server.url(),
        "gpt-4o-mini".to_string(),
        Duration::from_secs(5),
    )
    .unwrap();
    RecipeParser::builder()
        .config(test_config(&server.url()))
        .provider(Arc::new(provider))
        .without_browser()
}

pub fn parser(server: &Server) -> RecipeParser {
    builder(server).build().unwrap()
}

/// Chat completions body whose message content is `payload` as JSON text.
pub fn chat_completion(payload: &Value) -> String {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": payload.to_string()},
            "finish_reason": "stop"
        }]
    })
    .to_string()
}

pub fn recipe_page(json_ld: &str) -> String {
    format!(
        r#"
        <!DOCTYPE html>
        <html>
        <head>
            <title>Recipe Page</title>
            <script type="application/ld+json">
                {json_ld}
            </script>
        </head>
        <body>
            <article>
                <h1>Buttermilk Pancakes</h1>
                <p>Fluffy weekend pancakes.</p>
            </article>
        </body>
        </html>
        "#
    )
}

pub const PANCAKES_JSON_LD: &str = r#"
{
    "@context": "https://schema.org",
    "@type": "Recipe",
    "name": "Buttermilk Pancakes",
    "description": "Fluffy weekend pancakes.",
    "image": "https://example.com/pancakes.jpg",
    "prepTime": "PT10M",
    "cookTime": "PT15M",
    "recipeYield": "4 servings",
    "recipeCuisine": "American",
    "recipeCategory": "Breakfast",
    "recipeIngredient": [
        "2 cups flour",
        "2 tbsp sugar",
        "2 cups buttermilk",
        "1 egg"
    ],
    "recipeInstructions": [
        {"@type": "HowToStep", "text": "Whisk the dry ingredients."},
        {"@type": "HowToStep", "text": "Stir in buttermilk and egg."},
        {"@type": "HowToStep", "text": "Cook on a hot griddle until golden."}
    ]
}
"#;

/// What the model sends back for the pancake page.
pub fn pancakes_from_model() -> Value {
    json!({
        "name": "Buttermilk Pancakes",
        "servings": 4,
        "ingredientSections": [{
            "name": null,
            "ingredients": [
                {"quantity": 2, "unit": "cups", "name": "flour"},
                {"quantity": 2, "unit": "Tbsp", "name": "sugar"},
                {"quantity": 2, "unit": "cups", "name": "buttermilk"},
                {"quantity": 1, "unit": null, "name": "egg"}
            ]
        }],
        "instructionSections": [{
            "name": null,
            "instructions": [
                {"instruction": "Whisk the dry ingredients.", "imageUrl": null},
                {"instruction": "Stir in buttermilk and egg.", "imageUrl": null},
                {"instruction": "Cook on a hot griddle until golden.", "imageUrl": null}
            ]
        }]
    })
}
