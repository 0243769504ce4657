use crate::config::ApiStyle;
use crate::fetchers::SocialContent;
use crate::model::ParsedRecipe;
use crate::providers::{ChatMessage, ModelRequest};

/// System prompt shared by every recipe extraction call.
///
/// Loaded from `system_prompt.txt` at compile time so it can be edited as
/// plain text.
pub const RECIPE_SYSTEM_PROMPT: &str = include_str!("system_prompt.txt");

pub const SUGGESTION_SYSTEM_PROMPT: &str = r#"
You are a creative home cook. Given a list of ingredients someone has on hand, suggest up to five recipes they could make, mostly from those ingredients.
Reply with only this JSON:

{
  "suggestions": [
    {
      "name": "<recipe name>",
      "description": "<one sentence>",
      "usedIngredients": ["<ingredient from the list>"],
      "missingIngredients": ["<anything extra that is needed>"],
      "totalTime": <minutes or null>
    }
  ]
}
"#;

pub const CHAT_SYSTEM_PROMPT: &str = r#"
You are a recipe assistant talking with a home cook. Read the conversation and write the one recipe it converges on, following the cook's latest requests.
Reply with only a JSON object in the recipe format described below.
"#;

/// Wraps a system prompt and one user turn in the configured wire style.
pub fn build_request(style: ApiStyle, system: &str, user: ChatMessage) -> ModelRequest {
    match style {
        ApiStyle::Chat => ModelRequest::Messages(vec![ChatMessage::system(system), user]),
        ApiStyle::Responses => ModelRequest::Instructions {
            instructions: system.to_string(),
            input: vec![user],
        },
    }
}

pub fn text_prompt(text: &str) -> String {
    format!("Extract the recipe from this text:\n\n{}", text.trim())
}

pub fn image_prompt() -> String {
    "Extract the recipe shown in this image. Read every ingredient and step you can see; \
     do not invent missing ones."
        .to_string()
}

pub fn social_prompt(content: &SocialContent) -> String {
    let mut prompt = format!(
        "Extract the recipe from this {} post caption:\n\n{}",
        content.platform.name(),
        content.prompt_text()
    );
    if !content.images.is_empty() {
        prompt.push_str("\n\nImages from the post:\n");
        prompt.push_str(&content.images.join("\n"));
    }
    prompt
}

/// Everything gathered from a recipe page for the HTML extraction prompt.
pub struct PagePrompt<'a> {
    pub url: &'a str,
    pub content: &'a str,
    pub images: &'a [String],
    pub step_context: &'a str,
    pub structured: Option<&'a ParsedRecipe>,
}

pub fn page_prompt(page: &PagePrompt<'_>) -> String {
    let mut prompt = format!(
        "Extract the recipe from this web page.\n\nURL: {}\n\nPage content:\n{}",
        page.url, page.content
    );

    if !page.images.is_empty() {
        prompt.push_str("\n\nImages found on the page:\n");
        prompt.push_str(&page.images.join("\n"));
    }

    if !page.step_context.is_empty() {
        prompt.push_str("\n\n");
        prompt.push_str(page.step_context);
    }

    if let Some(recipe) = page.structured {
        if let Ok(json) = serde_json::to_string(recipe) {
            prompt.push_str(
                "\n\nStructured recipe data embedded in the page (trust it for names and \
                 quantities, but fill in anything it is missing):\n",
            );
            prompt.push_str(&json);
        }
    }

    prompt
}

pub fn suggestion_prompt(ingredients: &[String]) -> String {
    format!("Ingredients I have:\n- {}", ingredients.join("\n- "))
}

/// The chat prompt also needs the recipe format, so it embeds the system prompt.
pub fn chat_system_prompt() -> String {
    format!("{}\n{}", CHAT_SYSTEM_PROMPT.trim(), RECIPE_SYSTEM_PROMPT)
}
