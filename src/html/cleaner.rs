use crate::extractors::parsing::{collapse_whitespace, resolve_url};
use crate::extractors::{find_recipe, json_ld_blocks};
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use std::sync::LazyLock;
use url::Url;

/// Upper bound on cleaned page text handed to the model, in characters.
pub const MAX_CONTENT_CHARS: usize = 15_000;

/// Images declared smaller than this on either side are skipped.
const MIN_IMAGE_SIDE: u32 = 100;

const SNIPPET_CHARS: usize = 60;

const NOISE_TAGS: &[&str] = &[
    "script", "style", "nav", "footer", "header", "aside", "iframe", "noscript", "svg", "form",
];

/// Class or id fragments marking ads, comments and sidebars.
const NOISE_TOKENS: &[&str] = &[
    "ad",
    "ads",
    "advert",
    "advertisement",
    "sponsored",
    "comment",
    "comments",
    "sidebar",
    "widget",
    "newsletter",
    "popup",
    "modal",
    "cookie",
    "share",
    "social",
    "related",
    "breadcrumb",
    "breadcrumbs",
];

const DECORATIVE_MARKERS: &[&str] = &["logo", "icon", "avatar", "badge", "placeholder"];

const PRIMARY_SELECTORS: &[&str] = &["article", "main", "[role=main]", ".recipe", ".post-content"];

static PRIMARY: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    PRIMARY_SELECTORS
        .iter()
        .map(|s| Selector::parse(s).expect("valid primary content selector"))
        .collect()
});

static BODY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("valid body selector"));

static IMG: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img").expect("valid img selector"));

static OG_IMAGE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("meta[property='og:image'], meta[name='og:image']")
        .expect("valid og:image selector")
});

static ORDERED_STEPS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("ol > li").expect("valid step list selector"));

static STEP_LIKE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[class*='step']").expect("valid step selector"));

fn is_noise(element: &ElementRef) -> bool {
    let el = element.value();
    if NOISE_TAGS.contains(&el.name()) {
        return true;
    }
    let mut markers = el.classes().chain(el.id());
    markers.any(|marker| {
        marker
            .to_ascii_lowercase()
            .split(['-', '_'])
            .any(|part| NOISE_TOKENS.contains(&part))
    })
}

fn collect_text(element: ElementRef, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
            out.push(' ');
        } else if let Some(child_el) = ElementRef::wrap(child) {
            if !is_noise(&child_el) {
                collect_text(child_el, out);
            }
        }
    }
}

fn cleaned_text(element: ElementRef) -> String {
    let mut raw = String::new();
    collect_text(element, &mut raw);
    collapse_whitespace(&raw)
}

fn truncate_chars(text: String, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => text[..cut].to_string(),
        None => text,
    }
}

/// Main readable text of a page, with noise removed and whitespace collapsed,
/// capped at [`MAX_CONTENT_CHARS`].
pub fn clean(raw_html: &str) -> String {
    let document = Html::parse_document(raw_html);

    let primary = PRIMARY.iter().find_map(|selector| {
        document
            .select(selector)
            .filter(|el| !is_noise(el))
            .map(cleaned_text)
            .find(|text| !text.is_empty())
    });

    let text = primary
        .or_else(|| document.select(&BODY).next().map(cleaned_text))
        .unwrap_or_else(|| cleaned_text(document.root_element()));

    truncate_chars(text, MAX_CONTENT_CHARS)
}

fn declared_side(value: Option<&str>) -> Option<u32> {
    let digits: String = value?
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

fn is_too_small(img: &ElementRef) -> bool {
    let el = img.value();
    [el.attr("width"), el.attr("height")]
        .into_iter()
        .filter_map(declared_side)
        .any(|side| side < MIN_IMAGE_SIDE)
}

fn is_decorative(url: &str) -> bool {
    let lowered = url.to_ascii_lowercase();
    DECORATIVE_MARKERS.iter().any(|marker| lowered.contains(marker))
}

/// Absolute URL of a content image, or `None` for images that are small,
/// decorative or only carry a lazy-load placeholder in `src`.
fn usable_image(img: &ElementRef, base: Option<&Url>) -> Option<String> {
    if is_too_small(img) {
        return None;
    }
    let url = resolve_url(base, img.value().attr("src")?)?;
    if is_decorative(&url) {
        return None;
    }
    Some(url)
}

fn structured_image_urls(value: &Value, base: Option<&Url>, out: &mut Vec<String>) {
    match value {
        Value::String(url) => out.extend(resolve_url(base, url)),
        Value::Array(items) => {
            for item in items {
                structured_image_urls(item, base, out);
            }
        }
        Value::Object(map) => {
            if let Some(url) = map
                .get("url")
                .or_else(|| map.get("contentUrl"))
                .and_then(Value::as_str)
            {
                out.extend(resolve_url(base, url));
            }
        }
        _ => {}
    }
}

fn push_unique(images: &mut Vec<String>, url: String) {
    if !images.contains(&url) {
        images.push(url);
    }
}

/// Candidate recipe images: structured-data images and `og:image` first,
/// then page `<img>` elements, deduplicated in that order.
pub fn extract_image_urls(html: &str, base_url: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let base = Url::parse(base_url).ok();
    let base = base.as_ref();
    let mut images = Vec::new();

    for block in json_ld_blocks(&document) {
        if let Some(image) = find_recipe(&block).and_then(|recipe| recipe.get("image")) {
            let mut found = Vec::new();
            structured_image_urls(image, base, &mut found);
            for url in found.into_iter().filter(|url| !is_decorative(url)) {
                push_unique(&mut images, url);
            }
        }
    }

    for meta in document.select(&OG_IMAGE) {
        if let Some(url) = meta
            .value()
            .attr("content")
            .and_then(|content| resolve_url(base, content))
        {
            push_unique(&mut images, url);
        }
    }

    for img in document.select(&IMG) {
        if let Some(url) = usable_image(&img, base) {
            push_unique(&mut images, url);
        }
    }

    images
}

fn step_image(step: &ElementRef, base: Option<&Url>) -> Option<String> {
    if let Some(url) = step.select(&IMG).find_map(|img| usable_image(&img, base)) {
        return Some(url);
    }
    let next = step.next_siblings().find_map(ElementRef::wrap)?;
    if next.value().name() == "li" || STEP_LIKE.matches(&next) {
        return None;
    }
    if next.value().name() == "img" {
        return usable_image(&next, base);
    }
    next.select(&IMG).find_map(|img| usable_image(&img, base))
}

fn step_candidates(document: &Html) -> Vec<ElementRef<'_>> {
    let ordered: Vec<ElementRef> = document.select(&ORDERED_STEPS).collect();
    if !ordered.is_empty() {
        return ordered;
    }
    // Innermost step-like elements only, so wrappers do not swallow their steps
    document
        .select(&STEP_LIKE)
        .filter(|el| el.select(&STEP_LIKE).next().is_none())
        .collect()
}

/// Hint block pairing instruction steps with nearby images, one line per
/// step: `Step N ("snippet"): url`. Empty when no step has an image.
pub fn extract_step_image_context(html: &str, base_url: &str) -> String {
    let document = Html::parse_document(html);
    let base = Url::parse(base_url).ok();

    let lines: Vec<String> = step_candidates(&document)
        .iter()
        .enumerate()
        .filter_map(|(position, step)| {
            let url = step_image(step, base.as_ref())?;
            let snippet: String = cleaned_text(*step).chars().take(SNIPPET_CHARS).collect();
            Some(format!("Step {} (\"{}\"): {}", position + 1, snippet, url))
        })
        .collect();

    if lines.is_empty() {
        return String::new();
    }
    format!(
        "Step images found on the page (may be approximate):\n{}",
        lines.join("\n")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_prefers_article_and_drops_noise() {
        let html = r#"
        <html><body>
            <nav>Home | Recipes</nav>
            <div class="sidebar">Popular posts</div>
            <article>
                <h1>Tomato   Soup</h1>
                <script>var tracking = 1;</script>
                <div class="ad-slot">Buy now</div>
                <p>Simmer the
                tomatoes.</p>
                <section id="comments">Great recipe!</section>
            </article>
            <footer>Copyright</footer>
        </body></html>
        "#;
        assert_eq!(clean(html), "Tomato Soup Simmer the tomatoes.");
    }

    #[test]
    fn test_clean_falls_back_to_body() {
        let html = "<html><body><header>Site</header><div class='shadow'>Only text</div></body></html>";
        assert_eq!(clean(html), "Only text");
    }

    #[test]
    fn test_clean_caps_length() {
        let html = format!("<html><body><p>{}</p></body></html>", "é".repeat(20_000));
        assert_eq!(clean(&html).chars().count(), MAX_CONTENT_CHARS);
    }

    #[test]
    fn test_image_urls_are_resolved_filtered_and_deduplicated() {
        let html = r#"
        <html><head>
            <meta property="og:image" content="https://cdn.example.com/hero.jpg">
            <script type="application/ld+json">
                {"@type": "Recipe", "name": "X", "image": ["/hero-square.jpg", {"url": "https://cdn.example.com/hero.jpg"}]}
            </script>
        </head><body>
            <img src="/images/step1.jpg" width="600">
            <img src="/images/step1.jpg">
            <img src="/images/tiny.jpg" width="40" height="40">
            <img src="/static/site-logo.png">
            <img src="data:image/gif;base64,R0lGOD" data-src="/images/lazy.jpg">
            <img data-src="/images/lazy2.jpg">
        </body></html>
        "#;
        let images = extract_image_urls(html, "https://example.com/recipe");
        assert_eq!(
            images,
            vec![
                "https://example.com/hero-square.jpg",
                "https://cdn.example.com/hero.jpg",
                "https://example.com/images/step1.jpg",
            ]
        );
    }

    #[test]
    fn test_step_context_inside_and_after_steps() {
        let html = r#"
        <html><body><ol>
            <li>Chop the onions finely. <img src="/img/onions.jpg"></li>
            <li>Stir.</li>
            <li>Bake until golden.</li>
        </ol>
        <ul><li>unrelated</li></ul>
        </body></html>
        "#;
        let context = extract_step_image_context(html, "https://example.com/r");
        let lines: Vec<&str> = context.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[1],
            "Step 1 (\"Chop the onions finely.\"): https://example.com/img/onions.jpg"
        );
    }

    #[test]
    fn test_step_context_uses_following_sibling_image() {
        let html = r#"
        <div class="steps">
            <div class="step">Whisk eggs</div>
            <figure><img src="https://example.com/whisk.jpg"></figure>
            <div class="step">Serve</div>
        </div>
        "#;
        let context = extract_step_image_context(html, "https://example.com/r");
        assert!(context.contains("Step 1 (\"Whisk eggs\"): https://example.com/whisk.jpg"));
        assert!(!context.contains("Step 2"));
    }

    #[test]
    fn test_step_context_empty_without_images() {
        let html = "<ol><li>Mix</li><li>Bake</li></ol>";
        assert_eq!(extract_step_image_context(html, "https://example.com"), "");
    }
}
