mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use common::chat_completion;
use mockito::{Matcher, Server};
use recipe_parser::fetchers::RemoteBrowserLauncher;
use recipe_parser::{Confidence, ImageUploader, ParseInput, ParseMethod, UploadOutcome};
use serde_json::json;

const POST_URL: &str = "https://www.tiktok.com/@noodlequeen/video/7301234567890";

const FULL_CAPTION: &str = "Garlic chili noodles! You need 200g noodles, 3 cloves garlic, \
    2 tbsp chili oil and 1 tbsp soy sauce. Boil noodles, fry garlic, toss everything together.";

fn noodles_from_model() -> serde_json::Value {
    json!({
        "name": "Garlic Chili Noodles",
        "ingredients": ["200g noodles", "3 cloves garlic", "2 tbsp chili oil", "1 tbsp soy sauce"],
        "instructions": ["Boil the noodles.", "Fry the garlic.", "Toss everything together."]
    })
}

async fn oembed_mock(server: &mut Server, title: &str) -> mockito::Mock {
    server
        .mock("GET", "/oembed")
        .match_query(Matcher::UrlEncoded("url".into(), POST_URL.into()))
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "title": title,
                "author_name": "noodlequeen",
                "thumbnail_url": "https://p16-sign.tiktokcdn.com/thumb.jpeg"
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await
}

#[tokio::test]
async fn test_long_oembed_caption_skips_the_browser() {
    let mut server = Server::new_async().await;
    let oembed = oembed_mock(&mut server, FULL_CAPTION).await;
    let sessions = server
        .mock("POST", "/api/sessions")
        .expect(0)
        .create_async()
        .await;
    let model = server
        .mock("POST", "/v1/chat/completions")
        .match_body(Matcher::Regex("Posted by noodlequeen on tiktok".to_string()))
        .with_body(chat_completion(&noodles_from_model()))
        .expect(1)
        .create_async()
        .await;

    let parser = common::builder(&server)
        .browser(Arc::new(RemoteBrowserLauncher::new(server.url())))
        .build()
        .unwrap();
    let response = parser.parse(ParseInput::url(POST_URL)).await;

    assert!(response.is_success(), "{:?}", response);
    let metadata = response.metadata().unwrap();
    assert_eq!(metadata.parse_method, Some(ParseMethod::AiOnly));
    assert_eq!(metadata.confidence, Confidence::Medium);

    let recipe = response.recipe().unwrap();
    assert_eq!(recipe.source_url.as_deref(), Some(POST_URL));
    // The model returned no images, so the oEmbed thumbnail is kept
    assert_eq!(recipe.images, vec!["https://p16-sign.tiktokcdn.com/thumb.jpeg"]);

    oembed.assert_async().await;
    sessions.assert_async().await;
    model.assert_async().await;
}

#[tokio::test]
async fn test_short_oembed_caption_falls_through_to_browser() {
    let mut server = Server::new_async().await;
    let short_caption = "Best noodles ever 🍜 #foodtok";
    let _oembed = oembed_mock(&mut server, short_caption).await;

    let rendered = format!(
        r#"<html><head>
            <meta property="og:description" content="{FULL_CAPTION}">
            <meta property="og:image" content="https://p16-sign.tiktokcdn.com/cover.jpeg">
        </head><body><div id="app"></div></body></html>"#
    );
    let create = server
        .mock("POST", "/api/sessions")
        .match_body(Matcher::PartialJsonString(
            r#"{"viewport": {"isMobile": true}}"#.to_string(),
        ))
        .with_body(r#"{"id": "s-42"}"#)
        .expect(1)
        .create_async()
        .await;
    let goto = server
        .mock("POST", "/api/sessions/s-42/goto")
        .match_body(Matcher::PartialJsonString(
            json!({"url": POST_URL}).to_string(),
        ))
        .with_body("{}")
        .expect(1)
        .create_async()
        .await;
    let _click = server
        .mock("POST", "/api/sessions/s-42/click")
        .with_body(r#"{"clicked": false}"#)
        .create_async()
        .await;
    let content = server
        .mock("GET", "/api/sessions/s-42/content")
        .with_body(json!({ "html": rendered }).to_string())
        .expect(1)
        .create_async()
        .await;
    let close = server
        .mock("DELETE", "/api/sessions/s-42")
        .expect(1)
        .create_async()
        .await;
    let model = server
        .mock("POST", "/v1/chat/completions")
        .match_body(Matcher::Regex("toss everything together".to_string()))
        .with_body(chat_completion(&noodles_from_model()))
        .expect(1)
        .create_async()
        .await;

    let parser = common::builder(&server)
        .browser(Arc::new(RemoteBrowserLauncher::new(server.url())))
        .build()
        .unwrap();
    let response = parser.parse(ParseInput::url(POST_URL)).await;

    assert!(response.is_success(), "{:?}", response);
    let images = &response.recipe().unwrap().images;
    assert_eq!(
        images,
        &vec![
            "https://p16-sign.tiktokcdn.com/thumb.jpeg".to_string(),
            "https://p16-sign.tiktokcdn.com/cover.jpeg".to_string(),
        ]
    );

    create.assert_async().await;
    goto.assert_async().await;
    content.assert_async().await;
    close.assert_async().await;
    model.assert_async().await;
}

#[tokio::test]
async fn test_browser_session_is_closed_when_navigation_fails() {
    let mut server = Server::new_async().await;
    let _oembed = oembed_mock(&mut server, "too short").await;
    let _create = server
        .mock("POST", "/api/sessions")
        .with_body(r#"{"id": "s-7"}"#)
        .create_async()
        .await;
    let _goto = server
        .mock("POST", "/api/sessions/s-7/goto")
        .with_status(502)
        .create_async()
        .await;
    let close = server
        .mock("DELETE", "/api/sessions/s-7")
        .expect(1)
        .create_async()
        .await;
    let model = server
        .mock("POST", "/v1/chat/completions")
        .expect(0)
        .create_async()
        .await;

    let parser = common::builder(&server)
        .browser(Arc::new(RemoteBrowserLauncher::new(server.url())))
        .build()
        .unwrap();
    let response = parser.parse(ParseInput::url(POST_URL)).await;

    assert_eq!(response.error_code(), Some("TIKTOK_PARSE_FAILED"));
    close.assert_async().await;
    model.assert_async().await;
}

#[tokio::test]
async fn test_short_caption_without_browser_is_no_content() {
    let mut server = Server::new_async().await;
    let _oembed = oembed_mock(&mut server, "Best noodles ever").await;
    let model = server
        .mock("POST", "/v1/chat/completions")
        .expect(0)
        .create_async()
        .await;

    let parser = common::parser(&server);
    let response = parser.parse(ParseInput::url(POST_URL)).await;

    assert_eq!(response.error_code(), Some("NO_CONTENT"));
    model.assert_async().await;
}

#[tokio::test]
async fn test_instagram_oembed_failure_without_browser() {
    let mut server = Server::new_async().await;
    let _oembed = server
        .mock("GET", "/instagram_oembed")
        .match_query(Matcher::Any)
        .with_status(400)
        .create_async()
        .await;

    let parser = common::parser(&server);
    let response = parser
        .parse(ParseInput::url("https://www.instagram.com/p/C0ffee123/"))
        .await;

    assert_eq!(response.error_code(), Some("INSTAGRAM_PARSE_FAILED"));
}

#[tokio::test]
async fn test_basic_import_rejects_social_urls() {
    let mut server = Server::new_async().await;
    let oembed = server
        .mock("GET", "/oembed")
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let parser = common::parser(&server);
    let response = parser.parse(ParseInput::structured_url(POST_URL)).await;

    assert_eq!(response.error_code(), Some("UNSUPPORTED_URL"));
    oembed.assert_async().await;
}

struct FlakyUploader {
    calls: AtomicUsize,
}

#[async_trait]
impl ImageUploader for FlakyUploader {
    async fn upload_from_url(&self, source_url: &str, destination_key: &str) -> UploadOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if source_url.contains("expired") {
            UploadOutcome {
                success: false,
                public_url: None,
                error: Some("source returned 403".to_string()),
            }
        } else {
            UploadOutcome {
                success: true,
                public_url: Some(format!("https://images.example.com/{destination_key}")),
                error: None,
            }
        }
    }
}

#[tokio::test]
async fn test_images_are_reuploaded_with_fallback() {
    let mut server = Server::new_async().await;
    let _oembed = oembed_mock(&mut server, FULL_CAPTION).await;
    let mut payload = noodles_from_model();
    payload["images"] = json!([
        "https://p16-sign.tiktokcdn.com/thumb.jpeg",
        "https://p16-sign.tiktokcdn.com/expired.jpeg"
    ]);
    let _model = server
        .mock("POST", "/v1/chat/completions")
        .with_body(chat_completion(&payload))
        .create_async()
        .await;

    let uploader = Arc::new(FlakyUploader {
        calls: AtomicUsize::new(0),
    });
    let parser = common::builder(&server)
        .uploader(uploader.clone())
        .build()
        .unwrap();
    let response = parser.parse(ParseInput::url(POST_URL)).await;

    assert!(response.is_success(), "{:?}", response);
    let images = &response.recipe().unwrap().images;
    assert_eq!(uploader.calls.load(Ordering::SeqCst), 2);
    assert!(images[0].starts_with("https://images.example.com/imports/tiktok/"));
    assert!(images[0].ends_with(".jpg"));
    assert_eq!(images[1], "https://p16-sign.tiktokcdn.com/expired.jpeg");
}
