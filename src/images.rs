//! Best-effort copy of ephemeral social-media images to permanent storage.

use async_trait::async_trait;
use futures::future::join_all;
use log::{debug, warn};
use sha2::{Digest, Sha256};

use crate::fetchers::SocialPlatform;
use crate::model::ParsedRecipe;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct UploadOutcome {
    pub success: bool,
    pub public_url: Option<String>,
    pub error: Option<String>,
}

#[async_trait]
pub trait ImageUploader: Send + Sync {
    async fn upload_from_url(&self, source_url: &str, destination_key: &str) -> UploadOutcome;
}

/// `imports/<platform>/<first 16 hex chars of sha256(url)>.jpg`
pub fn destination_key(platform: SocialPlatform, source_url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_url.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    format!("imports/{}/{}.jpg", platform.name(), &digest[..16])
}

async fn reupload_one(
    uploader: &dyn ImageUploader,
    platform: SocialPlatform,
    url: String,
) -> String {
    let outcome = uploader
        .upload_from_url(&url, &destination_key(platform, &url))
        .await;
    match outcome {
        UploadOutcome {
            success: true,
            public_url: Some(public_url),
            ..
        } => {
            debug!("Re-uploaded {} to {}", url, public_url);
            public_url
        }
        UploadOutcome { error, .. } => {
            warn!(
                "Image re-upload failed for {}, keeping original: {}",
                url,
                error.unwrap_or_else(|| "no public URL returned".to_string())
            );
            url
        }
    }
}

/// Uploads every URL concurrently; each result is the permanent URL, or the
/// original when that upload failed. Order is preserved.
pub async fn reupload_images(
    uploader: &dyn ImageUploader,
    platform: SocialPlatform,
    urls: Vec<String>,
) -> Vec<String> {
    join_all(
        urls.into_iter()
            .map(|url| reupload_one(uploader, platform, url)),
    )
    .await
}

/// Replaces recipe and step images with permanent copies.
pub async fn reupload_recipe_images(
    uploader: &dyn ImageUploader,
    platform: SocialPlatform,
    mut recipe: ParsedRecipe,
) -> ParsedRecipe {
    let step_urls: Vec<String> = recipe
        .instruction_sections
        .iter()
        .flat_map(|section| &section.instructions)
        .filter_map(|step| step.image_url.clone())
        .collect();
    let step_count = step_urls.len();

    let mut all = std::mem::take(&mut recipe.images);
    all.extend(step_urls);
    let mut uploaded = reupload_images(uploader, platform, all).await;

    let step_uploaded = uploaded.split_off(uploaded.len() - step_count);
    recipe.images = uploaded;

    let mut step_uploaded = step_uploaded.into_iter();
    for step in recipe
        .instruction_sections
        .iter_mut()
        .flat_map(|section| section.instructions.iter_mut())
        .filter(|step| step.image_url.is_some())
    {
        step.image_url = step_uploaded.next();
    }
    recipe
}
