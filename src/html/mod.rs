//! Preparing raw pages for a generative model.

pub mod cleaner;

pub use cleaner::{clean, extract_image_urls, extract_step_image_context, MAX_CONTENT_CHARS};
