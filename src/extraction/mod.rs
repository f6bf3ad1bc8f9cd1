//! Planner-photo extraction: ask a vision model to read a handwritten
//! planner page and fold whatever it recognised into a draft plan.
//!
//! The model's answer is a hint, never authoritative. Fields it leaves out
//! keep their current value, and an unreadable answer ends up verbatim in the
//! notes so nothing is lost.

pub mod client;
pub mod handlers;
pub mod parse;

use axum::Router;

use crate::state::AppState;

pub use client::{GeminiExtractor, PlanExtractor, PlanImage};

#[derive(Debug, Clone, thiserror::Error)]
pub enum ExtractionError {
    #[error("photo extraction is not configured")]
    NotConfigured,
    #[error("unsupported image type: {0}")]
    UnsupportedImage(String),
    #[error("extraction request failed: {0}")]
    Transport(String),
    #[error("extraction service returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("extraction service returned no text")]
    EmptyResponse,
    #[error("could not read a plan from the extracted text: {0}")]
    Unparseable(String),
}

pub fn router() -> Router<AppState> {
    handlers::extract_routes()
}

/// MIME types accepted for planner photos. Narrower than `image/*` on
/// purpose: these are the image types Gemini accepts as inline data.
pub fn is_supported_image(content_type: &str) -> bool {
    matches!(
        content_type,
        "image/jpeg" | "image/jpg" | "image/png" | "image/webp" | "image/heic" | "image/heif"
    )
}
