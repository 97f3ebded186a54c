/// Optional birthday card image embedded in personal wishes
use std::path::Path;

use tracing::warn;
use uuid::Uuid;

use crate::constants::CONTENT_ID_DOMAIN;
use crate::mail::InlineImage;

/// Image bytes and their MIME type, loaded once per run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardImage {
    pub content_type: String,
    pub data: Vec<u8>,
}

impl CardImage {
    /// Attach this card under a fresh content-id
    pub fn to_inline(&self) -> InlineImage {
        InlineImage {
            content_id: new_content_id(),
            content_type: self.content_type.clone(),
            data: self.data.clone(),
        }
    }
}

/// Load the card image if one is configured and present on disk
///
/// A missing path or file is not an error. An unreadable file is logged and
/// treated as absent.
pub async fn load_card(path: Option<&Path>) -> Option<CardImage> {
    let path = path?;

    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => {}
        _ => return None,
    }

    match tokio::fs::read(path).await {
        Ok(data) => Some(CardImage {
            content_type: guess_content_type(path).to_string(),
            data,
        }),
        Err(e) => {
            warn!("Could not read card image {}: {}", path.display(), e);
            None
        }
    }
}

/// Infer a MIME type from the file extension
pub fn guess_content_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("jpg" | "jpeg" | "jpe") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

/// Generate a unique content-id such as `3f2c...@birthday.local`
pub fn new_content_id() -> String {
    format!("{}@{}", Uuid::new_v4().simple(), CONTENT_ID_DOMAIN)
}
