//! Content-type checks for inbound uploads.

use crate::error::{IngestError, IngestResult};
use mime_guess::Mime;

/// The only content type accepted for video uploads.
pub const VIDEO_MP4: &str = "video/mp4";

fn parse(content_type: &str) -> Option<Mime> {
    content_type.trim().parse::<Mime>().ok()
}

/// Accept `video/mp4` (case-insensitive, parameters ignored); reject everything else.
pub fn ensure_video_mp4(content_type: &str) -> IngestResult<()> {
    match parse(content_type) {
        Some(mime) if mime.essence_str().eq_ignore_ascii_case(VIDEO_MP4) => Ok(()),
        _ => Err(IngestError::UnsupportedMediaType(content_type.to_string())),
    }
}

/// File extension for a thumbnail of the given image content type.
pub fn thumbnail_extension(content_type: &str) -> IngestResult<String> {
    let unsupported = || IngestError::UnsupportedMediaType(content_type.to_string());

    let mime = parse(content_type).ok_or_else(unsupported)?;
    if mime.type_() != mime_guess::mime::IMAGE {
        return Err(unsupported());
    }

    let subtype = mime.subtype().as_str().to_ascii_lowercase();
    let ext = match subtype.as_str() {
        "jpeg" | "jpg" | "pjpeg" => "jpg".to_string(),
        "png" => "png".to_string(),
        "gif" => "gif".to_string(),
        "webp" => "webp".to_string(),
        _ => mime_guess::get_mime_extensions_str(mime.essence_str())
            .and_then(|exts| exts.first())
            .map(|ext| ext.to_string())
            .ok_or_else(unsupported)?,
    };

    Ok(ext)
}
