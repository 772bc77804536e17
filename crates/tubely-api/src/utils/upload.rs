//! Common utilities for upload handlers

use axum::http::{header::CONTENT_LENGTH, HeaderMap};
use tubely_core::AppError;
use uuid::Uuid;

/// Allowance for multipart boundaries and part headers on top of a file bound.
pub const MULTIPART_ENVELOPE_BYTES: u64 = 1024 * 1024;

pub fn parse_video_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::BadRequest("Invalid ID".to_string()))
}

/// Upper bound on the file part implied by the request's `Content-Length`,
/// after subtracting the envelope allowance.
pub fn declared_file_size(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(|len| len.saturating_sub(MULTIPART_ENVELOPE_BYTES))
}
