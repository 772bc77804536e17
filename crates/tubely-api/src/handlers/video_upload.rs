use crate::auth::AuthUser;
use crate::error::HttpAppError;
use crate::state::AppState;
use crate::utils::upload::{declared_file_size, parse_video_id};
use axum::{
    extract::{Multipart, Path, State},
    http::HeaderMap,
    Json,
};
use std::sync::Arc;
use tubely_core::models::VideoResponse;
use tubely_core::AppError;

const FORM_FIELD: &str = "video";

/// `POST /api/videos/{video_id}/upload`
///
/// Streams the `video` part through the ingestion pipeline and returns the
/// updated record.
pub async fn upload_video(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(video_id): Path<String>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<VideoResponse>, HttpAppError> {
    let video_id = parse_video_id(&video_id)?;

    tracing::info!(
        video_id = %video_id,
        user_id = %auth.user_id,
        "Uploading video"
    );

    let video = state.videos.authorize(video_id, auth.user_id).await?;

    let field = loop {
        match multipart.next_field().await? {
            Some(field) if field.name() == Some(FORM_FIELD) => break field,
            Some(_) => continue,
            None => {
                return Err(AppError::BadRequest("Unable to parse form file".to_string()).into())
            }
        }
    };
    let content_type = field.content_type().unwrap_or_default().to_string();

    let outcome = state
        .videos
        .ingest_authorized(video, &content_type, declared_file_size(&headers), field)
        .await?;

    tracing::info!(
        video_id = %video_id,
        key = %outcome.key,
        video_url = %outcome.public_url,
        "Video upload succeeded"
    );

    Ok(Json(VideoResponse::from(outcome.video)))
}
