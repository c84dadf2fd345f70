use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError,
    extract::{AppJson, AppPath},
    models::video::{CreateVideoRequest, NewVideo},
    services::CommentService,
    store::Store,
    utils::jwt::Identity,
};

/// Registers a video; the caller becomes its uploader.
pub async fn create_video(
    State(store): State<Arc<dyn Store>>,
    Extension(identity): Extension<Identity>,
    AppJson(payload): AppJson<CreateVideoRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let video = store
        .insert_video(NewVideo {
            uploader_id: identity.user_id,
            title: payload.title,
            description: payload.description,
            video_url: payload.video_url,
            thumbnail_url: payload.thumbnail_url,
        })
        .await?;

    tracing::info!(video_id = video.id, uploader_id = video.uploader_id, "Video created");

    Ok((StatusCode::CREATED, Json(video)))
}

/// List videos (Recent first).
pub async fn list_videos(
    State(store): State<Arc<dyn Store>>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(store.list_videos().await?))
}

pub async fn get_video(
    State(store): State<Arc<dyn Store>>,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    let video = store
        .find_video(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Video not found with ID: {}", id)))?;

    Ok(Json(video))
}

/// Top-level comments of a video, each with its reply tree.
pub async fn list_video_comments(
    State(comments): State<CommentService>,
    viewer: Option<Extension<Identity>>,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    let viewer_id = viewer.map(|Extension(identity)| identity.user_id);
    Ok(Json(comments.list_for_video(id, viewer_id).await?))
}
