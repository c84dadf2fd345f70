use axum::{
    Extension, Json,
    extract::{Multipart, State},
    response::IntoResponse,
};

use crate::{
    error::AppError,
    extract::{AppJson, AppPath, AppQuery},
    models::upload::{AvatarUploadParams, AvatarUrlRequest},
    services::{UploadFile, UploadOrchestrator},
    utils::jwt::Identity,
};

/// Pulls the `file` field out of a multipart form.
async fn read_file(mut multipart: Multipart) -> Result<UploadFile, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field.content_type().map(str::to_string);
        let file_name = field.file_name().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        return Ok(UploadFile {
            data,
            content_type,
            file_name,
        });
    }

    Err(AppError::BadRequest(
        "Multipart field 'file' is required".to_string(),
    ))
}

/// Upload an avatar for `?userId=` or, without it, for the caller.
pub async fn upload_avatar(
    State(uploads): State<UploadOrchestrator>,
    caller: Option<Extension<Identity>>,
    AppQuery(params): AppQuery<AvatarUploadParams>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let file = read_file(multipart).await?;
    let caller = caller.map(|Extension(identity)| identity);

    let response = uploads
        .upload_avatar(file, params.user_id, caller.as_ref())
        .await?;

    Ok(Json(response))
}

/// Upload an avatar for the user in the path.
/// Requires: caller is that user, or holds ManageAnyAvatar.
pub async fn upload_avatar_for_user(
    State(uploads): State<UploadOrchestrator>,
    caller: Option<Extension<Identity>>,
    AppPath(user_id): AppPath<i64>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let file = read_file(multipart).await?;
    let caller = caller.map(|Extension(identity)| identity);

    let response = uploads
        .upload_avatar_for_user(file, user_id, caller.as_ref())
        .await?;

    Ok(Json(response))
}

/// Point the caller's avatar at an existing URL.
pub async fn set_avatar_url(
    State(uploads): State<UploadOrchestrator>,
    caller: Option<Extension<Identity>>,
    AppJson(payload): AppJson<AvatarUrlRequest>,
) -> Result<impl IntoResponse, AppError> {
    let caller = caller.map(|Extension(identity)| identity);
    let response = uploads.set_avatar_url(caller.as_ref(), payload).await?;
    Ok(Json(response))
}

pub async fn upload_video(
    State(uploads): State<UploadOrchestrator>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let file = read_file(multipart).await?;
    Ok(Json(uploads.upload_video(file).await?))
}

pub async fn upload_thumbnail(
    State(uploads): State<UploadOrchestrator>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let file = read_file(multipart).await?;
    Ok(Json(uploads.upload_thumbnail(file).await?))
}
