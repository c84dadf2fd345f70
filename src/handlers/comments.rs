use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    error::AppError,
    extract::{AppJson, AppPath},
    models::{comment::CreateCommentRequest, user::Capability},
    services::CommentService,
    utils::jwt::Identity,
};

/// Create a new comment or reply. The caller is the author.
pub async fn create_comment(
    State(comments): State<CommentService>,
    Extension(identity): Extension<Identity>,
    AppJson(payload): AppJson<CreateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let comment = comments.add_comment(identity.user_id, payload).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// Top-level comments of every video.
/// Requires: Login + ViewAllComments.
pub async fn list_all_comments(
    State(comments): State<CommentService>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, AppError> {
    identity.require(Capability::ViewAllComments)?;
    Ok(Json(comments.list_all(Some(identity.user_id)).await?))
}

pub async fn get_comment(
    State(comments): State<CommentService>,
    viewer: Option<Extension<Identity>>,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    let viewer_id = viewer.map(|Extension(identity)| identity.user_id);
    Ok(Json(comments.get_by_id(id, viewer_id).await?))
}

/// Delete a comment and its replies.
/// Requires: Login + (Author OR Video uploader).
pub async fn delete_comment(
    State(comments): State<CommentService>,
    Extension(identity): Extension<Identity>,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    comments.delete(id, identity.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
