use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::State,
    response::IntoResponse,
};

use crate::{
    error::AppError,
    extract::AppPath,
    models::user::UserProfile,
    services::CommentService,
    store::Store,
    utils::jwt::Identity,
};

/// Public profile of a user.
pub async fn get_user(
    State(store): State<Arc<dyn Store>>,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user = store
        .find_user(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User not found with ID: {}", id)))?;

    Ok(Json(UserProfile::from(user)))
}

/// Every comment written by a user, replies included.
pub async fn list_user_comments(
    State(comments): State<CommentService>,
    viewer: Option<Extension<Identity>>,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    let viewer_id = viewer.map(|Extension(identity)| identity.user_id);
    Ok(Json(comments.list_for_user(id, viewer_id).await?))
}
