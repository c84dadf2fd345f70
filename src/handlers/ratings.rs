use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    error::AppError,
    extract::{AppJson, AppPath},
    models::rating::{RateCommentRequest, RateCommentResponse},
    services::RatingEngine,
    utils::jwt::Identity,
};

/// Like or dislike a comment. Sending the current rating again removes it.
pub async fn rate_comment(
    State(ratings): State<RatingEngine>,
    Extension(identity): Extension<Identity>,
    AppPath(comment_id): AppPath<i64>,
    AppJson(payload): AppJson<RateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = ratings
        .rate(identity.user_id, comment_id, payload.rating)
        .await?;

    Ok(Json(RateCommentResponse::from(outcome)))
}

pub async fn get_comment_rating(
    State(ratings): State<RatingEngine>,
    AppPath(comment_id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(ratings.get_rating(comment_id).await?))
}

/// Remove the caller's rating. Succeeds whether or not one existed.
pub async fn delete_comment_rating(
    State(ratings): State<RatingEngine>,
    Extension(identity): Extension<Identity>,
    AppPath(comment_id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    ratings.delete_rating(identity.user_id, comment_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
