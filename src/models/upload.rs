use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::video::validate_url_string;

/// Query parameters accepted by `POST /api/uploads/avatar`.
#[derive(Debug, Deserialize)]
pub struct AvatarUploadParams {
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: Option<i64>,
}

/// DTO for pointing the caller's avatar at an existing URL.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AvatarUrlRequest {
    #[validate(
        length(min = 1, max = 500, message = "Avatar URL is required"),
        custom(function = validate_url_string)
    )]
    #[serde(default)]
    pub avatar_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvatarResponse {
    pub avatar_url: String,
    pub user_id: i64,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaUploadResponse {
    pub url: String,
    pub public_id: String,
    pub message: String,
}
