use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use url::Url;
use validator::{Validate, ValidationError};

/// Represents the 'videos' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: i64,
    pub uploader_id: i64,
    pub title: String,
    pub description: String,
    pub video_url: String,
    pub thumbnail_url: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Insert payload for the persistence layer.
#[derive(Debug, Clone)]
pub struct NewVideo {
    pub uploader_id: i64,
    pub title: String,
    pub description: String,
    pub video_url: String,
    pub thumbnail_url: Option<String>,
}

/// DTO for registering an uploaded video.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateVideoRequest {
    #[validate(length(
        min = 1,
        max = 200,
        message = "Title length must be between 1 and 200 chars"
    ))]
    pub title: String,

    #[validate(length(max = 5000))]
    #[serde(default)]
    pub description: String,

    #[validate(length(min = 1, max = 500), custom(function = validate_url_string))]
    pub video_url: String,

    #[validate(length(min = 1, max = 500), custom(function = validate_url_string))]
    pub thumbnail_url: Option<String>,
}

/// Accepts an absolute http(s) URL or a root-relative path such as
/// `/assets/avatar.png` for assets served next to the frontend.
pub fn validate_url_string(value: &str) -> Result<(), ValidationError> {
    let valid = if value.starts_with('/') {
        !value.starts_with("//") && !value.chars().any(char::is_whitespace)
    } else {
        Url::parse(value).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
    };

    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_url").with_message(Cow::Borrowed(
            "Must be an http(s) URL or a path starting with '/'",
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_urls_and_root_paths_are_accepted() {
        assert!(validate_url_string("https://cdn.example.com/a.png").is_ok());
        assert!(validate_url_string("http://localhost:5173/thumb.jpg").is_ok());
        assert!(validate_url_string("/assets/avatar.png").is_ok());
    }

    #[test]
    fn other_schemes_and_garbage_are_rejected() {
        assert!(validate_url_string("javascript:alert(1)").is_err());
        assert!(validate_url_string("data:image/png;base64,AAAA").is_err());
        assert!(validate_url_string("//evil.example/a.png").is_err());
        assert!(validate_url_string("assets/avatar.png").is_err());
        assert!(validate_url_string("   ").is_err());
        assert!(validate_url_string("").is_err());
    }
}
