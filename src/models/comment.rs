use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::rating::{RatingCounts, RatingValue};

/// A row of the 'comments' table joined with its author.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub video_id: i64,
    pub user_id: i64,
    pub username: String,
    pub user_avatar: Option<String>,
    pub parent_comment_id: Option<i64>,
    pub content: String,
    pub likes_count: i32,
    pub dislikes_count: i32,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Comment {
    pub fn counts(&self) -> RatingCounts {
        RatingCounts {
            likes: self.likes_count,
            dislikes: self.dislikes_count,
        }
    }

    pub fn is_top_level(&self) -> bool {
        self.parent_comment_id.is_none()
    }
}

/// Insert payload for the persistence layer.
#[derive(Debug, Clone)]
pub struct NewComment {
    pub video_id: i64,
    pub user_id: i64,
    pub parent_comment_id: Option<i64>,
    pub content: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for creating a new comment.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    #[validate(length(
        min = 1,
        max = 1000,
        message = "Comment must be between 1 and 1000 characters"
    ))]
    pub content: String,

    pub video_id: i64,

    /// Optional: the ID of the comment being replied to.
    pub parent_comment_id: Option<i64>,
}

/// DTO for displaying a comment with its author and full reply subtree.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: i64,
    pub content: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub user_id: i64,
    pub username: String,
    pub user_avatar: Option<String>,
    pub video_id: i64,
    pub parent_comment_id: Option<i64>,
    pub likes_count: i32,
    pub dislikes_count: i32,
    /// The viewing caller's own rating, if any.
    pub user_rating: Option<RatingValue>,
    pub replies: Vec<CommentResponse>,
}
