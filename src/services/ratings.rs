use std::sync::Arc;

use crate::{
    error::AppError,
    models::rating::{RatingCounts, RatingOutcome, RatingValue},
    store::Store,
};

/// Keeps at most one rating per (user, comment) and the comment counters in step.
#[derive(Clone)]
pub struct RatingEngine {
    store: Arc<dyn Store>,
}

impl RatingEngine {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Likes or dislikes a comment. Repeating the current rating removes it;
    /// sending the opposite one flips it.
    pub async fn rate(
        &self,
        user_id: i64,
        comment_id: i64,
        value: RatingValue,
    ) -> Result<RatingOutcome, AppError> {
        self.store
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User not found with ID: {}", user_id)))?;

        let outcome = self.store.apply_rating(user_id, comment_id, value).await?;

        tracing::debug!(
            user_id,
            comment_id,
            transition = ?outcome.transition,
            likes = outcome.counts.likes,
            dislikes = outcome.counts.dislikes,
            "Comment rated"
        );

        Ok(outcome)
    }

    pub async fn get_rating(&self, comment_id: i64) -> Result<RatingCounts, AppError> {
        let comment = self
            .store
            .find_comment(comment_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Comment not found with ID: {}", comment_id))
            })?;

        Ok(comment.counts())
    }

    /// Removes the user's rating, if there is one.
    pub async fn delete_rating(&self, user_id: i64, comment_id: i64) -> Result<(), AppError> {
        if let Some(counts) = self.store.remove_rating(user_id, comment_id).await? {
            tracing::debug!(
                user_id,
                comment_id,
                likes = counts.likes,
                dislikes = counts.dislikes,
                "Rating removed"
            );
        }
        Ok(())
    }
}
