//! Persistence gateway.
//!
//! Services talk to storage only through these traits. `PgStore` backs
//! production; `MemoryStore` serves local runs without a database and the
//! integration tests.

pub mod memory;
pub mod postgres;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::{
    error::AppError,
    models::{
        comment::{Comment, NewComment},
        rating::{CommentRating, RatingCounts, RatingOutcome, RatingValue},
        user::{NewUser, User},
        video::{NewVideo, Video},
    },
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type StoreResult<T> = Result<T, AppError>;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_user(&self, id: i64) -> StoreResult<Option<User>>;

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    /// Fails with `Conflict` when the username is taken.
    async fn insert_user(&self, user: NewUser) -> StoreResult<User>;

    /// Fails with `NotFound` when the user does not exist.
    async fn set_avatar_url(&self, user_id: i64, avatar_url: &str) -> StoreResult<User>;
}

#[async_trait]
pub trait VideoRepository: Send + Sync {
    async fn find_video(&self, id: i64) -> StoreResult<Option<Video>>;

    async fn insert_video(&self, video: NewVideo) -> StoreResult<Video>;

    /// Newest first.
    async fn list_videos(&self) -> StoreResult<Vec<Video>>;
}

#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn insert_comment(&self, comment: NewComment) -> StoreResult<Comment>;

    async fn find_comment(&self, id: i64) -> StoreResult<Option<Comment>>;

    /// Every comment of the given videos, replies included, oldest first.
    async fn comments_for_videos(&self, video_ids: &[i64]) -> StoreResult<Vec<Comment>>;

    /// Every comment in the system, oldest first.
    async fn all_comments(&self) -> StoreResult<Vec<Comment>>;

    /// Every comment written by the user, oldest first.
    async fn comments_by_user(&self, user_id: i64) -> StoreResult<Vec<Comment>>;

    /// Deletes the comment, its reply subtree and all of their ratings in one
    /// transaction. Returns the number of comments removed.
    async fn delete_comment_tree(&self, id: i64) -> StoreResult<u64>;
}

#[async_trait]
pub trait RatingRepository: Send + Sync {
    async fn find_rating(&self, user_id: i64, comment_id: i64)
    -> StoreResult<Option<CommentRating>>;

    /// The user's ratings among `comment_ids`, keyed by comment id.
    async fn ratings_by_user(
        &self,
        user_id: i64,
        comment_ids: &[i64],
    ) -> StoreResult<HashMap<i64, RatingValue>>;

    /// Resolves and commits a rating request atomically: the rating row and
    /// the comment counters change together or not at all. Fails with
    /// `NotFound` when the comment does not exist.
    async fn apply_rating(
        &self,
        user_id: i64,
        comment_id: i64,
        requested: RatingValue,
    ) -> StoreResult<RatingOutcome>;

    /// Removes the user's rating and adjusts the counters in one transaction.
    /// Returns `None` when there was nothing to remove.
    async fn remove_rating(&self, user_id: i64, comment_id: i64)
    -> StoreResult<Option<RatingCounts>>;
}

/// The full persistence surface the service needs.
pub trait Store: UserRepository + VideoRepository + CommentRepository + RatingRepository {}

impl<T> Store for T where T: UserRepository + VideoRepository + CommentRepository + RatingRepository
{}
