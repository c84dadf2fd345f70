//! PostgreSQL-backed store.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use super::{CommentRepository, RatingRepository, StoreResult, UserRepository, VideoRepository};
use crate::{
    error::{AppError, is_unique_violation},
    models::{
        comment::{Comment, NewComment},
        rating::{CommentRating, RatingCounts, RatingOutcome, RatingTransition, RatingValue},
        user::{NewUser, Role, User, parse_roles},
        video::{NewVideo, Video},
    },
};

const COMMENT_COLUMNS: &str = r#"
    c.id, c.video_id, c.user_id, u.username, u.avatar_url AS user_avatar,
    c.parent_comment_id, c.content, c.likes_count, c.dislikes_count, c.created_at
"#;

/// Raw 'users' row; roles are stored as a TEXT[] column.
#[derive(FromRow)]
struct UserRow {
    id: i64,
    username: String,
    password: String,
    roles: Vec<String>,
    avatar_url: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            password: row.password,
            roles: parse_roles(&row.roles),
            avatar_url: row.avatar_url,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct RatingRow {
    id: i64,
    user_id: i64,
    comment_id: i64,
    rating: i16,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<RatingRow> for CommentRating {
    type Error = AppError;

    fn try_from(row: RatingRow) -> Result<Self, Self::Error> {
        let rating = RatingValue::from_i16(row.rating).ok_or_else(|| {
            AppError::InternalServerError(format!(
                "comment_ratings.{} holds invalid rating {}",
                row.id, row.rating
            ))
        })?;
        Ok(CommentRating {
            id: row.id,
            user_id: row.user_id,
            comment_id: row.comment_id,
            rating,
            created_at: row.created_at,
        })
    }
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn find_user(&self, id: i64) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, password, roles, avatar_url, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, password, roles, avatar_url, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let roles: Vec<String> = user.roles.iter().map(Role::to_string).collect();

        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (username, password, roles)
            VALUES ($1, $2, $3)
            RETURNING id, username, password, roles, avatar_url, created_at
            "#,
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&roles)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!("Username '{}' already exists", user.username))
            } else {
                tracing::error!("Failed to insert user: {:?}", e);
                AppError::from(e)
            }
        })?;

        Ok(row.into())
    }

    async fn set_avatar_url(&self, user_id: i64, avatar_url: &str) -> StoreResult<User> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            UPDATE users SET avatar_url = $2
            WHERE id = $1
            RETURNING id, username, password, roles, avatar_url, created_at
            "#,
        )
        .bind(user_id)
        .bind(avatar_url)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User not found with ID: {}", user_id)))?;

        Ok(row.into())
    }
}

#[async_trait]
impl VideoRepository for PgStore {
    async fn find_video(&self, id: i64) -> StoreResult<Option<Video>> {
        let video = sqlx::query_as::<_, Video>(
            r#"
            SELECT id, uploader_id, title, description, video_url, thumbnail_url, created_at
            FROM videos
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(video)
    }

    async fn insert_video(&self, video: NewVideo) -> StoreResult<Video> {
        let video = sqlx::query_as::<_, Video>(
            r#"
            INSERT INTO videos (uploader_id, title, description, video_url, thumbnail_url)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, uploader_id, title, description, video_url, thumbnail_url, created_at
            "#,
        )
        .bind(video.uploader_id)
        .bind(&video.title)
        .bind(&video.description)
        .bind(&video.video_url)
        .bind(&video.thumbnail_url)
        .fetch_one(&self.pool)
        .await?;

        Ok(video)
    }

    async fn list_videos(&self) -> StoreResult<Vec<Video>> {
        let videos = sqlx::query_as::<_, Video>(
            r#"
            SELECT id, uploader_id, title, description, video_url, thumbnail_url, created_at
            FROM videos
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(videos)
    }
}

#[async_trait]
impl CommentRepository for PgStore {
    async fn insert_comment(&self, comment: NewComment) -> StoreResult<Comment> {
        let query = format!(
            r#"
            WITH c AS (
                INSERT INTO comments (video_id, user_id, parent_comment_id, content, created_at)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING *
            )
            SELECT {COMMENT_COLUMNS}
            FROM c
            JOIN users u ON u.id = c.user_id
            "#
        );

        let inserted = sqlx::query_as::<_, Comment>(&query)
            .bind(comment.video_id)
            .bind(comment.user_id)
            .bind(comment.parent_comment_id)
            .bind(&comment.content)
            .bind(comment.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to insert comment: {:?}", e);
                AppError::from(e)
            })?;

        Ok(inserted)
    }

    async fn find_comment(&self, id: i64) -> StoreResult<Option<Comment>> {
        let query = format!(
            "SELECT {COMMENT_COLUMNS} FROM comments c JOIN users u ON u.id = c.user_id WHERE c.id = $1"
        );

        let comment = sqlx::query_as::<_, Comment>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(comment)
    }

    async fn comments_for_videos(&self, video_ids: &[i64]) -> StoreResult<Vec<Comment>> {
        let query = format!(
            r#"
            SELECT {COMMENT_COLUMNS}
            FROM comments c
            JOIN users u ON u.id = c.user_id
            WHERE c.video_id = ANY($1)
            ORDER BY c.created_at ASC, c.id ASC
            "#
        );

        let comments = sqlx::query_as::<_, Comment>(&query)
            .bind(video_ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(comments)
    }

    async fn all_comments(&self) -> StoreResult<Vec<Comment>> {
        let query = format!(
            r#"
            SELECT {COMMENT_COLUMNS}
            FROM comments c
            JOIN users u ON u.id = c.user_id
            ORDER BY c.created_at ASC, c.id ASC
            "#
        );

        let comments = sqlx::query_as::<_, Comment>(&query)
            .fetch_all(&self.pool)
            .await?;

        Ok(comments)
    }

    async fn comments_by_user(&self, user_id: i64) -> StoreResult<Vec<Comment>> {
        let query = format!(
            r#"
            SELECT {COMMENT_COLUMNS}
            FROM comments c
            JOIN users u ON u.id = c.user_id
            WHERE c.user_id = $1
            ORDER BY c.created_at ASC, c.id ASC
            "#
        );

        let comments = sqlx::query_as::<_, Comment>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(comments)
    }

    async fn delete_comment_tree(&self, id: i64) -> StoreResult<u64> {
        // Ratings go with their comments through ON DELETE CASCADE.
        let result = sqlx::query(
            r#"
            WITH RECURSIVE subtree AS (
                SELECT id FROM comments WHERE id = $1
                UNION ALL
                SELECT c.id FROM comments c JOIN subtree s ON c.parent_comment_id = s.id
            )
            DELETE FROM comments WHERE id IN (SELECT id FROM subtree)
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete comment {}: {:?}", id, e);
            AppError::from(e)
        })?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl RatingRepository for PgStore {
    async fn find_rating(
        &self,
        user_id: i64,
        comment_id: i64,
    ) -> StoreResult<Option<CommentRating>> {
        let row = sqlx::query_as::<_, RatingRow>(
            r#"
            SELECT id, user_id, comment_id, rating, created_at
            FROM comment_ratings
            WHERE user_id = $1 AND comment_id = $2
            "#,
        )
        .bind(user_id)
        .bind(comment_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(CommentRating::try_from).transpose()
    }

    async fn ratings_by_user(
        &self,
        user_id: i64,
        comment_ids: &[i64],
    ) -> StoreResult<HashMap<i64, RatingValue>> {
        let rows = sqlx::query_as::<_, (i64, i16)>(
            r#"
            SELECT comment_id, rating
            FROM comment_ratings
            WHERE user_id = $1 AND comment_id = ANY($2)
            "#,
        )
        .bind(user_id)
        .bind(comment_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(comment_id, rating)| {
                RatingValue::from_i16(rating).map(|value| (comment_id, value))
            })
            .collect())
    }

    async fn apply_rating(
        &self,
        user_id: i64,
        comment_id: i64,
        requested: RatingValue,
    ) -> StoreResult<RatingOutcome> {
        let mut tx = self.pool.begin().await?;

        // 1. Lock the comment row so rating requests on it run one at a time
        sqlx::query_scalar::<_, i64>("SELECT id FROM comments WHERE id = $1 FOR UPDATE")
            .bind(comment_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Comment not found with ID: {}", comment_id))
            })?;

        // 2. Current rating of this user, if any
        let existing = sqlx::query_scalar::<_, i16>(
            "SELECT rating FROM comment_ratings WHERE user_id = $1 AND comment_id = $2",
        )
        .bind(user_id)
        .bind(comment_id)
        .fetch_optional(&mut *tx)
        .await?
        .and_then(RatingValue::from_i16);

        let transition = RatingTransition::resolve(existing, requested);

        // 3. Rating row
        match transition {
            RatingTransition::Create(value) => {
                sqlx::query(
                    "INSERT INTO comment_ratings (user_id, comment_id, rating) VALUES ($1, $2, $3)",
                )
                .bind(user_id)
                .bind(comment_id)
                .bind(value.as_i16())
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    if is_unique_violation(&e) {
                        return AppError::Conflict("Comment already rated".to_string());
                    }
                    AppError::from(e)
                })?;
            }
            RatingTransition::Remove(_) => {
                sqlx::query("DELETE FROM comment_ratings WHERE user_id = $1 AND comment_id = $2")
                    .bind(user_id)
                    .bind(comment_id)
                    .execute(&mut *tx)
                    .await?;
            }
            RatingTransition::Switch { to, .. } => {
                sqlx::query(
                    "UPDATE comment_ratings SET rating = $3 WHERE user_id = $1 AND comment_id = $2",
                )
                .bind(user_id)
                .bind(comment_id)
                .bind(to.as_i16())
                .execute(&mut *tx)
                .await?;
            }
        }

        // 4. Counters follow the transition
        let counts = update_counters(&mut tx, comment_id, transition.deltas()).await?;

        tx.commit().await?;

        Ok(RatingOutcome { transition, counts })
    }

    async fn remove_rating(
        &self,
        user_id: i64,
        comment_id: i64,
    ) -> StoreResult<Option<RatingCounts>> {
        let mut tx = self.pool.begin().await?;

        let locked =
            sqlx::query_scalar::<_, i64>("SELECT id FROM comments WHERE id = $1 FOR UPDATE")
                .bind(comment_id)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Ok(None);
        }

        let removed = sqlx::query_scalar::<_, i16>(
            "DELETE FROM comment_ratings WHERE user_id = $1 AND comment_id = $2 RETURNING rating",
        )
        .bind(user_id)
        .bind(comment_id)
        .fetch_optional(&mut *tx)
        .await?
        .and_then(RatingValue::from_i16);

        let Some(value) = removed else {
            return Ok(None);
        };

        let deltas = RatingTransition::Remove(value).deltas();
        let counts = update_counters(&mut tx, comment_id, deltas).await?;

        tx.commit().await?;

        Ok(Some(counts))
    }
}

async fn update_counters(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    comment_id: i64,
    (likes, dislikes): (i32, i32),
) -> StoreResult<RatingCounts> {
    let (likes, dislikes) = sqlx::query_as::<_, (i32, i32)>(
        r#"
        UPDATE comments
        SET likes_count = likes_count + $2, dislikes_count = dislikes_count + $3
        WHERE id = $1
        RETURNING likes_count, dislikes_count
        "#,
    )
    .bind(comment_id)
    .bind(likes)
    .bind(dislikes)
    .fetch_one(&mut **tx)
    .await?;

    Ok(RatingCounts { likes, dislikes })
}
