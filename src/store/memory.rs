//! In-process store.
//!
//! All tables live behind one async mutex, so every operation observes and
//! leaves a consistent snapshot; this is what makes the rating read-modify-
//! write atomic here.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use super::{CommentRepository, RatingRepository, StoreResult, UserRepository, VideoRepository};
use crate::{
    error::AppError,
    models::{
        comment::{Comment, NewComment},
        rating::{CommentRating, RatingCounts, RatingOutcome, RatingTransition, RatingValue},
        user::{NewUser, User},
        video::{NewVideo, Video},
    },
};

/// Stored comment without the joined author columns.
#[derive(Debug, Clone)]
struct CommentEntry {
    id: i64,
    video_id: i64,
    user_id: i64,
    parent_comment_id: Option<i64>,
    content: String,
    counts: RatingCounts,
    created_at: chrono::DateTime<Utc>,
}

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    videos: BTreeMap<i64, Video>,
    comments: BTreeMap<i64, CommentEntry>,
    /// Keyed by (user_id, comment_id), which keeps at most one rating per pair.
    ratings: HashMap<(i64, i64), CommentRating>,
    next_user_id: i64,
    next_video_id: i64,
    next_comment_id: i64,
    next_rating_id: i64,
}

fn next_id(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

impl Tables {
    fn hydrate(&self, entry: &CommentEntry) -> Comment {
        let author = self.users.get(&entry.user_id);
        Comment {
            id: entry.id,
            video_id: entry.video_id,
            user_id: entry.user_id,
            username: author.map(|u| u.username.clone()).unwrap_or_default(),
            user_avatar: author.and_then(|u| u.avatar_url.clone()),
            parent_comment_id: entry.parent_comment_id,
            content: entry.content.clone(),
            likes_count: entry.counts.likes,
            dislikes_count: entry.counts.dislikes,
            created_at: entry.created_at,
        }
    }

    /// Comments matching `filter`, oldest first.
    fn select_comments(&self, filter: impl Fn(&CommentEntry) -> bool) -> Vec<Comment> {
        let mut selected: Vec<&CommentEntry> =
            self.comments.values().filter(|c| filter(*c)).collect();
        selected.sort_by_key(|c| (c.created_at, c.id));
        selected.into_iter().map(|c| self.hydrate(c)).collect()
    }

    fn subtree_ids(&self, root: i64) -> Vec<i64> {
        let mut ids = vec![root];
        let mut cursor = 0;
        while cursor < ids.len() {
            let parent = ids[cursor];
            ids.extend(
                self.comments
                    .values()
                    .filter(|c| c.parent_comment_id == Some(parent))
                    .map(|c| c.id),
            );
            cursor += 1;
        }
        ids
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_user(&self, id: i64) -> StoreResult<Option<User>> {
        Ok(self.tables.lock().await.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let mut tables = self.tables.lock().await;
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(AppError::Conflict(format!(
                "Username '{}' already exists",
                user.username
            )));
        }

        let id = next_id(&mut tables.next_user_id);
        let created = User {
            id,
            username: user.username,
            password: user.password_hash,
            roles: user.roles,
            avatar_url: None,
            created_at: Utc::now(),
        };
        tables.users.insert(id, created.clone());
        Ok(created)
    }

    async fn set_avatar_url(&self, user_id: i64, avatar_url: &str) -> StoreResult<User> {
        let mut tables = self.tables.lock().await;
        let user = tables
            .users
            .get_mut(&user_id)
            .ok_or_else(|| AppError::NotFound(format!("User not found with ID: {}", user_id)))?;
        user.avatar_url = Some(avatar_url.to_string());
        Ok(user.clone())
    }
}

#[async_trait]
impl VideoRepository for MemoryStore {
    async fn find_video(&self, id: i64) -> StoreResult<Option<Video>> {
        Ok(self.tables.lock().await.videos.get(&id).cloned())
    }

    async fn insert_video(&self, video: NewVideo) -> StoreResult<Video> {
        let mut tables = self.tables.lock().await;
        if !tables.users.contains_key(&video.uploader_id) {
            return Err(AppError::NotFound(format!(
                "User not found with ID: {}",
                video.uploader_id
            )));
        }

        let id = next_id(&mut tables.next_video_id);
        let created = Video {
            id,
            uploader_id: video.uploader_id,
            title: video.title,
            description: video.description,
            video_url: video.video_url,
            thumbnail_url: video.thumbnail_url,
            created_at: Utc::now(),
        };
        tables.videos.insert(id, created.clone());
        Ok(created)
    }

    async fn list_videos(&self) -> StoreResult<Vec<Video>> {
        let tables = self.tables.lock().await;
        let mut videos: Vec<Video> = tables.videos.values().cloned().collect();
        videos.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(videos)
    }
}

#[async_trait]
impl CommentRepository for MemoryStore {
    async fn insert_comment(&self, comment: NewComment) -> StoreResult<Comment> {
        let mut tables = self.tables.lock().await;
        if !tables.users.contains_key(&comment.user_id) {
            return Err(AppError::NotFound(format!(
                "User not found with ID: {}",
                comment.user_id
            )));
        }
        if !tables.videos.contains_key(&comment.video_id) {
            return Err(AppError::NotFound(format!(
                "Video not found with ID: {}",
                comment.video_id
            )));
        }
        if let Some(parent) = comment.parent_comment_id {
            if !tables.comments.contains_key(&parent) {
                return Err(AppError::NotFound(format!(
                    "Parent comment not found with ID: {}",
                    parent
                )));
            }
        }

        let id = next_id(&mut tables.next_comment_id);
        let entry = CommentEntry {
            id,
            video_id: comment.video_id,
            user_id: comment.user_id,
            parent_comment_id: comment.parent_comment_id,
            content: comment.content,
            counts: RatingCounts::default(),
            created_at: comment.created_at,
        };
        let hydrated = tables.hydrate(&entry);
        tables.comments.insert(id, entry);
        Ok(hydrated)
    }

    async fn find_comment(&self, id: i64) -> StoreResult<Option<Comment>> {
        let tables = self.tables.lock().await;
        Ok(tables.comments.get(&id).map(|c| tables.hydrate(c)))
    }

    async fn comments_for_videos(&self, video_ids: &[i64]) -> StoreResult<Vec<Comment>> {
        let tables = self.tables.lock().await;
        Ok(tables.select_comments(|c| video_ids.contains(&c.video_id)))
    }

    async fn all_comments(&self) -> StoreResult<Vec<Comment>> {
        let tables = self.tables.lock().await;
        Ok(tables.select_comments(|_| true))
    }

    async fn comments_by_user(&self, user_id: i64) -> StoreResult<Vec<Comment>> {
        let tables = self.tables.lock().await;
        Ok(tables.select_comments(|c| c.user_id == user_id))
    }

    async fn delete_comment_tree(&self, id: i64) -> StoreResult<u64> {
        let mut tables = self.tables.lock().await;
        if !tables.comments.contains_key(&id) {
            return Ok(0);
        }

        let doomed = tables.subtree_ids(id);
        tables
            .ratings
            .retain(|(_, comment_id), _| !doomed.contains(comment_id));
        for comment_id in &doomed {
            tables.comments.remove(comment_id);
        }
        Ok(doomed.len() as u64)
    }
}

#[async_trait]
impl RatingRepository for MemoryStore {
    async fn find_rating(
        &self,
        user_id: i64,
        comment_id: i64,
    ) -> StoreResult<Option<CommentRating>> {
        let tables = self.tables.lock().await;
        Ok(tables.ratings.get(&(user_id, comment_id)).cloned())
    }

    async fn ratings_by_user(
        &self,
        user_id: i64,
        comment_ids: &[i64],
    ) -> StoreResult<HashMap<i64, RatingValue>> {
        let tables = self.tables.lock().await;
        Ok(comment_ids
            .iter()
            .filter_map(|id| {
                tables
                    .ratings
                    .get(&(user_id, *id))
                    .map(|r| (*id, r.rating))
            })
            .collect())
    }

    async fn apply_rating(
        &self,
        user_id: i64,
        comment_id: i64,
        requested: RatingValue,
    ) -> StoreResult<RatingOutcome> {
        let mut tables = self.tables.lock().await;
        if !tables.comments.contains_key(&comment_id) {
            return Err(AppError::NotFound(format!(
                "Comment not found with ID: {}",
                comment_id
            )));
        }

        let key = (user_id, comment_id);
        let existing = tables.ratings.get(&key).map(|r| r.rating);
        let transition = RatingTransition::resolve(existing, requested);

        match transition {
            RatingTransition::Create(value) => {
                let id = next_id(&mut tables.next_rating_id);
                tables.ratings.insert(
                    key,
                    CommentRating {
                        id,
                        user_id,
                        comment_id,
                        rating: value,
                        created_at: Utc::now(),
                    },
                );
            }
            RatingTransition::Remove(_) => {
                tables.ratings.remove(&key);
            }
            RatingTransition::Switch { to, .. } => {
                if let Some(rating) = tables.ratings.get_mut(&key) {
                    rating.rating = to;
                }
            }
        }

        let counts = match tables.comments.get_mut(&comment_id) {
            Some(entry) => {
                entry.counts.apply(&transition);
                entry.counts
            }
            None => RatingCounts::default(),
        };

        Ok(RatingOutcome { transition, counts })
    }

    async fn remove_rating(
        &self,
        user_id: i64,
        comment_id: i64,
    ) -> StoreResult<Option<RatingCounts>> {
        let mut tables = self.tables.lock().await;
        let Some(removed) = tables.ratings.remove(&(user_id, comment_id)) else {
            return Ok(None);
        };

        let transition = RatingTransition::Remove(removed.rating);
        Ok(tables.comments.get_mut(&comment_id).map(|entry| {
            entry.counts.apply(&transition);
            entry.counts
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Role;

    async fn seeded() -> (MemoryStore, i64, i64) {
        let store = MemoryStore::new();
        let user = store
            .insert_user(NewUser {
                username: "alice".into(),
                password_hash: "x".into(),
                roles: vec![Role::User],
            })
            .await
            .unwrap();
        let video = store
            .insert_video(NewVideo {
                uploader_id: user.id,
                title: "v".into(),
                description: String::new(),
                video_url: "https://cdn.example/v.mp4".into(),
                thumbnail_url: None,
            })
            .await
            .unwrap();
        (store, user.id, video.id)
    }

    fn new_comment(video_id: i64, user_id: i64, parent: Option<i64>) -> NewComment {
        NewComment {
            video_id,
            user_id,
            parent_comment_id: parent,
            content: "hi".into(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn deleting_a_comment_takes_replies_and_ratings_with_it() {
        let (store, user_id, video_id) = seeded().await;
        let root = store.insert_comment(new_comment(video_id, user_id, None)).await.unwrap();
        let reply = store
            .insert_comment(new_comment(video_id, user_id, Some(root.id)))
            .await
            .unwrap();
        let nested = store
            .insert_comment(new_comment(video_id, user_id, Some(reply.id)))
            .await
            .unwrap();
        store.apply_rating(user_id, nested.id, RatingValue::Like).await.unwrap();

        assert_eq!(store.delete_comment_tree(root.id).await.unwrap(), 3);
        assert!(store.find_comment(nested.id).await.unwrap().is_none());
        assert!(store.find_rating(user_id, nested.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_usernames_conflict() {
        let (store, _, _) = seeded().await;
        let err = store
            .insert_user(NewUser {
                username: "alice".into(),
                password_hash: "y".into(),
                roles: vec![Role::User],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn remove_rating_is_a_no_op_without_a_rating() {
        let (store, user_id, video_id) = seeded().await;
        let comment = store.insert_comment(new_comment(video_id, user_id, None)).await.unwrap();
        assert_eq!(store.remove_rating(user_id, comment.id).await.unwrap(), None);
    }
}
