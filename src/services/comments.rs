use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        comment::{Comment, CommentResponse, CreateCommentRequest, NewComment},
        rating::RatingValue,
    },
    store::Store,
    utils::sanitize::sanitize_comment,
};

struct Node {
    comment: Comment,
    children: Vec<i64>,
}

/// Arena of comments indexed by id. Parent/child links are ids, so a thread
/// is rebuilt from flat rows on every read.
pub struct CommentTree {
    nodes: HashMap<i64, Node>,
    roots: Vec<i64>,
}

impl CommentTree {
    /// Builds the arena. Rows are expected oldest first; children keep that order.
    /// A reply whose parent is not among the rows is not reachable from any root.
    pub fn build(comments: Vec<Comment>) -> Self {
        let mut nodes: HashMap<i64, Node> = HashMap::with_capacity(comments.len());
        let mut order = Vec::with_capacity(comments.len());
        let mut roots = Vec::new();

        for comment in comments {
            order.push((comment.id, comment.parent_comment_id));
            if comment.is_top_level() {
                roots.push(comment.id);
            }
            nodes.insert(
                comment.id,
                Node {
                    comment,
                    children: Vec::new(),
                },
            );
        }

        for (id, parent) in order {
            if let Some(parent_node) = parent.and_then(|p| nodes.get_mut(&p)) {
                parent_node.children.push(id);
            }
        }

        Self { nodes, roots }
    }

    /// Top-level comments, oldest first.
    pub fn roots(&self) -> &[i64] {
        &self.roots
    }

    pub fn ids(&self) -> Vec<i64> {
        self.nodes.keys().copied().collect()
    }

    /// Renders a comment and its whole reply subtree.
    pub fn render(
        &self,
        id: i64,
        viewer_ratings: &HashMap<i64, RatingValue>,
    ) -> Option<CommentResponse> {
        let mut visited = HashSet::new();
        self.render_inner(id, viewer_ratings, &mut visited)
    }

    fn render_inner(
        &self,
        id: i64,
        viewer_ratings: &HashMap<i64, RatingValue>,
        visited: &mut HashSet<i64>,
    ) -> Option<CommentResponse> {
        if !visited.insert(id) {
            return None;
        }
        let node = self.nodes.get(&id)?;
        let c = &node.comment;

        let replies = node
            .children
            .iter()
            .filter_map(|child| self.render_inner(*child, viewer_ratings, visited))
            .collect();

        Some(CommentResponse {
            id: c.id,
            content: c.content.clone(),
            created_at: c.created_at,
            user_id: c.user_id,
            username: c.username.clone(),
            user_avatar: c.user_avatar.clone(),
            video_id: c.video_id,
            parent_comment_id: c.parent_comment_id,
            likes_count: c.likes_count,
            dislikes_count: c.dislikes_count,
            user_rating: viewer_ratings.get(&c.id).copied(),
            replies,
        })
    }
}

/// Creates, lists and deletes comment threads.
#[derive(Clone)]
pub struct CommentService {
    store: Arc<dyn Store>,
}

impl CommentService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn add_comment(
        &self,
        author_id: i64,
        payload: CreateCommentRequest,
    ) -> Result<CommentResponse, AppError> {
        payload.validate()?;

        let content = sanitize_comment(&payload.content);
        if content.is_empty() {
            return Err(AppError::BadRequest(
                "Comment must contain text".to_string(),
            ));
        }

        self.store
            .find_user(author_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User not found with ID: {}", author_id)))?;

        let video = self
            .store
            .find_video(payload.video_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Video not found with ID: {}", payload.video_id))
            })?;

        if let Some(parent_id) = payload.parent_comment_id {
            let parent = self.store.find_comment(parent_id).await?.ok_or_else(|| {
                AppError::NotFound(format!("Parent comment not found with ID: {}", parent_id))
            })?;

            if parent.video_id != video.id {
                return Err(AppError::BadRequest(
                    "Parent comment belongs to a different video".to_string(),
                ));
            }
        }

        let comment = self
            .store
            .insert_comment(NewComment {
                video_id: video.id,
                user_id: author_id,
                parent_comment_id: payload.parent_comment_id,
                content,
                created_at: Utc::now(),
            })
            .await?;

        tracing::info!(
            comment_id = comment.id,
            video_id = comment.video_id,
            user_id = author_id,
            "Comment created"
        );

        let id = comment.id;
        CommentTree::build(vec![comment])
            .render(id, &HashMap::new())
            .ok_or_else(|| AppError::InternalServerError("Created comment vanished".to_string()))
    }

    /// Top-level comments of a video with their replies nested inside.
    pub async fn list_for_video(
        &self,
        video_id: i64,
        viewer: Option<i64>,
    ) -> Result<Vec<CommentResponse>, AppError> {
        self.store
            .find_video(video_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Video not found with ID: {}", video_id)))?;

        let tree = CommentTree::build(self.store.comments_for_videos(&[video_id]).await?);
        self.render_roots(&tree, viewer).await
    }

    /// Top-level comments across every video.
    pub async fn list_all(&self, viewer: Option<i64>) -> Result<Vec<CommentResponse>, AppError> {
        let tree = CommentTree::build(self.store.all_comments().await?);
        self.render_roots(&tree, viewer).await
    }

    /// Every comment the user wrote, replies included, each with its own subtree.
    pub async fn list_for_user(
        &self,
        user_id: i64,
        viewer: Option<i64>,
    ) -> Result<Vec<CommentResponse>, AppError> {
        self.store
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User not found with ID: {}", user_id)))?;

        let authored = self.store.comments_by_user(user_id).await?;
        if authored.is_empty() {
            return Ok(Vec::new());
        }

        let mut video_ids: Vec<i64> = authored.iter().map(|c| c.video_id).collect();
        video_ids.sort_unstable();
        video_ids.dedup();

        let tree = CommentTree::build(self.store.comments_for_videos(&video_ids).await?);
        let ratings = self.viewer_ratings(&tree, viewer).await?;

        Ok(authored
            .iter()
            .filter_map(|c| tree.render(c.id, &ratings))
            .collect())
    }

    pub async fn get_by_id(
        &self,
        comment_id: i64,
        viewer: Option<i64>,
    ) -> Result<CommentResponse, AppError> {
        let comment = self.find(comment_id).await?;

        let tree = CommentTree::build(self.store.comments_for_videos(&[comment.video_id]).await?);
        let ratings = self.viewer_ratings(&tree, viewer).await?;

        tree.render(comment_id, &ratings)
            .ok_or_else(|| AppError::NotFound(format!("Comment not found with ID: {}", comment_id)))
    }

    /// Deletes a comment with its replies. Only the author or the uploader
    /// of the video may do so.
    pub async fn delete(&self, comment_id: i64, requester_id: i64) -> Result<(), AppError> {
        let comment = self.find(comment_id).await?;

        let video = self.store.find_video(comment.video_id).await?.ok_or_else(|| {
            AppError::InternalServerError(format!(
                "Comment {} references missing video {}",
                comment.id, comment.video_id
            ))
        })?;

        if requester_id != comment.user_id && requester_id != video.uploader_id {
            tracing::warn!(
                comment_id,
                requester_id,
                "Refused to delete comment owned by someone else"
            );
            return Err(AppError::Forbidden(
                "Not authorized to delete this comment".to_string(),
            ));
        }

        let removed = self.store.delete_comment_tree(comment_id).await?;
        tracing::info!(comment_id, requester_id, removed, "Comment deleted");

        Ok(())
    }

    async fn find(&self, comment_id: i64) -> Result<Comment, AppError> {
        self.store
            .find_comment(comment_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Comment not found with ID: {}", comment_id)))
    }

    async fn viewer_ratings(
        &self,
        tree: &CommentTree,
        viewer: Option<i64>,
    ) -> Result<HashMap<i64, RatingValue>, AppError> {
        match viewer {
            Some(user_id) => self.store.ratings_by_user(user_id, &tree.ids()).await,
            None => Ok(HashMap::new()),
        }
    }

    async fn render_roots(
        &self,
        tree: &CommentTree,
        viewer: Option<i64>,
    ) -> Result<Vec<CommentResponse>, AppError> {
        let ratings = self.viewer_ratings(tree, viewer).await?;
        Ok(tree
            .roots()
            .iter()
            .filter_map(|id| tree.render(*id, &ratings))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn row(id: i64, parent: Option<i64>) -> Comment {
        Comment {
            id,
            video_id: 1,
            user_id: 1,
            username: "alice".into(),
            user_avatar: None,
            parent_comment_id: parent,
            content: format!("comment {}", id),
            likes_count: 0,
            dislikes_count: 0,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(id),
        }
    }

    #[test]
    fn replies_nest_under_their_parents_and_never_appear_as_roots() {
        let tree = CommentTree::build(vec![
            row(1, None),
            row(2, Some(1)),
            row(3, None),
            row(4, Some(2)),
            row(5, Some(1)),
        ]);

        assert_eq!(tree.roots(), &[1, 3]);

        let first = tree.render(1, &HashMap::new()).unwrap();
        let reply_ids: Vec<i64> = first.replies.iter().map(|r| r.id).collect();
        assert_eq!(reply_ids, vec![2, 5]);
        assert_eq!(first.replies[0].replies[0].id, 4);
    }

    #[test]
    fn viewer_rating_is_attached_per_comment() {
        let tree = CommentTree::build(vec![row(1, None), row(2, Some(1))]);
        let ratings = HashMap::from([(2, RatingValue::Dislike)]);

        let rendered = tree.render(1, &ratings).unwrap();
        assert_eq!(rendered.user_rating, None);
        assert_eq!(rendered.replies[0].user_rating, Some(RatingValue::Dislike));
    }

    #[test]
    fn orphaned_replies_are_not_roots() {
        let tree = CommentTree::build(vec![row(7, Some(99))]);
        assert!(tree.roots().is_empty());
        assert!(tree.render(7, &HashMap::new()).is_some());
    }
}
