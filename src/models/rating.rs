use serde::{Deserialize, Serialize};

/// A user's verdict on a comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RatingValue {
    Like,
    Dislike,
}

impl RatingValue {
    /// Value stored in `comment_ratings.rating`.
    pub fn as_i16(self) -> i16 {
        match self {
            RatingValue::Like => 1,
            RatingValue::Dislike => -1,
        }
    }

    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            1 => Some(RatingValue::Like),
            -1 => Some(RatingValue::Dislike),
            _ => None,
        }
    }
}

/// Represents the 'comment_ratings' table in the database.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRating {
    pub id: i64,
    pub user_id: i64,
    pub comment_id: i64,
    pub rating: RatingValue,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Aggregate like/dislike counters of one comment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RatingCounts {
    pub likes: i32,
    pub dislikes: i32,
}

/// What a rating request does to the (user, comment) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingTransition {
    /// No rating existed; one is inserted.
    Create(RatingValue),
    /// The same value was sent again; the rating is removed.
    Remove(RatingValue),
    /// The opposite value was sent; the rating is flipped in place.
    Switch { from: RatingValue, to: RatingValue },
}

impl RatingTransition {
    pub fn resolve(existing: Option<RatingValue>, requested: RatingValue) -> Self {
        match existing {
            None => RatingTransition::Create(requested),
            Some(current) if current == requested => RatingTransition::Remove(current),
            Some(current) => RatingTransition::Switch {
                from: current,
                to: requested,
            },
        }
    }

    /// Counter deltas `(likes, dislikes)` this transition applies.
    pub fn deltas(&self) -> (i32, i32) {
        fn bucket(value: RatingValue, sign: i32) -> (i32, i32) {
            match value {
                RatingValue::Like => (sign, 0),
                RatingValue::Dislike => (0, sign),
            }
        }

        match *self {
            RatingTransition::Create(v) => bucket(v, 1),
            RatingTransition::Remove(v) => bucket(v, -1),
            RatingTransition::Switch { from, to } => {
                let (l1, d1) = bucket(from, -1);
                let (l2, d2) = bucket(to, 1);
                (l1 + l2, d1 + d2)
            }
        }
    }

    /// The pair's rating once the transition is committed.
    pub fn resulting(&self) -> Option<RatingValue> {
        match *self {
            RatingTransition::Create(v) => Some(v),
            RatingTransition::Remove(_) => None,
            RatingTransition::Switch { to, .. } => Some(to),
        }
    }
}

impl RatingCounts {
    pub fn apply(&mut self, transition: &RatingTransition) {
        let (likes, dislikes) = transition.deltas();
        self.likes += likes;
        self.dislikes += dislikes;
    }
}

/// Result of a committed rating request.
#[derive(Debug, Clone, Copy)]
pub struct RatingOutcome {
    pub transition: RatingTransition,
    pub counts: RatingCounts,
}

/// DTO for rating a comment.
#[derive(Debug, Deserialize)]
pub struct RateCommentRequest {
    pub rating: RatingValue,
}

/// Counters plus the caller's own rating after a rate request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateCommentResponse {
    pub likes: i32,
    pub dislikes: i32,
    pub user_rating: Option<RatingValue>,
}

impl From<RatingOutcome> for RateCommentResponse {
    fn from(outcome: RatingOutcome) -> Self {
        Self {
            likes: outcome.counts.likes,
            dislikes: outcome.counts.dislikes,
            user_rating: outcome.transition.resulting(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use RatingValue::{Dislike, Like};

    #[test]
    fn resolve_covers_every_pair_state() {
        assert_eq!(RatingTransition::resolve(None, Like), RatingTransition::Create(Like));
        assert_eq!(RatingTransition::resolve(Some(Like), Like), RatingTransition::Remove(Like));
        assert_eq!(
            RatingTransition::resolve(Some(Like), Dislike),
            RatingTransition::Switch { from: Like, to: Dislike }
        );
    }

    #[test]
    fn switch_moves_one_vote_between_buckets() {
        let mut counts = RatingCounts { likes: 3, dislikes: 1 };
        counts.apply(&RatingTransition::resolve(Some(Like), Dislike));
        assert_eq!(counts, RatingCounts { likes: 2, dislikes: 2 });
    }

    #[test]
    fn toggle_twice_restores_counts() {
        let mut counts = RatingCounts::default();
        counts.apply(&RatingTransition::resolve(None, Dislike));
        counts.apply(&RatingTransition::resolve(Some(Dislike), Dislike));
        assert_eq!(counts, RatingCounts::default());
    }

    #[test]
    fn stored_values_round_trip() {
        assert_eq!(RatingValue::from_i16(Like.as_i16()), Some(Like));
        assert_eq!(RatingValue::from_i16(0), None);
    }
}
