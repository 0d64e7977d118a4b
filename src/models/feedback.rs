// src/models/feedback.rs

use serde::Serialize;

/// A signed reaction a user attaches to a comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    Like,
    Dislike,
}

impl Reaction {
    /// Value stored in `comment_feedback.value`.
    pub fn value(self) -> i16 {
        match self {
            Reaction::Like => 1,
            Reaction::Dislike => -1,
        }
    }
}

/// Per (user, comment) reaction state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackState {
    None,
    Liked,
    Disliked,
}

/// Storage mutation needed to move between two states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackWrite {
    Insert(i16),
    Update(i16),
    Delete,
}

impl FeedbackState {
    /// Interprets the stored row (if any).
    pub fn from_value(value: Option<i16>) -> Self {
        match value {
            Some(v) if v > 0 => FeedbackState::Liked,
            Some(v) if v < 0 => FeedbackState::Disliked,
            _ => FeedbackState::None,
        }
    }

    /// Repeating the current reaction clears it; any other reaction replaces it.
    pub fn apply(self, reaction: Reaction) -> Self {
        match (self, reaction) {
            (FeedbackState::Liked, Reaction::Like) => FeedbackState::None,
            (FeedbackState::Disliked, Reaction::Dislike) => FeedbackState::None,
            (_, Reaction::Like) => FeedbackState::Liked,
            (_, Reaction::Dislike) => FeedbackState::Disliked,
        }
    }

    fn value(self) -> Option<i16> {
        match self {
            FeedbackState::None => None,
            FeedbackState::Liked => Some(Reaction::Like.value()),
            FeedbackState::Disliked => Some(Reaction::Dislike.value()),
        }
    }

    /// The write that turns `self` into `next`, or `None` if nothing changes.
    pub fn write_to(self, next: FeedbackState) -> Option<FeedbackWrite> {
        match (self.value(), next.value()) {
            (None, Some(v)) => Some(FeedbackWrite::Insert(v)),
            (Some(old), Some(new)) if old != new => Some(FeedbackWrite::Update(new)),
            (Some(_), None) => Some(FeedbackWrite::Delete),
            _ => None,
        }
    }
}

/// Response body after a like/dislike on a comment.
#[derive(Debug, Serialize)]
pub struct FeedbackResponse {
    pub comment_id: i64,
    pub state: FeedbackState,
    pub likes: i64,
    pub dislikes: i64,
}
