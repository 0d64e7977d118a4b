// src/models/comment.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::error::AppError;

/// DTO for creating a new comment.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    /// The post being commented on.
    pub post: i64,

    #[validate(length(
        min = 1,
        max = 5000,
        message = "Comment must be between 1 and 5000 characters"
    ))]
    pub content: String,
}

/// DTO for displaying a comment with author info and reaction counts.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CommentResponse {
    pub id: i64,
    pub author: i64,
    pub author_username: String,
    pub post: i64,
    pub content: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub is_pinned: bool,
    pub likes: i64,
    pub dislikes: i64,
}

/// Row used to evaluate pin/unpin against the owning post.
#[derive(Debug, FromRow)]
pub struct PinTarget {
    pub id: i64,
    pub post_id: i64,
    pub is_pinned: bool,
    pub post_author_id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PinAction {
    Pin,
    Unpin,
}

pub const ALREADY_PINNED: &str = "There already is a pinned comment on this post.";

impl PinAction {
    /// Evaluates the action and returns the new `is_pinned` value.
    ///
    /// * Only the author of the post may pin or unpin its comments.
    /// * `pin` requires that no comment on the post is pinned yet.
    /// * `unpin` requires that this comment is pinned.
    pub fn evaluate(
        self,
        caller_id: i64,
        target: &PinTarget,
        post_has_pinned: bool,
    ) -> Result<bool, AppError> {
        if target.post_author_id != caller_id {
            return Err(AppError::Forbidden(
                "You can only pin comments on your posts.".to_string(),
            ));
        }

        match self {
            PinAction::Pin if post_has_pinned => Err(AppError::BadRequest(ALREADY_PINNED.to_string())),
            PinAction::Pin => Ok(true),
            PinAction::Unpin if target.is_pinned => Ok(false),
            PinAction::Unpin => Err(AppError::BadRequest(
                "Can't unpin comment that has not been pinned.".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AUTHOR: i64 = 10;

    fn comment(id: i64, is_pinned: bool) -> PinTarget {
        PinTarget {
            id,
            post_id: 1,
            is_pinned,
            post_author_id: AUTHOR,
        }
    }

    #[test]
    fn author_pins_then_unpins() {
        let c = comment(1, false);
        assert_eq!(PinAction::Pin.evaluate(AUTHOR, &c, false), Ok(true));

        let pinned = comment(1, true);
        assert_eq!(PinAction::Unpin.evaluate(AUTHOR, &pinned, true), Ok(false));
    }

    #[test]
    fn second_pin_on_same_post_is_rejected() {
        let second = comment(2, false);
        assert_eq!(
            PinAction::Pin.evaluate(AUTHOR, &second, true),
            Err(AppError::BadRequest(ALREADY_PINNED.to_string()))
        );
    }

    #[test]
    fn unpinning_unpinned_comment_is_rejected() {
        assert!(matches!(
            PinAction::Unpin.evaluate(AUTHOR, &comment(1, false), false),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn only_post_author_may_pin() {
        assert!(matches!(
            PinAction::Pin.evaluate(99, &comment(1, false), false),
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            PinAction::Unpin.evaluate(99, &comment(1, true), true),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn pin_swap_scenario() {
        // pin 1, pin 2 fails, unpin 1, pin 2
        let mut pinned: Option<i64> = None;
        let mut step = |action: PinAction, id: i64| -> Result<(), AppError> {
            let target = comment(id, pinned == Some(id));
            let now_pinned = action.evaluate(AUTHOR, &target, pinned.is_some())?;
            pinned = if now_pinned { Some(id) } else { None };
            Ok(())
        };

        assert!(step(PinAction::Pin, 1).is_ok());
        assert!(step(PinAction::Pin, 2).is_err());
        assert!(step(PinAction::Unpin, 1).is_ok());
        assert!(step(PinAction::Pin, 2).is_ok());
        assert_eq!(pinned, Some(2));
    }
}
