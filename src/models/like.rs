// src/models/like.rs

use serde::Serialize;
use sqlx::FromRow;

use crate::error::AppError;

/// Liked/saved item with its author's contact details.
#[derive(Debug, FromRow)]
pub struct LikedItem {
    pub title: String,
    pub author_username: Option<String>,
    pub author_email: Option<String>,
}

/// Response body after a like/unlike or save/unsave.
#[derive(Debug, Serialize)]
pub struct LikeResponse {
    pub message: &'static str,
    pub count: i64,
}

/// Items that carry an unsigned like-set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeTarget {
    Post,
    Pattern,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeAction {
    Like,
    Unlike,
}

impl LikeTarget {
    /// Membership table and its item column.
    pub fn table(self) -> (&'static str, &'static str) {
        match self {
            LikeTarget::Post => ("post_likes", "post_id"),
            LikeTarget::Pattern => ("pattern_saves", "pattern_id"),
        }
    }

    /// Item table (`id`, `user_id`, `title`).
    pub fn item_table(self) -> &'static str {
        match self {
            LikeTarget::Post => "posts",
            LikeTarget::Pattern => "patterns",
        }
    }

    pub fn item_name(self) -> &'static str {
        match self {
            LikeTarget::Post => "post",
            LikeTarget::Pattern => "pattern",
        }
    }

    /// Plural used in milestone mails ("likes", "saves").
    pub fn count_noun(self) -> &'static str {
        match self {
            LikeTarget::Post => "likes",
            LikeTarget::Pattern => "saves",
        }
    }

    pub fn not_found(self) -> AppError {
        match self {
            LikeTarget::Post => AppError::NotFound("Post not found.".to_string()),
            LikeTarget::Pattern => AppError::NotFound("Pattern not found.".to_string()),
        }
    }
}

impl LikeAction {
    /// Judges the membership write by whether it changed a row.
    ///
    /// A repeat like and an unlike of a non-member are both rejected.
    pub fn resolve(self, target: LikeTarget, changed: bool) -> Result<&'static str, AppError> {
        match (self, target, changed) {
            (LikeAction::Like, LikeTarget::Post, true) => Ok("Post liked successfully."),
            (LikeAction::Like, LikeTarget::Pattern, true) => Ok("Pattern saved successfully."),
            (LikeAction::Unlike, LikeTarget::Post, true) => Ok("Post unliked successfully."),
            (LikeAction::Unlike, LikeTarget::Pattern, true) => Ok("Pattern removed successfully."),
            (LikeAction::Like, LikeTarget::Post, false) => {
                Err(AppError::BadRequest("Post already liked.".to_string()))
            }
            (LikeAction::Like, LikeTarget::Pattern, false) => {
                Err(AppError::BadRequest("Pattern already saved.".to_string()))
            }
            (LikeAction::Unlike, LikeTarget::Post, false) => {
                Err(AppError::BadRequest("Post is not liked.".to_string()))
            }
            (LikeAction::Unlike, LikeTarget::Pattern, false) => {
                Err(AppError::BadRequest("Pattern is not saved.".to_string()))
            }
        }
    }
}

/// True when `count` lands exactly on a positive multiple of `every`.
pub fn milestone_reached(count: i64, every: i64) -> bool {
    every > 0 && count > 0 && count % every == 0
}
