// src/models/mod.rs

use url::Url;

pub mod category;
pub mod comment;
pub mod feedback;
pub mod like;
pub mod pattern;
pub mod post;
pub mod project;
pub mod tag;
pub mod user;

/// Validates that a string is a correctly formatted URL.
pub(crate) fn validate_url_string(url: &str) -> Result<(), validator::ValidationError> {
    if Url::parse(url).is_err() {
        return Err(validator::ValidationError::new("invalid_url"));
    }
    Ok(())
}
