// src/openapi.rs

use utoipa::OpenApi;

use crate::handlers::{auth, catalog, interaction, pattern};

/// OpenAPI document served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        auth::register,
        auth::login,
        interaction::like_post,
        interaction::unlike_post,
        interaction::pin_comment,
        interaction::unpin_comment,
        interaction::like_comment,
        interaction::dislike_comment,
        pattern::list_patterns,
        pattern::save_pattern,
        catalog::get_category_subtree,
    ),
    tags(
        (name = "auth", description = "Sign-up and tokens"),
        (name = "community", description = "Posts, comments and reactions"),
        (name = "patterns", description = "Patterns, categories and saves")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_core_paths() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;
        assert!(paths.contains_key("/api/auth/register"));
        assert!(paths.contains_key("/api/comments/{id}/pin"));
        assert!(paths.contains_key("/api/categories/{id}/subtree"));
    }
}
