// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{delete, get, patch, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    handlers::{auth, catalog, community, interaction, pattern, profile, project},
    openapi::ApiDoc,
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Public: register, login, popular patterns and the API docs.
/// * Everything else sits behind `auth_middleware`; `/api/admin` also
///   requires the admin role.
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let public_routes = Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/patterns/popular", get(pattern::popular_patterns));

    let community_routes = Router::new()
        .route("/tags", get(community::list_tags))
        .route(
            "/posts",
            get(community::list_posts).post(community::create_post),
        )
        .route(
            "/posts/{id}",
            get(community::get_post).delete(community::delete_post),
        )
        .route(
            "/posts/{id}/like",
            post(interaction::like_post).delete(interaction::unlike_post),
        )
        .route("/comments", post(interaction::create_comment))
        .route("/comments/{id}", delete(interaction::delete_comment))
        .route("/comments/{id}/pin", patch(interaction::pin_comment))
        .route("/comments/{id}/unpin", patch(interaction::unpin_comment))
        .route("/comments/{id}/like", post(interaction::like_comment))
        .route("/comments/{id}/dislike", post(interaction::dislike_comment));

    let pattern_routes = Router::new()
        .route(
            "/patterns",
            get(pattern::list_patterns).post(pattern::create_pattern),
        )
        .route("/patterns/saved", get(pattern::list_saved_patterns))
        .route(
            "/patterns/{id}",
            get(pattern::get_pattern).delete(pattern::delete_pattern),
        )
        .route(
            "/patterns/{id}/save",
            post(pattern::save_pattern).delete(pattern::unsave_pattern),
        )
        .route("/categories", get(catalog::list_categories))
        .route("/categories/{id}/subtree", get(catalog::get_category_subtree))
        .route(
            "/pattern-tags",
            get(catalog::list_pattern_tags).post(catalog::create_pattern_tag),
        )
        .route("/yarn-types", get(catalog::list_yarn_types))
        .route(
            "/materials",
            get(catalog::list_materials).post(catalog::create_material),
        );

    let project_routes = Router::new()
        .route(
            "/projects",
            get(project::list_projects).post(project::create_project),
        )
        .route(
            "/projects/{id}",
            get(project::get_project)
                .patch(project::update_project)
                .delete(project::delete_project),
        );

    let protected_routes = Router::new()
        .route("/auth/refresh", post(auth::refresh))
        .route("/profile/me", get(profile::get_me))
        .merge(community_routes)
        .merge(pattern_routes)
        .merge(project_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let admin_routes = Router::new()
        .route("/categories", post(catalog::create_category))
        .route(
            "/categories/{id}",
            put(catalog::update_category).delete(catalog::delete_category),
        )
        .route("/tags", post(community::create_tag))
        .route("/yarn-types", post(catalog::create_yarn_type))
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .nest("/api", protected_routes)
        .nest("/api/admin", admin_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
