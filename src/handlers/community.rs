use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{PgPool, Postgres, QueryBuilder};
use validator::Validate;

use crate::{
    error::{AppError, unique_violation},
    handlers::links::{dedup_ids, ensure_ids_exist, replace_links},
    models::{
        comment::CommentResponse,
        post::{CreatePostRequest, PostDetail, PostListParams, PostSummary},
        tag::{CreateTagRequest, Tag},
    },
    utils::{html::clean_html, jwt::Claims},
};

const POST_SUMMARY_SELECT: &str = r#"
    SELECT
        p.id, p.user_id AS author, u.username AS author_username,
        p.title, p.content, p.image_url, p.created_at,
        COALESCE(
            (SELECT json_agg(json_build_object('id', t.id, 'name', t.name) ORDER BY t.id)
             FROM post_tags pt JOIN tags t ON t.id = pt.tag_id
             WHERE pt.post_id = p.id),
            '[]'::json
        ) AS tags,
        (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comment_count,
        (SELECT COUNT(*) FROM post_likes l WHERE l.post_id = p.id) AS likes_count
    FROM posts p
    JOIN users u ON u.id = p.user_id
"#;

/// List community tags.
pub async fn list_tags(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let tags = sqlx::query_as::<_, Tag>("SELECT id, name FROM tags ORDER BY id")
        .fetch_all(&pool)
        .await?;

    Ok(Json(tags))
}

/// Create a community tag.
/// Admin only.
pub async fn create_tag(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateTagRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let tag = sqlx::query_as::<_, Tag>("INSERT INTO tags (name) VALUES ($1) RETURNING id, name")
        .bind(&payload.name)
        .fetch_one(&pool)
        .await
        .map_err(|e| match unique_violation(&e) {
            Some(_) => AppError::Conflict(format!("Tag '{}' already exists", payload.name)),
            None => AppError::from(e),
        })?;

    Ok((StatusCode::CREATED, Json(tag)))
}

/// Create a new post.
pub async fn create_post(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user_id = claims.user_id()?;
    let tag_ids = dedup_ids(payload.tags);

    let mut tx = pool.begin().await?;

    ensure_ids_exist(&mut tx, "tags", &tag_ids, "tag").await?;

    let post_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO posts (user_id, title, content, image_url)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(&payload.title)
    .bind(clean_html(&payload.content))
    .bind(&payload.image_url)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create post: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    replace_links(&mut tx, "post_tags", "post_id", "tag_id", post_id, &tag_ids).await?;

    tx.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({"id": post_id})),
    ))
}

/// List posts (Recent first).
/// Supports search, tag and "personal" filters and cursor-based pagination.
pub async fn list_posts(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<PostListParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = params.limit.unwrap_or(20).clamp(1, 100); // Default 20, max 100

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(POST_SUMMARY_SELECT);
    builder.push(" WHERE TRUE");

    if let Some(search) = params.search.as_deref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        builder.push(" AND (p.title ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR p.content ILIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }

    if let Some(tag_id) = params.tag_id {
        builder.push(" AND EXISTS (SELECT 1 FROM post_tags pt WHERE pt.post_id = p.id AND pt.tag_id = ");
        builder.push_bind(tag_id);
        builder.push(")");
    }

    if params.personal == Some(true) {
        builder.push(" AND p.user_id = ");
        builder.push_bind(claims.user_id()?);
    }

    if let Some(cursor) = params.cursor {
        builder.push(" AND p.created_at < ");
        builder.push_bind(cursor);
    }

    builder.push(" ORDER BY p.created_at DESC LIMIT ");
    builder.push_bind(limit);

    let posts: Vec<PostSummary> = builder
        .build_query_as()
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list posts: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(Json(posts))
}

/// Get a single post with its comments.
pub async fn get_post(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let post = sqlx::query_as::<_, PostSummary>(&format!("{POST_SUMMARY_SELECT} WHERE p.id = $1"))
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Post not found".to_string()))?;

    let comments = sqlx::query_as::<_, CommentResponse>(
        r#"
        SELECT
            c.id, c.user_id AS author, u.username AS author_username,
            c.post_id AS post, c.content, c.created_at, c.is_pinned,
            COUNT(f.value) FILTER (WHERE f.value > 0) AS likes,
            COUNT(f.value) FILTER (WHERE f.value < 0) AS dislikes
        FROM comments c
        JOIN users u ON u.id = c.user_id
        LEFT JOIN comment_feedback f ON f.comment_id = c.id
        WHERE c.post_id = $1
        GROUP BY c.id, u.username
        ORDER BY c.is_pinned DESC, c.created_at DESC
        "#,
    )
    .bind(id)
    .fetch_all(&pool)
    .await?;

    let has_pinned_comment = comments.iter().any(|c| c.is_pinned);

    Ok(Json(PostDetail {
        post,
        has_pinned_comment,
        comments,
    }))
}

/// Delete a post.
/// Requires: Author OR Admin.
pub async fn delete_post(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    // 1. Fetch Post to check ownership
    let author_id: i64 = sqlx::query_scalar("SELECT user_id FROM posts WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Post not found".to_string()))?;

    // 2. Check Permission
    if author_id != user_id && !claims.is_admin() {
        return Err(AppError::Forbidden(
            "You can only delete your posts.".to_string(),
        ));
    }

    // 3. Delete (comments, likes and tags cascade)
    sqlx::query("DELETE FROM posts WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete post: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(StatusCode::NO_CONTENT)
}
