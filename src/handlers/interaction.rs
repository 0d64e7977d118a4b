use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    config::Config,
    error::{AppError, unique_violation},
    models::{
        comment::{ALREADY_PINNED, CreateCommentRequest, PinAction, PinTarget},
        feedback::{FeedbackResponse, FeedbackState, FeedbackWrite, Reaction},
        like::{LikeAction, LikeResponse, LikeTarget, LikedItem, milestone_reached},
    },
    utils::{html::clean_html, jwt::Claims, notifier::Notifier},
};

const ONE_PINNED_INDEX: &str = "idx_comments_one_pinned_per_post";

/// Adds or removes the caller in an item's like-set.
///
/// Membership is written with a single conflict-safe statement and judged by
/// the affected row count. The item row is share-locked for the transaction so
/// it cannot disappear under the write. Reaching a milestone queues a mail to
/// the author.
pub(crate) async fn apply_like(
    pool: &PgPool,
    notifier: &Notifier,
    milestone: i64,
    target: LikeTarget,
    item_id: i64,
    user_id: i64,
    action: LikeAction,
) -> Result<LikeResponse, AppError> {
    let (table, column) = target.table();

    let mut tx = pool.begin().await?;

    let item = sqlx::query_as::<_, LikedItem>(&format!(
        r#"
        SELECT i.title, u.username AS author_username, u.email AS author_email
        FROM {} i
        LEFT JOIN users u ON u.id = i.user_id
        WHERE i.id = $1
        FOR SHARE OF i
        "#,
        target.item_table()
    ))
    .bind(item_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| target.not_found())?;

    let sql = match action {
        LikeAction::Like => format!(
            "INSERT INTO {table} (user_id, {column}) VALUES ($1, $2) ON CONFLICT DO NOTHING"
        ),
        LikeAction::Unlike => format!("DELETE FROM {table} WHERE user_id = $1 AND {column} = $2"),
    };

    let changed = sqlx::query(&sql)
        .bind(user_id)
        .bind(item_id)
        .execute(&mut *tx)
        .await?
        .rows_affected()
        > 0;

    let message = action.resolve(target, changed)?;

    let count: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM {table} WHERE {column} = $1"
    ))
    .bind(item_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    if action == LikeAction::Like && milestone_reached(count, milestone) {
        match (&item.author_email, &item.author_username) {
            (Some(email), Some(username)) => {
                tracing::info!(item = target.item_name(), item_id, count, "Milestone reached");
                notifier.send_milestone(
                    email,
                    username,
                    target.item_name(),
                    &item.title,
                    count,
                    target.count_noun(),
                );
            }
            _ => tracing::debug!(item_id, "Milestone reached but author is gone"),
        }
    }

    Ok(LikeResponse { message, count })
}

/// Like a post.
#[utoipa::path(
    post,
    path = "/api/posts/{id}/like",
    tag = "community",
    params(("id" = i64, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Post liked"),
        (status = 400, description = "Post already liked"),
        (status = 404, description = "Post not found")
    )
)]
pub async fn like_post(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    State(notifier): State<Notifier>,
    Extension(claims): Extension<Claims>,
    Path(post_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let response = apply_like(
        &pool,
        &notifier,
        config.saved_milestone,
        LikeTarget::Post,
        post_id,
        claims.user_id()?,
        LikeAction::Like,
    )
    .await?;

    Ok(Json(response))
}

/// Remove the caller's like from a post.
#[utoipa::path(
    delete,
    path = "/api/posts/{id}/like",
    tag = "community",
    params(("id" = i64, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Post unliked"),
        (status = 400, description = "Post is not liked"),
        (status = 404, description = "Post not found")
    )
)]
pub async fn unlike_post(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    State(notifier): State<Notifier>,
    Extension(claims): Extension<Claims>,
    Path(post_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let response = apply_like(
        &pool,
        &notifier,
        config.saved_milestone,
        LikeTarget::Post,
        post_id,
        claims.user_id()?,
        LikeAction::Unlike,
    )
    .await?;

    Ok(Json(response))
}

/// Create a new comment.
pub async fn create_comment(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let user_id = claims.user_id()?;

    let post_exists: Option<i64> = sqlx::query_scalar("SELECT id FROM posts WHERE id = $1")
        .bind(payload.post)
        .fetch_optional(&pool)
        .await?;
    if post_exists.is_none() {
        return Err(AppError::NotFound("Post not found".to_string()));
    }

    let new_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO comments (post_id, user_id, content)
        VALUES ($1, $2, $3)
        RETURNING id
        "#,
    )
    .bind(payload.post)
    .bind(user_id)
    .bind(clean_html(&payload.content))
    .fetch_one(&pool)
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "id": new_id })),
    ))
}

/// Delete a comment.
/// Requires: Author OR Admin.
pub async fn delete_comment(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let author_id: i64 = sqlx::query_scalar("SELECT user_id FROM comments WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Comment not found".to_string()))?;

    if author_id != claims.user_id()? && !claims.is_admin() {
        return Err(AppError::Forbidden(
            "You can only delete your comments.".to_string(),
        ));
    }

    sqlx::query("DELETE FROM comments WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Pin a comment on the caller's post.
#[utoipa::path(
    patch,
    path = "/api/comments/{id}/pin",
    tag = "community",
    params(("id" = i64, Path, description = "Comment ID")),
    responses(
        (status = 200, description = "Comment pinned"),
        (status = 400, description = "Post already has a pinned comment"),
        (status = 403, description = "Caller is not the post author"),
        (status = 404, description = "Comment not found")
    )
)]
pub async fn pin_comment(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    evaluate_pin(&pool, &claims, id, PinAction::Pin).await
}

/// Unpin a pinned comment on the caller's post.
#[utoipa::path(
    patch,
    path = "/api/comments/{id}/unpin",
    tag = "community",
    params(("id" = i64, Path, description = "Comment ID")),
    responses(
        (status = 200, description = "Comment unpinned"),
        (status = 400, description = "Comment is not pinned"),
        (status = 403, description = "Caller is not the post author"),
        (status = 404, description = "Comment not found")
    )
)]
pub async fn unpin_comment(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    evaluate_pin(&pool, &claims, id, PinAction::Unpin).await
}

/// Check-then-act under a lock on the owning post row.
/// The partial unique index rejects any second pin that slips through.
async fn evaluate_pin(
    pool: &PgPool,
    claims: &Claims,
    comment_id: i64,
    action: PinAction,
) -> Result<Json<serde_json::Value>, AppError> {
    let user_id = claims.user_id()?;

    let mut tx = pool.begin().await?;

    let target = sqlx::query_as::<_, PinTarget>(
        r#"
        SELECT c.id, c.post_id, c.is_pinned, p.user_id AS post_author_id
        FROM comments c
        JOIN posts p ON p.id = c.post_id
        WHERE c.id = $1
        FOR UPDATE OF p, c
        "#,
    )
    .bind(comment_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound("Comment not found".to_string()))?;

    let post_has_pinned: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM comments WHERE post_id = $1 AND is_pinned)",
    )
    .bind(target.post_id)
    .fetch_one(&mut *tx)
    .await?;

    let is_pinned = action.evaluate(user_id, &target, post_has_pinned)?;

    sqlx::query("UPDATE comments SET is_pinned = $1 WHERE id = $2")
        .bind(is_pinned)
        .bind(target.id)
        .execute(&mut *tx)
        .await
        .map_err(|e| match unique_violation(&e) {
            Some(constraint) if constraint == ONE_PINNED_INDEX => {
                AppError::BadRequest(ALREADY_PINNED.to_string())
            }
            _ => AppError::from(e),
        })?;

    tx.commit().await?;

    tracing::info!(comment_id, post_id = target.post_id, ?action, "Comment pin state changed");

    Ok(Json(serde_json::json!({
        "id": comment_id,
        "action": action,
        "is_pinned": is_pinned
    })))
}

/// Like a comment (toggles off if already liked).
#[utoipa::path(
    post,
    path = "/api/comments/{id}/like",
    tag = "community",
    params(("id" = i64, Path, description = "Comment ID")),
    responses(
        (status = 200, description = "New reaction state with counts"),
        (status = 404, description = "Comment not found")
    )
)]
pub async fn like_comment(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    evaluate_feedback(&pool, &claims, id, Reaction::Like).await
}

/// Dislike a comment (toggles off if already disliked).
#[utoipa::path(
    post,
    path = "/api/comments/{id}/dislike",
    tag = "community",
    params(("id" = i64, Path, description = "Comment ID")),
    responses(
        (status = 200, description = "New reaction state with counts"),
        (status = 404, description = "Comment not found")
    )
)]
pub async fn dislike_comment(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    evaluate_feedback(&pool, &claims, id, Reaction::Dislike).await
}

async fn evaluate_feedback(
    pool: &PgPool,
    claims: &Claims,
    comment_id: i64,
    reaction: Reaction,
) -> Result<Json<FeedbackResponse>, AppError> {
    let user_id = claims.user_id()?;

    let mut tx = pool.begin().await?;

    let comment: Option<i64> = sqlx::query_scalar("SELECT id FROM comments WHERE id = $1")
        .bind(comment_id)
        .fetch_optional(&mut *tx)
        .await?;
    if comment.is_none() {
        return Err(AppError::NotFound("Comment not found".to_string()));
    }

    let current: Option<i16> = sqlx::query_scalar(
        "SELECT value FROM comment_feedback WHERE user_id = $1 AND comment_id = $2 FOR UPDATE",
    )
    .bind(user_id)
    .bind(comment_id)
    .fetch_optional(&mut *tx)
    .await?;

    let state = FeedbackState::from_value(current);
    let next = state.apply(reaction);

    match state.write_to(next) {
        Some(FeedbackWrite::Insert(value)) => {
            // Upsert so a racing first reaction cannot leave two rows.
            sqlx::query(
                r#"
                INSERT INTO comment_feedback (user_id, comment_id, value)
                VALUES ($1, $2, $3)
                ON CONFLICT (user_id, comment_id) DO UPDATE SET value = EXCLUDED.value
                "#,
            )
            .bind(user_id)
            .bind(comment_id)
            .bind(value)
            .execute(&mut *tx)
            .await?;
        }
        Some(FeedbackWrite::Update(value)) => {
            sqlx::query(
                "UPDATE comment_feedback SET value = $3 WHERE user_id = $1 AND comment_id = $2",
            )
            .bind(user_id)
            .bind(comment_id)
            .bind(value)
            .execute(&mut *tx)
            .await?;
        }
        Some(FeedbackWrite::Delete) => {
            sqlx::query("DELETE FROM comment_feedback WHERE user_id = $1 AND comment_id = $2")
                .bind(user_id)
                .bind(comment_id)
                .execute(&mut *tx)
                .await?;
        }
        None => {}
    }

    let (likes, dislikes): (i64, i64) = sqlx::query_as(
        r#"
        SELECT
            COUNT(*) FILTER (WHERE value > 0),
            COUNT(*) FILTER (WHERE value < 0)
        FROM comment_feedback
        WHERE comment_id = $1
        "#,
    )
    .bind(comment_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(Json(FeedbackResponse {
        comment_id,
        state: next,
        likes,
        dislikes,
    }))
}
