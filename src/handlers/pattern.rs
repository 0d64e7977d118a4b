// src/handlers/pattern.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    config::Config,
    error::AppError,
    handlers::{
        catalog::load_category_tree,
        interaction::apply_like,
        links::{dedup_ids, ensure_ids_exist, replace_links},
    },
    models::{
        like::{LikeAction, LikeTarget},
        pattern::{CreatePatternRequest, PatternDetail, PatternListParams, PatternSummary},
    },
    state::PopularCache,
    utils::{jwt::Claims, notifier::Notifier},
};

const POPULAR_LIMIT: i64 = 15;

const PATTERN_SUMMARY_SELECT: &str = r#"
    SELECT
        p.id, p.user_id AS author, p.title, p.image_url, p.difficulty,
        (SELECT COUNT(*) FROM pattern_saves s WHERE s.pattern_id = p.id) AS saved_count,
        COALESCE(
            (SELECT json_agg(json_build_object('id', t.id, 'name', t.name) ORDER BY t.id)
             FROM pattern_tag_links l JOIN pattern_tags t ON t.id = l.tag_id
             WHERE l.pattern_id = p.id),
            '[]'::json
        ) AS tags,
        COALESCE(
            (SELECT json_agg(json_build_object('id', c.id, 'name', c.name) ORDER BY c.id)
             FROM pattern_categories pc JOIN categories c ON c.id = pc.category_id
             WHERE pc.pattern_id = p.id),
            '[]'::json
        ) AS categories
    FROM patterns p
"#;

/// Builds the filtered listing query.
///
/// `category` matches the whole category subtree; `saved_by` restricts the
/// list to one user's saved set.
async fn pattern_list_query(
    pool: &PgPool,
    params: &PatternListParams,
    saved_by: Option<i64>,
) -> Result<QueryBuilder<'static, Postgres>, AppError> {
    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(PATTERN_SUMMARY_SELECT);
    builder.push(" WHERE TRUE");

    if let Some(user_id) = saved_by {
        builder.push(" AND EXISTS (SELECT 1 FROM pattern_saves s WHERE s.pattern_id = p.id AND s.user_id = ");
        builder.push_bind(user_id);
        builder.push(")");
    }

    if let Some(search) = params.search.as_deref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        builder.push(" AND (p.title ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR p.description ILIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }

    if let Some(tag_id) = params.tag_id {
        builder.push(" AND EXISTS (SELECT 1 FROM pattern_tag_links l WHERE l.pattern_id = p.id AND l.tag_id = ");
        builder.push_bind(tag_id);
        builder.push(")");
    }

    if let Some(category_id) = params.category {
        let tree = load_category_tree(pool).await?;
        let subtree: Vec<i64> = tree.resolve_subtree(category_id)?.into_iter().collect();

        builder.push(" AND EXISTS (SELECT 1 FROM pattern_categories pc WHERE pc.pattern_id = p.id AND pc.category_id = ANY(");
        builder.push_bind(subtree);
        builder.push("))");
    }

    if let Some(yarn_type) = params.yarn_type {
        builder.push(" AND EXISTS (SELECT 1 FROM pattern_yarn_types py WHERE py.pattern_id = p.id AND py.yarn_type_id = ");
        builder.push_bind(yarn_type);
        builder.push(")");
    }

    if let Some(difficulty) = params.difficulty.clone() {
        builder.push(" AND p.difficulty = ");
        builder.push_bind(difficulty);
    }

    if let Some(user_id) = params.user_id {
        builder.push(" AND p.user_id = ");
        builder.push_bind(user_id);
    }

    match params.ordering.as_deref() {
        Some("popular") => builder.push(" ORDER BY saved_count DESC, p.id DESC"),
        Some("-popular") => builder.push(" ORDER BY saved_count ASC, p.id DESC"),
        _ => builder.push(" ORDER BY p.created_at DESC, p.id DESC"),
    };

    builder.push(" LIMIT ");
    builder.push_bind(params.limit.unwrap_or(20).clamp(1, 100));
    builder.push(" OFFSET ");
    builder.push_bind(params.offset.unwrap_or(0).max(0));

    Ok(builder)
}

/// Publish a new pattern.
pub async fn create_pattern(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreatePatternRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.check()?;
    let user_id = claims.user_id()?;

    let yarn_types = dedup_ids(payload.yarn_types);
    let categories = dedup_ids(payload.categories);
    let tags = dedup_ids(payload.tags);

    let mut tx = pool.begin().await?;

    ensure_ids_exist(&mut tx, "yarn_types", &yarn_types, "yarn type").await?;
    ensure_ids_exist(&mut tx, "categories", &categories, "category").await?;
    ensure_ids_exist(&mut tx, "pattern_tags", &tags, "pattern tag").await?;

    let pattern_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO patterns
        (user_id, title, description, tips, image_url, file_url, text_pattern, difficulty, hook_or_needle_size)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(&payload.title)
    .bind(&payload.description)
    .bind(&payload.tips)
    .bind(&payload.image_url)
    .bind(&payload.file_url)
    .bind(&payload.text_pattern)
    .bind(&payload.difficulty)
    .bind(payload.hook_or_needle_size)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create pattern: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    replace_links(&mut tx, "pattern_yarn_types", "pattern_id", "yarn_type_id", pattern_id, &yarn_types).await?;
    replace_links(&mut tx, "pattern_categories", "pattern_id", "category_id", pattern_id, &categories).await?;
    replace_links(&mut tx, "pattern_tag_links", "pattern_id", "tag_id", pattern_id, &tags).await?;

    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({"id": pattern_id}))))
}

/// List patterns with search, tag, category subtree, yarn type, difficulty,
/// author and popularity filters.
#[utoipa::path(
    get,
    path = "/api/patterns",
    tag = "patterns",
    params(
        ("category" = Option<i64>, Query, description = "Category ID, includes all subcategories"),
        ("ordering" = Option<String>, Query, description = "`popular` or `-popular`")
    ),
    responses((status = 200, description = "Pattern list"))
)]
pub async fn list_patterns(
    State(pool): State<PgPool>,
    Query(params): Query<PatternListParams>,
) -> Result<impl IntoResponse, AppError> {
    let mut builder = pattern_list_query(&pool, &params, None).await?;

    let patterns: Vec<PatternSummary> = builder
        .build_query_as()
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list patterns: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(Json(patterns))
}

/// List the caller's saved patterns. Accepts the same filters except `user_id`.
pub async fn list_saved_patterns(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Query(mut params): Query<PatternListParams>,
) -> Result<impl IntoResponse, AppError> {
    params.user_id = None;
    let mut builder = pattern_list_query(&pool, &params, Some(claims.user_id()?)).await?;

    let patterns: Vec<PatternSummary> = builder.build_query_as().fetch_all(&pool).await?;

    Ok(Json(patterns))
}

/// Most saved patterns. Public and served from a short-lived cache.
pub async fn popular_patterns(
    State(pool): State<PgPool>,
    State(cache): State<PopularCache>,
) -> Result<impl IntoResponse, AppError> {
    if let Some(cached) = cache.get().await {
        return Ok(Json(cached));
    }

    let patterns = sqlx::query_as::<_, PatternSummary>(&format!(
        "{PATTERN_SUMMARY_SELECT} ORDER BY saved_count DESC, p.id DESC LIMIT $1"
    ))
    .bind(POPULAR_LIMIT)
    .fetch_all(&pool)
    .await?;

    cache.set(patterns.clone()).await;

    Ok(Json(patterns))
}

/// Retrieve a single pattern with materials, yarn types, tags and categories.
pub async fn get_pattern(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let pattern = sqlx::query_as::<_, PatternDetail>(
        r#"
        SELECT
            p.id, p.user_id AS author, p.title, p.description, p.tips,
            p.image_url, p.file_url, p.text_pattern, p.difficulty,
            p.hook_or_needle_size, p.created_at,
            (SELECT COUNT(*) FROM pattern_saves s WHERE s.pattern_id = p.id) AS saved_count,
            COALESCE(
                (SELECT json_agg(json_build_object('id', t.id, 'name', t.name) ORDER BY t.id)
                 FROM pattern_tag_links l JOIN pattern_tags t ON t.id = l.tag_id
                 WHERE l.pattern_id = p.id),
                '[]'::json
            ) AS tags,
            COALESCE(
                (SELECT json_agg(json_build_object('id', c.id, 'name', c.name) ORDER BY c.id)
                 FROM pattern_categories pc JOIN categories c ON c.id = pc.category_id
                 WHERE pc.pattern_id = p.id),
                '[]'::json
            ) AS categories,
            COALESCE(
                (SELECT json_agg(json_build_object('id', y.id, 'name', y.name) ORDER BY y.id)
                 FROM pattern_yarn_types py JOIN yarn_types y ON y.id = py.yarn_type_id
                 WHERE py.pattern_id = p.id),
                '[]'::json
            ) AS yarn_types,
            COALESCE(
                (SELECT json_agg(json_build_object(
                    'id', m.id, 'pattern', m.pattern_id, 'name', m.name,
                    'amount', m.amount, 'unit', m.unit) ORDER BY m.id)
                 FROM materials m
                 WHERE m.pattern_id = p.id),
                '[]'::json
            ) AS materials
        FROM patterns p
        WHERE p.id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Pattern not found.".to_string()))?;

    Ok(Json(pattern))
}

/// Delete a pattern.
/// Requires: Author OR Admin.
pub async fn delete_pattern(
    State(pool): State<PgPool>,
    State(cache): State<PopularCache>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let author_id: Option<i64> = sqlx::query_scalar("SELECT user_id FROM patterns WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Pattern not found.".to_string()))?;

    if author_id != Some(claims.user_id()?) && !claims.is_admin() {
        return Err(AppError::Forbidden(
            "You can only delete your patterns.".to_string(),
        ));
    }

    sqlx::query("DELETE FROM patterns WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    // A deleted pattern must not linger in the popular list.
    cache.invalidate().await;

    Ok(StatusCode::NO_CONTENT)
}

/// Save a pattern to the caller's collection.
#[utoipa::path(
    post,
    path = "/api/patterns/{id}/save",
    tag = "patterns",
    params(("id" = i64, Path, description = "Pattern ID")),
    responses(
        (status = 200, description = "Pattern saved"),
        (status = 400, description = "Pattern already saved"),
        (status = 404, description = "Pattern not found")
    )
)]
pub async fn save_pattern(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    State(notifier): State<Notifier>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let response = apply_like(
        &pool,
        &notifier,
        config.saved_milestone,
        LikeTarget::Pattern,
        id,
        claims.user_id()?,
        LikeAction::Like,
    )
    .await?;

    Ok(Json(response))
}

/// Remove a pattern from the caller's collection.
pub async fn unsave_pattern(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    State(notifier): State<Notifier>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let response = apply_like(
        &pool,
        &notifier,
        config.saved_milestone,
        LikeTarget::Pattern,
        id,
        claims.user_id()?,
        LikeAction::Unlike,
    )
    .await?;

    Ok(Json(response))
}
