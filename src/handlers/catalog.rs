// src/handlers/catalog.rs

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
    models::{
        category::{
            Category, CategoryDetail, CreateCategoryRequest, SubtreeResponse,
            UpdateCategoryRequest,
        },
        pattern::{CreateMaterialRequest, Material, MaterialListParams},
        tag::{CreateTagRequest, Tag},
    },
    utils::{category_tree::CategoryTree, jwt::Claims},
};

/// Loads the parent links of every category.
pub(crate) async fn load_category_tree(pool: &PgPool) -> Result<CategoryTree, AppError> {
    let links = sqlx::query_as::<_, (i64, Option<i64>)>("SELECT id, parent_id FROM categories")
        .fetch_all(pool)
        .await?;

    Ok(CategoryTree::from_links(links))
}

/// Lists all categories with their direct subcategories.
pub async fn list_categories(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let categories = sqlx::query_as::<_, Category>(
        "SELECT id, name, description, parent_id FROM categories ORDER BY id",
    )
    .fetch_all(&pool)
    .await?;

    let tree = CategoryTree::from_links(categories.iter().map(|c| (c.id, c.parent_id)));

    let details: Vec<CategoryDetail> = categories
        .into_iter()
        .map(|category| {
            let subcategories = tree.children_of(category.id).to_vec();
            CategoryDetail {
                category,
                subcategories,
            }
        })
        .collect();

    Ok(Json(details))
}

/// Resolves a category to itself plus all of its descendants.
#[utoipa::path(
    get,
    path = "/api/categories/{id}/subtree",
    tag = "patterns",
    params(("id" = i64, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Sorted IDs of the category and its descendants"),
        (status = 404, description = "Category not found")
    )
)]
pub async fn get_category_subtree(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let tree = load_category_tree(&pool).await?;

    let mut ids: Vec<i64> = tree.resolve_subtree(id)?.into_iter().collect();
    ids.sort_unstable();

    Ok(Json(SubtreeResponse { root: id, ids }))
}

/// Creates a category.
/// Admin only.
pub async fn create_category(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    if let Some(parent_id) = payload.parent_id {
        let tree = load_category_tree(&pool).await?;
        if !tree.contains(parent_id) {
            return Err(AppError::BadRequest("Parent category does not exist".to_string()));
        }
    }

    let category = sqlx::query_as::<_, Category>(
        r#"
        INSERT INTO categories (name, description, parent_id)
        VALUES ($1, $2, $3)
        RETURNING id, name, description, parent_id
        "#,
    )
    .bind(&payload.name)
    .bind(&payload.description)
    .bind(payload.parent_id)
    .fetch_one(&pool)
    .await
    .map_err(|e| match unique_violation(&e) {
        Some(_) => AppError::Conflict(format!("Category '{}' already exists", payload.name)),
        None => {
            tracing::error!("Failed to create category: {:?}", e);
            AppError::from(e)
        }
    })?;

    Ok((StatusCode::CREATED, Json(category)))
}

/// Updates a category. Re-parenting under itself or a descendant is rejected.
/// Admin only.
pub async fn update_category(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateCategoryRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut tx = pool.begin().await?;

    // One re-parenting at a time.
    sqlx::query("LOCK TABLE categories IN SHARE ROW EXCLUSIVE MODE")
        .execute(&mut *tx)
        .await?;

    let links = sqlx::query_as::<_, (i64, Option<i64>)>("SELECT id, parent_id FROM categories")
        .fetch_all(&mut *tx)
        .await?;
    let tree = CategoryTree::from_links(links);

    if !tree.contains(id) {
        return Err(AppError::NotFound("Category not found".to_string()));
    }

    if let Some(Some(parent_id)) = payload.parent_id {
        if !tree.contains(parent_id) {
            return Err(AppError::BadRequest("Parent category does not exist".to_string()));
        }
        if tree.would_create_cycle(id, parent_id) {
            return Err(AppError::BadRequest(
                "A category cannot be moved under itself or one of its subcategories".to_string(),
            ));
        }
    }

    if payload.name.is_none() && payload.description.is_none() && payload.parent_id.is_none() {
        return Ok(StatusCode::OK);
    }

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE categories SET ");
    let mut separated = builder.separated(", ");

    if let Some(name) = payload.name {
        separated.push("name = ");
        separated.push_bind_unseparated(name);
    }

    if let Some(description) = payload.description {
        separated.push("description = ");
        separated.push_bind_unseparated(description);
    }

    if let Some(parent_id) = payload.parent_id {
        separated.push("parent_id = ");
        separated.push_bind_unseparated(parent_id);
    }

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    builder.build().execute(&mut *tx).await.map_err(|e| match unique_violation(&e) {
        Some(_) => AppError::Conflict("Category name already exists".to_string()),
        None => {
            tracing::error!("Failed to update category: {:?}", e);
            AppError::from(e)
        }
    })?;

    tx.commit().await?;

    Ok(StatusCode::OK)
}

/// Deletes a category. Its children become top-level categories.
/// Admin only.
pub async fn delete_category(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM categories WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete category: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Category not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_pattern_tags(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let tags = sqlx::query_as::<_, Tag>("SELECT id, name FROM pattern_tags ORDER BY id")
        .fetch_all(&pool)
        .await?;

    Ok(Json(tags))
}

/// Any signed-in user may add a pattern tag.
pub async fn create_pattern_tag(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateTagRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let tag = sqlx::query_as::<_, Tag>(
        "INSERT INTO pattern_tags (name) VALUES ($1) RETURNING id, name",
    )
    .bind(&payload.name)
    .fetch_one(&pool)
    .await
    .map_err(|e| match unique_violation(&e) {
        Some(_) => AppError::Conflict(format!("Pattern tag '{}' already exists", payload.name)),
        None => AppError::from(e),
    })?;

    Ok((StatusCode::CREATED, Json(tag)))
}

pub async fn list_yarn_types(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let yarn_types = sqlx::query_as::<_, Tag>("SELECT id, name FROM yarn_types ORDER BY id")
        .fetch_all(&pool)
        .await?;

    Ok(Json(yarn_types))
}

/// Admin only.
pub async fn create_yarn_type(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateTagRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let yarn_type = sqlx::query_as::<_, Tag>(
        "INSERT INTO yarn_types (name) VALUES ($1) RETURNING id, name",
    )
    .bind(&payload.name)
    .fetch_one(&pool)
    .await
    .map_err(|e| match unique_violation(&e) {
        Some(_) => AppError::Conflict(format!("Yarn type '{}' already exists", payload.name)),
        None => AppError::from(e),
    })?;

    Ok((StatusCode::CREATED, Json(yarn_type)))
}

/// Lists materials, optionally for a single pattern.
pub async fn list_materials(
    State(pool): State<PgPool>,
    Query(params): Query<MaterialListParams>,
) -> Result<impl IntoResponse, AppError> {
    let materials = sqlx::query_as::<_, Material>(
        r#"
        SELECT id, pattern_id AS pattern, name, amount, unit
        FROM materials
        WHERE ($1::BIGINT IS NULL OR pattern_id = $1)
        ORDER BY id
        "#,
    )
    .bind(params.pattern)
    .fetch_all(&pool)
    .await?;

    Ok(Json(materials))
}

/// Adds a material to a pattern.
/// Requires: Pattern author.
pub async fn create_material(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateMaterialRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let author_id: Option<i64> = sqlx::query_scalar("SELECT user_id FROM patterns WHERE id = $1")
        .bind(payload.pattern)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Pattern not found.".to_string()))?;

    if author_id != Some(claims.user_id()?) {
        return Err(AppError::Forbidden(
            "You can only add materials to your patterns.".to_string(),
        ));
    }

    let material = sqlx::query_as::<_, Material>(
        r#"
        INSERT INTO materials (pattern_id, name, amount, unit)
        VALUES ($1, $2, $3, $4)
        RETURNING id, pattern_id AS pattern, name, amount, unit
        "#,
    )
    .bind(payload.pattern)
    .bind(&payload.name)
    .bind(payload.amount)
    .bind(payload.unit.as_deref().unwrap_or("none"))
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(material)))
}
