use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::{PgPool, Postgres, QueryBuilder};
use validator::Validate;

use crate::{
    error::AppError,
    handlers::links::{dedup_ids, ensure_ids_exist, replace_links},
    models::project::{
        CreateProjectRequest, ProjectDetail, ProjectListParams, ProjectSummary,
        UpdateProjectRequest,
    },
    utils::jwt::Claims,
};

const PROJECT_DETAIL_SELECT: &str = r#"
    SELECT
        pr.id, pr.user_id AS "user", pr.name, pr.description, pr.pattern_id AS pattern,
        pr.hook_or_needle_size, pr.status, pr.start_date, pr.end_date, pr.time_spent,
        COALESCE(
            (SELECT json_agg(json_build_object('id', y.id, 'name', y.name) ORDER BY y.id)
             FROM project_yarn_types py JOIN yarn_types y ON y.id = py.yarn_type_id
             WHERE py.project_id = pr.id),
            '[]'::json
        ) AS yarn_types
    FROM projects pr
"#;

/// Fetches the owner of a project, or `NotFound`.
async fn project_owner(pool: &PgPool, id: i64) -> Result<i64, AppError> {
    sqlx::query_scalar("SELECT user_id FROM projects WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Project not found".to_string()))
}

/// Start a new project for the current user.
pub async fn create_project(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateProjectRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user_id = claims.user_id()?;
    let yarn_type_ids = dedup_ids(payload.yarn_types);

    let mut tx = pool.begin().await?;

    if let Some(pattern_id) = payload.pattern {
        ensure_ids_exist(&mut tx, "patterns", &[pattern_id], "pattern").await?;
    }
    ensure_ids_exist(&mut tx, "yarn_types", &yarn_type_ids, "yarn type").await?;

    let project_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO projects (user_id, name, description, pattern_id, hook_or_needle_size)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(&payload.name)
    .bind(&payload.description)
    .bind(payload.pattern)
    .bind(&payload.hook_or_needle_size)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create project: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    replace_links(
        &mut tx,
        "project_yarn_types",
        "project_id",
        "yarn_type_id",
        project_id,
        &yarn_type_ids,
    )
    .await?;

    let project = sqlx::query_as::<_, ProjectDetail>(&format!(
        "{PROJECT_DETAIL_SELECT} WHERE pr.id = $1"
    ))
    .bind(project_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(project)))
}

/// List projects, newest first.
/// Supports search, pattern, owner, yarn type, status and time spent filters.
pub async fn list_projects(
    State(pool): State<PgPool>,
    Query(params): Query<ProjectListParams>,
) -> Result<impl IntoResponse, AppError> {
    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
        r#"SELECT pr.id, pr.user_id AS "user", pr.name, pr.pattern_id AS pattern, pr.status, pr.time_spent
           FROM projects pr WHERE TRUE"#,
    );

    if let Some(search) = params.search.as_deref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        builder.push(" AND (pr.name ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR pr.description ILIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }

    if let Some(pattern_id) = params.pattern_id {
        builder.push(" AND pr.pattern_id = ");
        builder.push_bind(pattern_id);
    }

    if let Some(user_id) = params.user_id {
        builder.push(" AND pr.user_id = ");
        builder.push_bind(user_id);
    }

    if let Some(yarn_type) = params.yarn_type {
        builder.push(
            " AND EXISTS (SELECT 1 FROM project_yarn_types py WHERE py.project_id = pr.id AND py.yarn_type_id = ",
        );
        builder.push_bind(yarn_type);
        builder.push(")");
    }

    if let Some(status) = params.status {
        builder.push(" AND pr.status = ");
        builder.push_bind(status);
    }

    if let Some(time_spent) = params.time_spent {
        builder.push(" AND pr.time_spent <= ");
        builder.push_bind(time_spent);
    }

    builder.push(" ORDER BY pr.id DESC");

    let projects: Vec<ProjectSummary> = builder
        .build_query_as()
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list projects: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(Json(projects))
}

pub async fn get_project(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let project = sqlx::query_as::<_, ProjectDetail>(&format!(
        "{PROJECT_DETAIL_SELECT} WHERE pr.id = $1"
    ))
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Project not found".to_string()))?;

    Ok(Json(project))
}

/// Update a project.
/// Requires: Owner.
pub async fn update_project(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(mut payload): Json<UpdateProjectRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    if project_owner(&pool, id).await? != claims.user_id()? {
        return Err(AppError::Forbidden(
            "You can only edit your projects.".to_string(),
        ));
    }

    if payload.is_empty() {
        return Ok(StatusCode::OK);
    }

    payload.fill_end_date(Utc::now().date_naive());

    let mut tx = pool.begin().await?;

    if let Some(pattern_id) = payload.pattern {
        ensure_ids_exist(&mut tx, "patterns", &[pattern_id], "pattern").await?;
    }

    if let Some(yarn_types) = payload.yarn_types.take() {
        let yarn_type_ids = dedup_ids(yarn_types);
        ensure_ids_exist(&mut tx, "yarn_types", &yarn_type_ids, "yarn type").await?;
        replace_links(
            &mut tx,
            "project_yarn_types",
            "project_id",
            "yarn_type_id",
            id,
            &yarn_type_ids,
        )
        .await?;
    }

    if !payload.is_empty() {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE projects SET ");
        let mut separated = builder.separated(", ");

        if let Some(name) = payload.name {
            separated.push("name = ");
            separated.push_bind_unseparated(name);
        }

        if let Some(description) = payload.description {
            separated.push("description = ");
            separated.push_bind_unseparated(description);
        }

        if let Some(pattern_id) = payload.pattern {
            separated.push("pattern_id = ");
            separated.push_bind_unseparated(pattern_id);
        }

        if let Some(size) = payload.hook_or_needle_size {
            separated.push("hook_or_needle_size = ");
            separated.push_bind_unseparated(size);
        }

        if let Some(status) = payload.status {
            separated.push("status = ");
            separated.push_bind_unseparated(status);
        }

        if let Some(end_date) = payload.end_date {
            separated.push("end_date = ");
            separated.push_bind_unseparated(end_date);
        }

        if let Some(time_spent) = payload.time_spent {
            separated.push("time_spent = ");
            separated.push_bind_unseparated(time_spent);
        }

        builder.push(" WHERE id = ");
        builder.push_bind(id);

        builder.build().execute(&mut *tx).await.map_err(|e| {
            tracing::error!("Failed to update project: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;
    }

    tx.commit().await?;

    Ok(StatusCode::OK)
}

/// Delete a project.
/// Requires: Owner.
pub async fn delete_project(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if project_owner(&pool, id).await? != claims.user_id()? {
        return Err(AppError::Forbidden(
            "You can only delete your projects.".to_string(),
        ));
    }

    sqlx::query("DELETE FROM projects WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete project: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(StatusCode::NO_CONTENT)
}
