// src/handlers/links.rs

use sqlx::PgConnection;

use crate::error::AppError;

/// Sorts and de-duplicates a list of IDs from a request body.
pub fn dedup_ids(mut ids: Vec<i64>) -> Vec<i64> {
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Fails with `BadRequest` unless every ID exists in `table`.
pub async fn ensure_ids_exist(
    conn: &mut PgConnection,
    table: &'static str,
    ids: &[i64],
    label: &str,
) -> Result<(), AppError> {
    if ids.is_empty() {
        return Ok(());
    }

    let found: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM {table} WHERE id = ANY($1)"
    ))
    .bind(ids)
    .fetch_one(&mut *conn)
    .await?;

    if found != ids.len() as i64 {
        return Err(AppError::BadRequest(format!("Unknown {label} in request")));
    }
    Ok(())
}

/// Replaces the rows of a many-to-many link table for one owner.
pub async fn replace_links(
    conn: &mut PgConnection,
    table: &'static str,
    owner_column: &'static str,
    target_column: &'static str,
    owner_id: i64,
    target_ids: &[i64],
) -> Result<(), AppError> {
    sqlx::query(&format!("DELETE FROM {table} WHERE {owner_column} = $1"))
        .bind(owner_id)
        .execute(&mut *conn)
        .await?;

    if target_ids.is_empty() {
        return Ok(());
    }

    sqlx::query(&format!(
        "INSERT INTO {table} ({owner_column}, {target_column}) SELECT $1, UNNEST($2::BIGINT[])"
    ))
    .bind(owner_id)
    .bind(target_ids)
    .execute(&mut *conn)
    .await?;

    Ok(())
}
