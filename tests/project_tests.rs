// tests/project_tests.rs

mod common;

use common::{TestApp, TestUser};
use reqwest::Method;

async fn create_yarn_type(app: &TestApp, admin: &TestUser) -> i64 {
    let (status, body) = app
        .call(
            Method::POST,
            "/api/admin/yarn-types",
            &admin.token,
            Some(serde_json::json!({ "name": common::unique("wool") })),
        )
        .await;
    assert_eq!(status, 201);
    body["id"].as_i64().unwrap()
}

async fn create_project(app: &TestApp, owner: &TestUser, name: &str, yarn_types: &[i64]) -> i64 {
    let (status, body) = app
        .call(
            Method::POST,
            "/api/projects",
            &owner.token,
            Some(serde_json::json!({
                "name": name,
                "description": "Winter gift",
                "yarn_types": yarn_types,
                "hook_or_needle_size": "4mm"
            })),
        )
        .await;
    assert_eq!(status, 201);
    assert_eq!(body["status"], "in_progress");
    assert!(body["end_date"].is_null());
    body["id"].as_i64().unwrap()
}

#[tokio::test]
async fn completing_a_project_fills_end_date() {
    let Some(app) = common::spawn_app().await else { return };
    let owner = app.user().await;

    let project_id = create_project(&app, &owner, "Scarf", &[]).await;
    let path = format!("/api/projects/{project_id}");

    let (status, _) = app
        .call(
            Method::PATCH,
            &path,
            &owner.token,
            Some(serde_json::json!({ "status": "completed", "time_spent": 12.5 })),
        )
        .await;
    assert_eq!(status, 200);

    let (status, project) = app.call(Method::GET, &path, &owner.token, None).await;
    assert_eq!(status, 200);
    assert_eq!(project["status"], "completed");
    assert_eq!(project["time_spent"], 12.5);
    let today = chrono::Utc::now().date_naive().to_string();
    assert_eq!(project["end_date"], today.as_str());
}

#[tokio::test]
async fn explicit_end_date_and_bad_status() {
    let Some(app) = common::spawn_app().await else { return };
    let owner = app.user().await;

    let project_id = create_project(&app, &owner, "Beanie", &[]).await;
    let path = format!("/api/projects/{project_id}");

    let (status, _) = app
        .call(
            Method::PATCH,
            &path,
            &owner.token,
            Some(serde_json::json!({ "status": "completed", "end_date": "2025-01-31" })),
        )
        .await;
    assert_eq!(status, 200);

    let (_, project) = app.call(Method::GET, &path, &owner.token, None).await;
    assert_eq!(project["end_date"], "2025-01-31");

    let (status, _) = app
        .call(
            Method::PATCH,
            &path,
            &owner.token,
            Some(serde_json::json!({ "status": "abandoned" })),
        )
        .await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn only_owner_edits_and_deletes() {
    let Some(app) = common::spawn_app().await else { return };
    let owner = app.user().await;
    let other = app.user().await;

    let project_id = create_project(&app, &owner, "Poncho", &[]).await;
    let path = format!("/api/projects/{project_id}");

    let (status, _) = app
        .call(
            Method::PATCH,
            &path,
            &other.token,
            Some(serde_json::json!({ "name": "Mine now" })),
        )
        .await;
    assert_eq!(status, 403);

    let (status, _) = app.call(Method::DELETE, &path, &other.token, None).await;
    assert_eq!(status, 403);

    let (status, _) = app.call(Method::DELETE, &path, &owner.token, None).await;
    assert_eq!(status, 204);

    let (status, _) = app.call(Method::GET, &path, &owner.token, None).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn list_filters_by_owner_yarn_and_time() {
    let Some(app) = common::spawn_app().await else { return };
    let admin = app.admin().await;
    let owner = app.user().await;

    let wool = create_yarn_type(&app, &admin).await;
    let with_wool = create_project(&app, &owner, "Sweater", &[wool]).await;
    let without = create_project(&app, &owner, "Coaster", &[]).await;

    let (_, project) = app
        .call(Method::GET, &format!("/api/projects/{with_wool}"), &owner.token, None)
        .await;
    assert_eq!(project["yarn_types"][0]["id"], wool);

    let (status, list) = app
        .call(
            Method::GET,
            &format!("/api/projects?user_id={}&yarn_type={wool}", owner.id),
            &owner.token,
            None,
        )
        .await;
    assert_eq!(status, 200);
    let found: Vec<i64> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_i64().unwrap())
        .collect();
    assert_eq!(found, vec![with_wool]);

    app.call(
        Method::PATCH,
        &format!("/api/projects/{without}"),
        &owner.token,
        Some(serde_json::json!({ "time_spent": 40.0 })),
    )
    .await;

    let (_, list) = app
        .call(
            Method::GET,
            &format!("/api/projects?user_id={}&time_spent=10", owner.id),
            &owner.token,
            None,
        )
        .await;
    assert!(list.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_yarn_type_is_rejected() {
    let Some(app) = common::spawn_app().await else { return };
    let owner = app.user().await;

    let (status, _) = app
        .call(
            Method::POST,
            "/api/projects",
            &owner.token,
            Some(serde_json::json!({ "name": "Ghost", "yarn_types": [999999999] })),
        )
        .await;
    assert_eq!(status, 400);
}
