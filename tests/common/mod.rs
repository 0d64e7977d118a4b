// tests/common/mod.rs

#![allow(dead_code)]

use std::time::Duration;

use loopcraft::{
    config::Config,
    routes,
    state::AppState,
    utils::{cache::TtlCache, notifier::{EmailMessage, Notifier}},
};
use sqlx::{PgPool, postgres::PgPoolOptions};
use tokio::sync::mpsc::UnboundedReceiver;

pub struct TestApp {
    pub address: String,
    pub pool: PgPool,
    pub client: reqwest::Client,
    pub mail: UnboundedReceiver<EmailMessage>,
}

/// A signed-in test user.
pub struct TestUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub token: String,
}

pub fn test_config(database_url: &str) -> Config {
    Config {
        database_url: database_url.to_string(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        admin_username: None,
        admin_password: None,
        admin_email: None,
        saved_milestone: 2,
        popular_cache_ttl: 60,
        mail_from: "noreply@loopcraft.test".to_string(),
    }
}

/// Spawns the app on a random port.
/// Returns `None` when `DATABASE_URL` is not set so the suite can run without Postgres.
pub async fn spawn_app() -> Option<TestApp> {
    let database_url = std::env::var("DATABASE_URL").ok()?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let (notifier, mail) = Notifier::channel();

    let state = AppState {
        pool: pool.clone(),
        config: test_config(&database_url),
        notifier,
        popular: TtlCache::new(Duration::from_secs(60)),
    };

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Some(TestApp {
        address: format!("http://127.0.0.1:{}", port),
        pool,
        client: reqwest::Client::new(),
        mail,
    })
}

pub fn unique(prefix: &str) -> String {
    format!("{}_{}", prefix, &uuid::Uuid::new_v4().simple().to_string()[..10])
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// Registers and logs in a fresh user.
    pub async fn user(&self) -> TestUser {
        let username = unique("u");
        let email = format!("{}@example.com", username);

        let response = self
            .client
            .post(self.url("/api/auth/register"))
            .json(&serde_json::json!({
                "username": username,
                "email": email,
                "password": "password123",
                "verify_password": "password123"
            }))
            .send()
            .await
            .expect("Failed to register");
        assert_eq!(response.status().as_u16(), 201);
        let body: serde_json::Value = response.json().await.unwrap();
        let id = body["id"].as_i64().unwrap();

        let token = self.login(&username, "password123").await;

        TestUser {
            id,
            username,
            email,
            token,
        }
    }

    /// Registers a user and promotes it to admin before logging in.
    pub async fn admin(&self) -> TestUser {
        let mut user = self.user().await;
        sqlx::query("UPDATE users SET role = 'admin' WHERE id = $1")
            .bind(user.id)
            .execute(&self.pool)
            .await
            .unwrap();
        user.token = self.login(&user.username, "password123").await;
        user
    }

    pub async fn login(&self, username: &str, password: &str) -> String {
        let response = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&serde_json::json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("Failed to login");
        assert_eq!(response.status().as_u16(), 200);
        let body: serde_json::Value = response.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }

    /// Sends an authenticated JSON request and returns status and body.
    pub async fn call(
        &self,
        method: reqwest::Method,
        path: &str,
        token: &str,
        body: Option<serde_json::Value>,
    ) -> (u16, serde_json::Value) {
        let mut request = self
            .client
            .request(method, self.url(path))
            .bearer_auth(token);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await.expect("Failed to execute request");
        let status = response.status().as_u16();
        let text = response.text().await.unwrap();
        let body = serde_json::from_str(&text).unwrap_or(serde_json::Value::Null);
        (status, body)
    }

    /// Drains every queued e-mail.
    pub fn sent_mail(&mut self) -> Vec<EmailMessage> {
        let mut sent = Vec::new();
        while let Ok(message) = self.mail.try_recv() {
            sent.push(message);
        }
        sent
    }
}
