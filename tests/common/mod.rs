#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::ServiceExt;

use socialhub_backend::{build_app, config::settings::Settings, db, AppState};

pub const BOUNDARY: &str = "socialhub-test-boundary";

/// An app over a fresh in-memory database and a throwaway uploads directory.
pub struct TestApp {
    pub router: Router,
    pub pool: SqlitePool,
    pub uploads: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_database(None).await
    }

    /// A database file in the temp dir with a multi-connection pool, so
    /// requests can actually run side by side.
    pub async fn file_backed() -> Self {
        Self::with_database(Some(5)).await
    }

    async fn with_database(file_pool_size: Option<u32>) -> Self {
        let uploads = tempfile::tempdir().expect("tempdir");
        let mut settings = Settings::for_tests(uploads.path().join("uploads"));
        tokio::fs::create_dir_all(&settings.upload_dir)
            .await
            .expect("create upload dir");
        if let Some(size) = file_pool_size {
            settings.database_url =
                format!("sqlite://{}", uploads.path().join("social.db").display());
            settings.db_max_connections = size;
        }
        let pool = db::connect(&settings.database_url, settings.db_max_connections)
            .await
            .expect("test database");
        let router = build_app(AppState {
            pool: pool.clone(),
            settings,
        });
        Self {
            router,
            pool,
            uploads,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible router");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, body)
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");
        self.send(request).await
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post_json(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn post_empty(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(token), None).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, Some(token), None).await
    }

    pub async fn multipart(
        &self,
        method: Method,
        uri: &str,
        token: &str,
        parts: &[Part<'_>],
    ) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(parts)))
            .expect("request");
        self.send(request).await
    }

    /// Registers a user and returns `(id, token)`.
    pub async fn register(&self, username: &str) -> (i64, String) {
        let (status, body) = self
            .post_json(
                "/api/register",
                None,
                json!({
                    "username": username,
                    "email": format!("{username}@example.com"),
                    "password": "password123",
                    "full_name": format!("{username} tester"),
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register {username}: {body}");
        (
            body["user"]["id"].as_i64().expect("user id"),
            body["token"].as_str().expect("token").to_string(),
        )
    }

    pub async fn create_post(&self, token: &str, content: &str) -> i64 {
        let (status, body) = self
            .multipart(Method::POST, "/api/posts", token, &[Part::Text("content", content)])
            .await;
        assert_eq!(status, StatusCode::CREATED, "create post: {body}");
        body["post_id"].as_i64().expect("post id")
    }

    pub async fn count(&self, sql: &str) -> i64 {
        sqlx::query_scalar(sql)
            .fetch_one(&self.pool)
            .await
            .expect("count query")
    }
}

pub enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        bytes: &'a [u8],
    },
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File {
                name,
                file_name,
                content_type,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}
