//! Helpers for driving the full router in tests.

use std::collections::HashMap;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::util::ServiceExt;

use crate::config::Config;
use crate::database::Repositories;
use crate::models::user::{Role, User};
use crate::services::identity::NewUser;
use crate::state::AppState;

pub const BOUNDARY: &str = "rental-test-boundary";
pub const PASSWORD: &str = "secret123";

pub struct TestApp {
    pub state: AppState,
    dir: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_env(&[])
    }

    /// Build an app on the in-memory store, overriding config keys from `extra`.
    pub fn with_env(extra: &[(&str, &str)]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut env: HashMap<String, String> = [
            ("DATABASE_URL", "memory://"),
            ("JWT_SECRET", "test-secret"),
            ("BCRYPT_COST", "4"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        env.insert("UPLOAD_DIR".into(), dir.path().display().to_string());
        for (k, v) in extra {
            env.insert(k.to_string(), v.to_string());
        }

        let config = Config::from_lookup(|key| env.get(key).cloned()).unwrap();
        Self {
            state: AppState::new(config, Repositories::in_memory()),
            dir,
        }
    }

    /// Create a user directly and return it with a valid token.
    pub async fn user(&self, email: &str, role: Role) -> (User, String) {
        let user = self
            .state
            .identity
            .create(NewUser {
                name: "Test User".into(),
                email: email.into(),
                password: PASSWORD.into(),
                phone: None,
                role,
                username: None,
            })
            .await
            .unwrap();
        let token = self.state.tokens.issue(&user).unwrap();
        (user, token)
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = crate::app(self.state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
        };
        (status, body)
    }

    /// Number of files in the upload directory.
    pub fn stored_files(&self) -> usize {
        std::fs::read_dir(self.dir.path()).unwrap().count()
    }
}

pub fn json_request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// A multipart body assembled by hand.
#[derive(Default)]
pub struct MultipartBody {
    fields: Vec<(String, String)>,
    files: Vec<(String, String, String, Vec<u8>)>,
}

impl MultipartBody {
    /// Set a text field, replacing any earlier value under the same name.
    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.fields.retain(|(n, _)| n != name);
        self.fields.push((name.to_string(), value.to_string()));
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, content_type: &str, bytes: &[u8]) -> Self {
        self.files
            .push((name.to_string(), file_name.to_string(), content_type.to_string(), bytes.to_vec()));
        self
    }

    /// A listing with every required field filled in.
    pub fn listing(title: &str) -> Self {
        Self::default()
            .text("title", title)
            .text("description", "Bright loft near the river")
            .text("price", "1200")
            .text(
                "location",
                r#"{"address":"12 Mill Road","area":"Riverside","city":"Pune","state":"Maharashtra","pinCode":"411001"}"#,
            )
            .text("category", "Apartment")
            .text("bedrooms", "1")
            .text("bathrooms", "1")
            .text("area", "650")
    }

    pub fn images(self, count: usize) -> Self {
        (0..count).fold(self, |body, i| {
            body.file("images", &format!("photo{i}.jpg"), "image/jpeg", b"\xFF\xD8\xFFjpeg")
        })
    }

    pub fn request(self, method: Method, uri: &str, token: &str) -> Request<Body> {
        let mut buf = Vec::new();
        for (name, value) in &self.fields {
            buf.extend_from_slice(
                format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                    .as_bytes(),
            );
        }
        for (name, file_name, content_type, bytes) in &self.files {
            buf.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
                )
                .as_bytes(),
            );
            buf.extend_from_slice(bytes);
            buf.extend_from_slice(b"\r\n");
        }
        buf.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(buf))
            .unwrap()
    }
}
