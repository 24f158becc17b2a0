//! Router-level harness over the in-memory store and fake object storage.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use crate::app::build_app;
use crate::auth::jwt::JwtKeys;
use crate::authz::Role;
use crate::blogs::category::Category;
use crate::state::AppState;
use crate::storage::FakeStorage;
use crate::store::{memory::MemoryStore, Blog, BlogRepo, NewBlog, NewUser, User, UserRepo};

const BOUNDARY: &str = "quill-test-boundary";

/// One part of a multipart request body.
pub enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        filename: &'a str,
        content_type: &'a str,
        body: &'a [u8],
    },
}

impl<'a> Part<'a> {
    pub fn png(name: &'a str) -> Self {
        Part::File { name, filename: "image.png", content_type: "image/png", body: b"\x89PNG\r\n" }
    }
}

pub struct TestApp {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub storage: Arc<FakeStorage>,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let storage = Arc::new(FakeStorage::default());
        let state = AppState::from_parts(
            store.clone(),
            Arc::new(AppState::fake_config()),
            storage.clone(),
        );
        let router = build_app(state.clone());
        Self { state, store, storage, router }
    }

    /// Inserts a user directly with the given role.
    pub async fn user(&self, name: &str, role: Role) -> User {
        let user = self
            .store
            .create_user(NewUser {
                username: name.to_string(),
                email: format!("{name}@example.com"),
                password_hash: "not-a-real-hash".into(),
            })
            .await
            .unwrap();
        self.store.set_role(user.id, Role::User, role).await.unwrap().unwrap()
    }

    /// Inserts a blog owned by `author` with an image key already in storage.
    pub async fn blog(&self, author: &User, title: &str) -> Blog {
        let key = format!("blogs/{}/{}.png", author.id, uuid::Uuid::new_v4());
        self.blog_with_image(author, title, Some(key)).await
    }

    pub async fn blog_with_image(&self, author: &User, title: &str, image: Option<String>) -> Blog {
        self.store
            .create_blog(NewBlog {
                title: title.to_string(),
                slug: crate::blogs::slug::slugify(title),
                description: "one two three four five six seven eight nine ten \
                              eleven twelve thirteen fourteen fifteen sixteen \
                              seventeen eighteen nineteen twenty"
                    .into(),
                category: Category::Technology,
                blog_image: image,
                author_id: author.id,
            })
            .await
            .unwrap()
    }

    pub fn keys(&self) -> JwtKeys {
        JwtKeys::from_config(&self.state.config.jwt)
    }

    pub fn token(&self, user: &User) -> String {
        self.keys().sign_access(user.id).unwrap()
    }

    async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let res = self.router.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    fn request(method: Method, path: &str, token: Option<&str>) -> axum::http::request::Builder {
        let mut req = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        req
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        let req = Self::request(Method::GET, path, token).body(Body::empty()).unwrap();
        self.send(req).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        let req = Self::request(Method::DELETE, path, token).body(Body::empty()).unwrap();
        self.send(req).await
    }

    pub async fn post(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        let req = Self::request(Method::POST, path, token).body(Body::empty()).unwrap();
        self.send(req).await
    }

    pub async fn put(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        let req = Self::request(Method::PUT, path, token).body(Body::empty()).unwrap();
        self.send(req).await
    }

    pub async fn post_json(&self, path: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        let req = Self::request(Method::POST, path, token)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(req).await
    }

    pub async fn multipart(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        parts: &[Part<'_>],
    ) -> (StatusCode, Value) {
        let mut body: Vec<u8> = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match part {
                Part::Text(name, value) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n")
                            .as_bytes(),
                    );
                    body.extend_from_slice(value.as_bytes());
                }
                Part::File { name, filename, content_type, body: bytes } => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                             Content-Type: {content_type}\r\n\r\n"
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(bytes);
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let req = Self::request(method, path, token)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();
        self.send(req).await
    }
}
