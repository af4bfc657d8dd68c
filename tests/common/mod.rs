#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{header, Method, Request},
    response::Response,
    Router,
};
use clubhx_api::{
    auth::Role,
    config::AppConfig,
    db,
    events::{self, EventSender},
    services::users::CreateUserRequest,
    AppState,
};
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str =
    "clubhx_test_signing_secret_used_by_integration_runs_7Q2v9Lx4Rm8Tz1Kp6Wn3Hb";
pub const TEST_PASSWORD: &str = "correct-horse-battery";

/// A registered user together with a live access token.
pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub token: String,
}

/// Helper harness for spinning up the full router on an in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<usize>,
}

impl TestApp {
    pub async fn new() -> Self {
        let cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            TEST_JWT_SECRET.to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let (event_tx, event_rx) = mpsc::channel(256);
        let event_task = tokio::spawn(events::process_events(event_rx));
        let state = AppState::new(
            Arc::new(pool),
            cfg,
            Some(Arc::new(EventSender::new(event_tx))),
        );

        Self {
            router: clubhx_api::app_router(state.clone()),
            state,
            _event_task: event_task,
        }
    }

    pub async fn create_user(&self, role: Role, email: &str) -> Uuid {
        self.state
            .services
            .users
            .create_user(CreateUserRequest {
                email: email.to_string(),
                name: format!("{role} user"),
                role,
                password: TEST_PASSWORD.to_string(),
            })
            .await
            .expect("create test user")
            .id
    }

    pub async fn login(&self, email: &str, password: &str) -> Response {
        let body = serde_json::json!({ "email": email, "password": password });
        self.request(Method::POST, "/auth/login", None, Some(body))
            .await
    }

    /// Creates a user of `role` and logs them in.
    pub async fn user(&self, role: Role, email: &str) -> TestUser {
        let id = self.create_user(role, email).await;
        let response = self.login(email, TEST_PASSWORD).await;
        assert_eq!(response.status(), 200, "login should succeed for {email}");
        let body = response_json(response).await;
        TestUser {
            id,
            email: email.to_string(),
            token: body["access_token"]
                .as_str()
                .expect("access token in login response")
                .to_string(),
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("valid request");

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    pub async fn get(&self, uri: &str, user: &TestUser) -> Response {
        self.request(Method::GET, uri, Some(&user.token), None).await
    }

    pub async fn post(&self, uri: &str, user: &TestUser, body: Value) -> Response {
        self.request(Method::POST, uri, Some(&user.token), Some(body))
            .await
    }

    pub async fn put(&self, uri: &str, user: &TestUser, body: Value) -> Response {
        self.request(Method::PUT, uri, Some(&user.token), Some(body))
            .await
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}
