//! Common test utilities for integration tests
//!
//! - Test database setup (reads `DATABASE_URL`, applies migrations)
//! - An in-process router driven with `tower::ServiceExt::oneshot`
//! - Helpers that register users and create books, groups and contacts

#![allow(dead_code)]

use addressbook_api::app::{build_router, AppState};
use addressbook_api::config::{ApiConfig, Config, DatabaseConfig, JwtConfig, LogFormat, LoggingConfig};
use addressbook_shared::db::migrations::MIGRATOR;
use addressbook_shared::models::user::User;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::{json, Value};
use sqlx::PgPool;
use std::sync::Mutex;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_PASSWORD: &str = "correct-horse-42";

/// Test context with a database pool and a router over it
pub struct TestContext {
    pub db: PgPool,
    pub app: axum::Router,
    pub config: Config,
    created_users: Mutex<Vec<Uuid>>,
}

/// A registered account
#[derive(Debug, Clone)]
pub struct TestUser {
    pub user_id: Uuid,
    pub email: String,
    pub default_book_id: Uuid,
    pub access_token: String,
    pub refresh_token: String,
}

/// Status code and parsed JSON body
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestContext {
    pub async fn new() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set for integration tests"))?;

        let config = Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors_origins: vec!["*".to_string()],
                production: false,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: 5,
                run_migrations: true,
            },
            jwt: JwtConfig {
                secret: "integration-test-secret-at-least-32-bytes".to_string(),
            },
            logging: LoggingConfig {
                format: LogFormat::Pretty,
            },
        };

        let db = PgPool::connect(&config.database.url).await?;
        MIGRATOR.run(&db).await?;

        let app = build_router(AppState::new(db.clone(), config.clone()));

        Ok(TestContext {
            db,
            app,
            config,
            created_users: Mutex::new(Vec::new()),
        })
    }

    /// Sends a request through the router
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        TestResponse { status, body }
    }

    pub async fn get(&self, uri: &str, token: &str) -> TestResponse {
        self.send(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> TestResponse {
        self.send(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> TestResponse {
        self.send(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> TestResponse {
        self.send(Method::DELETE, uri, Some(token), None).await
    }

    /// Registers a fresh user with a unique email
    pub async fn register_user(&self) -> TestUser {
        let email = format!("test-{}@example.com", Uuid::new_v4());

        let response = self
            .send(
                Method::POST,
                "/v1/auth/register",
                None,
                Some(json!({
                    "email": email,
                    "password": TEST_PASSWORD,
                    "fullname": "Test User",
                })),
            )
            .await;

        assert_eq!(
            response.status,
            StatusCode::CREATED,
            "register failed: {}",
            response.body
        );

        let user = TestUser {
            user_id: parse_id(&response.body["user_id"]),
            email,
            default_book_id: parse_id(&response.body["address_book_id"]),
            access_token: response.body["access_token"].as_str().unwrap().to_string(),
            refresh_token: response.body["refresh_token"].as_str().unwrap().to_string(),
        };

        self.created_users.lock().unwrap().push(user.user_id);
        user
    }

    pub async fn create_book(&self, user: &TestUser, name: &str) -> Uuid {
        let response = self
            .post("/v1/books", &user.access_token, json!({ "name": name }))
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        parse_id(&response.body["address_book"]["id"])
    }

    pub async fn create_group(&self, user: &TestUser, book_id: Uuid, name: &str) -> Uuid {
        let response = self
            .post(
                &format!("/v1/books/{}/groups", book_id),
                &user.access_token,
                json!({ "name": name }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        parse_id(&response.body["group"]["id"])
    }

    pub async fn create_contact(&self, user: &TestUser, book_id: Uuid, name: &str) -> Uuid {
        let response = self
            .post(
                &format!("/v1/books/{}/contacts", book_id),
                &user.access_token,
                json!({ "name": name }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        parse_id(&response.body["contact"]["id"])
    }

    /// Group ids of a contact, as stored
    pub async fn contact_group_ids(&self, user: &TestUser, contact_id: Uuid) -> Vec<Uuid> {
        let response = self
            .get(&format!("/v1/contacts/{}", contact_id), &user.access_token)
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.body);
        parse_ids(&response.body["contact"]["group_ids"])
    }

    /// Deletes every user this context registered; everything else cascades
    pub async fn cleanup(&self) -> anyhow::Result<()> {
        let users: Vec<Uuid> = self.created_users.lock().unwrap().drain(..).collect();
        for user_id in users {
            User::delete(&self.db, user_id).await?;
        }
        Ok(())
    }
}

pub fn parse_id(value: &Value) -> Uuid {
    value
        .as_str()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| panic!("expected a uuid, got {}", value))
}

pub fn parse_ids(value: &Value) -> Vec<Uuid> {
    value
        .as_array()
        .unwrap_or_else(|| panic!("expected an array, got {}", value))
        .iter()
        .map(parse_id)
        .collect()
}
