/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use addressbook_api::{app::{build_router, AppState}, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let app = build_router(AppState::new(pool, config));
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError, middleware::security::SecurityHeadersLayer, routes};
use addressbook_shared::auth::middleware::authenticate;
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{delete, get, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state, cloned into every handler
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: PgPool, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }

    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete router
///
/// ```text
/// /health                                   public
/// /v1/auth/{register,login,refresh}         public
/// /v1/me                                    GET, DELETE
/// /v1/books                                 GET, POST
/// /v1/books/:book_id                        GET, PUT, DELETE
/// /v1/books/:book_id/contacts               GET, POST
/// /v1/books/:book_id/groups                 GET, POST
/// /v1/contacts/:contact_id                  GET, PUT, DELETE
/// /v1/groups/:group_id                      GET, PUT, DELETE
/// /v1/groups/:group_id/members              POST
/// /v1/groups/:group_id/members/:contact_id  DELETE
/// ```
pub fn build_router(state: AppState) -> Router {
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh));

    let protected_routes = Router::new()
        .route(
            "/me",
            get(routes::users::me).delete(routes::users::delete_account),
        )
        .route(
            "/books",
            get(routes::books::list_books).post(routes::books::create_book),
        )
        .route(
            "/books/:book_id",
            get(routes::books::get_book)
                .put(routes::books::rename_book)
                .delete(routes::books::delete_book),
        )
        .route(
            "/books/:book_id/contacts",
            get(routes::contacts::list_contacts).post(routes::contacts::create_contact),
        )
        .route(
            "/books/:book_id/groups",
            get(routes::groups::list_groups).post(routes::groups::create_group),
        )
        .route(
            "/contacts/:contact_id",
            get(routes::contacts::get_contact)
                .put(routes::contacts::update_contact)
                .delete(routes::contacts::delete_contact),
        )
        .route(
            "/groups/:group_id",
            get(routes::groups::get_group)
                .put(routes::groups::update_group)
                .delete(routes::groups::delete_group),
        )
        .route("/groups/:group_id/members", post(routes::groups::add_members))
        .route(
            "/groups/:group_id/members/:contact_id",
            delete(routes::groups::remove_member),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let v1_routes = Router::new()
        .nest("/auth", auth_routes)
        .merge(protected_routes);

    let cors = if state.config.cors_permissive() {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// Validates the bearer token and stores the caller's `AuthContext`
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_context = authenticate(req.headers(), state.jwt_secret())?;
    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiConfig, DatabaseConfig, JwtConfig, LogFormat, LoggingConfig};
    use addressbook_shared::auth::jwt::{create_token, Claims, TokenType};
    use axum::{body::Body, http::StatusCode};
    use tower::ServiceExt;
    use uuid::Uuid;

    const SECRET: &str = "router-test-secret-at-least-32-bytes";

    // The pool never connects; these requests are answered before any query.
    fn app() -> Router {
        let config = Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                cors_origins: vec!["*".to_string()],
                production: false,
            },
            database: DatabaseConfig {
                url: "postgresql://localhost/addressbook_test".to_string(),
                max_connections: 1,
                run_migrations: false,
            },
            jwt: JwtConfig {
                secret: SECRET.to_string(),
            },
            logging: LoggingConfig {
                format: LogFormat::Pretty,
            },
        };

        let pool = PgPool::connect_lazy(&config.database.url).unwrap();
        build_router(AppState::new(pool, config))
    }

    fn get(uri: &str, token: Option<&str>) -> axum::http::Request<Body> {
        let mut builder = axum::http::Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_missing_token_is_401_json() {
        let response = app().oneshot(get("/v1/books", None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(header::X_CONTENT_TYPE_OPTIONS).is_some());

        let body = json_body(response).await;
        assert_eq!(body["status"], "error");
        assert_eq!(body["error"], "unauthorized");
    }

    #[tokio::test]
    async fn test_refresh_token_cannot_call_api() {
        let refresh = create_token(&Claims::new(Uuid::new_v4(), TokenType::Refresh), SECRET).unwrap();

        let response = app()
            .oneshot(get("/v1/me", Some(&refresh)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_token_signed_with_other_secret_rejected() {
        let token = create_token(
            &Claims::new(Uuid::new_v4(), TokenType::Access),
            "some-other-secret-that-is-32-bytes-long",
        )
        .unwrap();

        let response = app()
            .oneshot(get("/v1/books", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_malformed_path_id_rejected_before_handler() {
        let token = create_token(&Claims::new(Uuid::new_v4(), TokenType::Access), SECRET).unwrap();

        let response = app()
            .oneshot(get("/v1/books/not-a-uuid", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let response = app().oneshot(get("/v2/books", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
