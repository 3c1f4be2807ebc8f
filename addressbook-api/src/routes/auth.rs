/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /v1/auth/register` - Create an account and its default address book
/// - `POST /v1/auth/login` - Exchange credentials for tokens
/// - `POST /v1/auth/refresh` - Exchange a refresh token for an access token

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::Success,
};
use addressbook_shared::{
    auth::{jwt, password},
    models::{
        address_book::{AddressBook, DEFAULT_BOOK_NAME},
        user::{CreateUser, User},
    },
};
use axum::{extract::State, http::StatusCode, Json};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Checked again for strength after the length rule
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[validate(length(min = 1, max = 100, message = "Full name must be 1 to 100 characters"))]
    pub fullname: String,

    pub date_of_birth: Option<NaiveDate>,

    #[validate(length(max = 10, message = "Gender must be at most 10 characters"))]
    pub gender: Option<String>,

    #[validate(length(max = 255, message = "Address must be at most 255 characters"))]
    pub address: Option<String>,

    #[validate(length(max = 20, message = "Phone must be at most 20 characters"))]
    pub phone: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,

    /// The "Default Phonebook" created with the account
    pub address_book_id: Uuid,

    /// Access token (24h)
    pub access_token: String,

    /// Refresh token (30d)
    pub refresh_token: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub fullname: String,

    /// Ids of every address book the user owns, oldest first
    pub address_books: Vec<Uuid>,

    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    /// New access token (24h)
    pub access_token: String,
}

/// Register a new user
///
/// Creates the user and a "Default Phonebook" address book in one
/// transaction, then issues a token pair.
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/register
/// Content-Type: application/json
///
/// {
///   "email": "ada@example.com",
///   "password": "analytical1",
///   "fullname": "Ada Lovelace",
///   "phone": "555-0100"
/// }
/// ```
///
/// # Response
///
/// ```json
/// {
///   "status": "success",
///   "message": "User registered",
///   "user_id": "uuid",
///   "address_book_id": "uuid",
///   "access_token": "eyJ...",
///   "refresh_token": "eyJ..."
/// }
/// ```
///
/// # Errors
///
/// - `409 Conflict`: Email already exists
/// - `422 Unprocessable Entity`: Validation failed
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<Success<RegisterResponse>>)> {
    req.validate()?;

    password::validate_password_strength(&req.password)
        .map_err(|msg| ApiError::invalid_field("password", msg))?;

    if req.fullname.trim().is_empty() {
        return Err(ApiError::invalid_field("fullname", "Full name must not be blank"));
    }

    if User::email_exists(&state.db, &req.email).await? {
        return Err(ApiError::Conflict("Email already exists".to_string()));
    }

    let password_hash = password::hash_password(&req.password)?;

    // A concurrent registration with the same email still fails on the
    // unique constraint, which maps to 409 as well.
    let mut tx = state.db.begin().await?;

    let user = User::create(
        &mut *tx,
        CreateUser {
            email: req.email,
            password_hash,
            fullname: req.fullname.trim().to_string(),
            date_of_birth: req.date_of_birth,
            gender: req.gender,
            address: req.address,
            phone: req.phone,
        },
    )
    .await?;

    let book = AddressBook::create(&mut *tx, user.id, DEFAULT_BOOK_NAME).await?;

    tx.commit().await?;

    let (access_token, refresh_token) = jwt::issue_token_pair(user.id, state.jwt_secret())?;

    info!(user_id = %user.id, address_book_id = %book.id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(Success::new(
            "User registered",
            RegisterResponse {
                user_id: user.id,
                address_book_id: book.id,
                access_token,
                refresh_token,
            },
        )),
    ))
}

/// Login endpoint
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/login
/// Content-Type: application/json
///
/// {
///   "email": "ada@example.com",
///   "password": "analytical1"
/// }
/// ```
///
/// # Response
///
/// ```json
/// {
///   "status": "success",
///   "message": "Login successful",
///   "user_id": "uuid",
///   "fullname": "Ada Lovelace",
///   "address_books": ["uuid"],
///   "access_token": "eyJ...",
///   "refresh_token": "eyJ..."
/// }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Unknown email or wrong password (same message)
/// - `422 Unprocessable Entity`: Validation failed
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<Success<LoginResponse>>> {
    req.validate()?;

    let invalid = || ApiError::Unauthorized("Invalid credentials".to_string());

    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(invalid)?;

    if !password::verify_password(&req.password, &user.password_hash)? {
        warn!(user_id = %user.id, "Login rejected: wrong password");
        return Err(invalid());
    }

    User::update_last_login(&state.db, user.id).await?;

    let address_books = AddressBook::list_by_user(&state.db, user.id)
        .await?
        .into_iter()
        .map(|book| book.id)
        .collect();

    let (access_token, refresh_token) = jwt::issue_token_pair(user.id, state.jwt_secret())?;

    info!(user_id = %user.id, "User logged in");

    Ok(Json(Success::new(
        "Login successful",
        LoginResponse {
            user_id: user.id,
            fullname: user.fullname,
            address_books,
            access_token,
            refresh_token,
        },
    )))
}

/// Token refresh endpoint
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/refresh
/// Content-Type: application/json
///
/// {
///   "refresh_token": "eyJ..."
/// }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid, expired or access-type token
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<Success<RefreshResponse>>> {
    let access_token = jwt::refresh_access_token(&req.refresh_token, state.jwt_secret())?;

    Ok(Json(Success::new(
        "Token refreshed",
        RefreshResponse { access_token },
    )))
}
