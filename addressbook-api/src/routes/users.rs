/// Current user endpoints
///
/// - `GET /v1/me` - Profile and address book ids
/// - `DELETE /v1/me` - Delete the account and everything it owns

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{Empty, Success},
};
use addressbook_shared::{
    auth::middleware::AuthContext,
    models::{address_book::AddressBook, user::User},
};
use axum::{extract::State, Extension, Json};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct MeResponse {
    /// Profile; the password hash is never serialized
    pub user: User,
    pub address_books: Vec<Uuid>,
}

/// Returns the caller's profile
///
/// # Errors
///
/// - `401 Unauthorized`: Missing or invalid token
/// - `404 Not Found`: The account was deleted after the token was issued
pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Success<MeResponse>>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let address_books = AddressBook::list_by_user(&state.db, user.id)
        .await?
        .into_iter()
        .map(|book| book.id)
        .collect();

    Ok(Json(Success::new(
        "User profile",
        MeResponse {
            user,
            address_books,
        },
    )))
}

/// Deletes the caller's account
///
/// Address books, contacts, groups and membership edges go with it through
/// `ON DELETE CASCADE`.
pub async fn delete_account(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Success<Empty>>> {
    if !User::delete(&state.db, auth.user_id).await? {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    info!(user_id = %auth.user_id, "Account deleted");

    Ok(Json(Success::new("Account deleted", Empty {})))
}
