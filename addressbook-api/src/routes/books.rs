/// Address book endpoints
///
/// A book owned by someone else answers 404, exactly like a missing one.
///
/// # Endpoints
///
/// - `GET /v1/books` - List the caller's books
/// - `POST /v1/books` - Create a book
/// - `GET /v1/books/:book_id` - Book with contact and group counts
/// - `PUT /v1/books/:book_id` - Rename a book
/// - `DELETE /v1/books/:book_id` - Delete a book and everything in it

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{Empty, Success},
};
use addressbook_shared::{
    auth::{authorization::require_book, middleware::AuthContext},
    models::address_book::{AddressBook, AddressBookSummary},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

/// Create and rename share one body
#[derive(Debug, Deserialize, Validate)]
pub struct BookRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters"))]
    pub name: String,
}

impl BookRequest {
    fn checked_name(&self) -> ApiResult<&str> {
        self.validate()?;

        let name = self.name.trim();
        if name.is_empty() {
            return Err(ApiError::invalid_field("name", "Name must not be blank"));
        }
        Ok(name)
    }
}

#[derive(Debug, Serialize)]
pub struct BookListResponse {
    pub address_books: Vec<AddressBook>,
}

#[derive(Debug, Serialize)]
pub struct BookResponse {
    pub address_book: AddressBook,
}

#[derive(Debug, Serialize)]
pub struct BookSummaryResponse {
    pub address_book: AddressBookSummary,
}

/// Lists the caller's books, oldest first
pub async fn list_books(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Success<BookListResponse>>> {
    let address_books = AddressBook::list_by_user(&state.db, auth.user_id).await?;

    Ok(Json(Success::new(
        format!("{} address book(s)", address_books.len()),
        BookListResponse { address_books },
    )))
}

/// Creates a book
///
/// # Endpoint
///
/// ```text
/// POST /v1/books
/// Authorization: Bearer <token>
///
/// { "name": "Work" }
/// ```
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Name empty or longer than 100 characters
pub async fn create_book(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<BookRequest>,
) -> ApiResult<(StatusCode, Json<Success<BookResponse>>)> {
    let name = req.checked_name()?;
    let address_book = AddressBook::create(&state.db, auth.user_id, name).await?;

    info!(
        user_id = %auth.user_id,
        address_book_id = %address_book.id,
        "Address book created"
    );

    Ok((
        StatusCode::CREATED,
        Json(Success::new("Address book created", BookResponse { address_book })),
    ))
}

/// Returns a book with its contact and group counts
pub async fn get_book(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(book_id): Path<Uuid>,
) -> ApiResult<Json<Success<BookSummaryResponse>>> {
    let book = require_book(&state.db, &auth, book_id).await?;

    let address_book = AddressBook::summary(&state.db, book.id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Address book {} not found", book_id)))?;

    Ok(Json(Success::new(
        "Address book",
        BookSummaryResponse { address_book },
    )))
}

/// Renames a book
pub async fn rename_book(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(book_id): Path<Uuid>,
    Json(req): Json<BookRequest>,
) -> ApiResult<Json<Success<BookResponse>>> {
    let name = req.checked_name()?;
    let book = require_book(&state.db, &auth, book_id).await?;

    let address_book = AddressBook::rename(&state.db, book.id, name)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Address book {} not found", book_id)))?;

    info!(address_book_id = %book_id, "Address book renamed");

    Ok(Json(Success::new(
        "Address book renamed",
        BookResponse { address_book },
    )))
}

/// Deletes a book; contacts, groups and edges cascade
pub async fn delete_book(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(book_id): Path<Uuid>,
) -> ApiResult<Json<Success<Empty>>> {
    let book = require_book(&state.db, &auth, book_id).await?;
    AddressBook::delete(&state.db, book.id).await?;

    info!(user_id = %auth.user_id, address_book_id = %book_id, "Address book deleted");

    Ok(Json(Success::new("Address book deleted", Empty {})))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_name_trims() {
        let req = BookRequest {
            name: "  Work  ".to_string(),
        };
        assert_eq!(req.checked_name().unwrap(), "Work");
    }

    #[test]
    fn test_checked_name_rejects_blank_and_long() {
        let blank = BookRequest {
            name: "   ".to_string(),
        };
        assert!(blank.checked_name().is_err());

        let long = BookRequest {
            name: "x".repeat(101),
        };
        assert!(long.checked_name().is_err());
    }
}
