/// Contact endpoints
///
/// Group membership is written through `addressbook_shared::membership`,
/// inside the same transaction as the contact row, so a rejected group id
/// leaves neither the contact nor its previous memberships changed.
///
/// # Endpoints
///
/// - `GET /v1/books/:book_id/contacts` - List contacts with their group ids
/// - `POST /v1/books/:book_id/contacts` - Create a contact, optionally in groups
/// - `GET /v1/contacts/:contact_id` - Contact with its group ids
/// - `PUT /v1/contacts/:contact_id` - Partial update, optional group replacement
/// - `DELETE /v1/contacts/:contact_id` - Delete a contact

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{double_option, Empty, Success},
};
use addressbook_shared::{
    auth::{
        authorization::{require_book, require_contact},
        middleware::AuthContext,
    },
    membership,
    models::contact::{Contact, ContactWithGroups, CreateContact, UpdateContact},
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

#[derive(Debug, Deserialize, Validate)]
pub struct CreateContactRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters"))]
    pub name: String,

    #[validate(
        email(message = "Invalid email format"),
        length(max = 100, message = "Email must be at most 100 characters")
    )]
    pub email: Option<String>,

    #[validate(length(max = 20, message = "Phone must be at most 20 characters"))]
    pub phone: Option<String>,

    #[validate(length(max = 255, message = "Address must be at most 255 characters"))]
    pub address: Option<String>,

    #[validate(length(max = 1000, message = "Notes must be at most 1000 characters"))]
    pub notes: Option<String>,

    /// Groups to join; each must belong to the same book
    #[serde(default)]
    pub group_ids: Vec<Uuid>,
}

/// Partial update
///
/// Absent fields are left alone. `null` clears an optional field. When
/// `group_ids` is present it replaces the contact's memberships; `[]`
/// removes them all.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateContactRequest {
    pub name: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub email: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub phone: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub address: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,

    pub group_ids: Option<Vec<Uuid>>,
}

/// The values an update would write, checked with the create rules
#[derive(Debug, Validate)]
struct PatchedFields {
    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters"))]
    name: Option<String>,

    #[validate(
        email(message = "Invalid email format"),
        length(max = 100, message = "Email must be at most 100 characters")
    )]
    email: Option<String>,

    #[validate(length(max = 20, message = "Phone must be at most 20 characters"))]
    phone: Option<String>,

    #[validate(length(max = 255, message = "Address must be at most 255 characters"))]
    address: Option<String>,

    #[validate(length(max = 1000, message = "Notes must be at most 1000 characters"))]
    notes: Option<String>,
}

fn written(value: &Option<Option<String>>) -> Option<String> {
    value.clone().flatten()
}

impl CreateContactRequest {
    fn check(&self) -> ApiResult<()> {
        self.validate()?;
        if self.name.trim().is_empty() {
            return Err(ApiError::invalid_field("name", "Name must not be blank"));
        }
        Ok(())
    }
}

impl UpdateContactRequest {
    fn check(&self) -> ApiResult<()> {
        PatchedFields {
            name: self.name.clone(),
            email: written(&self.email),
            phone: written(&self.phone),
            address: written(&self.address),
            notes: written(&self.notes),
        }
        .validate()?;

        if matches!(&self.name, Some(name) if name.trim().is_empty()) {
            return Err(ApiError::invalid_field("name", "Name must not be blank"));
        }
        Ok(())
    }

    /// Splits the request into column changes and the optional group list
    fn into_parts(self) -> (UpdateContact, Option<Vec<Uuid>>) {
        let changes = UpdateContact {
            name: self.name.map(|name| name.trim().to_string()),
            email: self.email,
            phone: self.phone,
            address: self.address,
            notes: self.notes,
        };
        (changes, self.group_ids)
    }
}

#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub contact: ContactWithGroups,
}

#[derive(Debug, Serialize)]
pub struct ContactListResponse {
    pub contacts: Vec<ContactWithGroups>,
}

/// Lists a book's contacts by name, each with its group ids
pub async fn list_contacts(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(book_id): Path<Uuid>,
) -> ApiResult<Json<Success<ContactListResponse>>> {
    let book = require_book(&state.db, &auth, book_id).await?;
    let contacts = Contact::list_by_book(&state.db, book.id).await?;

    Ok(Json(Success::new(
        format!("{} contact(s)", contacts.len()),
        ContactListResponse { contacts },
    )))
}

/// Creates a contact in a book
///
/// # Endpoint
///
/// ```text
/// POST /v1/books/:book_id/contacts
/// Authorization: Bearer <token>
///
/// {
///   "name": "Grace Hopper",
///   "phone": "555-0199",
///   "group_ids": ["uuid"]
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: A group belongs to a different address book
/// - `404 Not Found`: Book or group not found
/// - `422 Unprocessable Entity`: Validation failed
pub async fn create_contact(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(book_id): Path<Uuid>,
    Json(req): Json<CreateContactRequest>,
) -> ApiResult<(StatusCode, Json<Success<ContactResponse>>)> {
    req.check()?;
    let book = require_book(&state.db, &auth, book_id).await?;

    let mut tx = state.db.begin().await?;

    let contact = Contact::create(
        &mut *tx,
        book.id,
        CreateContact {
            name: req.name.trim().to_string(),
            email: req.email,
            phone: req.phone,
            address: req.address,
            notes: req.notes,
        },
    )
    .await?;

    let group_ids = membership::attach_groups(&mut tx, &contact, &req.group_ids).await?;

    tx.commit().await?;

    info!(
        address_book_id = %book.id,
        contact_id = %contact.id,
        groups = group_ids.len(),
        "Contact created"
    );

    Ok((
        StatusCode::CREATED,
        Json(Success::new(
            "Contact created",
            ContactResponse {
                contact: ContactWithGroups { contact, group_ids },
            },
        )),
    ))
}

/// Returns a contact with its group ids
pub async fn get_contact(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(contact_id): Path<Uuid>,
) -> ApiResult<Json<Success<ContactResponse>>> {
    let contact = require_contact(&state.db, &auth, contact_id).await?;
    let group_ids = Contact::group_ids(&state.db, contact.id).await?;

    Ok(Json(Success::new(
        "Contact",
        ContactResponse {
            contact: ContactWithGroups { contact, group_ids },
        },
    )))
}

/// Updates a contact's fields and, optionally, its groups
///
/// Field changes and membership replacement commit together.
///
/// # Errors
///
/// - `400 Bad Request`: Empty body, or a group from a different book
/// - `404 Not Found`: Contact or group not found
/// - `422 Unprocessable Entity`: Validation failed
pub async fn update_contact(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(contact_id): Path<Uuid>,
    Json(req): Json<UpdateContactRequest>,
) -> ApiResult<Json<Success<ContactResponse>>> {
    req.check()?;
    let (changes, requested_groups) = req.into_parts();

    if changes.is_empty() && requested_groups.is_none() {
        return Err(ApiError::BadRequest("Nothing to update".to_string()));
    }

    let contact = require_contact(&state.db, &auth, contact_id).await?;

    let mut tx = state.db.begin().await?;

    let contact = if changes.is_empty() {
        contact
    } else {
        Contact::update(&mut *tx, contact.id, changes)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Contact {} not found", contact_id)))?
    };

    let group_ids = match requested_groups {
        Some(ids) => membership::replace_groups(&mut tx, &contact, &ids).await?,
        None => Contact::group_ids(&mut *tx, contact.id).await?,
    };

    tx.commit().await?;

    info!(contact_id = %contact.id, groups = group_ids.len(), "Contact updated");

    Ok(Json(Success::new(
        "Contact updated",
        ContactResponse {
            contact: ContactWithGroups { contact, group_ids },
        },
    )))
}

/// Deletes a contact; its membership edges cascade
pub async fn delete_contact(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(contact_id): Path<Uuid>,
) -> ApiResult<Json<Success<Empty>>> {
    let contact = require_contact(&state.db, &auth, contact_id).await?;
    Contact::delete(&state.db, contact.id).await?;

    info!(
        address_book_id = %contact.address_book_id,
        contact_id = %contact.id,
        "Contact deleted"
    );

    Ok(Json(Success::new("Contact deleted", Empty {})))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_defaults_group_ids() {
        let req: CreateContactRequest =
            serde_json::from_str(r#"{"name": "Grace Hopper"}"#).unwrap();
        assert!(req.group_ids.is_empty());
        assert!(req.check().is_ok());
    }

    #[test]
    fn test_create_request_rejects_bad_email() {
        let req: CreateContactRequest =
            serde_json::from_str(r#"{"name": "Grace", "email": "nope"}"#).unwrap();
        assert!(req.check().is_err());
    }

    #[test]
    fn test_create_request_rejects_blank_name() {
        let req: CreateContactRequest = serde_json::from_str(r#"{"name": "  "}"#).unwrap();
        assert!(req.check().is_err());
    }

    #[test]
    fn test_update_request_null_clears_field() {
        let req: UpdateContactRequest =
            serde_json::from_str(r#"{"email": null, "group_ids": []}"#).unwrap();
        assert!(req.check().is_ok());

        let (changes, groups) = req.into_parts();
        assert_eq!(changes.email, Some(None));
        assert_eq!(changes.phone, None);
        assert_eq!(groups, Some(Vec::new()));
    }

    #[test]
    fn test_update_request_validates_written_values() {
        let req: UpdateContactRequest =
            serde_json::from_str(r#"{"phone": "012345678901234567890"}"#).unwrap();
        assert!(req.check().is_err());

        let req: UpdateContactRequest = serde_json::from_str(r#"{"name": ""}"#).unwrap();
        assert!(req.check().is_err());
    }

    #[test]
    fn test_update_request_empty() {
        let req: UpdateContactRequest = serde_json::from_str("{}").unwrap();
        let (changes, groups) = req.into_parts();
        assert!(changes.is_empty());
        assert!(groups.is_none());
    }
}
