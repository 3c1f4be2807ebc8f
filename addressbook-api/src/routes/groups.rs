/// Group endpoints
///
/// # Endpoints
///
/// - `GET /v1/books/:book_id/groups` - List groups with member counts
/// - `POST /v1/books/:book_id/groups` - Create a group, optionally with members
/// - `GET /v1/groups/:group_id` - Group with its members
/// - `PUT /v1/groups/:group_id` - Rename and/or replace members
/// - `DELETE /v1/groups/:group_id` - Delete a group (contacts are kept)
/// - `POST /v1/groups/:group_id/members` - Add members
/// - `DELETE /v1/groups/:group_id/members/:contact_id` - Remove one member

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{Empty, Success},
};
use addressbook_shared::{
    auth::{
        authorization::{require_book, require_group},
        middleware::AuthContext,
    },
    membership,
    models::{
        contact::Contact,
        group::{Group, GroupSummary},
    },
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
pub struct CreateGroupRequest {
    #[validate(length(min = 1, max = 50, message = "Name must be 1 to 50 characters"))]
    pub name: String,

    /// Initial members; each must belong to the same book
    #[serde(default)]
    pub contact_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateGroupRequest {
    #[validate(length(min = 1, max = 50, message = "Name must be 1 to 50 characters"))]
    pub name: Option<String>,

    /// Replaces the member list when present; `[]` empties the group
    pub contact_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddMembersRequest {
    #[validate(length(min = 1, message = "At least one contact id is required"))]
    pub contact_ids: Vec<Uuid>,
}

fn trimmed_name(name: &str) -> ApiResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::invalid_field("name", "Name must not be blank"));
    }
    Ok(name.to_string())
}

#[derive(Debug, Serialize)]
pub struct GroupListResponse {
    pub groups: Vec<GroupSummary>,
}

#[derive(Debug, Serialize)]
pub struct GroupResponse {
    pub group: Group,
    pub members: Vec<Contact>,
}

#[derive(Debug, Serialize)]
pub struct MembersResponse {
    pub group_id: Uuid,

    /// Contacts attached by this request, in request order
    pub contact_ids: Vec<Uuid>,
}

/// Lists a book's groups by name with member counts
pub async fn list_groups(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(book_id): Path<Uuid>,
) -> ApiResult<Json<Success<GroupListResponse>>> {
    let book = require_book(&state.db, &auth, book_id).await?;
    let groups = Group::list_by_book(&state.db, book.id).await?;

    Ok(Json(Success::new(
        format!("{} group(s)", groups.len()),
        GroupListResponse { groups },
    )))
}

/// Creates a group in a book
///
/// # Endpoint
///
/// ```text
/// POST /v1/books/:book_id/groups
/// Authorization: Bearer <token>
///
/// {
///   "name": "Family",
///   "contact_ids": ["uuid"]
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: A contact belongs to a different address book
/// - `404 Not Found`: Book or contact not found
/// - `422 Unprocessable Entity`: Validation failed
pub async fn create_group(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(book_id): Path<Uuid>,
    Json(req): Json<CreateGroupRequest>,
) -> ApiResult<(StatusCode, Json<Success<GroupResponse>>)> {
    req.validate()?;
    let name = trimmed_name(&req.name)?;
    let book = require_book(&state.db, &auth, book_id).await?;

    let mut tx = state.db.begin().await?;

    let group = Group::create(&mut *tx, book.id, &name).await?;
    membership::add_members(&mut tx, &group, &req.contact_ids).await?;
    let members = Group::members(&mut *tx, group.id).await?;

    tx.commit().await?;

    info!(
        address_book_id = %book.id,
        group_id = %group.id,
        members = members.len(),
        "Group created"
    );

    Ok((
        StatusCode::CREATED,
        Json(Success::new("Group created", GroupResponse { group, members })),
    ))
}

/// Returns a group with its members
pub async fn get_group(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(group_id): Path<Uuid>,
) -> ApiResult<Json<Success<GroupResponse>>> {
    let group = require_group(&state.db, &auth, group_id).await?;
    let members = Group::members(&state.db, group.id).await?;

    Ok(Json(Success::new("Group", GroupResponse { group, members })))
}

/// Renames a group and/or replaces its members in one transaction
///
/// # Errors
///
/// - `400 Bad Request`: Empty body, or a contact from a different book
/// - `404 Not Found`: Group or contact not found
pub async fn update_group(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(group_id): Path<Uuid>,
    Json(req): Json<UpdateGroupRequest>,
) -> ApiResult<Json<Success<GroupResponse>>> {
    req.validate()?;

    if req.name.is_none() && req.contact_ids.is_none() {
        return Err(ApiError::BadRequest("Nothing to update".to_string()));
    }

    let name = req.name.as_deref().map(trimmed_name).transpose()?;
    let group = require_group(&state.db, &auth, group_id).await?;

    let mut tx = state.db.begin().await?;

    let group = match name {
        Some(name) => Group::rename(&mut *tx, group.id, &name)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Group {} not found", group_id)))?,
        None => group,
    };

    if let Some(contact_ids) = &req.contact_ids {
        membership::replace_members(&mut tx, &group, contact_ids).await?;
    }

    let members = Group::members(&mut *tx, group.id).await?;

    tx.commit().await?;

    info!(group_id = %group.id, members = members.len(), "Group updated");

    Ok(Json(Success::new("Group updated", GroupResponse { group, members })))
}

/// Deletes a group; member contacts are kept
pub async fn delete_group(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(group_id): Path<Uuid>,
) -> ApiResult<Json<Success<Empty>>> {
    let group = require_group(&state.db, &auth, group_id).await?;
    Group::delete(&state.db, group.id).await?;

    info!(
        address_book_id = %group.address_book_id,
        group_id = %group.id,
        "Group deleted"
    );

    Ok(Json(Success::new("Group deleted", Empty {})))
}

/// Adds contacts to a group, all or nothing
///
/// # Endpoint
///
/// ```text
/// POST /v1/groups/:group_id/members
/// Authorization: Bearer <token>
///
/// { "contact_ids": ["uuid", "uuid"] }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: A contact belongs to a different address book
/// - `404 Not Found`: Group or contact not found
pub async fn add_members(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(group_id): Path<Uuid>,
    Json(req): Json<AddMembersRequest>,
) -> ApiResult<Json<Success<MembersResponse>>> {
    req.validate()?;
    let group = require_group(&state.db, &auth, group_id).await?;

    let mut tx = state.db.begin().await?;
    let contact_ids = membership::add_members(&mut tx, &group, &req.contact_ids).await?;
    tx.commit().await?;

    info!(group_id = %group.id, added = contact_ids.len(), "Members added");

    Ok(Json(Success::new(
        "Members added",
        MembersResponse {
            group_id: group.id,
            contact_ids,
        },
    )))
}

/// Removes one contact from a group
///
/// # Errors
///
/// - `404 Not Found`: Group not found, or the contact is not a member
pub async fn remove_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((group_id, contact_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<Success<Empty>>> {
    let group = require_group(&state.db, &auth, group_id).await?;
    membership::remove_member(&state.db, group.id, contact_id).await?;

    info!(group_id = %group.id, contact_id = %contact_id, "Member removed");

    Ok(Json(Success::new("Member removed", Empty {})))
}
