/// Ownership checks
///
/// Every address book, and everything inside it, is private to the user that
/// owns the book. The `require_*` lookups report a resource owned by someone
/// else exactly like a missing one.
///
/// # Example
///
/// ```no_run
/// use addressbook_shared::auth::authorization::require_book;
/// use addressbook_shared::auth::middleware::AuthContext;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, auth: AuthContext, book_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let book = require_book(&pool, &auth, book_id).await?;
/// println!("{} owns {}", auth.user_id, book.name);
/// # Ok(())
/// # }
/// ```

use sqlx::PgExecutor;
use uuid::Uuid;

use super::middleware::AuthContext;
use crate::models::{address_book::AddressBook, contact::Contact, group::Group};

/// Kind of resource an authorization check was about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    AddressBook,
    Contact,
    Group,
}

impl Resource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::AddressBook => "AddressBook",
            Resource::Contact => "Contact",
            Resource::Group => "Group",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// Resource is missing or belongs to another user
    #[error("{} {id} not found", .resource.as_str())]
    NotFound { resource: Resource, id: Uuid },

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Loads an address book the caller owns
pub async fn require_book<'e, E>(
    executor: E,
    auth: &AuthContext,
    book_id: Uuid,
) -> Result<AddressBook, AuthzError>
where
    E: PgExecutor<'e>,
{
    AddressBook::find_owned(executor, book_id, auth.user_id)
        .await?
        .ok_or(AuthzError::NotFound {
            resource: Resource::AddressBook,
            id: book_id,
        })
}

/// Loads a contact from one of the caller's address books
pub async fn require_contact<'e, E>(
    executor: E,
    auth: &AuthContext,
    contact_id: Uuid,
) -> Result<Contact, AuthzError>
where
    E: PgExecutor<'e>,
{
    Contact::find_owned(executor, contact_id, auth.user_id)
        .await?
        .ok_or(AuthzError::NotFound {
            resource: Resource::Contact,
            id: contact_id,
        })
}

/// Loads a group from one of the caller's address books
pub async fn require_group<'e, E>(
    executor: E,
    auth: &AuthContext,
    group_id: Uuid,
) -> Result<Group, AuthzError>
where
    E: PgExecutor<'e>,
{
    Group::find_owned(executor, group_id, auth.user_id)
        .await?
        .ok_or(AuthzError::NotFound {
            resource: Resource::Group,
            id: group_id,
        })
}
