/// Address book model and database operations
///
/// An address book belongs to exactly one user and owns its contacts and
/// groups. Deleting a book cascades to both, and to their membership edges.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE address_books (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     name VARCHAR(100) NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

/// Name given to the book created alongside every new account
pub const DEFAULT_BOOK_NAME: &str = "Default Phonebook";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AddressBook {
    pub id: Uuid,

    /// Owning user
    pub user_id: Uuid,

    pub name: String,

    pub created_at: DateTime<Utc>,
}

/// Book with the size of its contents, for detail views
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AddressBookSummary {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub contact_count: i64,
    pub group_count: i64,
}

impl AddressBook {
    /// Creates a book owned by `user_id`
    pub async fn create<'e, E>(executor: E, user_id: Uuid, name: &str) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, AddressBook>(
            r#"
            INSERT INTO address_books (user_id, name)
            VALUES ($1, $2)
            RETURNING id, user_id, name, created_at
            "#,
        )
        .bind(user_id)
        .bind(name)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, AddressBook>(
            "SELECT id, user_id, name, created_at FROM address_books WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// Finds a book only if `user_id` owns it
    pub async fn find_owned<'e, E>(
        executor: E,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, AddressBook>(
            "SELECT id, user_id, name, created_at FROM address_books WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(executor)
        .await
    }

    /// Lists a user's books, oldest first so the default book leads
    pub async fn list_by_user<'e, E>(executor: E, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, AddressBook>(
            r#"
            SELECT id, user_id, name, created_at
            FROM address_books
            WHERE user_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(executor)
        .await
    }

    /// Fetches a book together with its contact and group counts
    pub async fn summary<'e, E>(executor: E, id: Uuid) -> Result<Option<AddressBookSummary>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, AddressBookSummary>(
            r#"
            SELECT b.id, b.user_id, b.name, b.created_at,
                   (SELECT COUNT(*) FROM contacts c WHERE c.address_book_id = b.id) AS contact_count,
                   (SELECT COUNT(*) FROM groups g WHERE g.address_book_id = b.id) AS group_count
            FROM address_books b
            WHERE b.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// Renames a book, returning None if it does not exist
    pub async fn rename<'e, E>(executor: E, id: Uuid, name: &str) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, AddressBook>(
            r#"
            UPDATE address_books SET name = $2
            WHERE id = $1
            RETURNING id, user_id, name, created_at
            "#,
        )
        .bind(id)
        .bind(name)
        .fetch_optional(executor)
        .await
    }

    /// Deletes a book with its contacts, groups and edges
    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM address_books WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Whether `user_id` owns this book
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }
}
