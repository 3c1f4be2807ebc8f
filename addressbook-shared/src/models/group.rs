/// Group model and database operations
///
/// A group is a named label inside one address book. Only contacts from the
/// same book may be members; see [`crate::membership`].
///
/// # Schema
///
/// ```sql
/// CREATE TABLE groups (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     address_book_id UUID NOT NULL REFERENCES address_books(id) ON DELETE CASCADE,
///     name VARCHAR(50) NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT groups_id_book_key UNIQUE (id, address_book_id)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

use super::contact::Contact;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Group {
    pub id: Uuid,

    /// Owning address book
    pub address_book_id: Uuid,

    pub name: String,

    pub created_at: DateTime<Utc>,
}

/// Group with its member count, for list views
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct GroupSummary {
    pub id: Uuid,
    pub address_book_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub member_count: i64,
}

impl Group {
    pub async fn create<'e, E>(
        executor: E,
        address_book_id: Uuid,
        name: &str,
    ) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Group>(
            r#"
            INSERT INTO groups (address_book_id, name)
            VALUES ($1, $2)
            RETURNING id, address_book_id, name, created_at
            "#,
        )
        .bind(address_book_id)
        .bind(name)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Group>(
            "SELECT id, address_book_id, name, created_at FROM groups WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// Finds a group only if its address book is owned by `user_id`
    pub async fn find_owned<'e, E>(
        executor: E,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Group>(
            r#"
            SELECT g.id, g.address_book_id, g.name, g.created_at
            FROM groups g
            JOIN address_books b ON b.id = g.address_book_id
            WHERE g.id = $1 AND b.user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(executor)
        .await
    }

    /// Fetches every group whose id is in `ids`; missing ids are simply absent
    pub async fn find_many<'e, E>(executor: E, ids: &[Uuid]) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Group>(
            "SELECT id, address_book_id, name, created_at FROM groups WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(executor)
        .await
    }

    /// Lists the groups of a book by name with member counts
    pub async fn list_by_book<'e, E>(
        executor: E,
        address_book_id: Uuid,
    ) -> Result<Vec<GroupSummary>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, GroupSummary>(
            r#"
            SELECT g.id, g.address_book_id, g.name, g.created_at,
                   COUNT(cg.contact_id) AS member_count
            FROM groups g
            LEFT JOIN contact_groups cg ON cg.group_id = g.id
            WHERE g.address_book_id = $1
            GROUP BY g.id
            ORDER BY g.name ASC, g.id ASC
            "#,
        )
        .bind(address_book_id)
        .fetch_all(executor)
        .await
    }

    /// Contacts that belong to this group, by name
    pub async fn members<'e, E>(executor: E, group_id: Uuid) -> Result<Vec<Contact>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Contact>(
            r#"
            SELECT c.id, c.address_book_id, c.name, c.email, c.phone, c.address, c.notes,
                   c.created_at, c.updated_at
            FROM contacts c
            JOIN contact_groups cg ON cg.contact_id = c.id
            WHERE cg.group_id = $1
            ORDER BY c.name ASC, c.id ASC
            "#,
        )
        .bind(group_id)
        .fetch_all(executor)
        .await
    }

    /// Renames a group, returning None if it does not exist
    pub async fn rename<'e, E>(executor: E, id: Uuid, name: &str) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Group>(
            r#"
            UPDATE groups SET name = $2
            WHERE id = $1
            RETURNING id, address_book_id, name, created_at
            "#,
        )
        .bind(id)
        .bind(name)
        .fetch_optional(executor)
        .await
    }

    /// Deletes a group; member contacts are untouched
    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM groups WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
