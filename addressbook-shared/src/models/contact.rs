/// Contact model and database operations
///
/// A contact belongs to exactly one address book and may be a member of any
/// number of groups from that same book. Membership edges are written through
/// [`crate::membership`], never directly from here.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE contacts (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     address_book_id UUID NOT NULL REFERENCES address_books(id) ON DELETE CASCADE,
///     name VARCHAR(100) NOT NULL,
///     email VARCHAR(100),
///     phone VARCHAR(20),
///     address VARCHAR(255),
///     notes TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT contacts_id_book_key UNIQUE (id, address_book_id)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, Postgres, QueryBuilder};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Contact {
    pub id: Uuid,

    /// Owning address book; authoritative for membership checks
    pub address_book_id: Uuid,

    pub name: String,

    pub email: Option<String>,

    pub phone: Option<String>,

    pub address: Option<String>,

    pub notes: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Contact plus the ids of the groups it belongs to
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ContactWithGroups {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub contact: Contact,

    pub group_ids: Vec<Uuid>,
}

/// Input for creating a contact
#[derive(Debug, Clone, Default)]
pub struct CreateContact {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

/// Partial update of contact fields
///
/// `None` leaves a field untouched. For optional columns `Some(None)` clears
/// the value.
#[derive(Debug, Clone, Default)]
pub struct UpdateContact {
    pub name: Option<String>,
    pub email: Option<Option<String>>,
    pub phone: Option<Option<String>>,
    pub address: Option<Option<String>>,
    pub notes: Option<Option<String>>,
}

impl UpdateContact {
    /// True when no field would change
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.address.is_none()
            && self.notes.is_none()
    }
}

const CONTACT_COLUMNS: &str =
    "id, address_book_id, name, email, phone, address, notes, created_at, updated_at";

impl Contact {
    /// Inserts a contact into `address_book_id`
    pub async fn create<'e, E>(
        executor: E,
        address_book_id: Uuid,
        data: CreateContact,
    ) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            r#"
            INSERT INTO contacts (address_book_id, name, email, phone, address, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {CONTACT_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Contact>(&query)
            .bind(address_book_id)
            .bind(data.name)
            .bind(data.email)
            .bind(data.phone)
            .bind(data.address)
            .bind(data.notes)
            .fetch_one(executor)
            .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = $1");

        sqlx::query_as::<_, Contact>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Finds a contact only if its address book is owned by `user_id`
    pub async fn find_owned<'e, E>(
        executor: E,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Contact>(
            r#"
            SELECT c.id, c.address_book_id, c.name, c.email, c.phone, c.address, c.notes,
                   c.created_at, c.updated_at
            FROM contacts c
            JOIN address_books b ON b.id = c.address_book_id
            WHERE c.id = $1 AND b.user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(executor)
        .await
    }

    /// Fetches every contact whose id is in `ids`; missing ids are simply absent
    pub async fn find_many<'e, E>(executor: E, ids: &[Uuid]) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = ANY($1)");

        sqlx::query_as::<_, Contact>(&query)
            .bind(ids)
            .fetch_all(executor)
            .await
    }

    /// Lists the contacts of a book by name, each with its group ids
    pub async fn list_by_book<'e, E>(
        executor: E,
        address_book_id: Uuid,
    ) -> Result<Vec<ContactWithGroups>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, ContactWithGroups>(
            r#"
            SELECT c.id, c.address_book_id, c.name, c.email, c.phone, c.address, c.notes,
                   c.created_at, c.updated_at,
                   COALESCE(
                       array_agg(cg.group_id ORDER BY cg.group_id)
                           FILTER (WHERE cg.group_id IS NOT NULL),
                       '{}'
                   ) AS group_ids
            FROM contacts c
            LEFT JOIN contact_groups cg ON cg.contact_id = c.id
            WHERE c.address_book_id = $1
            GROUP BY c.id
            ORDER BY c.name ASC, c.id ASC
            "#,
        )
        .bind(address_book_id)
        .fetch_all(executor)
        .await
    }

    /// Ids of the groups this contact belongs to
    pub async fn group_ids<'e, E>(executor: E, contact_id: Uuid) -> Result<Vec<Uuid>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_scalar(
            "SELECT group_id FROM contact_groups WHERE contact_id = $1 ORDER BY group_id",
        )
        .bind(contact_id)
        .fetch_all(executor)
        .await
    }

    /// Applies a partial update; returns None if the contact does not exist
    pub async fn update<'e, E>(
        executor: E,
        id: Uuid,
        data: UpdateContact,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let mut query = QueryBuilder::<Postgres>::new("UPDATE contacts SET updated_at = NOW()");

        if let Some(name) = data.name {
            query.push(", name = ").push_bind(name);
        }
        if let Some(email) = data.email {
            query.push(", email = ").push_bind(email);
        }
        if let Some(phone) = data.phone {
            query.push(", phone = ").push_bind(phone);
        }
        if let Some(address) = data.address {
            query.push(", address = ").push_bind(address);
        }
        if let Some(notes) = data.notes {
            query.push(", notes = ").push_bind(notes);
        }

        query
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" RETURNING ")
            .push(CONTACT_COLUMNS);

        query.build_query_as::<Contact>().fetch_optional(executor).await
    }

    /// Deletes a contact; its membership edges go with it
    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM contacts WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_contact_is_empty() {
        assert!(UpdateContact::default().is_empty());

        let clear_email = UpdateContact {
            email: Some(None),
            ..Default::default()
        };
        assert!(!clear_email.is_empty());
    }

    #[test]
    fn test_contact_with_groups_serializes_flat() {
        let group_id = Uuid::new_v4();
        let row = ContactWithGroups {
            contact: Contact {
                id: Uuid::new_v4(),
                address_book_id: Uuid::new_v4(),
                name: "Grace".to_string(),
                email: None,
                phone: Some("555-0100".to_string()),
                address: None,
                notes: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            group_ids: vec![group_id],
        };

        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["name"], "Grace");
        assert_eq!(json["group_ids"][0], group_id.to_string());
    }
}
