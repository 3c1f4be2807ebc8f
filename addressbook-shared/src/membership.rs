/// Contact/group membership
///
/// A membership edge links a contact to a group. The one rule the service
/// enforces on edges is that both ends belong to the same address book:
///
/// ```text
/// contact.address_book_id == group.address_book_id
/// ```
///
/// Every edge write goes through this module. Requests are validated in the
/// order the ids were given and the whole request is rejected on the first
/// bad id. The write functions take a connection so callers run them inside a
/// transaction; an error returned here must abort that transaction, which
/// leaves the previous membership untouched.
///
/// The `contact_groups` table repeats the check with composite foreign keys,
/// so an edge that skipped this module would still be refused by Postgres.
///
/// # Example
///
/// ```no_run
/// use addressbook_shared::membership;
/// use addressbook_shared::models::contact::Contact;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, contact: Contact, groups: Vec<Uuid>) -> Result<(), Box<dyn std::error::Error>> {
/// let mut tx = pool.begin().await?;
/// let attached = membership::replace_groups(&mut tx, &contact, &groups).await?;
/// tx.commit().await?;
/// println!("contact is now in {} groups", attached.len());
/// # Ok(())
/// # }
/// ```

use std::collections::{HashMap, HashSet};

use sqlx::{PgConnection, PgExecutor};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{contact::Contact, group::Group};

/// Errors raised while validating or writing membership edges
#[derive(Debug, thiserror::Error)]
pub enum MembershipError {
    /// A requested group id does not exist
    #[error("Group {0} not found")]
    GroupNotFound(Uuid),

    /// A requested contact id does not exist
    #[error("Contact {0} not found")]
    ContactNotFound(Uuid),

    /// The referenced group or contact lives in another address book
    #[error("{0} belongs to a different address book")]
    CrossBookViolation(Uuid),

    /// Removal target is not a member of the group
    #[error("Contact {contact_id} is not a member of group {group_id}")]
    NotAMember { contact_id: Uuid, group_id: Uuid },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Anything that lives inside a single address book
pub trait BookScoped {
    fn id(&self) -> Uuid;
    fn address_book_id(&self) -> Uuid;
}

impl BookScoped for Group {
    fn id(&self) -> Uuid {
        self.id
    }

    fn address_book_id(&self) -> Uuid {
        self.address_book_id
    }
}

impl BookScoped for Contact {
    fn id(&self) -> Uuid {
        self.id
    }

    fn address_book_id(&self) -> Uuid {
        self.address_book_id
    }
}

/// Walks `requested` in order against the rows that were found
///
/// Returns the attachable ids with duplicates dropped, keeping first
/// occurrence order.
fn check_same_book<T, F>(
    address_book_id: Uuid,
    requested: &[Uuid],
    found: &[T],
    not_found: F,
) -> Result<Vec<Uuid>, MembershipError>
where
    T: BookScoped,
    F: Fn(Uuid) -> MembershipError,
{
    let by_id: HashMap<Uuid, &T> = found.iter().map(|row| (row.id(), row)).collect();
    let mut seen = HashSet::with_capacity(requested.len());
    let mut attachable = Vec::with_capacity(requested.len());

    for &id in requested {
        let row = by_id.get(&id).ok_or_else(|| not_found(id))?;

        if row.address_book_id() != address_book_id {
            return Err(MembershipError::CrossBookViolation(id));
        }

        if seen.insert(id) {
            attachable.push(id);
        }
    }

    Ok(attachable)
}

/// Checks that every requested group exists and belongs to `address_book_id`
///
/// `groups` holds whatever rows a lookup of `requested` returned.
pub fn validate_group_ids(
    address_book_id: Uuid,
    requested: &[Uuid],
    groups: &[Group],
) -> Result<Vec<Uuid>, MembershipError> {
    check_same_book(address_book_id, requested, groups, MembershipError::GroupNotFound)
}

/// Checks that every requested contact exists and belongs to `address_book_id`
pub fn validate_contact_ids(
    address_book_id: Uuid,
    requested: &[Uuid],
    contacts: &[Contact],
) -> Result<Vec<Uuid>, MembershipError> {
    check_same_book(address_book_id, requested, contacts, MembershipError::ContactNotFound)
}

async fn insert_edges(
    conn: &mut PgConnection,
    address_book_id: Uuid,
    contact_ids: &[Uuid],
    group_ids: &[Uuid],
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO contact_groups (contact_id, group_id, address_book_id)
        SELECT c, g, $3
        FROM UNNEST($1::uuid[]) AS c
        CROSS JOIN UNNEST($2::uuid[]) AS g
        ON CONFLICT (contact_id, group_id) DO NOTHING
        "#,
    )
    .bind(contact_ids)
    .bind(group_ids)
    .bind(address_book_id)
    .execute(conn)
    .await?;

    Ok(())
}

/// Validates `group_ids` against the contact's book and links them
///
/// The contact's own `address_book_id` is the authority; nothing from the
/// request is trusted for it. Returns the attached group ids.
pub async fn attach_groups(
    conn: &mut PgConnection,
    contact: &Contact,
    group_ids: &[Uuid],
) -> Result<Vec<Uuid>, MembershipError> {
    if group_ids.is_empty() {
        return Ok(Vec::new());
    }

    let groups = Group::find_many(&mut *conn, group_ids).await?;
    let attachable = validate_group_ids(contact.address_book_id, group_ids, &groups)
        .map_err(|e| {
            warn!(contact_id = %contact.id, error = %e, "Rejected group membership");
            e
        })?;

    insert_edges(conn, contact.address_book_id, &[contact.id], &attachable).await?;

    debug!(
        contact_id = %contact.id,
        groups = attachable.len(),
        "Attached contact to groups"
    );
    Ok(attachable)
}

/// Clears the contact's memberships, then attaches `group_ids`
///
/// An empty list leaves the contact in no groups.
pub async fn replace_groups(
    conn: &mut PgConnection,
    contact: &Contact,
    group_ids: &[Uuid],
) -> Result<Vec<Uuid>, MembershipError> {
    sqlx::query("DELETE FROM contact_groups WHERE contact_id = $1")
        .bind(contact.id)
        .execute(&mut *conn)
        .await?;

    attach_groups(conn, contact, group_ids).await
}

/// Validates `contact_ids` against the group's book and adds them as members
pub async fn add_members(
    conn: &mut PgConnection,
    group: &Group,
    contact_ids: &[Uuid],
) -> Result<Vec<Uuid>, MembershipError> {
    if contact_ids.is_empty() {
        return Ok(Vec::new());
    }

    let contacts = Contact::find_many(&mut *conn, contact_ids).await?;
    let attachable = validate_contact_ids(group.address_book_id, contact_ids, &contacts)
        .map_err(|e| {
            warn!(group_id = %group.id, error = %e, "Rejected group members");
            e
        })?;

    insert_edges(conn, group.address_book_id, &attachable, &[group.id]).await?;

    debug!(group_id = %group.id, members = attachable.len(), "Added group members");
    Ok(attachable)
}

/// Clears the group's members, then adds `contact_ids`
pub async fn replace_members(
    conn: &mut PgConnection,
    group: &Group,
    contact_ids: &[Uuid],
) -> Result<Vec<Uuid>, MembershipError> {
    sqlx::query("DELETE FROM contact_groups WHERE group_id = $1")
        .bind(group.id)
        .execute(&mut *conn)
        .await?;

    add_members(conn, group, contact_ids).await
}

/// Removes a single edge
pub async fn remove_member<'e, E>(
    executor: E,
    group_id: Uuid,
    contact_id: Uuid,
) -> Result<(), MembershipError>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM contact_groups WHERE group_id = $1 AND contact_id = $2")
        .bind(group_id)
        .bind(contact_id)
        .execute(executor)
        .await?;

    if result.rows_affected() == 0 {
        return Err(MembershipError::NotAMember {
            contact_id,
            group_id,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn group(address_book_id: Uuid) -> Group {
        Group {
            id: Uuid::new_v4(),
            address_book_id,
            name: "Friends".to_string(),
            created_at: Utc::now(),
        }
    }

    fn contact(address_book_id: Uuid) -> Contact {
        Contact {
            id: Uuid::new_v4(),
            address_book_id,
            name: "Linus".to_string(),
            email: None,
            phone: None,
            address: None,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_same_book_group_is_attachable() {
        let book = Uuid::new_v4();
        let a = group(book);

        let attached = validate_group_ids(book, &[a.id], &[a.clone()]).unwrap();
        assert_eq!(attached, vec![a.id]);
    }

    #[test]
    fn test_group_from_other_book_is_rejected() {
        let book_1 = Uuid::new_v4();
        let book_2 = Uuid::new_v4();
        let a = group(book_1);

        let err = validate_group_ids(book_2, &[a.id], &[a.clone()]).unwrap_err();
        assert!(matches!(err, MembershipError::CrossBookViolation(id) if id == a.id));
    }

    #[test]
    fn test_missing_group_is_not_found() {
        let book = Uuid::new_v4();
        let missing = Uuid::new_v4();

        let err = validate_group_ids(book, &[missing], &[]).unwrap_err();
        assert!(matches!(err, MembershipError::GroupNotFound(id) if id == missing));
    }

    #[test]
    fn test_one_bad_id_rejects_whole_request() {
        let book = Uuid::new_v4();
        let good_1 = group(book);
        let good_2 = group(book);
        let foreign = group(Uuid::new_v4());

        let requested = [good_1.id, foreign.id, good_2.id];
        let found = [good_1, foreign.clone(), good_2];

        let err = validate_group_ids(book, &requested, &found).unwrap_err();
        assert!(matches!(err, MembershipError::CrossBookViolation(id) if id == foreign.id));
    }

    #[test]
    fn test_first_failure_wins() {
        let book = Uuid::new_v4();
        let missing = Uuid::new_v4();
        let foreign = group(Uuid::new_v4());

        let err = validate_group_ids(book, &[missing, foreign.id], &[foreign.clone()]).unwrap_err();
        assert!(matches!(err, MembershipError::GroupNotFound(id) if id == missing));

        let err = validate_group_ids(book, &[foreign.id, missing], &[foreign.clone()]).unwrap_err();
        assert!(matches!(err, MembershipError::CrossBookViolation(id) if id == foreign.id));
    }

    #[test]
    fn test_duplicates_attached_once_in_order() {
        let book = Uuid::new_v4();
        let a = group(book);
        let b = group(book);

        let attached =
            validate_group_ids(book, &[b.id, a.id, b.id], &[a.clone(), b.clone()]).unwrap();
        assert_eq!(attached, vec![b.id, a.id]);
    }

    #[test]
    fn test_empty_request_is_valid() {
        let attached = validate_group_ids(Uuid::new_v4(), &[], &[]).unwrap();
        assert!(attached.is_empty());
    }

    #[test]
    fn test_contact_from_other_book_is_rejected() {
        let book_1 = Uuid::new_v4();
        let x = contact(Uuid::new_v4());
        let y = contact(book_1);

        let err = validate_contact_ids(book_1, &[y.id, x.id], &[x.clone(), y]).unwrap_err();
        assert!(matches!(err, MembershipError::CrossBookViolation(id) if id == x.id));
    }

    #[test]
    fn test_missing_contact_is_not_found() {
        let book = Uuid::new_v4();
        let missing = Uuid::new_v4();

        let err = validate_contact_ids(book, &[missing], &[]).unwrap_err();
        assert!(matches!(err, MembershipError::ContactNotFound(id) if id == missing));
    }

    #[test]
    fn test_error_messages() {
        let id = Uuid::nil();
        assert_eq!(
            MembershipError::GroupNotFound(id).to_string(),
            format!("Group {} not found", id)
        );
        assert_eq!(
            MembershipError::CrossBookViolation(id).to_string(),
            format!("{} belongs to a different address book", id)
        );
    }
}
