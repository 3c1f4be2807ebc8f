/// Database models for the address book service
///
/// Each model owns its SQL. Functions are generic over `PgExecutor` so they
/// run against the pool or inside a caller's transaction.
///
/// # Models
///
/// - `user`: accounts and credentials
/// - `address_book`: named containers owned by a user
/// - `contact`: people inside an address book
/// - `group`: labels inside an address book
///
/// Contact/group membership edges are written by [`crate::membership`].

pub mod address_book;
pub mod contact;
pub mod group;
pub mod user;
