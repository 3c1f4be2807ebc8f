/// Authentication and authorization utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing
/// - [`jwt`]: access/refresh token issue and validation
/// - [`middleware`]: Bearer-token parsing into the per-request [`middleware::AuthContext`]
/// - [`authorization`]: ownership checks for books, contacts and groups

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
