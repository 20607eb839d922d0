//! Operator authentication.
//!
//! Provides password hashing, JWT session tokens, and the principal type
//! carried by an authenticated request.

pub mod claims;
pub mod jwt;
pub mod password;
pub mod principal;

pub use claims::Claims;
pub use jwt::JwtManager;
pub use principal::{Principal, Role};
