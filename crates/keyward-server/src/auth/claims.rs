//! JWT claims structure for Keyward sessions.

use serde::{Deserialize, Serialize};

use super::principal::{Principal, Role};

/// JWT claims embedded in session tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// JWT ID (unique per token).
    pub jti: String,
    /// Subject (admin or reseller ID).
    pub sub: i64,
    /// Username at the time the token was issued.
    pub username: String,
    pub role: Role,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiration (unix timestamp).
    pub exp: i64,
}

impl Claims {
    pub fn principal(&self) -> Principal {
        Principal {
            id: self.sub,
            username: self.username.clone(),
            role: self.role,
        }
    }
}
