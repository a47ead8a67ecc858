//! User accounts and session tokens.
//!
//! A [`User`] never carries its password: the raw value is handed to the
//! store once and hashed there, and the hash is never read back out. A
//! [`Token`] row is the server-side half of a session. The other half is a
//! signed bearer credential produced elsewhere from a [`SessionKey`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{TokenId, UserId};

/// A user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Store-assigned identifier.
    pub id: UserId,
    /// Unique login name.
    pub username: String,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
    /// When the account was last touched.
    pub updated_at: DateTime<Utc>,
}

/// A live (not revoked) session token row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Store-assigned identifier.
    pub id: TokenId,
    /// The account this session belongs to.
    pub user_id: UserId,
    /// When the session was issued.
    pub created_at: DateTime<Utc>,
}

impl Token {
    /// The pair a signing collaborator embeds into the bearer credential.
    pub const fn session_key(&self) -> SessionKey {
        SessionKey {
            token_id: self.id,
            user_id: self.user_id,
        }
    }
}

/// The `{token id, user id}` tuple identifying one session.
///
/// Validity is per token: revoking one session of a user leaves the others
/// untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    /// The token row.
    pub token_id: TokenId,
    /// The owner the token must belong to.
    pub user_id: UserId,
}
