//! Authenticated session context.
//!
//! # Responsibility
//! - Carry the bearer token and account identity for one logged-in user.
//! - Replace ambient credential lookups with an explicit value passed to the
//!   coordinator and into every store call.
//!
//! # Invariants
//! - A session is created by a successful login and dropped on logout.
//! - `Debug` output never contains the token.

use serde::Deserialize;
use std::fmt::{Debug, Formatter};

/// Account profile returned alongside a login token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AccountInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
}

/// Credential and identity for one logged-in user.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    token: String,
    account: AccountInfo,
}

impl Session {
    pub fn new(token: impl Into<String>, account: AccountInfo) -> Self {
        Self {
            token: token.into(),
            account,
        }
    }

    /// Builds a session from a bare token, e.g. one supplied on the command line.
    pub fn from_token(token: impl Into<String>) -> Self {
        Self::new(token, AccountInfo::default())
    }

    pub fn token(&self) -> &str {
        self.token.as_str()
    }

    pub fn account(&self) -> &AccountInfo {
        &self.account
    }

    /// Returns whether this session can authenticate requests at all.
    pub fn is_authenticated(&self) -> bool {
        !self.token.trim().is_empty()
    }
}

impl Debug for Session {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("account", &self.account)
            .finish()
    }
}
