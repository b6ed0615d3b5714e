//! Fixed-table credential check.
//!
//! A small in-memory username/password/role lookup. It exists to return
//! a role label to the frontend; the service itself does not enforce
//! authorization on any route.

use std::collections::HashMap;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::User => write!(f, "user"),
        }
    }
}

/// Outcome of a credential check. `NotFound` and `WrongPassword` are
/// deliberately distinct; the login response collapses them into
/// human-readable messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialCheck {
    Verified(Role),
    NotFound,
    WrongPassword,
}

struct UserEntry {
    password: String,
    role: Role,
}

/// Non-persistent user table.
pub struct UserDirectory {
    entries: HashMap<String, UserEntry>,
}

impl UserDirectory {
    /// The stock accounts: one admin (may replace the dataset) and one
    /// regular user (may query it).
    pub fn with_defaults() -> Self {
        let mut entries = HashMap::new();
        entries.insert(
            "admin".to_string(),
            UserEntry {
                password: "admin123".to_string(),
                role: Role::Admin,
            },
        );
        entries.insert(
            "user".to_string(),
            UserEntry {
                password: "user123".to_string(),
                role: Role::User,
            },
        );
        Self { entries }
    }

    pub fn verify(&self, username: &str, password: &str) -> CredentialCheck {
        match self.entries.get(username) {
            None => CredentialCheck::NotFound,
            Some(entry) if entry.password != password => CredentialCheck::WrongPassword,
            Some(entry) => CredentialCheck::Verified(entry.role),
        }
    }
}

impl Default for UserDirectory {
    fn default() -> Self {
        Self::with_defaults()
    }
}
