//! User directory contract.
//!
//! The directory owns user records; this crate only reads them. Adapters
//! live in `gatehouse-infra`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Registration, Role};

/// A user as exposed by the directory (read-only to the gateway).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// Email known but the password does not match.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("user not found")]
    NotFound,

    /// The directory refused a write (e.g. constraint violation).
    #[error("{0}")]
    Rejected(String),

    /// Backend failure (connection, query, corrupt data).
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

/// Operations the gateway needs from the external user directory.
///
/// Implementations must not block the async runtime.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Check credentials; returns the canonical email on success.
    async fn authenticate(&self, email: &str, password: &str) -> Result<String, DirectoryError>;

    async fn fetch_role(&self, email: &str) -> Result<Role, DirectoryError>;

    async fn is_duplicate_email(&self, email: &str) -> Result<bool, DirectoryError>;

    /// Whether another account already uses this password.
    ///
    /// Persistent backends compare against stored hashes, never raw values.
    async fn is_duplicate_password(&self, password: &str) -> Result<bool, DirectoryError>;

    /// Persist a new user; returns the stored email.
    async fn insert_user(&self, registration: &Registration) -> Result<String, DirectoryError>;

    async fn list_users(&self) -> Result<Vec<UserRecord>, DirectoryError>;
}
