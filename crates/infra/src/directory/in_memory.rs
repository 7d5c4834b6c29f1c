use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use gatehouse_auth::{DirectoryError, Registration, Role, UserDirectory, UserRecord};

#[derive(Clone)]
struct StoredUser {
    password: String,
    role: Role,
}

/// In-memory user directory for tests/dev.
///
/// Passwords are held as submitted; use the Postgres directory for anything
/// that outlives the process. Keyed by normalized email, listed in email order.
#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<BTreeMap<String, StoredUser>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn poisoned() -> DirectoryError {
        DirectoryError::Unavailable("in-memory directory lock poisoned".to_string())
    }
}

impl core::fmt::Debug for InMemoryUserDirectory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InMemoryUserDirectory")
            .field("users", &self.len())
            .finish()
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn authenticate(&self, email: &str, password: &str) -> Result<String, DirectoryError> {
        let users = self.users.read().map_err(|_| Self::poisoned())?;
        let user = users.get(email).ok_or(DirectoryError::NotFound)?;
        if user.password != password {
            return Err(DirectoryError::InvalidCredentials);
        }
        Ok(email.to_string())
    }

    async fn fetch_role(&self, email: &str) -> Result<Role, DirectoryError> {
        let users = self.users.read().map_err(|_| Self::poisoned())?;
        users
            .get(email)
            .map(|u| u.role)
            .ok_or(DirectoryError::NotFound)
    }

    async fn is_duplicate_email(&self, email: &str) -> Result<bool, DirectoryError> {
        let users = self.users.read().map_err(|_| Self::poisoned())?;
        Ok(users.contains_key(email))
    }

    async fn is_duplicate_password(&self, password: &str) -> Result<bool, DirectoryError> {
        let users = self.users.read().map_err(|_| Self::poisoned())?;
        Ok(users.values().any(|u| u.password == password))
    }

    async fn insert_user(&self, registration: &Registration) -> Result<String, DirectoryError> {
        let mut users = self.users.write().map_err(|_| Self::poisoned())?;
        let email = registration.email.as_str().to_string();
        if users.contains_key(&email) {
            return Err(DirectoryError::Rejected("email is already exist".to_string()));
        }
        users.insert(
            email.clone(),
            StoredUser {
                password: registration.password.clone(),
                role: registration.role,
            },
        );
        Ok(email)
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>, DirectoryError> {
        let users = self.users.read().map_err(|_| Self::poisoned())?;
        Ok(users
            .iter()
            .map(|(email, u)| UserRecord {
                email: email.clone(),
                role: u.role,
            })
            .collect())
    }
}
