use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RepositoryError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
}

impl User {
    pub fn new(id: Uuid, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
        }
    }
}

/// Storage used by the user command handlers and queries.
pub trait UserRepository: Send + Sync + 'static {
    fn get(&self, id: Uuid) -> Result<Option<User>, RepositoryError>;

    fn get_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;

    /// Insert a new user. Fails with `AlreadyExists` if the id or e-mail is taken.
    fn add(&self, user: User) -> Result<(), RepositoryError>;

    /// Replace an existing user. Fails with `NotFound` if absent and with
    /// `AlreadyExists` if the new e-mail belongs to someone else.
    fn save(&self, user: User) -> Result<(), RepositoryError>;

    fn count(&self) -> Result<usize, RepositoryError>;

    /// Users in insertion order, skipping `offset` and returning at most `limit`.
    fn find_all(&self, limit: usize, offset: usize) -> Result<Vec<User>, RepositoryError>;
}

#[derive(Default)]
struct Storage {
    users: HashMap<Uuid, User>,
    order: Vec<Uuid>,
}

impl Storage {
    fn email_taken_by_other(&self, email: &str, id: Uuid) -> bool {
        self.users
            .values()
            .any(|u| u.id != id && u.email.eq_ignore_ascii_case(email))
    }
}

/// Thread-safe in-memory repository. Clones share the same storage.
#[derive(Clone, Default)]
pub struct InMemoryUserRepository {
    storage: Arc<RwLock<Storage>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserRepository for InMemoryUserRepository {
    fn get(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        let storage = self
            .storage
            .read()
            .map_err(|_| RepositoryError::LockPoisoned("read"))?;
        Ok(storage.users.get(&id).cloned())
    }

    fn get_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let storage = self
            .storage
            .read()
            .map_err(|_| RepositoryError::LockPoisoned("read"))?;
        Ok(storage
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    fn add(&self, user: User) -> Result<(), RepositoryError> {
        let mut storage = self
            .storage
            .write()
            .map_err(|_| RepositoryError::LockPoisoned("write"))?;
        if storage.users.contains_key(&user.id) {
            return Err(RepositoryError::AlreadyExists(user.id.to_string()));
        }
        if storage.email_taken_by_other(&user.email, user.id) {
            return Err(RepositoryError::AlreadyExists(user.email));
        }
        storage.order.push(user.id);
        storage.users.insert(user.id, user);
        Ok(())
    }

    fn save(&self, user: User) -> Result<(), RepositoryError> {
        let mut storage = self
            .storage
            .write()
            .map_err(|_| RepositoryError::LockPoisoned("write"))?;
        if !storage.users.contains_key(&user.id) {
            return Err(RepositoryError::NotFound(user.id.to_string()));
        }
        if storage.email_taken_by_other(&user.email, user.id) {
            return Err(RepositoryError::AlreadyExists(user.email));
        }
        storage.users.insert(user.id, user);
        Ok(())
    }

    fn count(&self) -> Result<usize, RepositoryError> {
        let storage = self
            .storage
            .read()
            .map_err(|_| RepositoryError::LockPoisoned("read"))?;
        Ok(storage.users.len())
    }

    fn find_all(&self, limit: usize, offset: usize) -> Result<Vec<User>, RepositoryError> {
        let storage = self
            .storage
            .read()
            .map_err(|_| RepositoryError::LockPoisoned("read"))?;
        Ok(storage
            .order
            .iter()
            .skip(offset)
            .take(limit)
            .filter_map(|id| storage.users.get(id).cloned())
            .collect())
    }
}
