use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use super::{StorageError, StoredUser, UserStore};

/// In-memory user store.
///
/// All state sits behind one `Arc<Mutex<>>`, so clones share it. A poisoned
/// lock surfaces as `StorageError::Poisoned` rather than a panic.
#[derive(Clone, Default)]
pub struct MemoryUserStore {
    inner: Arc<Mutex<MemoryUserStoreInner>>,
}

#[derive(Default)]
struct MemoryUserStoreInner {
    /// Localpart → user
    users: HashMap<String, StoredUser>,

    /// Id handed to the next `create`
    next_id: u64,
}

impl MemoryUserStore {
    /// Create an empty store. The first created user gets id 1.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryUserStoreInner { users: HashMap::new(), next_id: 1 })),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryUserStoreInner>, StorageError> {
        self.inner.lock().map_err(|_| StorageError::Poisoned)
    }
}

impl MemoryUserStoreInner {
    fn insert(
        &mut self,
        id: u64,
        localpart: &str,
        password_hash: &str,
    ) -> Result<StoredUser, StorageError> {
        if self.users.contains_key(localpart) {
            return Err(StorageError::AlreadyExists(localpart.to_string()));
        }

        let user = StoredUser {
            id,
            localpart: localpart.to_string(),
            password_hash: password_hash.to_string(),
        };
        self.users.insert(user.localpart.clone(), user.clone());
        self.next_id = self.next_id.max(id.saturating_add(1));

        Ok(user)
    }
}

impl std::fmt::Debug for MemoryUserStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let users = self.len().ok();
        f.debug_struct("MemoryUserStore").field("users", &users).finish()
    }
}

impl UserStore for MemoryUserStore {
    fn find_by_localpart(&self, localpart: &str) -> Result<Option<StoredUser>, StorageError> {
        Ok(self.lock()?.users.get(localpart).cloned())
    }

    fn create(&self, localpart: &str, password_hash: &str) -> Result<StoredUser, StorageError> {
        let mut inner = self.lock()?;
        let id = inner.next_id.max(1);
        inner.insert(id, localpart, password_hash)
    }

    fn insert_with_id(
        &self,
        id: u64,
        localpart: &str,
        password_hash: &str,
    ) -> Result<StoredUser, StorageError> {
        self.lock()?.insert(id, localpart, password_hash)
    }

    fn len(&self) -> Result<usize, StorageError> {
        Ok(self.lock()?.users.len())
    }
}
