//! User storage abstraction.
//!
//! The trait is synchronous: lookups are in-memory map reads, and the
//! authenticator calls them from async code without holding a lock across an
//! await point.

mod memory;

pub use memory::MemoryUserStore;
use thiserror::Error;

/// A user account as held by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUser {
    /// Store-assigned id, unique and never reused
    pub id: u64,
    /// Login name (left of `@`), matched case-sensitively
    pub localpart: String,
    /// Lowercase hex SHA-256 of the password
    pub password_hash: String,
}

/// Errors from user storage.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// A user with this localpart already exists
    #[error("user already exists: {0}")]
    AlreadyExists(String),

    /// A thread panicked while holding the store lock
    #[error("user store lock poisoned")]
    Poisoned,
}

/// Storage for user accounts.
///
/// Must be Clone (the authenticator and the config loader share one store),
/// Send + Sync (connection tasks run on many threads), and synchronous.
/// Implementations share internal state via Arc, so clones see the same
/// users.
pub trait UserStore: Clone + Send + Sync + 'static {
    /// Look up a user by exact localpart.
    ///
    /// Returns `None` if no such user exists.
    fn find_by_localpart(&self, localpart: &str) -> Result<Option<StoredUser>, StorageError>;

    /// Create a user.
    ///
    /// # Errors
    ///
    /// `StorageError::AlreadyExists` if the localpart is taken.
    fn create(&self, localpart: &str, password_hash: &str) -> Result<StoredUser, StorageError>;

    /// Create a user with a fixed id, as loaded from configuration.
    ///
    /// Later automatically assigned ids are greater than `id`.
    ///
    /// # Errors
    ///
    /// `StorageError::AlreadyExists` if the localpart is taken.
    fn insert_with_id(
        &self,
        id: u64,
        localpart: &str,
        password_hash: &str,
    ) -> Result<StoredUser, StorageError>;

    /// Number of stored users.
    fn len(&self) -> Result<usize, StorageError>;

    /// Whether the store holds no users.
    fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }
}
