//! Authentication collaborator.
//!
//! Command handlers only see the [`Authenticator`] trait. The password check
//! (hashing, comparison) lives behind it, so handlers never touch password
//! hashes.

use std::future::Future;

use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::storage::{StorageError, StoredUser, UserStore};

/// An authenticated user, as seen by command handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    /// Store-assigned user id
    pub id: u64,
    /// Login name (left of `@`)
    pub localpart: String,
}

impl From<StoredUser> for UserRecord {
    fn from(user: StoredUser) -> Self {
        Self { id: user.id, localpart: user.localpart }
    }
}

/// Errors from the authentication collaborator.
///
/// Bad credentials are not an error: [`Authenticator::login`] returns
/// `Ok(None)` for them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Backing store failed
    #[error("user store error: {0}")]
    Storage(#[from] StorageError),
}

/// Verifies credentials.
pub trait Authenticator: Send + Sync + 'static {
    /// Check `password` for `localpart`.
    ///
    /// Returns `None` if the user does not exist or the password is wrong;
    /// the caller cannot tell which.
    fn login(
        &self,
        localpart: &str,
        password: &str,
    ) -> impl Future<Output = Result<Option<UserRecord>, AuthError>> + Send;
}

/// Lowercase hex SHA-256 of `password`.
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// Password authenticator over a [`UserStore`].
#[derive(Debug, Clone)]
pub struct PasswordAuthenticator<S: UserStore> {
    store: S,
}

impl<S: UserStore> PasswordAuthenticator<S> {
    /// Create an authenticator over `store`.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Create a user with a hashed password.
    ///
    /// # Errors
    ///
    /// `AuthError::Storage` wrapping `StorageError::AlreadyExists` if the
    /// localpart is taken.
    pub fn register(&self, localpart: &str, password: &str) -> Result<UserRecord, AuthError> {
        let user = self.store.create(localpart, &hash_password(password))?;
        Ok(user.into())
    }

    fn verify(&self, localpart: &str, password: &str) -> Result<Option<UserRecord>, AuthError> {
        let Some(user) = self.store.find_by_localpart(localpart)? else {
            return Ok(None);
        };

        let matches = user.password_hash.eq_ignore_ascii_case(&hash_password(password));
        Ok(matches.then(|| user.into()))
    }
}

impl<S: UserStore> Authenticator for PasswordAuthenticator<S> {
    fn login(
        &self,
        localpart: &str,
        password: &str,
    ) -> impl Future<Output = Result<Option<UserRecord>, AuthError>> + Send {
        let result = self.verify(localpart, password);
        async move { result }
    }
}
