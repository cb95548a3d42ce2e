//! Persistence port for user accounts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pagination::PageRequest;

use crate::domain::user::{User, UserId, Username};

/// Failures surfaced by user persistence adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UserPersistenceError {
    /// The backing store could not be reached.
    #[error("user store unavailable: {message}")]
    Connection {
        /// Adapter-provided context.
        message: String,
    },
    /// A query failed.
    #[error("user store error: {message}")]
    Query {
        /// Adapter-provided context.
        message: String,
    },
    /// The username is already taken.
    #[error("username already taken")]
    DuplicateUsername,
}

impl UserPersistenceError {
    /// Create a connection error with the given message.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create a query error with the given message.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }
}

/// Persistence port for user accounts.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new account. Fails with
    /// [`UserPersistenceError::DuplicateUsername`] on a username collision.
    async fn insert(&self, user: &User) -> Result<(), UserPersistenceError>;

    /// Persist changes to an existing account.
    async fn update(&self, user: &User) -> Result<(), UserPersistenceError>;

    /// Fetch an account by id.
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserPersistenceError>;

    /// Fetch an account by username.
    async fn find_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<User>, UserPersistenceError>;

    /// List accounts ordered by creation time, newest first, with the total
    /// count across all pages.
    async fn list(&self, page: PageRequest) -> Result<(Vec<User>, u64), UserPersistenceError>;

    /// List accounts whose paid subscription period ended at or before `now`
    /// and whose status has not yet been flipped to expired.
    async fn list_subscriptions_due(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<User>, UserPersistenceError>;
}

/// In-memory [`UserRepository`] used by tests and database-less runs.
#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    users: std::sync::RwLock<Vec<User>>,
}

impl InMemoryUserRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a repository pre-seeded with accounts.
    pub fn with_users(users: Vec<User>) -> Self {
        Self {
            users: std::sync::RwLock::new(users),
        }
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Vec<User>>, UserPersistenceError> {
        self.users
            .read()
            .map_err(|_| UserPersistenceError::query("user store lock poisoned"))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Vec<User>>, UserPersistenceError> {
        self.users
            .write()
            .map_err(|_| UserPersistenceError::query("user store lock poisoned"))
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn insert(&self, user: &User) -> Result<(), UserPersistenceError> {
        let mut users = self.write()?;
        if users.iter().any(|u| u.username() == user.username()) {
            return Err(UserPersistenceError::DuplicateUsername);
        }
        users.push(user.clone());
        Ok(())
    }

    async fn update(&self, user: &User) -> Result<(), UserPersistenceError> {
        let mut users = self.write()?;
        match users.iter_mut().find(|u| u.id() == user.id()) {
            Some(existing) => {
                *existing = user.clone();
                Ok(())
            }
            None => Err(UserPersistenceError::query("user not found")),
        }
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserPersistenceError> {
        Ok(self.read()?.iter().find(|u| u.id() == id).cloned())
    }

    async fn find_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<User>, UserPersistenceError> {
        Ok(self
            .read()?
            .iter()
            .find(|u| u.username() == username)
            .cloned())
    }

    async fn list(&self, page: PageRequest) -> Result<(Vec<User>, u64), UserPersistenceError> {
        let users = self.read()?;
        let mut ordered: Vec<User> = users.clone();
        ordered.sort_by_key(|u| std::cmp::Reverse(u.created_at()));
        let total = ordered.len() as u64;
        let items = ordered
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(page.limit() as usize)
            .collect();
        Ok((items, total))
    }

    async fn list_subscriptions_due(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<User>, UserPersistenceError> {
        let users = self.read()?;
        Ok(users
            .iter()
            .filter(|u| {
                let mut subscription = u.subscription().clone();
                subscription.expire_if_due(now)
            })
            .take(limit as usize)
            .cloned()
            .collect())
    }
}
