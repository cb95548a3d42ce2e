//! Persistence port for journalist applications.

use async_trait::async_trait;
use pagination::PageRequest;

use crate::domain::journalist::{ApplicationId, ApplicationStatus, JournalistApplication};
use crate::domain::user::UserId;

/// Failures surfaced by application persistence adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApplicationPersistenceError {
    /// The backing store could not be reached.
    #[error("application store unavailable: {message}")]
    Connection {
        /// Adapter-provided context.
        message: String,
    },
    /// A query failed.
    #[error("application store error: {message}")]
    Query {
        /// Adapter-provided context.
        message: String,
    },
}

impl ApplicationPersistenceError {
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

/// Persistence port for journalist applications.
#[async_trait]
pub trait ApplicationRepository: Send + Sync {
    /// Insert a new application.
    async fn insert(
        &self,
        application: &JournalistApplication,
    ) -> Result<(), ApplicationPersistenceError>;

    /// Persist changes to an existing application.
    async fn update(
        &self,
        application: &JournalistApplication,
    ) -> Result<(), ApplicationPersistenceError>;

    /// Fetch an application by id.
    async fn find_by_id(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<JournalistApplication>, ApplicationPersistenceError>;

    /// The applicant's pending application, if one exists.
    async fn find_pending_by_applicant(
        &self,
        applicant: &UserId,
    ) -> Result<Option<JournalistApplication>, ApplicationPersistenceError>;

    /// One applicant's applications, newest first.
    async fn list_by_applicant(
        &self,
        applicant: &UserId,
    ) -> Result<Vec<JournalistApplication>, ApplicationPersistenceError>;

    /// Applications in a given status, oldest first, with the total count.
    async fn list_by_status(
        &self,
        status: ApplicationStatus,
        page: PageRequest,
    ) -> Result<(Vec<JournalistApplication>, u64), ApplicationPersistenceError>;
}

/// In-memory [`ApplicationRepository`] used by tests and database-less runs.
#[derive(Debug, Default)]
pub struct InMemoryApplicationRepository {
    applications: std::sync::RwLock<Vec<JournalistApplication>>,
}

impl InMemoryApplicationRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(
        &self,
    ) -> Result<
        std::sync::RwLockReadGuard<'_, Vec<JournalistApplication>>,
        ApplicationPersistenceError,
    > {
        self.applications
            .read()
            .map_err(|_| ApplicationPersistenceError::query("application store lock poisoned"))
    }

    fn write(
        &self,
    ) -> Result<
        std::sync::RwLockWriteGuard<'_, Vec<JournalistApplication>>,
        ApplicationPersistenceError,
    > {
        self.applications
            .write()
            .map_err(|_| ApplicationPersistenceError::query("application store lock poisoned"))
    }
}

#[async_trait]
impl ApplicationRepository for InMemoryApplicationRepository {
    async fn insert(
        &self,
        application: &JournalistApplication,
    ) -> Result<(), ApplicationPersistenceError> {
        self.write()?.push(application.clone());
        Ok(())
    }

    async fn update(
        &self,
        application: &JournalistApplication,
    ) -> Result<(), ApplicationPersistenceError> {
        let mut applications = self.write()?;
        match applications.iter_mut().find(|a| a.id() == application.id()) {
            Some(existing) => {
                *existing = application.clone();
                Ok(())
            }
            None => Err(ApplicationPersistenceError::query("application not found")),
        }
    }

    async fn find_by_id(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<JournalistApplication>, ApplicationPersistenceError> {
        Ok(self.read()?.iter().find(|a| a.id() == id).cloned())
    }

    async fn find_pending_by_applicant(
        &self,
        applicant: &UserId,
    ) -> Result<Option<JournalistApplication>, ApplicationPersistenceError> {
        Ok(self
            .read()?
            .iter()
            .find(|a| a.applicant() == applicant && a.status() == ApplicationStatus::Pending)
            .cloned())
    }

    async fn list_by_applicant(
        &self,
        applicant: &UserId,
    ) -> Result<Vec<JournalistApplication>, ApplicationPersistenceError> {
        let mut applications: Vec<JournalistApplication> = self
            .read()?
            .iter()
            .filter(|a| a.applicant() == applicant)
            .cloned()
            .collect();
        applications.sort_by_key(|a| std::cmp::Reverse(a.created_at()));
        Ok(applications)
    }

    async fn list_by_status(
        &self,
        status: ApplicationStatus,
        page: PageRequest,
    ) -> Result<(Vec<JournalistApplication>, u64), ApplicationPersistenceError> {
        let mut applications: Vec<JournalistApplication> = self
            .read()?
            .iter()
            .filter(|a| a.status() == status)
            .cloned()
            .collect();
        applications.sort_by_key(JournalistApplication::created_at);
        let total = applications.len() as u64;
        let items = applications
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(page.limit() as usize)
            .collect();
        Ok((items, total))
    }
}
