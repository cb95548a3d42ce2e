//! Journalist application use-cases: applying, and the admin decision flow.

use std::sync::Arc;

use chrono::Utc;
use pagination::{Page, PageRequest};
use url::Url;

use crate::domain::account_service::require_admin;
use crate::domain::error::Error;
use crate::domain::journalist::{
    ApplicationId, ApplicationStatus, JournalistApplication, Statement,
};
use crate::domain::ports::{
    ApplicationPersistenceError, ApplicationRepository, UserPersistenceError, UserRepository,
};
use crate::domain::user::{Role, User};

/// Map application persistence errors to domain errors.
fn map_application_error(error: ApplicationPersistenceError) -> Error {
    match error {
        ApplicationPersistenceError::Connection { message } => {
            Error::service_unavailable(message)
        }
        ApplicationPersistenceError::Query { message } => Error::internal(message),
    }
}

fn map_user_error(error: UserPersistenceError) -> Error {
    match error {
        UserPersistenceError::Connection { message } => Error::service_unavailable(message),
        UserPersistenceError::Query { message } => Error::internal(message),
        UserPersistenceError::DuplicateUsername => {
            Error::internal("unexpected duplicate username")
        }
    }
}

/// Journalist application use-cases.
#[derive(Clone)]
pub struct JournalistService {
    applications: Arc<dyn ApplicationRepository>,
    users: Arc<dyn UserRepository>,
}

impl JournalistService {
    /// Create a service over the given repositories.
    pub fn new(
        applications: Arc<dyn ApplicationRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            applications,
            users,
        }
    }

    /// Apply to become a journalist.
    ///
    /// Only public-role users may apply, and only one pending application per
    /// user may exist at a time.
    pub async fn apply(
        &self,
        applicant: &User,
        statement: Statement,
        portfolio_url: Option<Url>,
    ) -> Result<JournalistApplication, Error> {
        if applicant.role() != Role::Public {
            return Err(Error::conflict("account already has an authoring role"));
        }
        if self
            .applications
            .find_pending_by_applicant(applicant.id())
            .await
            .map_err(map_application_error)?
            .is_some()
        {
            return Err(Error::conflict("an application is already pending"));
        }
        let application = JournalistApplication::open(
            ApplicationId::random(),
            *applicant.id(),
            statement,
            portfolio_url,
            Utc::now(),
        );
        self.applications
            .insert(&application)
            .await
            .map_err(map_application_error)?;
        Ok(application)
    }

    /// The applicant's own application history, newest first.
    pub async fn my_applications(
        &self,
        applicant: &User,
    ) -> Result<Vec<JournalistApplication>, Error> {
        self.applications
            .list_by_applicant(applicant.id())
            .await
            .map_err(map_application_error)
    }

    /// Admin: pending applications in arrival order.
    pub async fn pending_queue(
        &self,
        admin: &User,
        page: PageRequest,
    ) -> Result<Page<JournalistApplication>, Error> {
        require_admin(admin)?;
        let (items, total) = self
            .applications
            .list_by_status(ApplicationStatus::Pending, page)
            .await
            .map_err(map_application_error)?;
        Ok(Page::new(items, page, total))
    }

    async fn load(&self, id: &ApplicationId) -> Result<JournalistApplication, Error> {
        self.applications
            .find_by_id(id)
            .await
            .map_err(map_application_error)?
            .ok_or_else(|| Error::not_found("application not found"))
    }

    /// Admin: approve an application and promote the applicant.
    pub async fn approve(
        &self,
        admin: &User,
        id: &ApplicationId,
    ) -> Result<JournalistApplication, Error> {
        require_admin(admin)?;
        let mut application = self.load(id).await?;
        application
            .approve(*admin.id(), Utc::now())
            .map_err(|err| Error::conflict(err.to_string()))?;

        let mut applicant = self
            .users
            .find_by_id(application.applicant())
            .await
            .map_err(map_user_error)?
            .ok_or_else(|| Error::not_found("applicant account no longer exists"))?;
        applicant.set_role(Role::Journalist);
        self.users
            .update(&applicant)
            .await
            .map_err(map_user_error)?;

        self.applications
            .update(&application)
            .await
            .map_err(map_application_error)?;
        Ok(application)
    }

    /// Admin: decline an application.
    pub async fn reject(
        &self,
        admin: &User,
        id: &ApplicationId,
    ) -> Result<JournalistApplication, Error> {
        require_admin(admin)?;
        let mut application = self.load(id).await?;
        application
            .reject(*admin.id(), Utc::now())
            .map_err(|err| Error::conflict(err.to_string()))?;
        self.applications
            .update(&application)
            .await
            .map_err(map_application_error)?;
        Ok(application)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::ErrorCode;
    use crate::domain::ports::{InMemoryApplicationRepository, InMemoryUserRepository};
    use crate::domain::user::{DisplayName, NewUser, UserId, Username};

    fn user(username: &str, role: Role) -> User {
        User::new(
            NewUser {
                id: UserId::random(),
                username: Username::new(username).expect("valid username"),
                display_name: DisplayName::new("Some One").expect("valid display name"),
                role,
                password_hash: "$argon2id$stub".to_owned(),
            },
            Utc::now(),
        )
    }

    fn statement() -> Statement {
        Statement::new("I cover Pi markets.").expect("valid statement")
    }

    async fn service_with_user(user: &User) -> (JournalistService, Arc<InMemoryUserRepository>) {
        let users = Arc::new(InMemoryUserRepository::new());
        users.insert(user).await.expect("seed user");
        (
            JournalistService::new(Arc::new(InMemoryApplicationRepository::new()), users.clone()),
            users,
        )
    }

    #[tokio::test]
    async fn approval_promotes_the_applicant() {
        let applicant = user("applicant", Role::Public);
        let admin = user("the_admin", Role::Admin);
        let (service, users) = service_with_user(&applicant).await;

        let application = service
            .apply(&applicant, statement(), None)
            .await
            .expect("application opens");
        let decided = service
            .approve(&admin, application.id())
            .await
            .expect("admin approves");
        assert_eq!(decided.status(), ApplicationStatus::Approved);

        let promoted = users
            .find_by_id(applicant.id())
            .await
            .expect("query")
            .expect("user present");
        assert_eq!(promoted.role(), Role::Journalist);
    }

    #[tokio::test]
    async fn only_one_pending_application_per_user() {
        let applicant = user("applicant", Role::Public);
        let (service, _) = service_with_user(&applicant).await;

        service
            .apply(&applicant, statement(), None)
            .await
            .expect("first application opens");
        let error = service
            .apply(&applicant, statement(), None)
            .await
            .expect_err("second application must fail");
        assert_eq!(error.code(), ErrorCode::Conflict);
    }

    #[tokio::test]
    async fn journalists_cannot_reapply() {
        let journalist = user("author", Role::Journalist);
        let (service, _) = service_with_user(&journalist).await;

        let error = service
            .apply(&journalist, statement(), None)
            .await
            .expect_err("journalists cannot apply");
        assert_eq!(error.code(), ErrorCode::Conflict);
    }

    #[tokio::test]
    async fn decided_applications_conflict_on_redecision() {
        let applicant = user("applicant", Role::Public);
        let admin = user("the_admin", Role::Admin);
        let (service, _) = service_with_user(&applicant).await;

        let application = service
            .apply(&applicant, statement(), None)
            .await
            .expect("application opens");
        service
            .reject(&admin, application.id())
            .await
            .expect("admin rejects");

        let error = service
            .approve(&admin, application.id())
            .await
            .expect_err("redecision must fail");
        assert_eq!(error.code(), ErrorCode::Conflict);
    }

    #[tokio::test]
    async fn non_admins_cannot_see_the_queue() {
        let applicant = user("applicant", Role::Public);
        let (service, _) = service_with_user(&applicant).await;
        let error = service
            .pending_queue(&applicant, PageRequest::first())
            .await
            .expect_err("non-admin must fail");
        assert_eq!(error.code(), ErrorCode::Forbidden);
    }
}
