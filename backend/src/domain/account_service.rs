//! Account use-cases: registration, login, profile, subscription state, and
//! admin user management.

use std::sync::Arc;

use chrono::Utc;
use pagination::{Page, PageRequest};
use serde_json::json;

use crate::domain::auth::{self, LoginCredentials, Password};
use crate::domain::error::Error;
use crate::domain::ports::{UserPersistenceError, UserRepository};
use crate::domain::subscription::Subscription;
use crate::domain::user::{DisplayName, NewUser, Role, User, UserId, Username, WalletAddress};

/// Map user persistence errors to domain errors.
fn map_user_error(error: UserPersistenceError) -> Error {
    match error {
        UserPersistenceError::Connection { message } => Error::service_unavailable(message),
        UserPersistenceError::Query { message } => Error::internal(message),
        UserPersistenceError::DuplicateUsername => Error::conflict("username already taken"),
    }
}

/// Validated registration request.
pub struct Registration {
    /// Requested login name.
    pub username: Username,
    /// Display name shown to other users.
    pub display_name: DisplayName,
    /// Registration password.
    pub password: Password,
}

/// Account use-cases over the user repository.
#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserRepository>,
}

impl AccountService {
    /// Create a service over the given repository.
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    /// Register a new public-role account.
    pub async fn register(&self, registration: Registration) -> Result<User, Error> {
        let password_hash = auth::hash_password(registration.password.as_str())?;
        let user = User::new(
            NewUser {
                id: UserId::random(),
                username: registration.username,
                display_name: registration.display_name,
                role: Role::Public,
                password_hash,
            },
            Utc::now(),
        );
        self.users.insert(&user).await.map_err(map_user_error)?;
        Ok(user)
    }

    /// Authenticate login credentials.
    ///
    /// Unknown usernames and wrong passwords produce the same error; disabled
    /// accounts are called out explicitly so clients can explain the refusal.
    pub async fn authenticate(&self, credentials: &LoginCredentials) -> Result<User, Error> {
        let user = self
            .users
            .find_by_username(credentials.username())
            .await
            .map_err(map_user_error)?
            .ok_or_else(|| Error::unauthorized("invalid credentials"))?;

        if !auth::verify_password(user.password_hash(), credentials.password()) {
            return Err(Error::unauthorized("invalid credentials"));
        }
        if user.is_disabled() {
            return Err(Error::unauthorized("account disabled")
                .with_details(json!({ "code": "account_disabled" })));
        }
        Ok(user)
    }

    /// Fetch the account behind a session.
    pub async fn profile(&self, id: &UserId) -> Result<User, Error> {
        self.users
            .find_by_id(id)
            .await
            .map_err(map_user_error)?
            .ok_or_else(|| Error::unauthorized("account no longer exists"))
    }

    /// Link or clear the caller's wallet address.
    pub async fn set_wallet_address(
        &self,
        id: &UserId,
        address: Option<WalletAddress>,
    ) -> Result<User, Error> {
        let mut user = self.profile(id).await?;
        user.set_wallet_address(address);
        self.users.update(&user).await.map_err(map_user_error)?;
        Ok(user)
    }

    /// Current subscription state for the caller.
    pub async fn subscription(&self, id: &UserId) -> Result<Subscription, Error> {
        Ok(self.profile(id).await?.subscription().clone())
    }

    /// Cancel the caller's paid subscription. Access runs to the end date.
    pub async fn cancel_subscription(&self, id: &UserId) -> Result<Subscription, Error> {
        let mut user = self.profile(id).await?;
        if user.subscription().plan().is_free() {
            return Err(Error::invalid_request("no paid subscription to cancel"));
        }
        let mut subscription = user.subscription().clone();
        subscription.cancel();
        user.set_subscription(subscription.clone());
        self.users.update(&user).await.map_err(map_user_error)?;
        Ok(subscription)
    }

    /// Admin: list accounts.
    pub async fn list_users(&self, admin: &User, page: PageRequest) -> Result<Page<User>, Error> {
        require_admin(admin)?;
        let (items, total) = self.users.list(page).await.map_err(map_user_error)?;
        Ok(Page::new(items, page, total))
    }

    /// Admin: block or unblock an account.
    pub async fn set_disabled(
        &self,
        admin: &User,
        target: &UserId,
        disabled: bool,
    ) -> Result<User, Error> {
        require_admin(admin)?;
        if admin.id() == target {
            return Err(Error::invalid_request("admins cannot disable themselves"));
        }
        let mut user = self
            .users
            .find_by_id(target)
            .await
            .map_err(map_user_error)?
            .ok_or_else(|| Error::not_found("user not found"))?;
        if disabled {
            user.disable();
        } else {
            user.enable();
        }
        self.users.update(&user).await.map_err(map_user_error)?;
        Ok(user)
    }
}

/// Require the admin role or fail with `403`.
pub fn require_admin(user: &User) -> Result<(), Error> {
    if user.role() == Role::Admin {
        Ok(())
    } else {
        Err(Error::forbidden("admin role required"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::ErrorCode;
    use crate::domain::ports::InMemoryUserRepository;

    fn service() -> (AccountService, Arc<InMemoryUserRepository>) {
        let repository = Arc::new(InMemoryUserRepository::new());
        (AccountService::new(repository.clone()), repository)
    }

    fn registration(username: &str) -> Registration {
        Registration {
            username: Username::new(username).expect("valid username"),
            display_name: DisplayName::new("Reader One").expect("valid display name"),
            password: Password::new("secret password").expect("valid password"),
        }
    }

    fn credentials(username: &str, password: &str) -> LoginCredentials {
        LoginCredentials::try_from_parts(username, password).expect("valid credentials")
    }

    #[tokio::test]
    async fn register_then_authenticate_round_trips() {
        let (service, _) = service();
        let user = service
            .register(registration("reader"))
            .await
            .expect("registration succeeds");
        assert_eq!(user.role(), Role::Public);

        let authenticated = service
            .authenticate(&credentials("reader", "secret password"))
            .await
            .expect("authentication succeeds");
        assert_eq!(authenticated.id(), user.id());
    }

    #[tokio::test]
    async fn duplicate_usernames_conflict() {
        let (service, _) = service();
        service
            .register(registration("reader"))
            .await
            .expect("first registration succeeds");
        let error = service
            .register(registration("reader"))
            .await
            .expect_err("duplicate must fail");
        assert_eq!(error.code(), ErrorCode::Conflict);
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_look_identical() {
        let (service, _) = service();
        service
            .register(registration("reader"))
            .await
            .expect("registration succeeds");

        let wrong_password = service
            .authenticate(&credentials("reader", "not the password"))
            .await
            .expect_err("wrong password fails");
        let unknown_user = service
            .authenticate(&credentials("nobody", "not the password"))
            .await
            .expect_err("unknown user fails");
        assert_eq!(wrong_password.code(), unknown_user.code());
        assert_eq!(wrong_password.message(), unknown_user.message());
    }

    #[tokio::test]
    async fn disabled_accounts_cannot_authenticate() {
        let (service, repository) = service();
        let user = service
            .register(registration("reader"))
            .await
            .expect("registration succeeds");

        let mut stored = repository
            .find_by_id(user.id())
            .await
            .expect("query")
            .expect("user present");
        stored.disable();
        repository.update(&stored).await.expect("update");

        let error = service
            .authenticate(&credentials("reader", "secret password"))
            .await
            .expect_err("disabled account must fail");
        assert_eq!(error.code(), ErrorCode::Unauthorized);
        assert_eq!(
            error.details().and_then(|d| d.get("code")).and_then(|c| c.as_str()),
            Some("account_disabled")
        );
    }

    #[tokio::test]
    async fn admins_cannot_disable_themselves() {
        let (service, repository) = service();
        let admin = service
            .register(registration("the_admin"))
            .await
            .expect("registration succeeds");
        let mut stored = repository
            .find_by_id(admin.id())
            .await
            .expect("query")
            .expect("user present");
        stored.set_role(Role::Admin);
        repository.update(&stored).await.expect("update");

        let error = service
            .set_disabled(&stored, stored.id(), true)
            .await
            .expect_err("self-disable must fail");
        assert_eq!(error.code(), ErrorCode::InvalidRequest);
    }

    #[tokio::test]
    async fn non_admins_cannot_list_users() {
        let (service, _) = service();
        let user = service
            .register(registration("reader"))
            .await
            .expect("registration succeeds");
        let error = service
            .list_users(&user, PageRequest::first())
            .await
            .expect_err("non-admin must fail");
        assert_eq!(error.code(), ErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn cancel_requires_a_paid_plan() {
        let (service, _) = service();
        let user = service
            .register(registration("reader"))
            .await
            .expect("registration succeeds");
        let error = service
            .cancel_subscription(user.id())
            .await
            .expect_err("free plan cannot cancel");
        assert_eq!(error.code(), ErrorCode::InvalidRequest);
    }
}
