//! PostgreSQL-backed `UserRepository` implementation using Diesel.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use pagination::PageRequest;

use crate::domain::ports::{UserPersistenceError, UserRepository};
use crate::domain::subscription::{Plan, Subscription, SubscriptionStatus};
use crate::domain::user::{DisplayName, Role, User, UserId, Username, WalletAddress};

use super::error_mapping::{DbFailure, classify_diesel, classify_pool};
use super::models::{NewUserRow, UserRow, UserUpdate};
use super::pool::DbPool;
use super::schema::users;

/// Diesel-backed implementation of the `UserRepository` port.
#[derive(Clone)]
pub struct DieselUserRepository {
    pool: DbPool,
}

impl DieselUserRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_failure(failure: DbFailure) -> UserPersistenceError {
    match failure {
        DbFailure::Connection(message) => UserPersistenceError::connection(message),
        DbFailure::Query(message) => UserPersistenceError::query(message),
        DbFailure::UniqueViolation(_) => UserPersistenceError::DuplicateUsername,
    }
}

fn row_to_user(row: UserRow) -> Result<User, UserPersistenceError> {
    let corrupted =
        |what: &str| UserPersistenceError::query(format!("corrupted {what} in database"));

    let username = Username::new(row.username).map_err(|_| corrupted("username"))?;
    let display_name =
        DisplayName::new(row.display_name).map_err(|_| corrupted("display name"))?;
    let role = Role::parse(&row.role).ok_or_else(|| corrupted("role"))?;
    let wallet_address = match row.wallet_address {
        Some(raw) => Some(WalletAddress::new(raw).map_err(|_| corrupted("wallet address"))?),
        None => None,
    };
    let subscription = Subscription {
        plan: Plan::parse(&row.subscription_plan).ok_or_else(|| corrupted("plan"))?,
        status: SubscriptionStatus::parse(&row.subscription_status)
            .ok_or_else(|| corrupted("subscription status"))?,
        expires_at: row.subscription_expires_at,
    };
    Ok(User::from_parts(
        UserId::from_uuid(row.id),
        username,
        display_name,
        role,
        row.disabled,
        wallet_address,
        subscription,
        row.password_hash,
        row.created_at,
    ))
}

#[async_trait]
impl UserRepository for DieselUserRepository {
    async fn insert(&self, user: &User) -> Result<(), UserPersistenceError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_failure(classify_pool(err)))?;

        let row = NewUserRow {
            id: *user.id().as_uuid(),
            username: user.username().as_ref(),
            display_name: user.display_name().as_ref(),
            role: user.role().as_str(),
            disabled: user.is_disabled(),
            wallet_address: user.wallet_address().map(AsRef::as_ref),
            subscription_plan: user.subscription().plan.as_str(),
            subscription_status: user.subscription().status.as_str(),
            subscription_expires_at: user.subscription().expires_at,
            password_hash: user.password_hash(),
            created_at: user.created_at(),
        };

        diesel::insert_into(users::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(|err| map_failure(classify_diesel(err)))
    }

    async fn update(&self, user: &User) -> Result<(), UserPersistenceError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_failure(classify_pool(err)))?;

        let changes = UserUpdate {
            display_name: user.display_name().as_ref(),
            role: user.role().as_str(),
            disabled: user.is_disabled(),
            wallet_address: Some(user.wallet_address().map(AsRef::as_ref)),
            subscription_plan: user.subscription().plan.as_str(),
            subscription_status: user.subscription().status.as_str(),
            subscription_expires_at: Some(user.subscription().expires_at),
        };

        diesel::update(users::table.find(user.id().as_uuid()))
            .set(&changes)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(|err| map_failure(classify_diesel(err)))
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserPersistenceError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_failure(classify_pool(err)))?;

        let row: Option<UserRow> = users::table
            .find(id.as_uuid())
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(|err| map_failure(classify_diesel(err)))?;
        row.map(row_to_user).transpose()
    }

    async fn find_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<User>, UserPersistenceError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_failure(classify_pool(err)))?;

        let row: Option<UserRow> = users::table
            .filter(users::username.eq(username.as_ref()))
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(|err| map_failure(classify_diesel(err)))?;
        row.map(row_to_user).transpose()
    }

    async fn list(&self, page: PageRequest) -> Result<(Vec<User>, u64), UserPersistenceError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_failure(classify_pool(err)))?;

        let total: i64 = users::table
            .count()
            .get_result(&mut conn)
            .await
            .map_err(|err| map_failure(classify_diesel(err)))?;

        let rows: Vec<UserRow> = users::table
            .order(users::created_at.desc())
            .offset(page.offset())
            .limit(i64::from(page.limit()))
            .select(UserRow::as_select())
            .load(&mut conn)
            .await
            .map_err(|err| map_failure(classify_diesel(err)))?;

        let items = rows
            .into_iter()
            .map(row_to_user)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((items, total.unsigned_abs()))
    }

    async fn list_subscriptions_due(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<User>, UserPersistenceError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_failure(classify_pool(err)))?;

        let rows: Vec<UserRow> = users::table
            .filter(users::subscription_plan.ne(Plan::Free.as_str()))
            .filter(users::subscription_status.ne(SubscriptionStatus::Expired.as_str()))
            .filter(users::subscription_expires_at.le(Some(now)))
            .limit(i64::from(limit))
            .select(UserRow::as_select())
            .load(&mut conn)
            .await
            .map_err(|err| map_failure(classify_diesel(err)))?;

        rows.into_iter().map(row_to_user).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    #[test]
    fn unique_violations_surface_as_duplicate_username() {
        let failure = classify_diesel(DieselError::DatabaseError(
            DatabaseErrorKind::UniqueViolation,
            Box::new("duplicate key value".to_owned()),
        ));
        assert_eq!(map_failure(failure), UserPersistenceError::DuplicateUsername);
    }

    #[test]
    fn corrupted_roles_fail_rehydration() {
        let row = UserRow {
            id: uuid::Uuid::new_v4(),
            username: "reader".to_owned(),
            display_name: "Reader One".to_owned(),
            role: "superuser".to_owned(),
            disabled: false,
            wallet_address: None,
            subscription_plan: "free".to_owned(),
            subscription_status: "active".to_owned(),
            subscription_expires_at: None,
            password_hash: "$argon2id$stub".to_owned(),
            created_at: Utc::now(),
        };
        let error = row_to_user(row).expect_err("bad role must fail");
        assert!(error.to_string().contains("corrupted role"));
    }

    #[test]
    fn valid_rows_rehydrate() {
        let row = UserRow {
            id: uuid::Uuid::new_v4(),
            username: "reader".to_owned(),
            display_name: "Reader One".to_owned(),
            role: "journalist".to_owned(),
            disabled: false,
            wallet_address: Some("GABC123".to_owned()),
            subscription_plan: "basic".to_owned(),
            subscription_status: "active".to_owned(),
            subscription_expires_at: Some(Utc::now()),
            password_hash: "$argon2id$stub".to_owned(),
            created_at: Utc::now(),
        };
        let user = row_to_user(row).expect("row rehydrates");
        assert_eq!(user.role(), Role::Journalist);
        assert_eq!(user.subscription().plan, Plan::Basic);
    }
}
