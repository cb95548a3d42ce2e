//! PostgreSQL-backed `ApplicationRepository` implementation using Diesel.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use pagination::PageRequest;
use url::Url;

use crate::domain::journalist::{
    ApplicationId, ApplicationStatus, JournalistApplication, Statement,
};
use crate::domain::ports::{ApplicationPersistenceError, ApplicationRepository};
use crate::domain::user::UserId;

use super::error_mapping::{DbFailure, classify_diesel, classify_pool};
use super::models::{ApplicationRow, ApplicationUpdate, NewApplicationRow};
use super::pool::DbPool;
use super::schema::journalist_applications;

/// Diesel-backed implementation of the `ApplicationRepository` port.
#[derive(Clone)]
pub struct DieselApplicationRepository {
    pool: DbPool,
}

impl DieselApplicationRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn conn(
        &self,
    ) -> Result<
        diesel_async::pooled_connection::bb8::PooledConnection<'_, diesel_async::AsyncPgConnection>,
        ApplicationPersistenceError,
    > {
        self.pool
            .get()
            .await
            .map_err(|err| map_failure(classify_pool(err)))
    }
}

fn map_failure(failure: DbFailure) -> ApplicationPersistenceError {
    match failure {
        DbFailure::Connection(message) => ApplicationPersistenceError::connection(message),
        DbFailure::Query(message) | DbFailure::UniqueViolation(message) => {
            ApplicationPersistenceError::query(message)
        }
    }
}

fn row_to_application(
    row: ApplicationRow,
) -> Result<JournalistApplication, ApplicationPersistenceError> {
    let corrupted =
        |what: &str| ApplicationPersistenceError::query(format!("corrupted {what} in database"));

    let statement = Statement::new(row.statement).map_err(|_| corrupted("statement"))?;
    let portfolio_url = match row.portfolio_url {
        Some(raw) => Some(Url::parse(&raw).map_err(|_| corrupted("portfolio url"))?),
        None => None,
    };
    let status = ApplicationStatus::parse(&row.status).ok_or_else(|| corrupted("status"))?;
    Ok(JournalistApplication::from_parts(
        ApplicationId::from_uuid(row.id),
        UserId::from_uuid(row.applicant_id),
        statement,
        portfolio_url,
        status,
        row.decided_by.map(UserId::from_uuid),
        row.decided_at,
        row.created_at,
    ))
}

#[async_trait]
impl ApplicationRepository for DieselApplicationRepository {
    async fn insert(
        &self,
        application: &JournalistApplication,
    ) -> Result<(), ApplicationPersistenceError> {
        let mut conn = self.conn().await?;
        let portfolio_url = application.portfolio_url().map(Url::as_str);
        let row = NewApplicationRow {
            id: *application.id().as_uuid(),
            applicant_id: *application.applicant().as_uuid(),
            statement: application.statement().as_ref(),
            portfolio_url,
            status: application.status().as_str(),
            decided_by: application.decided_by().map(|id| *id.as_uuid()),
            decided_at: application.decided_at(),
            created_at: application.created_at(),
        };
        diesel::insert_into(journalist_applications::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(|err| map_failure(classify_diesel(err)))
    }

    async fn update(
        &self,
        application: &JournalistApplication,
    ) -> Result<(), ApplicationPersistenceError> {
        let mut conn = self.conn().await?;
        let changes = ApplicationUpdate {
            status: application.status().as_str(),
            decided_by: application.decided_by().map(|id| *id.as_uuid()),
            decided_at: application.decided_at(),
        };
        diesel::update(journalist_applications::table.find(application.id().as_uuid()))
            .set(&changes)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(|err| map_failure(classify_diesel(err)))
    }

    async fn find_by_id(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<JournalistApplication>, ApplicationPersistenceError> {
        let mut conn = self.conn().await?;
        let row: Option<ApplicationRow> = journalist_applications::table
            .find(id.as_uuid())
            .select(ApplicationRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(|err| map_failure(classify_diesel(err)))?;
        row.map(row_to_application).transpose()
    }

    async fn find_pending_by_applicant(
        &self,
        applicant: &UserId,
    ) -> Result<Option<JournalistApplication>, ApplicationPersistenceError> {
        let mut conn = self.conn().await?;
        let row: Option<ApplicationRow> = journalist_applications::table
            .filter(journalist_applications::applicant_id.eq(applicant.as_uuid()))
            .filter(journalist_applications::status.eq(ApplicationStatus::Pending.as_str()))
            .select(ApplicationRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(|err| map_failure(classify_diesel(err)))?;
        row.map(row_to_application).transpose()
    }

    async fn list_by_applicant(
        &self,
        applicant: &UserId,
    ) -> Result<Vec<JournalistApplication>, ApplicationPersistenceError> {
        let mut conn = self.conn().await?;
        let rows: Vec<ApplicationRow> = journalist_applications::table
            .filter(journalist_applications::applicant_id.eq(applicant.as_uuid()))
            .order(journalist_applications::created_at.desc())
            .select(ApplicationRow::as_select())
            .load(&mut conn)
            .await
            .map_err(|err| map_failure(classify_diesel(err)))?;
        rows.into_iter().map(row_to_application).collect()
    }

    async fn list_by_status(
        &self,
        status: ApplicationStatus,
        page: PageRequest,
    ) -> Result<(Vec<JournalistApplication>, u64), ApplicationPersistenceError> {
        let mut conn = self.conn().await?;
        let base =
            journalist_applications::table.filter(journalist_applications::status.eq(status.as_str()));

        let total: i64 = base
            .clone()
            .count()
            .get_result(&mut conn)
            .await
            .map_err(|err| map_failure(classify_diesel(err)))?;

        let rows: Vec<ApplicationRow> = base
            .order(journalist_applications::created_at.asc())
            .offset(page.offset())
            .limit(i64::from(page.limit()))
            .select(ApplicationRow::as_select())
            .load(&mut conn)
            .await
            .map_err(|err| map_failure(classify_diesel(err)))?;

        let items = rows
            .into_iter()
            .map(row_to_application)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((items, total.unsigned_abs()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn rows_rehydrate_with_decisions() {
        let reviewer = uuid::Uuid::new_v4();
        let row = ApplicationRow {
            id: uuid::Uuid::new_v4(),
            applicant_id: uuid::Uuid::new_v4(),
            statement: "I cover Pi markets.".to_owned(),
            portfolio_url: Some("https://example.org/clips".to_owned()),
            status: "approved".to_owned(),
            decided_by: Some(reviewer),
            decided_at: Some(Utc::now()),
            created_at: Utc::now(),
        };
        let application = row_to_application(row).expect("row rehydrates");
        assert_eq!(application.status(), ApplicationStatus::Approved);
        assert_eq!(
            application.decided_by().map(|id| *id.as_uuid()),
            Some(reviewer)
        );
    }

    #[test]
    fn corrupted_urls_fail_rehydration() {
        let row = ApplicationRow {
            id: uuid::Uuid::new_v4(),
            applicant_id: uuid::Uuid::new_v4(),
            statement: "I cover Pi markets.".to_owned(),
            portfolio_url: Some("not a url".to_owned()),
            status: "pending".to_owned(),
            decided_by: None,
            decided_at: None,
            created_at: Utc::now(),
        };
        assert!(row_to_application(row).is_err());
    }
}
