//! PostgreSQL-backed `PaymentRepository` implementation using Diesel.
//!
//! The payment id is the primary key, so the insert-once guarantee the
//! verification flow relies on is a database constraint, not a code path.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use pagination::PageRequest;

use crate::domain::article::ArticleId;
use crate::domain::payment::{
    DonationRecord, PaymentPurpose, PaymentRecord, PaymentState, PiAmount, PiPaymentId, Txid,
};
use crate::domain::ports::{PaymentPersistenceError, PaymentRepository};
use crate::domain::subscription::Plan;
use crate::domain::user::UserId;

use super::error_mapping::{DbFailure, classify_diesel, classify_pool};
use super::models::{NewDonationRow, NewPaymentRow, PaymentRow, PaymentUpdate};
use super::pool::DbPool;
use super::schema::{donations, payments};

/// Diesel-backed implementation of the `PaymentRepository` port.
#[derive(Clone)]
pub struct DieselPaymentRepository {
    pool: DbPool,
}

impl DieselPaymentRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn conn(
        &self,
    ) -> Result<
        diesel_async::pooled_connection::bb8::PooledConnection<'_, diesel_async::AsyncPgConnection>,
        PaymentPersistenceError,
    > {
        self.pool
            .get()
            .await
            .map_err(|err| map_failure(classify_pool(err)))
    }
}

fn map_failure(failure: DbFailure) -> PaymentPersistenceError {
    match failure {
        DbFailure::Connection(message) => PaymentPersistenceError::connection(message),
        DbFailure::Query(message) => PaymentPersistenceError::query(message),
        DbFailure::UniqueViolation(_) => PaymentPersistenceError::DuplicatePayment,
    }
}

fn purpose_columns(purpose: &PaymentPurpose) -> (&'static str, Option<&'static str>, Option<uuid::Uuid>) {
    match purpose {
        PaymentPurpose::Subscription { plan } => ("subscription", Some(plan.as_str()), None),
        PaymentPurpose::Donation { article_id } => {
            ("donation", None, article_id.map(|id| *id.as_uuid()))
        }
    }
}

fn row_to_record(row: PaymentRow) -> Result<PaymentRecord, PaymentPersistenceError> {
    let corrupted =
        |what: &str| PaymentPersistenceError::query(format!("corrupted {what} in database"));

    let payment_id = PiPaymentId::new(row.payment_id).map_err(|_| corrupted("payment id"))?;
    let purpose = match row.purpose_kind.as_str() {
        "subscription" => {
            let raw_plan = row.purpose_plan.as_deref().ok_or_else(|| corrupted("plan"))?;
            PaymentPurpose::Subscription {
                plan: Plan::parse(raw_plan).ok_or_else(|| corrupted("plan"))?,
            }
        }
        "donation" => PaymentPurpose::Donation {
            article_id: row.purpose_article_id.map(ArticleId::from_uuid),
        },
        _ => return Err(corrupted("purpose")),
    };
    let state = PaymentState::parse(&row.state).ok_or_else(|| corrupted("state"))?;
    let txid = match row.txid {
        Some(raw) => Some(Txid::new(raw).map_err(|_| corrupted("txid"))?),
        None => None,
    };
    Ok(PaymentRecord::from_parts(
        payment_id,
        UserId::from_uuid(row.payer_id),
        PiAmount::from_micropi(row.amount_micropi),
        row.memo,
        purpose,
        state,
        row.payload_fingerprint,
        txid,
        row.verified_at,
        row.completed_at,
    ))
}

#[async_trait]
impl PaymentRepository for DieselPaymentRepository {
    async fn insert(&self, record: &PaymentRecord) -> Result<(), PaymentPersistenceError> {
        let mut conn = self.conn().await?;
        let (purpose_kind, purpose_plan, purpose_article_id) = purpose_columns(record.purpose());
        let row = NewPaymentRow {
            payment_id: record.payment_id().as_ref(),
            payer_id: *record.payer().as_uuid(),
            amount_micropi: record.amount().as_micropi(),
            memo: record.memo(),
            purpose_kind,
            purpose_plan,
            purpose_article_id,
            state: record.state().as_str(),
            payload_fingerprint: record.payload_fingerprint(),
            txid: record.txid().map(AsRef::as_ref),
            verified_at: record.verified_at(),
            completed_at: record.completed_at(),
        };
        diesel::insert_into(payments::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(|err| map_failure(classify_diesel(err)))
    }

    async fn update(&self, record: &PaymentRecord) -> Result<(), PaymentPersistenceError> {
        let mut conn = self.conn().await?;
        let changes = PaymentUpdate {
            state: record.state().as_str(),
            txid: record.txid().map(AsRef::as_ref),
            completed_at: record.completed_at(),
        };
        diesel::update(payments::table.find(record.payment_id().as_ref()))
            .set(&changes)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(|err| map_failure(classify_diesel(err)))
    }

    async fn find_by_id(
        &self,
        id: &PiPaymentId,
    ) -> Result<Option<PaymentRecord>, PaymentPersistenceError> {
        let mut conn = self.conn().await?;
        let row: Option<PaymentRow> = payments::table
            .find(id.as_ref())
            .select(PaymentRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(|err| map_failure(classify_diesel(err)))?;
        row.map(row_to_record).transpose()
    }

    async fn list_by_payer(
        &self,
        payer: &UserId,
        page: PageRequest,
    ) -> Result<(Vec<PaymentRecord>, u64), PaymentPersistenceError> {
        let mut conn = self.conn().await?;
        let base = payments::table.filter(payments::payer_id.eq(payer.as_uuid()));

        let total: i64 = base
            .clone()
            .count()
            .get_result(&mut conn)
            .await
            .map_err(|err| map_failure(classify_diesel(err)))?;

        let rows: Vec<PaymentRow> = base
            .order(payments::verified_at.desc())
            .offset(page.offset())
            .limit(i64::from(page.limit()))
            .select(PaymentRow::as_select())
            .load(&mut conn)
            .await
            .map_err(|err| map_failure(classify_diesel(err)))?;

        let items = rows
            .into_iter()
            .map(row_to_record)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((items, total.unsigned_abs()))
    }

    async fn list_stale_verified(
        &self,
        cutoff: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<PaymentRecord>, PaymentPersistenceError> {
        let mut conn = self.conn().await?;
        let rows: Vec<PaymentRow> = payments::table
            .filter(payments::state.eq(PaymentState::Verified.as_str()))
            .filter(payments::verified_at.le(cutoff))
            .order(payments::verified_at.asc())
            .limit(i64::from(limit))
            .select(PaymentRow::as_select())
            .load(&mut conn)
            .await
            .map_err(|err| map_failure(classify_diesel(err)))?;
        rows.into_iter().map(row_to_record).collect()
    }

    async fn insert_donation(
        &self,
        donation: &DonationRecord,
    ) -> Result<(), PaymentPersistenceError> {
        let mut conn = self.conn().await?;
        let row = NewDonationRow {
            id: donation.id,
            donor_id: *donation.donor.as_uuid(),
            amount_micropi: donation.amount.as_micropi(),
            article_id: donation.article_id.map(|id| *id.as_uuid()),
            payment_id: donation.payment_id.as_ref(),
            created_at: donation.created_at,
        };
        diesel::insert_into(donations::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(|err| map_failure(classify_diesel(err)))
    }
}
