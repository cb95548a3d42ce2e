//! Persistence port for payment and donation records.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pagination::PageRequest;

use crate::domain::payment::{DonationRecord, PaymentRecord, PaymentState, PiPaymentId};
use crate::domain::user::UserId;

/// Failures surfaced by payment persistence adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaymentPersistenceError {
    /// The backing store could not be reached.
    #[error("payment store unavailable: {message}")]
    Connection {
        /// Adapter-provided context.
        message: String,
    },
    /// A query failed.
    #[error("payment store error: {message}")]
    Query {
        /// Adapter-provided context.
        message: String,
    },
    /// A record with this payment id already exists.
    #[error("payment already recorded")]
    DuplicatePayment,
}

impl PaymentPersistenceError {
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

/// Persistence port for payment records.
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Insert a freshly verified record. Fails with
    /// [`PaymentPersistenceError::DuplicatePayment`] when the payment id is
    /// already recorded, which the service treats as a concurrent replay.
    async fn insert(&self, record: &PaymentRecord) -> Result<(), PaymentPersistenceError>;

    /// Persist changes to an existing record.
    async fn update(&self, record: &PaymentRecord) -> Result<(), PaymentPersistenceError>;

    /// Fetch a record by payment id.
    async fn find_by_id(
        &self,
        id: &PiPaymentId,
    ) -> Result<Option<PaymentRecord>, PaymentPersistenceError>;

    /// One payer's records, newest verification first, with the total count.
    async fn list_by_payer(
        &self,
        payer: &UserId,
        page: PageRequest,
    ) -> Result<(Vec<PaymentRecord>, u64), PaymentPersistenceError>;

    /// Records still `verified` whose verification happened at or before
    /// `cutoff`. The reconciliation sweep drives these to completion.
    async fn list_stale_verified(
        &self,
        cutoff: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<PaymentRecord>, PaymentPersistenceError>;

    /// Record a donation derived from a verified payment.
    async fn insert_donation(
        &self,
        donation: &DonationRecord,
    ) -> Result<(), PaymentPersistenceError>;
}

/// In-memory [`PaymentRepository`] used by tests and database-less runs.
#[derive(Debug, Default)]
pub struct InMemoryPaymentRepository {
    state: std::sync::RwLock<InMemoryPayments>,
}

#[derive(Debug, Default)]
struct InMemoryPayments {
    payments: Vec<PaymentRecord>,
    donations: Vec<DonationRecord>,
}

impl InMemoryPaymentRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Donations recorded so far (test observability).
    pub fn donations(&self) -> Vec<DonationRecord> {
        self.state
            .read()
            .map(|state| state.donations.clone())
            .unwrap_or_default()
    }

    fn read(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, InMemoryPayments>, PaymentPersistenceError> {
        self.state
            .read()
            .map_err(|_| PaymentPersistenceError::query("payment store lock poisoned"))
    }

    fn write(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, InMemoryPayments>, PaymentPersistenceError> {
        self.state
            .write()
            .map_err(|_| PaymentPersistenceError::query("payment store lock poisoned"))
    }
}

#[async_trait]
impl PaymentRepository for InMemoryPaymentRepository {
    async fn insert(&self, record: &PaymentRecord) -> Result<(), PaymentPersistenceError> {
        let mut state = self.write()?;
        if state
            .payments
            .iter()
            .any(|p| p.payment_id() == record.payment_id())
        {
            return Err(PaymentPersistenceError::DuplicatePayment);
        }
        state.payments.push(record.clone());
        Ok(())
    }

    async fn update(&self, record: &PaymentRecord) -> Result<(), PaymentPersistenceError> {
        let mut state = self.write()?;
        match state
            .payments
            .iter_mut()
            .find(|p| p.payment_id() == record.payment_id())
        {
            Some(existing) => {
                *existing = record.clone();
                Ok(())
            }
            None => Err(PaymentPersistenceError::query("payment not found")),
        }
    }

    async fn find_by_id(
        &self,
        id: &PiPaymentId,
    ) -> Result<Option<PaymentRecord>, PaymentPersistenceError> {
        Ok(self
            .read()?
            .payments
            .iter()
            .find(|p| p.payment_id() == id)
            .cloned())
    }

    async fn list_by_payer(
        &self,
        payer: &UserId,
        page: PageRequest,
    ) -> Result<(Vec<PaymentRecord>, u64), PaymentPersistenceError> {
        let state = self.read()?;
        let mut records: Vec<PaymentRecord> = state
            .payments
            .iter()
            .filter(|p| p.payer() == payer)
            .cloned()
            .collect();
        records.sort_by_key(|p| std::cmp::Reverse(p.verified_at()));
        let total = records.len() as u64;
        let items = records
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(page.limit() as usize)
            .collect();
        Ok((items, total))
    }

    async fn list_stale_verified(
        &self,
        cutoff: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<PaymentRecord>, PaymentPersistenceError> {
        let state = self.read()?;
        Ok(state
            .payments
            .iter()
            .filter(|p| p.state() == PaymentState::Verified && p.verified_at() <= cutoff)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn insert_donation(
        &self,
        donation: &DonationRecord,
    ) -> Result<(), PaymentPersistenceError> {
        self.write()?.donations.push(donation.clone());
        Ok(())
    }
}
