//! Background upkeep: subscription expiry and payment reconciliation sweeps.
//!
//! The server runs these on an interval. Per-record failures are logged and
//! skipped so one bad record cannot wedge a sweep.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{info, warn};

use crate::domain::payment::Txid;
use crate::domain::ports::{PaymentRepository, PiPaymentGateway, UserRepository};

/// Maximum records examined per sweep.
const SWEEP_BATCH: u32 = 100;

/// Outcome counts for one upkeep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpkeepReport {
    /// Subscriptions flipped to expired.
    pub subscriptions_expired: u32,
    /// Stale verified payments driven to completion.
    pub payments_completed: u32,
    /// Stale payments that could not be completed this pass.
    pub payments_failed: u32,
}

/// Periodic maintenance over users and payments.
#[derive(Clone)]
pub struct UpkeepService {
    users: Arc<dyn UserRepository>,
    payments: Arc<dyn PaymentRepository>,
    gateway: Arc<dyn PiPaymentGateway>,
    stale_after: Duration,
}

impl UpkeepService {
    /// Create a service. `stale_after` is how long a payment may sit in
    /// `verified` before the reconciliation sweep re-drives completion.
    pub fn new(
        users: Arc<dyn UserRepository>,
        payments: Arc<dyn PaymentRepository>,
        gateway: Arc<dyn PiPaymentGateway>,
        stale_after: Duration,
    ) -> Self {
        Self {
            users,
            payments,
            gateway,
            stale_after,
        }
    }

    /// Run both sweeps once.
    pub async fn run_once(&self) -> UpkeepReport {
        let mut report = UpkeepReport::default();
        self.expire_due_subscriptions(&mut report).await;
        self.reconcile_stale_payments(&mut report).await;
        if report != UpkeepReport::default() {
            info!(
                subscriptions_expired = report.subscriptions_expired,
                payments_completed = report.payments_completed,
                payments_failed = report.payments_failed,
                "upkeep pass finished"
            );
        }
        report
    }

    async fn expire_due_subscriptions(&self, report: &mut UpkeepReport) {
        let now = Utc::now();
        let due = match self.users.list_subscriptions_due(now, SWEEP_BATCH).await {
            Ok(due) => due,
            Err(error) => {
                warn!(%error, "subscription sweep could not list due accounts");
                return;
            }
        };
        for mut user in due {
            let mut subscription = user.subscription().clone();
            if !subscription.expire_if_due(now) {
                continue;
            }
            user.set_subscription(subscription);
            match self.users.update(&user).await {
                Ok(()) => report.subscriptions_expired += 1,
                Err(error) => {
                    warn!(user = %user.id(), %error, "failed to persist expired subscription");
                }
            }
        }
    }

    async fn reconcile_stale_payments(&self, report: &mut UpkeepReport) {
        let cutoff = Utc::now() - self.stale_after;
        let stale = match self.payments.list_stale_verified(cutoff, SWEEP_BATCH).await {
            Ok(stale) => stale,
            Err(error) => {
                warn!(%error, "payment sweep could not list stale records");
                return;
            }
        };
        for mut record in stale {
            let txid = match record.txid().cloned() {
                Some(txid) => txid,
                None => match self.lookup_txid(&record).await {
                    Some(txid) => txid,
                    None => {
                        report.payments_failed += 1;
                        continue;
                    }
                },
            };

            if let Err(error) = self
                .gateway
                .complete_payment(record.payment_id(), &txid)
                .await
            {
                warn!(payment_id = %record.payment_id(), %error, "reconciliation completion failed");
                report.payments_failed += 1;
                continue;
            }
            if record.complete(txid, Utc::now()).is_err() {
                continue;
            }
            match self.payments.update(&record).await {
                Ok(()) => {
                    info!(payment_id = %record.payment_id(), "reconciled stale payment");
                    report.payments_completed += 1;
                }
                Err(error) => {
                    warn!(payment_id = %record.payment_id(), %error, "failed to persist reconciled payment");
                    report.payments_failed += 1;
                }
            }
        }
    }

    async fn lookup_txid(&self, record: &crate::domain::payment::PaymentRecord) -> Option<Txid> {
        let payment = match self.gateway.fetch_payment(record.payment_id()).await {
            Ok(payment) => payment,
            Err(error) => {
                warn!(payment_id = %record.payment_id(), %error, "reconciliation fetch failed");
                return None;
            }
        };
        let txid = payment.transaction.as_ref().map(|tx| tx.txid.clone())?;
        match Txid::new(txid) {
            Ok(txid) => Some(txid),
            Err(error) => {
                warn!(payment_id = %record.payment_id(), %error, "upstream txid invalid");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payment::{
        PaymentPurpose, PaymentRecord, PaymentState, PiAmount, PiPaymentId,
    };
    use crate::domain::ports::{
        InMemoryPaymentRepository, InMemoryUserRepository, MockPiPaymentGateway, PiGatewayError,
    };
    use crate::domain::subscription::Plan;
    use crate::domain::user::{DisplayName, NewUser, Role, User, UserId, Username};

    fn stale_record(age_days: i64) -> PaymentRecord {
        PaymentRecord::verified(
            PiPaymentId::new("payment-stale").expect("valid id"),
            UserId::random(),
            PiAmount::from_micropi(1_000_000),
            None,
            PaymentPurpose::Subscription { plan: Plan::Basic },
            "fingerprint".to_owned(),
            Some(crate::domain::payment::Txid::new("tx-9").expect("valid txid")),
            Utc::now() - Duration::days(age_days),
        )
    }

    fn lapsed_user() -> User {
        let mut user = User::new(
            NewUser {
                id: UserId::random(),
                username: Username::new("lapsed").expect("valid username"),
                display_name: DisplayName::new("Lapsed One").expect("valid display name"),
                role: Role::Public,
                password_hash: "$argon2id$stub".to_owned(),
            },
            Utc::now(),
        );
        let mut subscription = user.subscription().clone();
        subscription.activate(Plan::Basic, Utc::now() - Duration::days(40));
        user.set_subscription(subscription);
        user
    }

    #[tokio::test]
    async fn sweeps_expire_subscriptions_and_complete_stale_payments() {
        let users = Arc::new(InMemoryUserRepository::new());
        let payments = Arc::new(InMemoryPaymentRepository::new());
        users.insert(&lapsed_user()).await.expect("seed user");
        payments.insert(&stale_record(2)).await.expect("seed payment");

        let mut gateway = MockPiPaymentGateway::new();
        gateway
            .expect_complete_payment()
            .times(1)
            .returning(|_, _| Ok(()));

        let upkeep = UpkeepService::new(
            users.clone(),
            payments.clone(),
            Arc::new(gateway),
            Duration::hours(1),
        );
        let report = upkeep.run_once().await;
        assert_eq!(report.subscriptions_expired, 1);
        assert_eq!(report.payments_completed, 1);
        assert_eq!(report.payments_failed, 0);

        let record = payments
            .find_by_id(&PiPaymentId::new("payment-stale").expect("valid id"))
            .await
            .expect("query")
            .expect("record present");
        assert_eq!(record.state(), PaymentState::Completed);

        // A second pass finds nothing to do.
        let second = upkeep.run_once().await;
        assert_eq!(second, UpkeepReport::default());
    }

    #[tokio::test]
    async fn gateway_failures_are_counted_not_fatal() {
        let users = Arc::new(InMemoryUserRepository::new());
        let payments = Arc::new(InMemoryPaymentRepository::new());
        payments.insert(&stale_record(2)).await.expect("seed payment");

        let mut gateway = MockPiPaymentGateway::new();
        gateway
            .expect_complete_payment()
            .returning(|_, _| Err(PiGatewayError::transport("down")));

        let upkeep = UpkeepService::new(
            users,
            payments.clone(),
            Arc::new(gateway),
            Duration::hours(1),
        );
        let report = upkeep.run_once().await;
        assert_eq!(report.payments_failed, 1);
        assert_eq!(report.payments_completed, 0);

        let record = payments
            .find_by_id(&PiPaymentId::new("payment-stale").expect("valid id"))
            .await
            .expect("query")
            .expect("record present");
        assert_eq!(record.state(), PaymentState::Verified);
    }

    #[tokio::test]
    async fn fresh_verified_payments_are_left_alone() {
        let users = Arc::new(InMemoryUserRepository::new());
        let payments = Arc::new(InMemoryPaymentRepository::new());
        // Verified just now; stale window is one hour.
        let record = PaymentRecord::verified(
            PiPaymentId::new("payment-fresh").expect("valid id"),
            UserId::random(),
            PiAmount::from_micropi(1_000_000),
            None,
            PaymentPurpose::Subscription { plan: Plan::Basic },
            "fingerprint".to_owned(),
            None,
            Utc::now(),
        );
        payments.insert(&record).await.expect("seed payment");

        let gateway = MockPiPaymentGateway::new();
        let upkeep = UpkeepService::new(users, payments, Arc::new(gateway), Duration::hours(1));
        let report = upkeep.run_once().await;
        assert_eq!(report, UpkeepReport::default());
    }
}
