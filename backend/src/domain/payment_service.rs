//! Pi payment use-cases: verification, completion, and payer history.
//!
//! Verification and completion are linked: a completion request is only
//! honoured for a payment this service verified and recorded. Re-verifying a
//! recorded payment replays the stored outcome instead of re-applying its
//! effects, and a concurrent duplicate insert resolves to the same replay.

use std::sync::Arc;

use chrono::Utc;
use pagination::{Page, PageRequest};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::domain::article::ArticleId;
use crate::domain::error::Error;
use crate::domain::payment::{
    DonationRecord, PaymentPurpose, PaymentRecord, PaymentState, PiAmount, PiPaymentId, Txid,
    fingerprint_payload,
};
use crate::domain::ports::{
    ArticleRepository, GatewayPayment, PaymentPersistenceError, PaymentRepository,
    PiGatewayError, PiPaymentGateway, UserPersistenceError, UserRepository,
};
use crate::domain::user::User;

/// Map payment persistence errors to domain errors.
fn map_payment_error(error: PaymentPersistenceError) -> Error {
    match error {
        PaymentPersistenceError::Connection { message } => Error::service_unavailable(message),
        PaymentPersistenceError::Query { message } => Error::internal(message),
        PaymentPersistenceError::DuplicatePayment => {
            // Should be resolved by the race handling in verify().
            Error::internal("unexpected duplicate payment record")
        }
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

/// Map gateway failures to domain errors.
///
/// Credential rejections are a deployment fault, not a caller fault, so they
/// surface as internal errors rather than 401s.
pub fn map_gateway_error(error: PiGatewayError) -> Error {
    match error {
        PiGatewayError::Transport { message }
        | PiGatewayError::Timeout { message }
        | PiGatewayError::RateLimited { message } => {
            Error::service_unavailable(format!("pi platform unavailable: {message}"))
        }
        PiGatewayError::Unauthorized { message } => {
            Error::internal(format!("pi platform credentials rejected: {message}"))
        }
        PiGatewayError::NotFound { message } => {
            Error::not_found(format!("payment not found: {message}"))
        }
        PiGatewayError::InvalidRequest { message } => {
            Error::invalid_request(format!("pi platform rejected request: {message}"))
        }
        PiGatewayError::Decode { message } => {
            Error::internal(format!("pi platform response undecodable: {message}"))
        }
    }
}

/// Result of a verification request.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationOutcome {
    /// The recorded payment.
    pub record: PaymentRecord,
    /// Whether this was a replay of an earlier verification.
    pub replayed: bool,
}

/// Result of a completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionOutcome {
    /// The completed payment record.
    pub record: PaymentRecord,
    /// Whether the record was already completed.
    pub replayed: bool,
}

/// Pi payment use-cases.
#[derive(Clone)]
pub struct PaymentService {
    payments: Arc<dyn PaymentRepository>,
    users: Arc<dyn UserRepository>,
    articles: Arc<dyn ArticleRepository>,
    gateway: Arc<dyn PiPaymentGateway>,
}

impl PaymentService {
    /// Create a service over the given ports.
    pub fn new(
        payments: Arc<dyn PaymentRepository>,
        users: Arc<dyn UserRepository>,
        articles: Arc<dyn ArticleRepository>,
        gateway: Arc<dyn PiPaymentGateway>,
    ) -> Self {
        Self {
            payments,
            users,
            articles,
            gateway,
        }
    }

    /// Verify a payment with the Pi platform and record it.
    ///
    /// The platform payment must have a verified blockchain transaction and
    /// `developer_completed` set; anything else is a conflict carrying the
    /// upstream status flags. Effects (subscription activation, donation
    /// recording) are applied exactly once, on first verification.
    pub async fn verify(
        &self,
        payer: &User,
        payment_id: PiPaymentId,
        purpose: PaymentPurpose,
    ) -> Result<VerificationOutcome, Error> {
        if let Some(existing) = self
            .payments
            .find_by_id(&payment_id)
            .await
            .map_err(map_payment_error)?
        {
            return self.replay(payer, existing);
        }

        let payment = self
            .gateway
            .fetch_payment(&payment_id)
            .await
            .map_err(map_gateway_error)?;
        require_platform_verified(&payment)?;

        let amount = PiAmount::try_from_pi(payment.amount)
            .map_err(|err| Error::internal(format!("pi platform reported a bad amount: {err}")))?;
        self.check_purpose(&purpose, amount).await?;

        let txid = match &payment.transaction {
            Some(tx) => Some(
                Txid::new(tx.txid.clone())
                    .map_err(|err| Error::internal(format!("bad upstream txid: {err}")))?,
            ),
            None => None,
        };
        let record = PaymentRecord::verified(
            payment_id.clone(),
            *payer.id(),
            amount,
            payment.memo.clone(),
            purpose.clone(),
            fingerprint_payload(&payment.raw),
            txid,
            Utc::now(),
        );

        match self.payments.insert(&record).await {
            Ok(()) => {}
            Err(PaymentPersistenceError::DuplicatePayment) => {
                // Concurrent verification won the insert; replay its record.
                let existing = self
                    .payments
                    .find_by_id(&payment_id)
                    .await
                    .map_err(map_payment_error)?
                    .ok_or_else(|| {
                        Error::internal("payment record disappeared during race resolution")
                    })?;
                return self.replay(payer, existing);
            }
            Err(err) => return Err(map_payment_error(err)),
        }

        self.apply_effects(&record).await?;
        info!(
            payment_id = %record.payment_id(),
            payer = %record.payer(),
            amount_micropi = record.amount().as_micropi(),
            "payment verified"
        );
        Ok(VerificationOutcome {
            record,
            replayed: false,
        })
    }

    fn replay(
        &self,
        payer: &User,
        existing: PaymentRecord,
    ) -> Result<VerificationOutcome, Error> {
        if existing.payer() != payer.id() {
            return Err(Error::forbidden("payment belongs to another account"));
        }
        Ok(VerificationOutcome {
            record: existing,
            replayed: true,
        })
    }

    async fn check_purpose(&self, purpose: &PaymentPurpose, amount: PiAmount) -> Result<(), Error> {
        match purpose {
            PaymentPurpose::Subscription { plan } => {
                let minimum = plan.minimum_amount().ok_or_else(|| {
                    Error::invalid_request("the free plan cannot be purchased")
                })?;
                if amount < minimum {
                    return Err(Error::invalid_request("payment amount below plan price")
                        .with_details(json!({
                            "requiredMicropi": minimum.as_micropi(),
                            "paidMicropi": amount.as_micropi(),
                        })));
                }
            }
            PaymentPurpose::Donation { article_id } => {
                if let Some(article_id) = article_id {
                    self.require_article(article_id).await?;
                }
            }
        }
        Ok(())
    }

    async fn require_article(&self, article_id: &ArticleId) -> Result<(), Error> {
        self.articles
            .find_by_id(article_id)
            .await
            .map_err(|err| Error::internal(err.to_string()))?
            .ok_or_else(|| Error::not_found("donation target article not found"))?;
        Ok(())
    }

    async fn apply_effects(&self, record: &PaymentRecord) -> Result<(), Error> {
        match record.purpose() {
            PaymentPurpose::Subscription { plan } => {
                let mut user = self
                    .users
                    .find_by_id(record.payer())
                    .await
                    .map_err(map_user_error)?
                    .ok_or_else(|| Error::internal("payer account no longer exists"))?;
                let mut subscription = user.subscription().clone();
                subscription.activate(*plan, Utc::now());
                user.set_subscription(subscription);
                self.users.update(&user).await.map_err(map_user_error)?;
            }
            PaymentPurpose::Donation { article_id } => {
                let donation = DonationRecord {
                    id: Uuid::new_v4(),
                    donor: *record.payer(),
                    amount: record.amount(),
                    article_id: *article_id,
                    payment_id: record.payment_id().clone(),
                    created_at: Utc::now(),
                };
                self.payments
                    .insert_donation(&donation)
                    .await
                    .map_err(map_payment_error)?;
            }
        }
        Ok(())
    }

    /// Complete a previously verified payment.
    ///
    /// Unknown payment ids are rejected: completion is only reachable through
    /// verification. Completing an already-completed record replays it.
    pub async fn complete(
        &self,
        payer: &User,
        payment_id: &PiPaymentId,
        txid: Txid,
    ) -> Result<CompletionOutcome, Error> {
        let mut record = self
            .payments
            .find_by_id(payment_id)
            .await
            .map_err(map_payment_error)?
            .ok_or_else(|| Error::not_found("payment has not been verified here"))?;
        if record.payer() != payer.id() {
            return Err(Error::forbidden("payment belongs to another account"));
        }
        if record.state() == PaymentState::Completed {
            return Ok(CompletionOutcome {
                record,
                replayed: true,
            });
        }

        self.gateway
            .complete_payment(payment_id, &txid)
            .await
            .map_err(map_gateway_error)?;

        if record.complete(txid, Utc::now()).is_err() {
            return Ok(CompletionOutcome {
                record,
                replayed: true,
            });
        }
        self.payments
            .update(&record)
            .await
            .map_err(map_payment_error)?;
        info!(payment_id = %record.payment_id(), "payment completed");
        Ok(CompletionOutcome {
            record,
            replayed: false,
        })
    }

    /// The payer's payment history, newest verification first.
    pub async fn history(
        &self,
        payer: &User,
        page: PageRequest,
    ) -> Result<Page<PaymentRecord>, Error> {
        let (items, total) = self
            .payments
            .list_by_payer(payer.id(), page)
            .await
            .map_err(map_payment_error)?;
        Ok(Page::new(items, page, total))
    }
}

fn require_platform_verified(payment: &GatewayPayment) -> Result<(), Error> {
    if payment.is_verified() {
        return Ok(());
    }
    Err(
        Error::conflict("payment is not verified by the pi platform").with_details(json!({
            "transactionVerified": payment
                .transaction
                .as_ref()
                .is_some_and(|tx| tx.verified),
            "developerApproved": payment.status.developer_approved,
            "developerCompleted": payment.status.developer_completed,
            "cancelled": payment.status.cancelled,
            "userCancelled": payment.status.user_cancelled,
        })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::article::{Article, ArticleContent};
    use crate::domain::error::ErrorCode;
    use crate::domain::ports::{
        GatewayStatus, GatewayTransaction, InMemoryArticleRepository, InMemoryPaymentRepository,
        InMemoryUserRepository, MockPiPaymentGateway,
    };
    use crate::domain::subscription::Plan;
    use crate::domain::user::{DisplayName, NewUser, Role, UserId, Username};

    fn payer() -> User {
        User::new(
            NewUser {
                id: UserId::random(),
                username: Username::new("payer").expect("valid username"),
                display_name: DisplayName::new("Payer One").expect("valid display name"),
                role: Role::Public,
                password_hash: "$argon2id$stub".to_owned(),
            },
            Utc::now(),
        )
    }

    fn platform_payment(amount: f64, verified: bool, developer_completed: bool) -> GatewayPayment {
        GatewayPayment {
            identifier: "payment-abc".to_owned(),
            amount,
            memo: Some("via app".to_owned()),
            metadata: None,
            transaction: Some(GatewayTransaction {
                txid: "tx-1".to_owned(),
                verified,
            }),
            status: GatewayStatus {
                developer_approved: true,
                transaction_verified: verified,
                developer_completed,
                cancelled: false,
                user_cancelled: false,
            },
            raw: json!({ "identifier": "payment-abc", "amount": amount }),
        }
    }

    struct Harness {
        service: PaymentService,
        payments: Arc<InMemoryPaymentRepository>,
        users: Arc<InMemoryUserRepository>,
        articles: Arc<InMemoryArticleRepository>,
    }

    async fn harness(gateway: MockPiPaymentGateway, payer: &User) -> Harness {
        let payments = Arc::new(InMemoryPaymentRepository::new());
        let users = Arc::new(InMemoryUserRepository::new());
        let articles = Arc::new(InMemoryArticleRepository::new());
        users.insert(payer).await.expect("seed payer");
        Harness {
            service: PaymentService::new(
                payments.clone(),
                users.clone(),
                articles.clone(),
                Arc::new(gateway),
            ),
            payments,
            users,
            articles,
        }
    }

    fn payment_id() -> PiPaymentId {
        PiPaymentId::new("payment-abc").expect("valid id")
    }

    #[tokio::test]
    async fn verification_activates_the_subscription_once() {
        let payer = payer();
        let mut gateway = MockPiPaymentGateway::new();
        gateway
            .expect_fetch_payment()
            .times(1)
            .returning(|_| Ok(platform_payment(1.5, true, true)));
        let harness = harness(gateway, &payer).await;

        let outcome = harness
            .service
            .verify(
                &payer,
                payment_id(),
                PaymentPurpose::Subscription { plan: Plan::Basic },
            )
            .await
            .expect("verification succeeds");
        assert!(!outcome.replayed);
        assert_eq!(outcome.record.state(), PaymentState::Verified);

        let subscriber = harness
            .users
            .find_by_id(payer.id())
            .await
            .expect("query")
            .expect("payer present");
        assert_eq!(subscriber.subscription().plan(), Plan::Basic);
        let first_end = subscriber.subscription().expires_at;

        // Replay: no second fetch (times(1) above), no double effect.
        let replay = harness
            .service
            .verify(
                &payer,
                payment_id(),
                PaymentPurpose::Subscription { plan: Plan::Basic },
            )
            .await
            .expect("replay succeeds");
        assert!(replay.replayed);
        let after_replay = harness
            .users
            .find_by_id(payer.id())
            .await
            .expect("query")
            .expect("payer present");
        assert_eq!(after_replay.subscription().expires_at, first_end);
    }

    #[tokio::test]
    async fn unverified_platform_payment_is_a_conflict_with_status_details() {
        let payer = payer();
        let mut gateway = MockPiPaymentGateway::new();
        gateway
            .expect_fetch_payment()
            .returning(|_| Ok(platform_payment(1.5, true, false)));
        let harness = harness(gateway, &payer).await;

        let error = harness
            .service
            .verify(
                &payer,
                payment_id(),
                PaymentPurpose::Subscription { plan: Plan::Basic },
            )
            .await
            .expect_err("unverified payment must fail");
        assert_eq!(error.code(), ErrorCode::Conflict);
        let details = error.details().expect("status details attached");
        assert_eq!(details["transactionVerified"], json!(true));
        assert_eq!(details["developerCompleted"], json!(false));
    }

    #[tokio::test]
    async fn underpayment_is_rejected_before_any_effect() {
        let payer = payer();
        let mut gateway = MockPiPaymentGateway::new();
        gateway
            .expect_fetch_payment()
            .returning(|_| Ok(platform_payment(0.5, true, true)));
        let harness = harness(gateway, &payer).await;

        let error = harness
            .service
            .verify(
                &payer,
                payment_id(),
                PaymentPurpose::Subscription { plan: Plan::Basic },
            )
            .await
            .expect_err("underpayment must fail");
        assert_eq!(error.code(), ErrorCode::InvalidRequest);

        let unchanged = harness
            .users
            .find_by_id(payer.id())
            .await
            .expect("query")
            .expect("payer present");
        assert!(unchanged.subscription().plan().is_free());
        assert!(
            harness
                .payments
                .find_by_id(&payment_id())
                .await
                .expect("query")
                .is_none()
        );
    }

    #[tokio::test]
    async fn donations_are_recorded_with_their_target() {
        let payer = payer();
        let author = UserId::random();
        let mut gateway = MockPiPaymentGateway::new();
        gateway
            .expect_fetch_payment()
            .returning(|_| Ok(platform_payment(0.25, true, true)));
        let harness = harness(gateway, &payer).await;

        let now = Utc::now();
        let mut article = Article::draft(
            crate::domain::article::ArticleId::random(),
            author,
            ArticleContent::new("Title", None, "Body", vec![]).expect("valid content"),
            now,
        );
        article.submit(now).expect("submits");
        article.approve(now).expect("approves");
        harness.articles.insert(&article).await.expect("seed article");

        harness
            .service
            .verify(
                &payer,
                payment_id(),
                PaymentPurpose::Donation {
                    article_id: Some(*article.id()),
                },
            )
            .await
            .expect("donation verifies");

        let donations = harness.payments.donations();
        assert_eq!(donations.len(), 1);
        assert_eq!(donations[0].article_id, Some(*article.id()));
        assert_eq!(donations[0].amount.as_micropi(), 250_000);
    }

    #[tokio::test]
    async fn donations_to_missing_articles_are_rejected() {
        let payer = payer();
        let mut gateway = MockPiPaymentGateway::new();
        gateway
            .expect_fetch_payment()
            .returning(|_| Ok(platform_payment(0.25, true, true)));
        let harness = harness(gateway, &payer).await;

        let error = harness
            .service
            .verify(
                &payer,
                payment_id(),
                PaymentPurpose::Donation {
                    article_id: Some(crate::domain::article::ArticleId::random()),
                },
            )
            .await
            .expect_err("missing article must fail");
        assert_eq!(error.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn completion_requires_prior_verification() {
        let payer = payer();
        let gateway = MockPiPaymentGateway::new();
        let harness = harness(gateway, &payer).await;

        let error = harness
            .service
            .complete(
                &payer,
                &payment_id(),
                Txid::new("tx-1").expect("valid txid"),
            )
            .await
            .expect_err("unverified payment cannot complete");
        assert_eq!(error.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn completion_drives_the_gateway_once_and_then_replays() {
        let payer = payer();
        let mut gateway = MockPiPaymentGateway::new();
        gateway
            .expect_fetch_payment()
            .returning(|_| Ok(platform_payment(1.5, true, true)));
        gateway.expect_complete_payment().times(1).returning(|_, _| Ok(()));
        let harness = harness(gateway, &payer).await;

        harness
            .service
            .verify(
                &payer,
                payment_id(),
                PaymentPurpose::Subscription { plan: Plan::Basic },
            )
            .await
            .expect("verification succeeds");

        let txid = Txid::new("tx-1").expect("valid txid");
        let completed = harness
            .service
            .complete(&payer, &payment_id(), txid.clone())
            .await
            .expect("completion succeeds");
        assert!(!completed.replayed);
        assert_eq!(completed.record.state(), PaymentState::Completed);

        let replay = harness
            .service
            .complete(&payer, &payment_id(), txid)
            .await
            .expect("replay succeeds");
        assert!(replay.replayed);
    }

    #[tokio::test]
    async fn other_accounts_cannot_replay_or_complete_a_payment() {
        let payer = payer();
        let mut gateway = MockPiPaymentGateway::new();
        gateway
            .expect_fetch_payment()
            .returning(|_| Ok(platform_payment(1.5, true, true)));
        let harness = harness(gateway, &payer).await;

        harness
            .service
            .verify(
                &payer,
                payment_id(),
                PaymentPurpose::Subscription { plan: Plan::Basic },
            )
            .await
            .expect("verification succeeds");

        let other = self::payer();
        let error = harness
            .service
            .complete(
                &other,
                &payment_id(),
                Txid::new("tx-1").expect("valid txid"),
            )
            .await
            .expect_err("foreign completion must fail");
        assert_eq!(error.code(), ErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn gateway_outages_surface_as_service_unavailable() {
        let payer = payer();
        let mut gateway = MockPiPaymentGateway::new();
        gateway
            .expect_fetch_payment()
            .returning(|_| Err(PiGatewayError::timeout("deadline exceeded")));
        let harness = harness(gateway, &payer).await;

        let error = harness
            .service
            .verify(
                &payer,
                payment_id(),
                PaymentPurpose::Subscription { plan: Plan::Basic },
            )
            .await
            .expect_err("outage must fail");
        assert_eq!(error.code(), ErrorCode::ServiceUnavailable);
    }
}
