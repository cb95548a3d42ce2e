//! Pi payment records and the verify/complete lifecycle.
//!
//! A payment identifier only enters the system once the Pi platform confirms
//! the transaction (`transaction.verified` and `status.developer_completed`
//! both true). Completion is a second step that is only reachable from a
//! verified record, so the two upstream calls are linked by construction.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::article::ArticleId;
use crate::domain::subscription::Plan;
use crate::domain::user::UserId;

/// Maximum accepted length of a Pi platform payment identifier.
pub const PAYMENT_ID_MAX: usize = 128;
/// Maximum accepted length of a transaction identifier.
pub const TXID_MAX: usize = 128;
/// Micro-Pi per whole Pi.
const MICROPI_PER_PI: f64 = 1_000_000.0;

/// Validation errors for payment components.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaymentValidationError {
    /// The payment identifier was empty after trimming.
    #[error("payment id must not be empty")]
    EmptyPaymentId,
    /// The payment identifier exceeded [`PAYMENT_ID_MAX`].
    #[error("payment id must be at most {max} characters")]
    PaymentIdTooLong {
        /// Maximum accepted length.
        max: usize,
    },
    /// The transaction identifier was empty after trimming.
    #[error("transaction id must not be empty")]
    EmptyTxid,
    /// The transaction identifier exceeded [`TXID_MAX`].
    #[error("transaction id must be at most {max} characters")]
    TxidTooLong {
        /// Maximum accepted length.
        max: usize,
    },
}

/// Conversion failures from the Pi API's decimal amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PiAmountError {
    /// The amount was NaN or infinite.
    #[error("amount must be a finite number")]
    NotFinite,
    /// The amount was negative.
    #[error("amount must not be negative")]
    Negative,
    /// The amount exceeded the representable range.
    #[error("amount is too large")]
    TooLarge,
}

/// A Pi amount held as integral micro-Pi.
///
/// The Pi platform reports decimal amounts; converting at the DTO boundary
/// keeps money arithmetic integral everywhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PiAmount(i64);

impl PiAmount {
    /// Wrap a micro-Pi count.
    pub fn from_micropi(micropi: i64) -> Self {
        Self(micropi)
    }

    /// Convert a decimal Pi amount as reported by the platform.
    pub fn try_from_pi(amount: f64) -> Result<Self, PiAmountError> {
        if !amount.is_finite() {
            return Err(PiAmountError::NotFinite);
        }
        if amount < 0.0 {
            return Err(PiAmountError::Negative);
        }
        let micropi = (amount * MICROPI_PER_PI).round();
        if micropi > i64::MAX as f64 {
            return Err(PiAmountError::TooLarge);
        }
        Ok(Self(micropi as i64))
    }

    /// Micro-Pi count.
    pub fn as_micropi(self) -> i64 {
        self.0
    }

    /// Decimal Pi value for outbound DTOs.
    pub fn as_pi(self) -> f64 {
        self.0 as f64 / MICROPI_PER_PI
    }
}

impl fmt::Display for PiAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_pi())
    }
}

/// Identifier assigned by the Pi platform to a payment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PiPaymentId(String);

impl PiPaymentId {
    /// Validate and construct a [`PiPaymentId`].
    pub fn new(id: impl Into<String>) -> Result<Self, PaymentValidationError> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(PaymentValidationError::EmptyPaymentId);
        }
        if trimmed.chars().count() > PAYMENT_ID_MAX {
            return Err(PaymentValidationError::PaymentIdTooLong {
                max: PAYMENT_ID_MAX,
            });
        }
        Ok(Self(trimmed.to_owned()))
    }
}

impl AsRef<str> for PiPaymentId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for PiPaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<PiPaymentId> for String {
    fn from(value: PiPaymentId) -> Self {
        value.0
    }
}

impl TryFrom<String> for PiPaymentId {
    type Error = PaymentValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Blockchain transaction identifier recorded on completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Txid(String);

impl Txid {
    /// Validate and construct a [`Txid`].
    pub fn new(txid: impl Into<String>) -> Result<Self, PaymentValidationError> {
        let txid = txid.into();
        let trimmed = txid.trim();
        if trimmed.is_empty() {
            return Err(PaymentValidationError::EmptyTxid);
        }
        if trimmed.chars().count() > TXID_MAX {
            return Err(PaymentValidationError::TxidTooLong { max: TXID_MAX });
        }
        Ok(Self(trimmed.to_owned()))
    }
}

impl AsRef<str> for Txid {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl From<Txid> for String {
    fn from(value: Txid) -> Self {
        value.0
    }
}

impl TryFrom<String> for Txid {
    type Error = PaymentValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// What a verified payment buys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PaymentPurpose {
    /// Activate or renew a paid subscription tier.
    Subscription {
        /// The purchased tier.
        plan: Plan,
    },
    /// A donation, optionally earmarked for an article.
    #[serde(rename_all = "camelCase")]
    Donation {
        /// Target article, if any.
        #[serde(skip_serializing_if = "Option::is_none")]
        #[schema(value_type = Option<String>)]
        article_id: Option<ArticleId>,
    },
}

/// Local lifecycle state of a payment record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentState {
    /// The platform confirmed the transaction; completion not yet driven.
    Verified,
    /// Completion was acknowledged by the platform.
    Completed,
}

impl PaymentState {
    /// Stable string form used for persistence.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Verified => "verified",
            Self::Completed => "completed",
        }
    }

    /// Parse the persisted string form.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "verified" => Some(Self::Verified),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

/// Completion attempted on a record that already completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("payment is already completed")]
pub struct AlreadyCompleted;

/// A verified (and possibly completed) Pi payment.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRecord {
    payment_id: PiPaymentId,
    payer: UserId,
    amount: PiAmount,
    memo: Option<String>,
    purpose: PaymentPurpose,
    state: PaymentState,
    payload_fingerprint: String,
    txid: Option<Txid>,
    verified_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl PaymentRecord {
    /// Record a freshly verified payment.
    #[expect(clippy::too_many_arguments, reason = "verification capture point")]
    pub fn verified(
        payment_id: PiPaymentId,
        payer: UserId,
        amount: PiAmount,
        memo: Option<String>,
        purpose: PaymentPurpose,
        payload_fingerprint: String,
        txid: Option<Txid>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            payment_id,
            payer,
            amount,
            memo,
            purpose,
            state: PaymentState::Verified,
            payload_fingerprint,
            txid,
            verified_at: now,
            completed_at: None,
        }
    }

    /// Reassemble a record from persisted state.
    #[expect(clippy::too_many_arguments, reason = "persistence rehydration point")]
    pub fn from_parts(
        payment_id: PiPaymentId,
        payer: UserId,
        amount: PiAmount,
        memo: Option<String>,
        purpose: PaymentPurpose,
        state: PaymentState,
        payload_fingerprint: String,
        txid: Option<Txid>,
        verified_at: DateTime<Utc>,
        completed_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            payment_id,
            payer,
            amount,
            memo,
            purpose,
            state,
            payload_fingerprint,
            txid,
            verified_at,
            completed_at,
        }
    }

    /// Platform payment identifier.
    pub fn payment_id(&self) -> &PiPaymentId {
        &self.payment_id
    }

    /// Paying user.
    pub fn payer(&self) -> &UserId {
        &self.payer
    }

    /// Paid amount.
    pub fn amount(&self) -> PiAmount {
        self.amount
    }

    /// Free-text memo from the platform, if any.
    pub fn memo(&self) -> Option<&str> {
        self.memo.as_deref()
    }

    /// What the payment bought.
    pub fn purpose(&self) -> &PaymentPurpose {
        &self.purpose
    }

    /// Local lifecycle state.
    pub fn state(&self) -> PaymentState {
        self.state
    }

    /// Fingerprint of the upstream payload captured at verification.
    pub fn payload_fingerprint(&self) -> &str {
        self.payload_fingerprint.as_str()
    }

    /// Blockchain transaction id, once known.
    pub fn txid(&self) -> Option<&Txid> {
        self.txid.as_ref()
    }

    /// Verification timestamp.
    pub fn verified_at(&self) -> DateTime<Utc> {
        self.verified_at
    }

    /// Completion timestamp, once completed.
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Mark the record completed with the confirming transaction id.
    pub fn complete(&mut self, txid: Txid, now: DateTime<Utc>) -> Result<(), AlreadyCompleted> {
        if self.state == PaymentState::Completed {
            return Err(AlreadyCompleted);
        }
        self.state = PaymentState::Completed;
        self.txid = Some(txid);
        self.completed_at = Some(now);
        Ok(())
    }
}

/// A recorded donation, derived from a verified donation payment.
#[derive(Debug, Clone, PartialEq)]
pub struct DonationRecord {
    /// Donation identifier.
    pub id: Uuid,
    /// Donating user.
    pub donor: UserId,
    /// Donated amount.
    pub amount: PiAmount,
    /// Target article, if earmarked.
    pub article_id: Option<ArticleId>,
    /// Originating payment.
    pub payment_id: PiPaymentId,
    /// Recording timestamp.
    pub created_at: DateTime<Utc>,
}

/// Stable fingerprint of an upstream payment payload.
///
/// Object keys are sorted recursively before hashing so the digest does not
/// depend on upstream field order. Replayed verifications compare
/// fingerprints to detect upstream divergence.
pub fn fingerprint_payload(payload: &serde_json::Value) -> String {
    let canonical = canonicalize(payload).to_string();
    let digest = Sha256::digest(canonical.as_bytes());
    hex::encode(digest)
}

fn canonicalize(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut entries: Vec<(&String, &serde_json::Value)> = map.iter().collect();
            entries.sort_by_key(|(key, _)| key.as_str());
            let mut sorted = serde_json::Map::new();
            for (key, entry) in entries {
                sorted.insert(key.clone(), canonicalize(entry));
            }
            serde_json::Value::Object(sorted)
        }
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.iter().map(canonicalize).collect())
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(0.0, 0)]
    #[case(1.0, 1_000_000)]
    #[case(3.141592, 3_141_592)]
    #[case(0.000_000_4, 0)]
    #[case(0.000_000_6, 1)]
    fn pi_amounts_convert_to_micropi(#[case] pi: f64, #[case] micropi: i64) {
        let amount = PiAmount::try_from_pi(pi).expect("valid amount");
        assert_eq!(amount.as_micropi(), micropi);
    }

    #[rstest]
    #[case(f64::NAN, PiAmountError::NotFinite)]
    #[case(f64::INFINITY, PiAmountError::NotFinite)]
    #[case(-0.5, PiAmountError::Negative)]
    #[case(1e19, PiAmountError::TooLarge)]
    fn bad_pi_amounts_are_rejected(#[case] pi: f64, #[case] expected: PiAmountError) {
        assert_eq!(PiAmount::try_from_pi(pi), Err(expected));
    }

    #[test]
    fn payment_ids_are_trimmed_and_bounded() {
        let id = PiPaymentId::new("  payment-abc  ").expect("valid id");
        assert_eq!(id.as_ref(), "payment-abc");
        assert_eq!(
            PiPaymentId::new("").map(|_| ()),
            Err(PaymentValidationError::EmptyPaymentId)
        );
        assert_eq!(
            PiPaymentId::new("x".repeat(PAYMENT_ID_MAX + 1)).map(|_| ()),
            Err(PaymentValidationError::PaymentIdTooLong {
                max: PAYMENT_ID_MAX
            })
        );
    }

    fn verified_record() -> PaymentRecord {
        PaymentRecord::verified(
            PiPaymentId::new("payment-abc").expect("valid id"),
            UserId::random(),
            PiAmount::from_micropi(1_000_000),
            Some("subscription".to_owned()),
            PaymentPurpose::Subscription { plan: Plan::Basic },
            fingerprint_payload(&json!({"amount": 1.0})),
            None,
            Utc::now(),
        )
    }

    #[test]
    fn completion_is_one_way() {
        let mut record = verified_record();
        let txid = Txid::new("tx-1").expect("valid txid");
        record
            .complete(txid, Utc::now())
            .expect("verified record completes");
        assert_eq!(record.state(), PaymentState::Completed);
        assert!(record.completed_at().is_some());

        let again = Txid::new("tx-2").expect("valid txid");
        assert_eq!(record.complete(again, Utc::now()), Err(AlreadyCompleted));
        assert_eq!(record.txid().map(AsRef::as_ref), Some("tx-1"));
    }

    #[test]
    fn fingerprints_are_order_insensitive() {
        let a = json!({"amount": 1.0, "memo": "sub"});
        let b = json!({"memo": "sub", "amount": 1.0});
        assert_eq!(fingerprint_payload(&a), fingerprint_payload(&b));
        assert_ne!(
            fingerprint_payload(&a),
            fingerprint_payload(&json!({"amount": 2.0, "memo": "sub"}))
        );
    }

    #[test]
    fn purpose_serialises_with_a_kind_tag() {
        let purpose = PaymentPurpose::Subscription { plan: Plan::Premium };
        let value = serde_json::to_value(&purpose).expect("purpose serialises");
        assert_eq!(value["kind"], json!("subscription"));
        assert_eq!(value["plan"], json!("premium"));
    }
}
