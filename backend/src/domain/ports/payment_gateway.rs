//! Driven port for the Pi Network payments API.
//!
//! The payment service consumes this port; the reqwest adapter in
//! `outbound::pi` implements it. Shapes mirror the platform's payment
//! resource: an `amount`/`memo`/`metadata` header, an optional blockchain
//! `transaction`, and a block of status booleans.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::payment::{PiPaymentId, Txid};

/// Failures surfaced by the payments API adapter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PiGatewayError {
    /// The platform could not be reached.
    #[error("pi platform unreachable: {message}")]
    Transport {
        /// Adapter-provided context.
        message: String,
    },
    /// The request timed out.
    #[error("pi platform timed out: {message}")]
    Timeout {
        /// Adapter-provided context.
        message: String,
    },
    /// The platform throttled us.
    #[error("pi platform rate limited: {message}")]
    RateLimited {
        /// Adapter-provided context.
        message: String,
    },
    /// The API key was rejected.
    #[error("pi platform rejected credentials: {message}")]
    Unauthorized {
        /// Adapter-provided context.
        message: String,
    },
    /// The platform does not know this payment.
    #[error("payment not found on pi platform: {message}")]
    NotFound {
        /// Adapter-provided context.
        message: String,
    },
    /// The platform rejected the request as malformed.
    #[error("pi platform rejected request: {message}")]
    InvalidRequest {
        /// Adapter-provided context.
        message: String,
    },
    /// The response body failed to decode.
    #[error("pi platform response undecodable: {message}")]
    Decode {
        /// Adapter-provided context.
        message: String,
    },
}

impl PiGatewayError {
    /// Create a transport error with the given message.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a timeout error with the given message.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    /// Create a rate-limit error with the given message.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::RateLimited {
            message: message.into(),
        }
    }

    /// Create an unauthorized error with the given message.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Create a not-found error with the given message.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create an invalid-request error with the given message.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create a decode error with the given message.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }
}

/// Blockchain transaction attached to a platform payment.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayTransaction {
    /// Transaction identifier on chain.
    pub txid: String,
    /// Whether the platform has verified the transaction.
    pub verified: bool,
}

/// Status booleans reported by the platform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GatewayStatus {
    /// The developer approved the payment.
    pub developer_approved: bool,
    /// The platform verified the blockchain transaction.
    pub transaction_verified: bool,
    /// The developer acknowledged the payment server-side.
    pub developer_completed: bool,
    /// The payment was cancelled.
    pub cancelled: bool,
    /// The paying user cancelled.
    pub user_cancelled: bool,
}

/// A payment resource fetched from the platform.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayPayment {
    /// Platform payment identifier.
    pub identifier: String,
    /// Decimal Pi amount as reported by the platform.
    pub amount: f64,
    /// Free-text memo attached by the client.
    pub memo: Option<String>,
    /// Developer metadata attached at payment creation.
    pub metadata: Option<Value>,
    /// Blockchain transaction, once one exists.
    pub transaction: Option<GatewayTransaction>,
    /// Status booleans.
    pub status: GatewayStatus,
    /// The raw response payload, kept for fingerprinting.
    pub raw: Value,
}

impl GatewayPayment {
    /// The exact predicate the verification flow requires: the blockchain
    /// transaction is verified and the developer completed the payment.
    pub fn is_verified(&self) -> bool {
        self.transaction.as_ref().is_some_and(|tx| tx.verified)
            && self.status.developer_completed
    }
}

/// Driven port for the Pi payments API.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PiPaymentGateway: Send + Sync {
    /// Fetch a payment resource by identifier.
    async fn fetch_payment(
        &self,
        payment_id: &PiPaymentId,
    ) -> Result<GatewayPayment, PiGatewayError>;

    /// Acknowledge completion of a payment with its transaction id.
    async fn complete_payment(
        &self,
        payment_id: &PiPaymentId,
        txid: &Txid,
    ) -> Result<(), PiGatewayError>;
}
