//! Wire DTOs for the Pi platform payments API.

use serde::Deserialize;
use serde_json::Value;

use crate::domain::ports::{GatewayPayment, GatewayStatus, GatewayTransaction};

/// Payment resource as returned by `GET /v2/payments/{id}`.
#[derive(Debug, Deserialize)]
pub(super) struct PaymentWireDto {
    pub identifier: String,
    pub amount: f64,
    #[serde(default)]
    pub memo: Option<String>,
    #[serde(default)]
    pub metadata: Option<Value>,
    #[serde(default)]
    pub transaction: Option<TransactionWireDto>,
    #[serde(default)]
    pub status: StatusWireDto,
}

/// Blockchain transaction block.
#[derive(Debug, Deserialize)]
pub(super) struct TransactionWireDto {
    pub txid: String,
    #[serde(default)]
    pub verified: bool,
}

/// Status boolean block.
#[derive(Debug, Default, Deserialize)]
pub(super) struct StatusWireDto {
    #[serde(default)]
    pub developer_approved: bool,
    #[serde(default)]
    pub transaction_verified: bool,
    #[serde(default)]
    pub developer_completed: bool,
    #[serde(default)]
    pub cancelled: bool,
    #[serde(default)]
    pub user_cancelled: bool,
}

impl PaymentWireDto {
    /// Convert into the port type, keeping the raw payload for fingerprinting.
    pub(super) fn into_gateway_payment(self, raw: Value) -> GatewayPayment {
        GatewayPayment {
            identifier: self.identifier,
            amount: self.amount,
            memo: self.memo,
            metadata: self.metadata,
            transaction: self.transaction.map(|tx| GatewayTransaction {
                txid: tx.txid,
                verified: tx.verified,
            }),
            status: GatewayStatus {
                developer_approved: self.status.developer_approved,
                transaction_verified: self.status.transaction_verified,
                developer_completed: self.status.developer_completed,
                cancelled: self.status.cancelled,
                user_cancelled: self.status.user_cancelled,
            },
            raw,
        }
    }
}
