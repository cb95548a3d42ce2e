//! Pi payment API handlers.
//!
//! ```text
//! POST /api/v1/payments/verify   {"paymentId":"...","purpose":{"kind":"subscription","plan":"basic"}}
//! POST /api/v1/payments/complete {"paymentId":"...","txid":"..."}
//! GET  /api/v1/payments/mine
//! ```

use actix_web::{HttpResponse, get, post, web};
use pagination::Page;
use serde::{Deserialize, Serialize};

use crate::domain::Error;
use crate::domain::payment::{PaymentPurpose, PiPaymentId, Txid};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::{PageQuery, PaymentDto};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// Verification request body.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    /// Platform payment identifier.
    pub payment_id: String,
    /// What the payment buys.
    pub purpose: PaymentPurpose,
}

/// Completion request body.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompleteRequest {
    /// Platform payment identifier.
    pub payment_id: String,
    /// Confirming blockchain transaction id.
    pub txid: String,
}

/// Verification/completion response envelope.
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    /// The recorded payment.
    pub payment: PaymentDto,
    /// Whether this request replayed an earlier outcome.
    pub replayed: bool,
}

fn parse_payment_id(raw: String) -> Result<PiPaymentId, Error> {
    PiPaymentId::new(raw).map_err(|err| Error::invalid_request(err.to_string()))
}

/// Verify a payment with the Pi platform and record it.
#[utoipa::path(
    post,
    path = "/api/v1/payments/verify",
    request_body = VerifyRequest,
    responses(
        (status = 200, description = "Payment verified (or replayed)", body = PaymentResponse),
        (status = 400, description = "Invalid request or underpayment", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Unknown payment or donation target", body = Error),
        (status = 409, description = "Platform has not verified the payment", body = Error),
        (status = 503, description = "Pi platform unavailable", body = Error)
    ),
    tags = ["payments"],
    operation_id = "verifyPayment"
)]
#[post("/payments/verify")]
pub async fn verify_payment(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<VerifyRequest>,
) -> ApiResult<HttpResponse> {
    let user = state.current_user(&session).await?;
    let payload = payload.into_inner();
    let payment_id = parse_payment_id(payload.payment_id)?;
    let outcome = state
        .payments
        .verify(&user, payment_id, payload.purpose)
        .await?;
    Ok(HttpResponse::Ok().json(PaymentResponse {
        payment: PaymentDto::from(&outcome.record),
        replayed: outcome.replayed,
    }))
}

/// Complete a previously verified payment.
#[utoipa::path(
    post,
    path = "/api/v1/payments/complete",
    request_body = CompleteRequest,
    responses(
        (status = 200, description = "Payment completed (or replayed)", body = PaymentResponse),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Payment belongs to another account", body = Error),
        (status = 404, description = "Payment was never verified here", body = Error),
        (status = 503, description = "Pi platform unavailable", body = Error)
    ),
    tags = ["payments"],
    operation_id = "completePayment"
)]
#[post("/payments/complete")]
pub async fn complete_payment(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<CompleteRequest>,
) -> ApiResult<HttpResponse> {
    let user = state.current_user(&session).await?;
    let payload = payload.into_inner();
    let payment_id = parse_payment_id(payload.payment_id)?;
    let txid = Txid::new(payload.txid).map_err(|err| Error::invalid_request(err.to_string()))?;
    let outcome = state.payments.complete(&user, &payment_id, txid).await?;
    Ok(HttpResponse::Ok().json(PaymentResponse {
        payment: PaymentDto::from(&outcome.record),
        replayed: outcome.replayed,
    }))
}

/// The caller's payment history.
#[utoipa::path(
    get,
    path = "/api/v1/payments/mine",
    params(PageQuery),
    responses(
        (status = 200, description = "Payments", body = Page<PaymentDto>),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["payments"],
    operation_id = "listMyPayments"
)]
#[get("/payments/mine")]
pub async fn list_my_payments(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<PageQuery>,
) -> ApiResult<web::Json<Page<PaymentDto>>> {
    let user = state.current_user(&session).await?;
    let page = query.into_inner().into_request()?;
    let payments = state.payments.history(&user, page).await?;
    Ok(web::Json(payments.map(|record| PaymentDto::from(&record))))
}
