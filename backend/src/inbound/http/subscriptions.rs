//! Subscription API handlers.
//!
//! Paid tiers are activated through payment verification; these endpoints
//! only expose and cancel the current state.
//!
//! ```text
//! GET  /api/v1/subscription
//! POST /api/v1/subscription/cancel
//! ```

use actix_web::{get, post, web};

use crate::domain::Error;
use crate::domain::subscription::Subscription;
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// Current subscription state.
#[utoipa::path(
    get,
    path = "/api/v1/subscription",
    responses(
        (status = 200, description = "Subscription", body = Subscription),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["subscription"],
    operation_id = "getSubscription"
)]
#[get("/subscription")]
pub async fn get_subscription(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<Subscription>> {
    let user_id = session.require_user_id()?;
    let subscription = state.accounts.subscription(&user_id).await?;
    Ok(web::Json(subscription))
}

/// Cancel the paid tier. Access continues until the end date.
#[utoipa::path(
    post,
    path = "/api/v1/subscription/cancel",
    responses(
        (status = 200, description = "Cancelled subscription", body = Subscription),
        (status = 400, description = "No paid subscription", body = Error),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["subscription"],
    operation_id = "cancelSubscription"
)]
#[post("/subscription/cancel")]
pub async fn cancel_subscription(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<Subscription>> {
    let user_id = session.require_user_id()?;
    let subscription = state.accounts.cancel_subscription(&user_id).await?;
    Ok(web::Json(subscription))
}
