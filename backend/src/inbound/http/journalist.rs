//! Journalist application API handlers.
//!
//! ```text
//! POST /api/v1/journalist/applications       Apply to become a journalist
//! GET  /api/v1/journalist/applications/mine  Own application history
//! ```

use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};

use crate::domain::Error;
use crate::domain::journalist::{Statement, parse_portfolio_url};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ApplicationDto;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// Application request body.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationRequest {
    /// Motivation statement.
    pub statement: String,
    /// Optional portfolio link.
    #[serde(default)]
    pub portfolio_url: Option<String>,
}

/// Apply to become a journalist.
#[utoipa::path(
    post,
    path = "/api/v1/journalist/applications",
    request_body = ApplicationRequest,
    responses(
        (status = 201, description = "Application opened", body = ApplicationDto),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 409, description = "Already pending or already an author", body = Error)
    ),
    tags = ["journalist"],
    operation_id = "applyForJournalist"
)]
#[post("/journalist/applications")]
pub async fn apply(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<ApplicationRequest>,
) -> ApiResult<HttpResponse> {
    let user = state.current_user(&session).await?;
    let payload = payload.into_inner();
    let statement = Statement::new(payload.statement)
        .map_err(|err| Error::invalid_request(err.to_string()))?;
    let portfolio_url = parse_portfolio_url(payload.portfolio_url.as_deref())
        .map_err(|err| Error::invalid_request(err.to_string()))?;
    let application = state
        .journalists
        .apply(&user, statement, portfolio_url)
        .await?;
    Ok(HttpResponse::Created().json(ApplicationDto::from(&application)))
}

/// Own application history, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/journalist/applications/mine",
    responses(
        (status = 200, description = "Applications", body = [ApplicationDto]),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["journalist"],
    operation_id = "listMyApplications"
)]
#[get("/journalist/applications/mine")]
pub async fn list_my_applications(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<Vec<ApplicationDto>>> {
    let user = state.current_user(&session).await?;
    let applications = state.journalists.my_applications(&user).await?;
    Ok(web::Json(
        applications.iter().map(ApplicationDto::from).collect(),
    ))
}
