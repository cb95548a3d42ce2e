//! Account API handlers.
//!
//! ```text
//! POST /api/v1/auth/register {"username":"reader","displayName":"Reader One","password":"..."}
//! POST /api/v1/auth/login    {"username":"reader","password":"..."}
//! POST /api/v1/auth/logout
//! GET  /api/v1/auth/me
//! PUT  /api/v1/auth/wallet   {"walletAddress":"GABC..."}
//! ```

use actix_web::{HttpResponse, get, post, put, web};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::domain::auth::{LoginCredentials, LoginValidationError, Password};
use crate::domain::user::{DisplayName, UserValidationError, Username, WalletAddress};
use crate::domain::{Error, Registration};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::UserDto;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// Registration request body.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    /// Requested login name.
    pub username: String,
    /// Display name shown to other users.
    pub display_name: String,
    /// Password, at least 8 characters.
    pub password: String,
}

/// Login request body.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    /// Login name.
    pub username: String,
    /// Password.
    pub password: String,
}

/// Wallet update request body.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WalletRequest {
    /// New wallet address, or `null` to unlink.
    pub wallet_address: Option<String>,
}

fn map_user_validation_error(field: &str, err: UserValidationError) -> Error {
    Error::invalid_request(err.to_string()).with_details(json!({ "field": field }))
}

fn map_login_validation_error(err: LoginValidationError) -> Error {
    match err {
        LoginValidationError::InvalidUsername => Error::invalid_request("username is not valid")
            .with_details(json!({ "field": "username" })),
        LoginValidationError::EmptyPassword => {
            Error::invalid_request("password must not be empty")
                .with_details(json!({ "field": "password" }))
        }
    }
}

/// Create a public-role account and establish a session.
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = UserDto),
        (status = 400, description = "Invalid request", body = Error),
        (status = 409, description = "Username taken", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["auth"],
    operation_id = "register",
    security([])
)]
#[post("/auth/register")]
pub async fn register(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<RegisterRequest>,
) -> ApiResult<HttpResponse> {
    let payload = payload.into_inner();
    let registration = Registration {
        username: Username::new(payload.username)
            .map_err(|err| map_user_validation_error("username", err))?,
        display_name: DisplayName::new(payload.display_name)
            .map_err(|err| map_user_validation_error("displayName", err))?,
        password: Password::new(payload.password)
            .map_err(|err| map_user_validation_error("password", err))?,
    };
    let user = state.accounts.register(registration).await?;
    session.persist_user(user.id())?;
    Ok(HttpResponse::Created().json(UserDto::from(&user)))
}

/// Authenticate and establish a session.
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login success", body = UserDto,
            headers(("Set-Cookie" = String, description = "Session cookie"))),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Invalid credentials or disabled account", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["auth"],
    operation_id = "login",
    security([])
)]
#[post("/auth/login")]
pub async fn login(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<LoginRequest>,
) -> ApiResult<HttpResponse> {
    let credentials = LoginCredentials::try_from_parts(&payload.username, &payload.password)
        .map_err(map_login_validation_error)?;
    let user = state.accounts.authenticate(&credentials).await?;
    session.persist_user(user.id())?;
    Ok(HttpResponse::Ok().json(UserDto::from(&user)))
}

/// Drop the session.
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    responses((status = 204, description = "Logged out")),
    tags = ["auth"],
    operation_id = "logout"
)]
#[post("/auth/logout")]
pub async fn logout(session: SessionContext) -> HttpResponse {
    session.clear();
    HttpResponse::NoContent().finish()
}

/// Current account profile.
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    responses(
        (status = 200, description = "Profile", body = UserDto),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["auth"],
    operation_id = "me"
)]
#[get("/auth/me")]
pub async fn me(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<UserDto>> {
    let user = state.current_user(&session).await?;
    Ok(web::Json(UserDto::from(&user)))
}

/// Link or unlink the caller's Pi wallet address.
#[utoipa::path(
    put,
    path = "/api/v1/auth/wallet",
    request_body = WalletRequest,
    responses(
        (status = 200, description = "Updated profile", body = UserDto),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["auth"],
    operation_id = "setWallet"
)]
#[put("/auth/wallet")]
pub async fn set_wallet(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<WalletRequest>,
) -> ApiResult<web::Json<UserDto>> {
    let user_id = session.require_user_id()?;
    let address = match &payload.wallet_address {
        Some(raw) => Some(
            WalletAddress::new(raw.clone())
                .map_err(|err| map_user_validation_error("walletAddress", err))?,
        ),
        None => None,
    };
    let user = state.accounts.set_wallet_address(&user_id, address).await?;
    Ok(web::Json(UserDto::from(&user)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inbound::http::test_utils::{TestContext, register_and_login, test_app};
    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use serde_json::Value;

    #[actix_web::test]
    async fn register_login_me_round_trips() {
        let ctx = TestContext::new();
        let app = actix_test::init_service(test_app(ctx.state.clone())).await;

        let register_res = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/v1/auth/register")
                .set_json(&RegisterRequest {
                    username: "reader".into(),
                    display_name: "Reader One".into(),
                    password: "secret password".into(),
                })
                .to_request(),
        )
        .await;
        assert_eq!(register_res.status(), StatusCode::CREATED);

        let login_res = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/v1/auth/login")
                .set_json(&LoginRequest {
                    username: "reader".into(),
                    password: "secret password".into(),
                })
                .to_request(),
        )
        .await;
        assert_eq!(login_res.status(), StatusCode::OK);
        let cookie = login_res
            .response()
            .cookies()
            .find(|c| c.name() == "session")
            .expect("session cookie")
            .into_owned();

        let me_res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/auth/me")
                .cookie(cookie)
                .to_request(),
        )
        .await;
        assert_eq!(me_res.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(me_res).await;
        assert_eq!(body.get("username").and_then(Value::as_str), Some("reader"));
        assert_eq!(body.get("role").and_then(Value::as_str), Some("public"));
        assert!(body.get("passwordHash").is_none());
    }

    #[actix_web::test]
    async fn duplicate_username_is_a_conflict() {
        let ctx = TestContext::new();
        let app = actix_test::init_service(test_app(ctx.state.clone())).await;
        let _ = register_and_login(&app, "reader").await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/v1/auth/register")
                .set_json(&RegisterRequest {
                    username: "reader".into(),
                    display_name: "Reader Two".into(),
                    password: "secret password".into(),
                })
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }

    #[actix_web::test]
    async fn disabled_accounts_cannot_login() {
        let ctx = TestContext::new();
        let app = actix_test::init_service(test_app(ctx.state.clone())).await;
        let _ = register_and_login(&app, "reader").await;

        ctx.disable_user("reader").await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/v1/auth/login")
                .set_json(&LoginRequest {
                    username: "reader".into(),
                    password: "secret password".into(),
                })
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(
            body.get("details")
                .and_then(|d| d.get("code"))
                .and_then(Value::as_str),
            Some("account_disabled")
        );
    }

    #[actix_web::test]
    async fn me_requires_a_session() {
        let ctx = TestContext::new();
        let app = actix_test::init_service(test_app(ctx.state.clone())).await;
        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/auth/me")
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn wallet_can_be_linked_and_unlinked() {
        let ctx = TestContext::new();
        let app = actix_test::init_service(test_app(ctx.state.clone())).await;
        let cookie = register_and_login(&app, "reader").await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::put()
                .uri("/api/v1/auth/wallet")
                .cookie(cookie.clone())
                .set_json(&WalletRequest {
                    wallet_address: Some("GABC123".into()),
                })
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(
            body.get("walletAddress").and_then(Value::as_str),
            Some("GABC123")
        );

        let unlink = actix_test::call_service(
            &app,
            actix_test::TestRequest::put()
                .uri("/api/v1/auth/wallet")
                .cookie(cookie)
                .set_json(&WalletRequest {
                    wallet_address: None,
                })
                .to_request(),
        )
        .await;
        assert_eq!(unlink.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(unlink).await;
        assert!(body.get("walletAddress").is_none());
    }
}
