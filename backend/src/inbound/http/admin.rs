//! Admin back-office API handlers. Every endpoint requires the admin role.
//!
//! ```text
//! GET  /api/v1/admin/users                        Paginated accounts
//! POST /api/v1/admin/users/{id}/disable           Block an account
//! POST /api/v1/admin/users/{id}/enable            Unblock an account
//! GET  /api/v1/admin/applications                 Pending applications
//! POST /api/v1/admin/applications/{id}/approve    Approve and promote
//! POST /api/v1/admin/applications/{id}/reject     Decline
//! GET  /api/v1/admin/articles                     Pending review queue
//! POST /api/v1/admin/articles/{id}/approve        Publish
//! POST /api/v1/admin/articles/{id}/reject         Reject with a reason
//! ```

use actix_web::{get, post, web};
use pagination::Page;
use serde::{Deserialize, Serialize};

use crate::domain::Error;
use crate::domain::article::{ArticleId, RejectionReason};
use crate::domain::journalist::ApplicationId;
use crate::domain::user::UserId;
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::{ApplicationDto, ArticleDto, PageQuery, UserDto};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// Rejection request body.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RejectArticleRequest {
    /// Reviewer feedback for the author.
    pub reason: String,
}

fn parse_user_id(raw: &str) -> Result<UserId, Error> {
    UserId::new(raw).map_err(|err| Error::invalid_request(err.to_string()))
}

fn parse_application_id(raw: &str) -> Result<ApplicationId, Error> {
    ApplicationId::new(raw).map_err(|err| Error::invalid_request(err.to_string()))
}

fn parse_article_id(raw: &str) -> Result<ArticleId, Error> {
    ArticleId::new(raw).map_err(|err| Error::invalid_request(err.to_string()))
}

/// Paginated account listing.
#[utoipa::path(
    get,
    path = "/api/v1/admin/users",
    params(PageQuery),
    responses(
        (status = 200, description = "Accounts", body = Page<UserDto>),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Admin role required", body = Error)
    ),
    tags = ["admin"],
    operation_id = "adminListUsers"
)]
#[get("/admin/users")]
pub async fn list_users(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<PageQuery>,
) -> ApiResult<web::Json<Page<UserDto>>> {
    let admin = state.current_user(&session).await?;
    let page = query.into_inner().into_request()?;
    let users = state.accounts.list_users(&admin, page).await?;
    Ok(web::Json(users.map(|user| UserDto::from(&user))))
}

/// Block an account from authenticating.
#[utoipa::path(
    post,
    path = "/api/v1/admin/users/{id}/disable",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "Updated account", body = UserDto),
        (status = 403, description = "Admin role required", body = Error),
        (status = 404, description = "Not found", body = Error)
    ),
    tags = ["admin"],
    operation_id = "adminDisableUser"
)]
#[post("/admin/users/{id}/disable")]
pub async fn disable_user(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<UserDto>> {
    let admin = state.current_user(&session).await?;
    let target = parse_user_id(&path)?;
    let user = state.accounts.set_disabled(&admin, &target, true).await?;
    Ok(web::Json(UserDto::from(&user)))
}

/// Unblock an account.
#[utoipa::path(
    post,
    path = "/api/v1/admin/users/{id}/enable",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "Updated account", body = UserDto),
        (status = 403, description = "Admin role required", body = Error),
        (status = 404, description = "Not found", body = Error)
    ),
    tags = ["admin"],
    operation_id = "adminEnableUser"
)]
#[post("/admin/users/{id}/enable")]
pub async fn enable_user(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<UserDto>> {
    let admin = state.current_user(&session).await?;
    let target = parse_user_id(&path)?;
    let user = state.accounts.set_disabled(&admin, &target, false).await?;
    Ok(web::Json(UserDto::from(&user)))
}

/// Pending journalist applications in arrival order.
#[utoipa::path(
    get,
    path = "/api/v1/admin/applications",
    params(PageQuery),
    responses(
        (status = 200, description = "Pending applications", body = Page<ApplicationDto>),
        (status = 403, description = "Admin role required", body = Error)
    ),
    tags = ["admin"],
    operation_id = "adminListApplications"
)]
#[get("/admin/applications")]
pub async fn list_applications(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<PageQuery>,
) -> ApiResult<web::Json<Page<ApplicationDto>>> {
    let admin = state.current_user(&session).await?;
    let page = query.into_inner().into_request()?;
    let applications = state.journalists.pending_queue(&admin, page).await?;
    Ok(web::Json(
        applications.map(|application| ApplicationDto::from(&application)),
    ))
}

/// Approve an application and promote the applicant.
#[utoipa::path(
    post,
    path = "/api/v1/admin/applications/{id}/approve",
    params(("id" = String, Path, description = "Application id")),
    responses(
        (status = 200, description = "Approved application", body = ApplicationDto),
        (status = 403, description = "Admin role required", body = Error),
        (status = 404, description = "Not found", body = Error),
        (status = 409, description = "Already decided", body = Error)
    ),
    tags = ["admin"],
    operation_id = "adminApproveApplication"
)]
#[post("/admin/applications/{id}/approve")]
pub async fn approve_application(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<ApplicationDto>> {
    let admin = state.current_user(&session).await?;
    let id = parse_application_id(&path)?;
    let application = state.journalists.approve(&admin, &id).await?;
    Ok(web::Json(ApplicationDto::from(&application)))
}

/// Decline an application.
#[utoipa::path(
    post,
    path = "/api/v1/admin/applications/{id}/reject",
    params(("id" = String, Path, description = "Application id")),
    responses(
        (status = 200, description = "Rejected application", body = ApplicationDto),
        (status = 403, description = "Admin role required", body = Error),
        (status = 404, description = "Not found", body = Error),
        (status = 409, description = "Already decided", body = Error)
    ),
    tags = ["admin"],
    operation_id = "adminRejectApplication"
)]
#[post("/admin/applications/{id}/reject")]
pub async fn reject_application(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<ApplicationDto>> {
    let admin = state.current_user(&session).await?;
    let id = parse_application_id(&path)?;
    let application = state.journalists.reject(&admin, &id).await?;
    Ok(web::Json(ApplicationDto::from(&application)))
}

/// Articles waiting for review, in arrival order.
#[utoipa::path(
    get,
    path = "/api/v1/admin/articles",
    params(PageQuery),
    responses(
        (status = 200, description = "Pending articles", body = Page<ArticleDto>),
        (status = 403, description = "Admin role required", body = Error)
    ),
    tags = ["admin"],
    operation_id = "adminListPendingArticles"
)]
#[get("/admin/articles")]
pub async fn list_pending_articles(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<PageQuery>,
) -> ApiResult<web::Json<Page<ArticleDto>>> {
    let admin = state.current_user(&session).await?;
    let page = query.into_inner().into_request()?;
    let articles = state.articles.review_queue(&admin, page).await?;
    Ok(web::Json(articles.map(|article| ArticleDto::from(&article))))
}

/// Publish a pending article.
#[utoipa::path(
    post,
    path = "/api/v1/admin/articles/{id}/approve",
    params(("id" = String, Path, description = "Article id")),
    responses(
        (status = 200, description = "Published article", body = ArticleDto),
        (status = 400, description = "Invalid status", body = Error),
        (status = 403, description = "Admin role required", body = Error),
        (status = 404, description = "Not found", body = Error)
    ),
    tags = ["admin"],
    operation_id = "adminApproveArticle"
)]
#[post("/admin/articles/{id}/approve")]
pub async fn approve_article(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<ArticleDto>> {
    let admin = state.current_user(&session).await?;
    let id = parse_article_id(&path)?;
    let article = state.articles.approve(&admin, &id).await?;
    Ok(web::Json(ArticleDto::from(&article)))
}

/// Reject a pending article with reviewer feedback.
#[utoipa::path(
    post,
    path = "/api/v1/admin/articles/{id}/reject",
    params(("id" = String, Path, description = "Article id")),
    request_body = RejectArticleRequest,
    responses(
        (status = 200, description = "Rejected article", body = ArticleDto),
        (status = 400, description = "Invalid status or reason", body = Error),
        (status = 403, description = "Admin role required", body = Error),
        (status = 404, description = "Not found", body = Error)
    ),
    tags = ["admin"],
    operation_id = "adminRejectArticle"
)]
#[post("/admin/articles/{id}/reject")]
pub async fn reject_article(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<RejectArticleRequest>,
) -> ApiResult<web::Json<ArticleDto>> {
    let admin = state.current_user(&session).await?;
    let id = parse_article_id(&path)?;
    let reason = RejectionReason::new(payload.into_inner().reason)
        .map_err(|err| Error::invalid_request(err.to_string()))?;
    let article = state.articles.reject(&admin, &id, reason).await?;
    Ok(web::Json(ArticleDto::from(&article)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::user::Role;
    use crate::inbound::http::journalist::ApplicationRequest;
    use crate::inbound::http::test_utils::{TestContext, register_and_login, test_app};
    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use serde_json::Value;

    #[actix_web::test]
    async fn admin_endpoints_reject_non_admins() {
        let ctx = TestContext::new();
        let app = actix_test::init_service(test_app(ctx.state.clone())).await;
        let cookie = register_and_login(&app, "reader").await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/admin/users")
                .cookie(cookie)
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn approving_an_application_promotes_the_applicant() {
        let ctx = TestContext::new();
        let app = actix_test::init_service(test_app(ctx.state.clone())).await;
        let applicant_cookie = register_and_login(&app, "applicant").await;
        let admin_cookie = register_and_login(&app, "the_admin").await;
        ctx.set_role("the_admin", Role::Admin).await;

        let apply = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/v1/journalist/applications")
                .cookie(applicant_cookie.clone())
                .set_json(&ApplicationRequest {
                    statement: "I cover Pi markets.".into(),
                    portfolio_url: None,
                })
                .to_request(),
        )
        .await;
        let application: Value = actix_test::read_body_json(apply).await;
        let id = application.get("id").and_then(Value::as_str).expect("id");

        let queue = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/admin/applications")
                .cookie(admin_cookie.clone())
                .to_request(),
        )
        .await;
        let queue_body: Value = actix_test::read_body_json(queue).await;
        assert_eq!(queue_body.get("total").and_then(Value::as_u64), Some(1));

        let approve = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri(&format!("/api/v1/admin/applications/{id}/approve"))
                .cookie(admin_cookie)
                .to_request(),
        )
        .await;
        assert_eq!(approve.status(), StatusCode::OK);

        let me = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/auth/me")
                .cookie(applicant_cookie)
                .to_request(),
        )
        .await;
        let profile: Value = actix_test::read_body_json(me).await;
        assert_eq!(
            profile.get("role").and_then(Value::as_str),
            Some("journalist")
        );
    }

    #[actix_web::test]
    async fn review_flow_rejects_then_publishes() {
        let ctx = TestContext::new();
        let app = actix_test::init_service(test_app(ctx.state.clone())).await;
        let author_cookie = register_and_login(&app, "author").await;
        ctx.set_role("author", Role::Journalist).await;
        let admin_cookie = register_and_login(&app, "the_admin").await;
        ctx.set_role("the_admin", Role::Admin).await;

        let id = ctx.submit_article(&app, &author_cookie, "Pending story").await;

        let reject = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri(&format!("/api/v1/admin/articles/{id}/reject"))
                .cookie(admin_cookie.clone())
                .set_json(&RejectArticleRequest {
                    reason: "needs sources".into(),
                })
                .to_request(),
        )
        .await;
        assert_eq!(reject.status(), StatusCode::OK);
        let rejected: Value = actix_test::read_body_json(reject).await;
        assert_eq!(
            rejected.get("rejectionReason").and_then(Value::as_str),
            Some("needs sources")
        );

        // Author revises and resubmits; admin approves this time.
        let revise = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri(&format!("/api/v1/articles/{id}/revise"))
                .cookie(author_cookie.clone())
                .to_request(),
        )
        .await;
        assert_eq!(revise.status(), StatusCode::OK);
        let resubmit = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri(&format!("/api/v1/articles/{id}/submit"))
                .cookie(author_cookie)
                .to_request(),
        )
        .await;
        assert_eq!(resubmit.status(), StatusCode::OK);

        let approve = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri(&format!("/api/v1/admin/articles/{id}/approve"))
                .cookie(admin_cookie)
                .to_request(),
        )
        .await;
        assert_eq!(approve.status(), StatusCode::OK);
        let published: Value = actix_test::read_body_json(approve).await;
        assert_eq!(
            published.get("status").and_then(Value::as_str),
            Some("published")
        );
        assert!(published.get("rejectionReason").is_none());
        assert!(published.get("publishedAt").is_some());
    }

    #[actix_web::test]
    async fn disabling_a_user_locks_them_out() {
        let ctx = TestContext::new();
        let app = actix_test::init_service(test_app(ctx.state.clone())).await;
        let _ = register_and_login(&app, "reader").await;
        let admin_cookie = register_and_login(&app, "the_admin").await;
        ctx.set_role("the_admin", Role::Admin).await;

        let reader_id = ctx.user_id("reader").await;
        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri(&format!("/api/v1/admin/users/{reader_id}/disable"))
                .cookie(admin_cookie)
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(body.get("disabled").and_then(Value::as_bool), Some(true));

        let login = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/v1/auth/login")
                .set_json(&crate::inbound::http::users::LoginRequest {
                    username: "reader".into(),
                    password: "secret password".into(),
                })
                .to_request(),
        )
        .await;
        assert_eq!(login.status(), StatusCode::UNAUTHORIZED);
    }
}
