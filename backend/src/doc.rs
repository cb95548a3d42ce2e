//! OpenAPI surface served by Swagger UI and the `openapi-dump` binary.

use utoipa::OpenApi;

use crate::domain::article::ArticleStatus;
use crate::domain::journalist::ApplicationStatus;
use crate::domain::payment::{PaymentPurpose, PaymentState};
use crate::domain::ports::{NewsHeadline, SpotPrice};
use crate::domain::subscription::{Plan, Subscription, SubscriptionStatus};
use crate::domain::task::TaskStatus;
use crate::domain::user::Role;
use crate::domain::{Error, ErrorCode};
use crate::inbound::http::admin::RejectArticleRequest;
use crate::inbound::http::articles::ArticleRequest;
use crate::inbound::http::journalist::ApplicationRequest;
use crate::inbound::http::payments::{CompleteRequest, PaymentResponse, VerifyRequest};
use crate::inbound::http::schemas::{
    ApplicationDto, ArticleDto, PaymentDto, TaskDto, UserDto,
};
use crate::inbound::http::storage::AssetResponse;
use crate::inbound::http::tasks::TaskRequest;
use crate::inbound::http::users::{LoginRequest, RegisterRequest, WalletRequest};

/// Aggregated OpenAPI document for every `/api/v1` endpoint.
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::inbound::http::users::register,
        crate::inbound::http::users::login,
        crate::inbound::http::users::logout,
        crate::inbound::http::users::me,
        crate::inbound::http::users::set_wallet,
        crate::inbound::http::articles::create_article,
        crate::inbound::http::articles::list_articles,
        crate::inbound::http::articles::list_my_articles,
        crate::inbound::http::articles::get_article,
        crate::inbound::http::articles::update_article,
        crate::inbound::http::articles::submit_article,
        crate::inbound::http::articles::revise_article,
        crate::inbound::http::articles::like_article,
        crate::inbound::http::articles::delete_article,
        crate::inbound::http::journalist::apply,
        crate::inbound::http::journalist::list_my_applications,
        crate::inbound::http::admin::list_users,
        crate::inbound::http::admin::disable_user,
        crate::inbound::http::admin::enable_user,
        crate::inbound::http::admin::list_applications,
        crate::inbound::http::admin::approve_application,
        crate::inbound::http::admin::reject_application,
        crate::inbound::http::admin::list_pending_articles,
        crate::inbound::http::admin::approve_article,
        crate::inbound::http::admin::reject_article,
        crate::inbound::http::payments::verify_payment,
        crate::inbound::http::payments::complete_payment,
        crate::inbound::http::payments::list_my_payments,
        crate::inbound::http::subscriptions::get_subscription,
        crate::inbound::http::subscriptions::cancel_subscription,
        crate::inbound::http::market::market_news,
        crate::inbound::http::market::market_prices,
        crate::inbound::http::tasks::create_task,
        crate::inbound::http::tasks::list_tasks,
        crate::inbound::http::tasks::update_task,
        crate::inbound::http::tasks::complete_task,
        crate::inbound::http::tasks::reopen_task,
        crate::inbound::http::tasks::delete_task,
        crate::inbound::http::storage::upload_asset,
        crate::inbound::http::storage::get_asset,
        crate::inbound::http::health::live,
        crate::inbound::http::health::ready,
    ),
    components(schemas(
        Error,
        ErrorCode,
        Role,
        Plan,
        Subscription,
        SubscriptionStatus,
        ArticleStatus,
        ApplicationStatus,
        PaymentPurpose,
        PaymentState,
        TaskStatus,
        UserDto,
        ArticleDto,
        ApplicationDto,
        PaymentDto,
        TaskDto,
        NewsHeadline,
        SpotPrice,
        RegisterRequest,
        LoginRequest,
        WalletRequest,
        ArticleRequest,
        ApplicationRequest,
        RejectArticleRequest,
        VerifyRequest,
        CompleteRequest,
        PaymentResponse,
        TaskRequest,
        AssetResponse,
    )),
    tags(
        (name = "auth", description = "Registration, login, and profile"),
        (name = "articles", description = "Authoring and the public feed"),
        (name = "journalist", description = "Journalist applications"),
        (name = "admin", description = "Back office"),
        (name = "payments", description = "Pi payment verification and completion"),
        (name = "subscription", description = "Subscription state"),
        (name = "market", description = "Crypto news and prices"),
        (name = "tasks", description = "Per-user tasks"),
        (name = "storage", description = "Uploaded assets"),
        (name = "health", description = "Probes"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route_group() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        for expected in [
            "/api/v1/auth/login",
            "/api/v1/articles",
            "/api/v1/admin/users",
            "/api/v1/payments/verify",
            "/api/v1/market/news",
            "/api/v1/tasks",
            "/api/v1/storage",
            "/healthz/ready",
        ] {
            assert!(
                paths.iter().any(|path| path.as_str() == expected),
                "missing {expected} in OpenAPI paths"
            );
        }
    }
}
