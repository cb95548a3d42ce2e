//! HTTP inbound adapter exposing REST endpoints.

pub mod admin;
pub mod articles;
pub mod error;
pub mod health;
pub mod journalist;
pub mod market;
pub mod payments;
pub mod schemas;
pub mod session;
pub mod state;
pub mod storage;
pub mod subscriptions;
pub mod tasks;
#[cfg(test)]
pub mod test_utils;
pub mod users;

pub use error::ApiResult;

use actix_web::{Scope, web};

/// Assemble every `/api/v1` route.
///
/// Session middleware and [`state::HttpState`] are attached by the caller so
/// the same scope serves production wiring and test harnesses.
pub fn api_scope() -> Scope {
    web::scope("/api/v1")
        // auth
        .service(users::register)
        .service(users::login)
        .service(users::logout)
        .service(users::me)
        .service(users::set_wallet)
        // articles: fixed paths before `{id}` so they match first
        .service(articles::list_my_articles)
        .service(articles::create_article)
        .service(articles::list_articles)
        .service(articles::submit_article)
        .service(articles::revise_article)
        .service(articles::like_article)
        .service(articles::update_article)
        .service(articles::delete_article)
        .service(articles::get_article)
        // journalist workflow
        .service(journalist::apply)
        .service(journalist::list_my_applications)
        // admin back office
        .service(admin::list_users)
        .service(admin::disable_user)
        .service(admin::enable_user)
        .service(admin::list_applications)
        .service(admin::approve_application)
        .service(admin::reject_application)
        .service(admin::list_pending_articles)
        .service(admin::approve_article)
        .service(admin::reject_article)
        // payments and subscriptions
        .service(payments::verify_payment)
        .service(payments::complete_payment)
        .service(payments::list_my_payments)
        .service(subscriptions::get_subscription)
        .service(subscriptions::cancel_subscription)
        // market data
        .service(market::market_news)
        .service(market::market_prices)
        // tasks
        .service(tasks::list_tasks)
        .service(tasks::create_task)
        .service(tasks::complete_task)
        .service(tasks::reopen_task)
        .service(tasks::update_task)
        .service(tasks::delete_task)
        // storage
        .service(storage::upload_asset)
        .service(storage::get_asset)
}
