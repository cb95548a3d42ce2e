//! Crypto market data API handlers.
//!
//! ```text
//! GET /api/v1/market/news?limit=10
//! GET /api/v1/market/prices?symbols=btc,eth,pi
//! ```
//!
//! Upstream failures surface as typed errors; nothing is masked with
//! placeholder data.

use actix_web::{get, web};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::domain::Error;
use crate::domain::ports::{MarketSourceError, NewsHeadline, SpotPrice, Symbol};
use crate::inbound::http::ApiResult;
use crate::inbound::http::state::HttpState;

/// Default number of headlines returned.
const DEFAULT_NEWS_LIMIT: u32 = 10;
/// Maximum number of headlines returned.
const MAX_NEWS_LIMIT: u32 = 50;
/// Maximum number of symbols per price query.
const MAX_PRICE_SYMBOLS: usize = 20;

/// Map market source failures to domain errors.
fn map_market_error(error: MarketSourceError) -> Error {
    match error {
        MarketSourceError::Transport { message }
        | MarketSourceError::Timeout { message }
        | MarketSourceError::RateLimited { message } => {
            Error::service_unavailable(format!("market data unavailable: {message}"))
        }
        MarketSourceError::InvalidRequest { message } => {
            Error::invalid_request(format!("market data request rejected: {message}"))
        }
        MarketSourceError::Decode { message } => {
            Error::internal(format!("market data undecodable: {message}"))
        }
    }
}

/// News query parameters.
#[derive(Debug, Clone, Copy, Deserialize, IntoParams)]
pub struct NewsQuery {
    /// Maximum number of headlines; defaults to 10, capped at 50.
    pub limit: Option<u32>,
}

/// Price query parameters.
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct PricesQuery {
    /// Comma-separated ticker symbols.
    pub symbols: String,
}

/// Latest crypto news headlines.
#[utoipa::path(
    get,
    path = "/api/v1/market/news",
    params(NewsQuery),
    responses(
        (status = 200, description = "Headlines", body = [NewsHeadline]),
        (status = 400, description = "Invalid limit", body = Error),
        (status = 503, description = "Upstream unavailable", body = Error)
    ),
    tags = ["market"],
    operation_id = "marketNews",
    security([])
)]
#[get("/market/news")]
pub async fn market_news(
    state: web::Data<HttpState>,
    query: web::Query<NewsQuery>,
) -> ApiResult<web::Json<Vec<NewsHeadline>>> {
    let limit = query.limit.unwrap_or(DEFAULT_NEWS_LIMIT);
    if limit == 0 || limit > MAX_NEWS_LIMIT {
        return Err(Error::invalid_request(format!(
            "limit must be between 1 and {MAX_NEWS_LIMIT}"
        )));
    }
    let headlines = state
        .market
        .latest_news(limit)
        .await
        .map_err(map_market_error)?;
    Ok(web::Json(headlines))
}

/// USD spot prices for a set of symbols.
#[utoipa::path(
    get,
    path = "/api/v1/market/prices",
    params(PricesQuery),
    responses(
        (status = 200, description = "Spot prices", body = [SpotPrice]),
        (status = 400, description = "Invalid symbols", body = Error),
        (status = 503, description = "Upstream unavailable", body = Error)
    ),
    tags = ["market"],
    operation_id = "marketPrices",
    security([])
)]
#[get("/market/prices")]
pub async fn market_prices(
    state: web::Data<HttpState>,
    query: web::Query<PricesQuery>,
) -> ApiResult<web::Json<Vec<SpotPrice>>> {
    let mut symbols = Vec::new();
    for raw in query.symbols.split(',') {
        let symbol =
            Symbol::new(raw).map_err(|err| Error::invalid_request(err.to_string()))?;
        if !symbols.contains(&symbol) {
            symbols.push(symbol);
        }
    }
    if symbols.is_empty() {
        return Err(Error::invalid_request("at least one symbol is required"));
    }
    if symbols.len() > MAX_PRICE_SYMBOLS {
        return Err(Error::invalid_request(format!(
            "at most {MAX_PRICE_SYMBOLS} symbols per request"
        )));
    }
    let prices = state
        .market
        .spot_prices(&symbols)
        .await
        .map_err(map_market_error)?;
    Ok(web::Json(prices))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use crate::inbound::http::test_utils::{TestContext, test_app};
    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use rstest::rstest;
    use serde_json::Value;

    #[actix_web::test]
    async fn news_returns_headlines_from_the_source() {
        let ctx = TestContext::new();
        let app = actix_test::init_service(test_app(ctx.state.clone())).await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/market/news?limit=2")
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(res).await;
        let items = body.as_array().expect("array body");
        assert_eq!(items.len(), 2);
        assert!(items[0].get("title").is_some());
        assert!(items[0].get("publishedAt").is_some());
    }

    #[actix_web::test]
    async fn prices_deduplicate_and_uppercase_symbols() {
        let ctx = TestContext::new();
        let app = actix_test::init_service(test_app(ctx.state.clone())).await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/market/prices?symbols=btc,BTC,eth")
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(res).await;
        let items = body.as_array().expect("array body");
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].get("symbol").and_then(Value::as_str), Some("BTC"));
    }

    #[rstest]
    #[case("/api/v1/market/news?limit=0")]
    #[case("/api/v1/market/news?limit=500")]
    #[case("/api/v1/market/prices?symbols=")]
    #[case("/api/v1/market/prices?symbols=b%20tc")]
    #[actix_web::test]
    async fn invalid_queries_are_rejected(#[case] uri: &str) {
        let ctx = TestContext::new();
        let app = actix_test::init_service(test_app(ctx.state.clone())).await;
        let res =
            actix_test::call_service(&app, actix_test::TestRequest::get().uri(uri).to_request())
                .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn upstream_failures_map_to_typed_errors() {
        assert_eq!(
            map_market_error(MarketSourceError::timeout("slow")).code(),
            ErrorCode::ServiceUnavailable
        );
        assert_eq!(
            map_market_error(MarketSourceError::decode("bad json")).code(),
            ErrorCode::InternalError
        );
    }
}
