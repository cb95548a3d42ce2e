//! Reqwest-backed market data source adapter.
//!
//! Speaks the CryptoCompare-style API: `GET /data/v2/news/` for headlines and
//! `GET /data/pricemulti?fsyms=...&tsyms=USD` for spot prices. Upstream
//! failures map to typed [`MarketSourceError`] variants; no placeholder data
//! is substituted.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};

use super::dto::NewsEnvelopeDto;
use crate::domain::ports::{
    MarketDataSource, MarketSourceError, NewsHeadline, SpotPrice, Symbol,
};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Market data adapter performing HTTP requests against one endpoint.
pub struct MarketHttpSource {
    client: Client,
    base: Url,
}

impl MarketHttpSource {
    /// Build an adapter with the default request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(base: Url) -> Result<Self, reqwest::Error> {
        Self::with_timeout(base, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Build an adapter with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn with_timeout(base: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base })
    }

    fn endpoint(&self, path: &str) -> Result<Url, MarketSourceError> {
        self.base
            .join(path)
            .map_err(|error| MarketSourceError::transport(format!("bad endpoint path: {error}")))
    }

    async fn get_bytes(&self, url: Url) -> Result<Vec<u8>, MarketSourceError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(map_transport_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }
        Ok(body.to_vec())
    }
}

#[async_trait]
impl MarketDataSource for MarketHttpSource {
    async fn latest_news(&self, limit: u32) -> Result<Vec<NewsHeadline>, MarketSourceError> {
        let url = self.endpoint("data/v2/news/")?;
        let body = self.get_bytes(url).await?;
        parse_news(&body, limit)
    }

    async fn spot_prices(&self, symbols: &[Symbol]) -> Result<Vec<SpotPrice>, MarketSourceError> {
        let mut url = self.endpoint("data/pricemulti")?;
        let fsyms = symbols
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join(",");
        url.query_pairs_mut()
            .append_pair("fsyms", &fsyms)
            .append_pair("tsyms", "USD");
        let body = self.get_bytes(url).await?;
        parse_prices(&body, symbols)
    }
}

fn parse_news(body: &[u8], limit: u32) -> Result<Vec<NewsHeadline>, MarketSourceError> {
    let envelope: NewsEnvelopeDto = serde_json::from_slice(body)
        .map_err(|error| MarketSourceError::decode(format!("invalid news JSON: {error}")))?;
    let mut headlines = envelope
        .data
        .into_iter()
        .map(super::dto::NewsItemDto::into_headline)
        .collect::<Result<Vec<_>, _>>()?;
    headlines.sort_by_key(|headline| std::cmp::Reverse(headline.published_at));
    headlines.truncate(limit as usize);
    Ok(headlines)
}

fn parse_prices(body: &[u8], symbols: &[Symbol]) -> Result<Vec<SpotPrice>, MarketSourceError> {
    // Shape: {"BTC":{"USD":12345.6},"ETH":{"USD":...}}
    let table: HashMap<String, HashMap<String, f64>> = serde_json::from_slice(body)
        .map_err(|error| MarketSourceError::decode(format!("invalid price JSON: {error}")))?;
    let mut prices = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        let usd = table
            .get(symbol.as_ref())
            .and_then(|quotes| quotes.get("USD"))
            .copied()
            .ok_or_else(|| {
                MarketSourceError::decode(format!("no USD quote for {symbol} in response"))
            })?;
        prices.push(SpotPrice {
            symbol: symbol.clone(),
            usd,
        });
    }
    Ok(prices)
}

fn map_transport_error(error: reqwest::Error) -> MarketSourceError {
    if error.is_timeout() {
        MarketSourceError::timeout(error.to_string())
    } else {
        MarketSourceError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> MarketSourceError {
    let preview = String::from_utf8_lossy(body).chars().take(160).collect::<String>();
    let message = format!("status {}: {preview}", status.as_u16());
    match status {
        StatusCode::TOO_MANY_REQUESTS => MarketSourceError::rate_limited(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            MarketSourceError::timeout(message)
        }
        _ if status.is_client_error() => MarketSourceError::invalid_request(message),
        _ => MarketSourceError::transport(message),
    }
}
