//! Driven port for crypto market data (news headlines and spot prices).

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Maximum accepted length of a ticker symbol.
pub const SYMBOL_MAX: usize = 12;

/// Failures surfaced by market data adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarketSourceError {
    /// The upstream API could not be reached.
    #[error("market source unreachable: {message}")]
    Transport {
        /// Adapter-provided context.
        message: String,
    },
    /// The request timed out.
    #[error("market source timed out: {message}")]
    Timeout {
        /// Adapter-provided context.
        message: String,
    },
    /// The upstream API throttled us.
    #[error("market source rate limited: {message}")]
    RateLimited {
        /// Adapter-provided context.
        message: String,
    },
    /// The upstream API rejected the request.
    #[error("market source rejected request: {message}")]
    InvalidRequest {
        /// Adapter-provided context.
        message: String,
    },
    /// The response body failed to decode.
    #[error("market source response undecodable: {message}")]
    Decode {
        /// Adapter-provided context.
        message: String,
    },
}

impl MarketSourceError {
    /// Create a transport error with the given message.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a timeout error with the given message.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    /// Create a rate-limit error with the given message.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::RateLimited {
            message: message.into(),
        }
    }

    /// Create an invalid-request error with the given message.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create a decode error with the given message.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }
}

/// Validation failure for a ticker symbol.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SymbolError {
    /// The symbol was empty after trimming.
    #[error("symbol must not be empty")]
    Empty,
    /// The symbol exceeded [`SYMBOL_MAX`].
    #[error("symbol must be at most {max} characters")]
    TooLong {
        /// Maximum accepted length.
        max: usize,
    },
    /// The symbol contained non-alphanumeric characters.
    #[error("symbol must be alphanumeric")]
    InvalidCharacters,
}

/// Uppercased, validated ticker symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Validate and construct a [`Symbol`]; input is uppercased.
    pub fn new(symbol: impl AsRef<str>) -> Result<Self, SymbolError> {
        let trimmed = symbol.as_ref().trim();
        if trimmed.is_empty() {
            return Err(SymbolError::Empty);
        }
        if trimmed.chars().count() > SYMBOL_MAX {
            return Err(SymbolError::TooLong { max: SYMBOL_MAX });
        }
        if !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(SymbolError::InvalidCharacters);
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<Symbol> for String {
    fn from(value: Symbol) -> Self {
        value.0
    }
}

impl TryFrom<String> for Symbol {
    type Error = SymbolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// One news headline from the upstream feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewsHeadline {
    /// Headline text.
    pub title: String,
    /// Publishing outlet.
    pub source: String,
    /// Link to the full story.
    pub url: String,
    /// Publication timestamp.
    pub published_at: DateTime<Utc>,
}

/// USD spot price for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SpotPrice {
    /// Ticker symbol.
    #[schema(value_type = String, example = "BTC")]
    pub symbol: Symbol,
    /// Price in US dollars.
    pub usd: f64,
}

/// Driven port for market data queries.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Latest news headlines, newest first, at most `limit` entries.
    async fn latest_news(&self, limit: u32) -> Result<Vec<NewsHeadline>, MarketSourceError>;

    /// USD spot prices for the given symbols.
    async fn spot_prices(&self, symbols: &[Symbol]) -> Result<Vec<SpotPrice>, MarketSourceError>;
}
