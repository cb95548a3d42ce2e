//! Wire DTOs for the market data API.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::domain::ports::{MarketSourceError, NewsHeadline};

/// Envelope for `GET /data/v2/news/`.
#[derive(Debug, Deserialize)]
pub(super) struct NewsEnvelopeDto {
    #[serde(rename = "Data", default)]
    pub data: Vec<NewsItemDto>,
}

/// One news item.
#[derive(Debug, Deserialize)]
pub(super) struct NewsItemDto {
    pub title: String,
    pub url: String,
    /// Unix seconds.
    pub published_on: i64,
    #[serde(default)]
    pub source_info: Option<SourceInfoDto>,
}

/// Publisher block.
#[derive(Debug, Deserialize)]
pub(super) struct SourceInfoDto {
    pub name: String,
}

impl NewsItemDto {
    /// Convert into the port type, rejecting unrepresentable timestamps.
    pub(super) fn into_headline(self) -> Result<NewsHeadline, MarketSourceError> {
        let published_at: DateTime<Utc> = DateTime::from_timestamp(self.published_on, 0)
            .ok_or_else(|| {
                MarketSourceError::decode(format!(
                    "news item carries invalid timestamp {}",
                    self.published_on
                ))
            })?;
        Ok(NewsHeadline {
            title: self.title,
            source: self
                .source_info
                .map(|info| info.name)
                .unwrap_or_else(|| "unknown".to_owned()),
            url: self.url,
            published_at,
        })
    }
}
