//! Reqwest-backed Pi platform gateway adapter.
//!
//! This adapter owns transport details only: authentication headers, timeout
//! and HTTP error mapping, and JSON decoding into the port's payment type.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde_json::{Value, json};

use super::dto::PaymentWireDto;
use crate::domain::payment::{PiPaymentId, Txid};
use crate::domain::ports::{GatewayPayment, PiGatewayError, PiPaymentGateway};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Gateway adapter performing HTTP requests against the Pi platform API.
pub struct PiHttpGateway {
    client: Client,
    base: Url,
    api_key: String,
}

impl PiHttpGateway {
    /// Build an adapter with the default request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(base: Url, api_key: String) -> Result<Self, reqwest::Error> {
        Self::with_timeout(base, api_key, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Build an adapter with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn with_timeout(
        base: Url,
        api_key: String,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base,
            api_key,
        })
    }

    fn payment_url(&self, payment_id: &PiPaymentId, complete: bool) -> Result<Url, PiGatewayError> {
        let mut url = self.base.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                PiGatewayError::transport("pi platform base URL cannot carry paths")
            })?;
            segments.pop_if_empty();
            segments.push("v2");
            segments.push("payments");
            segments.push(payment_id.as_ref());
            if complete {
                segments.push("complete");
            }
        }
        Ok(url)
    }

    fn auth_header(&self) -> String {
        format!("Key {}", self.api_key)
    }
}

#[async_trait]
impl PiPaymentGateway for PiHttpGateway {
    async fn fetch_payment(
        &self,
        payment_id: &PiPaymentId,
    ) -> Result<GatewayPayment, PiGatewayError> {
        let url = self.payment_url(payment_id, false)?;
        let response = self
            .client
            .get(url)
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }
        parse_payment(body.as_ref())
    }

    async fn complete_payment(
        &self,
        payment_id: &PiPaymentId,
        txid: &Txid,
    ) -> Result<(), PiGatewayError> {
        let url = self.payment_url(payment_id, true)?;
        let response = self
            .client
            .post(url)
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&json!({ "txid": txid.as_ref() }))
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }
        Ok(())
    }
}

fn parse_payment(body: &[u8]) -> Result<GatewayPayment, PiGatewayError> {
    let raw: Value = serde_json::from_slice(body)
        .map_err(|error| PiGatewayError::decode(format!("invalid payment JSON: {error}")))?;
    let wire: PaymentWireDto = serde_json::from_value(raw.clone())
        .map_err(|error| PiGatewayError::decode(format!("unexpected payment shape: {error}")))?;
    Ok(wire.into_gateway_payment(raw))
}

fn map_transport_error(error: reqwest::Error) -> PiGatewayError {
    if error.is_timeout() {
        PiGatewayError::timeout(error.to_string())
    } else {
        PiGatewayError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> PiGatewayError {
    let body_preview = body_preview(body);
    let message = if body_preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {}", status.as_u16(), body_preview)
    };

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => PiGatewayError::unauthorized(message),
        StatusCode::NOT_FOUND => PiGatewayError::not_found(message),
        StatusCode::TOO_MANY_REQUESTS => PiGatewayError::rate_limited(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            PiGatewayError::timeout(message)
        }
        _ if status.is_client_error() => PiGatewayError::invalid_request(message),
        _ => PiGatewayError::transport(message),
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}
