//! Server configuration assembled from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;

use actix_web::cookie::{Key, SameSite};
use chrono::Duration;
use url::Url;

/// Fully resolved configuration for one server process.
pub struct ServerConfig {
    /// Session cookie signing key.
    pub key: Key,
    /// Whether session cookies require HTTPS.
    pub cookie_secure: bool,
    /// SameSite policy for session cookies.
    pub same_site: SameSite,
    /// Socket address to bind.
    pub bind_addr: SocketAddr,
}

impl ServerConfig {
    /// Construct a server configuration.
    pub fn new(key: Key, cookie_secure: bool, same_site: SameSite, bind_addr: SocketAddr) -> Self {
        Self {
            key,
            cookie_secure,
            same_site,
            bind_addr,
        }
    }
}

/// Settings for outbound adapters and background upkeep.
#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    /// Pi platform API base URL.
    pub pi_api_base: Url,
    /// Pi platform server API key.
    pub pi_api_key: String,
    /// Market data API base URL.
    pub market_api_base: Url,
    /// Root directory for uploaded assets.
    pub storage_root: PathBuf,
    /// Age after which a verified payment is reconciled.
    pub payment_stale_after: Duration,
}

impl RuntimeOptions {
    /// Defaults pointing at the public endpoints; the API key must still be
    /// provided by the environment.
    pub fn new(pi_api_key: String) -> Self {
        Self {
            pi_api_base: Url::parse("https://api.minepi.com").unwrap_or_else(|error| {
                panic!("default pi base URL failed to parse: {error}")
            }),
            pi_api_key,
            market_api_base: Url::parse("https://min-api.cryptocompare.com").unwrap_or_else(
                |error| panic!("default market base URL failed to parse: {error}"),
            ),
            storage_root: PathBuf::from("data/assets"),
            payment_stale_after: Duration::hours(1),
        }
    }

    /// Override the Pi platform base URL.
    pub fn with_pi_api_base(mut self, base: Url) -> Self {
        self.pi_api_base = base;
        self
    }

    /// Override the market data base URL.
    pub fn with_market_api_base(mut self, base: Url) -> Self {
        self.market_api_base = base;
        self
    }

    /// Override the asset storage root.
    pub fn with_storage_root(mut self, root: PathBuf) -> Self {
        self.storage_root = root;
        self
    }

    /// Override the reconciliation staleness window.
    pub fn with_payment_stale_after(mut self, window: Duration) -> Self {
        self.payment_stale_after = window;
        self
    }
}
