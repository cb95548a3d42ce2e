//! Backend entry-point: configuration, state wiring, upkeep loop, and the
//! HTTP accept loop.

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use actix_web::cookie::{Key, SameSite};
use clap::Parser;
use tracing::{error, warn};
use tracing_subscriber::{EnvFilter, fmt};
use zeroize::Zeroize;

use trendforge_backend::server::{self, RuntimeOptions, ServerConfig};

/// Trend Forge backend server.
#[derive(Debug, Parser)]
#[command(name = "trendforge-backend", about = "Trend Forge backend server")]
struct Cli {
    /// Socket address to bind (overrides BIND_ADDR).
    #[arg(long)]
    bind: Option<SocketAddr>,
    /// PostgreSQL URL (overrides DATABASE_URL; omit to run in-memory).
    #[arg(long)]
    database_url: Option<String>,
}

fn session_key() -> std::io::Result<Key> {
    let key_path =
        env::var("SESSION_KEY_FILE").unwrap_or_else(|_| "/var/run/secrets/session_key".into());
    match std::fs::read(&key_path) {
        Ok(mut bytes) => {
            let key = Key::derive_from(&bytes);
            bytes.zeroize();
            Ok(key)
        }
        Err(e) => {
            let allow_dev = env::var("SESSION_ALLOW_EPHEMERAL").ok().as_deref() == Some("1");
            if cfg!(debug_assertions) || allow_dev {
                warn!(path = %key_path, error = %e, "using temporary session key (dev only)");
                Ok(Key::generate())
            } else {
                Err(std::io::Error::other(format!(
                    "failed to read session key at {key_path}: {e}"
                )))
            }
        }
    }
}

fn runtime_options() -> RuntimeOptions {
    let mut options = RuntimeOptions::new(env::var("PI_API_KEY").unwrap_or_default());
    if let Ok(raw) = env::var("PI_API_BASE") {
        match raw.parse() {
            Ok(base) => options = options.with_pi_api_base(base),
            Err(e) => warn!(error = %e, "ignoring invalid PI_API_BASE"),
        }
    }
    if let Ok(raw) = env::var("MARKET_API_BASE") {
        match raw.parse() {
            Ok(base) => options = options.with_market_api_base(base),
            Err(e) => warn!(error = %e, "ignoring invalid MARKET_API_BASE"),
        }
    }
    if let Ok(root) = env::var("STORAGE_ROOT") {
        options = options.with_storage_root(root.into());
    }
    if let Ok(raw) = env::var("PAYMENT_STALE_AFTER_SECS") {
        match raw.parse::<i64>() {
            Ok(secs) if secs > 0 => {
                options = options.with_payment_stale_after(chrono::Duration::seconds(secs));
            }
            _ => warn!("ignoring invalid PAYMENT_STALE_AFTER_SECS"),
        }
    }
    options
}

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let cli = Cli::parse();
    let key = session_key()?;
    let cookie_secure = env::var("SESSION_COOKIE_SECURE")
        .map(|v| v != "0")
        .unwrap_or(true);
    let bind_addr = cli
        .bind
        .or_else(|| env::var("BIND_ADDR").ok().and_then(|raw| raw.parse().ok()))
        .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 8080)));
    let database_url = cli.database_url.or_else(|| env::var("DATABASE_URL").ok());

    let options = runtime_options();
    let (state, upkeep) = server::build_state(database_url.as_deref(), &options)
        .await
        .map_err(|e| std::io::Error::other(e.to_string()))?;

    let upkeep_interval = env::var("UPKEEP_INTERVAL_SECS")
        .ok()
        .and_then(|raw| raw.parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .unwrap_or(300);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(upkeep_interval));
        // The first tick fires immediately; run one pass at startup.
        loop {
            ticker.tick().await;
            let report = upkeep.run_once().await;
            if report.payments_failed > 0 {
                error!(
                    failed = report.payments_failed,
                    "payment reconciliation left records behind"
                );
            }
        }
    });

    let config = ServerConfig::new(key, cookie_secure, SameSite::Lax, bind_addr);
    server::run(config, state).await
}
