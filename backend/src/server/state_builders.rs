//! Wiring of ports into handler state.
//!
//! With a database URL the repositories are Diesel-backed; without one the
//! server runs on in-memory adapters, which suits local development and
//! demos but loses data on restart.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::ports::{
    ApplicationRepository, ArticleRepository, AssetStore, InMemoryApplicationRepository,
    InMemoryArticleRepository, InMemoryPaymentRepository, InMemoryTaskRepository,
    InMemoryUserRepository, PaymentRepository, PiPaymentGateway, TaskRepository, UserRepository,
};
use crate::domain::{
    AccountService, ArticleService, JournalistService, PaymentService, UpkeepService,
};
use crate::inbound::http::state::HttpState;
use crate::outbound::market::MarketHttpSource;
use crate::outbound::persistence::{
    DbPool, DieselApplicationRepository, DieselArticleRepository, DieselPaymentRepository,
    DieselTaskRepository, DieselUserRepository, PoolConfig, run_migrations,
};
use crate::outbound::pi::PiHttpGateway;
use crate::outbound::storage::CapFileStore;
use crate::server::config::RuntimeOptions;

/// Failures while wiring the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateBuildError {
    /// An HTTP client could not be constructed.
    #[error("failed to build outbound client: {0}")]
    Client(#[from] reqwest::Error),
    /// The asset storage root could not be opened.
    #[error("failed to open asset storage: {0}")]
    Storage(#[from] std::io::Error),
    /// Migrations or pooling failed.
    #[error("failed to prepare database: {0}")]
    Database(String),
}

struct Repositories {
    users: Arc<dyn UserRepository>,
    articles: Arc<dyn ArticleRepository>,
    applications: Arc<dyn ApplicationRepository>,
    payments: Arc<dyn PaymentRepository>,
    tasks: Arc<dyn TaskRepository>,
}

async fn database_repositories(database_url: &str) -> Result<Repositories, StateBuildError> {
    run_migrations(database_url).map_err(StateBuildError::Database)?;
    let pool = DbPool::new(PoolConfig::new(database_url))
        .await
        .map_err(|err| StateBuildError::Database(err.to_string()))?;
    info!("persistence: PostgreSQL");
    Ok(Repositories {
        users: Arc::new(DieselUserRepository::new(pool.clone())),
        articles: Arc::new(DieselArticleRepository::new(pool.clone())),
        applications: Arc::new(DieselApplicationRepository::new(pool.clone())),
        payments: Arc::new(DieselPaymentRepository::new(pool.clone())),
        tasks: Arc::new(DieselTaskRepository::new(pool)),
    })
}

fn memory_repositories() -> Repositories {
    warn!("no DATABASE_URL configured; using in-memory repositories (data is not durable)");
    Repositories {
        users: Arc::new(InMemoryUserRepository::new()),
        articles: Arc::new(InMemoryArticleRepository::new()),
        applications: Arc::new(InMemoryApplicationRepository::new()),
        payments: Arc::new(InMemoryPaymentRepository::new()),
        tasks: Arc::new(InMemoryTaskRepository::new()),
    }
}

/// Build the handler state and the upkeep service over shared ports.
///
/// # Errors
///
/// Returns a [`StateBuildError`] when an outbound client, the storage root,
/// or the database cannot be prepared.
pub async fn build_state(
    database_url: Option<&str>,
    options: &RuntimeOptions,
) -> Result<(HttpState, UpkeepService), StateBuildError> {
    if options.pi_api_key.is_empty() {
        warn!("PI_API_KEY is empty; payment verification will fail upstream");
    }
    let gateway: Arc<dyn PiPaymentGateway> = Arc::new(PiHttpGateway::new(
        options.pi_api_base.clone(),
        options.pi_api_key.clone(),
    )?);
    let market = Arc::new(MarketHttpSource::new(options.market_api_base.clone())?);
    let assets: Arc<dyn AssetStore> = Arc::new(CapFileStore::open(&options.storage_root)?);

    let repositories = match database_url {
        Some(url) => database_repositories(url).await?,
        None => memory_repositories(),
    };
    let Repositories {
        users,
        articles,
        applications,
        payments,
        tasks,
    } = repositories;

    let state = HttpState {
        accounts: AccountService::new(users.clone()),
        articles: ArticleService::new(articles.clone()),
        journalists: JournalistService::new(applications, users.clone()),
        payments: PaymentService::new(
            payments.clone(),
            users.clone(),
            articles,
            gateway.clone(),
        ),
        market,
        tasks,
        assets,
    };
    let upkeep = UpkeepService::new(users, payments, gateway, options.payment_stale_after);
    Ok((state, upkeep))
}
