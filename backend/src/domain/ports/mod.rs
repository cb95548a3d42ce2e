//! Ports: the traits the domain drives and is driven through.
//!
//! Repository ports carry their own persistence error enums; services map
//! those into the domain [`Error`](crate::domain::Error). Every port ships an
//! in-memory implementation used by handler tests and database-less runs.

pub mod application_repository;
pub mod article_repository;
pub mod asset_store;
pub mod market_source;
pub mod payment_gateway;
pub mod payment_repository;
pub mod task_repository;
pub mod user_repository;

pub use application_repository::{
    ApplicationPersistenceError, ApplicationRepository, InMemoryApplicationRepository,
};
pub use article_repository::{
    ArticlePersistenceError, ArticleRepository, InMemoryArticleRepository, LikeOutcome,
};
pub use asset_store::{AssetId, AssetStore, AssetStoreError, InMemoryAssetStore, StoredAsset};
pub use market_source::{
    MarketDataSource, MarketSourceError, NewsHeadline, SpotPrice, Symbol, SymbolError,
};
pub use payment_gateway::{
    GatewayPayment, GatewayStatus, GatewayTransaction, PiGatewayError, PiPaymentGateway,
};
pub use payment_repository::{
    InMemoryPaymentRepository, PaymentPersistenceError, PaymentRepository,
};
pub use task_repository::{InMemoryTaskRepository, TaskPersistenceError, TaskRepository};
pub use user_repository::{InMemoryUserRepository, UserPersistenceError, UserRepository};

#[cfg(test)]
pub use payment_gateway::MockPiPaymentGateway;
