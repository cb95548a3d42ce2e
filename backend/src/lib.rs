//! Trend Forge backend: a news/blogging service with subscription tiers,
//! journalist workflows, Pi payment verification, and an admin back office.
//!
//! Layout follows a hexagonal split: `domain` holds validated aggregates,
//! ports, and services; `inbound::http` adapts Actix requests onto the
//! domain; `outbound` implements the driven ports against PostgreSQL, the Pi
//! platform, the market data API, and the filesystem.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod server;

pub use doc::ApiDoc;
pub use middleware::RequestTrace;
