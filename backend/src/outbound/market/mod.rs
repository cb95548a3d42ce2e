//! Market data outbound adapter.

mod dto;
mod http_source;

pub use http_source::MarketHttpSource;
