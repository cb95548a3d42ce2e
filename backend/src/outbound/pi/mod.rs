//! Pi platform outbound adapter.

mod dto;
mod http_gateway;

pub use http_gateway::PiHttpGateway;
