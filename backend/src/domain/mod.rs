//! Domain layer: validated aggregates, ports, and use-case services.
//!
//! Nothing in this module imports HTTP or database types. Inbound adapters
//! map [`Error`] to transport envelopes; outbound adapters implement the
//! traits under [`ports`].

pub mod account_service;
pub mod article;
pub mod article_service;
pub mod auth;
pub mod error;
pub mod journalist;
pub mod journalist_service;
pub mod payment;
pub mod payment_service;
pub mod ports;
pub mod subscription;
pub mod task;
pub mod trace_id;
pub mod upkeep;
pub mod user;

pub use self::account_service::{AccountService, Registration};
pub use self::article_service::ArticleService;
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::journalist_service::JournalistService;
pub use self::payment_service::{CompletionOutcome, PaymentService, VerificationOutcome};
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};
pub use self::upkeep::{UpkeepReport, UpkeepService};
pub use self::user::{User, UserId, UserValidationError};

/// Convenient result alias for code returning domain errors.
pub type DomainResult<T> = Result<T, Error>;
