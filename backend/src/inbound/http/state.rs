//! Shared HTTP adapter state.
//!
//! Handlers accept this state via `actix_web::web::Data` so they only depend
//! on domain services and ports, and stay testable with in-memory adapters.

use std::sync::Arc;

use crate::domain::ports::{AssetStore, MarketDataSource, TaskRepository};
use crate::domain::{
    AccountService, ArticleService, Error, JournalistService, PaymentService, User,
};
use crate::inbound::http::session::SessionContext;

/// Parameter object bundling the dependencies HTTP handlers use.
#[derive(Clone)]
pub struct HttpState {
    /// Registration, login, profile, and admin user management.
    pub accounts: AccountService,
    /// Authoring, review, the public feed, and likes.
    pub articles: ArticleService,
    /// Journalist applications and decisions.
    pub journalists: JournalistService,
    /// Pi payment verification and completion.
    pub payments: PaymentService,
    /// Crypto news and spot prices.
    pub market: Arc<dyn MarketDataSource>,
    /// Per-user tasks.
    pub tasks: Arc<dyn TaskRepository>,
    /// Uploaded asset storage.
    pub assets: Arc<dyn AssetStore>,
}

impl HttpState {
    /// Resolve the session to a full user record or fail with `401`.
    pub async fn current_user(&self, session: &SessionContext) -> Result<User, Error> {
        let id = session.require_user_id()?;
        self.accounts.profile(&id).await
    }

    /// Resolve the session to a user if one is logged in.
    ///
    /// A stale session pointing at a deleted account reads as anonymous.
    pub async fn optional_user(&self, session: &SessionContext) -> Result<Option<User>, Error> {
        match session.user_id()? {
            Some(id) => Ok(self.accounts.profile(&id).await.ok()),
            None => Ok(None),
        }
    }
}
