//! PostgreSQL persistence adapters (Diesel + diesel-async).

mod diesel_application_repository;
mod diesel_article_repository;
mod diesel_payment_repository;
mod diesel_task_repository;
mod diesel_user_repository;
mod error_mapping;
mod models;
mod pool;
pub(crate) mod schema;

pub use diesel_application_repository::DieselApplicationRepository;
pub use diesel_article_repository::DieselArticleRepository;
pub use diesel_payment_repository::DieselPaymentRepository;
pub use diesel_task_repository::DieselTaskRepository;
pub use diesel_user_repository::DieselUserRepository;
pub use pool::{DbPool, PoolConfig, PoolError};

use diesel::Connection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};

/// Migrations compiled into the binary from `migrations/`.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

/// Run pending migrations over a short-lived synchronous connection.
///
/// # Errors
///
/// Returns a message when the connection or a migration fails.
pub fn run_migrations(database_url: &str) -> Result<(), String> {
    let mut conn = diesel::PgConnection::establish(database_url)
        .map_err(|err| format!("failed to connect for migrations: {err}"))?;
    conn.run_pending_migrations(MIGRATIONS)
        .map(|_| ())
        .map_err(|err| format!("failed to run migrations: {err}"))
}
