/// Read-only access to the birthdays store
mod birthday;

use async_trait::async_trait;
use sqlx::{Connection, PgConnection, postgres::PgConnectOptions};
use thiserror::Error;

use crate::config::DatabaseConfig;
use crate::models::BirthdayRecord;

/// Errors raised while reading the store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("could not connect to the database: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("query failed: {0}")]
    Query(#[source] sqlx::Error),
}

/// Source of birthday records
///
/// Implemented by [`Database`] and by in-memory fakes in tests.
#[async_trait]
pub trait BirthdayStore: Send + Sync {
    /// All records whose month and day equal the given pair, in store order
    async fn birthdays_on(
        &self,
        month: i32,
        day: i32,
    ) -> Result<Vec<BirthdayRecord>, StoreError>;

    /// Every registered email address, in store order
    async fn registered_emails(&self) -> Result<Vec<String>, StoreError>;
}

/// PostgreSQL-backed birthdays store
///
/// No connection is held between queries: each call opens one, runs its
/// statement and closes it again.
#[derive(Clone)]
pub struct Database {
    options: PgConnectOptions,
}

impl Database {
    /// Create a store from connection parameters
    pub fn new(config: &DatabaseConfig) -> Self {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.database)
            .username(&config.user)
            .password(&config.password);

        Self { options }
    }

    /// Open a dedicated connection for a single operation
    pub(crate) async fn connect(&self) -> Result<PgConnection, StoreError> {
        PgConnection::connect_with(&self.options)
            .await
            .map_err(StoreError::Connect)
    }
}
