//! Postgres [`Database`] implementation.

mod impls;

use deadpool_postgres::{Object, Pool, Runtime};
use derive_more::{Display, Error as StdError, From};
use refinery::{Report, Runner};
use tokio_postgres::{error::SqlState, types::ToSql, NoTls, Row, ToStatement};
use tracerr::Traced;
use tracing as log;

use crate::infra::database;
#[cfg(doc)]
use crate::infra::Database;

pub use refinery::embed_migrations;

pub use deadpool_postgres::{Config, CreatePoolError, PoolError};

/// Postgres [`Database`] client.
#[derive(Clone, Debug)]
pub struct Postgres {
    /// [`Pool`] of connections to run statements on.
    pool: Pool,
}

impl Postgres {
    /// Creates a new [`Postgres`] client with the provided [`Config`].
    ///
    /// # Errors
    ///
    /// If failed to create a new [`Postgres`] client.
    pub fn new(conf: &Config) -> Result<Self, Traced<database::Error>> {
        let pool = conf
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(tracerr::from_and_wrap!(=> Error))
            .map_err(tracerr::map_from)?;
        Ok(Self { pool })
    }

    /// Applies the pending migrations of the provided [`Runner`].
    ///
    /// # Errors
    ///
    /// If no connection could be acquired or any migration failed.
    pub async fn migrate(
        &self,
        runner: &Runner,
    ) -> Result<Report, Traced<database::Error>> {
        let mut conn = self.connection().await.map_err(tracerr::wrap!())?;
        let report = runner
            .run_async(&mut **conn)
            .await
            .map_err(tracerr::from_and_wrap!(=> Error))
            .map_err(tracerr::map_from)?;
        for m in report.applied_migrations() {
            log::info!("applied migration `{m}`");
        }
        Ok(report)
    }

    /// Retrieves a pooled connection.
    async fn connection(&self) -> Result<Object, Traced<database::Error>> {
        self.pool
            .get()
            .await
            .map_err(tracerr::from_and_wrap!(=> Error))
            .map_err(tracerr::map_from)
    }

    /// Queries the provided statement with the given parameters and returns the
    /// optional resulting row.
    async fn query_opt<T>(
        &self,
        stmt: &T,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Option<Row>, Traced<database::Error>>
    where
        T: ToStatement + ?Sized,
    {
        self.connection()
            .await
            .map_err(tracerr::wrap!())?
            .query_opt(stmt, params)
            .await
            .map_err(tracerr::from_and_wrap!(=> Error))
            .map_err(tracerr::map_from)
    }

    /// Executes the provided statement with the given parameters and returns
    /// the number of affected rows.
    async fn exec<T>(
        &self,
        stmt: &T,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<u64, Traced<database::Error>>
    where
        T: ToStatement + ?Sized,
    {
        self.connection()
            .await
            .map_err(tracerr::wrap!())?
            .execute(stmt, params)
            .await
            .map_err(tracerr::from_and_wrap!(=> Error))
            .map_err(tracerr::map_from)
    }
}

/// Postgres database [`Error`].
#[derive(Debug, Display, StdError, From)]
pub enum Error {
    /// Statement execution error.
    #[display("Statement failed: {_0}")]
    Statement(tokio_postgres::Error),

    /// Error of creating a new [`Pool`].
    #[display("Failed to create a new `Pool`: {_0}")]
    PoolCreationError(CreatePoolError),

    /// [`Pool`] error.
    #[display("`Pool` error: {_0}")]
    PoolError(PoolError),

    /// Schema migration error.
    #[display("Migration failed: {_0}")]
    Migration(refinery::Error),
}

impl Error {
    /// Checks if the error is a unique violation of the specified constraint.
    #[must_use]
    pub fn is_unique_violation(&self, constraint: Option<&str>) -> bool {
        match self {
            Self::Statement(e) => {
                e.code() == Some(&SqlState::UNIQUE_VIOLATION)
                    && constraint.map_or(true, |c| {
                        e.as_db_error().and_then(|e| e.constraint()) == Some(c)
                    })
            }
            Self::Migration(..)
            | Self::PoolError(..)
            | Self::PoolCreationError(..) => false,
        }
    }
}
