//! [`Database`]-related implementations.

#[cfg(any(test, feature = "memory"))]
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

use derive_more::{Display, Error as StdError, From};

#[cfg(any(test, feature = "memory"))]
pub use self::memory::Memory;
#[cfg(feature = "postgres")]
pub use self::postgres::Postgres;

/// Database operation.
pub use common::Handler as Database;

/// Name of the unique constraint on [`User`]s' NNI.
///
/// [`User`]: crate::domain::User
pub const USERS_NNI_CONSTRAINT: &str = "users_nni_key";

/// [`Database`] error.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    #[cfg(any(test, feature = "memory"))]
    /// [`Memory`] error.
    Memory(memory::Error),

    #[cfg(feature = "postgres")]
    /// [`Postgres`] error.
    Postgres(postgres::Error),
}

impl Error {
    /// Checks if the error is a unique violation of the specified constraint.
    ///
    /// Any unique violation matches if no `constraint` is specified.
    #[must_use]
    pub fn is_unique_violation(&self, constraint: Option<&str>) -> bool {
        match self {
            #[cfg(any(test, feature = "memory"))]
            Self::Memory(e) => e.is_unique_violation(constraint),
            #[cfg(feature = "postgres")]
            Self::Postgres(e) => e.is_unique_violation(constraint),
        }
    }
}
