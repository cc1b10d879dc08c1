//! In-memory [`Database`] implementation.

use std::{collections::HashMap, sync::Arc};

use common::operations::{By, Insert, Select};
use derive_more::{Display, Error as StdError};
use tokio::sync::RwLock;
use tracerr::Traced;

use crate::{
    domain::{user, User},
    infra::database::{self, Database, USERS_NNI_CONSTRAINT},
};

/// In-memory [`Database`] client.
///
/// Enforces the same uniqueness constraints as the persistent one.
#[derive(Clone, Debug, Default)]
pub struct Memory {
    /// Stored [`User`]s.
    users: Arc<RwLock<HashMap<user::Id, User>>>,
}

impl Memory {
    /// Creates a new empty [`Memory`] client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored [`User`]s.
    pub async fn users_count(&self) -> usize {
        self.users.read().await.len()
    }
}

impl Database<Select<By<Option<User>, user::Id>>> for Memory {
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self.users.read().await.get(&by.into_inner()).cloned())
    }
}

impl<'l> Database<Select<By<Option<User>, &'l user::Nni>>> for Memory {
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, &'l user::Nni>>,
    ) -> Result<Self::Ok, Self::Err> {
        let nni = by.into_inner();
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| &u.nni == nni)
            .cloned())
    }
}

impl Database<Insert<User>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(user): Insert<User>,
    ) -> Result<Self::Ok, Self::Err> {
        let mut users = self.users.write().await;

        if users.contains_key(&user.id) {
            return Err(tracerr::new!(database::Error::from(
                Error::UniqueViolation(USERS_PKEY_CONSTRAINT),
            )));
        }
        if users.values().any(|u| u.nni == user.nni) {
            return Err(tracerr::new!(database::Error::from(
                Error::UniqueViolation(USERS_NNI_CONSTRAINT),
            )));
        }

        drop(users.insert(user.id, user));
        Ok(())
    }
}

/// Name of the primary key constraint on [`User`]s' ID.
const USERS_PKEY_CONSTRAINT: &str = "users_pkey";

/// [`Memory`] database error.
#[derive(Clone, Copy, Debug, Display, StdError)]
pub enum Error {
    /// Unique constraint is violated.
    #[display("Unique constraint `{_0}` is violated")]
    UniqueViolation(#[error(not(source))] &'static str),
}

impl Error {
    /// Checks if the error is a unique violation of the specified constraint.
    #[must_use]
    pub fn is_unique_violation(&self, constraint: Option<&str>) -> bool {
        match self {
            Self::UniqueViolation(c) => constraint.map_or(true, |x| x == *c),
        }
    }
}
