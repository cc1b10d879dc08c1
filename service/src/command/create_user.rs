//! [`Command`] for creating a new [`User`].

use common::{
    operations::{By, Insert, Select},
    DateTime,
};
use derive_more::{Display, Error, From};
use secrecy::{ExposeSecret, SecretBox};
use tokio::task;
use tracerr::Traced;
use tracing as log;

#[cfg(doc)]
use crate::domain::user::{Name, Nni, Password, Role};
use crate::{
    domain::{user, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for creating a new [`User`].
#[derive(Clone, Debug)]
pub struct CreateUser {
    /// [`Nni`] of a new [`User`].
    pub nni: user::Nni,

    /// [`Password`] of a new [`User`].
    pub password: SecretBox<user::Password>,

    /// [`Name`] of a new [`User`].
    pub name: user::Name,

    /// [`Role`] of a new [`User`].
    ///
    /// [`Role::default()`] is used if [`None`].
    pub role: Option<user::Role>,

    /// [`user::Address`] of a new [`User`].
    pub address: Option<user::Address>,

    /// [`user::Job`] of a new [`User`].
    pub job: Option<user::Job>,

    /// [`user::Domain`] of a new [`User`].
    pub domain: Option<user::Domain>,

    /// [`user::Cv`] of a new [`User`].
    pub cv: Option<user::Cv>,

    /// [`user::Photo`] of a new [`User`].
    pub photo: Option<user::Photo>,
}

impl<Db> Command<CreateUser> for Service<Db>
where
    Db: for<'l> Database<
            Select<By<Option<User>, &'l user::Nni>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<Insert<User>, Ok = (), Err = Traced<database::Error>>
        + Sync,
{
    type Ok = User;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateUser) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateUser {
            nni,
            password,
            name,
            role,
            address,
            job,
            domain,
            cv,
            photo,
        } = cmd;

        // Fast path only, the unique constraint below is the actual guard
        // against concurrent registrations.
        let u = self
            .database()
            .execute(Select(By::new(&nni)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if u.is_some() {
            return Err(tracerr::new!(E::NniOccupied(nni)));
        }

        let cost = self.config().password_hash_cost;
        let password_hash = task::spawn_blocking(move || {
            user::PasswordHash::new(password.expose_secret(), cost)
        })
        .await
        .map_err(tracerr::from_and_wrap!(=> E))?
        .map_err(tracerr::from_and_wrap!(=> E))?;

        let user = User {
            id: user::Id::new(),
            nni,
            name,
            password_hash,
            role: role.unwrap_or_default(),
            address,
            job,
            domain,
            cv,
            photo,
            created_at: DateTime::now().coerce(),
        };

        match self.database().execute(Insert(user.clone())).await {
            Ok(()) => Ok(user),
            Err(e)
                if e.as_ref().is_unique_violation(Some(
                    database::USERS_NNI_CONSTRAINT,
                )) =>
            {
                log::warn!(
                    "concurrent registration of `{}` NNI rejected by \
                     the unique constraint",
                    user.nni,
                );
                Err(tracerr::new!(E::NniOccupied(user.nni)))
            }
            Err(e) => Err(e).map_err(tracerr::map_from_and_wrap!(=> E)),
        }
    }
}

/// Error of [`CreateUser`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`user::Nni`] is already occupied.
    #[display("`{_0}` NNI is occupied")]
    #[from(ignore)]
    NniOccupied(#[error(not(source))] user::Nni),

    /// Blocking [`user::Password`] hashing task failed to complete.
    #[display("`Password` hashing task failed: {_0}")]
    HashingTaskError(task::JoinError),

    /// [`user::PasswordHash`] computation error.
    #[display("Failed to hash `Password`: {_0}")]
    PasswordHashError(bcrypt::BcryptError),
}
