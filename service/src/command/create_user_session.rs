//! [`Command`] for creating a [`Session`].

use std::time::Duration;

use common::{
    operations::{By, Select},
    DateTime,
};
use derive_more::{Display, Error, From};
use secrecy::{ExposeSecret, SecretBox};
use tokio::task;
use tracerr::Traced;
use tracing as log;

#[cfg(doc)]
use crate::domain::user::{session::Token, Nni, Password};
use crate::{
    domain::{
        user::{self, session, Session},
        User,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for creating a [`Session`] by [`User`] credentials.
#[derive(Clone, Debug)]
pub struct CreateUserSession {
    /// [`Nni`] of a [`User`].
    pub nni: user::Nni,

    /// [`Password`] of a [`User`].
    pub password: SecretBox<user::Password>,
}

impl CreateUserSession {
    /// [`Duration`] of [`Session`] expiration.
    pub const EXPIRATION_DURATION: Duration = Duration::from_secs(60 * 60);
}

/// Output of [`CreateUserSession`] [`Command`].
#[derive(Clone, Debug)]
pub struct Output {
    /// [`Token`] of the created [`Session`].
    pub token: session::Token,

    /// [`User`] whose [`Session`] has been created.
    pub user: User,

    /// [`DateTime`] when the [`Session`] expires.
    pub expires_at: session::ExpirationDateTime,
}

impl<Db> Command<CreateUserSession> for Service<Db>
where
    Db: for<'l> Database<
            Select<By<Option<User>, &'l user::Nni>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Sync,
{
    type Ok = Output;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CreateUserSession,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateUserSession { nni, password } = cmd;

        let user = self
            .database()
            .execute(Select(By::new(&nni)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or_else(|| E::NniNotExists(nni))
            .map_err(tracerr::wrap!())?;

        let hash = user.password_hash.clone();
        let matches = task::spawn_blocking(move || {
            hash.verify(password.expose_secret())
        })
        .await
        .map_err(tracerr::from_and_wrap!(=> E))?
        .map_err(tracerr::from_and_wrap!(=> E))?;
        if !matches {
            log::warn!(user.id = %user.id, "wrong password provided");
            return Err(tracerr::new!(E::WrongPassword));
        }

        let issued_at = DateTime::now().trunc_secs();
        let expires_at =
            (issued_at + CreateUserSession::EXPIRATION_DURATION).coerce();
        let token = jsonwebtoken::encode::<Session>(
            &jsonwebtoken::Header::default(),
            &Session {
                user_id: user.id,
                nni: user.nni.clone(),
                role: user.role.clone(),
                issued_at: issued_at.coerce(),
                expires_at,
            },
            &self.config().jwt_encoding_key,
        )
        .map_err(tracerr::from_and_wrap!(=> E))?;

        // SAFETY: `jsonwebtoken::encode` always returns a valid
        //         `session::Token`.
        #[expect(unsafe_code, reason = "invariants are preserved")]
        let token = unsafe { session::Token::new_unchecked(token) };

        Ok(Output {
            token,
            user,
            expires_at,
        })
    }
}

/// Error of [`CreateUserSession`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// Blocking [`Password`] verification task failed to complete.
    #[display("`Password` verification task failed: {_0}")]
    HashingTaskError(task::JoinError),

    /// [`jsonwebtoken`] encoding error.
    #[display("Failed to encode a JSON Web Token: {_0}")]
    JsonWebTokenEncodeError(jsonwebtoken::errors::Error),

    /// [`User`] with the provided [`Nni`] does not exist.
    #[display("`User(nni: {_0})` does not exist")]
    #[from(ignore)]
    NniNotExists(#[error(not(source))] user::Nni),

    /// [`user::PasswordHash`] verification error.
    #[display("Failed to verify `PasswordHash`: {_0}")]
    PasswordHashError(bcrypt::BcryptError),

    /// Provided [`Password`] doesn't match the [`User`]'s one.
    #[display("Wrong `User` password")]
    WrongPassword,
}

#[cfg(test)]
mod spec {
    use jsonwebtoken::{DecodingKey, Validation};
    use secrecy::SecretBox;

    use crate::{
        command::{Command as _, CreateUser},
        domain::user::{self, Session},
        infra::Memory,
        test_util::{service, JWT_SECRET},
        Service,
    };

    use super::{CreateUserSession, ExecutionError};

    fn password(p: &str) -> SecretBox<user::Password> {
        SecretBox::init_with(|| user::Password::new(p).unwrap())
    }

    async fn registered(svc: &Service<Memory>) -> user::User {
        svc.execute(CreateUser {
            nni: user::Nni::new("1234").unwrap(),
            password: password("secret"),
            name: user::Name::new("A").unwrap(),
            role: Some(user::Role::new("admin").unwrap()),
            address: None,
            job: None,
            domain: None,
            cv: None,
            photo: None,
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn issues_token_with_user_claims() {
        let svc = service(Memory::new());
        let user = registered(&svc).await;

        let out = svc
            .execute(CreateUserSession {
                nni: user::Nni::new("1234").unwrap(),
                password: password("secret"),
            })
            .await
            .unwrap();

        let claims = jsonwebtoken::decode::<Session>(
            out.token.as_ref(),
            &DecodingKey::from_secret(JWT_SECRET.as_bytes()),
            &Validation::default(),
        )
        .unwrap()
        .claims;
        assert_eq!(claims.user_id, user.id);
        assert_eq!(claims.nni, user.nni);
        assert_eq!(claims.role, user.role);
        assert_eq!(claims.expires_at, out.expires_at);
        assert_eq!(
            claims.expires_at.unix_timestamp()
                - claims.issued_at.unix_timestamp(),
            60 * 60,
        );
        assert_eq!(out.user.id, user.id);
    }

    #[tokio::test]
    async fn rejects_wrong_password() {
        let svc = service(Memory::new());
        drop(registered(&svc).await);

        let err = svc
            .execute(CreateUserSession {
                nni: user::Nni::new("1234").unwrap(),
                password: password("wrong"),
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::WrongPassword));
    }

    #[tokio::test]
    async fn rejects_unknown_nni() {
        let svc = service(Memory::new());
        drop(registered(&svc).await);

        let err = svc
            .execute(CreateUserSession {
                nni: user::Nni::new("12345").unwrap(),
                password: password("secret"),
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::NniNotExists(_)));
    }
}
