//! [`Command`] for authorizing a [`User`].

use common::operations::{By, Select};
use derive_more::{Display, Error, From};
use jsonwebtoken::{errors::ErrorKind, Validation};
use tracerr::Traced;

use crate::{
    domain::{
        user::{self, session, Session},
        User,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for authorizing a [`User`].
///
/// Nothing is stored on the server side: the [`session::Token`] is verified
/// on every call, and the [`User`] is re-read to detect removed ones.
#[derive(Clone, Debug, From)]
pub struct AuthorizeUserSession {
    /// [`Session`] token to authorize.
    pub token: session::Token,
}

impl AuthorizeUserSession {
    /// Claim holding the ID of the [`User`] a [`Session`] belongs to.
    const SUBJECT_CLAIM: &'static str = "sub";

    /// Returns [`Validation`] rules for a [`session::Token`].
    fn validation() -> Validation {
        let mut validation = Validation::default();
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", Self::SUBJECT_CLAIM]);
        validation
    }
}

/// Output of [`AuthorizeUserSession`] [`Command`].
#[derive(Clone, Debug)]
pub struct Output {
    /// Authorized [`Session`].
    pub session: Session,

    /// [`User`] the [`Session`] belongs to.
    pub user: User,
}

impl<Db> Command<AuthorizeUserSession> for Service<Db>
where
    Db: Database<
        Select<By<Option<User>, user::Id>>,
        Ok = Option<User>,
        Err = Traced<database::Error>,
    > + Sync,
{
    type Ok = Output;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: AuthorizeUserSession,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let AuthorizeUserSession { token } = cmd;

        // Decoded loosely first, so a missing subject is reported as is
        // instead of a generic deserialization failure.
        let claims = jsonwebtoken::decode::<serde_json::Value>(
            token.as_ref(),
            &self.config().jwt_decoding_key,
            &AuthorizeUserSession::validation(),
        )
        .map_err(|e| {
            if matches!(
                e.kind(),
                ErrorKind::MissingRequiredClaim(c)
                    if c == AuthorizeUserSession::SUBJECT_CLAIM,
            ) {
                E::MissingSubject
            } else {
                E::JsonWebTokenDecodeError(e)
            }
        })
        .map_err(tracerr::wrap!())?
        .claims;
        let session = serde_json::from_value::<Session>(claims)
            .map_err(tracerr::from_and_wrap!(=> E))?;
        // `jsonwebtoken` still accepts `exp` equal to the current second.
        if session.is_expired() {
            return Err(tracerr::new!(E::Expired(session.expires_at)));
        }

        let user = self
            .database()
            .execute(Select(By::new(session.user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or_else(|| E::UserNotExists(session.user_id))
            .map_err(tracerr::wrap!())?;

        Ok(Output { session, user })
    }
}

/// Error of [`AuthorizeUserSession`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Session`] has expired already.
    #[display("`Session` has expired")]
    #[from(ignore)]
    Expired(#[error(not(source))] session::ExpirationDateTime),

    /// [`jsonwebtoken`] decoding error.
    #[display("Failed to decode a JSON Web Token: {_0}")]
    JsonWebTokenDecodeError(jsonwebtoken::errors::Error),

    /// Verified [`Session`] claims have unexpected shape.
    #[display("Malformed `Session` claims: {_0}")]
    MalformedClaims(serde_json::Error),

    /// [`Session`] has no subject claim.
    #[display("`Session` has no subject")]
    MissingSubject,

    /// [`User`] the [`Session`] belongs to does not exist.
    #[display("`User(id: {_0})` does not exist")]
    #[from(ignore)]
    UserNotExists(#[error(not(source))] user::Id),
}
