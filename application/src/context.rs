//! [`Context`]-related definitions.

use axum::{async_trait, extract::FromRequestParts, RequestPartsExt as _};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use service::{
    command::{self, Command as _},
    domain::{user::session, User},
    Service,
};

use crate::{api, define_error, AsError, Backend, Error};

/// Request context.
#[derive(Debug)]
pub struct Context<Db> {
    /// [`Service`] instance.
    service: Service<Db>,

    /// Parts of the HTTP request.
    parts: http::request::Parts,
}

impl<Db: Backend> Context<Db> {
    /// Returns [`Service`] instance of this [`Context`].
    #[must_use]
    pub fn service(&self) -> &Service<Db> {
        &self.service
    }

    /// Returns the [`User`] authorized by the bearer token of the current
    /// HTTP request.
    ///
    /// # Errors
    ///
    /// Errors if:
    /// - the current HTTP request carries no bearer token;
    /// - the provided token is invalid or expired;
    /// - the [`User`] the token was issued for doesn't exist anymore.
    pub async fn current_user(&self) -> Result<User, Error> {
        let TypedHeader(Authorization(bearer)) = self
            .parts
            .clone()
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| Error::from(AuthError::AuthorizationRequired))?;

        #[expect(unsafe_code, reason = "specified in correct header")]
        let token =
            unsafe { session::Token::new_unchecked(bearer.token().to_owned()) };

        self.service
            .execute(command::AuthorizeUserSession { token })
            .await
            .map(|out| out.user)
            .map_err(AsError::into_error)
    }
}

#[async_trait]
impl<Db, S> FromRequestParts<S> for Context<Db>
where
    Db: Backend,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut http::request::Parts,
        _: &S,
    ) -> Result<Self, Self::Rejection> {
        let service = parts
            .extensions
            .get::<Service<Db>>()
            .cloned()
            .ok_or_else(|| Error::internal(&"missing `Service` extension"))?;

        Ok(Self {
            service,
            parts: parts.clone(),
        })
    }
}

impl AsError for command::authorize_user_session::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::Expired(_)
            | Self::JsonWebTokenDecodeError(_)
            | Self::MalformedClaims(_)
            | Self::MissingSubject => Some(AuthError::InvalidToken.into()),
            Self::UserNotExists(_) => Some(api::UserError::NotExists.into()),
        }
    }
}

define_error! {
    enum AuthError {
        #[code = "AUTHORIZATION_REQUIRED"]
        #[status = UNAUTHORIZED]
        #[message = "Authorization required"]
        AuthorizationRequired,

        #[code = "INVALID_TOKEN"]
        #[status = FORBIDDEN]
        #[message = "Invalid or expired token"]
        InvalidToken,
    }
}
