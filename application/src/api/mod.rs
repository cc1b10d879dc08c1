//! HTTP API definitions.

pub mod auth;

use axum::{
    routing::{get, post},
    Router,
};

use crate::{define_error, Backend};

/// Builds the [`Router`] of the HTTP API.
///
/// Expects a [`Service`] backed by the `Db` to be provided as an
/// [`Extension`].
///
/// [`Extension`]: axum::Extension
/// [`Service`]: service::Service
pub fn router<Db: Backend>() -> Router {
    Router::new()
        .route("/api/auth/register", post(auth::register::<Db>))
        .route("/api/auth/login", post(auth::login::<Db>))
        .route("/api/auth/me", get(auth::me::<Db>))
}

define_error! {
    enum UserError {
        #[code = "USER_NOT_FOUND"]
        #[status = NOT_FOUND]
        #[message = "User not found"]
        NotExists,
    }
}

define_error! {
    enum RequestError {
        #[code = "MISSING_FIELDS"]
        #[status = BAD_REQUEST]
        #[message = "NNI, password and name are required"]
        MissingRegistrationFields,

        #[code = "MISSING_FIELDS"]
        #[status = BAD_REQUEST]
        #[message = "NNI and password are required"]
        MissingCredentials,

        #[code = "INVALID_FIELDS"]
        #[status = BAD_REQUEST]
        #[message = "Some of the provided fields are malformed"]
        InvalidFields,
    }
}
