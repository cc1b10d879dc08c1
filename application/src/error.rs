//! [`Error`]-related definitions.

use std::fmt;

use axum::{
    extract::rejection::JsonRejection,
    response::{IntoResponse, Response},
    Json,
};
use derive_more::Error as StdError;
use itertools::Itertools as _;
use serde::Serialize;
use service::infra::database;
use tracerr::{Trace, Traced};
use tracing as log;

/// Defines a new error type.
#[expect(clippy::module_name_repetitions, reason = "more readable")]
#[macro_export]
macro_rules! define_error {
    (
        enum $name:ident {
            $(
                #[code = $code:literal]
                #[status = $status_code:ident]
                #[message = $message:literal]
                $variant:ident
            ),* $(,)?
        }
    ) => {
        /// Error type.
        #[derive(
            Clone,
            Copy,
            Debug,
            ::derive_more::Display,
            ::derive_more::Error
        )]
        #[repr(u16)]
        pub enum $name {
            $(
                #[display($message)]
                #[doc = $message]
                $variant,
            )*
        }

        impl From<$name> for $crate::Error {
            fn from(err: $name) -> Self {
                match err {
                    $(
                        $name::$variant => Self {
                            code: $code,
                            status_code: ::http::StatusCode::$status_code,
                            message: $message.to_string(),
                            backtrace: None,
                        },
                    )*
                }
            }
        }
    };
}

/// HTTP API [`Error`].
#[derive(Clone, Debug, StdError)]
pub struct Error {
    /// [`Error`] code.
    pub code: Code,

    /// [`http::StatusCode`] of this [`Error`].
    pub status_code: http::StatusCode,

    /// Backtrace of this [`Error`].
    #[error(not(backtrace))]
    pub backtrace: Option<Trace>,

    /// [`Error`] message.
    pub message: String,
}

impl Error {
    /// Message returned to clients instead of internal error details.
    pub const INTERNAL_MESSAGE: &'static str = "Internal server error";

    /// Create a new [`Error`] representing an internal server error.
    #[must_use]
    pub fn internal(msg: &impl ToString) -> Self {
        Self {
            code: "INTERNAL_SERVER_ERROR",
            status_code: http::StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.to_string(),
            backtrace: None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            code,
            status_code: _,
            backtrace,
            message,
        } = self;

        write!(
            f,
            "[{code}]: {message}{}",
            backtrace
                .iter()
                .format_with("\n", |trace, f| f(&format_args!("{trace}"))),
        )
    }
}

/// JSON body of an [`Error`] response.
#[derive(Debug, Serialize)]
struct Body<'e> {
    /// [`Error`] code.
    code: Code,

    /// [`Error`] message.
    message: &'e str,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let message = if self.status_code.is_server_error() {
            // Details stay in logs only.
            log::error!("{self}");
            Self::INTERNAL_MESSAGE
        } else {
            log::debug!("{self}");
            self.message.as_str()
        };

        (
            self.status_code,
            Json(Body {
                code: self.code,
                message,
            }),
        )
            .into_response()
    }
}

/// [`Error`] code.
pub type Code = &'static str;

/// Helper trait for converting types into [`Error`]s.
pub trait AsError {
    /// Tries to convert the type into an [`Error`].
    ///
    /// [`None`] is returned if the type cannot be converted into an [`Error`].
    fn try_as_error(&self) -> Option<Error>;

    /// Converts the type into an [`Error`].
    fn as_error(&self) -> Error
    where
        Self: fmt::Display,
    {
        self.try_as_error()
            .unwrap_or_else(|| Error::internal(&self))
    }

    /// Converts the type into an [`Error`] by consuming it.
    fn into_error(self) -> Error
    where
        Self: fmt::Display + Sized,
    {
        self.as_error()
    }
}

impl<E: AsError> AsError for Traced<E> {
    fn try_as_error(&self) -> Option<Error> {
        let mut error = self.as_ref().try_as_error()?;
        error.backtrace = Some(self.trace().clone());
        Some(error)
    }

    fn as_error(&self) -> Error
    where
        Self: fmt::Display,
    {
        let mut error = self
            .as_ref()
            .try_as_error()
            .unwrap_or_else(|| Error::internal(&self.to_string()));
        error.backtrace = Some(self.trace().clone());
        error
    }
}

impl AsError for JsonRejection {
    fn try_as_error(&self) -> Option<Error> {
        Some(Error {
            code: "BAD_REQUEST",
            status_code: http::StatusCode::BAD_REQUEST,
            message: self.body_text(),
            backtrace: None,
        })
    }
}

impl AsError for database::Error {
    fn try_as_error(&self) -> Option<Error> {
        None
    }
}

#[cfg(test)]
mod spec {
    use axum::response::IntoResponse as _;
    use derive_more::{Display, Error as StdError};
    use http_body_util::BodyExt as _;

    use super::{AsError, Error};

    #[derive(Debug, Display, StdError)]
    #[display("connection refused by 10.0.0.7")]
    struct Unexposed;

    impl AsError for Unexposed {
        fn try_as_error(&self) -> Option<Error> {
            None
        }
    }

    async fn body(err: Error) -> (http::StatusCode, serde_json::Value) {
        let resp = err.into_response();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn hides_internal_details() {
        let (status, json) =
            body(Error::internal(&"connection refused by 10.0.0.7")).await;

        assert_eq!(status, http::StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["code"], "INTERNAL_SERVER_ERROR");
        assert_eq!(json["message"], Error::INTERNAL_MESSAGE);
    }

    #[tokio::test]
    async fn traced_unexposed_error_becomes_internal() {
        let err = tracerr::new!(Unexposed).into_error();

        assert_eq!(err.status_code, http::StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.message.contains("connection refused by 10.0.0.7"));
        assert!(err.backtrace.is_some());

        let (status, json) = body(err).await;
        assert_eq!(status, http::StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["message"], Error::INTERNAL_MESSAGE);
    }

    #[tokio::test]
    async fn exposes_client_error_message() {
        let (status, json) = body(Error {
            code: "NNI_OCCUPIED",
            status_code: http::StatusCode::BAD_REQUEST,
            message: "NNI is already registered".to_owned(),
            backtrace: None,
        })
        .await;

        assert_eq!(status, http::StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "NNI_OCCUPIED");
        assert_eq!(json["message"], "NNI is already registered");
    }
}
