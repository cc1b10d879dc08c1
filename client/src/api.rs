//! HTTP API of the authentication server.

use common::{
    operations::{By, Fetch},
    Handler,
};
use derive_more::{Display, Error, From};
use serde::Deserialize;
use tracerr::Traced;
use uuid::Uuid;

use crate::Token;

/// Operation fetching the [`Profile`] of the [`Token`] owner.
pub type FetchCurrentUser = Fetch<By<Profile, Token>>;

/// Profile of an authenticated user.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct Profile {
    /// ID of the user.
    pub id: Uuid,

    /// Display name of the user.
    pub name: String,

    /// Role of the user.
    pub role: String,

    /// URL of the user photo.
    pub photo: Option<String>,

    /// Postal address of the user.
    pub address: Option<String>,

    /// Job title of the user.
    pub job: Option<String>,

    /// Professional domain of the user.
    pub domain: Option<String>,

    /// Reference to the user CV.
    pub cv: Option<String>,
}

/// Body of the current user response.
#[derive(Debug, Deserialize)]
struct MeResponse {
    /// Profile of the authenticated user.
    user: Profile,
}

/// Body of an error response.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    /// Error code.
    code: String,
}

/// Client of the authentication server HTTP API.
#[derive(Clone, Debug)]
pub struct HttpApi {
    /// Underlying HTTP client.
    client: reqwest::Client,

    /// Base URL of the server, without a trailing slash.
    base_url: String,
}

impl HttpApi {
    /// Path of the current user endpoint.
    const ME_PATH: &'static str = "/api/auth/me";

    /// Creates a new [`HttpApi`] for the server at the provided `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Creates a new [`HttpApi`] using the provided [`reqwest::Client`].
    #[must_use]
    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
    ) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            _ = base_url.pop();
        }
        Self { client, base_url }
    }
}

impl Handler<FetchCurrentUser> for HttpApi {
    type Ok = Profile;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        Fetch(by): FetchCurrentUser,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let token = by.into_inner();
        let resp = self
            .client
            .get(format!("{}{}", self.base_url, Self::ME_PATH))
            .bearer_auth(token)
            .send()
            .await
            .map_err(tracerr::from_and_wrap!(=> E))?;

        let status = resp.status();
        if !status.is_success() {
            let code = resp.json::<ErrorResponse>().await.ok().map(|e| e.code);
            return Err(tracerr::new!(E::Rejected {
                status: status.as_u16(),
                code,
            }));
        }

        resp.json::<MeResponse>()
            .await
            .map(|r| r.user)
            .map_err(tracerr::from_and_wrap!(=> E))
    }
}

/// Error of fetching the current user.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// Request failed to complete.
    #[display("HTTP request failed: {_0}")]
    Request(reqwest::Error),

    /// Server rejected the request.
    #[display("Server rejected the request with {status} status")]
    #[from(ignore)]
    Rejected {
        /// HTTP status code of the response.
        status: u16,

        /// Error code reported by the server, if any.
        code: Option<String>,
    },
}
