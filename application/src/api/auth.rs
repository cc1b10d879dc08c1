//! Authentication HTTP endpoints.

use axum::{extract::rejection::JsonRejection, Json};
use secrecy::SecretBox;
use serde::{Deserialize, Serialize};
use service::{
    command::{self, Command as _},
    domain::{self, user},
};
use tracing as log;
use uuid::Uuid;

use crate::{
    api::{RequestError, UserError},
    define_error, AsError, Backend, Context, Error,
};

/// Body of a registration request.
#[derive(Clone, derive_more::Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    /// National identity number used as a login.
    pub nni: Option<String>,

    /// Plain password.
    #[debug(skip)]
    pub password: Option<String>,

    /// Display name.
    pub name: Option<String>,

    /// Role, `user` if omitted.
    pub role: Option<String>,

    /// Postal address.
    pub address: Option<String>,

    /// Job title.
    pub job: Option<String>,

    /// Professional domain.
    pub domain: Option<String>,

    /// Reference to a CV.
    pub cv: Option<String>,

    /// URL of a photo.
    pub photo: Option<String>,
}

impl TryFrom<RegisterRequest> for command::CreateUser {
    type Error = Error;

    fn try_from(req: RegisterRequest) -> Result<Self, Self::Error> {
        let RegisterRequest {
            nni,
            password,
            name,
            role,
            address,
            job,
            domain,
            cv,
            photo,
        } = req;

        let (Some(nni), Some(password), Some(name)) =
            (trimmed(nni), non_empty(password), trimmed(name))
        else {
            return Err(RequestError::MissingRegistrationFields.into());
        };

        Ok(Self {
            nni: parse(nni, user::Nni::new)?,
            password: SecretBox::try_init_with(|| {
                user::Password::new(password).ok_or(RequestError::InvalidFields)
            })?,
            name: parse(name, user::Name::new)?,
            role: optional(role, user::Role::new)?,
            address: optional(address, user::Address::new)?,
            job: optional(job, user::Job::new)?,
            domain: optional(domain, user::Domain::new)?,
            cv: optional(cv, user::Cv::new)?,
            photo: optional(photo, user::Photo::new)?,
        })
    }
}

/// Body of a login request.
#[derive(Clone, derive_more::Debug, Default, Deserialize)]
pub struct LoginRequest {
    /// National identity number.
    pub nni: Option<String>,

    /// Plain password.
    #[debug(skip)]
    pub password: Option<String>,
}

impl TryFrom<LoginRequest> for command::CreateUserSession {
    type Error = Error;

    fn try_from(req: LoginRequest) -> Result<Self, Self::Error> {
        let LoginRequest { nni, password } = req;

        let (Some(nni), Some(password)) = (trimmed(nni), non_empty(password))
        else {
            return Err(RequestError::MissingCredentials.into());
        };

        Ok(Self {
            nni: parse(nni, user::Nni::new)?,
            password: SecretBox::try_init_with(|| {
                user::Password::new(password).ok_or(RequestError::InvalidFields)
            })?,
        })
    }
}

/// Freshly registered [`domain::User`], as returned to its creator.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredUser {
    /// ID of the [`domain::User`].
    pub id: Uuid,

    /// National identity number of the [`domain::User`].
    pub nni: String,

    /// Display name of the [`domain::User`].
    pub name: String,

    /// Stored password hash of the [`domain::User`].
    pub password_hash: String,

    /// Role of the [`domain::User`].
    pub role: String,

    /// Postal address of the [`domain::User`].
    pub address: Option<String>,

    /// Job title of the [`domain::User`].
    pub job: Option<String>,

    /// Professional domain of the [`domain::User`].
    pub domain: Option<String>,

    /// Reference to a CV of the [`domain::User`].
    pub cv: Option<String>,

    /// URL of a photo of the [`domain::User`].
    pub photo: Option<String>,

    /// RFC 3339 timestamp of the [`domain::User`] creation.
    pub created_at: String,
}

impl From<domain::User> for RegisteredUser {
    fn from(user: domain::User) -> Self {
        Self {
            id: user.id.into(),
            nni: user.nni.to_string(),
            name: user.name.to_string(),
            password_hash: user.password_hash.to_string(),
            role: user.role.to_string(),
            address: user.address.map(|v| v.to_string()),
            job: user.job.map(|v| v.to_string()),
            domain: user.domain.map(|v| v.to_string()),
            cv: user.cv.map(|v| v.to_string()),
            photo: user.photo.map(|v| v.to_string()),
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

/// Public identity of a [`domain::User`] returned on login.
#[derive(Clone, Debug, Serialize)]
pub struct PublicUser {
    /// ID of the [`domain::User`].
    pub id: Uuid,

    /// Display name of the [`domain::User`].
    pub name: String,

    /// Role of the [`domain::User`].
    pub role: String,
}

impl From<domain::User> for PublicUser {
    fn from(user: domain::User) -> Self {
        Self {
            id: user.id.into(),
            name: user.name.to_string(),
            role: user.role.to_string(),
        }
    }
}

/// Body of a successful login response.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// Signed session token.
    pub token: String,

    /// RFC 3339 timestamp the token stops being accepted at.
    pub expires_at: String,

    /// Authenticated user.
    pub user: PublicUser,
}

/// Profile of the authenticated [`domain::User`].
#[derive(Clone, Debug, Serialize)]
pub struct Profile {
    /// ID of the [`domain::User`].
    pub id: Uuid,

    /// Display name of the [`domain::User`].
    pub name: String,

    /// Role of the [`domain::User`].
    pub role: String,

    /// URL of a photo of the [`domain::User`].
    pub photo: Option<String>,

    /// Postal address of the [`domain::User`].
    pub address: Option<String>,

    /// Job title of the [`domain::User`].
    pub job: Option<String>,

    /// Professional domain of the [`domain::User`].
    pub domain: Option<String>,

    /// Reference to a CV of the [`domain::User`].
    pub cv: Option<String>,
}

impl From<domain::User> for Profile {
    fn from(user: domain::User) -> Self {
        Self {
            id: user.id.into(),
            name: user.name.to_string(),
            role: user.role.to_string(),
            photo: user.photo.map(|v| v.to_string()),
            address: user.address.map(|v| v.to_string()),
            job: user.job.map(|v| v.to_string()),
            domain: user.domain.map(|v| v.to_string()),
            cv: user.cv.map(|v| v.to_string()),
        }
    }
}

/// Body of a successful current user response.
#[derive(Clone, Debug, Serialize)]
pub struct MeResponse {
    /// Profile of the authenticated user.
    pub user: Profile,
}

/// Registers a new user.
///
/// # Errors
///
/// Possible error codes:
/// - `MISSING_FIELDS` - if NNI, password or name is absent or blank;
/// - `INVALID_FIELDS` - if any provided field is malformed;
/// - `NNI_OCCUPIED` - if the NNI is already registered.
#[tracing::instrument(skip_all, fields(http.handler = "register"))]
pub async fn register<Db: Backend>(
    ctx: Context<Db>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(http::StatusCode, Json<RegisteredUser>), Error> {
    let Json(req) = body.map_err(AsError::into_error)?;
    let cmd = command::CreateUser::try_from(req)?;

    let user = ctx
        .service()
        .execute(cmd)
        .await
        .map_err(AsError::into_error)?;
    log::info!(user.id = %user.id, "user registered");

    Ok((http::StatusCode::CREATED, Json(user.into())))
}

/// Exchanges credentials for a session token.
///
/// # Errors
///
/// Possible error codes:
/// - `MISSING_FIELDS` - if NNI or password is absent or blank;
/// - `USER_NOT_FOUND` - if no user has the provided NNI;
/// - `WRONG_PASSWORD` - if the password doesn't match.
#[tracing::instrument(skip_all, fields(http.handler = "login"))]
pub async fn login<Db: Backend>(
    ctx: Context<Db>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, Error> {
    let Json(req) = body.map_err(AsError::into_error)?;
    let cmd = command::CreateUserSession::try_from(req)?;

    let command::create_user_session::Output {
        token,
        user,
        expires_at,
    } = ctx
        .service()
        .execute(cmd)
        .await
        .map_err(AsError::into_error)?;

    log::info!(user.id = %user.id, "user logged in");

    Ok(Json(LoginResponse {
        token: token.to_string(),
        expires_at: expires_at.to_rfc3339(),
        user: user.into(),
    }))
}

/// Returns the profile of the authenticated user.
///
/// # Errors
///
/// Possible error codes:
/// - `AUTHORIZATION_REQUIRED` - if no bearer token is provided;
/// - `INVALID_TOKEN` - if the token is invalid or expired;
/// - `USER_NOT_FOUND` - if the token owner doesn't exist anymore.
#[tracing::instrument(skip_all, fields(http.handler = "me"))]
pub async fn me<Db: Backend>(
    ctx: Context<Db>,
) -> Result<Json<MeResponse>, Error> {
    let user = ctx.current_user().await?;

    Ok(Json(MeResponse { user: user.into() }))
}

/// Trims the provided `value`, treating a blank one as absent.
fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// Filters out an empty `value` without trimming it.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Parses a required `value` with the provided constructor.
fn parse<T>(
    value: String,
    new: impl FnOnce(String) -> Option<T>,
) -> Result<T, Error> {
    new(value).ok_or_else(|| RequestError::InvalidFields.into())
}

/// Parses an optional `value`, treating a blank one as absent.
fn optional<T>(
    value: Option<String>,
    new: impl FnOnce(String) -> Option<T>,
) -> Result<Option<T>, Error> {
    trimmed(value).map(|v| parse(v, new)).transpose()
}

impl AsError for command::create_user::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "NNI_OCCUPIED"]
                #[status = BAD_REQUEST]
                #[message = "NNI is already registered"]
                NniOccupied,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::NniOccupied(_) => Some(Error::NniOccupied.into()),
            Self::HashingTaskError(_) | Self::PasswordHashError(_) => None,
        }
    }
}

impl AsError for command::create_user_session::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "WRONG_PASSWORD"]
                #[status = UNAUTHORIZED]
                #[message = "Wrong password"]
                WrongPassword,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::HashingTaskError(_)
            | Self::JsonWebTokenEncodeError(_)
            | Self::PasswordHashError(_) => None,
            Self::NniNotExists(_) => Some(UserError::NotExists.into()),
            Self::WrongPassword => Some(Error::WrongPassword.into()),
        }
    }
}

#[cfg(test)]
mod spec {
    use axum::{body::Body, Extension, Router};
    use http_body_util::BodyExt as _;
    use serde_json::{json, Value};
    use service::{command, infra::Memory, Service};
    use tower::ServiceExt as _;

    use crate::api;

    use super::{LoginRequest, RegisterRequest};

    fn app() -> Router {
        let service = Service::new(
            service::Config::with_secret("test-secret", 4),
            Memory::new(),
        );
        api::router::<Memory>().layer(Extension(service))
    }

    async fn call(
        app: &Router,
        method: http::Method,
        uri: &str,
        token: Option<&str>,
        body: Option<String>,
    ) -> (http::StatusCode, Value) {
        let mut req = http::Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(http::header::AUTHORIZATION, token);
        }
        let req = match body {
            Some(body) => req
                .header(http::header::CONTENT_TYPE, "application/json")
                .body(Body::from(body)),
            None => req.body(Body::empty()),
        }
        .unwrap();

        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn register(app: &Router, body: Value) -> (http::StatusCode, Value) {
        call(
            app,
            http::Method::POST,
            "/api/auth/register",
            None,
            Some(body.to_string()),
        )
        .await
    }

    async fn login(app: &Router, body: Value) -> (http::StatusCode, Value) {
        call(
            app,
            http::Method::POST,
            "/api/auth/login",
            None,
            Some(body.to_string()),
        )
        .await
    }

    async fn me(app: &Router, auth: Option<&str>) -> (http::StatusCode, Value) {
        call(app, http::Method::GET, "/api/auth/me", auth, None).await
    }

    #[tokio::test]
    async fn registers_user() {
        let app = app();

        let (status, user) = register(
            &app,
            json!({"nni": " 1234567 ", "password": "hunter2", "name": " Ann "}),
        )
        .await;

        assert_eq!(status, http::StatusCode::CREATED);
        assert_eq!(user["nni"], "1234567");
        assert_eq!(user["name"], "Ann");
        assert_eq!(user["role"], "user");
        assert_eq!(user["photo"], Value::Null);
        assert!(user["id"].as_str().is_some());
        assert!(user["createdAt"].as_str().is_some());
        let hash = user["passwordHash"].as_str().unwrap();
        assert!(hash.starts_with("$2"), "not a bcrypt hash: {hash}");
        assert_ne!(hash, "hunter2");
    }

    #[tokio::test]
    async fn registers_with_profile_and_role() {
        let app = app();

        let (status, user) = register(
            &app,
            json!({
                "nni": "42",
                "password": "pw",
                "name": "Bob",
                "role": "admin",
                "job": "Welder",
                "address": "",
            }),
        )
        .await;

        assert_eq!(status, http::StatusCode::CREATED);
        assert_eq!(user["role"], "admin");
        assert_eq!(user["job"], "Welder");
        assert_eq!(user["address"], Value::Null);
    }

    #[tokio::test]
    async fn rejects_registration_without_required_fields() {
        let app = app();

        for body in [
            json!({"password": "pw", "name": "Ann"}),
            json!({"nni": "1", "name": "Ann"}),
            json!({"nni": "1", "password": "pw"}),
            json!({"nni": "   ", "password": "pw", "name": "Ann"}),
            json!({"nni": "1", "password": "", "name": "Ann"}),
        ] {
            let (status, err) = register(&app, body.clone()).await;

            assert_eq!(status, http::StatusCode::BAD_REQUEST, "{body}");
            assert_eq!(err["code"], "MISSING_FIELDS", "{body}");
        }
    }

    #[tokio::test]
    async fn rejects_malformed_registration_fields() {
        let app = app();

        let (status, err) = register(
            &app,
            json!({"nni": "12 34", "password": "pw", "name": "Ann"}),
        )
        .await;

        assert_eq!(status, http::StatusCode::BAD_REQUEST);
        assert_eq!(err["code"], "INVALID_FIELDS");
    }

    #[tokio::test]
    async fn rejects_malformed_json() {
        let app = app();

        let (status, err) = call(
            &app,
            http::Method::POST,
            "/api/auth/register",
            None,
            Some("{\"nni\":".to_owned()),
        )
        .await;

        assert_eq!(status, http::StatusCode::BAD_REQUEST);
        assert_eq!(err["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn rejects_occupied_nni() {
        let app = app();
        let body = json!({"nni": "1", "password": "pw", "name": "Ann"});
        let (status, _) = register(&app, body.clone()).await;
        assert_eq!(status, http::StatusCode::CREATED);

        let (status, err) = register(&app, body).await;

        assert_eq!(status, http::StatusCode::BAD_REQUEST);
        assert_eq!(err["code"], "NNI_OCCUPIED");
    }

    #[tokio::test]
    async fn logs_in() {
        let app = app();
        let (_, created) = register(
            &app,
            json!({"nni": "1", "password": "pw", "name": "Ann"}),
        )
        .await;

        let (status, resp) =
            login(&app, json!({"nni": " 1 ", "password": "pw"})).await;

        assert_eq!(status, http::StatusCode::OK);
        assert!(!resp["token"].as_str().unwrap().is_empty());
        assert!(resp["expiresAt"].as_str().unwrap().ends_with('Z'));
        assert_eq!(
            resp["user"],
            json!({"id": created["id"], "name": "Ann", "role": "user"}),
        );
    }

    #[tokio::test]
    async fn does_not_trim_password() {
        let app = app();
        _ = register(
            &app,
            json!({"nni": "1", "password": " pw ", "name": "Ann"}),
        )
        .await;

        let (status, _) =
            login(&app, json!({"nni": "1", "password": "pw"})).await;
        assert_eq!(status, http::StatusCode::UNAUTHORIZED);

        let (status, _) =
            login(&app, json!({"nni": "1", "password": " pw "})).await;
        assert_eq!(status, http::StatusCode::OK);
    }

    #[tokio::test]
    async fn rejects_wrong_password() {
        let app = app();
        _ = register(
            &app,
            json!({"nni": "1", "password": "pw", "name": "Ann"}),
        )
        .await;

        let (status, err) =
            login(&app, json!({"nni": "1", "password": "nope"})).await;

        assert_eq!(status, http::StatusCode::UNAUTHORIZED);
        assert_eq!(err["code"], "WRONG_PASSWORD");
        assert!(err.get("token").is_none());
    }

    #[tokio::test]
    async fn rejects_unknown_nni() {
        let app = app();

        let (status, err) =
            login(&app, json!({"nni": "404", "password": "pw"})).await;

        assert_eq!(status, http::StatusCode::NOT_FOUND);
        assert_eq!(err["code"], "USER_NOT_FOUND");
    }

    #[tokio::test]
    async fn rejects_login_without_credentials() {
        let app = app();

        let (status, err) = login(&app, json!({"nni": "1"})).await;

        assert_eq!(status, http::StatusCode::BAD_REQUEST);
        assert_eq!(err["code"], "MISSING_FIELDS");
    }

    #[tokio::test]
    async fn returns_current_user() {
        let app = app();
        let (_, created) = register(
            &app,
            json!({
                "nni": "1",
                "password": "pw",
                "name": "Ann",
                "photo": "https://cdn.example.com/ann.png",
            }),
        )
        .await;
        let (_, resp) = login(&app, json!({"nni": "1", "password": "pw"})).await;
        let token = resp["token"].as_str().unwrap();

        let (status, resp) = me(&app, Some(&format!("Bearer {token}"))).await;

        assert_eq!(status, http::StatusCode::OK);
        assert_eq!(
            resp["user"],
            json!({
                "id": created["id"],
                "name": "Ann",
                "role": "user",
                "photo": "https://cdn.example.com/ann.png",
                "address": null,
                "job": null,
                "domain": null,
                "cv": null,
            }),
        );
    }

    #[tokio::test]
    async fn requires_authorization() {
        let app = app();

        for auth in [None, Some("Basic dXNlcjpwdw=="), Some("Bearer")] {
            let (status, err) = me(&app, auth).await;

            assert_eq!(status, http::StatusCode::UNAUTHORIZED, "{auth:?}");
            assert_eq!(err["code"], "AUTHORIZATION_REQUIRED", "{auth:?}");
        }
    }

    #[tokio::test]
    async fn rejects_invalid_token() {
        let app = app();

        let (status, err) = me(&app, Some("Bearer not.a.token")).await;

        assert_eq!(status, http::StatusCode::FORBIDDEN);
        assert_eq!(err["code"], "INVALID_TOKEN");
    }

    #[tokio::test]
    async fn rejects_token_of_unknown_user() {
        let issuer = app();
        _ = register(
            &issuer,
            json!({"nni": "1", "password": "pw", "name": "Ann"}),
        )
        .await;
        let (_, resp) =
            login(&issuer, json!({"nni": "1", "password": "pw"})).await;
        let token = resp["token"].as_str().unwrap();

        // Same secret, but the user is unknown to this instance.
        let (status, err) = me(&app(), Some(&format!("Bearer {token}"))).await;

        assert_eq!(status, http::StatusCode::NOT_FOUND);
        assert_eq!(err["code"], "USER_NOT_FOUND");
    }

    #[test]
    fn treats_blank_optional_fields_as_absent() {
        let cmd = command::CreateUser::try_from(RegisterRequest {
            nni: Some("1".to_owned()),
            password: Some("pw".to_owned()),
            name: Some("Ann".to_owned()),
            role: Some("  ".to_owned()),
            cv: Some(" cv.pdf ".to_owned()),
            ..RegisterRequest::default()
        })
        .unwrap();

        assert!(cmd.role.is_none());
        assert_eq!(cmd.cv.unwrap().to_string(), "cv.pdf");
    }

    #[test]
    fn rejects_overlong_password() {
        let err = command::CreateUserSession::try_from(LoginRequest {
            nni: Some("1".to_owned()),
            password: Some("x".repeat(73)),
        })
        .unwrap_err();

        assert_eq!(err.code, "INVALID_FIELDS");
    }
}
