//! [`Config`]-related definitions.

use config::{builder::DefaultState, ConfigBuilder, ConfigError};
use serde::Deserialize;
use smart_default::SmartDefault;

/// Application configuration.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: Server,

    /// Service configuration.
    #[serde(default)]
    pub service: Service,

    /// Postgres configuration.
    #[serde(default)]
    pub postgres: Postgres,

    /// Log configuration.
    #[serde(default)]
    pub log: Log,
}

impl Config {
    /// Creates a new [`Config`] by:
    /// - loading it from the provided `path` (if any);
    /// - merging it with the environment variables (if any);
    /// - using default values for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(path: impl AsRef<str>) -> Result<Self, ConfigError> {
        ConfigBuilder::<DefaultState>::default()
            .add_source(config::File::with_name(path.as_ref()).required(false))
            .add_source(config::Environment::with_prefix("CONF").separator("."))
            .build()?
            .try_deserialize()
    }
}

/// Server configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Server {
    /// Host to bind the server to.
    #[default("0.0.0.0".to_owned())]
    pub host: String,

    /// Port to bind the server to.
    #[default(8080)]
    pub port: u16,

    /// [CORS] configuration.
    ///
    /// [CORS]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
    pub cors: Cors,
}

/// [CORS] configuration.
///
/// [CORS]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Cors {
    /// List of allowed origins.
    #[default(vec!["*".to_owned()])]
    pub origins: Vec<String>,
}

/// Service configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Service {
    /// [JWT] secret.
    ///
    /// [JWT]: https://wikipedia.org/wiki/JSON_Web_Token
    #[default(Service::DEFAULT_JWT_SECRET.to_owned())]
    pub jwt_secret: String,

    /// [bcrypt] cost of password hashing.
    ///
    /// [bcrypt]: https://en.wikipedia.org/wiki/Bcrypt
    #[default(service::domain::user::PasswordHash::DEFAULT_COST)]
    pub password_hash_cost: u32,
}

impl Service {
    /// [JWT] secret used when none is configured.
    ///
    /// [JWT]: https://wikipedia.org/wiki/JSON_Web_Token
    pub const DEFAULT_JWT_SECRET: &'static str = "secret";

    /// Indicates whether the well-known default [JWT] secret is in use.
    ///
    /// [JWT]: https://wikipedia.org/wiki/JSON_Web_Token
    #[must_use]
    pub fn uses_default_secret(&self) -> bool {
        self.jwt_secret == Self::DEFAULT_JWT_SECRET
    }
}

impl From<Service> for service::Config {
    fn from(value: Service) -> Self {
        let Service {
            jwt_secret,
            password_hash_cost,
        } = value;
        Self::with_secret(jwt_secret, password_hash_cost)
    }
}

/// Postgres configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Postgres {
    /// Host to connect to.
    #[default("127.0.0.1".to_owned())]
    pub host: String,

    /// Port to connect to.
    #[default(5432)]
    pub port: u16,

    /// User to connect as.
    #[default("postgres".to_owned())]
    pub user: String,

    /// Password to connect with.
    #[default("postgres".to_owned())]
    pub password: String,

    /// Database name to connect to.
    #[default("postgres".to_owned())]
    pub dbname: String,
}

impl From<Postgres> for service::infra::postgres::Config {
    fn from(value: Postgres) -> Self {
        let Postgres {
            host,
            port,
            user,
            password,
            dbname,
        } = value;

        Self {
            host: Some(host),
            port: Some(port),
            user: Some(user),
            password: Some(password),
            dbname: Some(dbname),
            ..Self::default()
        }
    }
}

/// Log configuration.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Log {
    /// Log level.
    pub level: LogLevel,
}

/// Log level.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    /// Designates very low priority, often extremely verbose, information.
    Trace,

    /// Designates lower priority information.
    Debug,

    /// Designates useful information.
    #[default]
    Info,

    /// Designates hazardous situations.
    Warn,

    /// Designates very serious errors.
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}
