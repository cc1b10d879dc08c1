//! Credential store and session logic of the authentication server.
//!
//! List of available Cargo features:
#![doc = document_features::document_features!()]
#![deny(
    nonstandard_style,
    rust_2018_idioms,
    rustdoc::all,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code
)]
#![forbid(non_ascii_idents)]
#![warn(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    clippy::pedantic,
    clippy::wildcard_enum_match_arm,
    deprecated_in_future,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    unused_crate_dependencies,
    unused_import_braces,
    unused_labels,
    unused_lifetimes,
    unused_qualifications,
    unused_results
)]

pub mod command;
pub mod domain;
pub mod infra;

use derive_more::Debug;

#[cfg(doc)]
use infra::Database;

pub use self::command::Command;

/// [`Service`] configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// [JWT] encoding key.
    ///
    /// [JWT]: https://datatracker.ietf.org/doc/html/rfc7519
    #[debug(skip)]
    pub jwt_encoding_key: jsonwebtoken::EncodingKey,

    /// [JWT] decoding key.
    ///
    /// [JWT]: https://datatracker.ietf.org/doc/html/rfc7519
    #[debug(skip)]
    pub jwt_decoding_key: jsonwebtoken::DecodingKey,

    /// [bcrypt] cost used for hashing new passwords.
    ///
    /// [bcrypt]: https://en.wikipedia.org/wiki/Bcrypt
    pub password_hash_cost: u32,
}

impl Config {
    /// Creates a new [`Config`] signing [JWT]s with the provided shared
    /// `secret`.
    ///
    /// [JWT]: https://datatracker.ietf.org/doc/html/rfc7519
    #[must_use]
    pub fn with_secret(
        secret: impl AsRef<[u8]>,
        password_hash_cost: u32,
    ) -> Self {
        let secret = secret.as_ref();
        Self {
            jwt_encoding_key: jsonwebtoken::EncodingKey::from_secret(secret),
            jwt_decoding_key: jsonwebtoken::DecodingKey::from_secret(secret),
            password_hash_cost,
        }
    }
}

/// Domain service.
#[derive(Clone, Debug)]
pub struct Service<Db> {
    /// Configuration of this [`Service`].
    config: Config,

    /// [`Database`] of this [`Service`].
    database: Db,
}

impl<Db> Service<Db> {
    /// Creates a new [`Service`] with the provided parameters.
    #[must_use]
    pub fn new(config: Config, database: Db) -> Self {
        Self { config, database }
    }

    /// Returns [`Config`] of this [`Service`].
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns [`Database`] of this [`Service`].
    #[must_use]
    pub fn database(&self) -> &Db {
        &self.database
    }
}

#[cfg(test)]
mod test_util {
    //! Helpers for testing the [`Service`].

    use super::{Config, Service};

    /// Shared secret used for signing [JWT]s in tests.
    ///
    /// [JWT]: https://datatracker.ietf.org/doc/html/rfc7519
    pub(crate) const JWT_SECRET: &str = "test-secret";

    /// Creates a new [`Service`] on top of the provided `database`.
    ///
    /// Uses the minimal [bcrypt] cost to keep tests fast.
    ///
    /// [bcrypt]: https://en.wikipedia.org/wiki/Bcrypt
    pub(crate) fn service<Db>(database: Db) -> Service<Db> {
        Service::new(Config::with_secret(JWT_SECRET, 4), database)
    }
}
