//! Application exposes the [`Service`] over an HTTP JSON API.
//!
//! [`Service`]: service::Service

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

pub mod api;
pub mod args;
pub mod config;
mod context;
pub mod error;

// Used in binary.
use axum_client_ip as _;
use refinery as _;
use tokio as _;
use tower_http as _;
use tracing_subscriber as _;

use common::operations::{By, Insert, Select};
use service::{
    domain::{user, User},
    infra::{database, Database},
};
use tracerr::Traced;

pub use self::{
    args::Args,
    config::Config,
    context::Context,
    error::{AsError, Error},
};

/// [`Database`] able to back the HTTP API.
///
/// Implemented for every [`Database`] providing the [`User`] operations the
/// commands of the [`Service`] need, so the binary and the tests only differ
/// in the type they instantiate the [`api::router()`] with.
///
/// [`Service`]: service::Service
pub trait Backend:
    Database<
        Select<By<Option<User>, user::Id>>,
        Ok = Option<User>,
        Err = Traced<database::Error>,
    > + for<'l> Database<
        Select<By<Option<User>, &'l user::Nni>>,
        Ok = Option<User>,
        Err = Traced<database::Error>,
    > + Database<Insert<User>, Ok = (), Err = Traced<database::Error>>
    + Clone
    + Send
    + Sync
    + 'static
{
}

impl<Db> Backend for Db where
    Db: Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + for<'l> Database<
            Select<By<Option<User>, &'l user::Nni>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<Insert<User>, Ok = (), Err = Traced<database::Error>>
        + Clone
        + Send
        + Sync
        + 'static
{
}
