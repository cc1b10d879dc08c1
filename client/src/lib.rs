//! Client-side session context of the authentication API.

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
pub mod session;
pub mod storage;

use derive_more::{AsRef, Display, From};

pub use self::{
    api::{HttpApi, Profile},
    session::{Session, State},
    storage::{FileStorage, MemoryStorage, Storage},
};

/// Bearer token issued by the login endpoint.
#[derive(AsRef, Clone, Debug, Display, Eq, From, PartialEq)]
#[as_ref(str)]
pub struct Token(String);

impl Token {
    /// Creates a new [`Token`] out of its string representation.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}
