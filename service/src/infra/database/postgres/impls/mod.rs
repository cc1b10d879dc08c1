//! [`Database`] operations of [`Postgres`].
//!
//! [`Database`]: crate::infra::Database
//! [`Postgres`]: super::Postgres

#![expect(
    clippy::items_after_statements,
    reason = "`const SQL` after statements"
)]

mod user;
