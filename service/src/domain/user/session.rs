//! [`Session`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{unit, DateTimeOf};
use derive_more::{AsRef, Display, FromStr};
use serde::{Deserialize, Serialize};

#[cfg(doc)]
use crate::domain::User;
use crate::domain::user;

/// Stateless user session, carried as claims of a signed [`Token`].
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Session {
    /// ID of the [`User`] this [`Session`] belongs to.
    #[serde(rename = "sub")]
    pub user_id: user::Id,

    /// [`user::Nni`] of the [`User`] this [`Session`] belongs to.
    pub nni: user::Nni,

    /// [`user::Role`] of the [`User`] at the moment of issuing.
    pub role: user::Role,

    /// [`DateTime`] when this [`Session`] was issued.
    #[serde(rename = "iat", with = "common::datetime::serde::unix_timestamp")]
    pub issued_at: IssueDateTime,

    /// [`DateTime`] when this [`Session`] expires.
    #[serde(rename = "exp", with = "common::datetime::serde::unix_timestamp")]
    pub expires_at: ExpirationDateTime,
}

impl Session {
    /// Indicates whether this [`Session`] has expired already.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_past()
    }
}

/// Access token of a [`Session`].
#[derive(AsRef, Clone, Debug, Display, Eq, FromStr, PartialEq)]
#[as_ref(str)]
pub struct Token(String);

impl Token {
    /// Creates a new [`Token`] without checking its contents.
    ///
    /// # Safety
    ///
    /// The provided `token` must be a valid [`Token`] representation.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub const unsafe fn new_unchecked(token: String) -> Self {
        Self(token)
    }
}

/// [`DateTime`] of a [`Session`] issuing.
pub type IssueDateTime = DateTimeOf<(Session, unit::Issue)>;

/// [`DateTime`] of a [`Session`] expiration.
pub type ExpirationDateTime = DateTimeOf<(Session, unit::Expiration)>;
