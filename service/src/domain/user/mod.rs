//! [`User`] definitions.

pub mod session;

use std::sync::LazyLock;

#[cfg(doc)]
use common::DateTime;
use common::{unit, DateTimeOf};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use regex::Regex;
use secrecy::{zeroize::Zeroize, CloneableSecret};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use self::session::Session;

/// Registered member of the platform.
#[derive(Clone, Debug)]
pub struct User {
    /// ID of this [`User`].
    pub id: Id,

    /// [`Nni`] of this [`User`].
    pub nni: Nni,

    /// [`Name`] of this [`User`].
    pub name: Name,

    /// [`PasswordHash`] of this [`User`].
    pub password_hash: PasswordHash,

    /// [`Role`] of this [`User`].
    pub role: Role,

    /// [`Address`] of this [`User`].
    pub address: Option<Address>,

    /// [`Job`] of this [`User`].
    pub job: Option<Job>,

    /// [`Domain`] of this [`User`].
    pub domain: Option<Domain>,

    /// [`Cv`] of this [`User`].
    pub cv: Option<Cv>,

    /// [`Photo`] of this [`User`].
    pub photo: Option<Photo>,

    /// [`DateTime`] when this [`User`] was created.
    pub created_at: CreationDateTime,
}

/// ID of a [`User`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// National identity number of a [`User`].
///
/// Uniquely identifies a [`User`] and is used as a login.
#[derive(
    AsRef, Clone, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize,
)]
#[as_ref(str, String)]
#[serde(transparent)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Nni(String);

impl Nni {
    /// Creates a new [`Nni`] if the given `nni` is valid.
    #[must_use]
    pub fn new(nni: impl Into<String>) -> Option<Self> {
        let nni = nni.into();
        Self::check(&nni).then_some(Self(nni))
    }

    /// Checks whether the given `nni` is a valid [`Nni`].
    fn check(nni: impl AsRef<str>) -> bool {
        /// Regular expression checking [`Nni`] invariants:
        /// - Must not be empty;
        /// - Must not contain whitespace;
        /// - Must be at most 64 characters long.
        static REGEX: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^\S{1,64}$").expect("valid regex")
        });

        REGEX.is_match(nni.as_ref())
    }
}

impl FromStr for Nni {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Nni`")
    }
}

/// Name of a [`User`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Name(String);

impl Name {
    /// Creates a new [`Name`] if the given `name` is valid.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        Self::check(&name).then_some(Self(name))
    }

    /// Checks whether the given `name` is a valid [`Name`].
    fn check(name: impl AsRef<str>) -> bool {
        let name = name.as_ref();
        name.trim() == name && !name.is_empty() && name.len() <= 512
    }
}

impl FromStr for Name {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Name`")
    }
}

/// Password of a [`User`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Password(String);

impl Password {
    /// Maximum length of a [`Password`] in bytes.
    ///
    /// [bcrypt] ignores everything past this limit, so longer passwords
    /// would silently share a hash with their prefix.
    ///
    /// [bcrypt]: https://en.wikipedia.org/wiki/Bcrypt
    pub const MAX_LEN: usize = 72;

    /// Creates a new [`Password`] if the given `password` is valid.
    #[must_use]
    pub fn new(password: impl Into<String>) -> Option<Self> {
        let password = password.into();
        Self::check(&password).then_some(Self(password))
    }

    /// Checks whether the given `password` is a valid [`Password`].
    fn check(password: impl AsRef<str>) -> bool {
        let password = password.as_ref();
        !password.is_empty() && password.len() <= Self::MAX_LEN
    }
}

impl FromStr for Password {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Password`")
    }
}

impl CloneableSecret for Password {}
impl Zeroize for Password {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

/// Salted one-way hash of a [`User`]'s [`Password`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Default [bcrypt] cost (work factor).
    ///
    /// [bcrypt]: https://en.wikipedia.org/wiki/Bcrypt
    pub const DEFAULT_COST: u32 = 10;

    /// Hashes the provided [`Password`] with a random salt and the given
    /// [bcrypt] `cost`.
    ///
    /// # Errors
    ///
    /// If the `cost` is out of the range supported by [bcrypt].
    ///
    /// [bcrypt]: https://en.wikipedia.org/wiki/Bcrypt
    pub fn new(
        password: &Password,
        cost: u32,
    ) -> Result<Self, bcrypt::BcryptError> {
        bcrypt::hash(&password.0, cost).map(Self)
    }

    /// Checks whether the provided [`Password`] matches this [`PasswordHash`].
    ///
    /// # Errors
    ///
    /// If this [`PasswordHash`] is not a valid [bcrypt] hash.
    ///
    /// [bcrypt]: https://en.wikipedia.org/wiki/Bcrypt
    pub fn verify(
        &self,
        password: &Password,
    ) -> Result<bool, bcrypt::BcryptError> {
        bcrypt::verify(&password.0, &self.0)
    }
}

/// Role of a [`User`].
///
/// Free text tag (like `admin` or `user`), no closed set of values is
/// enforced.
#[derive(
    AsRef, Clone, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize,
)]
#[as_ref(str, String)]
#[serde(transparent)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Role(String);

impl Role {
    /// Creates a new [`Role`] if the given `role` is valid.
    #[must_use]
    pub fn new(role: impl Into<String>) -> Option<Self> {
        let role = role.into();
        Self::check(&role).then_some(Self(role))
    }

    /// Checks whether the given `role` is a valid [`Role`].
    fn check(role: impl AsRef<str>) -> bool {
        let role = role.as_ref();
        role.trim() == role && !role.is_empty() && role.len() <= 64
    }
}

impl Default for Role {
    fn default() -> Self {
        Self("user".to_owned())
    }
}

impl FromStr for Role {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Role`")
    }
}

/// Defines free text profile fields of a [`User`].
macro_rules! define_profile_field {
    ($(
        #[doc = $doc:literal]
        $name:ident
    ),* $(,)?) => {$(
        #[doc = $doc]
        #[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
        #[as_ref(str, String)]
        #[cfg_attr(
            feature = "postgres",
            derive(FromSql, ToSql),
            postgres(transparent)
        )]
        pub struct $name(String);

        impl $name {
            #[doc = concat!(
                "Creates a new [`", stringify!($name), "`] if the given ",
                "`value` is valid.",
            )]
            #[must_use]
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let value = value.into();
                (value.trim() == value
                    && !value.is_empty()
                    && value.len() <= 2048)
                    .then_some(Self(value))
            }
        }

        impl FromStr for $name {
            type Err = &'static str;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s).ok_or(concat!("invalid `", stringify!($name), "`"))
            }
        }
    )*};
}

define_profile_field! {
    #[doc = "Postal address of a [`User`]."]
    Address,

    #[doc = "Job title of a [`User`]."]
    Job,

    #[doc = "Professional domain of a [`User`]."]
    Domain,

    #[doc = "Reference (usually an upload URL) to a [`User`]'s CV."]
    Cv,

    #[doc = "URL of a [`User`]'s photo."]
    Photo,
}

/// [`DateTime`] when a [`User`] was created.
pub type CreationDateTime = DateTimeOf<(User, unit::Creation)>;

#[cfg(test)]
mod spec {
    use super::{Address, Name, Nni, Password, PasswordHash, Role};

    #[test]
    fn nni_format() {
        assert!(Nni::new("1234").is_some());
        assert!(Nni::new("0123456789").is_some());
        assert!(Nni::new("").is_none());
        assert!(Nni::new("12 34").is_none());
        assert!(Nni::new(" 1234").is_none());
        assert!(Nni::new("1".repeat(65)).is_none());
    }

    #[test]
    fn name_format() {
        assert!(Name::new("A").is_some());
        assert!(Name::new("Sidi Mohamed").is_some());
        assert!(Name::new("").is_none());
        assert!(Name::new(" A").is_none());
    }

    #[test]
    fn role_is_free_text() {
        assert_eq!(AsRef::<str>::as_ref(&Role::default()), "user");
        assert!(Role::new("admin").is_some());
        assert!(Role::new("anything goes").is_some());
        assert!(Role::new("").is_none());
    }

    #[test]
    fn profile_field_format() {
        assert!(Address::new("Nouakchott, Tevragh Zeina").is_some());
        assert!(Address::new("").is_none());
        assert!(Address::new("x ").is_none());
    }

    #[test]
    fn password_fits_bcrypt_input() {
        assert!(Password::new("a").is_some());
        assert!(Password::new("a".repeat(Password::MAX_LEN)).is_some());
        assert!(Password::new("a".repeat(Password::MAX_LEN + 1)).is_none());
        assert!(Password::new("é".repeat(37)).is_none());
        assert!(Password::new("").is_none());
    }

    #[test]
    fn password_hash_is_salted_and_verifiable() {
        let password = Password::new("secret").unwrap();
        let wrong = Password::new("secreT").unwrap();

        let first = PasswordHash::new(&password, 4).unwrap();
        let second = PasswordHash::new(&password, 4).unwrap();

        assert_ne!(first, second, "hashes must be salted");
        assert!(!first.as_ref().contains("secret"));
        assert!(first.verify(&password).unwrap());
        assert!(second.verify(&password).unwrap());
        assert!(!first.verify(&wrong).unwrap());
    }

    #[test]
    fn password_hash_rejects_invalid_cost() {
        let password = Password::new("secret").unwrap();

        assert!(PasswordHash::new(&password, 1).is_err());
    }
}
