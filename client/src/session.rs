//! Client [`Session`] state machine.

use std::fmt;

use common::{
    operations::{By, Fetch},
    Handler,
};
use tracing as log;

use crate::{api::FetchCurrentUser, storage::Storage, Profile, Token};

/// State of a [`Session`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum State {
    /// No valid [`Token`] is known.
    Unauthenticated,

    /// [`Token`] is present and its [`Profile`] is being fetched.
    Verifying,

    /// [`Token`] is verified and its owner [`Profile`] is loaded.
    Authenticated(Profile),
}

/// Authentication context of a client.
///
/// Owned by the caller and passed explicitly. Every verification borrows it
/// mutably, so at most one is in flight at a time.
#[derive(Debug)]
pub struct Session<S, A> {
    /// [`Storage`] of the [`Token`].
    storage: S,

    /// API verifying [`Token`]s.
    api: A,

    /// Current [`State`].
    state: State,
}

impl<S, A> Session<S, A>
where
    S: Storage,
    S::Err: fmt::Display,
    A: Handler<FetchCurrentUser, Ok = Profile>,
    A::Err: fmt::Display,
{
    /// Initializes a new [`Session`] out of the [`Token`] persisted in the
    /// provided [`Storage`] (if any).
    ///
    /// Any failure leaves the [`Session`] [`State::Unauthenticated`] with
    /// the persisted [`Token`] cleared.
    pub async fn init(storage: S, api: A) -> Self {
        let mut session = Self {
            storage,
            api,
            state: State::Unauthenticated,
        };

        match session.storage.load() {
            Ok(Some(token)) => session.verify(token).await,
            Ok(None) => {}
            Err(e) => {
                log::warn!("failed to load persisted token: {e}");
                session.clear();
            }
        }

        session
    }

    /// Persists the provided [`Token`] and verifies it.
    pub async fn login(&mut self, token: Token) {
        if let Err(e) = self.storage.store(&token) {
            log::warn!("failed to persist token: {e}");
        }
        self.verify(token).await;
    }

    /// Forgets the current [`Token`] without contacting the server.
    pub fn logout(&mut self) {
        self.clear();
        self.state = State::Unauthenticated;
    }

    /// Returns the current [`State`] of this [`Session`].
    #[must_use]
    pub fn state(&self) -> &State {
        &self.state
    }

    /// Returns the [`Profile`] of the authenticated user, if any.
    #[must_use]
    pub fn user(&self) -> Option<&Profile> {
        match &self.state {
            State::Authenticated(profile) => Some(profile),
            State::Unauthenticated | State::Verifying => None,
        }
    }

    /// Indicates whether this [`Session`] is authenticated.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user().is_some()
    }

    /// Fetches the [`Profile`] of the provided [`Token`] owner.
    async fn verify(&mut self, token: Token) {
        self.state = State::Verifying;

        match self.api.execute(Fetch(By::new(token))).await {
            Ok(profile) => {
                log::debug!(user.id = %profile.id, "session verified");
                self.state = State::Authenticated(profile);
            }
            Err(e) => {
                log::info!("session verification failed: {e}");
                self.clear();
                self.state = State::Unauthenticated;
            }
        }
    }

    /// Removes the persisted [`Token`].
    fn clear(&self) {
        if let Err(e) = self.storage.clear() {
            log::warn!("failed to clear persisted token: {e}");
        }
    }
}

#[cfg(test)]
mod spec {
    use std::{
        fmt,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
    };

    use common::Handler;
    use uuid::Uuid;

    use crate::{
        api::FetchCurrentUser, storage::Storage as _, MemoryStorage, Profile,
        Token,
    };

    use super::{Session, State};

    const VALID: &str = "valid";

    #[derive(Debug)]
    struct Rejected;

    impl fmt::Display for Rejected {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("rejected")
        }
    }

    /// Accepts only the [`VALID`] token and counts calls.
    #[derive(Clone, Debug, Default)]
    struct Api {
        calls: Arc<AtomicUsize>,
    }

    impl Api {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Handler<FetchCurrentUser> for Api {
        type Ok = Profile;
        type Err = Rejected;

        async fn execute(
            &self,
            op: FetchCurrentUser,
        ) -> Result<Self::Ok, Self::Err> {
            _ = self.calls.fetch_add(1, Ordering::SeqCst);
            (op.0.into_inner().as_ref() == VALID)
                .then(profile)
                .ok_or(Rejected)
        }
    }

    fn profile() -> Profile {
        Profile {
            id: Uuid::nil(),
            name: "Ann".to_owned(),
            role: "user".to_owned(),
            photo: None,
            address: None,
            job: None,
            domain: None,
            cv: None,
        }
    }

    fn storage(token: Option<&str>) -> MemoryStorage {
        let storage = MemoryStorage::new();
        if let Some(token) = token {
            storage.store(&Token::new(token)).unwrap();
        }
        storage
    }

    #[tokio::test]
    async fn stays_unauthenticated_without_token() {
        let api = Api::default();

        let session = Session::init(storage(None), api.clone()).await;

        assert_eq!(session.state(), &State::Unauthenticated);
        assert!(!session.is_authenticated());
        assert_eq!(api.calls(), 0);
    }

    #[tokio::test]
    async fn authenticates_persisted_token() {
        let api = Api::default();

        let session = Session::init(storage(Some(VALID)), api.clone()).await;

        assert!(session.is_authenticated());
        assert_eq!(session.user(), Some(&profile()));
        assert_eq!(api.calls(), 1);
    }

    #[tokio::test]
    async fn clears_rejected_persisted_token() {
        let storage = storage(Some("expired"));

        let session = Session::init(storage.clone(), Api::default()).await;

        assert_eq!(session.state(), &State::Unauthenticated);
        assert_eq!(session.user(), None);
        assert_eq!(storage.load().unwrap(), None);
    }

    #[tokio::test]
    async fn logs_in() {
        let storage = storage(None);
        let mut session = Session::init(storage.clone(), Api::default()).await;

        session.login(Token::new(VALID)).await;

        assert!(session.is_authenticated());
        assert_eq!(storage.load().unwrap(), Some(Token::new(VALID)));
    }

    #[tokio::test]
    async fn clears_rejected_login_token() {
        let storage = storage(None);
        let mut session = Session::init(storage.clone(), Api::default()).await;

        session.login(Token::new("forged")).await;

        assert!(!session.is_authenticated());
        assert_eq!(storage.load().unwrap(), None);
    }

    #[tokio::test]
    async fn logs_out_without_network() {
        let api = Api::default();
        let storage = storage(Some(VALID));
        let mut session = Session::init(storage.clone(), api.clone()).await;
        assert!(session.is_authenticated());

        session.logout();

        assert_eq!(session.state(), &State::Unauthenticated);
        assert_eq!(storage.load().unwrap(), None);
        assert_eq!(api.calls(), 1);

        let reloaded = Session::init(storage, api.clone()).await;
        assert!(!reloaded.is_authenticated());
        assert_eq!(api.calls(), 1);
    }
}
