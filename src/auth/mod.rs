//! Per-backend bearer tokens with lazy, coalesced refresh.
//!
//! The cache never decides whether a token is still valid; it hands the most
//! recent token to the [`Authenticator`] as the prior token and stores whatever
//! comes back. Concurrent callers for the same backend share a single
//! in-flight refresh.

#![allow(missing_docs)]

pub mod keycloak;

use std::fmt;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

use crate::backend::Backend;

pub use self::keycloak::KeycloakAuthenticator;

/// Opaque bearer token for one backend.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(Arc<str>);

impl Token {
    pub fn new(raw: impl Into<Arc<str>>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token(<{} chars>)", self.0.len())
    }
}

/// Identity-provider collaborator.
///
/// Returns `prior` unchanged when it is still usable, a new token otherwise,
/// or `None` when no token can be obtained right now.
pub trait Authenticator: Send + Sync {
    fn obtain_token(&self, backend: Backend, prior: Option<&Token>) -> Option<Token>;
}

#[derive(Debug, Default)]
struct SlotState {
    token: Option<Token>,
    refreshing: bool,
    generation: u64,
}

#[derive(Debug, Default)]
struct Slot {
    state: Mutex<SlotState>,
    refreshed: Condvar,
}

/// Publishes a refresh result and wakes waiters, even if the authenticator
/// panicked.
struct RefreshGuard<'a> {
    slot: &'a Slot,
    outcome: Option<Option<Token>>,
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.slot.state.lock();
        if let Some(outcome) = self.outcome.take() {
            state.token = outcome;
        }
        state.refreshing = false;
        state.generation = state.generation.wrapping_add(1);
        drop(state);
        self.slot.refreshed.notify_all();
    }
}

/// Shared token store, one slot per backend. Cheap to share behind an `Arc`.
pub struct CredentialCache {
    authenticator: Arc<dyn Authenticator>,
    slots: [Slot; 2],
}

impl fmt::Debug for CredentialCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialCache")
            .field("as", &self.current(Backend::AccountServer).is_some())
            .field("dm", &self.current(Backend::DataManager).is_some())
            .finish_non_exhaustive()
    }
}

impl CredentialCache {
    pub fn new(authenticator: Arc<dyn Authenticator>) -> Self {
        Self {
            authenticator,
            slots: [Slot::default(), Slot::default()],
        }
    }

    /// A usable token for `backend`, or `None` while the backend is
    /// unauthenticated.
    ///
    /// `prior` is offered to the authenticator for reuse; when absent the
    /// cached token is offered instead. A caller arriving while another
    /// refresh for the same backend is running waits for it and receives its
    /// result.
    pub fn get_token(&self, backend: Backend, prior: Option<&Token>) -> Option<Token> {
        let slot = &self.slots[backend.index()];
        let mut state = slot.state.lock();

        if state.refreshing {
            let generation = state.generation;
            while state.refreshing && state.generation == generation {
                slot.refreshed.wait(&mut state);
            }
            debug!(backend = %backend, "joined in-flight token refresh");
            return state.token.clone();
        }

        state.refreshing = true;
        let offered = prior.cloned().or_else(|| state.token.clone());
        drop(state);

        let mut guard = RefreshGuard {
            slot,
            outcome: None,
        };
        let token = self.authenticator.obtain_token(backend, offered.as_ref());
        match (&token, &offered) {
            (Some(new), Some(old)) if new == old => debug!(backend = %backend, "token reused"),
            (Some(_), _) => debug!(backend = %backend, "token refreshed"),
            (None, _) => warn!(backend = %backend, "no token available"),
        }
        guard.outcome = Some(token.clone());
        drop(guard);
        token
    }

    /// The cached token without contacting the identity provider.
    #[must_use]
    pub fn current(&self, backend: Backend) -> Option<Token> {
        self.slots[backend.index()].state.lock().token.clone()
    }

    #[must_use]
    pub fn is_authenticated(&self, backend: Backend) -> bool {
        self.current(backend).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct Counting {
        calls: AtomicUsize,
        delay: Duration,
        refuse: bool,
    }

    impl Authenticator for Counting {
        fn obtain_token(&self, backend: Backend, prior: Option<&Token>) -> Option<Token> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(self.delay);
            if self.refuse {
                return None;
            }
            prior
                .cloned()
                .or_else(|| Some(Token::new(format!("{}-{call}", backend.label()))))
        }
    }

    #[test]
    fn token_debug_is_redacted() {
        let token = Token::new("secret-value");
        assert_eq!(format!("{token:?}"), "Token(<12 chars>)");
    }

    #[test]
    fn cached_token_is_offered_as_prior() {
        let auth = Arc::new(Counting::default());
        let cache = CredentialCache::new(auth.clone());
        let first = cache.get_token(Backend::DataManager, None).unwrap();
        let second = cache.get_token(Backend::DataManager, None).unwrap();
        assert_eq!(first, second);
        assert_eq!(auth.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.current(Backend::DataManager), Some(first));
    }

    #[test]
    fn backends_have_independent_slots() {
        let cache = CredentialCache::new(Arc::new(Counting::default()));
        let dm = cache.get_token(Backend::DataManager, None).unwrap();
        assert!(dm.as_str().starts_with("DM"));
        assert!(!cache.is_authenticated(Backend::AccountServer));
    }

    #[test]
    fn refusal_yields_none_and_clears_slot() {
        let cache = CredentialCache::new(Arc::new(Counting {
            refuse: true,
            ..Counting::default()
        }));
        assert!(cache.get_token(Backend::AccountServer, None).is_none());
        assert!(!cache.is_authenticated(Backend::AccountServer));
    }

    #[test]
    fn concurrent_callers_share_one_refresh() {
        let auth = Arc::new(Counting {
            delay: Duration::from_millis(300),
            ..Counting::default()
        });
        let cache = Arc::new(CredentialCache::new(auth.clone()));

        let leader = {
            let cache = Arc::clone(&cache);
            std::thread::spawn(move || cache.get_token(Backend::DataManager, None))
        };
        std::thread::sleep(Duration::from_millis(50));
        let followers: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || cache.get_token(Backend::DataManager, None))
            })
            .collect();

        let expected = leader.join().unwrap();
        for follower in followers {
            assert_eq!(follower.join().unwrap(), expected);
        }
        assert_eq!(auth.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panicking_authenticator_releases_waiters() {
        struct Panics;
        impl Authenticator for Panics {
            fn obtain_token(&self, _: Backend, _: Option<&Token>) -> Option<Token> {
                panic!("identity provider exploded");
            }
        }
        let cache = Arc::new(CredentialCache::new(Arc::new(Panics)));
        let worker = {
            let cache = Arc::clone(&cache);
            std::thread::spawn(move || cache.get_token(Backend::AccountServer, None))
        };
        assert!(worker.join().is_err());
        let state = cache.slots[Backend::AccountServer.index()].state.lock();
        assert!(!state.refreshing);
        assert_eq!(state.generation, 1);
    }
}
