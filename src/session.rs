use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;

use crate::guard::paths;
use crate::notify::{self, Notification, Notifier};
use crate::store::{CREDENTIAL_KEY, IDENTITY_KEY, KeyValueStore};
use crate::types::{Credential, Identity, Role, Session};

const EVENT_CAPACITY: usize = 16;

/// What the manager currently knows about the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Persisted state has not been read yet. Not the same as signed out.
    Resolving,
    SignedOut,
    SignedIn(Session),
}

impl SessionState {
    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        match self {
            Self::SignedIn(session) => Some(session),
            _ => None,
        }
    }

    #[must_use]
    pub fn role(&self) -> Option<&Role> {
        self.session().map(|s| &s.identity.role)
    }
}

/// Broadcast on every session transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn { role: Role },
    SignedOut,
    /// The server rejected the session; the navigation layer should go to `redirect`.
    Expired { redirect: &'static str },
}

struct Inner {
    state: SessionState,
    epoch: u64,
}

/// Single source of truth for who is signed in.
///
/// Shared as `Arc<SessionManager>` by the route guard and the request
/// mediator. Every transition runs inside one write-lock scope.
pub struct SessionManager {
    store: Arc<dyn KeyValueStore>,
    notifier: Arc<dyn Notifier>,
    inner: RwLock<Inner>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionManager {
    /// Create a manager in the [`SessionState::Resolving`] state.
    /// Call [`initialize`](Self::initialize) to read persisted state.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, notifier: Arc<dyn Notifier>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            store,
            notifier,
            inner: RwLock::new(Inner {
                state: SessionState::Resolving,
                epoch: 0,
            }),
            events,
        }
    }

    /// Rehydrate from the store. Never fails: anything other than a complete,
    /// parseable credential/identity pair clears both keys and leaves the
    /// manager signed out.
    pub fn initialize(&self) {
        let mut inner = self.inner.write();
        inner.state = match self.read_persisted() {
            Some(session) => {
                tracing::info!(role = %session.identity.role, "Session restored");
                SessionState::SignedIn(session)
            }
            None => {
                self.clear_persisted("Failed to clear persisted session");
                SessionState::SignedOut
            }
        };
    }

    fn read_persisted(&self) -> Option<Session> {
        let credential = self.store.get(CREDENTIAL_KEY);
        let identity = self.store.get(IDENTITY_KEY);
        match (credential, identity) {
            (Ok(Some(credential)), Ok(Some(identity))) if !credential.is_empty() => {
                match serde_json::from_str::<Identity>(&identity) {
                    Ok(identity) => Some(Session {
                        credential: Credential::new(credential),
                        identity,
                    }),
                    Err(e) => {
                        tracing::warn!(error = %e, "Discarding unparseable persisted identity");
                        None
                    }
                }
            }
            (Ok(None), Ok(None)) => None,
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(error = %e, "Discarding unreadable persisted session");
                None
            }
            _ => {
                tracing::warn!("Discarding partial persisted session");
                None
            }
        }
    }

    fn clear_persisted(&self, context: &str) {
        if let Err(e) = self.store.remove_many(&[CREDENTIAL_KEY, IDENTITY_KEY]) {
            tracing::error!(error = %e, "{context}");
        }
    }

    /// Sign in with an identity and its credential.
    ///
    /// Both keys are written as one unit. If persisting fails the error is
    /// logged and reported as a notification, and the in-memory session is
    /// still established for the life of this process.
    pub fn sign_in(&self, identity: Identity, credential: Credential) {
        let role = identity.role.clone();
        let persisted = {
            let mut inner = self.inner.write();
            let persisted = serde_json::to_string(&identity)
                .map_err(crate::store::StoreError::from)
                .and_then(|json| {
                    self.store.set_many(&[
                        (CREDENTIAL_KEY, credential.as_str()),
                        (IDENTITY_KEY, json.as_str()),
                    ])
                });
            if let Err(e) = &persisted {
                tracing::error!(error = %e, %role, "Failed to persist session");
                self.clear_persisted("Failed to clear partial session");
            }
            inner.state = SessionState::SignedIn(Session {
                credential,
                identity,
            });
            inner.epoch += 1;
            persisted
        };

        if persisted.is_ok() {
            tracing::info!(%role, "Signed in");
            self.notifier.notify(Notification::success(notify::LOGIN_SUCCESS));
        } else {
            self.notifier.notify(Notification::error(notify::LOGIN_SAVE_FAILED));
        }
        let _ = self.events.send(SessionEvent::SignedIn { role });
    }

    /// Sign out. Idempotent: with no session it still succeeds and confirms.
    pub fn sign_out(&self) {
        let was_signed_in = {
            let mut inner = self.inner.write();
            self.clear_persisted("Failed to clear persisted session");
            let was = matches!(inner.state, SessionState::SignedIn(_));
            inner.state = SessionState::SignedOut;
            if was {
                inner.epoch += 1;
            }
            was
        };
        if was_signed_in {
            tracing::info!("Signed out");
        }
        self.notifier.notify(Notification::success(notify::LOGOUT_SUCCESS));
        let _ = self.events.send(SessionEvent::SignedOut);
    }

    /// Drop a session the server rejected `credential` for.
    ///
    /// Returns `true` only for the call that actually ended the session, so
    /// concurrent rejections redirect once. A rejection of a credential the
    /// current session no longer holds is stale and leaves it alone.
    pub(crate) fn expire(&self, credential: &Credential) -> bool {
        {
            let mut inner = self.inner.write();
            match inner.state.session() {
                Some(session) if session.credential == *credential => {}
                Some(_) => {
                    tracing::debug!("Ignoring rejection of a superseded credential");
                    return false;
                }
                None => return false,
            }
            self.clear_persisted("Failed to clear expired session");
            inner.state = SessionState::SignedOut;
            inner.epoch += 1;
        }
        tracing::info!("Session expired");
        let _ = self.events.send(SessionEvent::Expired {
            redirect: paths::LOGIN,
        });
        true
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.inner.read().state.clone()
    }

    /// Bumped on every sign-in, sign-out and expiry. A screen can compare
    /// the epoch before and after a request to drop stale responses.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.inner.read().epoch
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self.inner.read().state, SessionState::Resolving)
    }

    #[must_use]
    pub fn current_credential(&self) -> Option<Credential> {
        self.inner
            .read()
            .state
            .session()
            .map(|s| s.credential.clone())
    }

    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.inner.read().state.session().map(|s| s.identity.clone())
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self.inner.read().state, SessionState::SignedIn(_))
    }

    #[must_use]
    pub fn has_role(&self, role: &Role) -> bool {
        self.inner.read().state.role() == Some(role)
    }

    #[must_use]
    pub fn role_in(&self, roles: &[Role]) -> bool {
        self.inner
            .read()
            .state
            .role()
            .is_some_and(|r| roles.contains(r))
    }

    /// Hospital-scoped screens also admit super admins.
    #[must_use]
    pub fn is_hospital(&self) -> bool {
        self.role_in(&[Role::Hospital, Role::SuperAdmin])
    }

    #[must_use]
    pub fn is_manufacturer(&self) -> bool {
        self.has_role(&Role::Manufacturer)
    }

    #[must_use]
    pub fn is_super_admin(&self) -> bool {
        self.has_role(&Role::SuperAdmin)
    }
}
