//! Route authorization.
//!
//! [`decide`] is the pure decision table; [`RouteGuard`] binds it to a
//! [`RoutePolicy`] and a live [`SessionManager`], and remembers the path a
//! signed-out user was bounced from so sign-in can send them back.

mod decision;
mod policy;

use std::sync::Arc;

use parking_lot::Mutex;

pub use decision::{Decision, GuardMode, Redirect, RedirectReason, decide};
pub use policy::{Requirement, Route, RoutePolicy, Screen, landing_route, paths};

use crate::session::SessionManager;
use crate::types::Role;

/// Outcome of one navigation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub screen: Screen,
    pub decision: Decision,
}

pub struct RouteGuard {
    policy: RoutePolicy,
    mode: GuardMode,
    session: Arc<SessionManager>,
    pending: Mutex<Option<String>>,
}

impl RouteGuard {
    #[must_use]
    pub fn new(session: Arc<SessionManager>) -> Self {
        Self {
            policy: RoutePolicy::standard(),
            mode: GuardMode::default(),
            session,
            pending: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn with_mode(mut self, mode: GuardMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: RoutePolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn mode(&self) -> GuardMode {
        self.mode
    }

    #[must_use]
    pub fn policy(&self) -> &RoutePolicy {
        &self.policy
    }

    /// Evaluate a navigation to `path` against the current session.
    ///
    /// A sign-in redirect records `path` as the pending intent, replacing
    /// any earlier one.
    pub fn navigate(&self, path: &str) -> Navigation {
        let (screen, requirement) = self.policy.resolve(path);
        let decision = decide(self.mode, path, requirement, &self.session.state());

        if let Decision::Redirect(Redirect {
            reason: RedirectReason::SignInRequired,
            ..
        }) = &decision
        {
            tracing::debug!(%path, "Capturing pending navigation intent");
            *self.pending.lock() = Some(path.to_owned());
        }

        Navigation { screen, decision }
    }

    #[must_use]
    pub fn pending_intent(&self) -> Option<String> {
        self.pending.lock().clone()
    }

    /// Where to go right after signing in as `role`: the pending intent if
    /// one was captured (consuming it), else the role's landing route.
    pub fn after_sign_in(&self, role: &Role) -> String {
        self.pending
            .lock()
            .take()
            .unwrap_or_else(|| landing_route(role).to_owned())
    }
}
