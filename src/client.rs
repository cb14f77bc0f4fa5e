use std::sync::Arc;

use crate::api::{
    AccountKind, HospitalRegistration, ManufacturerRegistration, RiskCheckRequest,
};
use crate::config::ClientConfig;
use crate::error::Error;
use crate::guard::{Navigation, Redirect, RouteGuard, paths};
use crate::handoff::{RecentCheck, RecentChecks, RiskAssessment, RiskResultSlot};
use crate::mediator::{HttpTransport, RequestMediator, Transport};
use crate::notify::{Notifier, TracingNotifier};
use crate::session::{SessionEvent, SessionManager};
use crate::store::{FileStore, KeyValueStore, MemoryStore};
use crate::token;
use crate::types::Credential;

/// Wires store, session manager, route guard and request mediator together.
pub struct Client<T = HttpTransport> {
    session: Arc<SessionManager>,
    guard: RouteGuard,
    mediator: RequestMediator<T>,
    results: RiskResultSlot,
    recent: RecentChecks,
}

impl Client<HttpTransport> {
    /// Build a client from config: HTTP transport, file store if a storage
    /// path is configured (memory otherwise), notifications to `tracing`.
    /// The session is initialized before returning.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the configured store file cannot be read.
    pub fn from_config(config: &ClientConfig) -> Result<Self, Error> {
        let store: Arc<dyn KeyValueStore> = match config.storage_path() {
            Some(path) => Arc::new(FileStore::open(path)?),
            None => Arc::new(MemoryStore::new()),
        };
        let transport = HttpTransport::new(config.base_url().clone());
        Ok(Self::new(config, store, Arc::new(TracingNotifier), transport))
    }
}

impl<T: Transport> Client<T> {
    /// Assemble a client over explicit collaborators and initialize the session.
    #[must_use]
    pub fn new(
        config: &ClientConfig,
        store: Arc<dyn KeyValueStore>,
        notifier: Arc<dyn Notifier>,
        transport: T,
    ) -> Self {
        let session = Arc::new(SessionManager::new(store.clone(), notifier.clone()));
        session.initialize();
        let guard = RouteGuard::new(session.clone()).with_mode(config.guard_mode());
        let mediator = RequestMediator::new(transport, session.clone(), notifier);
        Self {
            session,
            guard,
            mediator,
            results: RiskResultSlot::new(),
            recent: RecentChecks::new(store),
        }
    }

    #[must_use]
    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    #[must_use]
    pub fn guard(&self) -> &RouteGuard {
        &self.guard
    }

    #[must_use]
    pub fn api(&self) -> &RequestMediator<T> {
        &self.mediator
    }

    /// Subscribe to session transitions; `Expired` carries the sign-in redirect.
    #[must_use]
    pub fn events(&self) -> tokio::sync::broadcast::Receiver<SessionEvent> {
        self.session.subscribe()
    }

    pub fn navigate(&self, path: &str) -> Navigation {
        self.guard.navigate(path)
    }

    /// Exchange credentials, establish the session and return where to go
    /// next: the pending intent if one was captured, else the landing route.
    ///
    /// # Errors
    ///
    /// Mediator errors from the exchange, or [`Error::Token`] if the access
    /// token carries no readable claims. The session is untouched on error.
    pub async fn sign_in(
        &self,
        kind: AccountKind,
        email: &str,
        password: &str,
    ) -> Result<String, Error> {
        let tokens = self.mediator.auth().login(kind, email, password).await?;
        let claims = token::decode_claims(&tokens.access_token)?;
        let identity = claims.identity();
        let role = identity.role.clone();

        self.session
            .sign_in(identity, Credential::new(tokens.access_token));
        Ok(self.guard.after_sign_in(&role))
    }

    /// Sign out and return the sign-in route.
    pub fn sign_out(&self) -> &'static str {
        self.session.sign_out();
        paths::LOGIN
    }

    /// Register a hospital account; returns the sign-in route.
    ///
    /// # Errors
    ///
    /// See [`RequestMediator::send`].
    pub async fn register_hospital(
        &self,
        registration: &HospitalRegistration,
    ) -> Result<&'static str, Error> {
        self.mediator.auth().register_hospital(registration).await?;
        Ok(paths::LOGIN)
    }

    /// Register a manufacturer account; returns the sign-in route.
    ///
    /// # Errors
    ///
    /// See [`RequestMediator::send`].
    pub async fn register_manufacturer(
        &self,
        registration: &ManufacturerRegistration,
    ) -> Result<&'static str, Error> {
        self.mediator
            .auth()
            .register_manufacturer(registration)
            .await?;
        Ok(paths::LOGIN)
    }

    /// Run a risk check, hand the result to the result screen and record it
    /// in the recent-checks history. Returns the result screen's route.
    ///
    /// A history write failure is logged and does not fail the check.
    ///
    /// # Errors
    ///
    /// See [`RequestMediator::send`].
    pub async fn check_risk(&self, request: &RiskCheckRequest) -> Result<&'static str, Error> {
        let assessment = self.mediator.risk().check(request).await?;
        let check = RecentCheck::new(&request.manufacturer_name, &request.device_name, &assessment);
        if let Err(e) = self.recent.record(check) {
            tracing::warn!(error = %e, "Failed to record recent check");
        }
        self.results.store(assessment);
        Ok(paths::RISK_RESULT)
    }

    /// Result for the result screen, or a redirect back to the checker.
    ///
    /// # Errors
    ///
    /// Returns the redirect when no check has completed in this process.
    pub fn risk_result(&self) -> Result<RiskAssessment, Redirect> {
        self.results.require()
    }

    #[must_use]
    pub fn recent_checks(&self) -> Vec<RecentCheck> {
        self.recent.list()
    }
}
