#![doc = include_str!("../README.md")]

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod guard;
pub mod handoff;
pub mod mediator;
pub mod notify;
pub mod session;
pub mod store;
pub mod token;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenient access
pub use api::AccountKind;
pub use client::Client;
pub use config::ClientConfig;
pub use error::Error;
pub use guard::{Decision, GuardMode, Navigation, Redirect, Requirement, RouteGuard, decide};
pub use handoff::{RecentCheck, RiskAssessment};
pub use mediator::{ApiRequest, ApiResponse, HttpTransport, RequestMediator, Transport};
pub use notify::{Notification, Notifier, TracingNotifier};
pub use session::{SessionEvent, SessionManager, SessionState};
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError};
pub use types::{Credential, Email, Identity, Role, Session};
