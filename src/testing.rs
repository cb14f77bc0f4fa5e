//! Fakes shared by the unit tests.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Error;
use crate::mediator::{ApiRequest, ApiResponse, Transport};
use crate::notify::{Notification, Notifier};
use crate::store::{KeyValueStore, MemoryStore, StoreError};

#[derive(Default)]
pub(crate) struct RecordingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn messages(&self) -> Vec<String> {
        self.seen.lock().iter().map(|n| n.message.clone()).collect()
    }

    pub(crate) fn all(&self) -> Vec<Notification> {
        self.seen.lock().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.seen.lock().push(notification);
    }
}

/// Memory store whose writes to selected keys fail.
#[derive(Default)]
pub(crate) struct FailingStore {
    inner: MemoryStore,
    failing: HashSet<String>,
    set_calls: Mutex<usize>,
}

impl FailingStore {
    pub(crate) fn failing_on(key: &str) -> Self {
        Self {
            failing: HashSet::from([key.to_owned()]),
            ..Self::default()
        }
    }

    /// Number of single-key writes attempted, failed ones included.
    pub(crate) fn set_calls(&self) -> usize {
        *self.set_calls.lock()
    }
}

impl KeyValueStore for FailingStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        *self.set_calls.lock() += 1;
        if self.failing.contains(key) {
            return Err(StoreError::Refused("quota exceeded".into()));
        }
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.inner.remove(key)
    }
}

type Responder = dyn Fn(&ApiRequest) -> ApiResponse + Send + Sync;

/// Transport answering every request through a closure and recording what it saw.
///
/// Each call yields once before answering so concurrently polled calls are
/// all dispatched before any of them resolves.
pub(crate) struct ScriptedTransport {
    responder: Box<Responder>,
    seen: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new(
        responder: impl Fn(&ApiRequest) -> ApiResponse + Send + Sync + 'static,
    ) -> Self {
        Self {
            responder: Box::new(responder),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn requests(&self) -> Vec<ApiRequest> {
        self.seen.lock().clone()
    }
}

impl Transport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, Error> {
        self.seen.lock().push(request.clone());
        tokio::task::yield_now().await;
        Ok((self.responder)(&request))
    }
}

/// Build an unsigned dotted token whose payload carries `sub` and `role`.
pub(crate) fn token_for(sub: &str, role: &str) -> String {
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"{sub}","role":"{role}"}}"#));
    format!("{header}.{payload}.signature")
}
