//! User-facing notifications (toasts) raised by the session manager and the
//! request mediator. Rendering them is the host's job.

pub(crate) const LOGIN_SUCCESS: &str = "Login successful!";
pub(crate) const LOGIN_SAVE_FAILED: &str = "Error saving login data";
pub(crate) const LOGOUT_SUCCESS: &str = "Logged out successfully";
pub(crate) const SESSION_EXPIRED: &str = "Session expired. Please login again.";
pub(crate) const PERMISSION_DENIED: &str = "You do not have permission to perform this action.";
pub(crate) const SERVER_ERROR: &str = "Server error. Please try again later.";
pub(crate) const GENERIC_ERROR: &str = "An error occurred";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: Level,
    pub message: String,
}

impl Notification {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: Level::Success,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            message: message.into(),
        }
    }
}

/// Consumer-provided notification sink.
pub trait Notifier: Send + Sync + 'static {
    fn notify(&self, notification: Notification);
}

/// Forwards notifications to `tracing`. Used when the host supplies no sink.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            Level::Success => tracing::info!(message = %notification.message, "notification"),
            Level::Error => tracing::warn!(message = %notification.message, "notification"),
        }
    }
}
