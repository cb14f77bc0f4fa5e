use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The server rejected the active session (401). The session has been cleared.
    #[error("Session expired")]
    SessionExpired,

    /// 401 on a call made without an active session, e.g. wrong sign-in credentials.
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// Authenticated but not permitted (403).
    #[error("Permission denied")]
    Forbidden,

    #[error("Server error ({status})")]
    Server { status: u16 },

    /// Any other non-success status.
    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Token error: {0}")]
    Token(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// HTTP status of a server rejection, if this error carries one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::SessionExpired | Self::Unauthorized { .. } => Some(401),
            Self::Forbidden => Some(403),
            Self::Server { status } | Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}
