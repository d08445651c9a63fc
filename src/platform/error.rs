//! Error types for hosting platform calls.

use thiserror::Error;

/// Errors raised while talking to the hosting platform.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum PlatformError {
    /// The platform answered with a non-success status.
    #[error("{action} rejected with status {status}: {body}")]
    Api {
        /// Operation being attempted (for example `create app`).
        action: String,
        /// HTTP status code returned by the platform.
        status: u16,
        /// Response payload, verbatim.
        body: String,
    },
    /// The request never produced a response (connect failure, timeout).
    #[error("{action} failed: {message}")]
    Transport {
        /// Operation being attempted.
        action: String,
        /// Transport error message.
        message: String,
    },
    /// A success response could not be decoded.
    #[error("failed to decode {action} response: {message}")]
    Decode {
        /// Operation being attempted.
        action: String,
        /// Decoder error message.
        message: String,
    },
    /// The named app does not exist.
    #[error("app {name} not found")]
    NotFound {
        /// App that was addressed.
        name: String,
    },
}

impl PlatformError {
    /// Best available diagnostic: the platform's own payload when it sent
    /// one, otherwise the underlying error message.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::Api { body, .. } if !body.trim().is_empty() => body.clone(),
            Self::Api { status, .. } => format!("status {status}"),
            Self::Transport { message, .. } | Self::Decode { message, .. } => message.clone(),
            Self::NotFound { name } => format!("app {name} not found"),
        }
    }

    /// Returns `true` when the error reports an absent app.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
