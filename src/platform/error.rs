//! Error types for platform calls

use thiserror::Error;

/// Errors returned by a [`super::Platform`] implementation
#[derive(Debug, Error)]
pub enum PlatformError {
    /// The inbox message was not a valid moderator invite
    #[error("Invalid moderator invite")]
    InvalidInvite,

    /// The account lacks permission for the operation
    #[error("Forbidden")]
    Forbidden,

    #[error("Not found")]
    NotFound,

    /// The API answered but reported errors in its JSON body
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// Any other non-success HTTP status
    #[error("Unexpected HTTP status: {0}")]
    Status(u16),

    /// Login failed or the session is unusable
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Request never got a response
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Response body was not what we expected
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl PlatformError {
    /// Map an HTTP status code onto an error
    #[must_use]
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => Self::Auth("unauthorized".to_string()),
            403 => Self::Forbidden,
            404 => Self::NotFound,
            other => Self::Status(other),
        }
    }

    /// Whether the caller may skip this failure and carry on.
    ///
    /// Permission and HTTP status failures on a single item are skippable;
    /// auth, transport and decode failures are not.
    #[must_use]
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            Self::InvalidInvite
                | Self::Forbidden
                | Self::NotFound
                | Self::Rejected(_)
                | Self::Status(_)
        )
    }
}
