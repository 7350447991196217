/// All error types surfaced by the bridge session and pairing flow.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The credential is missing or was rejected by the bridge.
    ///
    /// Recoverable by running a fresh pairing flow.
    #[error("authentication required")]
    AuthenticationRequired,

    /// The bridge could not be reached in time or the transport failed.
    ///
    /// Recoverable by retrying later.
    #[error("cannot connect to bridge")]
    CannotConnect,

    /// The bridge answered with an unexpected protocol fault.
    #[error("unknown bridge error: {0}")]
    Unknown(String),

    /// The session has not completed setup.
    #[error("bridge session is not set up")]
    NotReady,

    /// Service call data did not match the expected shape.
    #[error("invalid service data: {0:?}")]
    InvalidServiceData(serde_json::Error),
}

impl Error {
    /// Classify a fault reported by the bridge API collaborator.
    pub fn from_api(err: ApiError) -> Self {
        match err {
            ApiError::LinkButtonNotPressed | ApiError::Unauthorized => {
                Error::AuthenticationRequired
            }
            ApiError::Request(_) => Error::CannotConnect,
            ApiError::Protocol(msg) => Error::Unknown(msg),
        }
    }
}

impl From<ApiError> for Error {
    fn from(err: ApiError) -> Self {
        Error::from_api(err)
    }
}

/// Faults reported by a [`crate::BridgeApi`] or [`crate::Discovery`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// Creating a user failed because nobody pressed the bridge's link button.
    #[error("link button not pressed")]
    LinkButtonNotPressed,

    /// The bridge rejected the username.
    #[error("unauthorized")]
    Unauthorized,

    /// The HTTP request could not be completed.
    #[error("request error: {0}")]
    Request(String),

    /// Any other error returned by the bridge.
    #[error("bridge protocol error: {0}")]
    Protocol(String),
}

/// Hacky implementation of PartialEq for testing
#[cfg(test)]
impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}
