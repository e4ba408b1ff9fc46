use thiserror::Error;

/// Failures surfaced to callers of the passport service and the community store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PassportError {
    #[error("unknown join code: {0}")]
    NotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),
}

impl PassportError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidInput(reason.into())
    }
}
