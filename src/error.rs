use crate::booking::BookingStatus;

#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("booking not found")]
    NotFound,
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("action '{action}' is not permitted from status {from:?}")]
    InvalidTransition {
        from: BookingStatus,
        action: &'static str,
    },
    #[error("invalid quote: {0}")]
    InvalidQuote(String),
    #[error("completion requires a prior quote with a non-zero price")]
    MissingQuote,
    #[error("booking was modified concurrently, retry the operation")]
    Conflict,
    #[error("invalid booking draft: {0}")]
    InvalidDraft(String),
    #[error("storage failure")]
    Storage(#[from] sled::Error),
    #[error("record encoding failure: {0}")]
    Codec(String),
}

impl From<minicbor::decode::Error> for EngineError {
    fn from(err: minicbor::decode::Error) -> Self {
        EngineError::Codec(err.to_string())
    }
}

impl EngineError {
    /// Callers may retry these; everything else is a final answer.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Conflict | EngineError::Storage(_))
    }
}
