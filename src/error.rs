use thiserror::Error;

pub type Result<T> = std::result::Result<T, LottoError>;

#[derive(Error, Debug)]
pub enum LottoError {
    #[error("lottery site is under system maintenance")]
    SiteUnavailable,

    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("unexpected response: {0}")]
    Parse(String),

    #[error("purchase rejected: {0}")]
    PurchaseRejected(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("no data found: {0}")]
    NoDataFound(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{operation}: {cause}")]
    Context {
        operation: &'static str,
        cause: Box<LottoError>,
    },
}

/// Flat view of [`LottoError`] with any operation context peeled off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    SiteUnavailable,
    AuthenticationFailed,
    Parse,
    PurchaseRejected,
    InvalidInput,
    NoDataFound,
    Transport,
}

impl LottoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LottoError::SiteUnavailable => ErrorKind::SiteUnavailable,
            LottoError::AuthenticationFailed(_) => ErrorKind::AuthenticationFailed,
            LottoError::Parse(_) => ErrorKind::Parse,
            LottoError::PurchaseRejected(_) => ErrorKind::PurchaseRejected,
            LottoError::InvalidInput(_) => ErrorKind::InvalidInput,
            LottoError::NoDataFound(_) => ErrorKind::NoDataFound,
            LottoError::Http(_) => ErrorKind::Transport,
            LottoError::Context { cause, .. } => cause.kind(),
        }
    }

    /// Tags the error with the endpoint or step that raised it.
    pub fn during(self, operation: &'static str) -> Self {
        LottoError::Context {
            operation,
            cause: Box::new(self),
        }
    }

    pub(crate) fn parse(message: impl Into<String>) -> Self {
        LottoError::Parse(message.into())
    }
}

impl From<serde_json::Error> for LottoError {
    fn from(err: serde_json::Error) -> Self {
        LottoError::Parse(format!("malformed JSON: {}", err))
    }
}
