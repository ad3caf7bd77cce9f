use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecError {
    /// Raised before any network call.
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("transport error: {message}")]
    Transport { message: String },

    #[error("execution backend unavailable (HTTP {status})")]
    Unavailable { status: u16 },

    #[error("execution backend rejected the credentials")]
    Unauthorized,

    #[error("execution backend returned HTTP {status}: {body}")]
    Backend { status: u16, body: String },

    #[error("malformed backend response: {0}")]
    Decode(String),
}

impl ExecError {
    /// Only failures where the request may never have reached the backend are retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Unavailable { .. })
    }
}

impl From<reqwest::Error> for ExecError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport {
                message: err.to_string(),
            }
        }
    }
}

pub type ExecResult<T> = Result<T, ExecError>;
