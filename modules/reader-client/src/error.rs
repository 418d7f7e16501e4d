use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReaderError>;

#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("Reader request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

impl ReaderError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ReaderError::Timeout)
    }
}

impl From<reqwest::Error> for ReaderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ReaderError::Timeout
        } else {
            ReaderError::Network(err.to_string())
        }
    }
}
