use thiserror::Error;

pub type Result<T> = std::result::Result<T, PerceptionsError>;

#[derive(Error, Debug)]
pub enum PerceptionsError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid search response: {0}")]
    InvalidSearchResponse(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
