/// Result type alias for archive operations.
pub type Result<T> = std::result::Result<T, ArchiveError>;

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("Invalid batch: {0}")]
    InvalidBatch(#[from] perceptions_common::PerceptionsError),

    #[error("Search failed: {0}")]
    SearchFailed(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Why a fetched document produced no text.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("Unsupported content type: {0}")]
    Unsupported(String),

    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("Word extraction failed: {0}")]
    Docx(String),

    #[error("Extraction exceeded {0:?}")]
    TimedOut(std::time::Duration),

    #[error("Extractor crashed: {0}")]
    Crashed(String),
}
