pub mod config;
pub mod error;
pub mod retry;
pub mod scores;
pub mod types;

pub use config::Config;
pub use error::{PerceptionsError, Result};
pub use retry::{retry_with_backoff, Backoff};
pub use scores::*;
pub use types::*;
