pub mod assembler;
pub mod classify;
pub mod error;
pub mod extract;
pub mod fetcher;
pub mod paragraphs;
pub mod partition;
pub mod search;
pub mod truncate;

pub use assembler::{AssemblerConfig, ContentAssembler};
pub use classify::{classify, ContentKind};
pub use error::{ArchiveError, ExtractError, Result};
pub use fetcher::{FetchOutcome, FetchedBody, FetchedContent, Fetcher, HttpFetcher};
pub use paragraphs::repair_paragraphs;
pub use partition::{DocumentPartitioner, Partitioner};
pub use search::{BrightDataSearch, SearchProvider};
pub use truncate::{truncate, Truncated};
