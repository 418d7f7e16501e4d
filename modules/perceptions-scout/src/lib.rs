pub mod pipeline;
pub mod plants;
pub mod scorer;
pub mod store;

pub use pipeline::{StageReport, Workers};
pub use plants::{load_plants, Plant};
pub use scorer::{ClaudeScorer, Scorer};
pub use store::{ResultsStore, Stage};
