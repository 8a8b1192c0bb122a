//! `orglink-linkage`: probabilistic record-linkage engine.
//!
//! Pure engine crate: receives pre-loaded records and labeled example pairs,
//! trains a signature → label table under false-positive / false-negative
//! budgets, and classifies candidate pairs across two datasets.
//! No CLI dependencies.

pub mod classifier;
pub mod config;
pub mod engine;
pub mod error;
pub mod matcher;
pub mod model;
pub mod normalize;
pub mod similarity;

pub use classifier::{train, ErrorBudget, RecordIndex, TrainedModel};
pub use config::LinkageConfig;
pub use engine::run;
pub use error::{ErrorKind, LinkageError};
pub use matcher::{find_matches, MatchOptions, MatchOutput};
pub use model::{
    LabelTable, LabeledPair, LinkageInput, LinkageResult, LinkedPair, MatchLabel, Record,
    SimilarityBucket, SimilaritySignature,
};
pub use similarity::compute;
