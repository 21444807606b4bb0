//! venture-core: stage-aware KPI derivation and composite investment
//! scoring for startup funding snapshots, plus the success-classifier
//! collaborator trained on the scored table.

pub mod benchmarks;
pub mod classifier;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod features;
pub mod imputation;
pub mod kpi;
pub mod labeling;
pub mod pipeline;
pub mod prediction;
pub mod record;
pub mod rng;
pub mod scoring;
pub mod stage;
pub mod summary;
pub mod table;
pub mod types;

pub use config::ScopeConfig;
pub use error::{ScopeError, ScopeResult};
pub use pipeline::{ScoredRecord, ScoringPipeline, ScoringRun};
pub use record::EntityRecord;
pub use stage::Stage;
