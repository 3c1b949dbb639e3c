//! Trip reimbursement estimation by nearest-neighbour ensemble.
//!
//! Estimates a reimbursement for a trip (days, miles, receipts) from the
//! closest trips in a fixed historical corpus:
//!
//! - **Feature derivation**: seven features per trip, including receipt
//!   transforms and per-day ratios
//! - **Normalization**: z-scores with a floored standard deviation
//! - **Weighted distance**: Euclidean over normalized features
//! - **Adaptive k**: neighbour count chosen from local corpus density
//! - **Ensemble blending**: several k values blended by density
//! - **Smoothing**: distant queries are pulled toward the corpus mean
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    ReimbursementEngine                       │
//! │                                                              │
//! │  ┌────────┐  ┌──────────┐  ┌───────┐  ┌─────────┐            │
//! │  │ Corpus │──│ Features │──│ Stats │──│ Density │  (startup) │
//! │  └────────┘  └──────────┘  └───────┘  └─────────┘            │
//! │                                  │                           │
//! │  Query ──► Features ──► ┌────────▼─────────┐ ──► amount      │
//! │                         │ EnsemblePredictor │                 │
//! │                         └──────────────────┘                 │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use reimburse_engine::{EngineConfig, ReimbursementEngine};
//!
//! let engine = ReimbursementEngine::from_path("public_cases.json", EngineConfig::default())?;
//! let amount = engine.estimate(3, 93.0, 1.42)?;
//! println!("{amount:.2}");
//! # Ok::<(), reimburse_engine::EngineError>(())
//! ```

pub mod config;
pub mod corpus;
pub mod density;
pub mod distance;
pub mod engine;
pub mod evaluation;
pub mod features;
pub mod predictor;
pub mod stats;
pub mod types;

// Re-export main types
pub use config::{
    AdaptiveKConfig, DensityPolicy, EngineConfig, EnsembleConfig, FeatureWeights, KChoice,
    NeighborWeighting, NormalizationConfig, SmoothingConfig,
};
pub use corpus::{CorpusRanges, CorpusSummary, LabeledCase, TrainingCorpus};
pub use density::{BucketKey, DensityIndex, DensityTier};
pub use distance::WeightedEuclidean;
pub use engine::ReimbursementEngine;
pub use evaluation::EvaluationReport;
pub use features::{Feature, FeatureVector};
pub use predictor::{EnsembleMember, EnsemblePredictor, Neighbor, Prediction};
pub use stats::{FeatureStats, NormalizationStats};
pub use types::*;
