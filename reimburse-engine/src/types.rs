//! Core types for the reimbursement engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::features::FeatureVector;

/// A single trip to estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// Trip duration in days
    pub days: u32,
    /// Miles traveled
    pub distance: f64,
    /// Total receipts amount
    pub expense: f64,
}

impl Query {
    /// Create a validated query.
    ///
    /// Distance and expense must be finite and non-negative. A zero-day
    /// trip is accepted; its per-day features derive to 0.
    pub fn new(days: u32, distance: f64, expense: f64) -> Result<Self> {
        check_amount("distance", distance).map_err(EngineError::MalformedQuery)?;
        check_amount("expense", expense).map_err(EngineError::MalformedQuery)?;

        Ok(Self {
            days,
            distance,
            expense,
        })
    }

    /// Derive the feature vector for this query.
    pub fn features(&self) -> FeatureVector {
        FeatureVector::derive(self.days, self.distance, self.expense)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} days, {} miles, ${:.2} receipts",
            self.days, self.distance, self.expense
        )
    }
}

/// A historical trip with its known reimbursement.
///
/// Built once by the corpus loader and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingCase {
    /// Trip duration in days
    pub days: u32,
    /// Miles traveled
    pub distance: f64,
    /// Total receipts amount
    pub expense: f64,
    /// Precomputed features
    pub derived: FeatureVector,
    /// Reimbursement paid for this trip
    pub outcome: f64,
}

impl TrainingCase {
    /// Build a case, deriving its features.
    pub fn new(days: u32, distance: f64, expense: f64, outcome: f64) -> Self {
        Self {
            days,
            distance,
            expense,
            derived: FeatureVector::derive(days, distance, expense),
            outcome,
        }
    }

    /// The query this case would answer.
    pub fn as_query(&self) -> Query {
        Query {
            days: self.days,
            distance: self.distance,
            expense: self.expense,
        }
    }
}

/// Which query input exceeded the observed range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeDimension {
    Days,
    Distance,
    Expense,
}

impl RangeDimension {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            RangeDimension::Days => "days",
            RangeDimension::Distance => "distance",
            RangeDimension::Expense => "expense",
        }
    }
}

/// Non-fatal signal that a query lies well outside the corpus.
///
/// The engine still answers such queries through the smoothing path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExtrapolationWarning {
    /// Offending input
    pub dimension: RangeDimension,
    /// Value supplied by the query
    pub value: f64,
    /// Largest value observed in the corpus
    pub corpus_max: f64,
    /// Multiplier applied to `corpus_max` before comparing
    pub factor: f64,
}

impl fmt::Display for ExtrapolationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} = {} is more than {}x the training maximum of {}",
            self.dimension.as_str(),
            self.value,
            self.factor,
            self.corpus_max
        )
    }
}

/// Error types for the engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Corpus file could not be read
    #[error("Failed to read corpus {path}: {source}")]
    CorpusIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Corpus is not valid JSON in the expected shape
    #[error("Malformed corpus: {0}")]
    CorpusFormat(#[from] serde_json::Error),

    /// Corpus has no cases
    #[error("Training corpus is empty")]
    EmptyCorpus,

    /// A corpus record has unusable values
    #[error("Invalid case #{index}: {reason}")]
    InvalidCase { index: usize, reason: String },

    /// Query rejected before prediction
    #[error("Malformed query: {0}")]
    MalformedQuery(String),

    /// Engine configuration is unusable
    #[error("Configuration error: {0}")]
    Config(String),
}

impl EngineError {
    /// Whether the error prevents the engine from serving any query.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, EngineError::MalformedQuery(_))
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// Reject negative and non-finite amounts.
pub(crate) fn check_amount(name: &str, value: f64) -> std::result::Result<(), String> {
    if !value.is_finite() {
        return Err(format!("{name} must be a finite number, got {value}"));
    }
    if value < 0.0 {
        return Err(format!("{name} must not be negative, got {value}"));
    }
    Ok(())
}
