//! Training corpus loading.
//!
//! The corpus is a JSON array of labelled trips:
//!
//! ```json
//! [
//!   {
//!     "input": {
//!       "trip_duration_days": 3,
//!       "miles_traveled": 93,
//!       "total_receipts_amount": 1.42
//!     },
//!     "expected_output": 364.51
//!   }
//! ]
//! ```

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, warn};

use crate::types::{check_amount, EngineError, Result, TrainingCase};

/// Trip inputs as they appear on disk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CaseInput {
    pub trip_duration_days: u32,
    pub miles_traveled: f64,
    pub total_receipts_amount: f64,
}

/// A labelled trip as it appears on disk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabeledCase {
    pub input: CaseInput,
    pub expected_output: f64,
}

impl LabeledCase {
    pub fn new(days: u32, miles: f64, receipts: f64, expected_output: f64) -> Self {
        Self {
            input: CaseInput {
                trip_duration_days: days,
                miles_traveled: miles,
                total_receipts_amount: receipts,
            },
            expected_output,
        }
    }
}

/// Parse labelled cases from a reader without building a corpus.
pub fn read_labeled_cases<R: Read>(reader: R) -> Result<Vec<LabeledCase>> {
    Ok(serde_json::from_reader(reader)?)
}

/// Parse labelled cases from a file.
pub fn load_labeled_cases(path: impl AsRef<Path>) -> Result<Vec<LabeledCase>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| EngineError::CorpusIo {
        path: path.to_path_buf(),
        source,
    })?;
    read_labeled_cases(BufReader::new(file))
}

/// Largest input values observed in the corpus.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorpusRanges {
    pub max_days: u32,
    pub max_distance: f64,
    pub max_expense: f64,
}

/// Descriptive numbers for a loaded corpus.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorpusSummary {
    pub cases: usize,
    pub min_days: u32,
    pub max_days: u32,
    pub min_distance: f64,
    pub max_distance: f64,
    pub min_expense: f64,
    pub max_expense: f64,
    pub mean_outcome: f64,
}

/// The historical case set.
///
/// Guaranteed non-empty; every case has finite, non-negative inputs and a
/// finite outcome.
#[derive(Debug, Clone)]
pub struct TrainingCorpus {
    cases: Vec<TrainingCase>,
}

impl TrainingCorpus {
    /// Build a corpus from labelled cases, validating each one.
    pub fn from_labeled(labeled: &[LabeledCase]) -> Result<Self> {
        if labeled.is_empty() {
            return Err(EngineError::EmptyCorpus);
        }

        let mut cases = Vec::with_capacity(labeled.len());
        for (index, case) in labeled.iter().enumerate() {
            let input = &case.input;
            let invalid = |reason: String| EngineError::InvalidCase { index, reason };

            check_amount("miles_traveled", input.miles_traveled).map_err(invalid)?;
            check_amount("total_receipts_amount", input.total_receipts_amount).map_err(invalid)?;
            if !case.expected_output.is_finite() {
                return Err(invalid(format!(
                    "expected_output must be finite, got {}",
                    case.expected_output
                )));
            }
            if input.trip_duration_days == 0 {
                warn!(index, "Zero-day case in corpus, per-day features set to 0");
            }

            cases.push(TrainingCase::new(
                input.trip_duration_days,
                input.miles_traveled,
                input.total_receipts_amount,
                case.expected_output,
            ));
        }

        debug!(cases = cases.len(), "Corpus validated");
        Ok(Self { cases })
    }

    /// Parse a corpus from a JSON reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Self::from_labeled(&read_labeled_cases(reader)?)
    }

    /// Parse a corpus from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let labeled: Vec<LabeledCase> = serde_json::from_str(json)?;
        Self::from_labeled(&labeled)
    }

    /// Load a corpus from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_labeled(&load_labeled_cases(path)?)
    }

    pub fn cases(&self) -> &[TrainingCase] {
        &self.cases
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    /// Always false for a constructed corpus.
    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Mean outcome over every case.
    pub fn mean_outcome(&self) -> f64 {
        self.cases.iter().map(|c| c.outcome).sum::<f64>() / self.cases.len() as f64
    }

    /// Largest observed inputs.
    pub fn ranges(&self) -> CorpusRanges {
        self.cases.iter().fold(
            CorpusRanges {
                max_days: 0,
                max_distance: 0.0,
                max_expense: 0.0,
            },
            |acc, c| CorpusRanges {
                max_days: acc.max_days.max(c.days),
                max_distance: acc.max_distance.max(c.distance),
                max_expense: acc.max_expense.max(c.expense),
            },
        )
    }

    /// Counts, input extremes and mean outcome.
    pub fn summary(&self) -> CorpusSummary {
        let ranges = self.ranges();
        CorpusSummary {
            cases: self.cases.len(),
            min_days: self.cases.iter().map(|c| c.days).min().unwrap_or(0),
            max_days: ranges.max_days,
            min_distance: self.cases.iter().map(|c| c.distance).fold(f64::INFINITY, f64::min),
            max_distance: ranges.max_distance,
            min_expense: self.cases.iter().map(|c| c.expense).fold(f64::INFINITY, f64::min),
            max_expense: ranges.max_expense,
            mean_outcome: self.mean_outcome(),
        }
    }
}
