//! Batch evaluation against labelled cases.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::corpus::LabeledCase;

/// Error below which a prediction counts as exact.
pub const EXACT_TOLERANCE: f64 = 0.01;

/// Error below which a prediction counts as close.
pub const CLOSE_TOLERANCE: f64 = 1.0;

/// Outcome for one labelled case.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CaseResult {
    /// Position in the evaluated set
    pub index: usize,
    pub case: LabeledCase,
    pub predicted: f64,
    pub error: f64,
}

/// Aggregate accuracy over a labelled set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub total: usize,
    /// Cases with |error| < 0.01
    pub exact_matches: usize,
    /// Cases with |error| < 1.0
    pub close_matches: usize,
    pub mean_absolute_error: f64,
    pub max_error: f64,
    /// Largest errors, worst first
    pub worst: Vec<CaseResult>,
    /// Cases rejected before prediction
    pub rejected: usize,
}

impl EvaluationReport {
    /// Aggregate per-case results, keeping the `worst_count` largest errors.
    pub fn from_results(mut results: Vec<CaseResult>, rejected: usize, worst_count: usize) -> Self {
        let total = results.len();
        let exact_matches = results.iter().filter(|r| r.error < EXACT_TOLERANCE).count();
        let close_matches = results.iter().filter(|r| r.error < CLOSE_TOLERANCE).count();
        let total_error: f64 = results.iter().map(|r| r.error).sum();
        let max_error = results.iter().map(|r| r.error).fold(0.0, f64::max);
        let mean_absolute_error = if total > 0 { total_error / total as f64 } else { 0.0 };

        results.sort_by(|a, b| b.error.total_cmp(&a.error));
        results.truncate(worst_count);

        Self {
            total,
            exact_matches,
            close_matches,
            mean_absolute_error,
            max_error,
            worst: results,
            rejected,
        }
    }

    /// Fraction of evaluated cases that matched exactly.
    pub fn exact_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.exact_matches as f64 / self.total as f64
        }
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Evaluated cases:      {}", self.total)?;
        if self.rejected > 0 {
            writeln!(f, "Rejected cases:       {}", self.rejected)?;
        }
        writeln!(
            f,
            "Exact matches (±0.01): {} ({:.1}%)",
            self.exact_matches,
            self.exact_rate() * 100.0
        )?;
        writeln!(f, "Close matches (±1.00): {}", self.close_matches)?;
        writeln!(f, "Mean absolute error:  {:.2}", self.mean_absolute_error)?;
        writeln!(f, "Max error:            {:.2}", self.max_error)?;

        if !self.worst.is_empty() {
            writeln!(f, "\nWorst cases:")?;
            for result in &self.worst {
                let input = &result.case.input;
                writeln!(
                    f,
                    "  #{}: {} days, {} miles, ${:.2} -> expected {:.2}, got {:.2} (error {:.2})",
                    result.index,
                    input.trip_duration_days,
                    input.miles_traveled,
                    input.total_receipts_amount,
                    result.case.expected_output,
                    result.predicted,
                    result.error
                )?;
            }
        }
        Ok(())
    }
}

/// Run `predict` over every case in parallel.
///
/// `predict` returns `None` for cases that cannot be evaluated.
pub fn evaluate_with<F>(cases: &[LabeledCase], worst_count: usize, predict: F) -> EvaluationReport
where
    F: Fn(&LabeledCase) -> Option<f64> + Sync,
{
    let outcomes: Vec<Option<CaseResult>> = cases
        .par_iter()
        .enumerate()
        .map(|(index, case)| {
            predict(case).map(|predicted| CaseResult {
                index,
                case: *case,
                predicted,
                error: (predicted - case.expected_output).abs(),
            })
        })
        .collect();

    let rejected = outcomes.iter().filter(|o| o.is_none()).count();
    let results = outcomes.into_iter().flatten().collect();
    EvaluationReport::from_results(results, rejected, worst_count)
}
