//! ReimbursementEngine - main entry point for estimates.
//!
//! Owns the corpus and every structure derived from it. All state is built
//! in [`ReimbursementEngine::new`] and never changes afterwards, so one
//! engine can serve queries from any number of threads.

use std::path::Path;
use tracing::info;

use crate::config::EngineConfig;
use crate::corpus::{CorpusRanges, CorpusSummary, LabeledCase, TrainingCorpus};
use crate::evaluation::{evaluate_with, EvaluationReport};
use crate::predictor::{EnsemblePredictor, Prediction};
use crate::types::{ExtrapolationWarning, Query, RangeDimension, Result};

/// Nearest-neighbour reimbursement estimator.
#[derive(Debug, Clone)]
pub struct ReimbursementEngine {
    corpus: TrainingCorpus,
    predictor: EnsemblePredictor,
    ranges: CorpusRanges,
}

impl ReimbursementEngine {
    /// Build an engine over a loaded corpus.
    pub fn new(corpus: TrainingCorpus, config: EngineConfig) -> Result<Self> {
        let predictor = EnsemblePredictor::build(config, corpus.cases())?;
        let ranges = corpus.ranges();

        info!(
            cases = corpus.len(),
            buckets = predictor.density().bucket_count(),
            global_mean = predictor.global_mean(),
            "Reimbursement engine ready"
        );

        Ok(Self {
            corpus,
            predictor,
            ranges,
        })
    }

    /// Load the corpus from a JSON file and build an engine.
    pub fn from_path(path: impl AsRef<Path>, config: EngineConfig) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading training corpus");
        Self::new(TrainingCorpus::load(path)?, config)
    }

    pub fn corpus(&self) -> &TrainingCorpus {
        &self.corpus
    }

    pub fn config(&self) -> &EngineConfig {
        self.predictor.config()
    }

    pub fn predictor(&self) -> &EnsemblePredictor {
        &self.predictor
    }

    pub fn ranges(&self) -> CorpusRanges {
        self.ranges
    }

    pub fn summary(&self) -> CorpusSummary {
        self.corpus.summary()
    }

    /// Rounded estimate for a query.
    pub fn predict(&self, query: &Query) -> f64 {
        self.predictor.predict(query).amount
    }

    /// Estimate with the full ensemble breakdown.
    pub fn predict_detailed(&self, query: &Query) -> Prediction {
        self.predictor.predict(query)
    }

    /// Validate raw inputs and estimate.
    pub fn estimate(&self, days: u32, distance: f64, expense: f64) -> Result<f64> {
        let query = Query::new(days, distance, expense)?;
        Ok(self.predict(&query))
    }

    /// Inputs lying beyond `out_of_range_factor` times the corpus maximum.
    pub fn check_range(&self, query: &Query) -> Vec<ExtrapolationWarning> {
        let factor = self.config().out_of_range_factor;
        let checks = [
            (RangeDimension::Days, f64::from(query.days), f64::from(self.ranges.max_days)),
            (RangeDimension::Distance, query.distance, self.ranges.max_distance),
            (RangeDimension::Expense, query.expense, self.ranges.max_expense),
        ];

        checks
            .into_iter()
            .filter(|&(_, value, max)| value > max * factor)
            .map(|(dimension, value, corpus_max)| ExtrapolationWarning {
                dimension,
                value,
                corpus_max,
                factor,
            })
            .collect()
    }

    /// Predict every labelled case and summarise the errors.
    pub fn evaluate(&self, cases: &[LabeledCase], worst_count: usize) -> EvaluationReport {
        let report = evaluate_with(cases, worst_count, |case| {
            let input = &case.input;
            Query::new(
                input.trip_duration_days,
                input.miles_traveled,
                input.total_receipts_amount,
            )
            .ok()
            .map(|query| self.predict(&query))
        });

        info!(
            total = report.total,
            exact = report.exact_matches,
            mae = report.mean_absolute_error,
            "Evaluation complete"
        );
        report
    }
}
