//! Configuration for the reimbursement engine.
//!
//! The conservative ensemble is the default. The fast single-k variant is the
//! same algorithm with the ensemble collapsed to one member, adaptive k off
//! and no smoothing.

use serde::{Deserialize, Serialize};

use crate::features::Feature;
use crate::types::{EngineError, Result};

/// Configuration for a [`ReimbursementEngine`](crate::ReimbursementEngine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Normalization configuration
    pub normalization: NormalizationConfig,
    /// Per-feature distance weights
    pub distance: FeatureWeights,
    /// Density-driven neighbour count
    pub adaptive_k: AdaptiveKConfig,
    /// Ensemble members and their blending
    pub ensemble: EnsembleConfig,
    /// How neighbours are weighted within one member
    pub neighbor_weighting: NeighborWeighting,
    /// Pull toward the global mean for distant queries
    pub smoothing: SmoothingConfig,
    /// Nearest distance below which the neighbour's outcome is returned as-is
    pub exact_match_epsilon: f64,
    /// Inputs beyond this multiple of the corpus maximum raise a warning
    pub out_of_range_factor: f64,
    /// Decimal places in the returned amount
    pub round_decimals: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::conservative()
    }
}

impl EngineConfig {
    /// Adaptive multi-k ensemble with weighted features and smoothing.
    pub fn conservative() -> Self {
        Self {
            normalization: NormalizationConfig { min_std: 0.1 },
            distance: FeatureWeights::default(),
            adaptive_k: AdaptiveKConfig::default(),
            ensemble: EnsembleConfig::default(),
            neighbor_weighting: NeighborWeighting::InverseSquare { offset: 0.01 },
            smoothing: SmoothingConfig::default(),
            exact_match_epsilon: 1e-10,
            out_of_range_factor: 1.5,
            round_decimals: 2,
        }
    }

    /// Single fixed-k predictor with unweighted features.
    pub fn fast() -> Self {
        Self {
            normalization: NormalizationConfig { min_std: 0.0 },
            distance: FeatureWeights::uniform(),
            adaptive_k: AdaptiveKConfig {
                enabled: false,
                ..AdaptiveKConfig::default()
            },
            ensemble: EnsembleConfig {
                k_values: vec![KChoice::Fixed(3)],
                ..EnsembleConfig::default()
            },
            neighbor_weighting: NeighborWeighting::Inverse { offset: 1e-10 },
            smoothing: SmoothingConfig {
                enabled: false,
                ..SmoothingConfig::default()
            },
            ..Self::conservative()
        }
    }

    /// Look up a preset by name.
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "conservative" => Some(Self::conservative()),
            "fast" => Some(Self::fast()),
            _ => None,
        }
    }

    /// Check the configuration can drive a prediction.
    pub fn validate(&self) -> Result<()> {
        if self.ensemble.k_values.is_empty() {
            return Err(EngineError::Config("ensemble needs at least one k value".into()));
        }
        for choice in &self.ensemble.k_values {
            match *choice {
                KChoice::Fixed(0) => {
                    return Err(EngineError::Config("fixed k must be at least 1".into()))
                }
                KChoice::AdaptiveOffset { cap: 0, .. } => {
                    return Err(EngineError::Config("adaptive k cap must be at least 1".into()))
                }
                _ => {}
            }
        }
        if self.adaptive_k.fixed_k == 0 {
            return Err(EngineError::Config("adaptive_k.fixed_k must be at least 1".into()));
        }
        let tiers = &self.adaptive_k;
        if [tiers.dense_k, tiers.medium_k, tiers.sparse_k, tiers.very_sparse_k].contains(&0) {
            return Err(EngineError::Config("adaptive k tiers must be at least 1".into()));
        }

        for feature in Feature::ALL {
            let weight = self.distance.get(feature);
            if !weight.is_finite() || weight < 0.0 {
                return Err(EngineError::Config(format!(
                    "weight for {} must be a non-negative number, got {}",
                    feature.as_str(),
                    weight
                )));
            }
        }

        let min_std = self.normalization.min_std;
        if !min_std.is_finite() || min_std < 0.0 {
            return Err(EngineError::Config(format!(
                "normalization.min_std must be a non-negative number, got {min_std}"
            )));
        }

        let offset = self.neighbor_weighting.offset();
        if !(offset > 0.0) {
            return Err(EngineError::Config(format!(
                "neighbor weighting offset must be positive, got {offset}"
            )));
        }

        let smoothing = &self.smoothing;
        if !(0.0..=1.0).contains(&smoothing.max_weight) {
            return Err(EngineError::Config(format!(
                "smoothing.max_weight must be within [0, 1], got {}",
                smoothing.max_weight
            )));
        }
        if !(smoothing.divisor > 0.0) {
            return Err(EngineError::Config(format!(
                "smoothing.divisor must be positive, got {}",
                smoothing.divisor
            )));
        }

        if !(smoothing.threshold >= 0.0) {
            return Err(EngineError::Config(format!(
                "smoothing.threshold must not be negative, got {}",
                smoothing.threshold
            )));
        }

        if !(self.exact_match_epsilon >= 0.0) {
            return Err(EngineError::Config(format!(
                "exact_match_epsilon must not be negative, got {}",
                self.exact_match_epsilon
            )));
        }
        if !(self.out_of_range_factor > 0.0) {
            return Err(EngineError::Config("out_of_range_factor must be positive".into()));
        }

        Ok(())
    }
}

/// Normalization configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizationConfig {
    /// Floor applied to every feature's standard deviation; 0 disables it
    pub min_std: f64,
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self { min_std: 0.1 }
    }
}

/// Per-feature weights for the distance metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureWeights {
    pub days: f64,
    pub distance: f64,
    pub expense: f64,
    pub sqrt_expense: f64,
    pub log_expense: f64,
    pub distance_per_day: f64,
    pub expense_per_day: f64,
}

impl Default for FeatureWeights {
    fn default() -> Self {
        Self {
            days: 1.0,
            distance: 1.0,
            expense: 1.2,
            sqrt_expense: 1.5,
            log_expense: 1.3,
            distance_per_day: 0.8,
            expense_per_day: 0.8,
        }
    }
}

impl FeatureWeights {
    /// Every feature weighted 1.
    pub fn uniform() -> Self {
        Self {
            days: 1.0,
            distance: 1.0,
            expense: 1.0,
            sqrt_expense: 1.0,
            log_expense: 1.0,
            distance_per_day: 1.0,
            expense_per_day: 1.0,
        }
    }

    /// Weight of a single feature.
    pub fn get(&self, feature: Feature) -> f64 {
        match feature {
            Feature::Days => self.days,
            Feature::Distance => self.distance,
            Feature::Expense => self.expense,
            Feature::SqrtExpense => self.sqrt_expense,
            Feature::LogExpense => self.log_expense,
            Feature::DistancePerDay => self.distance_per_day,
            Feature::ExpensePerDay => self.expense_per_day,
        }
    }
}

/// Density thresholds and the neighbour counts they select.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveKConfig {
    /// Use density to pick k; otherwise `fixed_k` is used
    pub enabled: bool,
    /// k when adaptive selection is disabled
    pub fixed_k: usize,
    /// Minimum exact-bucket count for a dense region
    pub dense_local_min: usize,
    /// Minimum neighbourhood count for a medium-density region
    pub medium_neighborhood_min: usize,
    /// Minimum neighbourhood count for a sparse region
    pub sparse_neighborhood_min: usize,
    pub dense_k: usize,
    pub medium_k: usize,
    pub sparse_k: usize,
    pub very_sparse_k: usize,
}

impl Default for AdaptiveKConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            fixed_k: 3,
            dense_local_min: 5,
            medium_neighborhood_min: 20,
            sparse_neighborhood_min: 10,
            dense_k: 3,
            medium_k: 5,
            sparse_k: 7,
            very_sparse_k: 10,
        }
    }
}

/// One ensemble member's neighbour count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KChoice {
    /// A constant k
    Fixed(usize),
    /// The density-selected k
    Adaptive,
    /// The density-selected k plus an offset, capped
    AdaptiveOffset { offset: usize, cap: usize },
}

impl KChoice {
    /// Resolve against the adaptive k for the current query.
    pub fn resolve(&self, adaptive_k: usize) -> usize {
        match *self {
            KChoice::Fixed(k) => k,
            KChoice::Adaptive => adaptive_k,
            KChoice::AdaptiveOffset { offset, cap } => (adaptive_k + offset).min(cap),
        }
    }
}

/// Which density drives ensemble-member weighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DensityPolicy {
    /// Count in the query's exact bucket
    Local,
    /// Count over the 3x3x3 neighbourhood
    Neighborhood,
}

/// Ensemble configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnsembleConfig {
    /// Neighbour counts evaluated per query; duplicates are kept
    pub k_values: Vec<KChoice>,
    /// Density used to decide between favouring small or large k
    pub density_policy: DensityPolicy,
    /// Density strictly above this favours small k
    pub dense_threshold: usize,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            k_values: vec![
                KChoice::Fixed(3),
                KChoice::Fixed(5),
                KChoice::Adaptive,
                KChoice::AdaptiveOffset { offset: 2, cap: 10 },
            ],
            density_policy: DensityPolicy::Local,
            dense_threshold: 10,
        }
    }
}

/// Neighbour weighting inside one ensemble member.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum NeighborWeighting {
    /// `1 / (d + offset)`
    Inverse { offset: f64 },
    /// `1 / (d + offset)^2`
    InverseSquare { offset: f64 },
}

impl NeighborWeighting {
    /// Weight for a neighbour at `distance`.
    pub fn weight(&self, distance: f64) -> f64 {
        match *self {
            NeighborWeighting::Inverse { offset } => 1.0 / (distance + offset),
            NeighborWeighting::InverseSquare { offset } => {
                let shifted = distance + offset;
                1.0 / (shifted * shifted)
            }
        }
    }

    fn offset(&self) -> f64 {
        match *self {
            NeighborWeighting::Inverse { offset } | NeighborWeighting::InverseSquare { offset } => {
                offset
            }
        }
    }
}

/// Out-of-distribution smoothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    pub enabled: bool,
    /// Nearest distance above which smoothing applies
    pub threshold: f64,
    /// Smoothing weight is `nearest / divisor`, capped
    pub divisor: f64,
    /// Cap on the smoothing weight
    pub max_weight: f64,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 0.5,
            divisor: 10.0,
            max_weight: 0.3,
        }
    }
}

impl SmoothingConfig {
    /// Smoothing weight for a nearest distance, or `None` when disabled or
    /// below threshold.
    pub fn weight_for(&self, nearest_distance: f64) -> Option<f64> {
        (self.enabled && nearest_distance > self.threshold)
            .then(|| (nearest_distance / self.divisor).min(self.max_weight))
    }
}
