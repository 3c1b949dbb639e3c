//! Per-feature normalization statistics.

use serde::{Deserialize, Serialize};

use crate::features::{Feature, FeatureVector, FEATURE_COUNT};
use crate::types::{EngineError, Result, TrainingCase};

/// A feature vector after z-score normalization.
pub type NormalizedVector = [f64; FEATURE_COUNT];

/// Mean and standard deviation of one feature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureStats {
    pub mean: f64,
    pub std: f64,
}

impl FeatureStats {
    /// Population statistics over `values`.
    ///
    /// Zero variance gives std 1.0; `min_std` floors the result.
    fn from_values(values: impl Iterator<Item = f64> + Clone, min_std: f64) -> Self {
        let (sum, n) = values.clone().fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
        let mean = sum / n as f64;
        let variance = values.map(|v| (v - mean) * (v - mean)).sum::<f64>() / n as f64;

        let std = if variance > 0.0 { variance.sqrt() } else { 1.0 };
        let std = std.max(min_std);

        Self { mean, std }
    }

    pub fn normalize(&self, value: f64) -> f64 {
        (value - self.mean) / self.std
    }
}

/// Normalization statistics for every feature, computed once per corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationStats {
    features: [FeatureStats; FEATURE_COUNT],
}

impl NormalizationStats {
    /// Compute statistics over the whole case set.
    pub fn compute(cases: &[TrainingCase], min_std: f64) -> Result<Self> {
        if cases.is_empty() {
            return Err(EngineError::EmptyCorpus);
        }

        let features = Feature::ALL.map(|feature| {
            FeatureStats::from_values(cases.iter().map(move |c| c.derived.get(feature)), min_std)
        });

        Ok(Self { features })
    }

    pub fn get(&self, feature: Feature) -> FeatureStats {
        self.features[feature.index()]
    }

    /// Normalize a whole vector.
    pub fn normalize(&self, vector: &FeatureVector) -> NormalizedVector {
        Feature::ALL.map(|feature| self.get(feature).normalize(vector.get(feature)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cases(rows: &[(u32, f64, f64)]) -> Vec<TrainingCase> {
        rows.iter()
            .map(|&(d, m, r)| TrainingCase::new(d, m, r, 100.0))
            .collect()
    }

    #[test]
    fn test_population_mean_and_std() {
        let stats = NormalizationStats::compute(&cases(&[(1, 10.0, 0.0), (3, 30.0, 0.0)]), 0.0).unwrap();
        let days = stats.get(Feature::Days);
        assert_eq!(days.mean, 2.0);
        assert_eq!(days.std, 1.0);
        let distance = stats.get(Feature::Distance);
        assert_eq!(distance.mean, 20.0);
        assert_eq!(distance.std, 10.0);
    }

    #[test]
    fn test_zero_variance_defaults_to_one() {
        let stats = NormalizationStats::compute(&cases(&[(2, 10.0, 4.0), (2, 10.0, 4.0)]), 0.0).unwrap();
        for feature in Feature::ALL {
            assert_eq!(stats.get(feature).std, 1.0);
        }
    }

    #[test]
    fn test_min_std_floor() {
        // expense spread of 0.02 has std 0.01, lifted to the floor
        let rows = [(1, 10.0, 5.0), (1, 10.0, 5.02)];
        let raw = NormalizationStats::compute(&cases(&rows), 0.0).unwrap();
        assert!(raw.get(Feature::Expense).std < 0.1);

        let floored = NormalizationStats::compute(&cases(&rows), 0.1).unwrap();
        assert_eq!(floored.get(Feature::Expense).std, 0.1);
        assert_eq!(floored.get(Feature::Days).std, 1.0);
    }

    #[test]
    fn test_empty_cases() {
        assert!(matches!(
            NormalizationStats::compute(&[], 0.0),
            Err(EngineError::EmptyCorpus)
        ));
    }

    #[test]
    fn test_normalize_vector() {
        let corpus = cases(&[(1, 10.0, 0.0), (3, 30.0, 0.0)]);
        let stats = NormalizationStats::compute(&corpus, 0.0).unwrap();
        let normalized = stats.normalize(&FeatureVector::derive(3, 10.0, 0.0));
        assert_eq!(normalized[Feature::Days.index()], 1.0);
        assert_eq!(normalized[Feature::Distance.index()], -1.0);
    }
}
