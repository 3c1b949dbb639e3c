//! Weighted Euclidean distance over normalized features.

use crate::config::FeatureWeights;
use crate::features::{Feature, FeatureVector, FEATURE_COUNT};
use crate::stats::{NormalizationStats, NormalizedVector};

/// Weighted Euclidean metric.
///
/// Operates on normalized vectors so the corpus can be normalized once at
/// build time; [`WeightedEuclidean::between`] normalizes raw vectors first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedEuclidean {
    weights: [f64; FEATURE_COUNT],
}

impl WeightedEuclidean {
    pub fn new(weights: &FeatureWeights) -> Self {
        Self {
            weights: Feature::ALL.map(|feature| weights.get(feature)),
        }
    }

    /// Distance between two normalized vectors.
    pub fn distance(&self, a: &NormalizedVector, b: &NormalizedVector) -> f64 {
        a.iter()
            .zip(b.iter())
            .zip(self.weights.iter())
            .map(|((x, y), w)| {
                let diff = x - y;
                w * diff * diff
            })
            .sum::<f64>()
            .sqrt()
    }

    /// Distance between two raw feature vectors.
    pub fn between(&self, stats: &NormalizationStats, a: &FeatureVector, b: &FeatureVector) -> f64 {
        self.distance(&stats.normalize(a), &stats.normalize(b))
    }
}
