//! Ensemble nearest-neighbour predictor.
//!
//! For one query:
//!
//! 1. Rank every corpus case by weighted normalized distance (stable, so
//!    ties keep corpus order).
//! 2. Return the nearest outcome directly on an exact match.
//! 3. Pick an adaptive k from the density index.
//! 4. Take an inverse-distance weighted average for each configured k.
//! 5. Blend the members, favouring small k in dense regions and large k in
//!    sparse ones.
//! 6. Pull toward the global mean when the nearest case is far away.
//! 7. Round.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use tracing::debug;

use crate::config::{DensityPolicy, EngineConfig};
use crate::density::{BucketKey, DensityIndex, DensityTier};
use crate::distance::WeightedEuclidean;
use crate::features::FeatureVector;
use crate::stats::{NormalizationStats, NormalizedVector};
use crate::types::{Query, Result, TrainingCase};

/// Neighbours kept on a [`Prediction`] for inspection.
const REPORTED_NEIGHBORS: usize = 10;

/// A ranked corpus case.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    /// Position in the corpus
    pub index: usize,
    pub distance: f64,
    pub outcome: f64,
}

/// One member of the ensemble.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnsembleMember {
    /// Requested neighbour count
    pub k: usize,
    /// Distance-weighted average over the k nearest
    pub prediction: f64,
    /// Blending weight
    pub weight: f64,
}

/// Full account of one prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Final amount, rounded
    pub amount: f64,
    /// Final amount before rounding
    pub raw: f64,
    /// Blended ensemble value before smoothing
    pub ensemble: f64,
    /// Nearest case matched the query exactly
    pub exact_match: bool,
    pub nearest_distance: f64,
    pub bucket: BucketKey,
    pub local_density: usize,
    pub neighborhood_density: usize,
    /// Density tier, when adaptive k is enabled
    pub tier: Option<DensityTier>,
    pub adaptive_k: usize,
    /// Empty on an exact match
    pub members: Vec<EnsembleMember>,
    /// Weight given to the global mean, when smoothing applied
    pub smoothing: Option<f64>,
    pub global_mean: f64,
    /// Closest cases in rank order
    pub nearest: Vec<Neighbor>,
}

impl Prediction {
    /// Human-readable report.
    pub fn explain(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Estimate: {:.2}", self.amount);

        if self.exact_match {
            let _ = writeln!(out, "  exact match with case #{}", self.nearest[0].index);
        } else {
            let _ = writeln!(out, "  ensemble: {:.4}", self.ensemble);
            if let Some(weight) = self.smoothing {
                let _ = writeln!(
                    out,
                    "  smoothed toward global mean {:.2} with weight {:.3}",
                    self.global_mean, weight
                );
            }
        }

        let _ = writeln!(
            out,
            "\nDensity: bucket ({}, {}, {}), local {}, neighborhood {}",
            self.bucket.days,
            self.bucket.distance,
            self.bucket.expense,
            self.local_density,
            self.neighborhood_density
        );
        match self.tier {
            Some(tier) => {
                let _ = writeln!(out, "  tier {} -> k = {}", tier.as_str(), self.adaptive_k);
            }
            None => {
                let _ = writeln!(out, "  adaptive k disabled, k = {}", self.adaptive_k);
            }
        }

        if !self.members.is_empty() {
            out.push_str("\nEnsemble members:\n");
            for member in &self.members {
                let _ = writeln!(
                    out,
                    "  k={:<3} prediction={:.4} weight={:.4}",
                    member.k, member.prediction, member.weight
                );
            }
        }

        out.push_str("\nNearest neighbors:\n");
        for (rank, neighbor) in self.nearest.iter().enumerate() {
            let _ = writeln!(
                out,
                "  #{}: case={} distance={:.4} outcome={:.2}",
                rank + 1,
                neighbor.index,
                neighbor.distance,
                neighbor.outcome
            );
        }

        out
    }
}

/// Immutable prediction context built once per corpus.
#[derive(Debug, Clone)]
pub struct EnsemblePredictor {
    config: EngineConfig,
    stats: NormalizationStats,
    metric: WeightedEuclidean,
    density: DensityIndex,
    normalized: Vec<NormalizedVector>,
    outcomes: Vec<f64>,
    global_mean: f64,
}

impl EnsemblePredictor {
    /// Precompute statistics, density and normalized vectors.
    pub fn build(config: EngineConfig, cases: &[TrainingCase]) -> Result<Self> {
        config.validate()?;
        let stats = NormalizationStats::compute(cases, config.normalization.min_std)?;
        let metric = WeightedEuclidean::new(&config.distance);
        let density = DensityIndex::build(cases);
        let normalized = cases.iter().map(|c| stats.normalize(&c.derived)).collect();
        let outcomes: Vec<f64> = cases.iter().map(|c| c.outcome).collect();
        let global_mean = outcomes.iter().sum::<f64>() / outcomes.len() as f64;

        Ok(Self {
            config,
            stats,
            metric,
            density,
            normalized,
            outcomes,
            global_mean,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn stats(&self) -> &NormalizationStats {
        &self.stats
    }

    pub fn density(&self) -> &DensityIndex {
        &self.density
    }

    pub fn global_mean(&self) -> f64 {
        self.global_mean
    }

    /// Distance between two raw feature vectors under this corpus's normalization.
    pub fn distance(&self, a: &FeatureVector, b: &FeatureVector) -> f64 {
        self.metric.between(&self.stats, a, b)
    }

    /// Every corpus case ordered by distance to `features`.
    pub fn rank(&self, features: &FeatureVector) -> Vec<Neighbor> {
        let query = self.stats.normalize(features);
        let mut ranked: Vec<Neighbor> = self
            .normalized
            .iter()
            .zip(self.outcomes.iter())
            .enumerate()
            .map(|(index, (vector, &outcome))| Neighbor {
                index,
                distance: self.metric.distance(&query, vector),
                outcome,
            })
            .collect();
        ranked.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        ranked
    }

    /// Neighbour count chosen from density, and the tier behind it.
    fn select_k(&self, local: usize, neighborhood: usize) -> (usize, Option<DensityTier>) {
        let adaptive = &self.config.adaptive_k;
        if !adaptive.enabled {
            return (adaptive.fixed_k, None);
        }
        let tier = DensityTier::classify(local, neighborhood, adaptive);
        (tier.k(adaptive), Some(tier))
    }

    fn member_weight(&self, k: usize, dense: bool) -> f64 {
        let root = (k as f64).sqrt();
        if dense {
            1.0 / root
        } else {
            root
        }
    }

    /// Inverse-distance weighted mean outcome of the first `k` neighbours.
    ///
    /// Falls back to the global mean when no neighbour carries weight, which
    /// happens once distances overflow to infinity.
    fn weighted_average(&self, ranked: &[Neighbor], k: usize) -> f64 {
        let weighting = self.config.neighbor_weighting;
        let (sum, total) = ranked
            .iter()
            .take(k)
            .fold((0.0, 0.0), |(sum, total), neighbor| {
                let weight = weighting.weight(neighbor.distance);
                (sum + weight * neighbor.outcome, total + weight)
            });
        if total > 0.0 && total.is_finite() {
            sum / total
        } else {
            self.global_mean
        }
    }

    /// Predict with a full breakdown.
    pub fn predict(&self, query: &Query) -> Prediction {
        let ranked = self.rank(&query.features());
        let nearest_distance = ranked[0].distance;

        let bucket = BucketKey::new(query.days, query.distance, query.expense);
        let local_density = self.density.local_density(&bucket);
        let neighborhood_density = self.density.neighborhood_density(&bucket);
        let (adaptive_k, tier) = self.select_k(local_density, neighborhood_density);

        let mut prediction = Prediction {
            amount: 0.0,
            raw: 0.0,
            ensemble: 0.0,
            exact_match: false,
            nearest_distance,
            bucket,
            local_density,
            neighborhood_density,
            tier,
            adaptive_k,
            members: Vec::new(),
            smoothing: None,
            global_mean: self.global_mean,
            nearest: ranked.iter().take(REPORTED_NEIGHBORS).copied().collect(),
        };

        if nearest_distance < self.config.exact_match_epsilon {
            debug!(case = ranked[0].index, "Exact match");
            prediction.exact_match = true;
            prediction.ensemble = ranked[0].outcome;
            prediction.raw = ranked[0].outcome;
            prediction.amount = round_to(ranked[0].outcome, self.config.round_decimals);
            return prediction;
        }

        let ensemble = &self.config.ensemble;
        let weighting_density = match ensemble.density_policy {
            DensityPolicy::Local => local_density,
            DensityPolicy::Neighborhood => neighborhood_density,
        };
        let dense = weighting_density > ensemble.dense_threshold;

        prediction.members = ensemble
            .k_values
            .iter()
            .map(|choice| {
                let k = choice.resolve(adaptive_k);
                EnsembleMember {
                    k,
                    prediction: self.weighted_average(&ranked, k),
                    weight: self.member_weight(k, dense),
                }
            })
            .collect();

        let (weighted, total) = prediction
            .members
            .iter()
            .fold((0.0, 0.0), |(sum, total), m| (sum + m.prediction * m.weight, total + m.weight));
        prediction.ensemble = weighted / total;

        let smoothing = self.config.smoothing.weight_for(nearest_distance);
        prediction.raw = match smoothing {
            Some(weight) => (1.0 - weight) * prediction.ensemble + weight * self.global_mean,
            None => prediction.ensemble,
        };
        prediction.smoothing = smoothing;
        prediction.amount = round_to(prediction.raw, self.config.round_decimals);

        debug!(
            nearest_distance,
            adaptive_k,
            local_density,
            neighborhood_density,
            smoothing = ?smoothing,
            amount = prediction.amount,
            "Prediction computed"
        );

        prediction
    }
}

/// Round to a number of decimal places.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (value * scale).round() / scale
}
