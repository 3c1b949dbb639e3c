//! Coarse grid density over the corpus.
//!
//! Cases are bucketed by exact day count, 100-mile distance bands and
//! 200-dollar expense bands. Counts drive the adaptive neighbour count.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::AdaptiveKConfig;
use crate::types::TrainingCase;

/// Distance band width.
pub const DISTANCE_BUCKET_WIDTH: f64 = 100.0;

/// Expense band width.
pub const EXPENSE_BUCKET_WIDTH: f64 = 200.0;

/// Grid cell of a trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BucketKey {
    pub days: i64,
    /// Lower edge of the distance band
    pub distance: i64,
    /// Lower edge of the expense band
    pub expense: i64,
}

impl BucketKey {
    pub fn new(days: u32, distance: f64, expense: f64) -> Self {
        Self {
            days: i64::from(days),
            distance: band(distance, DISTANCE_BUCKET_WIDTH),
            expense: band(expense, EXPENSE_BUCKET_WIDTH),
        }
    }

    /// This cell and its adjacent cells.
    ///
    /// Cells whose edges fall outside the `i64` range are skipped, so keys
    /// at the saturated edge of the grid yield fewer than 27 cells.
    pub fn neighborhood(&self) -> impl Iterator<Item = BucketKey> + '_ {
        let distance_step = DISTANCE_BUCKET_WIDTH as i64;
        let expense_step = EXPENSE_BUCKET_WIDTH as i64;
        (-1..=1).flat_map(move |dd| {
            (-1..=1).flat_map(move |dm| {
                (-1..=1).filter_map(move |de| {
                    Some(BucketKey {
                        days: self.days.checked_add(dd)?,
                        distance: self.distance.checked_add(dm * distance_step)?,
                        expense: self.expense.checked_add(de * expense_step)?,
                    })
                })
            })
        })
    }
}

/// Lower band edge; saturates at `i64::MAX` for huge values.
fn band(value: f64, width: f64) -> i64 {
    ((value / width).floor() * width) as i64
}

/// Density tier of a query's region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DensityTier {
    Dense,
    Medium,
    Sparse,
    VerySparse,
}

impl DensityTier {
    /// Classify from exact-bucket and neighbourhood counts.
    pub fn classify(local: usize, neighborhood: usize, config: &AdaptiveKConfig) -> Self {
        if local >= config.dense_local_min {
            DensityTier::Dense
        } else if neighborhood >= config.medium_neighborhood_min {
            DensityTier::Medium
        } else if neighborhood >= config.sparse_neighborhood_min {
            DensityTier::Sparse
        } else {
            DensityTier::VerySparse
        }
    }

    /// Neighbour count for this tier.
    pub fn k(self, config: &AdaptiveKConfig) -> usize {
        match self {
            DensityTier::Dense => config.dense_k,
            DensityTier::Medium => config.medium_k,
            DensityTier::Sparse => config.sparse_k,
            DensityTier::VerySparse => config.very_sparse_k,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DensityTier::Dense => "dense",
            DensityTier::Medium => "medium",
            DensityTier::Sparse => "sparse",
            DensityTier::VerySparse => "very_sparse",
        }
    }
}

/// Case counts per grid cell.
#[derive(Debug, Clone, Default)]
pub struct DensityIndex {
    counts: HashMap<BucketKey, usize>,
}

impl DensityIndex {
    pub fn build(cases: &[TrainingCase]) -> Self {
        let mut counts = HashMap::new();
        for case in cases {
            *counts
                .entry(BucketKey::new(case.days, case.distance, case.expense))
                .or_insert(0) += 1;
        }
        Self { counts }
    }

    /// Number of occupied cells.
    pub fn bucket_count(&self) -> usize {
        self.counts.len()
    }

    /// Cases in exactly this cell.
    pub fn local_density(&self, key: &BucketKey) -> usize {
        self.counts.get(key).copied().unwrap_or(0)
    }

    /// Cases in this cell and its adjacent cells.
    pub fn neighborhood_density(&self, key: &BucketKey) -> usize {
        key.neighborhood().map(|k| self.local_density(&k)).sum()
    }

    /// Adaptive neighbour count for a cell.
    pub fn adaptive_k(&self, key: &BucketKey, config: &AdaptiveKConfig) -> usize {
        DensityTier::classify(self.local_density(key), self.neighborhood_density(key), config)
            .k(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_key_floors() {
        let key = BucketKey::new(3, 199.9, 399.99);
        assert_eq!(key, BucketKey { days: 3, distance: 100, expense: 200 });
        let key = BucketKey::new(1, 0.0, 0.0);
        assert_eq!(key, BucketKey { days: 1, distance: 0, expense: 0 });
        let key = BucketKey::new(2, 200.0, 200.0);
        assert_eq!(key, BucketKey { days: 2, distance: 200, expense: 200 });
    }

    #[test]
    fn test_neighborhood_has_27_cells() {
        let key = BucketKey::new(2, 150.0, 250.0);
        let cells: Vec<_> = key.neighborhood().collect();
        assert_eq!(cells.len(), 27);
        assert!(cells.contains(&key));
        assert!(cells.contains(&BucketKey { days: 1, distance: 0, expense: 0 }));
        assert!(cells.contains(&BucketKey { days: 3, distance: 200, expense: 400 }));
    }

    #[test]
    fn test_huge_values_saturate_without_overflow() {
        let key = BucketKey::new(3, 1e19, 1e200);
        assert_eq!(key.distance, i64::MAX);
        assert_eq!(key.expense, i64::MAX);
        // upper distance and expense neighbours do not exist
        assert_eq!(key.neighborhood().count(), 12);

        let index = DensityIndex::build(&[TrainingCase::new(3, 1e19, 1e200, 500.0)]);
        assert_eq!(index.local_density(&key), 1);
        assert_eq!(index.neighborhood_density(&key), 1);
    }

    #[test]
    fn test_local_and_neighborhood_density() {
        let cases = vec![
            TrainingCase::new(2, 150.0, 250.0, 1.0),
            TrainingCase::new(2, 160.0, 210.0, 1.0),
            TrainingCase::new(3, 250.0, 450.0, 1.0),
            TrainingCase::new(5, 150.0, 250.0, 1.0),
        ];
        let index = DensityIndex::build(&cases);
        let key = BucketKey::new(2, 150.0, 250.0);
        assert_eq!(index.local_density(&key), 2);
        assert_eq!(index.neighborhood_density(&key), 3);
        assert_eq!(index.local_density(&BucketKey::new(9, 0.0, 0.0)), 0);
        assert_eq!(index.bucket_count(), 3);
    }

    #[test]
    fn test_tier_thresholds() {
        let config = AdaptiveKConfig::default();
        assert_eq!(DensityTier::classify(5, 5, &config).k(&config), 3);
        assert_eq!(DensityTier::classify(4, 20, &config).k(&config), 5);
        assert_eq!(DensityTier::classify(4, 19, &config).k(&config), 7);
        assert_eq!(DensityTier::classify(0, 10, &config).k(&config), 7);
        assert_eq!(DensityTier::classify(0, 9, &config).k(&config), 10);
    }

    #[test]
    fn test_denser_never_selects_larger_k() {
        let config = AdaptiveKConfig::default();
        for local in 0..12 {
            for neighborhood in local..40 {
                let k = DensityTier::classify(local, neighborhood, &config).k(&config);
                let denser_local = DensityTier::classify(local + 1, neighborhood + 1, &config).k(&config);
                let denser_neighborhood = DensityTier::classify(local, neighborhood + 1, &config).k(&config);
                assert!(denser_local <= k);
                assert!(denser_neighborhood <= k);
            }
        }
    }

    #[test]
    fn test_adaptive_k_dense_cell() {
        let cases: Vec<_> = (0..5).map(|i| TrainingCase::new(1, 10.0 + i as f64, 20.0, 1.0)).collect();
        let index = DensityIndex::build(&cases);
        let config = AdaptiveKConfig::default();
        assert_eq!(index.adaptive_k(&BucketKey::new(1, 50.0, 50.0), &config), 3);
        assert_eq!(index.adaptive_k(&BucketKey::new(8, 50.0, 50.0), &config), 10);
    }
}
