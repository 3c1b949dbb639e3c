//! Feature derivation.
//!
//! Every trip, historical or queried, is compared through the same seven
//! derived features in the same order.

use serde::{Deserialize, Serialize};

/// Number of derived features.
pub const FEATURE_COUNT: usize = 7;

/// A derived feature, in comparison order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Days,
    Distance,
    Expense,
    SqrtExpense,
    LogExpense,
    DistancePerDay,
    ExpensePerDay,
}

impl Feature {
    /// All features in vector order.
    pub const ALL: [Feature; FEATURE_COUNT] = [
        Feature::Days,
        Feature::Distance,
        Feature::Expense,
        Feature::SqrtExpense,
        Feature::LogExpense,
        Feature::DistancePerDay,
        Feature::ExpensePerDay,
    ];

    /// Position of this feature in a vector.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::Days => "days",
            Feature::Distance => "distance",
            Feature::Expense => "expense",
            Feature::SqrtExpense => "sqrt_expense",
            Feature::LogExpense => "log_expense",
            Feature::DistancePerDay => "distance_per_day",
            Feature::ExpensePerDay => "expense_per_day",
        }
    }
}

/// Derived features for one trip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub days: f64,
    pub distance: f64,
    pub expense: f64,
    pub sqrt_expense: f64,
    pub log_expense: f64,
    pub distance_per_day: f64,
    pub expense_per_day: f64,
}

impl FeatureVector {
    /// Derive features from the raw triple.
    ///
    /// Per-day ratios are 0 for a zero-day trip.
    pub fn derive(days: u32, distance: f64, expense: f64) -> Self {
        let day_count = f64::from(days);
        let (distance_per_day, expense_per_day) = if days > 0 {
            (distance / day_count, expense / day_count)
        } else {
            (0.0, 0.0)
        };

        Self {
            days: day_count,
            distance,
            expense,
            sqrt_expense: expense.sqrt(),
            log_expense: expense.ln_1p(),
            distance_per_day,
            expense_per_day,
        }
    }

    /// Value of a single feature.
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

    /// Values in [`Feature::ALL`] order.
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        Feature::ALL.map(|feature| self.get(feature))
    }
}
