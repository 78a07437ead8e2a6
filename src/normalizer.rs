//! Weighted-total to weighted-average score conversion.
//!
//! Admission criteria publish a cut-off as the weighted total over every
//! required subject. Dividing by the multiplier sum `W` turns it into a
//! per-subject average that is comparable across programs.

use crate::models::{round2, SubjectMultipliers, DEFAULT_INDIGENOUS_BONUS_FACTOR};

/// Result of a normalization attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Normalized {
    Average(f64),
    /// `W == 0`: there is nothing to divide by.
    Unresolved,
}

impl Normalized {
    pub fn average(self) -> Option<f64> {
        match self {
            Normalized::Average(value) => Some(value),
            Normalized::Unresolved => None,
        }
    }

    /// The normalized value, or `raw` unchanged when normalization was impossible.
    pub fn or_raw(self, raw: f64) -> f64 {
        self.average().unwrap_or(raw)
    }

    pub fn is_resolved(self) -> bool {
        matches!(self, Normalized::Average(_))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ScoreNormalizer {
    bonus_factor: f64,
}

impl Default for ScoreNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_INDIGENOUS_BONUS_FACTOR)
    }
}

impl ScoreNormalizer {
    /// `bonus_factor` is the multiplicative form of the reserved-quota bonus
    /// (1.35 for a 35% bonus). It is validated by `Config::validate`.
    pub fn new(bonus_factor: f64) -> Self {
        Self { bonus_factor }
    }

    pub fn bonus_factor(&self) -> f64 {
        self.bonus_factor
    }

    /// `round(S / W, 2)`.
    pub fn normalize_general(&self, raw_total: f64, multipliers: &SubjectMultipliers) -> Normalized {
        Self::divide(raw_total, multipliers.weighted_sum())
    }

    /// `round((S_b / bonus) / W, 2)`.
    pub fn normalize_indigenous(
        &self,
        raw_total: f64,
        multipliers: &SubjectMultipliers,
    ) -> Normalized {
        Self::divide(raw_total / self.bonus_factor, multipliers.weighted_sum())
    }

    fn divide(total: f64, weighted_sum: f64) -> Normalized {
        if weighted_sum > 0.0 {
            Normalized::Average(round2(total / weighted_sum))
        } else {
            Normalized::Unresolved
        }
    }
}
