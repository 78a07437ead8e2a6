//! Department cut-off -> cohort percentile lookup.
//!
//! Department records only keep the two-decimal weighted average, while the
//! cumulative tables are keyed by integer raw totals. The resolver therefore
//! reconstructs an approximate raw total as `average * subject_count` and
//! rounds it up, treating the result as the lowest raw score consistent with
//! the stored average.
//!
//! This is an approximation: two raw totals that round to the same average can
//! reconstruct to different keys, and the reconstruction multiplies by the
//! subject count rather than the multiplier sum. Callers must not expect the
//! result to be the exact inverse of [`crate::normalizer::ScoreNormalizer`].

use crate::models::{SubjectGroup, SubjectMultipliers};
use tracing::{debug, warn};

// Averages times subject count carry binary noise around whole numbers.
const RECONSTRUCTION_PRECISION: f64 = 1e6;

#[derive(Debug, Clone, Copy, Default)]
pub struct PercentileResolver;

impl PercentileResolver {
    pub fn new() -> Self {
        Self
    }

    /// The table key probed for a given average, or `None` when the inputs
    /// cannot describe a score.
    pub fn threshold_key(average: f64, subject_count: usize) -> Option<u64> {
        if !average.is_finite() || average < 0.0 || subject_count == 0 {
            return None;
        }
        let raw_total = average * subject_count as f64;
        let snapped = (raw_total * RECONSTRUCTION_PRECISION).round() / RECONSTRUCTION_PRECISION;
        Some(snapped.ceil() as u64)
    }

    /// Percentile of candidates at or above the department's cut-off.
    ///
    /// Returns `None` for a missing score, an empty subject set, a threshold
    /// absent from the table (no interpolation) or a table value outside
    /// `[0, 100]`.
    pub fn resolve(
        &self,
        general_score: Option<f64>,
        multipliers: &SubjectMultipliers,
        group_id: &str,
        group: &SubjectGroup,
    ) -> Option<f64> {
        let average = general_score?;
        let key = Self::threshold_key(average, multipliers.subject_count())?;

        let Some(percentile) = group.percentile_at(key) else {
            debug!(group = group_id, key, "threshold not present in percentile table");
            return None;
        };

        if !(0.0..=100.0).contains(&percentile) {
            warn!(
                group = group_id,
                key, percentile, "percentile outside [0, 100], ignoring"
            );
            return None;
        }

        Some(percentile)
    }
}
