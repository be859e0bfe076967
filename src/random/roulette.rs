//! Weighted-interval ("roulette") selection.
//!
//! `[0, 1)` is split into consecutive half-open intervals of width
//! `p_0, p_1, ..., p_{k-1}` followed by a trailing interval of width
//! `1 - Σp` that stands for "no outcome". Zero-width intervals can never be
//! selected.

use crate::error::ModelError;

/// Returns the index of the interval containing `draw`, or `None` if `draw`
/// falls in the trailing interval.
///
/// The caller is responsible for `probabilities` being valid; see
/// [`validate_roulette_probabilities`].
#[must_use]
pub fn roulette(probabilities: &[f64], draw: f64) -> Option<usize> {
    let mut upper = 0.0;
    for (index, probability) in probabilities.iter().enumerate() {
        upper += probability;
        if draw < upper {
            return Some(index);
        }
    }
    None
}

/// Checks that every probability is a finite value in `[0, 1]` and that they
/// sum to at most 1.
///
/// # Errors
///
/// Returns `ModelError::IllegalParameterValue` describing the first problem found.
pub fn validate_roulette_probabilities(probabilities: &[f64]) -> Result<(), ModelError> {
    for (index, probability) in probabilities.iter().enumerate() {
        if !probability.is_finite() || !(0.0..=1.0).contains(probability) {
            return Err(ModelError::IllegalParameterValue(format!(
                "roulette probability {index} is {probability}, expected a value in [0, 1]"
            )));
        }
    }
    let total: f64 = probabilities.iter().sum();
    if total > 1.0 {
        return Err(ModelError::IllegalParameterValue(format!(
            "roulette probabilities sum to {total}, which is more than 1"
        )));
    }
    Ok(())
}
