//! Weighted sampling over a fixed, ordered list of candidates.

use crate::rand::distr::weighted::{Error as WeightError, WeightedIndex};
use crate::rand::distr::Distribution;
use crate::rand::Rng;

/// Draws one of `candidates`, where `candidates[i]` is chosen with probability proportional to
/// `weights[i]`.
///
/// Candidates are searched in the order given, so the result for a given random draw depends on
/// that order. A candidate with weight zero is never returned.
///
/// # Errors
///
/// Returns a `WeightError` if the weights are empty, contain a negative or non-finite value, or
/// are all zero.
///
/// # Panics
///
/// Panics if `candidates` and `weights` have different lengths.
pub fn choose_weighted<R, T>(rng: &mut R, candidates: &[T], weights: &[f64]) -> Result<T, WeightError>
where
    R: Rng,
    T: Copy,
{
    assert_eq!(
        candidates.len(),
        weights.len(),
        "every candidate needs exactly one weight"
    );
    let index = WeightedIndex::new(weights)?;
    Ok(candidates[index.sample(rng)])
}
