//! Pairing of a reference sequence with an aggregated spectrum.

use super::traits::{AssignmentSolver, HungarianAssignment};
use crate::domain::MatchingPolicy;
use crate::numerics::AssignmentError;
use faer::Mat;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MatchingError {
    #[error("reference sequence is empty")]
    EmptyReference,
    #[error("matching needs {required} spectrum values but only {available} were extracted")]
    InsufficientSpectrum { required: usize, available: usize },
    #[error(transparent)]
    Assignment(#[from] AssignmentError),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchPair {
    pub index: usize,
    pub reference: f64,
    pub matched: f64,
    pub spectrum_index: usize,
    pub error: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Matching {
    pub policy: MatchingPolicy,
    pub pairs: Vec<MatchPair>,
    pub l2_error: f64,
    pub max_error: f64,
    pub total_error: f64,
    pub mean_error: f64,
}

impl Matching {
    fn from_assignment(
        policy: MatchingPolicy,
        reference: &[f64],
        spectrum: &[f64],
        assignment: &[usize],
    ) -> Self {
        let pairs: Vec<MatchPair> = reference
            .iter()
            .zip(assignment)
            .enumerate()
            .map(|(index, (&target, &spectrum_index))| {
                let matched = spectrum[spectrum_index];
                MatchPair {
                    index,
                    reference: target,
                    matched,
                    spectrum_index,
                    error: (matched - target).abs(),
                }
            })
            .collect();

        let total_error: f64 = pairs.iter().map(|pair| pair.error).sum();
        let l2_error = pairs
            .iter()
            .map(|pair| pair.error * pair.error)
            .sum::<f64>()
            .sqrt();
        let max_error = pairs.iter().map(|pair| pair.error).fold(0.0, f64::max);
        let mean_error = total_error / pairs.len() as f64;

        Self {
            policy,
            pairs,
            l2_error,
            max_error,
            total_error,
            mean_error,
        }
    }

    /// Pairs whose absolute error is strictly below `threshold`.
    pub fn close_matches(&self, threshold: f64) -> Vec<&MatchPair> {
        self.pairs
            .iter()
            .filter(|pair| pair.error < threshold)
            .collect()
    }

    /// True when matched values increase along with the reference order.
    pub fn is_monotonic(&self) -> bool {
        self.pairs
            .windows(2)
            .all(|pair| pair[1].matched > pair[0].matched)
    }
}

fn check_sizes(reference: &[f64], spectrum: &[f64]) -> Result<(), MatchingError> {
    if reference.is_empty() {
        return Err(MatchingError::EmptyReference);
    }
    if spectrum.len() < reference.len() {
        return Err(MatchingError::InsufficientSpectrum {
            required: reference.len(),
            available: spectrum.len(),
        });
    }
    Ok(())
}

/// Each reference in order claims the nearest unused spectrum value; ties go
/// to the lower spectrum index.
pub fn match_greedy(reference: &[f64], spectrum: &[f64]) -> Result<Matching, MatchingError> {
    check_sizes(reference, spectrum)?;
    let mut used = vec![false; spectrum.len()];
    let mut assignment = Vec::with_capacity(reference.len());

    for &target in reference {
        let mut best: Option<(usize, f64)> = None;
        for (index, &value) in spectrum.iter().enumerate() {
            if used[index] {
                continue;
            }
            let distance = (value - target).abs();
            if best.is_none_or(|(_, best_distance)| distance < best_distance) {
                best = Some((index, distance));
            }
        }
        // Sizes were checked, so an unused value always remains.
        let Some((index, _)) = best else {
            return Err(MatchingError::InsufficientSpectrum {
                required: reference.len(),
                available: spectrum.len(),
            });
        };
        used[index] = true;
        assignment.push(index);
    }

    Ok(Matching::from_assignment(
        MatchingPolicy::Greedy,
        reference,
        spectrum,
        &assignment,
    ))
}

/// Minimum total absolute error over all injective pairings.
///
/// With an ascending reference the chosen spectrum values are handed out in
/// ascending order. Every reference lying beyond the spectrum's range costs
/// the same against any of its partners, so the solver may return crossed
/// pairs; uncrossing them on a line never raises the total.
pub fn match_optimal<A: AssignmentSolver + ?Sized>(
    reference: &[f64],
    spectrum: &[f64],
    solver: &A,
) -> Result<Matching, MatchingError> {
    check_sizes(reference, spectrum)?;
    let cost = Mat::from_fn(reference.len(), spectrum.len(), |row, col| {
        (reference[row] - spectrum[col]).abs()
    });
    let mut assignment = solver.assign(&cost)?;
    if reference.windows(2).all(|pair| pair[0] <= pair[1]) {
        assignment.sort_by(|&lhs, &rhs| {
            spectrum[lhs]
                .total_cmp(&spectrum[rhs])
                .then(lhs.cmp(&rhs))
        });
    }
    Ok(Matching::from_assignment(
        MatchingPolicy::Optimal,
        reference,
        spectrum,
        &assignment,
    ))
}

pub fn match_spectrum(
    policy: MatchingPolicy,
    reference: &[f64],
    spectrum: &[f64],
) -> Result<Matching, MatchingError> {
    let matching = match policy {
        MatchingPolicy::Greedy => match_greedy(reference, spectrum)?,
        MatchingPolicy::Optimal => match_optimal(reference, spectrum, &HungarianAssignment)?,
    };
    tracing::info!(
        policy = %policy,
        pairs = matching.pairs.len(),
        l2_error = matching.l2_error,
        max_error = matching.max_error,
        "reference matched"
    );
    Ok(matching)
}
