//! Consensus derivation: reduce a field's ledger entries to one deck value.

use std::collections::BTreeMap;

use crate::models::{EstimationField, ESTIMATION_SCALE};

/// Snap an arbitrary magnitude onto the estimation deck.
///
/// Scans the deck in ascending order and keeps the first element with
/// minimal absolute distance, so an exact midpoint resolves to the smaller
/// of the two candidates.
pub fn snap(value: f64) -> i64 {
    let mut best = ESTIMATION_SCALE[0];
    let mut best_distance = (ESTIMATION_SCALE[0] as f64 - value).abs();
    for &candidate in &ESTIMATION_SCALE[1..] {
        let distance = (candidate as f64 - value).abs();
        if distance < best_distance {
            best = candidate;
            best_distance = distance;
        }
    }
    best
}

/// Compute the consensus mapping for a whole ledger: the snapped mean of
/// the recorded votes for every field somebody voted on, `None` for the
/// rest. Absent participants are not imputed.
pub(crate) fn derive(
    votes: &BTreeMap<EstimationField, BTreeMap<String, i64>>,
) -> BTreeMap<EstimationField, Option<i64>> {
    EstimationField::ALL
        .iter()
        .map(|&field| {
            let snapped = votes
                .get(&field)
                .filter(|ballots| !ballots.is_empty())
                .map(|ballots| {
                    let sum: i64 = ballots.values().sum();
                    snap(sum as f64 / ballots.len() as f64)
                });
            (field, snapped)
        })
        .collect()
}
