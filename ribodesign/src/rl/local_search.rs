// src/rl/local_search.rs
//
// Local-improvement search over the sites where the folded candidate
// disagrees with the target.
//
// Every assignment of {A, G, C, U} to the k differing sites is tried in
// odometer order (last site fastest). The search space is 4^k, so callers
// bound k through the mutation threshold.

use crate::candidate::Candidate;
use crate::oracle::FoldingOracle;
use crate::structure::{differing_sites, hamming};
use crate::types::Nucleotide;

use super::design_env::EnvError;

/// Best candidate found by the search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Improvement {
    pub distance: usize,
    pub sequence: String,
    pub folded: String,
}

/// Search mutations of `candidate` at the sites where `folded` differs from
/// `target_structure`.
///
/// Returns as soon as a zero-distance mutant is folded; otherwise the first
/// mutant with minimal distance in enumeration order.
pub fn local_improvement<O: FoldingOracle + ?Sized>(
    candidate: &Candidate,
    target_structure: &str,
    folded: &str,
    oracle: &O,
) -> Result<Improvement, EnvError> {
    if folded.len() != target_structure.len() {
        return Err(EnvError::MalformedFold {
            expected_len: target_structure.len(),
            structure: folded.to_string(),
        });
    }

    let sites = differing_sites(target_structure, folded);
    let mut digits = vec![0usize; sites.len()];

    let evaluate = |digits: &[usize]| -> Result<Improvement, EnvError> {
        let bases: Vec<Nucleotide> = digits.iter().map(|&d| Nucleotide::SEARCH_ORDER[d]).collect();
        let sequence = candidate
            .branch(&sites, &bases)
            .sequence()
            .ok_or(EnvError::IncompleteCandidate)?;
        let folded = oracle.fold(&sequence)?;
        let distance = hamming(&folded, target_structure).ok_or_else(|| EnvError::MalformedFold {
            expected_len: target_structure.len(),
            structure: folded.clone(),
        })?;
        Ok(Improvement {
            distance,
            sequence,
            folded,
        })
    };

    let mut best = evaluate(&digits)?;
    while best.distance > 0 && advance(&mut digits) {
        let mutant = evaluate(&digits)?;
        if mutant.distance < best.distance {
            best = mutant;
        }
    }
    Ok(best)
}

/// Step a base-4 odometer; false once it wraps.
fn advance(digits: &mut [usize]) -> bool {
    for digit in digits.iter_mut().rev() {
        *digit += 1;
        if *digit < 4 {
            return true;
        }
        *digit = 0;
    }
    false
}
