// src/rl/reward.rs
//
// Terminal reward for a completed design.
//
// r = (1 - d)^reward_exponent, where d is the normalized structural distance
// of the folded design to the target after optional local improvement,
// optionally raised by a diversity penalty for repeated final sequences.

use std::collections::HashMap;
use std::f64::consts::PI;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::candidate::Candidate;
use crate::config::EnvConfig;
use crate::oracle::FoldingOracle;
use crate::structure::hamming;
use crate::target::Target;
use crate::types::TargetId;

use super::design_env::EnvError;
use super::local_search::{local_improvement, Improvement};

/// Smoothing constant of the diversity penalty; larger values flatten it.
pub const DIVERSITY_SMOOTHING: f64 = 3.0;

/// Summary of one finished episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeInfo {
    pub target_id: TargetId,
    /// Wall-clock time (seconds since the unix epoch).
    pub time: f64,
    /// Normalized distance used for the reward (diversity-adjusted and
    /// clamped when diversity loss is on).
    pub normalized_hamming_distance: f64,
    pub hamming_distance: usize,
    /// Folded structure of the final sequence.
    pub structure: String,
    pub sequence: String,
}

/// Maps a repetition fraction to a penalty in `[0, 1)`.
///
/// `2/π · atan(fraction / 3)`.
pub fn diversity_penalty(repetition_fraction: f64) -> f64 {
    (2.0 / PI) * (repetition_fraction / DIVERSITY_SMOOTHING).atan()
}

/// `(1 - normalized_distance)^exponent`.
pub fn shaped_reward(normalized_distance: f64, exponent: f64) -> f64 {
    (1.0 - normalized_distance).powf(exponent)
}

/// Running multiset of final sequences produced by one environment.
#[derive(Debug, Clone, Default)]
pub struct DiversityTracker {
    counts: HashMap<String, usize>,
    total: usize,
}

impl DiversityTracker {
    /// Record `sequence` and return how often it had been seen before,
    /// as a fraction of all recorded sequences (this one included).
    pub fn record(&mut self, sequence: &str) -> f64 {
        let count = self.counts.entry(sequence.to_string()).or_insert(0);
        let prior = *count;
        *count += 1;
        self.total += 1;
        prior as f64 / self.total as f64
    }

    pub fn total(&self) -> usize {
        self.total
    }
}

/// Computes terminal rewards and episode summaries.
#[derive(Debug, Clone)]
pub struct RewardEngine {
    mutation_threshold: usize,
    reward_exponent: f64,
    diversity_loss: bool,
    diversity: DiversityTracker,
}

impl RewardEngine {
    pub fn new(cfg: &EnvConfig) -> Self {
        Self {
            mutation_threshold: cfg.mutation_threshold,
            reward_exponent: cfg.reward_exponent,
            diversity_loss: cfg.diversity_loss,
            diversity: DiversityTracker::default(),
        }
    }

    pub fn diversity(&self) -> &DiversityTracker {
        &self.diversity
    }

    /// Fold the completed `candidate`, refine it if it is close, and score it.
    pub fn terminal_reward<O: FoldingOracle + ?Sized>(
        &mut self,
        target: &Target,
        candidate: &Candidate,
        oracle: &O,
    ) -> Result<(f64, EpisodeInfo), EnvError> {
        let sequence = candidate.sequence().ok_or(EnvError::IncompleteCandidate)?;
        let folded = oracle.fold(&sequence)?;
        let distance =
            hamming(&folded, target.dot_bracket()).ok_or_else(|| EnvError::MalformedFold {
                expected_len: target.len(),
                structure: folded.clone(),
            })?;

        let mut result = Improvement {
            distance,
            sequence,
            folded,
        };
        if 0 < distance && distance < self.mutation_threshold {
            result = local_improvement(candidate, target.dot_bracket(), &result.folded, oracle)?;
        }

        let mut normalized = result.distance as f64 / target.len() as f64;
        if self.diversity_loss {
            let fraction = self.diversity.record(&result.sequence);
            // Clamp before exponentiation: a base below zero has no real
            // power for fractional exponents.
            normalized = (normalized + diversity_penalty(fraction)).min(1.0);
        }

        let info = EpisodeInfo {
            target_id: target.id(),
            time: unix_time_secs(),
            normalized_hamming_distance: normalized,
            hamming_distance: result.distance,
            structure: result.folded,
            sequence: result.sequence,
        };

        Ok((shaped_reward(normalized, self.reward_exponent), info))
    }
}

fn unix_time_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::OracleError;
    use crate::target::TargetIds;
    use crate::types::Nucleotide;
    use std::cell::Cell;

    fn complete(seq: &str) -> Candidate {
        Candidate::from_nucleotides(seq.chars().filter_map(Nucleotide::from_char).collect())
    }

    fn target(s: &str, cfg: &EnvConfig) -> Target {
        Target::new(s, cfg, &mut TargetIds::default()).unwrap()
    }

    #[test]
    fn test_shaped_reward_endpoints_and_monotonicity() {
        assert_eq!(shaped_reward(0.0, 1.0), 1.0);
        assert_eq!(shaped_reward(1.0, 1.0), 0.0);
        assert_eq!(shaped_reward(0.0, 2.5), 1.0);
        assert_eq!(shaped_reward(1.0, 2.5), 0.0);
        for exponent in [0.5, 1.0, 3.0] {
            let mut prev = f64::INFINITY;
            for i in 0..=10 {
                let r = shaped_reward(i as f64 / 10.0, exponent);
                assert!(r <= prev);
                prev = r;
            }
        }
    }

    #[test]
    fn test_diversity_penalty_shape() {
        assert_eq!(diversity_penalty(0.0), 0.0);
        let half = diversity_penalty(0.5);
        assert!((half - (2.0 / PI) * (0.5f64 / 3.0).atan()).abs() < 1e-15);
        assert!(diversity_penalty(1.0) < 1.0);
        assert!(diversity_penalty(0.9) > diversity_penalty(0.1));
    }

    #[test]
    fn test_tracker_counts_prior_occurrences() {
        let mut tracker = DiversityTracker::default();
        assert_eq!(tracker.record("GAUC"), 0.0);
        assert_eq!(tracker.record("GAUC"), 0.5);
        assert_eq!(tracker.record("CCCC"), 0.0);
        assert!((tracker.record("GAUC") - 0.5).abs() < 1e-15);
        assert_eq!(tracker.total(), 4);
        // Three prior GAUC out of five.
        assert!((tracker.record("GAUC") - 0.6).abs() < 1e-15);
    }

    #[test]
    fn test_exact_fold_skips_search() {
        let cfg = EnvConfig::default();
        let t = target("(((....)))", &cfg);
        let calls = Cell::new(0);
        let oracle = |_: &str| {
            calls.set(calls.get() + 1);
            Ok::<_, OracleError>("(((....)))".to_string())
        };
        let mut engine = RewardEngine::new(&cfg);
        let (reward, info) = engine
            .terminal_reward(&t, &complete("GGGAAAACCC"), &oracle)
            .unwrap();
        assert_eq!(reward, 1.0);
        assert_eq!(info.hamming_distance, 0);
        assert_eq!(info.normalized_hamming_distance, 0.0);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_far_fold_skips_search() {
        let cfg = EnvConfig {
            mutation_threshold: 3,
            ..EnvConfig::default()
        };
        let t = target("(((....)))", &cfg);
        let calls = Cell::new(0);
        let oracle = |s: &str| {
            calls.set(calls.get() + 1);
            Ok::<_, OracleError>(".".repeat(s.len()))
        };
        let mut engine = RewardEngine::new(&cfg);
        let (reward, info) = engine
            .terminal_reward(&t, &complete("GGGAAAACCC"), &oracle)
            .unwrap();
        assert_eq!(calls.get(), 1);
        assert_eq!(info.hamming_distance, 6);
        assert!((reward - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_near_fold_triggers_search() {
        let cfg = EnvConfig::default();
        let t = target("(.)", &cfg);
        // Only "GAC" folds correctly.
        let oracle = |s: &str| {
            Ok::<_, OracleError>(if s == "GAC" { "(.)" } else { "..." }.to_string())
        };
        let mut engine = RewardEngine::new(&cfg);
        let (reward, info) = engine.terminal_reward(&t, &complete("UAU"), &oracle).unwrap();
        assert_eq!(info.hamming_distance, 0);
        assert_eq!(info.sequence, "GAC");
        assert_eq!(info.structure, "(.)");
        assert_eq!(reward, 1.0);
    }

    #[test]
    fn test_malformed_fold_is_an_error() {
        let cfg = EnvConfig::default();
        let t = target("(.)", &cfg);
        let oracle = |_: &str| Ok::<_, OracleError>("..".to_string());
        let mut engine = RewardEngine::new(&cfg);
        let err = engine
            .terminal_reward(&t, &complete("GAC"), &oracle)
            .unwrap_err();
        assert!(matches!(err, EnvError::MalformedFold { expected_len: 3, .. }));
    }

    #[test]
    fn test_diversity_loss_is_clamped() {
        let cfg = EnvConfig {
            diversity_loss: true,
            mutation_threshold: 0,
            ..EnvConfig::default()
        };
        let t = target("((((.))))", &cfg);
        let oracle = |s: &str| Ok::<_, OracleError>(".".repeat(s.len()));
        let mut engine = RewardEngine::new(&cfg);
        let design = complete("GGGGACCCC");

        let recorded: Vec<f64> = (0..4)
            .map(|_| {
                engine
                    .terminal_reward(&t, &design, &oracle)
                    .unwrap()
                    .1
                    .normalized_hamming_distance
            })
            .collect();

        assert!((recorded[0] - 8.0 / 9.0).abs() < 1e-12);
        assert!(recorded[1] > recorded[0] && recorded[1] < 1.0);
        assert_eq!(recorded[2], 1.0);
        assert_eq!(recorded[3], 1.0);
        assert!(recorded.iter().all(|&d| d <= 1.0));
    }
}
