// src/rl/design_env.rs
//
// Gym-style RNA design environment.
//
// One episode designs one target: reset() draws a target from the epoch
// sampler, each step() assigns the lowest unassigned site (both partners of
// a base pair at once), and the step that completes the sequence folds it
// and returns the terminal reward. All other steps return reward 0.
//
// Deterministic given the sampler seed and a deterministic oracle.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::candidate::Candidate;
use crate::config::EnvConfig;
use crate::oracle::{FoldingOracle, OracleError};
use crate::structure::StructureError;
use crate::target::{build_targets, Target, TargetIds, TargetSpec};

use super::observation::{ActionSpec, Observation, ObservationSpec, NUM_ACTIONS};
use super::reward::{EpisodeInfo, RewardEngine};
use super::sampler::EpochSampler;
use super::telemetry::{EpisodeRecord, EpisodeSink, EpisodeTelemetry};

/// Episode state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EpisodePhase {
    Unstarted,
    Assigning,
    Terminal,
}

/// Errors surfaced by the environment.
#[derive(Debug, Clone, PartialEq)]
pub enum EnvError {
    /// Target batch was empty.
    EmptyTargetPool,
    /// A target structure failed to parse.
    Structure(StructureError),
    /// Action index outside `0..4`.
    InvalidAction { action: usize },
    /// `step` called outside the assigning phase.
    NotAssigning { phase: EpisodePhase },
    /// The folding oracle failed.
    Oracle(OracleError),
    /// The oracle returned a structure of the wrong length.
    MalformedFold { expected_len: usize, structure: String },
    /// A sequence was requested from a partially assigned candidate.
    IncompleteCandidate,
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvError::EmptyTargetPool => write!(f, "environment needs at least one target"),
            EnvError::Structure(e) => write!(f, "invalid target structure: {}", e),
            EnvError::InvalidAction { action } => {
                write!(f, "action {} out of range 0..{}", action, NUM_ACTIONS)
            }
            EnvError::NotAssigning { phase } => {
                write!(f, "step() called in phase {:?}; call reset() first", phase)
            }
            EnvError::Oracle(e) => write!(f, "{}", e),
            EnvError::MalformedFold {
                expected_len,
                structure,
            } => write!(
                f,
                "folded structure {:?} has length {}, expected {}",
                structure,
                structure.len(),
                expected_len
            ),
            EnvError::IncompleteCandidate => write!(f, "candidate is not fully assigned"),
        }
    }
}

impl std::error::Error for EnvError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EnvError::Structure(e) => Some(e),
            EnvError::Oracle(e) => Some(e),
            _ => None,
        }
    }
}

impl From<OracleError> for EnvError {
    fn from(e: OracleError) -> Self {
        EnvError::Oracle(e)
    }
}

impl From<StructureError> for EnvError {
    fn from(e: StructureError) -> Self {
        EnvError::Structure(e)
    }
}

/// Result of a single environment step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    /// Next window, or `None` once the episode is terminal.
    pub observation: Option<Observation>,
    pub terminal: bool,
    pub reward: f64,
    /// Episode summary, on the terminal step only.
    pub episode: Option<EpisodeInfo>,
}

/// Interface consumed by external agents and training loops.
pub trait Environment {
    /// Start a new episode and return its first observation.
    fn reset(&mut self) -> Observation;

    /// Apply one action (`0..4`) to the current site.
    fn step(&mut self, action: usize) -> Result<StepResult, EnvError>;

    fn observation_spec(&self) -> ObservationSpec;

    fn action_spec(&self) -> ActionSpec;
}

/// The RNA design environment.
pub struct RnaDesignEnv<O> {
    config: EnvConfig,
    oracle: O,
    sampler: EpochSampler<Arc<Target>>,
    target: Option<Arc<Target>>,
    candidate: Candidate,
    phase: EpisodePhase,
    reward_engine: RewardEngine,
    episodes: Vec<EpisodeInfo>,
    telemetry: EpisodeTelemetry,
}

impl<O: FoldingOracle> RnaDesignEnv<O> {
    /// Create an environment over a prebuilt target pool.
    pub fn new(
        targets: Vec<Arc<Target>>,
        config: EnvConfig,
        oracle: O,
        seed: u64,
    ) -> Result<Self, EnvError> {
        if targets.is_empty() {
            return Err(EnvError::EmptyTargetPool);
        }
        Ok(Self {
            reward_engine: RewardEngine::new(&config),
            config,
            oracle,
            sampler: EpochSampler::new(targets, seed),
            target: None,
            candidate: Candidate::new(0),
            phase: EpisodePhase::Unstarted,
            episodes: Vec::new(),
            telemetry: EpisodeTelemetry::default(),
        })
    }

    /// Create an environment from a batch of raw or identified structures.
    ///
    /// Auto-assigned ids start at 1.
    pub fn from_specs(
        specs: &[TargetSpec],
        config: EnvConfig,
        oracle: O,
        seed: u64,
    ) -> Result<Self, EnvError> {
        let targets = build_targets(specs, &config, &mut TargetIds::default())?;
        Self::new(targets, config, oracle, seed)
    }

    /// Attach a telemetry sink (see `EpisodeTelemetry::from_env`).
    pub fn with_telemetry(mut self, telemetry: EpisodeTelemetry) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Restart the target order from `seed`.
    pub fn reseed(&mut self, seed: u64) {
        self.sampler.reseed(seed);
    }

    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    pub fn phase(&self) -> EpisodePhase {
        self.phase
    }

    /// Target of the current episode.
    pub fn target(&self) -> Option<&Target> {
        self.target.as_deref()
    }

    pub fn candidate(&self) -> &Candidate {
        &self.candidate
    }

    /// Summaries of all finished episodes, oldest first.
    pub fn episodes(&self) -> &[EpisodeInfo] {
        &self.episodes
    }

    fn window_at(&self, target: &Target, site: usize) -> Observation {
        Observation::window(target.padded_encoding(), site, self.config.window_len())
    }
}

impl<O: FoldingOracle> Environment for RnaDesignEnv<O> {
    fn reset(&mut self) -> Observation {
        let target = self.sampler.draw();
        self.candidate = Candidate::new(target.len());
        self.phase = EpisodePhase::Assigning;

        // Targets are non-empty, so site 0 is unassigned.
        let obs = self.window_at(&target, 0);
        self.target = Some(target);
        obs
    }

    fn step(&mut self, action: usize) -> Result<StepResult, EnvError> {
        if self.phase != EpisodePhase::Assigning {
            return Err(EnvError::NotAssigning { phase: self.phase });
        }
        if action >= NUM_ACTIONS {
            return Err(EnvError::InvalidAction { action });
        }
        let target = match &self.target {
            Some(t) => Arc::clone(t),
            None => return Err(EnvError::NotAssigning { phase: self.phase }),
        };

        let site = self
            .candidate
            .first_unassigned_site()
            .ok_or(EnvError::NotAssigning { phase: self.phase })?;
        self.candidate
            .assign(action, site, target.paired_site(site));

        if let Some(next) = self.candidate.first_unassigned_site() {
            return Ok(StepResult {
                observation: Some(self.window_at(&target, next)),
                terminal: false,
                reward: 0.0,
                episode: None,
            });
        }

        self.phase = EpisodePhase::Terminal;
        let (reward, info) =
            self.reward_engine
                .terminal_reward(&target, &self.candidate, &self.oracle)?;

        self.episodes.push(info.clone());
        self.telemetry.log_episode(&EpisodeRecord {
            episode_index: self.episodes.len() as u64,
            reward,
            info: info.clone(),
        });

        Ok(StepResult {
            observation: None,
            terminal: true,
            reward,
            episode: Some(info),
        })
    }

    fn observation_spec(&self) -> ObservationSpec {
        ObservationSpec::for_config(&self.config)
    }

    fn action_spec(&self) -> ActionSpec {
        ActionSpec::default()
    }
}
