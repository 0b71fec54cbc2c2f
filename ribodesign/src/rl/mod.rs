// src/rl/mod.rs
//
// Reinforcement-learning surface for RNA design.
//
// Key components:
// - RnaDesignEnv: Gym-style environment (reset, step) over a target batch
// - EpochSampler: seeded without-replacement target order
// - RewardEngine: terminal reward with local improvement and diversity loss
// - EpisodeTelemetry: per-episode JSONL / stderr records
// - Policy / run_episodes: baseline runner used by the CLI and tests

pub mod design_env;
pub mod local_search;
pub mod observation;
pub mod reward;
pub mod runner;
pub mod sampler;
pub mod telemetry;

// Re-exports for convenience
pub use design_env::{EnvError, Environment, EpisodePhase, RnaDesignEnv, StepResult};
pub use local_search::{local_improvement, Improvement};
pub use observation::{ActionSpec, ObsDtype, Observation, ObservationSpec, NUM_ACTIONS};
pub use reward::{
    diversity_penalty, shaped_reward, DiversityTracker, EpisodeInfo, RewardEngine,
    DIVERSITY_SMOOTHING,
};
pub use runner::{
    run_episode, run_episodes, EpisodeOutcome, Policy, RandomPolicy, RunSummary, ScriptedPolicy,
};
pub use sampler::EpochSampler;
pub use telemetry::{
    EpisodeRecord, EpisodeSink, EpisodeTelemetry, JsonlSink, NoopSink, StderrSink,
    DEFAULT_TELEMETRY_PATH,
};
