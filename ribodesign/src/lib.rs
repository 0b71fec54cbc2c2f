//! Ribodesign core library.
//!
//! An episodic environment for RNA inverse folding: an agent assigns
//! nucleotides to a target secondary structure (dot-bracket notation) one
//! site at a time and is rewarded, once the sequence is complete, by how
//! closely its predicted fold matches the target.
//!
//! # Layout
//!
//! - **Structure** (`structure`, `target`): dot-bracket parsing, pairing
//!   tables and padded site encodings.
//! - **Design** (`candidate`): partial sequences under construction.
//! - **Folding** (`oracle`): the `FoldingOracle` seam plus a built-in
//!   Nussinov folder and an external `RNAfold` wrapper.
//! - **RL** (`rl`): the Gym-style environment, reward engine, target
//!   sampler, telemetry and a baseline episode runner.
//! - **Batch tooling** (`inverse`): deadline-bounded inverse-design runs
//!   over a target batch.
//!
//! The binaries (`src/main.rs`, `src/bin/inverse_batch.rs`) are thin
//! harnesses around these components.

pub mod candidate;
pub mod config;
pub mod inverse;
pub mod oracle;
pub mod rl;
pub mod structure;
pub mod target;
pub mod types;

// --- Re-exports for ergonomic external use ---------------------------------

pub use candidate::{Candidate, ACTION_TO_BASE, ACTION_TO_PAIR};
pub use config::{ConfigError, EnvConfig};
pub use inverse::{
    run_design, run_design_batch, seed_sequence, DesignError, DesignOutcome, DesignRequest,
    InverseDesigner, RnaInverse,
};
pub use oracle::{CommandOracle, FoldingOracle, NussinovOracle, OracleError};
pub use rl::{
    EnvError, Environment, EpisodeInfo, EpisodePhase, Observation, ObservationSpec, RnaDesignEnv,
    StepResult,
};
pub use structure::{encode_pairing, encode_structure, StructureError, PAD};
pub use target::{build_targets, Target, TargetIds, TargetSpec};
pub use types::{Nucleotide, SiteCode, TargetId};
