// src/rl/runner.rs
//
// Episode runner for smoke runs and baselines.
//
// Drives any `Environment` with a simple `Policy` until the terminal step and
// aggregates the per-episode results. Training loops live outside this
// crate; this is only the harness used by the CLI and tests.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::design_env::{EnvError, Environment};
use super::observation::{Observation, NUM_ACTIONS};
use super::reward::EpisodeInfo;

/// Chooses an action for the current observation.
pub trait Policy {
    /// Short identifier used in run headers.
    fn name(&self) -> &str;

    fn act(&mut self, obs: &Observation) -> usize;

    /// Called at the start of every episode.
    fn reset_episode(&mut self, _episode_id: u64) {}
}

/// Uniformly random actions from a seeded RNG.
pub struct RandomPolicy {
    rng: ChaCha8Rng,
}

impl RandomPolicy {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl Policy for RandomPolicy {
    fn name(&self) -> &str {
        "random"
    }

    fn act(&mut self, _obs: &Observation) -> usize {
        self.rng.gen_range(0..NUM_ACTIONS)
    }
}

/// Replays a fixed action sequence, cycling when exhausted.
pub struct ScriptedPolicy {
    actions: Vec<usize>,
    next: usize,
}

impl ScriptedPolicy {
    pub fn new(actions: Vec<usize>) -> Self {
        Self { actions, next: 0 }
    }
}

impl Policy for ScriptedPolicy {
    fn name(&self) -> &str {
        "scripted"
    }

    fn act(&mut self, _obs: &Observation) -> usize {
        if self.actions.is_empty() {
            return 0;
        }
        let action = self.actions[self.next % self.actions.len()];
        self.next += 1;
        action
    }

    fn reset_episode(&mut self, _episode_id: u64) {
        self.next = 0;
    }
}

/// Outcome of one episode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeOutcome {
    pub episode_id: u64,
    pub steps: u64,
    pub reward: f64,
    pub info: Option<EpisodeInfo>,
}

/// Aggregate over a run of episodes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    pub episodes: u64,
    pub total_steps: u64,
    pub mean_reward: f64,
    pub best_reward: f64,
    pub solved: u64,
}

impl RunSummary {
    pub fn from_outcomes(outcomes: &[EpisodeOutcome]) -> Self {
        if outcomes.is_empty() {
            return Self::default();
        }
        let total_reward: f64 = outcomes.iter().map(|o| o.reward).sum();
        Self {
            episodes: outcomes.len() as u64,
            total_steps: outcomes.iter().map(|o| o.steps).sum(),
            mean_reward: total_reward / outcomes.len() as f64,
            best_reward: outcomes
                .iter()
                .map(|o| o.reward)
                .fold(f64::NEG_INFINITY, f64::max),
            solved: outcomes
                .iter()
                .filter(|o| o.info.as_ref().is_some_and(|i| i.hamming_distance == 0))
                .count() as u64,
        }
    }
}

/// Run one episode to completion.
pub fn run_episode<E, P>(env: &mut E, policy: &mut P, episode_id: u64) -> Result<EpisodeOutcome, EnvError>
where
    E: Environment + ?Sized,
    P: Policy + ?Sized,
{
    policy.reset_episode(episode_id);
    let mut obs = env.reset();
    let mut steps = 0u64;

    loop {
        let result = env.step(policy.act(&obs))?;
        steps += 1;
        match result.observation {
            Some(next) if !result.terminal => obs = next,
            _ => {
                return Ok(EpisodeOutcome {
                    episode_id,
                    steps,
                    reward: result.reward,
                    info: result.episode,
                })
            }
        }
    }
}

/// Run `episodes` episodes back to back.
pub fn run_episodes<E, P>(env: &mut E, policy: &mut P, episodes: u64) -> Result<Vec<EpisodeOutcome>, EnvError>
where
    E: Environment + ?Sized,
    P: Policy + ?Sized,
{
    (0..episodes)
        .map(|episode_id| run_episode(&mut *env, &mut *policy, episode_id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EnvConfig;
    use crate::oracle::NussinovOracle;
    use crate::rl::design_env::RnaDesignEnv;
    use crate::target::TargetSpec;

    fn make_env(seed: u64) -> RnaDesignEnv<NussinovOracle> {
        let specs: Vec<TargetSpec> = vec!["((....))".into(), "(((...)))..".into(), ".(...).".into()];
        RnaDesignEnv::from_specs(&specs, EnvConfig::default(), NussinovOracle::default(), seed).unwrap()
    }

    #[test]
    fn test_random_runs_are_reproducible() {
        let a = run_episodes(&mut make_env(5), &mut RandomPolicy::new(11), 6).unwrap();
        let b = run_episodes(&mut make_env(5), &mut RandomPolicy::new(11), 6).unwrap();
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.steps, y.steps);
            assert_eq!(x.reward, y.reward);
            let (xi, yi) = (x.info.as_ref().unwrap(), y.info.as_ref().unwrap());
            assert_eq!(xi.target_id, yi.target_id);
            assert_eq!(xi.sequence, yi.sequence);
        }
    }

    #[test]
    fn test_every_episode_terminates_with_info() {
        let mut env = make_env(1);
        let outcomes = run_episodes(&mut env, &mut RandomPolicy::new(2), 9).unwrap();
        assert_eq!(outcomes.len(), 9);
        assert_eq!(env.episodes().len(), 9);
        for o in &outcomes {
            let info = o.info.as_ref().unwrap();
            assert!((0.0..=1.0).contains(&o.reward));
            assert!(o.steps as usize <= info.sequence.len());
        }
    }

    #[test]
    fn test_run_summary() {
        let outcomes = vec![
            EpisodeOutcome {
                episode_id: 0,
                steps: 4,
                reward: 1.0,
                info: None,
            },
            EpisodeOutcome {
                episode_id: 1,
                steps: 6,
                reward: 0.5,
                info: None,
            },
        ];
        let s = RunSummary::from_outcomes(&outcomes);
        assert_eq!(s.episodes, 2);
        assert_eq!(s.total_steps, 10);
        assert_eq!(s.mean_reward, 0.75);
        assert_eq!(s.best_reward, 1.0);
        assert_eq!(RunSummary::from_outcomes(&[]), RunSummary::default());
    }
}
