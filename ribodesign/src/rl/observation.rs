// src/rl/observation.rs
//
// Observation window and the declared observation / action spaces.
//
// The observation is the slice of the padded target encoding that starts at
// the first unassigned site and spans 2 * state_radius + 1 sites. Padding
// guarantees the window never runs past either end of the target.

use serde::{Deserialize, Serialize};

use crate::config::EnvConfig;
use crate::types::SiteCode;

/// Number of discrete actions, independent of paired vs unpaired sites.
pub const NUM_ACTIONS: usize = 4;

/// Encoded window around the current site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Observation {
    pub sites: Vec<SiteCode>,
}

impl Observation {
    /// Window of `padded` starting at (padded) index `start`.
    pub fn window(padded: &[SiteCode], start: usize, window_len: usize) -> Self {
        Self {
            sites: padded[start..start + window_len].to_vec(),
        }
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Flat numeric view, one value per site.
    pub fn to_f32_vec(&self) -> Vec<f32> {
        self.sites.iter().map(|c| c.value() as f32).collect()
    }

    /// Serialize the raw site codes to a stable JSON string.
    ///
    /// Always integers, whatever the declared dtype; use `to_typed_json`
    /// for values that match an `ObservationSpec`.
    pub fn to_canonical_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Same layout as `to_canonical_json`, with values typed as `dtype`
    /// (`Float` writes `1.0` where the raw codes write `1`).
    pub fn to_typed_json(&self, dtype: ObsDtype) -> Result<String, serde_json::Error> {
        let value = |v: u8| match dtype {
            ObsDtype::Int => serde_json::Value::from(v),
            ObsDtype::Float => serde_json::Value::from(f64::from(v)),
        };
        let sites: Vec<serde_json::Value> = self
            .sites
            .iter()
            .map(|site| match *site {
                SiteCode::Flat(v) => value(v),
                SiteCode::Channel([v]) => serde_json::Value::Array(vec![value(v)]),
            })
            .collect();
        serde_json::to_string(&sites)
    }
}

/// Element type consumers should see for each observation value.
///
/// Site codes are small integers either way; `Float` is declared for the
/// non-embedding layouts, which feed the codes straight into a network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObsDtype {
    Int,
    Float,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationSpec {
    pub dtype: ObsDtype,
    pub shape: Vec<usize>,
}

impl ObservationSpec {
    pub fn for_config(cfg: &EnvConfig) -> Self {
        let dtype = if cfg.use_embedding {
            ObsDtype::Int
        } else {
            ObsDtype::Float
        };
        let shape = if cfg.use_conv && !cfg.use_embedding {
            vec![cfg.window_len(), 1]
        } else {
            vec![cfg.window_len()]
        };
        Self { dtype, shape }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSpec {
    pub num_actions: usize,
}

impl Default for ActionSpec {
    fn default() -> Self {
        Self {
            num_actions: NUM_ACTIONS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::encode_structure;

    #[test]
    fn test_window_slices_padded_encoding() {
        let padded = encode_structure("(.)", 1, false, true);
        let obs = Observation::window(&padded, 0, 3);
        assert_eq!(obs.to_f32_vec(), vec![3.0, 1.0, 0.0]);
        let last = Observation::window(&padded, 2, 3);
        assert_eq!(last.to_f32_vec(), vec![0.0, 2.0, 3.0]);
    }

    #[test]
    fn test_observation_json_matches_layout() {
        let padded = encode_structure("()", 1, true, false);
        let obs = Observation::window(&padded, 0, 3);
        assert_eq!(obs.to_canonical_json().unwrap(), "[[0],[1],[1]]");
    }

    #[test]
    fn test_typed_json_follows_declared_dtype() {
        let conv = EnvConfig::default();
        let spec = ObservationSpec::for_config(&conv);
        assert_eq!(spec.dtype, ObsDtype::Float);
        let padded = encode_structure("()", 1, true, false);
        let obs = Observation::window(&padded, 0, 3);
        assert_eq!(
            obs.to_typed_json(spec.dtype).unwrap(),
            "[[0.0],[1.0],[1.0]]"
        );
        let parsed: Vec<Vec<f32>> =
            serde_json::from_str(&obs.to_typed_json(spec.dtype).unwrap()).unwrap();
        assert_eq!(parsed.concat(), obs.to_f32_vec());

        let embedding = EnvConfig {
            use_embedding: true,
            ..EnvConfig::default()
        };
        let spec = ObservationSpec::for_config(&embedding);
        let padded = encode_structure("(.)", 1, false, true);
        let obs = Observation::window(&padded, 0, 3);
        assert_eq!(obs.to_typed_json(spec.dtype).unwrap(), "[3,1,0]");
        assert_eq!(
            obs.to_typed_json(spec.dtype).unwrap(),
            obs.to_canonical_json().unwrap()
        );
    }

    #[test]
    fn test_observation_spec_shapes() {
        let conv = EnvConfig::default();
        assert_eq!(
            ObservationSpec::for_config(&conv),
            ObservationSpec {
                dtype: ObsDtype::Float,
                shape: vec![11, 1]
            }
        );

        let embedding = EnvConfig {
            use_embedding: true,
            state_radius: 2,
            ..EnvConfig::default()
        };
        assert_eq!(
            ObservationSpec::for_config(&embedding),
            ObservationSpec {
                dtype: ObsDtype::Int,
                shape: vec![5]
            }
        );

        let flat = EnvConfig {
            use_conv: false,
            ..EnvConfig::default()
        };
        assert_eq!(ObservationSpec::for_config(&flat).shape, vec![11]);
        assert_eq!(ActionSpec::default().num_actions, 4);
    }
}
