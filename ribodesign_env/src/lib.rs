// ribodesign_env/src/lib.rs
//
// Python bindings for the ribodesign environment.
//
// Provides a Gym-style API for training design agents:
// - Env(structures, config=None, oracle=None, seed=0)
// - reset() -> observation
// - step(action) -> (observation | None, terminal, reward)
// - states / actions: declared observation and action spaces
// - episodes_info: per-episode summaries
//
// `oracle` is any Python callable `str -> str` returning the folded
// dot-bracket structure; the built-in Nussinov folder is used when omitted.
// All operations are deterministic given the seed and a deterministic oracle.

use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList, PyTuple};

use ribodesign::{
    EnvConfig, EnvError, Environment, EpisodeInfo, FoldingOracle, NussinovOracle, ObservationSpec,
    OracleError, RnaDesignEnv, SiteCode, TargetSpec,
};
use ribodesign::rl::{EpisodeTelemetry, ObsDtype, Observation};

/// Python callable used as the folding oracle.
struct PyOracle {
    callable: Py<PyAny>,
}

impl FoldingOracle for PyOracle {
    fn fold(&self, sequence: &str) -> Result<String, OracleError> {
        Python::with_gil(|py| {
            self.callable
                .call1(py, (sequence,))
                .and_then(|folded| folded.extract::<String>(py))
                .map_err(|e| OracleError::Failed {
                    message: e.to_string(),
                })
        })
    }
}

enum EnvOracle {
    Builtin(NussinovOracle),
    Python(PyOracle),
}

impl FoldingOracle for EnvOracle {
    fn fold(&self, sequence: &str) -> Result<String, OracleError> {
        match self {
            EnvOracle::Builtin(o) => o.fold(sequence),
            EnvOracle::Python(o) => o.fold(sequence),
        }
    }
}

fn env_error_to_py(e: EnvError) -> PyErr {
    match e {
        EnvError::InvalidAction { .. } | EnvError::Structure(_) | EnvError::EmptyTargetPool => {
            PyValueError::new_err(e.to_string())
        }
        _ => PyRuntimeError::new_err(e.to_string()),
    }
}

/// Accept `"((..))"` or `(id, "((..))")` per entry.
fn parse_structures(structures: &Bound<'_, PyList>) -> PyResult<Vec<TargetSpec>> {
    structures
        .iter()
        .map(|item| {
            if let Ok(s) = item.extract::<String>() {
                return Ok(TargetSpec::Raw(s));
            }
            let (id, dot_bracket) = item.extract::<(u64, String)>().map_err(|_| {
                PyValueError::new_err("structures must be strings or (id, string) tuples")
            })?;
            Ok(TargetSpec::Identified { id, dot_bracket })
        })
        .collect()
}

/// Build an EnvConfig from an optional dict of overrides.
fn parse_config(config: Option<&Bound<'_, PyDict>>) -> PyResult<EnvConfig> {
    let mut cfg = EnvConfig::default();
    let Some(dict) = config else {
        return Ok(cfg);
    };

    for (key, value) in dict.iter() {
        let key: String = key.extract()?;
        match key.as_str() {
            "mutation_threshold" => cfg.mutation_threshold = value.extract()?,
            "reward_exponent" => cfg.reward_exponent = value.extract()?,
            "state_radius" => cfg.state_radius = value.extract()?,
            "use_conv" => cfg.use_conv = value.extract()?,
            "use_embedding" => cfg.use_embedding = value.extract()?,
            "diversity_loss" => cfg.diversity_loss = value.extract()?,
            other => {
                return Err(PyValueError::new_err(format!(
                    "Unknown config option: {}",
                    other
                )))
            }
        }
    }
    cfg.validate()
        .map_err(|e| PyValueError::new_err(e.to_string()))?;
    Ok(cfg)
}

/// Convert an observation window to a Python list.
///
/// Int dtype yields ints; float dtype yields floats, each wrapped in a
/// one-element list in convolution layout.
fn observation_to_list(py: Python<'_>, obs: &Observation, dtype: ObsDtype) -> PyResult<PyObject> {
    let list = PyList::empty_bound(py);
    for site in &obs.sites {
        match (site, dtype) {
            (SiteCode::Flat(v), ObsDtype::Int) => list.append(*v)?,
            (SiteCode::Flat(v), ObsDtype::Float) => list.append(*v as f64)?,
            (SiteCode::Channel([v]), _) => list.append(vec![*v as f64])?,
        }
    }
    Ok(list.into_any().unbind())
}

fn episode_info_to_dict(py: Python<'_>, info: &EpisodeInfo) -> PyResult<Py<PyDict>> {
    let dict = PyDict::new_bound(py);

    dict.set_item("target_id", info.target_id)?;
    dict.set_item("time", info.time)?;
    dict.set_item(
        "normalized_hamming_distance",
        info.normalized_hamming_distance,
    )?;
    dict.set_item("hamming_distance", info.hamming_distance)?;
    dict.set_item("structure", &info.structure)?;
    dict.set_item("sequence", &info.sequence)?;

    Ok(dict.into())
}

/// Gym-style RNA design environment.
///
/// Provides the standard RL interface:
/// - reset() -> observation
/// - step(action) -> (observation | None, terminal, reward)
#[pyclass]
pub struct Env {
    inner: RnaDesignEnv<EnvOracle>,
    obs_spec: ObservationSpec,
}

#[pymethods]
impl Env {
    /// Create a new environment.
    ///
    /// Args:
    ///     structures: List of dot-bracket strings or (id, string) tuples
    ///     config: Optional dict with any of mutation_threshold, reward_exponent,
    ///         state_radius, use_conv, use_embedding, diversity_loss
    ///     oracle: Optional callable str -> str (default: built-in folder)
    ///     seed: Seed for the target order (default: 0)
    #[new]
    #[pyo3(signature = (structures, config=None, oracle=None, seed=0))]
    fn new(
        structures: &Bound<'_, PyList>,
        config: Option<&Bound<'_, PyDict>>,
        oracle: Option<Py<PyAny>>,
        seed: u64,
    ) -> PyResult<Self> {
        let specs = parse_structures(structures)?;
        let cfg = parse_config(config)?;
        let oracle = match oracle {
            Some(callable) => EnvOracle::Python(PyOracle { callable }),
            None => EnvOracle::Builtin(NussinovOracle::default()),
        };

        let obs_spec = ObservationSpec::for_config(&cfg);
        let inner = RnaDesignEnv::from_specs(&specs, cfg, oracle, seed)
            .map_err(env_error_to_py)?
            .with_telemetry(EpisodeTelemetry::from_env());

        Ok(Self { inner, obs_spec })
    }

    /// Start a new episode.
    ///
    /// Returns:
    ///     observation: window of the padded target around the first site
    fn reset(&mut self, py: Python<'_>) -> PyResult<PyObject> {
        let obs = self.inner.reset();
        observation_to_list(py, &obs, self.obs_spec.dtype)
    }

    /// Assign the current site.
    ///
    /// Args:
    ///     action: 0..4 (G/A/U/C for unpaired sites, GC/CG/AU/UA for pairs)
    ///
    /// Returns:
    ///     Tuple of (observation or None, terminal, reward)
    fn step(&mut self, py: Python<'_>, action: usize) -> PyResult<(Option<PyObject>, bool, f64)> {
        let result = self.inner.step(action).map_err(env_error_to_py)?;
        let obs = result
            .observation
            .as_ref()
            .map(|o| observation_to_list(py, o, self.obs_spec.dtype))
            .transpose()?;
        Ok((obs, result.terminal, result.reward))
    }

    /// Observation space: {"type": "int" | "float", "shape": tuple}.
    #[getter]
    fn states(&self, py: Python<'_>) -> PyResult<Py<PyDict>> {
        let dict = PyDict::new_bound(py);
        let dtype = match self.obs_spec.dtype {
            ObsDtype::Int => "int",
            ObsDtype::Float => "float",
        };
        dict.set_item("type", dtype)?;
        dict.set_item("shape", PyTuple::new_bound(py, self.obs_spec.shape.iter()))?;
        Ok(dict.into())
    }

    /// Action space: {"type": "int", "num_actions": 4}.
    #[getter]
    fn actions(&self, py: Python<'_>) -> PyResult<Py<PyDict>> {
        let dict = PyDict::new_bound(py);
        dict.set_item("type", "int")?;
        dict.set_item("num_actions", self.inner.action_spec().num_actions)?;
        Ok(dict.into())
    }

    /// Summaries of all finished episodes, oldest first.
    #[getter]
    fn episodes_info(&self, py: Python<'_>) -> PyResult<Py<PyList>> {
        let list = PyList::empty_bound(py);
        for info in self.inner.episodes() {
            list.append(episode_info_to_dict(py, info)?)?;
        }
        Ok(list.into())
    }

    /// Dot-bracket of the current episode's target, if any.
    #[getter]
    fn target(&self) -> Option<String> {
        self.inner.target().map(|t| t.dot_bracket().to_string())
    }

    /// Restart the target order from `seed`.
    fn reseed(&mut self, seed: u64) {
        self.inner.reseed(seed);
    }
}

/// Number of discrete actions.
#[pyfunction]
fn num_actions() -> usize {
    ribodesign::rl::NUM_ACTIONS
}

#[pymodule]
fn ribodesign_env(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<Env>()?;
    m.add_function(wrap_pyfunction!(num_actions, m)?)?;
    Ok(())
}
