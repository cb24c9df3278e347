//! TOML configuration for a benchmark sweep
//!
//! ```toml
//! [dataset]
//! n_samples = 500
//! n_features = 20
//! seed = 0
//! tie_resolution = 0.5
//!
//! [objective]
//! alpha = 0.01
//! l1_ratio = 0.0
//! use_efron = true
//!
//! [solver]
//! names = ["Prox-Newton", "L-BFGS"]
//!
//! [run]
//! n_iters = [1, 2, 4, 8, 16]
//! warm_up = true
//! ```
//!
//! every section and every key is optional; missing ones take the defaults below.

use std::{fs, path::Path};

use serde::Deserialize;
use crate::{
    adapter::{LBFGS, PROX_NEWTON},
    error::{CoxError, Result},
    simulate::SimulationConfig,
};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ObjectiveConfig {
    pub alpha: f64,
    pub l1_ratio: f64,
    pub use_efron: bool,
}

impl Default for ObjectiveConfig {
    fn default() -> Self {
        Self {
            alpha: 0.01,
            l1_ratio: 0.0,
            use_efron: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolverConfig {
    /// values swept for the "solver" parameter
    pub names: Vec<String>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            names: vec![PROX_NEWTON.to_string(), LBFGS.to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub n_iters: Vec<usize>,
    pub warm_up: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            n_iters: vec![1, 2, 4, 8, 16, 32],
            warm_up: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BenchmarkConfig {
    pub dataset: SimulationConfig,
    pub objective: ObjectiveConfig,
    pub solver: SolverConfig,
    pub run: RunConfig,
}

impl BenchmarkConfig {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|err| {
            CoxError::config(format!("can't read {}: {}", path.display(), err))
        })?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<()> {
        let objective = &self.objective;
        if !(objective.alpha >= 0.0 && objective.alpha.is_finite()) {
            return Err(CoxError::config(format!("alpha must be >= 0, got {}", objective.alpha)));
        }
        if !(0.0..=1.0).contains(&objective.l1_ratio) {
            return Err(CoxError::config(
                format!("l1_ratio must be in [0, 1], got {}", objective.l1_ratio)
            ));
        }
        if self.run.n_iters.is_empty() {
            return Err(CoxError::config("run.n_iters is empty"));
        }
        if self.run.n_iters.contains(&0) {
            return Err(CoxError::config("run.n_iters entries must be >= 1"));
        }
        self.dataset
            .validate()
            .map_err(|err| CoxError::config(format!("dataset: {}", err)))
    }
}
