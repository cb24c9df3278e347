//! the contract between a benchmark harness and the solvers it compares
//!
//! the harness calls, in order: `skip`, `set_objective`, `warm_up`, then
//! `run` + `get_result` once per point of its iteration sweep.

use std::fmt;

use ndarray::Array1;
use crate::{error::Result, objective::CoxProblem};

/// how the harness grows the budget between runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoppingStrategy {
    /// sweep `n_iter` passed to `run`
    Iteration,
    /// sweep tolerance
    Tolerance,
}

/// verdict of the pre-flight compatibility check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipDecision {
    Proceed,
    Skip { reason: String },
}

impl SkipDecision {
    pub fn skip(reason: impl Into<String>) -> Self {
        Self::Skip { reason: reason.into() }
    }

    pub fn should_skip(&self) -> bool {
        matches!(self, Self::Skip { .. })
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Proceed => None,
            Self::Skip { reason } => Some(reason),
        }
    }
}

/// solver parameters the harness sweeps, name -> allowed values
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterGrid {
    entries: Vec<(String, Vec<String>)>,
}

impl ParameterGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, values: &[&str]) -> Self {
        self.entries.push((name.into(), values.iter().map(|v| v.to_string()).collect()));
        self
    }

    pub fn values(&self, name: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }
}

impl fmt::Display for ParameterGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.entries
            .iter()
            .map(|(n, v)| format!("{}: [{}]", n, v.join(", ")))
            .collect();
        write!(f, "{{{}}}", parts.join("; "))
    }
}

/// what a run leaves behind
#[derive(Debug, Clone, PartialEq)]
pub struct SolverResult {
    pub w: Array1<f64>,
}

pub trait BenchmarkSolver {
    fn name(&self) -> &str;

    fn parameters(&self) -> ParameterGrid;

    fn stopping_strategy(&self) -> StoppingStrategy {
        StoppingStrategy::Iteration
    }

    /// checked before `set_objective`; a skipped problem is never run
    fn skip(&self, _problem: &CoxProblem) -> SkipDecision {
        SkipDecision::Proceed
    }

    fn set_objective(&mut self, problem: &CoxProblem) -> Result<()>;

    /// one untimed run so timed runs don't pay one-off costs
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }

    fn run(&mut self, n_iter: usize) -> Result<()>;

    fn get_result(&self) -> Result<SolverResult>;
}
