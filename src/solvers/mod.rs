//! optimization algorithms over a (datafit, penalty) pair
//!
//! a solver never looks inside the datafit or the penalty - it only uses the
//! [`Datafit`] and [`Penalty`] traits, so any combination that satisfies the
//! solver's requirements can be plugged in.

mod lbfgs;
mod prox_newton;

pub use lbfgs::Lbfgs;
pub use prox_newton::ProxNewton;

use std::fmt::Debug;

use ndarray::{Array1, ArrayView1, ArrayView2};
use crate::{
    data::SurvivalTarget,
    datafits::Datafit,
    error::{CoxError, Result},
    penalties::Penalty,
};

/// what a solve returns - coefficients first, the rest is diagnostics
#[derive(Debug, Clone)]
pub struct SolverOutput {
    pub coefs: Array1<f64>,
    pub objective_trace: Vec<f64>, // objective after each iteration
    pub stop_crit: f64,            // optimality violation at exit
    pub n_iter: usize,
}

pub trait Solver: Debug {
    fn name(&self) -> &'static str;

    fn solve(
        &self,
        x: ArrayView2<f64>,
        y: &SurvivalTarget,
        datafit: &dyn Datafit,
        penalty: &dyn Penalty,
    ) -> Result<SolverOutput>;

    fn max_iter(&self) -> usize;

    fn set_max_iter(&mut self, max_iter: usize);

    fn tol(&self) -> f64;
}

fn check_shapes(x: ArrayView2<f64>, y: &SurvivalTarget) -> Result<()> {
    if x.nrows() != y.n_samples() {
        return Err(CoxError::invalid_dimensions(
            format!("X rows ({}) != n_samples ({})", x.nrows(), y.n_samples())
        ));
    }
    Ok(())
}

fn check_finite(objective: f64, solver: &str) -> Result<f64> {
    if objective.is_finite() {
        Ok(objective)
    } else {
        Err(CoxError::numerical_error(
            format!("{} hit a non-finite objective ({})", solver, objective)
        ))
    }
}

fn inf_norm(v: ArrayView1<f64>) -> f64 {
    v.iter().fold(0.0, |acc: f64, x| acc.max(x.abs()))
}
