use std::collections::VecDeque;

use ndarray::{Array1, ArrayView2};
use crate::{
    data::SurvivalTarget,
    datafits::Datafit,
    diagnostics,
    error::{CoxError, Result},
    penalties::Penalty,
};
use super::{check_finite, check_shapes, inf_norm, Solver, SolverOutput};

const MAX_LINE_SEARCH: usize = 40;
const ARMIJO: f64 = 1e-4;

/// limited-memory BFGS for smooth penalties
#[derive(Debug, Clone)]
pub struct Lbfgs {
    max_iter: usize,
    tol: f64,
    memory: usize, // number of (s, y) pairs kept
    verbose: bool,
}

impl Default for Lbfgs {
    fn default() -> Self {
        Self {
            max_iter: 50,
            tol: 1e-4,
            memory: 10,
            verbose: false,
        }
    }
}

/// one curvature pair
#[derive(Debug, Clone)]
struct Correction {
    s: Array1<f64>,
    y: Array1<f64>,
    rho: f64, // 1 / (s.y)
}

impl Lbfgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    pub fn with_memory(mut self, memory: usize) -> Self {
        self.memory = memory.max(1);
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// objective & gradient in w
    fn evaluate(
        &self,
        x: ArrayView2<f64>,
        y: &SurvivalTarget,
        datafit: &dyn Datafit,
        penalty: &dyn Penalty,
        w: &Array1<f64>,
    ) -> Result<(f64, Array1<f64>)> {
        let xw = x.dot(w);
        let value = datafit.value(y, xw.view())? + penalty.value(w.view());
        let penalty_grad = penalty.gradient(w.view()).ok_or_else(|| {
            CoxError::invalid_parameter("penalty", "non-smooth penalty given to L-BFGS")
        })?;
        let grad = datafit.gradient(x, y, xw.view())? + penalty_grad;
        Ok((value, grad))
    }

    /// two-loop recursion: approx inverse hessian times `grad`
    fn inverse_hessian_product(memory: &VecDeque<Correction>, grad: &Array1<f64>) -> Array1<f64> {
        let mut q = grad.clone();
        let mut alphas = Vec::with_capacity(memory.len());
        for c in memory.iter().rev() {
            let a = c.rho * c.s.dot(&q);
            q.scaled_add(-a, &c.y);
            alphas.push(a);
        }

        let gamma = memory
            .back()
            .map(|c| c.s.dot(&c.y) / c.y.dot(&c.y))
            .unwrap_or(1.0);
        let mut r = q * gamma;

        for (c, &a) in memory.iter().zip(alphas.iter().rev()) {
            let b = c.rho * c.y.dot(&r);
            r.scaled_add(a - b, &c.s);
        }
        r
    }
}

impl Solver for Lbfgs {
    fn name(&self) -> &'static str {
        "L-BFGS"
    }

    fn solve(
        &self,
        x: ArrayView2<f64>,
        y: &SurvivalTarget,
        datafit: &dyn Datafit,
        penalty: &dyn Penalty,
    ) -> Result<SolverOutput> {
        check_shapes(x, y)?;
        if !penalty.is_smooth() {
            return Err(CoxError::invalid_parameter(
                "penalty", "non-smooth penalty given to L-BFGS"
            ));
        }

        let mut w = Array1::zeros(x.ncols());
        let (value, mut grad) = self.evaluate(x, y, datafit, penalty, &w)?;
        let mut current = check_finite(value, self.name())?;

        let mut memory: VecDeque<Correction> = VecDeque::with_capacity(self.memory);
        let mut objective_trace = Vec::with_capacity(self.max_iter);
        let mut n_iter = 0;
        let mut stop_crit = inf_norm(grad.view());

        for t in 0..self.max_iter {
            if stop_crit <= self.tol {
                break;
            }

            let mut direction = -Self::inverse_hessian_product(&memory, &grad);
            let mut slope = grad.dot(&direction);
            if !(slope < 0.0) {
                // lost descent, restart from steepest descent
                memory.clear();
                direction = -grad.clone();
                slope = -grad.dot(&grad);
            }

            let mut step = 1.0;
            let mut accepted = None;
            for _ in 0..MAX_LINE_SEARCH {
                let candidate = &w + &(step * &direction);
                match self.evaluate(x, y, datafit, penalty, &candidate) {
                    Ok((value, candidate_grad))
                        if value.is_finite() && value <= current + ARMIJO * step * slope =>
                    {
                        accepted = Some((candidate, value, candidate_grad));
                        break;
                    }
                    // overshooting into overflow just means the step is too long
                    Ok(_) | Err(CoxError::NumericalError { .. }) => step *= 0.5,
                    Err(err) => return Err(err),
                }
            }

            let Some((w_new, value, grad_new)) = accepted else {
                diagnostics::warn(format!(
                    "L-BFGS line search failed at iteration {} (grad norm {:.2e})",
                    t, stop_crit
                ));
                break;
            };

            let s = &w_new - &w;
            let y_diff = &grad_new - &grad;
            let sy = s.dot(&y_diff);
            // curvature condition - skip the pair otherwise
            if sy > f64::EPSILON * y_diff.dot(&y_diff) {
                if memory.len() == self.memory {
                    memory.pop_front();
                }
                memory.push_back(Correction { s, y: y_diff, rho: 1.0 / sy });
            }

            w = w_new;
            grad = grad_new;
            current = value;
            stop_crit = inf_norm(grad.view());
            objective_trace.push(current);
            n_iter = t + 1;

            if self.verbose {
                log::debug!("l-bfgs iter {}: objective {:.10e}, grad norm {:.2e}", t, current, stop_crit);
            }
        }

        if stop_crit > self.tol && self.max_iter > 0 {
            diagnostics::warn(format!(
                "L-BFGS did not converge: grad norm {:.2e} > tol {:.2e} after {} iterations",
                stop_crit, self.tol, n_iter
            ));
        }

        Ok(SolverOutput { coefs: w, objective_trace, stop_crit, n_iter })
    }

    fn max_iter(&self) -> usize {
        self.max_iter
    }

    fn set_max_iter(&mut self, max_iter: usize) {
        self.max_iter = max_iter;
    }

    fn tol(&self) -> f64 {
        self.tol
    }
}
