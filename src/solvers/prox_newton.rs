use ndarray::{s, Array1, ArrayView1, ArrayView2};
use crate::{
    data::SurvivalTarget,
    datafits::Datafit,
    diagnostics,
    error::{CoxError, Result},
    penalties::Penalty,
};
use super::{check_finite, check_shapes, Solver, SolverOutput};

const MAX_BACKTRACK: usize = 20;
const ARMIJO: f64 = 1e-4;

/// proximal newton w/ a diagonal hessian in the linear predictor
///
/// each outer iteration builds the quadratic model
/// `g^T d + 0.5 d^T X^T H X d + P(w + d)` at the current iterate, minimizes it
/// by cyclic coordinate descent and then backtracks along `d` on the true
/// objective.
#[derive(Debug, Clone)]
pub struct ProxNewton {
    fit_intercept: bool,
    max_iter: usize,    // outer newton iterations
    max_pn_iter: usize, // coordinate descent passes per subproblem
    tol: f64,
    verbose: bool,
}

impl Default for ProxNewton {
    fn default() -> Self {
        Self {
            fit_intercept: false,
            max_iter: 20,
            max_pn_iter: 1000,
            tol: 1e-4,
            verbose: false,
        }
    }
}

/// newton direction in w-space plus its image X d
struct Direction {
    delta: Array1<f64>,
    x_delta: Array1<f64>,
}

impl ProxNewton {
    pub fn new() -> Self {
        Self::default()
    }

    /// append an unpenalized intercept to the coefficients
    pub fn with_fit_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_max_pn_iter(mut self, max_pn_iter: usize) -> Self {
        self.max_pn_iter = max_pn_iter;
        self
    }

    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn fit_intercept(&self) -> bool {
        self.fit_intercept
    }

    fn objective(
        &self,
        y: &SurvivalTarget,
        datafit: &dyn Datafit,
        penalty: &dyn Penalty,
        w: ArrayView1<f64>,
        xw: ArrayView1<f64>,
        n_features: usize,
    ) -> Result<f64> {
        let value = datafit.value(y, xw)? + penalty.value(w.slice(s![..n_features]));
        check_finite(value, self.name())
    }

    /// max optimality violation over features (and intercept)
    fn optimality(
        &self,
        penalty: &dyn Penalty,
        w: ArrayView1<f64>,
        grad: ArrayView1<f64>,
        intercept_grad: f64,
    ) -> f64 {
        let n_features = grad.len();
        let dist = penalty.subdiff_distance(w.slice(s![..n_features]), grad);
        let crit = dist.iter().fold(0.0, |acc: f64, &d| acc.max(d));
        if self.fit_intercept {
            crit.max(intercept_grad.abs())
        } else {
            crit
        }
    }

    /// coordinate descent on the penalized quadratic model
    #[allow(clippy::too_many_arguments)]
    fn descent_direction(
        &self,
        x: ArrayView2<f64>,
        penalty: &dyn Penalty,
        w: ArrayView1<f64>,
        grad: ArrayView1<f64>,
        raw_grad: ArrayView1<f64>,
        raw_hess: ArrayView1<f64>,
        inner_tol: f64,
    ) -> Direction {
        let (n_samples, n_features) = x.dim();
        let lipschitz: Array1<f64> = x
            .columns()
            .into_iter()
            .map(|col| col.iter().zip(raw_hess.iter()).map(|(&v, &h)| h * v * v).sum())
            .collect();
        let intercept_lipschitz = raw_hess.sum();
        let intercept_grad = raw_grad.sum();

        let mut delta = Array1::zeros(w.len());
        let mut x_delta = Array1::zeros(n_samples);

        for _ in 0..self.max_pn_iter {
            for j in 0..n_features {
                if lipschitz[j] == 0.0 {
                    continue;
                }
                let col = x.column(j);
                let old = w[j] + delta[j];
                let model_grad_j = grad[j]
                    + col.iter()
                        .zip(raw_hess.iter().zip(x_delta.iter()))
                        .map(|(&v, (&h, &xd))| v * h * xd)
                        .sum::<f64>();
                let new = penalty.prox_1d(old - model_grad_j / lipschitz[j], 1.0 / lipschitz[j], j);
                if new != old {
                    delta[j] = new - w[j];
                    x_delta.scaled_add(new - old, &col);
                }
            }

            if self.fit_intercept && intercept_lipschitz > 0.0 {
                let model_grad = intercept_grad + raw_hess.dot(&x_delta);
                let step = -model_grad / intercept_lipschitz;
                delta[n_features] += step;
                x_delta.mapv_inplace(|v| v + step);
            }

            // optimality of the subproblem at w + delta
            let h_x_delta = &raw_hess * &x_delta;
            let model_grad = &grad + &x.t().dot(&h_x_delta);
            let trial = &w + &delta;
            let crit = self.optimality(
                penalty,
                trial.view(),
                model_grad.view(),
                intercept_grad + h_x_delta.sum(),
            );
            if crit <= inner_tol {
                break;
            }
        }

        Direction { delta, x_delta }
    }

    /// backtracking along the newton direction. `None` when no step decreases the objective.
    #[allow(clippy::too_many_arguments)]
    fn line_search(
        &self,
        y: &SurvivalTarget,
        datafit: &dyn Datafit,
        penalty: &dyn Penalty,
        w: &Array1<f64>,
        xw: &Array1<f64>,
        grad: ArrayView1<f64>,
        intercept_grad: f64,
        direction: &Direction,
        current: f64,
    ) -> Result<Option<(Array1<f64>, Array1<f64>, f64)>> {
        let n_features = grad.len();
        let coefs = w.slice(s![..n_features]);
        let target = w + &direction.delta;

        // predicted decrease of the composite objective for a full step
        let mut decrement = grad.dot(&direction.delta.slice(s![..n_features]))
            + penalty.value(target.slice(s![..n_features]))
            - penalty.value(coefs);
        if self.fit_intercept {
            decrement += intercept_grad * direction.delta[n_features];
        }
        if !(decrement < 0.0) {
            return Ok(None);
        }

        let mut step = 1.0;
        for _ in 0..MAX_BACKTRACK {
            let w_new = w + &(step * &direction.delta);
            let xw_new = xw + &(step * &direction.x_delta);
            match datafit.value(y, xw_new.view()) {
                Ok(value) => {
                    let value = value + penalty.value(w_new.slice(s![..n_features]));
                    if value.is_finite() && value <= current + ARMIJO * step * decrement {
                        return Ok(Some((w_new, xw_new, value)));
                    }
                }
                Err(CoxError::NumericalError { .. }) => {}
                Err(err) => return Err(err),
            }
            step *= 0.5;
        }
        Ok(None)
    }
}

impl Solver for ProxNewton {
    fn name(&self) -> &'static str {
        "Prox-Newton"
    }

    fn solve(
        &self,
        x: ArrayView2<f64>,
        y: &SurvivalTarget,
        datafit: &dyn Datafit,
        penalty: &dyn Penalty,
    ) -> Result<SolverOutput> {
        check_shapes(x, y)?;
        let (n_samples, n_features) = x.dim();
        let n_coefs = n_features + usize::from(self.fit_intercept);

        let mut w = Array1::zeros(n_coefs);
        let mut xw = Array1::zeros(n_samples);
        let mut current = self.objective(y, datafit, penalty, w.view(), xw.view(), n_features)?;
        let mut objective_trace = Vec::with_capacity(self.max_iter);
        let mut stop_crit = f64::INFINITY;
        let mut n_iter = 0;
        let mut converged = false;

        for t in 0..self.max_iter {
            let (raw_grad, raw_hess) = datafit.raw_grad_and_hessian(y, xw.view())?;
            let grad = x.t().dot(&raw_grad);
            let intercept_grad = raw_grad.sum();

            stop_crit = self.optimality(penalty, w.view(), grad.view(), intercept_grad);
            if self.verbose {
                log::debug!("prox newton iter {}: objective {:.10e}, stop crit {:.2e}", t, current, stop_crit);
            }
            if stop_crit <= self.tol {
                converged = true;
                break;
            }

            let direction = self.descent_direction(
                x,
                penalty,
                w.view(),
                grad.view(),
                raw_grad.view(),
                raw_hess.view(),
                0.3 * stop_crit,
            );

            match self.line_search(
                y, datafit, penalty, &w, &xw, grad.view(), intercept_grad, &direction, current,
            )? {
                Some((w_new, xw_new, value)) => {
                    w = w_new;
                    xw = xw_new;
                    current = value;
                    objective_trace.push(current);
                    n_iter = t + 1;
                }
                None => {
                    diagnostics::warn(format!(
                        "Prox-Newton line search failed at iteration {} (stop crit {:.2e})",
                        t, stop_crit
                    ));
                    break;
                }
            }
        }

        if !converged && self.max_iter > 0 {
            let raw_grad = datafit.raw_grad(y, xw.view())?;
            let grad = x.t().dot(&raw_grad);
            stop_crit = self.optimality(penalty, w.view(), grad.view(), raw_grad.sum());
            if stop_crit <= self.tol {
                converged = true;
            }
        }

        if !converged && self.max_iter > 0 {
            diagnostics::warn(format!(
                "Prox-Newton did not converge: stop crit {:.2e} > tol {:.2e} after {} iterations",
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
