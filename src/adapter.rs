//! benchmark adapter around the Prox-Newton and L-BFGS cox solvers

use std::fmt;

use ndarray::Array1;
use crate::{
    benchmark::{BenchmarkSolver, ParameterGrid, SkipDecision, SolverResult, StoppingStrategy},
    datafits::{Cox, Datafit},
    diagnostics,
    error::{CoxError, Result},
    objective::CoxProblem,
    penalties::{L1PlusL2, Penalty, L2},
    solvers::{Lbfgs, ProxNewton, Solver},
};

pub const ADAPTER_NAME: &str = "coxnet";
pub const PROX_NEWTON: &str = "Prox-Newton";
pub const LBFGS: &str = "L-BFGS";

/// tolerance both algorithms are built with
pub const SOLVER_TOL: f64 = 1e-9;
/// iteration budget of the warm-up run
pub const WARM_UP_ITERATIONS: usize = 4;

/// which algorithm the adapter drives, resolved once from the solver name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolverChoice {
    ProxNewton,
    Lbfgs,
    /// kept verbatim; rejected when an objective is set
    Unsupported(String),
}

impl SolverChoice {
    pub fn parse(name: &str) -> Self {
        match name {
            PROX_NEWTON => Self::ProxNewton,
            LBFGS => Self::Lbfgs,
            other => Self::Unsupported(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::ProxNewton => PROX_NEWTON,
            Self::Lbfgs => LBFGS,
            Self::Unsupported(name) => name,
        }
    }
}

impl From<&str> for SolverChoice {
    fn from(name: &str) -> Self {
        Self::parse(name)
    }
}

impl fmt::Display for SolverChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// datafit, penalty & algorithm for the current objective - built together, never patched
#[derive(Debug)]
struct FittedState {
    datafit: Cox,
    penalty: Box<dyn Penalty>,
    solver: Box<dyn Solver>,
}

impl FittedState {
    fn build(choice: &SolverChoice, problem: &CoxProblem) -> Result<Self> {
        let (mut datafit, penalty, solver): (Cox, Box<dyn Penalty>, Box<dyn Solver>) = match choice {
            SolverChoice::ProxNewton => (
                Cox::new(problem.use_efron()),
                Box::new(L1PlusL2::new(problem.alpha(), problem.l1_ratio())?),
                Box::new(ProxNewton::new().with_fit_intercept(false).with_tol(SOLVER_TOL)),
            ),
            // l1_ratio is unused here - `skip` filters out every problem where it matters
            SolverChoice::Lbfgs => (
                Cox::new(problem.use_efron()),
                Box::new(L2::new(problem.alpha())?),
                Box::new(Lbfgs::new().with_tol(SOLVER_TOL)),
            ),
            SolverChoice::Unsupported(name) => {
                return Err(CoxError::unsupported_solver(name.as_str(), ADAPTER_NAME));
            }
        };

        diagnostics::suppressed(|| datafit.initialize(problem.x(), problem.y()))?;
        Ok(Self { datafit, penalty, solver })
    }
}

/// plugs the cox solvers into a [`BenchmarkSolver`] harness
///
/// lifecycle: `new` -> `set_objective` (configured) -> `run` (fitted). `run`
/// can be repeated with any budget; a new `set_objective` drops everything
/// the previous one built, including the last result.
#[derive(Debug)]
pub struct SolverAdapter {
    choice: SolverChoice,
    problem: Option<CoxProblem>,
    state: Option<FittedState>,
    w: Option<Array1<f64>>,
}

impl Default for SolverAdapter {
    fn default() -> Self {
        Self::new(PROX_NEWTON)
    }
}

impl SolverAdapter {
    /// no validation here; unsupported names fail in `set_objective`
    pub fn new(solver: &str) -> Self {
        Self {
            choice: SolverChoice::parse(solver),
            problem: None,
            state: None,
            w: None,
        }
    }

    pub fn solver_choice(&self) -> &SolverChoice {
        &self.choice
    }

    pub fn is_configured(&self) -> bool {
        self.state.is_some()
    }

    pub fn is_fitted(&self) -> bool {
        self.w.is_some()
    }
}

impl BenchmarkSolver for SolverAdapter {
    fn name(&self) -> &str {
        ADAPTER_NAME
    }

    fn parameters(&self) -> ParameterGrid {
        ParameterGrid::new().with("solver", &[PROX_NEWTON, LBFGS])
    }

    fn stopping_strategy(&self) -> StoppingStrategy {
        StoppingStrategy::Iteration
    }

    fn skip(&self, problem: &CoxProblem) -> SkipDecision {
        match self.choice {
            SolverChoice::ProxNewton if problem.alpha() == 0.0 => SkipDecision::skip(format!(
                "{}:{} does not handle unpenalized Cox estimation.",
                ADAPTER_NAME, PROX_NEWTON
            )),
            SolverChoice::Lbfgs if problem.l1_ratio() != 0.0 => SkipDecision::skip(format!(
                "{}:{} handles only L2 Cox regularization.",
                ADAPTER_NAME, LBFGS
            )),
            _ => SkipDecision::Proceed,
        }
    }

    fn set_objective(&mut self, problem: &CoxProblem) -> Result<()> {
        self.problem = None;
        self.state = None;
        self.w = None;

        let state = FittedState::build(&self.choice, problem)?;
        log::debug!(
            "{}:{} objective set: {} x {}, alpha = {}, l1_ratio = {}, efron = {}",
            ADAPTER_NAME, self.choice, problem.n_samples(), problem.n_features(),
            problem.alpha(), problem.l1_ratio(), problem.use_efron()
        );

        self.problem = Some(problem.clone());
        self.state = Some(state);
        Ok(())
    }

    fn warm_up(&mut self) -> Result<()> {
        self.run(WARM_UP_ITERATIONS)
    }

    fn run(&mut self, n_iter: usize) -> Result<()> {
        let (Some(problem), Some(state)) = (self.problem.as_ref(), self.state.as_mut()) else {
            return Err(CoxError::ObjectiveNotSet);
        };

        state.solver.set_max_iter(n_iter);
        let output = diagnostics::suppressed(|| {
            state.solver.solve(problem.x(), problem.y(), &state.datafit, state.penalty.as_ref())
        })?;
        log::debug!(
            "{}:{} run({}): {} iterations, stop crit {:.2e}",
            ADAPTER_NAME, self.choice, n_iter, output.n_iter, output.stop_crit
        );

        self.w = Some(output.coefs);
        Ok(())
    }

    fn get_result(&self) -> Result<SolverResult> {
        self.w
            .clone()
            .map(|w| SolverResult { w })
            .ok_or(CoxError::ResultNotAvailable)
    }
}
