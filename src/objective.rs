use std::sync::Arc;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use crate::{
    data::{SurvivalData, SurvivalTarget},
    datafits::{Cox, Datafit},
    error::{CoxError, Result},
    penalties::{L1PlusL2, Penalty},
};

/// one benchmark problem: (X, y, alpha, l1_ratio, use_efron)
///
/// X and y sit behind `Arc` so every solver in a sweep shares one copy.
#[derive(Debug, Clone)]
pub struct CoxProblem {
    x: Arc<Array2<f64>>,
    y: Arc<SurvivalTarget>,
    alpha: f64,
    l1_ratio: f64,
    use_efron: bool,
}

impl CoxProblem {
    pub fn new(
        x: Array2<f64>,
        y: SurvivalTarget,
        alpha: f64,
        l1_ratio: f64,
        use_efron: bool,
    ) -> Result<Self> {
        if x.nrows() != y.n_samples() {
            return Err(CoxError::invalid_dimensions(
                format!("X rows ({}) != n_samples ({})", x.nrows(), y.n_samples())
            ));
        }
        let problem = Self {
            x: Arc::new(x),
            y: Arc::new(y),
            alpha,
            l1_ratio,
            use_efron,
        };
        problem.validate_regularization()?;
        Ok(problem)
    }

    pub fn from_data(data: SurvivalData, alpha: f64, l1_ratio: f64, use_efron: bool) -> Result<Self> {
        let (x, y) = data.into_parts();
        Self::new(x, y, alpha, l1_ratio, use_efron)
    }

    /// same data, different regularization
    pub fn with_regularization(&self, alpha: f64, l1_ratio: f64) -> Result<Self> {
        let mut problem = self.clone();
        problem.alpha = alpha;
        problem.l1_ratio = l1_ratio;
        problem.validate_regularization()?;
        Ok(problem)
    }

    fn validate_regularization(&self) -> Result<()> {
        if !(self.alpha >= 0.0 && self.alpha.is_finite()) {
            return Err(CoxError::invalid_parameter("alpha", self.alpha));
        }
        if !(0.0..=1.0).contains(&self.l1_ratio) {
            return Err(CoxError::invalid_parameter("l1_ratio", self.l1_ratio));
        }
        Ok(())
    }

    pub fn x(&self) -> ArrayView2<'_, f64> {
        self.x.view()
    }

    pub fn y(&self) -> &SurvivalTarget {
        &self.y
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn l1_ratio(&self) -> f64 {
        self.l1_ratio
    }

    pub fn use_efron(&self) -> bool {
        self.use_efron
    }

    pub fn n_samples(&self) -> usize {
        self.x.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.x.ncols()
    }
}

/// reference objective every solver's output is scored against:
/// cox datafit + elastic net, whatever the solver used internally
#[derive(Debug, Clone)]
pub struct CoxObjective {
    problem: CoxProblem,
    datafit: Cox,
    penalty: L1PlusL2,
}

impl CoxObjective {
    pub fn new(problem: &CoxProblem) -> Result<Self> {
        let mut datafit = Cox::new(problem.use_efron());
        datafit.initialize(problem.x(), problem.y())?;
        let penalty = L1PlusL2::new(problem.alpha(), problem.l1_ratio())?;
        Ok(Self {
            problem: problem.clone(),
            datafit,
            penalty,
        })
    }

    pub fn evaluate(&self, w: ArrayView1<f64>) -> Result<f64> {
        if w.len() != self.problem.n_features() {
            return Err(CoxError::invalid_dimensions(format!(
                "w len ({}) != n_features ({})", w.len(), self.problem.n_features()
            )));
        }
        let xw = self.problem.x().dot(&w);
        Ok(self.datafit.value(self.problem.y(), xw.view())? + self.penalty.value(w))
    }

    /// all-zeros coefficients - the starting point of every solver
    pub fn zero_solution(&self) -> Array1<f64> {
        Array1::zeros(self.problem.n_features())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn create_test_problem(alpha: f64, l1_ratio: f64) -> CoxProblem {
        let x = Array2::from_shape_vec((4, 2), vec![
            1.0, 0.5,
            2.0, 1.0,
            1.5, 0.0,
            3.0, 1.5,
        ]).unwrap();
        let y = SurvivalTarget::new(vec![1.0, 2.5, 3.2, 4.1], vec![true, false, true, true]).unwrap();
        CoxProblem::new(x, y, alpha, l1_ratio, true).unwrap()
    }

    #[test]
    fn test_problem_validation() {
        let y = SurvivalTarget::new(vec![1.0, 2.0], vec![true, true]).unwrap();
        assert!(CoxProblem::new(Array2::zeros((3, 1)), y.clone(), 0.1, 0.5, true).is_err());
        assert!(CoxProblem::new(Array2::zeros((2, 1)), y.clone(), -0.1, 0.5, true).is_err());
        assert!(CoxProblem::new(Array2::zeros((2, 1)), y, 0.1, 1.1, true).is_err());
    }

    #[test]
    fn test_with_regularization_shares_data() {
        let problem = create_test_problem(0.1, 0.5);
        let other = problem.with_regularization(0.0, 0.0).unwrap();
        assert_eq!(other.alpha(), 0.0);
        assert!(Arc::ptr_eq(&problem.x, &other.x));
        assert!(problem.with_regularization(0.1, 2.0).is_err());
    }

    #[test]
    fn test_objective_at_zero_is_datafit_only() {
        let problem = create_test_problem(0.3, 0.5);
        let objective = CoxObjective::new(&problem).unwrap();
        let at_zero = objective.evaluate(objective.zero_solution().view()).unwrap();

        // events at 1.0 (4 at risk), 3.2 (2 at risk), 4.1 (1 at risk)
        let expected = (4.0f64.ln() + 2.0f64.ln()) / 4.0;
        assert_relative_eq!(at_zero, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_objective_includes_penalty() {
        let problem = create_test_problem(1.0, 1.0);
        let objective = CoxObjective::new(&problem).unwrap();
        let w = array![1.0, -0.5];

        let mut datafit = Cox::new(true);
        datafit.initialize(problem.x(), problem.y()).unwrap();
        let xw = problem.x().dot(&w);
        let expected = datafit.value(problem.y(), xw.view()).unwrap() + 1.5; // pure lasso, |w|_1 = 1.5

        assert_relative_eq!(objective.evaluate(w.view()).unwrap(), expected, epsilon = 1e-12);
        assert!(objective.evaluate(array![1.0].view()).is_err());
    }
}
