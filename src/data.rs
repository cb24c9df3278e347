use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use crate::error::{CoxError, Result};

/// survival response - event/censoring time + event indicator per sample
#[derive(Debug, Clone, PartialEq)]
pub struct SurvivalTarget {
    times: Array1<f64>,   // time to event/censoring
    events: Array1<bool>, // true = event, false = censored
}

impl SurvivalTarget {
    pub fn new(times: Vec<f64>, events: Vec<bool>) -> Result<Self> {
        if events.len() != times.len() {
            return Err(CoxError::invalid_dimensions(
                format!("times len ({}) != events len ({})", times.len(), events.len())
            ));
        }

        if times.iter().any(|&t| t <= 0.0 || !t.is_finite()) {
            return Err(CoxError::invalid_survival_data(
                "survival times must be positive & finite"
            ));
        }

        Ok(Self {
            times: Array1::from(times),
            events: Array1::from(events),
        })
    }

    pub fn n_samples(&self) -> usize {
        self.times.len()
    }

    pub fn times(&self) -> ArrayView1<'_, f64> {
        self.times.view()
    }

    pub fn events(&self) -> ArrayView1<'_, bool> {
        self.events.view()
    }

    /// how many samples actually had the event
    pub fn n_events(&self) -> usize {
        self.events.iter().filter(|&&e| e).count()
    }
}

/// survival data - design matrix plus the target it goes with
#[derive(Debug, Clone)]
pub struct SurvivalData {
    covariates: Array2<f64>, // n_samples x n_features
    target: SurvivalTarget,
}

impl SurvivalData {
    pub fn new(
        times: Vec<f64>,         // survival/censoring times
        events: Vec<bool>,       // true = event occurred, false = censored
        covariates: Array2<f64>, // feature matrix
    ) -> Result<Self> {
        let target = SurvivalTarget::new(times, events)?;
        Self::from_parts(covariates, target)
    }

    pub fn from_parts(covariates: Array2<f64>, target: SurvivalTarget) -> Result<Self> {
        if covariates.nrows() != target.n_samples() {
            return Err(CoxError::invalid_dimensions(
                format!("covariates rows ({}) != n_samples ({})", covariates.nrows(), target.n_samples())
            ));
        }
        Ok(Self { covariates, target })
    }

    pub fn n_samples(&self) -> usize {
        self.target.n_samples()
    }

    pub fn n_features(&self) -> usize {
        self.covariates.ncols()
    }

    pub fn covariates(&self) -> ArrayView2<'_, f64> {
        self.covariates.view()
    }

    pub fn target(&self) -> &SurvivalTarget {
        &self.target
    }

    /// split back into (X, y)
    pub fn into_parts(self) -> (Array2<f64>, SurvivalTarget) {
        (self.covariates, self.target)
    }

    /// standardize features (mean=0, std=1) - modifies in place
    pub fn standardize_covariates(&mut self) -> Result<(Array1<f64>, Array1<f64>)> {
        let means = self.covariates.mean_axis(Axis(0)).ok_or_else(|| {
            CoxError::invalid_dimensions("can't standardize an empty design matrix")
        })?;
        let stds = self.covariates.std_axis(Axis(0), 0.0);

        if let Some(j) = stds.iter().position(|&s| s == 0.0) {
            return Err(CoxError::numerical_error(
                format!("feature {} has zero variance - can't standardize", j)
            ));
        }

        for (mut col, (&mean, &std)) in self.covariates
            .axis_iter_mut(Axis(1))
            .zip(means.iter().zip(stds.iter()))
        {
            col.mapv_inplace(|x| (x - mean) / std);
        }

        Ok((means, stds))
    }
}
