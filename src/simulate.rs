use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use crate::{
    data::SurvivalData,
    error::{CoxError, Result},
};

/// effects of the first few features; the rest are noise
const TRUE_COEFFICIENTS: [f64; 3] = [0.5, -0.3, 0.2];
const BASELINE_HAZARD: f64 = 0.1;

/// knobs for synthetic survival data
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    pub n_samples: usize,
    pub n_features: usize,
    pub seed: u64,
    pub censoring: f64,      // censoring times ~ U(1, censoring)
    pub tie_resolution: f64, // round times up to multiples of this (0 = no rounding)
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            n_samples: 200,
            n_features: 10,
            seed: 42,
            censoring: 10.0,
            tie_resolution: 0.0,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.n_samples == 0 {
            return Err(CoxError::invalid_parameter("n_samples", self.n_samples));
        }
        if !(self.censoring > 1.0 && self.censoring.is_finite()) {
            return Err(CoxError::invalid_parameter("censoring", self.censoring));
        }
        if !(self.tie_resolution >= 0.0 && self.tie_resolution.is_finite()) {
            return Err(CoxError::invalid_parameter("tie_resolution", self.tie_resolution));
        }
        Ok(())
    }

    /// draw the dataset - same seed, same data
    pub fn generate(&self) -> Result<SurvivalData> {
        self.validate()?;
        let mut rng = StdRng::seed_from_u64(self.seed);
        let (n_samples, n_features) = (self.n_samples, self.n_features);

        let covariates = Array2::from_shape_fn((n_samples, n_features), |_| rng.gen_range(-2.0..2.0));

        let n_coef = n_features.min(TRUE_COEFFICIENTS.len());
        let true_coefficients = Array1::from(TRUE_COEFFICIENTS[..n_coef].to_vec());

        let mut times = Vec::with_capacity(n_samples);
        let mut events = Vec::with_capacity(n_samples);

        for i in 0..n_samples {
            let linear_pred = covariates
                .row(i)
                .slice(ndarray::s![0..n_coef])
                .dot(&true_coefficients);
            let hazard = linear_pred.exp();
            let u: f64 = rng.gen_range(f64::EPSILON..1.0);
            let time = (-u.ln() / (BASELINE_HAZARD * hazard)).max(0.1);
            let censoring_time = rng.gen_range(1.0..self.censoring);

            let (t, event) = if time < censoring_time {
                (time, true)
            } else {
                (censoring_time, false)
            };
            times.push(self.round_time(t));
            events.push(event);
        }

        SurvivalData::new(times, events, covariates)
    }

    fn round_time(&self, t: f64) -> f64 {
        if self.tie_resolution > 0.0 {
            (t / self.tie_resolution).ceil() * self.tie_resolution
        } else {
            t
        }
    }
}

/// shorthand for the default simulation w/ the given shape and seed
pub fn make_survival_data(n_samples: usize, n_features: usize, seed: u64) -> Result<SurvivalData> {
    SimulationConfig {
        n_samples,
        n_features,
        seed,
        ..Default::default()
    }
    .generate()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_and_determinism() {
        let a = make_survival_data(50, 4, 7).unwrap();
        let b = make_survival_data(50, 4, 7).unwrap();
        assert_eq!(a.n_samples(), 50);
        assert_eq!(a.n_features(), 4);
        assert_eq!(a.covariates(), b.covariates());
        assert_eq!(a.target(), b.target());
    }

    #[test]
    fn test_some_events_and_some_censoring() {
        let data = make_survival_data(300, 3, 1).unwrap();
        let n_events = data.target().n_events();
        assert!(n_events > 0);
        assert!(n_events < 300);
    }

    #[test]
    fn test_tie_resolution_creates_ties() {
        let config = SimulationConfig {
            n_samples: 200,
            n_features: 2,
            tie_resolution: 1.0,
            ..Default::default()
        };
        let data = config.generate().unwrap();
        let mut times: Vec<f64> = data.target().times().to_vec();
        times.sort_by(f64::total_cmp);
        times.dedup();
        assert!(times.len() < 200);
        assert!(times.iter().all(|t| t.fract() == 0.0));
    }

    #[test]
    fn test_invalid_config() {
        let config = SimulationConfig { n_samples: 0, ..Default::default() };
        assert!(config.generate().is_err());
        let config = SimulationConfig { censoring: 0.5, ..Default::default() };
        assert!(config.generate().is_err());
    }
}
