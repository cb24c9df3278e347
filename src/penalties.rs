use ndarray::{Array1, ArrayView1};
use crate::error::{CoxError, Result};

/// separable penalty on the coefficients
pub trait Penalty: std::fmt::Debug {
    fn value(&self, w: ArrayView1<f64>) -> f64;

    /// prox of `stepsize * penalty` for coordinate `j`, evaluated at `value`
    fn prox_1d(&self, value: f64, stepsize: f64, j: usize) -> f64;

    /// per-feature distance of `-grad` to the subdifferential at `w`
    fn subdiff_distance(&self, w: ArrayView1<f64>, grad: ArrayView1<f64>) -> Array1<f64>;

    fn is_smooth(&self) -> bool;

    /// gradient, or `None` when the penalty isn't differentiable
    fn gradient(&self, w: ArrayView1<f64>) -> Option<Array1<f64>>;
}

/// soft thresholding operator for L1 regularization
pub fn soft_threshold(x: f64, lambda: f64) -> f64 {
    if x > lambda {
        x - lambda
    } else if x < -lambda {
        x + lambda
    } else {
        0.0
    }
}

fn check_alpha(alpha: f64) -> Result<()> {
    if !(alpha >= 0.0 && alpha.is_finite()) {
        return Err(CoxError::invalid_parameter("alpha", alpha));
    }
    Ok(())
}

/// elastic net: `alpha * (l1_ratio * |w|_1 + 0.5 * (1 - l1_ratio) * |w|^2)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct L1PlusL2 {
    alpha: f64,
    l1_ratio: f64,
}

impl L1PlusL2 {
    pub fn new(alpha: f64, l1_ratio: f64) -> Result<Self> {
        check_alpha(alpha)?;
        if !(0.0..=1.0).contains(&l1_ratio) {
            return Err(CoxError::invalid_parameter("l1_ratio", l1_ratio));
        }
        Ok(Self { alpha, l1_ratio })
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn l1_ratio(&self) -> f64 {
        self.l1_ratio
    }

    /// weight on |w|_1
    pub fn l1_weight(&self) -> f64 {
        self.alpha * self.l1_ratio
    }

    /// weight on 0.5 |w|^2
    pub fn l2_weight(&self) -> f64 {
        self.alpha * (1.0 - self.l1_ratio)
    }
}

impl Penalty for L1PlusL2 {
    fn value(&self, w: ArrayView1<f64>) -> f64 {
        let l1: f64 = w.iter().map(|x| x.abs()).sum();
        self.l1_weight() * l1 + 0.5 * self.l2_weight() * w.dot(&w)
    }

    fn prox_1d(&self, value: f64, stepsize: f64, _j: usize) -> f64 {
        soft_threshold(value, stepsize * self.l1_weight()) / (1.0 + stepsize * self.l2_weight())
    }

    fn subdiff_distance(&self, w: ArrayView1<f64>, grad: ArrayView1<f64>) -> Array1<f64> {
        let (l1, l2) = (self.l1_weight(), self.l2_weight());
        w.iter()
            .zip(grad.iter())
            .map(|(&w_j, &g_j)| {
                if w_j == 0.0 {
                    (g_j.abs() - l1).max(0.0)
                } else {
                    (g_j + l1 * w_j.signum() + l2 * w_j).abs()
                }
            })
            .collect()
    }

    fn is_smooth(&self) -> bool {
        self.l1_weight() == 0.0
    }

    fn gradient(&self, w: ArrayView1<f64>) -> Option<Array1<f64>> {
        self.is_smooth().then(|| w.mapv(|x| self.l2_weight() * x))
    }
}

/// ridge: `0.5 * alpha * |w|^2`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct L2 {
    alpha: f64,
}

impl L2 {
    pub fn new(alpha: f64) -> Result<Self> {
        check_alpha(alpha)?;
        Ok(Self { alpha })
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }
}

impl Penalty for L2 {
    fn value(&self, w: ArrayView1<f64>) -> f64 {
        0.5 * self.alpha * w.dot(&w)
    }

    fn prox_1d(&self, value: f64, stepsize: f64, _j: usize) -> f64 {
        value / (1.0 + stepsize * self.alpha)
    }

    fn subdiff_distance(&self, w: ArrayView1<f64>, grad: ArrayView1<f64>) -> Array1<f64> {
        w.iter()
            .zip(grad.iter())
            .map(|(&w_j, &g_j)| (g_j + self.alpha * w_j).abs())
            .collect()
    }

    fn is_smooth(&self) -> bool {
        true
    }

    fn gradient(&self, w: ArrayView1<f64>) -> Option<Array1<f64>> {
        Some(w.mapv(|x| self.alpha * x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_soft_threshold() {
        assert_relative_eq!(soft_threshold(2.0, 1.0), 1.0, epsilon = 1e-10);
        assert_relative_eq!(soft_threshold(-2.0, 1.0), -1.0, epsilon = 1e-10);
        assert_relative_eq!(soft_threshold(0.5, 1.0), 0.0, epsilon = 1e-10);
    }

    #[test]
    fn test_elastic_net_weights() {
        let penalty = L1PlusL2::new(2.0, 0.25).unwrap();
        assert_relative_eq!(penalty.l1_weight(), 0.5, epsilon = 1e-12);
        assert_relative_eq!(penalty.l2_weight(), 1.5, epsilon = 1e-12);

        let w = array![1.0, -2.0];
        // 0.5 * 3 + 0.5 * 1.5 * 5
        assert_relative_eq!(penalty.value(w.view()), 1.5 + 3.75, epsilon = 1e-12);
    }

    #[test]
    fn test_elastic_net_prox() {
        let penalty = L1PlusL2::new(1.0, 0.5).unwrap();
        // soft threshold at 0.5, then shrink by 1 / (1 + 0.5)
        assert_relative_eq!(penalty.prox_1d(2.0, 1.0, 0), 1.0, epsilon = 1e-12);
        assert_eq!(penalty.prox_1d(0.3, 1.0, 0), 0.0);
    }

    #[test]
    fn test_elastic_net_smoothness() {
        assert!(!L1PlusL2::new(1.0, 0.5).unwrap().is_smooth());
        assert!(L1PlusL2::new(1.0, 0.0).unwrap().is_smooth());
        assert!(L1PlusL2::new(1.0, 0.5).unwrap().gradient(array![1.0].view()).is_none());
    }

    #[test]
    fn test_subdiff_distance_at_zero() {
        let penalty = L1PlusL2::new(1.0, 1.0).unwrap();
        let w = array![0.0, 0.0];
        let grad = array![0.5, -3.0];
        let dist = penalty.subdiff_distance(w.view(), grad.view());
        assert_eq!(dist[0], 0.0); // inside [-1, 1]
        assert_relative_eq!(dist[1], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_l2_penalty() {
        let penalty = L2::new(0.5).unwrap();
        let w = array![2.0, -2.0];
        assert_relative_eq!(penalty.value(w.view()), 2.0, epsilon = 1e-12);
        assert_relative_eq!(penalty.prox_1d(3.0, 2.0, 0), 1.5, epsilon = 1e-12);
        assert_eq!(penalty.gradient(w.view()).unwrap(), array![1.0, -1.0]);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(L1PlusL2::new(-0.1, 0.5).is_err());
        assert!(L1PlusL2::new(0.1, 1.5).is_err());
        assert!(L2::new(f64::NAN).is_err());
    }
}
