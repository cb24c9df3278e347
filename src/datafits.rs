//! datafit terms - the smooth part of the objective, as a function of Xw
//!
//! solvers only ever talk to a datafit through the linear predictor `Xw`: the
//! value, the gradient w.r.t. `Xw` and the diagonal of the hessian w.r.t. `Xw`.
//! the chain rule through `X` is the solver's job.

use ndarray::{Array1, ArrayView1, ArrayView2};
use crate::{
    data::SurvivalTarget,
    error::{CoxError, Result},
};

pub trait Datafit: std::fmt::Debug {
    /// precompute whatever depends only on (X, y). call once before solving.
    fn initialize(&mut self, x: ArrayView2<f64>, y: &SurvivalTarget) -> Result<()>;

    fn value(&self, y: &SurvivalTarget, xw: ArrayView1<f64>) -> Result<f64>;

    /// gradient w.r.t. the linear predictor
    fn raw_grad(&self, y: &SurvivalTarget, xw: ArrayView1<f64>) -> Result<Array1<f64>>;

    /// diagonal of the hessian w.r.t. the linear predictor
    fn raw_hessian(&self, y: &SurvivalTarget, xw: ArrayView1<f64>) -> Result<Array1<f64>>;

    fn raw_grad_and_hessian(
        &self,
        y: &SurvivalTarget,
        xw: ArrayView1<f64>,
    ) -> Result<(Array1<f64>, Array1<f64>)> {
        Ok((self.raw_grad(y, xw)?, self.raw_hessian(y, xw)?))
    }

    /// full gradient w.r.t. w: `X^T raw_grad`
    fn gradient(
        &self,
        x: ArrayView2<f64>,
        y: &SurvivalTarget,
        xw: ArrayView1<f64>,
    ) -> Result<Array1<f64>> {
        Ok(x.t().dot(&self.raw_grad(y, xw)?))
    }
}

/// events sharing one event time
#[derive(Debug, Clone)]
struct TieBlock {
    members: Vec<usize>, // sample indices w/ an event at this time
    risk_start: usize,   // first position in the sorted order still at risk
}

/// risk sets & tie blocks for one target, built by `Cox::initialize`
#[derive(Debug, Clone)]
struct RiskStructure {
    order: Vec<usize>,             // samples sorted by time, ascending
    blocks: Vec<TieBlock>,         // one per distinct event time, ascending
    blocks_at_risk: Vec<usize>,    // per sample: # of blocks whose risk set contains it
    block_of: Vec<Option<usize>>,  // per sample: its block if it's an event
}

impl RiskStructure {
    fn build(y: &SurvivalTarget) -> Self {
        let n = y.n_samples();
        let times = y.times();
        let events = y.events();

        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| times[a].total_cmp(&times[b]));

        let mut blocks = Vec::new();
        let mut blocks_at_risk = vec![0; n];
        let mut block_of = vec![None; n];

        let mut start = 0;
        while start < n {
            let t = times[order[start]];
            let mut end = start;
            while end < n && times[order[end]] == t {
                end += 1;
            }

            let members: Vec<usize> = order[start..end]
                .iter()
                .copied()
                .filter(|&i| events[i])
                .collect();

            if !members.is_empty() {
                for &i in &members {
                    block_of[i] = Some(blocks.len());
                }
                blocks.push(TieBlock { members, risk_start: start });
            }

            // everyone at this time is at risk for every event time <= t
            for &i in &order[start..end] {
                blocks_at_risk[i] = blocks.len();
            }
            start = end;
        }

        Self { order, blocks, blocks_at_risk, block_of }
    }

    fn n_samples(&self) -> usize {
        self.order.len()
    }
}

/// per-block sums over the tie-correction terms u_l = S - c_l T
#[derive(Debug, Clone, Copy, Default)]
struct BlockTerms {
    log_sum: f64, // sum log u
    a: f64,       // sum 1/u
    b: f64,       // sum 1/u^2
    c: f64,       // sum c/u
    e: f64,       // sum c/u^2
    f: f64,       // sum c^2/u^2
}

/// negative cox partial log-likelihood, averaged over samples
///
/// ties between event times are handled with Efron's correction when
/// `use_efron` is set and Breslow's otherwise.
#[derive(Debug, Clone, Default)]
pub struct Cox {
    use_efron: bool,
    structure: Option<RiskStructure>,
}

impl Cox {
    pub fn new(use_efron: bool) -> Self {
        Self { use_efron, structure: None }
    }

    pub fn use_efron(&self) -> bool {
        self.use_efron
    }

    pub fn is_initialized(&self) -> bool {
        self.structure.is_some()
    }

    fn checked_structure(&self, y: &SurvivalTarget, xw: ArrayView1<f64>) -> Result<&RiskStructure> {
        let structure = self.structure.as_ref().ok_or(CoxError::DatafitNotInitialized)?;
        if y.n_samples() != structure.n_samples() {
            return Err(CoxError::invalid_dimensions(format!(
                "target has {} samples, datafit was initialized w/ {}",
                y.n_samples(), structure.n_samples()
            )));
        }
        if xw.len() != structure.n_samples() {
            return Err(CoxError::invalid_dimensions(format!(
                "Xw len ({}) != n_samples ({})", xw.len(), structure.n_samples()
            )));
        }
        Ok(structure)
    }

    /// exp(Xw - max) plus the per-block sums. returns the shift too.
    fn block_terms(
        &self,
        structure: &RiskStructure,
        xw: ArrayView1<f64>,
    ) -> Result<(Array1<f64>, f64, Vec<BlockTerms>)> {
        let n = structure.n_samples();
        let shift = xw.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if n > 0 && !shift.is_finite() {
            return Err(CoxError::numerical_error(
                format!("linear predictor is not finite (max = {})", shift)
            ));
        }
        let shift = if n == 0 { 0.0 } else { shift };
        let exp_xw = xw.mapv(|v| (v - shift).exp());

        // suffix[pos] = sum of exp_xw over order[pos..]
        let mut suffix = vec![0.0; n + 1];
        for pos in (0..n).rev() {
            suffix[pos] = suffix[pos + 1] + exp_xw[structure.order[pos]];
        }

        let mut terms = Vec::with_capacity(structure.blocks.len());
        for block in &structure.blocks {
            let risk_sum = suffix[block.risk_start];
            let tied_sum: f64 = block.members.iter().map(|&i| exp_xw[i]).sum();
            let d = block.members.len() as f64;

            let mut t = BlockTerms::default();
            for l in 0..block.members.len() {
                let c = if self.use_efron { l as f64 / d } else { 0.0 };
                let u = risk_sum - c * tied_sum;
                if !(u > 0.0 && u.is_finite()) {
                    return Err(CoxError::numerical_error(
                        format!("risk set sum is not positive & finite: {}", u)
                    ));
                }
                let inv = 1.0 / u;
                t.log_sum += u.ln();
                t.a += inv;
                t.b += inv * inv;
                t.c += c * inv;
                t.e += c * inv * inv;
                t.f += c * c * inv * inv;
            }
            terms.push(t);
        }

        Ok((exp_xw, shift, terms))
    }

    fn grad_hess_from_terms(
        structure: &RiskStructure,
        exp_xw: &Array1<f64>,
        terms: &[BlockTerms],
        want_hessian: bool,
    ) -> (Array1<f64>, Option<Array1<f64>>) {
        let n = structure.n_samples();
        let mut cum_a = vec![0.0; terms.len() + 1];
        let mut cum_b = vec![0.0; terms.len() + 1];
        for (k, t) in terms.iter().enumerate() {
            cum_a[k + 1] = cum_a[k] + t.a;
            cum_b[k + 1] = cum_b[k] + t.b;
        }

        let scale = 1.0 / n as f64;
        let mut grad = Array1::zeros(n);
        let mut hess = if want_hessian { Some(Array1::zeros(n)) } else { None };

        for j in 0..n {
            let k = structure.blocks_at_risk[j];
            let e_j = exp_xw[j];
            let (first, second, delta) = match structure.block_of[j] {
                Some(b) => {
                    let t = &terms[b];
                    (cum_a[k] - t.c, cum_b[k] - (2.0 * t.e - t.f), 1.0)
                }
                None => (cum_a[k], cum_b[k], 0.0),
            };

            grad[j] = (e_j * first - delta) * scale;
            if let Some(h) = hess.as_mut() {
                h[j] = (e_j * first - e_j * e_j * second) * scale;
            }
        }

        (grad, hess)
    }
}

impl Datafit for Cox {
    fn initialize(&mut self, x: ArrayView2<f64>, y: &SurvivalTarget) -> Result<()> {
        if x.nrows() != y.n_samples() {
            return Err(CoxError::invalid_dimensions(
                format!("X rows ({}) != n_samples ({})", x.nrows(), y.n_samples())
            ));
        }
        let structure = RiskStructure::build(y);
        log::debug!(
            "cox datafit: {} samples, {} distinct event times, efron = {}",
            structure.n_samples(), structure.blocks.len(), self.use_efron
        );
        self.structure = Some(structure);
        Ok(())
    }

    fn value(&self, y: &SurvivalTarget, xw: ArrayView1<f64>) -> Result<f64> {
        let structure = self.checked_structure(y, xw)?;
        let n = structure.n_samples();
        if n == 0 {
            return Ok(0.0);
        }
        let (_, shift, terms) = self.block_terms(structure, xw)?;

        let mut total = 0.0;
        for (block, t) in structure.blocks.iter().zip(terms.iter()) {
            let event_xw: f64 = block.members.iter().map(|&i| xw[i]).sum();
            total += t.log_sum + shift * block.members.len() as f64 - event_xw;
        }
        Ok(total / n as f64)
    }

    fn raw_grad(&self, y: &SurvivalTarget, xw: ArrayView1<f64>) -> Result<Array1<f64>> {
        let structure = self.checked_structure(y, xw)?;
        let (exp_xw, _, terms) = self.block_terms(structure, xw)?;
        Ok(Self::grad_hess_from_terms(structure, &exp_xw, &terms, false).0)
    }

    fn raw_hessian(&self, y: &SurvivalTarget, xw: ArrayView1<f64>) -> Result<Array1<f64>> {
        Ok(self.raw_grad_and_hessian(y, xw)?.1)
    }

    fn raw_grad_and_hessian(
        &self,
        y: &SurvivalTarget,
        xw: ArrayView1<f64>,
    ) -> Result<(Array1<f64>, Array1<f64>)> {
        let structure = self.checked_structure(y, xw)?;
        let n = structure.n_samples();
        let (exp_xw, _, terms) = self.block_terms(structure, xw)?;
        let (grad, hess) = Self::grad_hess_from_terms(structure, &exp_xw, &terms, true);
        Ok((grad, hess.unwrap_or_else(|| Array1::zeros(n))))
    }
}
