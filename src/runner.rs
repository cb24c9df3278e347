//! drives adapters through an iteration sweep, the way a benchmark harness would

use std::fmt::Write as _;
use std::time::{Duration, Instant};

use crate::{
    adapter::SolverAdapter,
    benchmark::{BenchmarkSolver, SkipDecision},
    config::BenchmarkConfig,
    error::Result,
    objective::{CoxObjective, CoxProblem},
};

/// one timed `run(n_iter)` and what it produced
#[derive(Debug, Clone, PartialEq)]
pub struct SweepPoint {
    pub n_iter: usize,
    pub elapsed: Duration,
    /// reference elastic-net objective at the returned coefficients
    pub objective: f64,
    pub n_coefs: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SolverReport {
    Skipped { reason: String },
    Completed { points: Vec<SweepPoint> },
}

impl SolverReport {
    pub fn points(&self) -> &[SweepPoint] {
        match self {
            Self::Skipped { .. } => &[],
            Self::Completed { points } => points,
        }
    }

    /// objective reached with the largest budget
    pub fn final_objective(&self) -> Option<f64> {
        self.points().last().map(|p| p.objective)
    }
}

#[derive(Debug, Clone)]
pub struct BenchmarkRunner {
    config: BenchmarkConfig,
    problem: CoxProblem,
}

impl BenchmarkRunner {
    /// validates the config and simulates the dataset once
    pub fn new(config: BenchmarkConfig) -> Result<Self> {
        config.validate()?;
        let data = config.dataset.generate()?;
        let objective = &config.objective;
        let problem =
            CoxProblem::from_data(data, objective.alpha, objective.l1_ratio, objective.use_efron)?;
        Ok(Self { config, problem })
    }

    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    pub fn problem(&self) -> &CoxProblem {
        &self.problem
    }

    /// one report per configured solver name, in config order
    pub fn run(&self) -> Result<Vec<(String, SolverReport)>> {
        let problem = &self.problem;
        let reference = CoxObjective::new(problem)?;
        log::info!(
            "benchmark problem: {} samples, {} features, alpha = {}, l1_ratio = {}",
            problem.n_samples(), problem.n_features(),
            problem.alpha(), problem.l1_ratio()
        );

        let mut reports = Vec::with_capacity(self.config.solver.names.len());
        for name in &self.config.solver.names {
            let mut adapter = SolverAdapter::new(name);
            let report = self.sweep(&mut adapter, problem, &reference)?;
            reports.push((name.clone(), report));
        }
        Ok(reports)
    }

    fn sweep(
        &self,
        adapter: &mut SolverAdapter,
        problem: &CoxProblem,
        reference: &CoxObjective,
    ) -> Result<SolverReport> {
        let name = adapter.solver_choice().to_string();
        if let SkipDecision::Skip { reason } = adapter.skip(problem) {
            log::info!("skipping {}: {}", name, reason);
            return Ok(SolverReport::Skipped { reason });
        }

        adapter.set_objective(problem)?;
        if self.config.run.warm_up {
            adapter.warm_up()?;
        }

        let mut points = Vec::with_capacity(self.config.run.n_iters.len());
        for &n_iter in &self.config.run.n_iters {
            let start = Instant::now();
            adapter.run(n_iter)?;
            let elapsed = start.elapsed();

            let result = adapter.get_result()?;
            let objective = reference.evaluate(result.w.view())?;
            log::debug!("{} n_iter = {}: objective {:.6} in {:?}", name, n_iter, objective, elapsed);
            points.push(SweepPoint {
                n_iter,
                elapsed,
                objective,
                n_coefs: result.w.len(),
            });
        }

        log::info!("{} finished {} sweep points", name, points.len());
        Ok(SolverReport::Completed { points })
    }
}

/// plain-text table of a sweep
pub fn format_report(reports: &[(String, SolverReport)]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<14} {:>8} {:>12} {:>16}", "solver", "n_iter", "time (ms)", "objective");
    for (name, report) in reports {
        match report {
            SolverReport::Skipped { reason } => {
                let _ = writeln!(out, "{:<14} skipped: {}", name, reason);
            }
            SolverReport::Completed { points } => {
                for p in points {
                    let _ = writeln!(
                        out,
                        "{:<14} {:>8} {:>12.3} {:>16.8}",
                        name, p.n_iter, p.elapsed.as_secs_f64() * 1e3, p.objective
                    );
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoxError;

    fn small_config(l1_ratio: f64) -> BenchmarkConfig {
        let mut config = BenchmarkConfig::default();
        config.dataset.n_samples = 40;
        config.dataset.n_features = 4;
        config.objective.alpha = 0.05;
        config.objective.l1_ratio = l1_ratio;
        config.run.n_iters = vec![1, 5, 20];
        config
    }

    #[test]
    fn test_runs_both_solvers_on_ridge() {
        let reports = BenchmarkRunner::new(small_config(0.0)).unwrap().run().unwrap();
        assert_eq!(reports.len(), 2);
        for (name, report) in &reports {
            let points = report.points();
            assert_eq!(points.len(), 3, "{}", name);
            assert!(points.iter().all(|p| p.n_coefs == 4 && p.objective.is_finite()));
        }
    }

    #[test]
    fn test_lbfgs_skipped_with_l1() {
        let reports = BenchmarkRunner::new(small_config(0.5)).unwrap().run().unwrap();
        let (_, lbfgs) = reports.iter().find(|(n, _)| n == "L-BFGS").unwrap();
        assert_eq!(
            lbfgs,
            &SolverReport::Skipped { reason: "coxnet:L-BFGS handles only L2 Cox regularization.".into() }
        );
        assert!(lbfgs.final_objective().is_none());
    }

    #[test]
    fn test_larger_budget_does_not_hurt() {
        let mut config = small_config(0.0);
        config.solver.names = vec!["Prox-Newton".into()];
        let reports = BenchmarkRunner::new(config).unwrap().run().unwrap();
        let points = reports[0].1.points();
        let last = points.last().unwrap().objective;
        assert!(last <= points[0].objective + 1e-10);
    }

    #[test]
    fn test_unsupported_solver_fails_run() {
        let mut config = small_config(0.0);
        config.solver.names = vec!["Foo".into()];
        let err = BenchmarkRunner::new(config).unwrap().run().unwrap_err();
        assert!(matches!(err, CoxError::UnsupportedSolver { .. }));
    }

    #[test]
    fn test_format_report() {
        let reports = vec![
            ("L-BFGS".to_string(), SolverReport::Skipped { reason: "nope".into() }),
            ("Prox-Newton".to_string(), SolverReport::Completed {
                points: vec![SweepPoint {
                    n_iter: 4,
                    elapsed: Duration::from_millis(2),
                    objective: 0.5,
                    n_coefs: 3,
                }],
            }),
        ];
        let table = format_report(&reports);
        assert!(table.lines().next().unwrap().starts_with("solver"));
        assert!(table.contains("skipped: nope"));
        assert!(table.contains("0.50000000"));
        assert_eq!(table.lines().count(), 3);
    }
}
