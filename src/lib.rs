//! # coxnet bench
//!
//! cox elastic net solvers wired up for iteration-sweep benchmarking
//!
//! ## what you get
//!
//! - cox partial likelihood w/ breslow or efron ties
//! - prox newton for the full elastic net, l-bfgs for ridge
//! - a solver adapter speaking the benchmark harness protocol
//! - a toml-driven runner that times the sweep for you
//!
//! ## quick start
//!
//! ```rust
//! use coxnet_bench::{BenchmarkSolver, CoxProblem, SolverAdapter, simulate::make_survival_data};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let data = make_survival_data(50, 4, 0)?;
//! let problem = CoxProblem::from_data(data, 0.1, 0.5, true)?;
//!
//! let mut adapter = SolverAdapter::new("Prox-Newton");
//! assert!(!adapter.skip(&problem).should_skip());
//!
//! adapter.set_objective(&problem)?;
//! adapter.warm_up()?;
//! adapter.run(10)?;
//!
//! let result = adapter.get_result()?;
//! assert_eq!(result.w.len(), 4);
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod benchmark;
pub mod config;
pub mod data;
pub mod datafits;
pub mod diagnostics;
pub mod error;
pub mod objective;
pub mod penalties;
pub mod runner;
pub mod simulate;
pub mod solvers;

pub use adapter::{SolverAdapter, SolverChoice};
pub use benchmark::{BenchmarkSolver, SkipDecision, SolverResult};
pub use config::BenchmarkConfig;
pub use data::{SurvivalData, SurvivalTarget};
pub use error::{CoxError, Result};
pub use objective::{CoxObjective, CoxProblem};
pub use runner::{BenchmarkRunner, SolverReport};
