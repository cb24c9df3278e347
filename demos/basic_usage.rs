use coxnet_bench::{
    BenchmarkConfig, BenchmarkRunner, BenchmarkSolver, CoxObjective, SolverAdapter,
    runner::format_report,
};

const CONFIG: &str = r#"
[dataset]
n_samples = 300
n_features = 10
seed = 7
tie_resolution = 0.25

[objective]
alpha = 0.02
l1_ratio = 0.0
use_efron = true

[solver]
names = ["Prox-Newton", "L-BFGS", "Foo"]

[run]
n_iters = [1, 2, 4, 8, 16, 32]
"#;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    println!("Cox Elastic Net Solvers - Benchmark Sweep Example");
    println!("=================================================\n");

    // pass a path to read the config from disk instead
    let config = match std::env::args().nth(1) {
        Some(path) => BenchmarkConfig::from_file(path)?,
        None => BenchmarkConfig::from_toml_str(CONFIG)?,
    };

    // "Foo" is not a solver we have; run the supported ones and show the error for it
    let (supported, unsupported): (Vec<String>, Vec<String>) = config
        .solver
        .names
        .iter()
        .cloned()
        .partition(|name| name == "Prox-Newton" || name == "L-BFGS");

    let mut config = config;
    config.solver.names = supported;
    let runner = BenchmarkRunner::new(config)?;
    let problem = runner.problem();

    for name in &unsupported {
        let mut adapter = SolverAdapter::new(name);
        if let Err(err) = adapter.set_objective(problem) {
            println!("{}: {}\n", name, err);
        }
    }

    let reports = runner.run()?;
    println!("{}", format_report(&reports));

    // score a single adapter by hand
    let objective = CoxObjective::new(problem)?;
    let mut adapter = SolverAdapter::new("Prox-Newton");
    adapter.set_objective(problem)?;
    adapter.run(100)?;
    let w = adapter.get_result()?.w;

    println!("Prox-Newton after 100 iterations:");
    println!("  objective: {:.8}", objective.evaluate(w.view())?);
    println!("  first coefficients: {:.4}", w.slice(ndarray::s![..3]));
    println!("  (simulated effects are 0.5, -0.3, 0.2)");

    Ok(())
}
