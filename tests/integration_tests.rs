use coxnet_bench::{
    BenchmarkConfig, BenchmarkRunner, BenchmarkSolver, CoxError, CoxObjective, CoxProblem,
    SkipDecision, SolverAdapter, SolverReport,
    diagnostics,
    simulate::{make_survival_data, SimulationConfig},
};
use approx::assert_relative_eq;

fn create_problem(alpha: f64, l1_ratio: f64, n_features: usize, seed: u64) -> CoxProblem {
    let data = make_survival_data(80, n_features, seed).unwrap();
    CoxProblem::from_data(data, alpha, l1_ratio, true).unwrap()
}

#[test]
fn test_prox_newton_skips_unpenalized_problem() {
    let adapter = SolverAdapter::new("Prox-Newton");

    let decision = adapter.skip(&create_problem(0.0, 0.0, 5, 1));
    assert_eq!(
        decision,
        SkipDecision::skip("coxnet:Prox-Newton does not handle unpenalized Cox estimation.")
    );
    assert!(!adapter.skip(&create_problem(0.1, 0.0, 5, 1)).should_skip());
    assert!(!adapter.skip(&create_problem(0.1, 1.0, 5, 1)).should_skip());
}

#[test]
fn test_lbfgs_skips_anything_but_ridge() {
    let adapter = SolverAdapter::new("L-BFGS");

    for l1_ratio in [0.1, 0.5, 1.0] {
        let decision = adapter.skip(&create_problem(0.1, l1_ratio, 5, 1));
        assert_eq!(decision.reason(), Some("coxnet:L-BFGS handles only L2 Cox regularization."));
    }
    // unpenalized is fine for L-BFGS
    assert!(!adapter.skip(&create_problem(0.0, 0.0, 5, 1)).should_skip());
}

#[test]
fn test_unsupported_solver_name() {
    let mut adapter = SolverAdapter::new("Foo");
    let problem = create_problem(0.1, 0.0, 5, 2);

    // nothing to say about compatibility, the name fails later
    assert!(!adapter.skip(&problem).should_skip());

    let err = adapter.set_objective(&problem).unwrap_err();
    assert!(matches!(err, CoxError::UnsupportedSolver { .. }));
    let msg = err.to_string();
    assert!(msg.contains("Foo"));
    assert!(msg.contains("coxnet"));

    assert_eq!(adapter.run(1), Err(CoxError::ObjectiveNotSet));
}

#[test]
fn test_result_has_one_coefficient_per_feature() {
    for (solver, l1_ratio) in [("Prox-Newton", 0.5), ("L-BFGS", 0.0)] {
        let mut adapter = SolverAdapter::new(solver);
        adapter.set_objective(&create_problem(0.05, l1_ratio, 7, 3)).unwrap();

        for n_iter in [1, 3, 50] {
            adapter.run(n_iter).unwrap();
            let w = adapter.get_result().unwrap().w;
            assert_eq!(w.len(), 7, "{} with n_iter = {}", solver, n_iter);
            assert!(w.iter().all(|v| v.is_finite()));
        }
    }
}

#[test]
fn test_objective_decreases_with_budget() {
    let problem = create_problem(0.05, 0.5, 6, 4);
    let objective = CoxObjective::new(&problem).unwrap();
    let zero = objective.evaluate(objective.zero_solution().view()).unwrap();

    let mut adapter = SolverAdapter::new("Prox-Newton");
    adapter.set_objective(&problem).unwrap();

    adapter.run(1).unwrap();
    let short = objective.evaluate(adapter.get_result().unwrap().w.view()).unwrap();
    adapter.run(30).unwrap();
    let long = objective.evaluate(adapter.get_result().unwrap().w.view()).unwrap();

    assert!(short <= zero);
    assert!(long <= short + 1e-10);
}

#[test]
fn test_warm_up_matches_short_run() {
    let problem = create_problem(0.05, 0.0, 5, 5);

    let mut warmed = SolverAdapter::new("L-BFGS");
    warmed.set_objective(&problem).unwrap();
    warmed.warm_up().unwrap();

    let mut direct = SolverAdapter::new("L-BFGS");
    direct.set_objective(&problem).unwrap();
    direct.run(4).unwrap();

    assert_eq!(warmed.get_result().unwrap(), direct.get_result().unwrap());
}

#[test]
fn test_runs_are_independent_of_history() {
    let problem = create_problem(0.05, 0.5, 5, 6);

    let mut adapter = SolverAdapter::new("Prox-Newton");
    adapter.set_objective(&problem).unwrap();
    adapter.run(20).unwrap();
    adapter.run(2).unwrap();
    let after_history = adapter.get_result().unwrap();

    let mut fresh = SolverAdapter::new("Prox-Newton");
    fresh.set_objective(&problem).unwrap();
    fresh.run(2).unwrap();

    assert_eq!(after_history, fresh.get_result().unwrap());
}

#[test]
fn test_set_objective_replaces_previous_problem() {
    let mut adapter = SolverAdapter::new("L-BFGS");
    adapter.set_objective(&create_problem(0.05, 0.0, 8, 7)).unwrap();
    adapter.run(5).unwrap();
    assert_eq!(adapter.get_result().unwrap().w.len(), 8);

    adapter.set_objective(&create_problem(0.05, 0.0, 3, 8)).unwrap();
    // the old result is gone with the old problem
    assert_eq!(adapter.get_result(), Err(CoxError::ResultNotAvailable));

    adapter.run(5).unwrap();
    assert_eq!(adapter.get_result().unwrap().w.len(), 3);
}

#[test]
fn test_solvers_agree_on_ridge() {
    let problem = create_problem(0.1, 0.0, 4, 9);
    let objective = CoxObjective::new(&problem).unwrap();

    let mut values = Vec::new();
    for solver in ["Prox-Newton", "L-BFGS"] {
        let mut adapter = SolverAdapter::new(solver);
        adapter.set_objective(&problem).unwrap();
        adapter.run(200).unwrap();
        values.push(objective.evaluate(adapter.get_result().unwrap().w.view()).unwrap());
    }
    assert_relative_eq!(values[0], values[1], epsilon = 1e-6);
}

#[test]
fn test_adapter_does_not_emit_warnings() {
    let problem = create_problem(0.05, 0.0, 5, 10);
    let before = diagnostics::suppressed_count();

    let mut adapter = SolverAdapter::new("L-BFGS");
    adapter.set_objective(&problem).unwrap();
    // one iteration can't converge at tol 1e-9, so the solver complains
    adapter.run(1).unwrap();

    assert!(diagnostics::suppressed_count() > before);
    assert!(!diagnostics::is_quiet());
}

#[test]
fn test_tied_times_with_both_tie_methods() {
    let data = SimulationConfig {
        n_samples: 60,
        n_features: 4,
        seed: 11,
        tie_resolution: 1.0,
        ..Default::default()
    }
    .generate()
    .unwrap();

    for use_efron in [true, false] {
        let problem = CoxProblem::from_data(data.clone(), 0.05, 0.0, use_efron).unwrap();
        let mut adapter = SolverAdapter::new("Prox-Newton");
        adapter.set_objective(&problem).unwrap();
        adapter.run(10).unwrap();
        assert!(adapter.get_result().unwrap().w.iter().all(|v| v.is_finite()));
    }
}

#[test]
fn test_runner_end_to_end() {
    let config = BenchmarkConfig::from_toml_str(r#"
        [dataset]
        n_samples = 60
        n_features = 5
        seed = 3

        [objective]
        alpha = 0.05
        l1_ratio = 0.5

        [run]
        n_iters = [1, 4, 16]
    "#).unwrap();

    let reports = BenchmarkRunner::new(config).unwrap().run().unwrap();
    let names: Vec<&str> = reports.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["Prox-Newton", "L-BFGS"]);

    match &reports[0].1 {
        SolverReport::Completed { points } => {
            assert_eq!(points.iter().map(|p| p.n_iter).collect::<Vec<_>>(), vec![1, 4, 16]);
            assert!(points.iter().all(|p| p.n_coefs == 5));
        }
        other => panic!("Prox-Newton should run, got {:?}", other),
    }
    assert!(matches!(reports[1].1, SolverReport::Skipped { .. }));
}
