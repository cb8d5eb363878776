//! Solving small linear models through the Clarabel backend.
#![cfg(feature = "solver-clarabel")]

mod common;

use common::*;
use wdn_algo::resistance::head_loss;
use wdn_algo::{
    BuildConfig, ClarabelBackend, ErrorKind, Formulation, ModelContext, ProblemClass,
    SolutionStatus, SolveOptions, SolverBackend, VarKey,
};
use wdn_core::ModelInput;

fn build(formulation: Formulation) -> ModelContext {
    ModelContext::build(
        &ModelInput::Single(two_node_pipe()),
        &BuildConfig::new(formulation),
    )
    .unwrap()
}

#[test]
fn relaxed_outer_approximation_delivers_demand() {
    let ctx = build(Formulation::OuterApproximation);
    let backend = ClarabelBackend::new();
    let options = SolveOptions {
        relax_integrality: true,
    };
    assert!(backend.supports(&ctx.model, &options));

    let outcome = ctx.solve(&backend, &options).unwrap();
    assert_eq!(outcome.status, SolutionStatus::Optimal);

    let solution = ctx.solution(&outcome);
    assert!((solution[&VarKey::Flow(link(1))] - 10.0).abs() < 1e-4);
    assert!((solution[&VarKey::Direction(link(1))] - 1.0).abs() < 1e-4);

    // Tangent at the flow bound and the secant pin the head drop exactly.
    let lr = ctx.reference.links[&link(1)].length_resistance(0).unwrap();
    let expected = 100.0 - head_loss(10.0, lr, ctx.reference.alpha);
    assert!((solution[&VarKey::Head(node(2))] - expected).abs() < 1e-3);

    let violations = ctx.model.violations(&outcome.values, 1e-4);
    let real: Vec<_> = violations
        .iter()
        .filter(|v| !v.name.starts_with("integrality"))
        .collect();
    assert!(real.is_empty(), "{:?}", real);
}

#[test]
fn binaries_require_relaxation() {
    let ctx = build(Formulation::OuterApproximation);
    assert_eq!(ctx.model.problem_class(), ProblemClass::MixedIntegerLinear);
    let err = ctx
        .solve(&ClarabelBackend::new(), &SolveOptions::default())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Solver);
}

#[test]
fn nonlinear_models_are_rejected() {
    let ctx = build(Formulation::MixedInteger);
    let backend = ClarabelBackend::new();
    let options = SolveOptions {
        relax_integrality: true,
    };
    assert!(!backend.supports(&ctx.model, &options));
    let err = ctx.solve(&backend, &options).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Solver);
}

#[test]
fn failed_solves_report_a_status_instead_of_an_error() {
    use wdn_algo::{ComponentKey, Constraint, ConstraintCategory, Expr, Interval, SymbolicModel};

    let mut model = SymbolicModel::new();
    let h = model
        .add_continuous(VarKey::Head(node(1)), Interval::new(0.0, 1.0))
        .unwrap();
    model
        .register(
            ConstraintCategory::FlowConservation,
            ComponentKey::Node(node(1)),
            vec![Constraint::ge("above_bound", Expr::var(h), 2.0)],
        )
        .unwrap();

    let outcome = ClarabelBackend::new()
        .solve(&model, &SolveOptions::default())
        .unwrap();
    assert!(matches!(
        outcome.status,
        SolutionStatus::Infeasible | SolutionStatus::Error
    ));
    assert!(!outcome.status.is_success());
    assert!(outcome.values.is_empty());
}
