//! End-to-end model construction on small networks.

mod common;

use common::*;
use wdn_algo::resistance::head_loss;
use wdn_algo::{
    BuildConfig, BuildError, ComponentKey, ConstraintCategory, Formulation, ModelContext,
    ProblemClass, VarKey,
};
use wdn_core::{ModelInput, MultiNetworkData, ReservoirId, TankId};

fn build(data: wdn_core::NetworkData, formulation: Formulation) -> ModelContext {
    ModelContext::build(&ModelInput::Single(data), &BuildConfig::new(formulation)).unwrap()
}

#[test]
fn two_node_conservation_fixes_pipe_flow() {
    let ctx = build(two_node_pipe(), Formulation::MixedInteger);

    let row = &ctx
        .model
        .group(ConstraintCategory::FlowConservation, ComponentKey::Node(node(2)))
        .unwrap()[0];
    let q = ctx.model.var(VarKey::Flow(link(1))).unwrap();
    assert_eq!(row.expr.linear, vec![(q, 1.0)]);
    assert_eq!(row.rhs, 10.0);

    let head = ctx.bounds.head(node(2)).unwrap();
    assert_eq!((head.min, head.max), (0.0, 100.0));
    let flow = ctx.bounds.link_flow(link(1)).unwrap();
    assert_eq!((flow.min, flow.max), (0.0, 10.0));
}

#[test]
fn two_node_mixed_integer_accepts_hydraulic_solution() {
    let ctx = build(two_node_pipe(), Formulation::MixedInteger);
    assert_eq!(ctx.model.problem_class(), ProblemClass::NonlinearProgram);

    let lr = ctx.reference.links[&link(1)].length_resistance(0).unwrap();
    assert!((lr - 0.0444).abs() < 1e-3);
    let h2 = 100.0 - head_loss(10.0, lr, ctx.reference.alpha);

    let x = assign(
        &ctx.model,
        &[
            (VarKey::Head(node(1)), 100.0),
            (VarKey::Head(node(2)), h2),
            (VarKey::Flow(link(1)), 10.0),
            (VarKey::ReservoirFlow(ReservoirId::new(1)), 10.0),
        ],
    );
    let violations = ctx.model.violations(&x, 1e-6);
    assert!(violations.is_empty(), "{:?}", violations);

    // Same heads with less flow breaks both conservation and head loss.
    let mut short = x.clone();
    short[ctx.model.var(VarKey::Flow(link(1))).unwrap().index()] = 9.0;
    let names: Vec<String> = ctx
        .model
        .violations(&short, 1e-6)
        .into_iter()
        .map(|v| v.name)
        .collect();
    assert!(names.contains(&"flow_conservation[2]".to_string()));
    assert!(names.contains(&"head_loss[1]".to_string()));
}

#[test]
fn directed_formulations_force_source_to_sink_direction() {
    for formulation in [Formulation::ContinuousRelaxation, Formulation::OuterApproximation] {
        let ctx = build(two_node_pipe(), formulation);
        let y = ctx.model.var(VarKey::Direction(link(1))).unwrap();

        let source = &ctx
            .model
            .group(ConstraintCategory::Directionality, ComponentKey::Node(node(1)))
            .unwrap()[0];
        assert_eq!(source.expr.linear, vec![(y, 1.0)]);
        assert_eq!(source.rhs, 1.0);

        assert!(ctx
            .model
            .group(ConstraintCategory::DirectedFlow, ComponentKey::Link(link(1)))
            .is_some());
    }

    let oa = build(two_node_pipe(), Formulation::OuterApproximation);
    assert_eq!(oa.model.problem_class(), ProblemClass::MixedIntegerLinear);
    assert_eq!(oa.model.num_binaries(), 1);
    let cr = build(two_node_pipe(), Formulation::ContinuousRelaxation);
    assert_eq!(cr.model.problem_class(), ProblemClass::NonlinearProgram);
    assert_eq!(cr.model.num_binaries(), 0);
    assert!(cr.model.constraints().iter().all(|c| c.is_convex()));
}

#[test]
fn outer_approximation_is_tight_at_the_flow_bound() {
    let ctx = build(two_node_pipe(), Formulation::OuterApproximation);
    let lr = ctx.reference.links[&link(1)].length_resistance(0).unwrap();
    let dh = head_loss(10.0, lr, ctx.reference.alpha);

    let x = assign(
        &ctx.model,
        &[
            (VarKey::Head(node(1)), 100.0),
            (VarKey::Head(node(2)), 100.0 - dh),
            (VarKey::Flow(link(1)), 10.0),
            (VarKey::FlowPos(link(1)), 10.0),
            (VarKey::HeadDiffPos(link(1)), dh),
            (VarKey::Direction(link(1)), 1.0),
            (VarKey::ReservoirFlow(ReservoirId::new(1)), 10.0),
        ],
    );
    let violations = ctx.model.violations(&x, 1e-6);
    assert!(violations.is_empty(), "{:?}", violations);

    // Any smaller head drop violates the tangent at q = 10.
    let mut low = x.clone();
    low[ctx.model.var(VarKey::HeadDiffPos(link(1))).unwrap().index()] = 0.9 * dh;
    low[ctx.model.var(VarKey::Head(node(2))).unwrap().index()] = 100.0 - 0.9 * dh;
    assert!(ctx
        .model
        .violations(&low, 1e-6)
        .iter()
        .any(|v| v.name.starts_with("head_loss_pos[1]_cut")));
}

#[test]
fn tank_volume_bounds_follow_cylinder_levels() {
    let ctx = build(tank_network(None), Formulation::MixedInteger);
    let volume = ctx.bounds.tank_volume(TankId::new(1)).unwrap();
    assert!((volume.min - 78.54).abs() < 1e-2);
    assert!((volume.max - 392.70).abs() < 1e-2);

    let initial = &ctx
        .model
        .group(ConstraintCategory::TankInitialVolume, ComponentKey::Tank(TankId::new(1)))
        .unwrap()[0];
    assert!((initial.rhs - 0.25 * std::f64::consts::PI * 100.0 * 2.0).abs() < 1e-9);
}

#[test]
fn dispatchable_tanks_start_free() {
    let config = BuildConfig::new(Formulation::MixedInteger).with_tanks_dispatchable(true);
    let ctx = ModelContext::build(&ModelInput::Single(tank_network(None)), &config).unwrap();
    assert!(ctx
        .model
        .group(ConstraintCategory::TankInitialVolume, ComponentKey::Tank(TankId::new(1)))
        .is_none());
    assert!(ctx
        .model
        .group(ConstraintCategory::TankVolume, ComponentKey::Tank(TankId::new(1)))
        .is_some());
}

#[test]
fn multi_period_input_is_rejected_by_single_build() {
    let input = ModelInput::MultiPeriod(
        MultiNetworkData::new(Some(3600.0)).with_period(1, two_node_pipe()),
    );
    let err = ModelContext::build(&input, &BuildConfig::default()).unwrap_err();
    assert!(matches!(
        err,
        BuildError::ModeMismatch {
            expected: "single-period",
            ..
        }
    ));
}

#[test]
fn ambiguous_link_aborts_the_build() {
    let data = two_node_valve_pipe(true, true);
    let err = ModelContext::build(&ModelInput::Single(data), &BuildConfig::default()).unwrap_err();
    assert!(matches!(err, BuildError::AmbiguousDevice { .. }));
    assert_eq!(err.kind(), wdn_algo::ErrorKind::Configuration);
}

#[test]
fn solution_maps_values_back_to_keys() {
    let ctx = build(two_node_pipe(), Formulation::MixedInteger);
    let values = assign(&ctx.model, &[(VarKey::Flow(link(1)), 10.0)]);
    let outcome = wdn_algo::SolveOutcome {
        status: wdn_algo::SolutionStatus::Optimal,
        objective: 0.0,
        values,
        solve_time_ms: 0,
    };
    let solution = ctx.solution(&outcome);
    assert_eq!(solution[&VarKey::Flow(link(1))], 10.0);
    assert_eq!(solution.len(), ctx.model.num_variables());
}
