//! Temporal linking of tank volumes across periods.

mod common;

use common::*;
use wdn_algo::{
    BuildConfig, BuildError, ComponentKey, ConstraintCategory, Formulation, TimeExpandedModel,
    VarKey,
};
use wdn_core::{ModelInput, MultiNetworkData, NetworkData, TankId};

fn horizon(time_step: Option<f64>, second: NetworkData) -> MultiNetworkData {
    MultiNetworkData::new(time_step)
        .with_period(1, tank_network(None))
        .with_period(2, second)
}

fn config() -> BuildConfig {
    BuildConfig::new(Formulation::MixedInteger)
}

#[test]
fn adjacent_periods_link_tank_volume() {
    let data = horizon(Some(3600.0), tank_network(None));
    let tem = TimeExpandedModel::build(&ModelInput::MultiPeriod(data), &config()).unwrap();
    assert_eq!(tem.len(), 2);
    assert_eq!(tem.links.len(), 1);

    let tank = TankId::new(1);
    let link = &tem.links[0];
    assert_eq!((link.from, link.to), (1, 2));
    let first = tem.period(1).unwrap();
    let second = tem.period(2).unwrap();
    assert_eq!(
        link.terms,
        vec![
            (2, second.model.var(VarKey::TankVolume(tank)).unwrap(), 1.0),
            (1, first.model.var(VarKey::TankVolume(tank)).unwrap(), -1.0),
            (1, first.model.var(VarKey::TankFlow(tank)).unwrap(), 3600.0),
        ]
    );

    // Only the first period fixes the starting level.
    let initial = |ctx: &wdn_algo::ModelContext| {
        ctx.model
            .group(ConstraintCategory::TankInitialVolume, ComponentKey::Tank(tank))
            .is_some()
    };
    assert!(initial(first));
    assert!(!initial(second));
}

#[test]
fn flattened_model_enforces_continuity() {
    let data = horizon(Some(3600.0), tank_network(None));
    let tem = TimeExpandedModel::build_periods(&data, &config()).unwrap();
    let flat = tem.flatten().unwrap();

    let per_period: usize = tem.periods.iter().map(|(_, c)| c.model.num_variables()).sum();
    assert_eq!(flat.num_variables(), per_period);
    assert_eq!(flat.registry().count(ConstraintCategory::TankContinuity), 1);

    let tank = TankId::new(1);
    let rows = flat
        .group_at(1, ConstraintCategory::TankContinuity, ComponentKey::Tank(tank))
        .unwrap();
    assert_eq!(rows[0].name, "tank_continuity[1]@1");

    // Draining 0.01 m³/s for an hour removes 36 m³.
    let mut x = vec![0.0; flat.num_variables()];
    let v1 = flat.var_at(1, VarKey::TankVolume(tank)).unwrap();
    let v2 = flat.var_at(2, VarKey::TankVolume(tank)).unwrap();
    let q1 = flat.var_at(1, VarKey::TankFlow(tank)).unwrap();
    x[v1.index()] = 157.08;
    x[q1.index()] = 0.01;
    x[v2.index()] = 157.08 - 36.0;
    assert!(rows[0].violation(&x) < 1e-9);
    x[v2.index()] = 157.08;
    assert!((rows[0].violation(&x) - 36.0).abs() < 1e-9);

    assert!(flat
        .constraints()
        .iter()
        .any(|c| c.name == "flow_conservation[2]@2"));
}

#[test]
fn tank_missing_from_next_period_is_skipped_with_warning() {
    let mut second = tank_network(None);
    second.tank.clear();
    let data = horizon(Some(3600.0), second);
    let tem = TimeExpandedModel::build_periods(&data, &config()).unwrap();

    assert!(tem.links.is_empty());
    let temporal: Vec<_> = tem.diagnostics.issues_by_category("temporal").collect();
    assert_eq!(temporal.len(), 1);
    assert_eq!(temporal[0].entity.as_deref(), Some("Tank 1"));
    assert_eq!(temporal[0].period, Some(1));
}

#[test]
fn missing_time_step_is_an_error() {
    let data = horizon(None, tank_network(None));
    let err = TimeExpandedModel::build_periods(&data, &config()).unwrap_err();
    assert!(matches!(err, BuildError::MissingTimeStep { from: 1, to: 2 }));
}

#[test]
fn per_period_time_step_takes_precedence() {
    let data = MultiNetworkData::new(Some(3600.0))
        .with_period(1, tank_network(Some(900.0)))
        .with_period(2, tank_network(None));
    let tem = TimeExpandedModel::build_periods(&data, &config()).unwrap();
    assert_eq!(tem.links[0].terms[2].2, 900.0);
}

#[test]
fn dispatchable_tanks_are_not_linked() {
    let data = horizon(Some(3600.0), tank_network(None));
    let config = config().with_tanks_dispatchable(true);
    let tem = TimeExpandedModel::build_periods(&data, &config).unwrap();
    assert!(tem.links.is_empty());
}

#[test]
fn single_period_input_is_rejected() {
    let err = TimeExpandedModel::build(&ModelInput::Single(tank_network(None)), &config())
        .unwrap_err();
    assert!(matches!(
        err,
        BuildError::ModeMismatch {
            expected: "multi-period",
            found: "single-period"
        }
    ));
}
