//! Time-expanded models.
//!
//! Each period is an independent [`ModelContext`]. Periods are built first
//! (in parallel with the `parallel` feature), then the temporal linker walks
//! adjacent pairs in index order and couples tank volumes:
//!
//! ```text
//! V[t]@next - V[t]@cur + dt · q_tank[t]@cur = 0
//! ```
//!
//! where `q_tank` is the outflow from the tank into the network and `dt` the
//! duration of the current period.

use std::collections::{BTreeMap, BTreeSet};

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::{debug, info, warn};
use wdn_core::{DiagnosticIssue, Diagnostics, ModelInput, MultiNetworkData, NetworkData, Severity, TankId};

use crate::backend::SolveOutcome;
use crate::config::BuildConfig;
use crate::context::{ModelContext, PeriodRole};
use crate::error::{BuildError, BuildResult};
use crate::model::{ComponentKey, Constraint, ConstraintCategory, Expr, SymbolicModel, VarId, VarKey};

/// Equality across two periods; terms are `(period, variable, coefficient)`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkConstraint {
    pub tank: TankId,
    pub from: usize,
    pub to: usize,
    pub terms: Vec<(usize, VarId, f64)>,
    pub rhs: f64,
}

#[derive(Debug, Clone)]
pub struct TimeExpandedModel {
    /// Per-period contexts in index order
    pub periods: Vec<(usize, ModelContext)>,
    pub links: Vec<LinkConstraint>,
    /// Per-period diagnostics (tagged with their period) plus linker warnings
    pub diagnostics: Diagnostics,
}

impl TimeExpandedModel {
    /// Build every period of a multi-period input and link them.
    pub fn build(input: &ModelInput, config: &BuildConfig) -> BuildResult<Self> {
        match input {
            ModelInput::MultiPeriod(data) => Self::build_periods(data, config),
            ModelInput::Single(_) => Err(BuildError::ModeMismatch {
                expected: "multi-period",
                found: "single-period",
            }),
        }
    }

    pub fn build_periods(data: &MultiNetworkData, config: &BuildConfig) -> BuildResult<Self> {
        if data.nw.is_empty() {
            return Err(BuildError::InvalidInput(
                "multi-period input has no periods".to_string(),
            ));
        }

        let jobs: Vec<(usize, NetworkData, PeriodRole)> = data
            .nw
            .iter()
            .enumerate()
            .map(|(position, (index, network))| {
                let mut network = network.clone();
                network.options.time_step = data.time_step_for(*index);
                let role = if position == 0 {
                    PeriodRole::First
                } else {
                    PeriodRole::Subsequent
                };
                (*index, network, role)
            })
            .collect();

        let build_one = |(index, network, role): &(usize, NetworkData, PeriodRole)| {
            ModelContext::build_network(network, config, *role).map(|ctx| (*index, ctx))
        };
        #[cfg(feature = "parallel")]
        let built: Vec<BuildResult<(usize, ModelContext)>> = jobs.par_iter().map(build_one).collect();
        #[cfg(not(feature = "parallel"))]
        let built: Vec<BuildResult<(usize, ModelContext)>> = jobs.iter().map(build_one).collect();
        let periods = built.into_iter().collect::<BuildResult<Vec<_>>>()?;

        let mut diagnostics = Diagnostics::new();
        for (index, ctx) in &periods {
            for issue in &ctx.diagnostics().issues {
                diagnostics.add(issue.clone().with_period(*index));
            }
        }

        let mut links = Vec::new();
        for pair in periods.windows(2) {
            let [(from, current), (to, next)] = pair else {
                continue;
            };
            links.extend(link_tanks(
                (*from, current),
                (*to, next),
                data.time_step_for(*from),
                &mut diagnostics,
            )?);
        }

        info!(
            periods = periods.len(),
            links = links.len(),
            warnings = diagnostics.warning_count(),
            "time-expanded model built"
        );
        Ok(Self {
            periods,
            links,
            diagnostics,
        })
    }

    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    pub fn period(&self, index: usize) -> Option<&ModelContext> {
        self.periods
            .iter()
            .find(|(i, _)| *i == index)
            .map(|(_, ctx)| ctx)
    }

    /// Merge every period and the linking constraints into one model.
    /// Variables and constraints are renamed `name@period`.
    pub fn flatten(&self) -> BuildResult<SymbolicModel> {
        let mut flat = SymbolicModel::new();
        let mut mappings: BTreeMap<usize, Vec<VarId>> = BTreeMap::new();
        for (index, ctx) in &self.periods {
            mappings.insert(*index, flat.absorb_period(*index, &ctx.model)?);
        }

        for link in &self.links {
            let mut expr = Expr::new();
            for (period, var, coef) in &link.terms {
                let global = mappings
                    .get(period)
                    .and_then(|m| m.get(var.index()))
                    .ok_or_else(|| {
                        BuildError::MissingVariable(format!("#{}@{}", var.index(), period))
                    })?;
                expr = expr.term(*global, *coef);
            }
            flat.register_at(
                link.from,
                ConstraintCategory::TankContinuity,
                ComponentKey::Tank(link.tank),
                vec![Constraint::eq(
                    format!("tank_continuity[{}]@{}", link.tank.value(), link.from),
                    expr,
                    link.rhs,
                )],
            )?;
        }

        debug!(
            variables = flat.num_variables(),
            constraints = flat.num_constraints(),
            "flattened time-expanded model"
        );
        Ok(flat)
    }

    /// Values of a solve of the flattened model keyed by period and variable.
    pub fn solution(flat: &SymbolicModel, outcome: &SolveOutcome) -> BTreeMap<(usize, VarKey), f64> {
        if outcome.values.len() != flat.num_variables() {
            return BTreeMap::new();
        }
        flat.variables()
            .iter()
            .zip(&outcome.values)
            .filter_map(|(var, value)| var.period.map(|p| ((p, var.key), *value)))
            .collect()
    }
}

/// Continuity constraints of every tank shared by two adjacent periods.
fn link_tanks(
    (from, current): (usize, &ModelContext),
    (to, next): (usize, &ModelContext),
    time_step: Option<f64>,
    diagnostics: &mut Diagnostics,
) -> BuildResult<Vec<LinkConstraint>> {
    let tanks: BTreeSet<TankId> = current
        .reference
        .tanks
        .keys()
        .chain(next.reference.tanks.keys())
        .copied()
        .collect();

    let mut links = Vec::new();
    for tank in tanks {
        let (Some(cur_tank), Some(next_tank)) =
            (current.reference.tanks.get(&tank), next.reference.tanks.get(&tank))
        else {
            let missing = if current.reference.tanks.contains_key(&tank) { to } else { from };
            warn!(tank = tank.value(), from, to, "tank not present in both periods; not linked");
            diagnostics.add(
                DiagnosticIssue::new(
                    Severity::Warning,
                    "temporal",
                    format!("tank missing in period {}; continuity not enforced", missing),
                )
                .with_entity(tank.to_string())
                .with_period(from),
            );
            continue;
        };
        if cur_tank.dispatchable || next_tank.dispatchable {
            continue;
        }

        let dt = time_step.ok_or(BuildError::MissingTimeStep { from, to })?;
        if !(dt > 0.0) {
            return Err(BuildError::InvalidInput(format!(
                "time step of period {} must be positive, got {}",
                from, dt
            )));
        }
        links.push(LinkConstraint {
            tank,
            from,
            to,
            terms: vec![
                (to, next.model.var(VarKey::TankVolume(tank))?, 1.0),
                (from, current.model.var(VarKey::TankVolume(tank))?, -1.0),
                (from, current.model.var(VarKey::TankFlow(tank))?, dt),
            ],
            rhs: 0.0,
        });
    }
    Ok(links)
}
