//! Constraint templates.
//!
//! One function per device type. Each receives the component, the read-only
//! bound tables and the active formulation, and registers its constraint
//! groups in the [`SymbolicModel`]. The registry rejects a second
//! registration for the same (category, component), so every template runs
//! at most once per component and build.
//!
//! Big-M constants always come from [`Bounds`]; no template inspects solver
//! state or other templates' output.

mod design;
mod node;
mod pipe;
mod pump;
mod tank;
mod valves;
mod variables;

use tracing::debug;

pub use design::design_pipe;
pub use node::{directionality, flow_conservation, NodeRole};
pub use pipe::{pipe, short_pipe};
pub use pump::pump;
pub use tank::tank;
pub use valves::{check_valve, generic_valve, regulator, shutoff_valve};
pub use variables::declare_variables;

use crate::bounds::Bounds;
use crate::config::BuildConfig;
use crate::context::PeriodRole;
use crate::error::BuildResult;
use crate::formulation::Formulation;
use crate::model::{Expr, SymbolicModel, VarId, VarKind};
use crate::reference::{Device, NetworkRef};

/// Read-only inputs shared by every template call.
#[derive(Debug, Clone, Copy)]
pub struct TemplateInput<'a> {
    pub reference: &'a NetworkRef,
    pub bounds: &'a Bounds,
    pub config: &'a BuildConfig,
    pub role: PeriodRole,
}

impl<'a> TemplateInput<'a> {
    pub fn formulation(&self) -> Formulation {
        self.config.formulation
    }

    pub fn epsilon(&self) -> f64 {
        self.config.flow_epsilon
    }

    /// Kind of on/off and selection indicators under the formulation.
    pub fn indicator_kind(&self) -> VarKind {
        if self.formulation().is_integral() {
            VarKind::Binary
        } else {
            VarKind::Continuous
        }
    }
}

/// Declare every variable and run every template once.
pub fn build_all(model: &mut SymbolicModel, input: &TemplateInput<'_>) -> BuildResult<()> {
    declare_variables(model, input)?;

    let directed = input.formulation().is_directed();
    for id in input.reference.nodes.keys() {
        flow_conservation(model, input, *id)?;
        if directed {
            directionality(model, input, *id)?;
        }
    }

    for link in input.reference.links.values() {
        match &link.device {
            Device::Pipe => pipe(model, input, link)?,
            Device::ShortPipe => short_pipe(model, input, link)?,
            Device::DesignPipe => design_pipe(model, input, link)?,
            Device::CheckValve => check_valve(model, input, link)?,
            Device::ShutoffValve => shutoff_valve(model, input, link)?,
            Device::Regulator { setting } => regulator(model, input, link, *setting)?,
            Device::GenericValve => generic_valve(model, input, link)?,
            Device::Pump { curve, flow_min_forward } => {
                pump(model, input, link, curve, *flow_min_forward)?
            }
        }
    }

    for id in input.reference.tanks.keys() {
        tank(model, input, *id)?;
    }

    debug!(
        formulation = %input.formulation(),
        variables = model.num_variables(),
        constraints = model.num_constraints(),
        "templates applied"
    );
    Ok(())
}

/// `var` for the forward side, `1 - var` for the reverse side.
pub(crate) fn side_indicator(var: VarId, forward: bool) -> Expr {
    if forward {
        Expr::var(var)
    } else {
        Expr::new().constant(1.0).term(var, -1.0)
    }
}

/// Evenly spaced tangent points in `(0, q_max]`.
pub(crate) fn cut_points(q_max: f64, count: usize) -> Vec<f64> {
    if q_max <= 0.0 || count == 0 {
        return Vec::new();
    }
    (1..=count)
        .map(|k| q_max * k as f64 / count as f64)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cut_points_are_positive_and_end_at_max() {
        assert_eq!(cut_points(10.0, 4), vec![2.5, 5.0, 7.5, 10.0]);
        assert!(cut_points(0.0, 4).is_empty());
    }

    #[test]
    fn reverse_indicator_is_complement() {
        let e = side_indicator(VarId::new(0), false);
        assert_eq!(e.eval(&[1.0]), 0.0);
        assert_eq!(e.eval(&[0.0]), 1.0);
    }
}
