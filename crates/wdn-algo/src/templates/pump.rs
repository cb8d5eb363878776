use crate::error::BuildResult;
use crate::formulation::Formulation;
use crate::model::{ComponentKey, Constraint, ConstraintCategory, Expr, SymbolicModel, VarKey};
use crate::pump_curve::PumpCurve;
use crate::reference::LinkRef;

use super::valves::forward_only_coupling;
use super::{cut_points, TemplateInput};

/// On/off pump lifting the head from `node_fr` to `node_to` by the gain
/// `g = c1·q² + c2·q + c3` while running.
pub fn pump(
    model: &mut SymbolicModel,
    input: &TemplateInput<'_>,
    link: &LinkRef,
    curve: &PumpCurve,
    flow_min_forward: Option<f64>,
) -> BuildResult<()> {
    let id = link.id;
    let q = model.var(VarKey::Flow(id))?;
    let z = model.var(VarKey::Status(id))?;
    let g = model.var(VarKey::HeadGain(id))?;
    let h_fr = model.var(VarKey::Head(link.node_fr))?;
    let h_to = model.var(VarKey::Head(link.node_to))?;

    let q_max = input.bounds.link_flow(id)?.max.max(0.0);
    let q_min_on = flow_min_forward.unwrap_or(0.0).max(input.epsilon());
    let g_max = input.bounds.pump_head_gain(id)?.max.max(0.0);
    let (head_fr, head_to) = (input.bounds.head(link.node_fr)?, input.bounds.head(link.node_to)?);
    let m_up = (head_to.max - head_fr.min).max(0.0);
    let m_lo = (head_to.min - head_fr.max).min(0.0);

    // Lift across the pump; only binding while on.
    let lift = Expr::var(h_to).term(h_fr, -1.0).term(g, -1.0);
    let rows = vec![
        Constraint::le(
            format!("pump_flow_max[{}]", id.value()),
            Expr::var(q).term(z, -q_max),
            0.0,
        ),
        Constraint::ge(
            format!("pump_flow_min[{}]", id.value()),
            Expr::var(q).term(z, -q_min_on),
            0.0,
        ),
        Constraint::le(
            format!("pump_gain_max[{}]", id.value()),
            Expr::var(g).term(z, -g_max),
            0.0,
        ),
        Constraint::le(
            format!("pump_lift_upper[{}]", id.value()),
            lift.clone().term(z, m_up),
            m_up,
        ),
        Constraint::ge(
            format!("pump_lift_lower[{}]", id.value()),
            lift.term(z, m_lo),
            m_lo,
        ),
    ];
    model.register(ConstraintCategory::Pump, ComponentKey::Link(id), rows)?;

    let name = format!("pump_head_gain[{}]", id.value());
    let curve_gap = || {
        Expr::var(g)
            .power(q, -curve.c1, 2.0)
            .term(q, -curve.c2)
            .term(z, -curve.c3)
    };
    let gain = match input.formulation() {
        Formulation::MixedInteger => vec![Constraint::eq(name, curve_gap(), 0.0)],
        Formulation::ContinuousRelaxation => vec![Constraint::le(name, curve_gap(), 0.0)],
        Formulation::OuterApproximation => cut_points(q_max, input.config.oa_cut_points)
            .into_iter()
            .enumerate()
            .map(|(i, q0)| {
                let (slope, intercept) = curve.tangent(q0);
                Constraint::le(
                    format!("{}_cut[{}]", name, i),
                    Expr::var(g).term(q, -slope).term(z, -intercept),
                    0.0,
                )
            })
            .collect(),
    };
    model.register(ConstraintCategory::PumpHeadGain, ComponentKey::Link(id), gain)?;

    forward_only_coupling(model, input, id)
}
