//! Valve templates. Every valve carries a status indicator `z`; a closed
//! valve forces zero flow and decouples the heads at its ends.

use wdn_core::LinkId;

use crate::error::{BuildError, BuildResult};
use crate::formulation::Formulation;
use crate::model::{ComponentKey, Constraint, ConstraintCategory, Expr, SymbolicModel, VarKey};
use crate::reference::LinkRef;

use super::pipe::{
    directed_split_rows, head_difference, loss_lower_bound, secant_slope, LossSide,
};
use super::{cut_points, side_indicator, TemplateInput};

/// In directed formulations a forward-only device can only be on when its
/// direction indicator points forward: `z - y <= 0`.
pub(crate) fn forward_only_coupling(
    model: &mut SymbolicModel,
    input: &TemplateInput<'_>,
    id: LinkId,
) -> BuildResult<()> {
    if !input.formulation().is_directed() {
        return Ok(());
    }
    let z = model.var(VarKey::Status(id))?;
    let y = model.var(VarKey::Direction(id))?;
    model.register(
        ConstraintCategory::DirectedFlow,
        ComponentKey::Link(id),
        vec![Constraint::le(
            format!("forward_only[{}]", id.value()),
            Expr::var(z).term(y, -1.0),
            0.0,
        )],
    )?;
    Ok(())
}

/// `q <= q_max·z` and `q >= ε·z`: closed means no flow, open means strictly
/// forward flow.
fn on_off_flow(
    model: &SymbolicModel,
    input: &TemplateInput<'_>,
    prefix: &str,
    id: LinkId,
    q_min_on: f64,
) -> BuildResult<Vec<Constraint>> {
    let q = model.var(VarKey::Flow(id))?;
    let z = model.var(VarKey::Status(id))?;
    let q_max = input.bounds.link_flow(id)?.max.max(0.0);
    Ok(vec![
        Constraint::le(
            format!("{}_flow_max[{}]", prefix, id.value()),
            Expr::var(q).term(z, -q_max),
            0.0,
        ),
        Constraint::ge(
            format!("{}_flow_min[{}]", prefix, id.value()),
            Expr::var(q).term(z, -q_min_on),
            0.0,
        ),
    ])
}

/// `h[fr] >= h[to]` while open.
fn open_head_order(
    model: &SymbolicModel,
    input: &TemplateInput<'_>,
    prefix: &str,
    link: &LinkRef,
) -> BuildResult<Constraint> {
    let z = model.var(VarKey::Status(link.id))?;
    let m_lo = input.bounds.head_difference(link)?.min.min(0.0);
    Ok(Constraint::ge(
        format!("{}_head_order[{}]", prefix, link.id.value()),
        head_difference(model, link)?.term(z, m_lo),
        m_lo,
    ))
}

/// Pipe with a check valve: flow only from `node_fr` to `node_to`, with pipe
/// friction while open.
pub fn check_valve(
    model: &mut SymbolicModel,
    input: &TemplateInput<'_>,
    link: &LinkRef,
) -> BuildResult<()> {
    let id = link.id;
    let lr = link
        .length_resistance(0)
        .ok_or_else(|| BuildError::InvalidInput(format!("{} has no resistance", id)))?;
    let alpha = input.reference.alpha;
    let q = model.var(VarKey::Flow(id))?;
    let z = model.var(VarKey::Status(id))?;
    let dh = input.bounds.head_difference(link)?;
    let (m_up, m_lo) = (dh.max.max(0.0), dh.min.min(0.0));
    let q_max = input.bounds.link_flow(id)?.max.max(0.0);

    let mut rows = on_off_flow(model, input, "check_valve", id, input.epsilon())?;
    rows.push(open_head_order(model, input, "check_valve", link)?);
    rows.push(Constraint::le(
        format!("check_valve_closed_head[{}]", id.value()),
        head_difference(model, link)?.term(z, -m_up),
        0.0,
    ));
    model.register(ConstraintCategory::CheckValve, ComponentKey::Link(id), rows)?;

    let name = format!("head_loss[{}]", id.value());
    let mut loss = Vec::new();
    match input.formulation() {
        Formulation::MixedInteger => {
            let gap = head_difference(model, link)?.signed_power(q, -lr, alpha);
            loss.push(Constraint::le(format!("{}_upper", name), gap.clone(), 0.0));
            loss.push(Constraint::ge(format!("{}_lower", name), gap.term(z, m_lo), m_lo));
        }
        Formulation::OuterApproximation => {
            for (i, q0) in cut_points(q_max, input.config.oa_cut_points).into_iter().enumerate() {
                let slope = lr * alpha * q0.powf(alpha - 1.0);
                let offset = (1.0 - alpha) * lr * q0.powf(alpha);
                loss.push(Constraint::ge(
                    format!("{}_cut[{}]", name, i),
                    head_difference(model, link)?
                        .term(q, -slope)
                        .term(z, m_lo - offset),
                    m_lo,
                ));
            }
        }
        Formulation::ContinuousRelaxation => {
            loss.push(Constraint::le(
                format!("{}_convex", name),
                Expr::new()
                    .power(q, lr, alpha)
                    .plus(head_difference(model, link)?.scaled(-1.0))
                    .term(z, -m_lo),
                -m_lo,
            ));
        }
    }
    if input.formulation().is_directed() {
        loss.push(Constraint::le(
            format!("{}_secant", name),
            head_difference(model, link)?.term(q, -secant_slope(lr, alpha, q_max)),
            0.0,
        ));
    }
    model.register(ConstraintCategory::HeadLoss, ComponentKey::Link(id), loss)?;

    forward_only_coupling(model, input, id)
}

/// Valve that can be opened in either direction or closed. A stand-alone
/// valve has no friction: open means equal heads. A pipe fitted with a
/// shutoff valve follows the pipe head-loss law while open.
pub fn shutoff_valve(
    model: &mut SymbolicModel,
    input: &TemplateInput<'_>,
    link: &LinkRef,
) -> BuildResult<()> {
    let id = link.id;
    let eps = input.epsilon();
    let q = model.var(VarKey::Flow(id))?;
    let z = model.var(VarKey::Status(id))?;
    let yp = model.var(VarKey::OpenForward(id))?;
    let yn = model.var(VarKey::OpenReverse(id))?;
    let flow = input.bounds.link_flow(id)?;
    let (q_max, q_min) = (flow.max.max(0.0), flow.min.min(0.0));
    let dh = input.bounds.head_difference(link)?;
    let (m_up, m_lo) = (dh.max.max(0.0), dh.min.min(0.0));
    let lr = link.length_resistance(0).filter(|lr| *lr > 0.0);

    let mut rows = vec![
        Constraint::eq(
            format!("shutoff_valve_status[{}]", id.value()),
            Expr::var(yp).term(yn, 1.0).term(z, -1.0),
            0.0,
        ),
        Constraint::le(
            format!("shutoff_valve_flow_max[{}]", id.value()),
            Expr::var(q).term(yp, -q_max).term(yn, eps),
            0.0,
        ),
        Constraint::ge(
            format!("shutoff_valve_flow_min[{}]", id.value()),
            Expr::var(q).term(yn, -q_min).term(yp, -eps),
            0.0,
        ),
    ];
    if lr.is_none() {
        rows.push(Constraint::le(
            format!("shutoff_valve_head_upper[{}]", id.value()),
            head_difference(model, link)?.term(z, m_up),
            m_up,
        ));
        rows.push(Constraint::ge(
            format!("shutoff_valve_head_lower[{}]", id.value()),
            head_difference(model, link)?.term(z, m_lo),
            m_lo,
        ));
    }
    model.register(ConstraintCategory::ShutoffValve, ComponentKey::Link(id), rows)?;

    if input.formulation().is_directed() {
        let y = model.var(VarKey::Direction(id))?;
        let mut directed = match lr {
            Some(_) => directed_split_rows(model, input, link, true)?,
            None => Vec::new(),
        };
        directed.push(Constraint::le(
            format!("shutoff_valve_forward[{}]", id.value()),
            Expr::var(yp).term(y, -1.0),
            0.0,
        ));
        directed.push(Constraint::le(
            format!("shutoff_valve_reverse[{}]", id.value()),
            Expr::var(yn).term(y, 1.0),
            1.0,
        ));
        model.register(ConstraintCategory::DirectedFlow, ComponentKey::Link(id), directed)?;
    }

    match lr {
        Some(lr) => shutoff_head_loss(model, input, link, lr),
        None => Ok(()),
    }
}

/// Pipe friction of an open shutoff valve. A closed valve carries no flow, so
/// every row is released by big-M on `1 - z` over the head-difference range.
fn shutoff_head_loss(
    model: &mut SymbolicModel,
    input: &TemplateInput<'_>,
    link: &LinkRef,
    lr: f64,
) -> BuildResult<()> {
    let id = link.id;
    let alpha = input.reference.alpha;
    let z = model.var(VarKey::Status(id))?;
    let dh = input.bounds.head_difference(link)?;
    let (m_up, m_lo) = (dh.max.max(0.0), dh.min.min(0.0));

    let rows = if input.formulation().is_directed() {
        let flow = input.bounds.link_flow(id)?;
        let y = model.var(VarKey::Direction(id))?;
        let sides = [
            (
                "pos",
                VarKey::HeadDiffPos(id),
                VarKey::FlowPos(id),
                true,
                flow.max.max(0.0),
                m_up,
            ),
            (
                "neg",
                VarKey::HeadDiffNeg(id),
                VarKey::FlowNeg(id),
                false,
                (-flow.min).max(0.0),
                -m_lo,
            ),
        ];
        let mut rows = Vec::new();
        for (side, dh_key, q_key, forward, q_side_max, dh_side_max) in sides {
            let loss = LossSide {
                name: format!("head_loss_{}[{}]", side, id.value()),
                dh: model.var(dh_key)?,
                q: model.var(q_key)?,
                indicator: side_indicator(y, forward),
                lr,
                q_max: q_side_max,
            };
            rows.extend(loss_lower_bound(input, &loss));
            rows.push(Constraint::le(
                format!("{}_secant", loss.name),
                Expr::var(loss.dh)
                    .term(loss.q, -secant_slope(lr, alpha, q_side_max))
                    .term(z, dh_side_max),
                dh_side_max,
            ));
        }
        rows
    } else {
        let q = model.var(VarKey::Flow(id))?;
        let gap = head_difference(model, link)?.signed_power(q, -lr, alpha);
        let name = format!("head_loss[{}]", id.value());
        vec![
            Constraint::le(format!("{}_upper", name), gap.clone().term(z, m_up), m_up),
            Constraint::ge(format!("{}_lower", name), gap.term(z, m_lo), m_lo),
        ]
    };

    model.register(ConstraintCategory::HeadLoss, ComponentKey::Link(id), rows)?;
    Ok(())
}

/// Pressure-reducing valve holding the downstream head at
/// `elevation + setting` while active.
pub fn regulator(
    model: &mut SymbolicModel,
    input: &TemplateInput<'_>,
    link: &LinkRef,
    setting: f64,
) -> BuildResult<()> {
    let id = link.id;
    let elevation = input
        .reference
        .nodes
        .get(&link.node_to)
        .map(|n| n.elevation)
        .ok_or_else(|| BuildError::InvalidInput(format!("{} is not in the network", link.node_to)))?;
    let h_set = elevation + setting;
    let h_to = model.var(VarKey::Head(link.node_to))?;
    let z = model.var(VarKey::Status(id))?;
    let head_to = input.bounds.head(link.node_to)?;
    let above = (head_to.max - h_set).max(0.0);
    let below = (head_to.min - h_set).min(0.0);

    let mut rows = on_off_flow(model, input, "regulator", id, input.epsilon())?;
    rows.push(Constraint::le(
        format!("regulator_setting_upper[{}]", id.value()),
        Expr::var(h_to).term(z, above),
        h_set + above,
    ));
    rows.push(Constraint::ge(
        format!("regulator_setting_lower[{}]", id.value()),
        Expr::var(h_to).term(z, below),
        h_set + below,
    ));
    rows.push(open_head_order(model, input, "regulator", link)?);
    model.register(ConstraintCategory::Regulator, ComponentKey::Link(id), rows)?;

    forward_only_coupling(model, input, id)
}

/// Throttle or general purpose valve: forward flow with a non-negative head
/// drop while open.
pub fn generic_valve(
    model: &mut SymbolicModel,
    input: &TemplateInput<'_>,
    link: &LinkRef,
) -> BuildResult<()> {
    let id = link.id;
    let mut rows = on_off_flow(model, input, "generic_valve", id, input.epsilon())?;
    rows.push(open_head_order(model, input, "generic_valve", link)?);
    model.register(ConstraintCategory::GenericValve, ComponentKey::Link(id), rows)?;

    forward_only_coupling(model, input, id)
}
