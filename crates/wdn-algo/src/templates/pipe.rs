//! Pipe and short-pipe templates, and the direction split shared with design
//! pipes.

use crate::error::{BuildError, BuildResult};
use crate::model::{ComponentKey, Constraint, ConstraintCategory, Expr, SymbolicModel, VarId, VarKey};
use crate::reference::LinkRef;

use super::{cut_points, side_indicator, TemplateInput};

/// `h[fr] - h[to]` of a link.
pub(crate) fn head_difference(model: &SymbolicModel, link: &LinkRef) -> BuildResult<Expr> {
    Ok(Expr::new()
        .term(model.var(VarKey::Head(link.node_fr))?, 1.0)
        .term(model.var(VarKey::Head(link.node_to))?, -1.0))
}

/// Splits `q = q⁺ - q⁻` (and `dh = dh⁺ - dh⁻` when `with_head_diff`) and ties
/// each side to the direction indicator.
pub(crate) fn directed_split(
    model: &mut SymbolicModel,
    input: &TemplateInput<'_>,
    link: &LinkRef,
    with_head_diff: bool,
) -> BuildResult<()> {
    let rows = directed_split_rows(model, input, link, with_head_diff)?;
    model.register(ConstraintCategory::DirectedFlow, ComponentKey::Link(link.id), rows)?;
    Ok(())
}

/// Rows of [`directed_split`] for devices that add their own direction rows.
pub(crate) fn directed_split_rows(
    model: &SymbolicModel,
    input: &TemplateInput<'_>,
    link: &LinkRef,
    with_head_diff: bool,
) -> BuildResult<Vec<Constraint>> {
    let id = link.id;
    let q = model.var(VarKey::Flow(id))?;
    let q_pos = model.var(VarKey::FlowPos(id))?;
    let q_neg = model.var(VarKey::FlowNeg(id))?;
    let y = model.var(VarKey::Direction(id))?;
    let flow = input.bounds.link_flow(id)?;
    let (pos_max, neg_max) = (flow.max.max(0.0), (-flow.min).max(0.0));

    let mut rows = vec![
        Constraint::eq(
            format!("flow_split[{}]", id.value()),
            Expr::var(q).term(q_pos, -1.0).term(q_neg, 1.0),
            0.0,
        ),
        Constraint::le(
            format!("flow_pos_direction[{}]", id.value()),
            Expr::var(q_pos).term(y, -pos_max),
            0.0,
        ),
        Constraint::le(
            format!("flow_neg_direction[{}]", id.value()),
            Expr::var(q_neg).term(y, neg_max),
            neg_max,
        ),
    ];

    if with_head_diff {
        let dh_pos = model.var(VarKey::HeadDiffPos(id))?;
        let dh_neg = model.var(VarKey::HeadDiffNeg(id))?;
        let dh = input.bounds.head_difference(link)?;
        let (dh_pos_max, dh_neg_max) = (dh.max.max(0.0), (-dh.min).max(0.0));
        rows.push(Constraint::eq(
            format!("head_split[{}]", id.value()),
            head_difference(model, link)?
                .term(dh_pos, -1.0)
                .term(dh_neg, 1.0),
            0.0,
        ));
        rows.push(Constraint::le(
            format!("head_pos_direction[{}]", id.value()),
            Expr::var(dh_pos).term(y, -dh_pos_max),
            0.0,
        ));
        rows.push(Constraint::le(
            format!("head_neg_direction[{}]", id.value()),
            Expr::var(dh_neg).term(y, dh_neg_max),
            dh_neg_max,
        ));
    }
    Ok(rows)
}

/// One flow direction of a link's head loss.
pub(crate) struct LossSide {
    pub name: String,
    pub dh: VarId,
    pub q: VarId,
    /// Activity indicator of this side (direction or selection)
    pub indicator: Expr,
    /// Length-scaled resistance `L·r`
    pub lr: f64,
    pub q_max: f64,
}

/// Perspective tangents of `L·r·q^α` at the configured cut points.
pub(crate) fn tangent_cuts(input: &TemplateInput<'_>, side: &LossSide) -> Vec<Constraint> {
    let alpha = input.reference.alpha;
    cut_points(side.q_max, input.config.oa_cut_points)
        .into_iter()
        .enumerate()
        .map(|(i, q0)| {
            let slope = side.lr * alpha * q0.powf(alpha - 1.0);
            let offset = (1.0 - alpha) * side.lr * q0.powf(alpha);
            Constraint::ge(
                format!("{}_cut[{}]", side.name, i),
                Expr::var(side.dh)
                    .term(side.q, -slope)
                    .plus(side.indicator.clone().scaled(-offset)),
                0.0,
            )
        })
        .collect()
}

/// Slope of the secant of `L·r·q^α` over `[0, q_max]`.
pub(crate) fn secant_slope(lr: f64, alpha: f64, q_max: f64) -> f64 {
    if q_max > 0.0 {
        lr * q_max.powf(alpha - 1.0)
    } else {
        0.0
    }
}

/// Lower bound `dh >= L·r·q^α` of one flow direction, or its tangents when
/// only linear rows are allowed.
pub(crate) fn loss_lower_bound(input: &TemplateInput<'_>, side: &LossSide) -> Vec<Constraint> {
    if input.formulation().is_linear() {
        tangent_cuts(input, side)
    } else {
        vec![Constraint::le(
            format!("{}_convex", side.name),
            Expr::new()
                .power(side.q, side.lr, input.reference.alpha)
                .term(side.dh, -1.0),
            0.0,
        )]
    }
}

/// Head-loss rows of one flow direction: [`loss_lower_bound`] plus the secant
/// upper bound.
pub(crate) fn directed_loss_side(input: &TemplateInput<'_>, side: LossSide) -> Vec<Constraint> {
    let alpha = input.reference.alpha;
    let mut rows = loss_lower_bound(input, &side);
    rows.push(Constraint::le(
        format!("{}_secant", side.name),
        Expr::var(side.dh).term(side.q, -secant_slope(side.lr, alpha, side.q_max)),
        0.0,
    ));
    rows
}

/// Friction head loss along a plain pipe.
pub fn pipe(model: &mut SymbolicModel, input: &TemplateInput<'_>, link: &LinkRef) -> BuildResult<()> {
    let id = link.id;
    let lr = link
        .length_resistance(0)
        .ok_or_else(|| BuildError::InvalidInput(format!("{} has no resistance", id)))?;
    let alpha = input.reference.alpha;

    let rows = if input.formulation().is_directed() {
        directed_split(model, input, link, true)?;
        let flow = input.bounds.link_flow(id)?;
        let y = model.var(VarKey::Direction(id))?;
        let mut rows = directed_loss_side(
            input,
            LossSide {
                name: format!("head_loss_pos[{}]", id.value()),
                dh: model.var(VarKey::HeadDiffPos(id))?,
                q: model.var(VarKey::FlowPos(id))?,
                indicator: side_indicator(y, true),
                lr,
                q_max: flow.max.max(0.0),
            },
        );
        rows.extend(directed_loss_side(
            input,
            LossSide {
                name: format!("head_loss_neg[{}]", id.value()),
                dh: model.var(VarKey::HeadDiffNeg(id))?,
                q: model.var(VarKey::FlowNeg(id))?,
                indicator: side_indicator(y, false),
                lr,
                q_max: (-flow.min).max(0.0),
            },
        ));
        rows
    } else {
        let q = model.var(VarKey::Flow(id))?;
        vec![Constraint::eq(
            format!("head_loss[{}]", id.value()),
            head_difference(model, link)?.signed_power(q, -lr, alpha),
            0.0,
        )]
    };

    model.register(ConstraintCategory::HeadLoss, ComponentKey::Link(id), rows)?;
    Ok(())
}

/// Zero head-loss connector.
pub fn short_pipe(
    model: &mut SymbolicModel,
    input: &TemplateInput<'_>,
    link: &LinkRef,
) -> BuildResult<()> {
    if input.formulation().is_directed() {
        directed_split(model, input, link, false)?;
    }
    let row = Constraint::eq(
        format!("short_pipe[{}]", link.id.value()),
        head_difference(model, link)?,
        0.0,
    );
    model.register(
        ConstraintCategory::ShortPipe,
        ComponentKey::Link(link.id),
        vec![row],
    )?;
    Ok(())
}
