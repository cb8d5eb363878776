//! Design pipes: exactly one diameter candidate is selected and carries the
//! whole link flow.

use wdn_core::LinkId;

use crate::error::{BuildError, BuildResult};
use crate::model::{ComponentKey, Constraint, ConstraintCategory, Expr, SymbolicModel, VarKey};
use crate::reference::LinkRef;

use super::pipe::{directed_split, head_difference, secant_slope, tangent_cuts, LossSide};
use super::TemplateInput;

/// Selection, candidate flow split and head loss of a design pipe.
pub fn design_pipe(
    model: &mut SymbolicModel,
    input: &TemplateInput<'_>,
    link: &LinkRef,
) -> BuildResult<()> {
    let id = link.id;
    let resistances = candidate_resistances(link)?;
    let selection = selection_rows(model, input, id)?;
    model.register(
        ConstraintCategory::DesignSelection,
        ComponentKey::Link(id),
        selection,
    )?;

    let rows = if input.formulation().is_directed() {
        directed_split(model, input, link, true)?;
        directed_loss(model, input, link, &resistances)?
    } else {
        big_m_loss(model, input, link, &resistances)?
    };
    model.register(ConstraintCategory::HeadLoss, ComponentKey::Link(id), rows)?;
    Ok(())
}

fn candidate_resistances(link: &LinkRef) -> BuildResult<Vec<f64>> {
    (0..link.candidates.len())
        .map(|k| {
            link.length_resistance(k).ok_or_else(|| {
                BuildError::InvalidInput(format!("{} candidate {} has no resistance", link.id, k))
            })
        })
        .collect()
}

fn selection_rows(
    model: &SymbolicModel,
    input: &TemplateInput<'_>,
    id: LinkId,
) -> BuildResult<Vec<Constraint>> {
    let candidates = input.bounds.candidate_flows(id)?;
    let mut rows = Vec::with_capacity(2 * candidates.len() + 2);

    let mut choose_one = Expr::new();
    let mut total = Expr::var(model.var(VarKey::Flow(id))?);
    for (k, qk) in candidates.iter().enumerate() {
        let x = model.var(VarKey::Selection(id, k))?;
        let q = model.var(VarKey::CandidateFlow(id, k))?;
        choose_one = choose_one.term(x, 1.0);
        total = total.term(q, -1.0);
        rows.push(Constraint::le(
            format!("design_flow_max[{},{}]", id.value(), k),
            Expr::var(q).term(x, -qk.max.max(0.0)),
            0.0,
        ));
        rows.push(Constraint::ge(
            format!("design_flow_min[{},{}]", id.value(), k),
            Expr::var(q).term(x, -qk.min.min(0.0)),
            0.0,
        ));
    }
    rows.push(Constraint::eq(
        format!("design_select_one[{}]", id.value()),
        choose_one,
        1.0,
    ));
    rows.push(Constraint::eq(
        format!("design_flow_sum[{}]", id.value()),
        total,
        0.0,
    ));
    Ok(rows)
}

/// Exact head loss of each candidate, relaxed by big-M when not selected.
fn big_m_loss(
    model: &SymbolicModel,
    input: &TemplateInput<'_>,
    link: &LinkRef,
    resistances: &[f64],
) -> BuildResult<Vec<Constraint>> {
    let id = link.id;
    let alpha = input.reference.alpha;
    let dh = input.bounds.head_difference(link)?;
    let (m_up, m_lo) = (dh.max.max(0.0), dh.min.min(0.0));

    let mut rows = Vec::with_capacity(2 * resistances.len());
    for (k, lr) in resistances.iter().enumerate() {
        let q = model.var(VarKey::CandidateFlow(id, k))?;
        let x = model.var(VarKey::Selection(id, k))?;
        let loss = head_difference(model, link)?.signed_power(q, -lr, alpha);
        rows.push(Constraint::le(
            format!("head_loss_upper[{},{}]", id.value(), k),
            loss.clone().term(x, m_up),
            m_up,
        ));
        rows.push(Constraint::ge(
            format!("head_loss_lower[{},{}]", id.value(), k),
            loss.term(x, m_lo),
            m_lo,
        ));
    }
    Ok(rows)
}

/// Directed head loss: candidate flows are split by direction, the head
/// difference of each side dominates the summed candidate losses.
fn directed_loss(
    model: &SymbolicModel,
    input: &TemplateInput<'_>,
    link: &LinkRef,
    resistances: &[f64],
) -> BuildResult<Vec<Constraint>> {
    let id = link.id;
    let alpha = input.reference.alpha;
    let candidates = input.bounds.candidate_flows(id)?;
    let mut rows = Vec::new();

    for (forward, side, dh_key, q_key) in [
        (true, "pos", VarKey::HeadDiffPos(id), VarKey::FlowPos(id)),
        (false, "neg", VarKey::HeadDiffNeg(id), VarKey::FlowNeg(id)),
    ] {
        let dh = model.var(dh_key)?;
        let mut side_total = Expr::var(model.var(q_key)?);
        let mut convex = Expr::new().term(dh, -1.0);
        let mut secant = Expr::var(dh);

        for (k, (qk, lr)) in candidates.iter().zip(resistances).enumerate() {
            let q = model.var(VarKey::CandidateFlow(id, k))?;
            let x = model.var(VarKey::Selection(id, k))?;
            let (q_side, q_max) = if forward {
                (model.var(VarKey::CandidateFlowPos(id, k))?, qk.max.max(0.0))
            } else {
                (model.var(VarKey::CandidateFlowNeg(id, k))?, (-qk.min).max(0.0))
            };

            if forward {
                // Both candidate sides are split once, on the forward pass.
                let q_neg = model.var(VarKey::CandidateFlowNeg(id, k))?;
                let q_pos = model.var(VarKey::CandidateFlowPos(id, k))?;
                rows.push(Constraint::eq(
                    format!("design_flow_split[{},{}]", id.value(), k),
                    Expr::var(q).term(q_pos, -1.0).term(q_neg, 1.0),
                    0.0,
                ));
            }
            rows.push(Constraint::le(
                format!("design_flow_{}_select[{},{}]", side, id.value(), k),
                Expr::var(q_side).term(x, -q_max),
                0.0,
            ));

            side_total = side_total.term(q_side, -1.0);
            convex = convex.power(q_side, *lr, alpha);
            secant = secant.term(q_side, -secant_slope(*lr, alpha, q_max));

            if input.formulation().is_linear() {
                rows.extend(tangent_cuts(
                    input,
                    &LossSide {
                        name: format!("head_loss_{}[{},{}]", side, id.value(), k),
                        dh,
                        q: q_side,
                        indicator: Expr::var(x),
                        lr: *lr,
                        q_max,
                    },
                ));
            }
        }

        rows.push(Constraint::eq(
            format!("design_flow_{}_sum[{}]", side, id.value()),
            side_total,
            0.0,
        ));
        if !input.formulation().is_linear() {
            rows.push(Constraint::le(
                format!("head_loss_{}_convex[{}]", side, id.value()),
                convex,
                0.0,
            ));
        }
        rows.push(Constraint::le(
            format!("head_loss_{}_secant[{}]", side, id.value()),
            secant,
            0.0,
        ));
    }
    Ok(rows)
}
