use wdn_core::NodeId;

use crate::error::BuildResult;
use crate::model::{ComponentKey, Constraint, ConstraintCategory, Expr, SymbolicModel, VarKey};
use crate::reference::NodeIncidence;

use super::{side_indicator, TemplateInput};

/// Mass balance: inflow over `links_to`, outflow over `links_fr`, plus
/// reservoir and tank supply, equals the attached demand.
pub fn flow_conservation(
    model: &mut SymbolicModel,
    input: &TemplateInput<'_>,
    node: NodeId,
) -> BuildResult<()> {
    let reference = input.reference;
    let inc = reference.node_incidence(node)?;

    let mut expr = Expr::new();
    for arc in &inc.links_to {
        expr = expr.term(model.var(VarKey::Flow(arc.link))?, 1.0);
    }
    for arc in &inc.links_fr {
        expr = expr.term(model.var(VarKey::Flow(arc.link))?, -1.0);
    }
    for id in &inc.reservoirs {
        expr = expr.term(model.var(VarKey::ReservoirFlow(*id))?, 1.0);
    }
    for id in &inc.tanks {
        expr = expr.term(model.var(VarKey::TankFlow(*id))?, 1.0);
    }
    for id in &inc.demands {
        if reference.dispatchable_demands.contains(id) {
            expr = expr.term(model.var(VarKey::DemandFlow(*id))?, -1.0);
        }
    }
    let fixed = reference.fixed_demand_at(inc);

    model.register(
        ConstraintCategory::FlowConservation,
        ComponentKey::Node(node),
        vec![Constraint::eq(
            format!("flow_conservation[{}]", node.value()),
            expr,
            fixed,
        )],
    )?;
    Ok(())
}

/// Directional pattern of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    /// Degree two with nothing attached: flow passes straight through
    Intermediate,
    /// Water can only leave
    Source,
    /// Water can only enter
    Sink,
    Other,
}

impl NodeRole {
    pub fn classify(inc: &NodeIncidence, fixed_demand: f64, has_dispatchable_demand: bool) -> Self {
        if inc.degree() == 2 && inc.is_pass_through() {
            return NodeRole::Intermediate;
        }
        if !inc.tanks.is_empty() || has_dispatchable_demand {
            return NodeRole::Other;
        }
        let has_reservoir = !inc.reservoirs.is_empty();
        if (has_reservoir && fixed_demand <= 0.0) || fixed_demand < 0.0 {
            NodeRole::Source
        } else if !has_reservoir && fixed_demand > 0.0 {
            NodeRole::Sink
        } else {
            NodeRole::Other
        }
    }
}

/// Direction-indicator constraints of directed formulations.
pub fn directionality(
    model: &mut SymbolicModel,
    input: &TemplateInput<'_>,
    node: NodeId,
) -> BuildResult<()> {
    let reference = input.reference;
    let inc = reference.node_incidence(node)?;
    if inc.degree() == 0 {
        return Ok(());
    }

    let has_dispatchable = inc
        .demands
        .iter()
        .any(|id| reference.dispatchable_demands.contains(id));
    let role = NodeRole::classify(inc, reference.fixed_demand_at(inc), has_dispatchable);

    // Sum of indicators for flow entering and leaving the node.
    let mut inflow = Expr::new();
    let mut outflow = Expr::new();
    for arc in &inc.links_fr {
        let y = model.var(VarKey::Direction(arc.link))?;
        outflow = outflow.plus(side_indicator(y, true));
        inflow = inflow.plus(side_indicator(y, false));
    }
    for arc in &inc.links_to {
        let y = model.var(VarKey::Direction(arc.link))?;
        inflow = inflow.plus(side_indicator(y, true));
        outflow = outflow.plus(side_indicator(y, false));
    }

    let name = format!("directionality[{}]", node.value());
    let constraint = match role {
        NodeRole::Intermediate => Constraint::eq(name, inflow.plus(outflow.scaled(-1.0)), 0.0),
        NodeRole::Source => Constraint::ge(name, outflow, 1.0),
        NodeRole::Sink => Constraint::ge(name, inflow, 1.0),
        NodeRole::Other => return Ok(()),
    };
    model.register(
        ConstraintCategory::Directionality,
        ComponentKey::Node(node),
        vec![constraint],
    )?;
    Ok(())
}
