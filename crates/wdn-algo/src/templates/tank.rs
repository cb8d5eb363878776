use wdn_core::TankId;

use crate::bounds::cross_section;
use crate::error::{BuildError, BuildResult};
use crate::model::{ComponentKey, Constraint, ConstraintCategory, Expr, SymbolicModel, VarKey};

use super::TemplateInput;

/// Ties a cylindrical tank's volume to the head at its node, and fixes the
/// starting volume of a non-dispatchable tank in the first (or only) period.
pub fn tank(model: &mut SymbolicModel, input: &TemplateInput<'_>, id: TankId) -> BuildResult<()> {
    let tank = input
        .reference
        .tanks
        .get(&id)
        .ok_or_else(|| BuildError::InvalidInput(format!("{} is not in the network", id)))?;
    let elevation = input
        .reference
        .nodes
        .get(&tank.node)
        .map(|n| n.elevation)
        .ok_or_else(|| BuildError::InvalidInput(format!("{} is not in the network", tank.node)))?;
    let area = cross_section(tank);
    let volume = model.var(VarKey::TankVolume(id))?;
    let head = model.var(VarKey::Head(tank.node))?;

    model.register(
        ConstraintCategory::TankVolume,
        ComponentKey::Tank(id),
        vec![Constraint::eq(
            format!("tank_volume[{}]", id.value()),
            Expr::var(volume).term(head, -area),
            -area * elevation,
        )],
    )?;

    if input.role.fixes_initial_volume() && !tank.dispatchable {
        model.register(
            ConstraintCategory::TankInitialVolume,
            ComponentKey::Tank(id),
            vec![Constraint::eq(
                format!("tank_initial_volume[{}]", id.value()),
                Expr::var(volume),
                area * tank.init_level,
            )],
        )?;
    }
    Ok(())
}
