use std::collections::BTreeMap;
use std::f64::consts::PI;

use wdn_core::{Tank, TankId};

use super::Interval;
use crate::error::{BuildError, BuildResult};
use crate::reference::NetworkRef;

/// Cross-sectional area of a cylindrical tank.
pub fn cross_section(tank: &Tank) -> f64 {
    0.25 * PI * tank.diameter * tank.diameter
}

pub(super) fn tank_volume_bounds(reference: &NetworkRef) -> BuildResult<BTreeMap<TankId, Interval>> {
    let mut bounds = BTreeMap::new();
    for (id, tank) in &reference.tanks {
        if tank.volume_curve.is_some() {
            return Err(BuildError::UnsupportedTankGeometry { tank: *id });
        }
        if !(tank.diameter.is_finite() && tank.diameter > 0.0) {
            return Err(BuildError::InvalidInput(format!(
                "{} has non-positive diameter {}",
                id, tank.diameter
            )));
        }
        let area = cross_section(tank);
        let volume = Interval::checked(
            || format!("{} volume", id),
            tank.min_vol.max(area * tank.min_level).max(0.0),
            area * tank.max_level,
        )?;
        if !tank.dispatchable && !volume.contains(area * tank.init_level) {
            return Err(BuildError::InvalidInput(format!(
                "{} initial level {} is outside [{}, {}]",
                id, tank.init_level, tank.min_level, tank.max_level
            )));
        }
        bounds.insert(*id, volume);
    }
    Ok(bounds)
}
