use std::collections::BTreeMap;

use wdn_core::NodeId;

use super::Interval;
use crate::error::BuildResult;
use crate::reference::{reservoir_range, Device, NetworkRef};

/// Highest reachable head: the larger of the highest elevation and the
/// highest reservoir head, plus every tank's maximum level and every pump's
/// maximum head gain.
pub fn global_max_head(reference: &NetworkRef) -> f64 {
    let max_elevation = reference
        .nodes
        .values()
        .map(|n| n.elevation)
        .fold(f64::NEG_INFINITY, f64::max);
    let max_reservoir = reference
        .reservoirs
        .values()
        .map(|r| reservoir_range(r).1.max(r.head_nominal))
        .fold(f64::NEG_INFINITY, f64::max);
    let tank_levels: f64 = reference.tanks.values().map(|t| t.max_level).sum();
    let pump_gains: f64 = reference
        .links
        .values()
        .filter_map(|l| match &l.device {
            Device::Pump { curve, .. } => Some(curve.max_head_gain()),
            _ => None,
        })
        .sum();
    max_elevation.max(max_reservoir) + tank_levels + pump_gains
}

pub(super) fn head_bounds(
    reference: &NetworkRef,
    margin: f64,
) -> BuildResult<BTreeMap<NodeId, Interval>> {
    let upper = global_max_head(reference);

    let mut bounds: BTreeMap<NodeId, (f64, f64)> = BTreeMap::new();
    for (id, node) in &reference.nodes {
        let mut lower = node.elevation;
        if reference.node_incidence(*id)?.is_pass_through() {
            lower -= margin;
        }
        bounds.insert(*id, (lower, upper));
    }

    for reservoir in reference.reservoirs.values() {
        if let Some(b) = bounds.get_mut(&reservoir.node) {
            *b = reservoir_range(reservoir);
        }
    }

    for tank in reference.tanks.values() {
        if let (Some(b), Some(node)) = (bounds.get_mut(&tank.node), reference.nodes.get(&tank.node)) {
            *b = (node.elevation + tank.min_level, node.elevation + tank.max_level);
        }
    }

    for link in reference.links.values() {
        if let Device::Regulator { setting } = link.device {
            if let (Some(b), Some(node)) =
                (bounds.get_mut(&link.node_to), reference.nodes.get(&link.node_to))
            {
                b.1 = b.1.min(node.elevation + setting);
            }
        }
    }

    let mut result = BTreeMap::new();
    for (id, (mut lower, mut upper)) in bounds {
        let node = &reference.nodes[&id];
        if let Some(h_min) = node.head_min {
            lower = lower.max(h_min);
        }
        if let Some(h_max) = node.head_max {
            upper = upper.min(h_max);
        }
        result.insert(id, Interval::checked(|| format!("{} head", id), lower, upper)?);
    }
    Ok(result)
}
