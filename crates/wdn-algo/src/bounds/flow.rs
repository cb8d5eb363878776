use std::collections::BTreeMap;
use std::f64::consts::PI;

use wdn_core::{FlowDirection, LinkId, NodeId, TankId};

use super::Interval;
use crate::error::BuildResult;
use crate::reference::{Device, LinkRef, NetworkRef};
use crate::resistance::flow_from_head;

/// Magnitude bound on any flow: fixed demand magnitudes, dispatchable demand
/// extremes and, when a time step is set, the fastest tank fill or drain.
pub fn sum_demand(reference: &NetworkRef, tank_volume: &BTreeMap<TankId, Interval>) -> f64 {
    let fixed: f64 = reference
        .fixed_demands
        .iter()
        .map(|id| reference.demands[id].flow_nominal.abs())
        .sum();
    let dispatchable: f64 = reference
        .dispatchable_demands
        .iter()
        .map(|id| {
            let (min, max) = crate::reference::demand_range(&reference.demands[id]);
            min.abs().max(max.abs())
        })
        .sum();
    let tanks: f64 = match reference.options.time_step {
        Some(dt) if dt > 0.0 => tank_volume.values().map(|v| v.width() / dt).sum(),
        _ => 0.0,
    };
    fixed + dispatchable + tanks
}

pub(super) fn flow_bounds(
    reference: &NetworkRef,
    head: &BTreeMap<NodeId, Interval>,
    sum_demand: f64,
) -> BuildResult<BTreeMap<LinkId, Vec<Interval>>> {
    let mut bounds = BTreeMap::new();
    for link in reference.links.values() {
        let dh = head_difference(head, link);
        let mut candidates = Vec::with_capacity(link.candidates.len());
        for k in 0..link.candidates.len() {
            candidates.push(candidate_bounds(reference, link, k, dh, sum_demand)?);
        }
        bounds.insert(link.id, candidates);
    }
    Ok(bounds)
}

fn head_difference(head: &BTreeMap<NodeId, Interval>, link: &LinkRef) -> Option<Interval> {
    let fr = head.get(&link.node_fr)?;
    let to = head.get(&link.node_to)?;
    Some(Interval::new(fr.min - to.max, fr.max - to.min))
}

fn candidate_bounds(
    reference: &NetworkRef,
    link: &LinkRef,
    k: usize,
    dh: Option<Interval>,
    sum_demand: f64,
) -> BuildResult<Interval> {
    let (mut min, mut max) = match (&link.device, link.length_resistance(k), dh) {
        (Device::Pump { curve, .. }, _, _) => (0.0, curve.max_flow()),
        (_, Some(lr), Some(dh)) if lr > 0.0 => (
            flow_from_head(dh.min, lr, reference.alpha),
            flow_from_head(dh.max, lr, reference.alpha),
        ),
        _ => (-sum_demand, sum_demand),
    };

    // A closed device carries no flow whatever its head difference.
    if link.device.is_switchable() {
        min = min.min(0.0);
        max = max.max(0.0);
    }

    min = min.max(-sum_demand);
    max = max.min(sum_demand);

    let v_max = link.max_velocity.or(reference.options.max_velocity);
    if let (Some(v), Some(d)) = (v_max, link.candidates[k].diameter) {
        let capacity = 0.25 * PI * d * d * v;
        min = min.max(-capacity);
        max = max.min(capacity);
    }

    if link.device.is_forward_only() {
        min = min.max(0.0);
    }
    match link.flow_direction {
        FlowDirection::Positive => min = min.max(0.0),
        FlowDirection::Negative => max = max.min(0.0),
        FlowDirection::Unknown => {}
    }

    if let Some(user_min) = link.flow_min {
        min = min.max(user_min);
    }
    if let Some(user_max) = link.flow_max {
        max = max.min(user_max);
    }

    Interval::checked(
        || {
            if link.candidates.len() > 1 {
                format!("{} flow (candidate {})", link.id, k)
            } else {
                format!("{} flow", link.id)
            }
        },
        min,
        max,
    )
}
