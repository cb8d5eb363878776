//! Bound propagation.
//!
//! Computes sound interval bounds for every node head, link flow (per
//! resistance candidate), tank volume and pump head gain. The tables are
//! computed once and are read-only input to the constraint templates, which
//! derive every big-M constant from them.
//!
//! Any empty interval is reported as [`BuildError::InvalidBounds`]; bounds are
//! never swapped or silently repaired.

mod flow;
mod head;
mod tank;

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info};
use wdn_core::{LinkId, NodeId, TankId};

pub use flow::sum_demand;
pub use head::global_max_head;
pub use tank::cross_section;

use crate::config::BuildConfig;
use crate::error::{BuildError, BuildResult};
use crate::reference::{Device, LinkRef, NetworkRef};

/// Closed interval `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Interval {
    pub min: f64,
    pub max: f64,
}

impl Interval {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn point(value: f64) -> Self {
        Self::new(value, value)
    }

    /// Interval checked for `min <= max`; `entity` names it in the error.
    pub fn checked(entity: impl FnOnce() -> String, min: f64, max: f64) -> BuildResult<Self> {
        if min <= max {
            Ok(Self::new(min, max))
        } else {
            Err(BuildError::InvalidBounds {
                entity: entity(),
                min,
                max,
            })
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }

    /// Smallest interval containing both.
    pub fn hull(&self, other: &Interval) -> Interval {
        Interval::new(self.min.min(other.min), self.max.max(other.max))
    }

    pub fn width(&self) -> f64 {
        self.max - self.min
    }
}

/// Bound tables of one network.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bounds {
    pub head: BTreeMap<NodeId, Interval>,
    /// One interval per resistance candidate, in candidate order
    pub flow: BTreeMap<LinkId, Vec<Interval>>,
    pub tank_volume: BTreeMap<TankId, Interval>,
    pub pump_head_gain: BTreeMap<LinkId, Interval>,
    /// Upper bound on the magnitude of any link flow
    pub sum_demand: f64,
}

impl Bounds {
    pub fn compute(reference: &NetworkRef, config: &BuildConfig) -> BuildResult<Self> {
        let tank_volume = tank::tank_volume_bounds(reference)?;
        let head = head::head_bounds(reference, config.pass_through_margin)?;
        let sum_demand = flow::sum_demand(reference, &tank_volume);
        let flow = flow::flow_bounds(reference, &head, sum_demand)?;

        let mut pump_head_gain = BTreeMap::new();
        for link in reference.links.values() {
            if let Device::Pump { curve, .. } = &link.device {
                let gain = Interval::checked(
                    || format!("{} head gain", link.id),
                    0.0,
                    curve.max_head_gain(),
                )?;
                pump_head_gain.insert(link.id, gain);
            }
        }

        debug!(sum_demand, "propagated bounds");
        info!(
            nodes = head.len(),
            links = flow.len(),
            tanks = tank_volume.len(),
            pumps = pump_head_gain.len(),
            "bound tables ready"
        );

        Ok(Self {
            head,
            flow,
            tank_volume,
            pump_head_gain,
            sum_demand,
        })
    }

    pub fn head(&self, node: NodeId) -> BuildResult<Interval> {
        self.head
            .get(&node)
            .copied()
            .ok_or_else(|| BuildError::InvalidInput(format!("no head bounds for {}", node)))
    }

    pub fn candidate_flows(&self, link: LinkId) -> BuildResult<&[Interval]> {
        self.flow
            .get(&link)
            .map(Vec::as_slice)
            .ok_or_else(|| BuildError::InvalidInput(format!("no flow bounds for {}", link)))
    }

    /// Hull of all candidate intervals of `link`.
    pub fn link_flow(&self, link: LinkId) -> BuildResult<Interval> {
        let candidates = self.candidate_flows(link)?;
        candidates
            .iter()
            .copied()
            .reduce(|a, b| a.hull(&b))
            .ok_or_else(|| BuildError::InvalidInput(format!("{} has no flow candidates", link)))
    }

    pub fn tank_volume(&self, tank: TankId) -> BuildResult<Interval> {
        self.tank_volume
            .get(&tank)
            .copied()
            .ok_or_else(|| BuildError::InvalidInput(format!("no volume bounds for {}", tank)))
    }

    pub fn pump_head_gain(&self, link: LinkId) -> BuildResult<Interval> {
        self.pump_head_gain
            .get(&link)
            .copied()
            .ok_or_else(|| BuildError::InvalidInput(format!("no head gain bounds for {}", link)))
    }

    /// Range of `h[node_fr] - h[node_to]`.
    pub fn head_difference(&self, link: &LinkRef) -> BuildResult<Interval> {
        let fr = self.head(link.node_fr)?;
        let to = self.head(link.node_to)?;
        Ok(Interval::new(fr.min - to.max, fr.max - to.min))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checked_rejects_empty_interval() {
        let err = Interval::checked(|| "Node 1 head".into(), 3.0, 2.0).unwrap_err();
        assert_eq!(
            err.to_string(),
            "inconsistent bounds for Node 1 head: min 3 > max 2"
        );
        assert!(Interval::checked(|| String::new(), 2.0, 2.0).is_ok());
    }

    #[test]
    fn hull_and_contains() {
        let a = Interval::new(-1.0, 2.0);
        let b = Interval::new(0.5, 4.0);
        assert_eq!(a.hull(&b), Interval::new(-1.0, 4.0));
        assert!(a.contains(0.0));
        assert!(!a.contains(2.5));
        assert_eq!(b.width(), 3.5);
    }
}
