//! Network reference: classified devices, resistances and incidence.
//!
//! A [`NetworkRef`] is derived once per network (or per period) from the
//! immutable input records. The only adjustment applied to input data is the
//! optional tank dispatchability toggle, which happens here, before any
//! bounds are computed.

pub mod classify;
pub mod incidence;

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::{debug, warn};
use wdn_core::{
    unsupplied_islands, Demand, DemandId, Diagnostics, FlowDirection, LinkId, NetworkData, Node,
    NodeId, Options, Reservoir, ReservoirId, Tank, TankId,
};

pub use classify::classify_links;
pub use incidence::{Arc, Incidence, NodeIncidence};

use crate::error::{BuildError, BuildResult};
use crate::pump_curve::PumpCurve;

/// Closed set of link device subtypes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Device {
    Pipe,
    /// Diameter chosen among the link's candidates
    DesignPipe,
    CheckValve,
    ShutoffValve,
    /// Pressure-reducing valve; `setting` is above the downstream elevation
    Regulator { setting: f64 },
    Pump {
        curve: PumpCurve,
        flow_min_forward: Option<f64>,
    },
    ShortPipe,
    GenericValve,
}

impl Device {
    pub fn name(&self) -> &'static str {
        match self {
            Device::Pipe => "pipe",
            Device::DesignPipe => "design pipe",
            Device::CheckValve => "check valve",
            Device::ShutoffValve => "shutoff valve",
            Device::Regulator { .. } => "pressure-reducing valve",
            Device::Pump { .. } => "pump",
            Device::ShortPipe => "short pipe",
            Device::GenericValve => "generic valve",
        }
    }

    /// Devices that only admit flow from `node_fr` to `node_to`.
    pub fn is_forward_only(&self) -> bool {
        matches!(
            self,
            Device::CheckValve | Device::Regulator { .. } | Device::Pump { .. } | Device::GenericValve
        )
    }

    /// Devices with a binary on/off (open/closed) state.
    pub fn is_switchable(&self) -> bool {
        matches!(
            self,
            Device::CheckValve
                | Device::ShutoffValve
                | Device::Regulator { .. }
                | Device::Pump { .. }
                | Device::GenericValve
        )
    }
}

/// One resistance alternative of a link. Non-design links carry exactly one.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Candidate {
    pub diameter: Option<f64>,
    /// Per-unit-length resistance; `None` for zero head-loss devices
    pub resistance: Option<f64>,
    /// Construction cost, `length × unit_cost`
    pub cost: f64,
}

/// A classified link.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkRef {
    pub id: LinkId,
    pub node_fr: NodeId,
    pub node_to: NodeId,
    pub length: f64,
    pub device: Device,
    /// Ordered like the record's diameter list for design pipes
    pub candidates: Vec<Candidate>,
    pub flow_direction: FlowDirection,
    pub flow_min: Option<f64>,
    pub flow_max: Option<f64>,
    pub max_velocity: Option<f64>,
}

impl LinkRef {
    /// Length-scaled resistance `L·r` of candidate `k`.
    pub fn length_resistance(&self, k: usize) -> Option<f64> {
        self.candidates
            .get(k)
            .and_then(|c| c.resistance)
            .map(|r| self.length * r)
    }

    pub fn is_design(&self) -> bool {
        matches!(self.device, Device::DesignPipe)
    }
}

/// Classified, indexed view of one network.
#[derive(Debug, Clone, Serialize)]
pub struct NetworkRef {
    pub nodes: BTreeMap<NodeId, Node>,
    pub links: BTreeMap<LinkId, LinkRef>,
    pub tanks: BTreeMap<TankId, Tank>,
    pub reservoirs: BTreeMap<ReservoirId, Reservoir>,
    pub demands: BTreeMap<DemandId, Demand>,
    pub fixed_reservoirs: BTreeSet<ReservoirId>,
    pub dispatchable_reservoirs: BTreeSet<ReservoirId>,
    pub fixed_demands: BTreeSet<DemandId>,
    pub dispatchable_demands: BTreeSet<DemandId>,
    pub incidence: Incidence,
    pub options: Options,
    /// Head-loss exponent of the selected friction law
    pub alpha: f64,
    #[serde(skip)]
    pub diagnostics: Diagnostics,
}

impl NetworkRef {
    /// Classify and index `data`. `tanks_dispatchable`, when set, replaces
    /// every tank's dispatchable flag.
    pub fn build(data: &NetworkData, tanks_dispatchable: Option<bool>) -> BuildResult<Self> {
        let links = classify_links(data)?;

        let mut tanks = data.tank.clone();
        if let Some(flag) = tanks_dispatchable {
            for tank in tanks.values_mut() {
                tank.dispatchable = flag;
            }
        }

        let incidence = Incidence::build(&data.node, &links, &tanks, &data.reservoir, &data.demand)?;

        let (dispatchable_reservoirs, fixed_reservoirs) =
            split_by(&data.reservoir, |r: &Reservoir| r.dispatchable);
        let (dispatchable_demands, fixed_demands) =
            split_by(&data.demand, |d: &Demand| d.dispatchable);

        for id in &dispatchable_demands {
            let demand = &data.demand[id];
            let (min, max) = demand_range(demand);
            if min > max {
                return Err(BuildError::InvalidBounds {
                    entity: format!("{} flow", id),
                    min,
                    max,
                });
            }
        }

        let mut diagnostics = Diagnostics::new();
        for island in unsupplied_islands(data) {
            let has_demand = island.nodes.iter().any(|node| {
                incidence
                    .node(*node)
                    .map(|inc| !inc.demands.is_empty())
                    .unwrap_or(false)
            });
            if has_demand {
                let entity = island
                    .nodes
                    .first()
                    .map(|n| n.to_string())
                    .unwrap_or_default();
                warn!(island = island.island_id, nodes = island.nodes.len(), "demand island has no source");
                diagnostics.add_warning_with_entity(
                    "topology",
                    &format!("island {} has demands but no reservoir or tank", island.island_id),
                    &entity,
                );
            }
        }

        debug!(
            nodes = data.node.len(),
            links = links.len(),
            tanks = tanks.len(),
            reservoirs = data.reservoir.len(),
            demands = data.demand.len(),
            "built network reference"
        );

        Ok(Self {
            nodes: data.node.clone(),
            links,
            tanks,
            reservoirs: data.reservoir.clone(),
            demands: data.demand.clone(),
            fixed_reservoirs,
            dispatchable_reservoirs,
            fixed_demands,
            dispatchable_demands,
            incidence,
            alpha: data.options.head_loss.exponent(),
            options: data.options.clone(),
            diagnostics,
        })
    }

    pub fn link(&self, id: LinkId) -> BuildResult<&LinkRef> {
        self.links
            .get(&id)
            .ok_or_else(|| BuildError::InvalidInput(format!("unknown {}", id)))
    }

    pub fn node_incidence(&self, id: NodeId) -> BuildResult<&NodeIncidence> {
        self.incidence
            .node(id)
            .ok_or_else(|| BuildError::InvalidInput(format!("unknown {}", id)))
    }

    /// Links of one device kind, in identifier order.
    pub fn links_where<'a>(
        &'a self,
        pred: impl Fn(&Device) -> bool + 'a,
    ) -> impl Iterator<Item = &'a LinkRef> + 'a {
        self.links.values().filter(move |l| pred(&l.device))
    }

    /// Sum of fixed demand flows at `node` (negative values inject).
    pub fn fixed_demand_at(&self, node: &NodeIncidence) -> f64 {
        node.demands
            .iter()
            .filter(|id| self.fixed_demands.contains(id))
            .map(|id| self.demands[id].flow_nominal)
            .sum()
    }
}

/// Admissible flow range of a dispatchable demand.
pub fn demand_range(demand: &Demand) -> (f64, f64) {
    (
        demand.flow_min.unwrap_or(demand.flow_nominal),
        demand.flow_max.unwrap_or(demand.flow_nominal),
    )
}

/// Admissible head range of a reservoir.
pub fn reservoir_range(reservoir: &Reservoir) -> (f64, f64) {
    if reservoir.dispatchable {
        (
            reservoir.head_min.unwrap_or(reservoir.head_nominal),
            reservoir.head_max.unwrap_or(reservoir.head_nominal),
        )
    } else {
        (reservoir.head_nominal, reservoir.head_nominal)
    }
}

/// Split identifiers into (matching, not matching) sets.
fn split_by<K: Ord + Copy, V>(
    records: &BTreeMap<K, V>,
    pred: impl Fn(&V) -> bool,
) -> (BTreeSet<K>, BTreeSet<K>) {
    let mut yes = BTreeSet::new();
    let mut no = BTreeSet::new();
    for (id, record) in records {
        if pred(record) {
            yes.insert(*id);
        } else {
            no.insert(*id);
        }
    }
    (yes, no)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wdn_core::LinkRecord;

    fn network() -> NetworkData {
        let mut data = NetworkData::new();
        data.node.insert(NodeId::new(1), Node::new(50.0));
        data.node.insert(NodeId::new(2), Node::new(0.0));
        data.node.insert(NodeId::new(3), Node::new(0.0));
        data.pipe.insert(
            LinkId::new(1),
            LinkRecord::new(NodeId::new(1), NodeId::new(2)).with_pipe(100.0, 0.3, 120.0),
        );
        data.reservoir
            .insert(ReservoirId::new(1), Reservoir::fixed(NodeId::new(1), 50.0));
        let mut flexible = Demand::fixed(NodeId::new(2), 2.0);
        flexible.dispatchable = true;
        flexible.flow_max = Some(4.0);
        data.demand.insert(DemandId::new(1), flexible);
        data.demand
            .insert(DemandId::new(2), Demand::fixed(NodeId::new(3), 1.0));
        data.tank.insert(
            TankId::new(1),
            Tank::cylinder(NodeId::new(2), 10.0, 1.0, 5.0, 2.0),
        );
        data
    }

    #[test]
    fn splits_fixed_and_dispatchable() {
        let reference = NetworkRef::build(&network(), None).unwrap();
        assert!(reference.fixed_reservoirs.contains(&ReservoirId::new(1)));
        assert!(reference.dispatchable_demands.contains(&DemandId::new(1)));
        assert!(reference.fixed_demands.contains(&DemandId::new(2)));
        assert_eq!(reference.alpha, 1.852);
    }

    #[test]
    fn tank_toggle_overrides_records() {
        let reference = NetworkRef::build(&network(), Some(true)).unwrap();
        assert!(reference.tanks[&TankId::new(1)].dispatchable);
        let reference = NetworkRef::build(&network(), None).unwrap();
        assert!(!reference.tanks[&TankId::new(1)].dispatchable);
    }

    #[test]
    fn unsupplied_demand_island_is_diagnosed() {
        let reference = NetworkRef::build(&network(), None).unwrap();
        assert_eq!(reference.diagnostics.warning_count(), 1);
        let issue = &reference.diagnostics.issues[0];
        assert_eq!(issue.entity.as_deref(), Some("Node 3"));
    }

    #[test]
    fn reservoir_and_demand_ranges() {
        let mut reservoir = Reservoir::fixed(NodeId::new(1), 40.0);
        assert_eq!(reservoir_range(&reservoir), (40.0, 40.0));
        reservoir.dispatchable = true;
        reservoir.head_max = Some(45.0);
        assert_eq!(reservoir_range(&reservoir), (40.0, 45.0));

        let mut data = network();
        if let Some(d) = data.demand.get_mut(&DemandId::new(1)) {
            d.flow_min = Some(5.0);
        }
        assert!(matches!(
            NetworkRef::build(&data, None),
            Err(BuildError::InvalidBounds { .. })
        ));
    }
}
