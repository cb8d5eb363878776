use std::collections::BTreeMap;

use serde::Serialize;
use wdn_core::{Demand, DemandId, LinkId, Node, NodeId, Reservoir, ReservoirId, Tank, TankId};

use super::LinkRef;
use crate::error::{BuildError, BuildResult};

/// Oriented link endpoint pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Arc {
    pub link: LinkId,
    pub node_fr: NodeId,
    pub node_to: NodeId,
}

/// Everything incident to one node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NodeIncidence {
    /// Links originating at the node
    pub links_fr: Vec<Arc>,
    /// Links terminating at the node
    pub links_to: Vec<Arc>,
    pub demands: Vec<DemandId>,
    pub tanks: Vec<TankId>,
    pub reservoirs: Vec<ReservoirId>,
}

impl NodeIncidence {
    pub fn degree(&self) -> usize {
        self.links_fr.len() + self.links_to.len()
    }

    /// True when no demand, tank or reservoir is attached.
    pub fn is_pass_through(&self) -> bool {
        self.demands.is_empty() && self.tanks.is_empty() && self.reservoirs.is_empty()
    }
}

/// Node-to-component index. Every node has an entry, including isolated ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Incidence {
    nodes: BTreeMap<NodeId, NodeIncidence>,
}

impl Incidence {
    pub fn build(
        nodes: &BTreeMap<NodeId, Node>,
        links: &BTreeMap<LinkId, LinkRef>,
        tanks: &BTreeMap<TankId, Tank>,
        reservoirs: &BTreeMap<ReservoirId, Reservoir>,
        demands: &BTreeMap<DemandId, Demand>,
    ) -> BuildResult<Self> {
        let mut index: BTreeMap<NodeId, NodeIncidence> = nodes
            .keys()
            .map(|id| (*id, NodeIncidence::default()))
            .collect();

        for link in links.values() {
            let arc = Arc {
                link: link.id,
                node_fr: link.node_fr,
                node_to: link.node_to,
            };
            entry(&mut index, link.node_fr, &link.id.to_string())?
                .links_fr
                .push(arc);
            entry(&mut index, link.node_to, &link.id.to_string())?
                .links_to
                .push(arc);
        }
        for (id, tank) in tanks {
            entry(&mut index, tank.node, &id.to_string())?.tanks.push(*id);
        }
        for (id, reservoir) in reservoirs {
            entry(&mut index, reservoir.node, &id.to_string())?
                .reservoirs
                .push(*id);
        }
        for (id, demand) in demands {
            entry(&mut index, demand.node, &id.to_string())?
                .demands
                .push(*id);
        }

        Ok(Self { nodes: index })
    }

    /// Incidence of `node`; `None` only for identifiers outside the network.
    pub fn node(&self, node: NodeId) -> Option<&NodeIncidence> {
        self.nodes.get(&node)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &NodeIncidence)> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

fn entry<'a>(
    index: &'a mut BTreeMap<NodeId, NodeIncidence>,
    node: NodeId,
    component: &str,
) -> BuildResult<&'a mut NodeIncidence> {
    index
        .get_mut(&node)
        .ok_or_else(|| BuildError::InvalidInput(format!("{} references missing {}", component, node)))
}
