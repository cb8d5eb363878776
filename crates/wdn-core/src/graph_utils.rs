use crate::{NetworkData, NodeId};
use petgraph::graph::{NodeIndex, UnGraph};
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

/// One connected component of the network topology.
#[derive(Debug, Clone, PartialEq)]
pub struct IslandSummary {
    pub island_id: usize,
    /// Member nodes in ascending identifier order
    pub nodes: Vec<NodeId>,
}

/// Aggregated island analysis result.
#[derive(Debug, Clone, PartialEq)]
pub struct IslandAnalysis {
    pub islands: Vec<IslandSummary>,
}

impl IslandAnalysis {
    pub fn island_count(&self) -> usize {
        self.islands.len()
    }
}

/// Undirected topology graph over every node and link record. Links whose
/// endpoints are not declared nodes are left out; the classifier reports those.
pub fn topology_graph(network: &NetworkData) -> (UnGraph<NodeId, ()>, BTreeMap<NodeId, NodeIndex>) {
    let mut graph = UnGraph::new_undirected();
    let mut index = BTreeMap::new();
    for id in network.node.keys() {
        index.insert(*id, graph.add_node(*id));
    }
    for (_, fr, to) in network.link_endpoints() {
        if let (Some(a), Some(b)) = (index.get(&fr), index.get(&to)) {
            graph.add_edge(*a, *b, ());
        }
    }
    (graph, index)
}

/// Labels connected components (breadth-first search). Islands are numbered
/// in the order of their smallest node identifier.
pub fn find_islands(network: &NetworkData) -> IslandAnalysis {
    let (graph, index) = topology_graph(network);
    let mut visited = HashSet::new();
    let mut islands = Vec::new();
    for start in index.values() {
        if visited.contains(start) {
            continue;
        }
        let mut queue = VecDeque::new();
        queue.push_back(*start);
        let mut members = BTreeSet::new();
        while let Some(node) = queue.pop_front() {
            if !visited.insert(node) {
                continue;
            }
            members.insert(graph[node]);
            for neighbor in graph.neighbors(node) {
                if !visited.contains(&neighbor) {
                    queue.push_back(neighbor);
                }
            }
        }
        islands.push(IslandSummary {
            island_id: islands.len(),
            nodes: members.into_iter().collect(),
        });
    }
    IslandAnalysis { islands }
}

/// Islands containing no reservoir and no tank. Demands there can never be
/// served, which usually points at a data problem upstream.
pub fn unsupplied_islands(network: &NetworkData) -> Vec<IslandSummary> {
    let sources: HashSet<NodeId> = network
        .reservoir
        .values()
        .map(|r| r.node)
        .chain(network.tank.values().map(|t| t.node))
        .collect();
    find_islands(network)
        .islands
        .into_iter()
        .filter(|island| !island.nodes.iter().any(|n| sources.contains(n)))
        .collect()
}
