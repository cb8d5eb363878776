//! # wdn-core: Water Distribution Network Data Model
//!
//! Provides the normalized component records that model-construction code in
//! `wdn-algo` consumes, together with diagnostics and topological utilities.
//!
//! ## Design Philosophy
//!
//! The input is a **flat, category-keyed mapping** of component records:
//! - **Nodes**: junction points carrying an elevation and optional head limits
//! - **Links**: pipes, design pipes, short pipes, valves and pumps between two nodes
//! - **Nodal components**: tanks, reservoirs and demands attached to a node
//!
//! Records reference nodes by [`NodeId`] and never own them. Nothing in this
//! crate interprets the records hydraulically; classification and bounds live
//! in `wdn-algo`.
//!
//! ## Quick Start
//!
//! ```rust
//! use wdn_core::*;
//!
//! let json = r#"{
//!     "node": {"1": {"elevation": 100.0}, "2": {"elevation": 0.0}},
//!     "pipe": {"1": {"node_fr": 1, "node_to": 2, "length": 1000.0,
//!                    "diameter": 2.0, "roughness": 130.0}},
//!     "reservoir": {"1": {"node": 1, "head_nominal": 100.0}},
//!     "demand": {"1": {"node": 2, "flow_nominal": 10.0}}
//! }"#;
//!
//! let network = NetworkData::from_json_str(json).unwrap();
//! assert_eq!(network.node.len(), 2);
//! assert_eq!(network.pipe[&LinkId::new(1)].node_to, NodeId::new(2));
//! ```
//!
//! ## ID System
//!
//! Every component has a typed identifier (newtype wrapper around `usize`):
//! - [`NodeId`], [`LinkId`], [`TankId`], [`ReservoirId`], [`DemandId`]
//!
//! All link categories (pipe, des_pipe, short_pipe, valve, pump) share the
//! [`LinkId`] space; a duplicate identifier across categories is rejected by
//! the classifier.
//!
//! ## Modules
//!
//! - [`network`] - Category-keyed input records and multi-period containers
//! - [`diagnostics`] - Non-fatal issue collection
//! - [`graph_utils`] - Island detection and supply coverage
//! - [`error`] - Unified error type

use serde::{Deserialize, Serialize};

pub mod diagnostics;
pub mod error;
pub mod graph_utils;
pub mod network;

pub use diagnostics::{DiagnosticIssue, Diagnostics, Severity};
pub use error::{WdnError, WdnResult};
pub use graph_utils::{find_islands, unsupplied_islands, IslandAnalysis, IslandSummary};
pub use network::{
    Demand, DiameterOption, FlowDirection, HeadCurveForm, HeadLossMethod, LinkRecord,
    ModelInput, MultiNetworkData, NetworkData, Node, Options, PumpRecord, Reservoir, Tank,
};

// Newtype wrappers for IDs for type safety
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(usize);
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkId(usize);
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TankId(usize);
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReservoirId(usize);
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DemandId(usize);

impl NodeId {
    #[inline]
    pub fn new(value: usize) -> Self {
        NodeId(value)
    }
    #[inline]
    pub fn value(&self) -> usize {
        self.0
    }
}

impl LinkId {
    #[inline]
    pub fn new(value: usize) -> Self {
        LinkId(value)
    }
    #[inline]
    pub fn value(&self) -> usize {
        self.0
    }
}

impl TankId {
    #[inline]
    pub fn new(value: usize) -> Self {
        TankId(value)
    }
    #[inline]
    pub fn value(&self) -> usize {
        self.0
    }
}

impl ReservoirId {
    #[inline]
    pub fn new(value: usize) -> Self {
        ReservoirId(value)
    }
    #[inline]
    pub fn value(&self) -> usize {
        self.0
    }
}

impl DemandId {
    #[inline]
    pub fn new(value: usize) -> Self {
        DemandId(value)
    }
    #[inline]
    pub fn value(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Node {}", self.0)
    }
}

impl std::fmt::Display for LinkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Link {}", self.0)
    }
}

impl std::fmt::Display for TankId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Tank {}", self.0)
    }
}

impl std::fmt::Display for ReservoirId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Reservoir {}", self.0)
    }
}

impl std::fmt::Display for DemandId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Demand {}", self.0)
    }
}
