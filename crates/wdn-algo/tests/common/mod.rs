//! Shared test networks.
#![allow(dead_code)]

use wdn_algo::{ModelContext, SymbolicModel, VarKey};
use wdn_core::{
    Demand, DemandId, DiameterOption, LinkId, LinkRecord, NetworkData, Node, NodeId, PumpRecord,
    Reservoir, ReservoirId, Tank, TankId,
};

pub fn node(id: usize) -> NodeId {
    NodeId::new(id)
}

pub fn link(id: usize) -> LinkId {
    LinkId::new(id)
}

/// Reservoir at node 1 (elevation and head 100), demand 10 at node 2
/// (elevation 0), and no links.
pub fn source_and_sink() -> NetworkData {
    let mut data = NetworkData::new();
    data.node.insert(node(1), Node::new(100.0));
    data.node.insert(node(2), Node::new(0.0));
    data.reservoir
        .insert(ReservoirId::new(1), Reservoir::fixed(node(1), 100.0));
    data.demand
        .insert(DemandId::new(1), Demand::fixed(node(2), 10.0));
    data
}

/// One 1000 m Hazen-Williams pipe (D = 2, C = 130) from the reservoir to the
/// demand.
pub fn two_node_pipe() -> NetworkData {
    let mut data = source_and_sink();
    data.pipe.insert(
        link(1),
        LinkRecord::new(node(1), node(2)).with_pipe(1000.0, 2.0, 130.0),
    );
    data
}

/// Design pipe with two candidate diameters between reservoir and demand.
pub fn two_node_design() -> NetworkData {
    let mut data = source_and_sink();
    let mut record = LinkRecord::new(node(1), node(2));
    record.length = 1000.0;
    record.roughness = Some(130.0);
    record.diameters = vec![
        DiameterOption {
            diameter: 1.0,
            unit_cost: 10.0,
        },
        DiameterOption {
            diameter: 2.0,
            unit_cost: 25.0,
        },
    ];
    data.des_pipe.insert(link(1), record);
    data
}

/// Pipe record flagged as a check valve or shutoff valve.
pub fn two_node_valve_pipe(check_valve: bool, shutoff_valve: bool) -> NetworkData {
    let mut data = source_and_sink();
    let mut record = LinkRecord::new(node(1), node(2)).with_pipe(1000.0, 2.0, 130.0);
    record.check_valve = check_valve;
    record.shutoff_valve = shutoff_valve;
    data.pipe.insert(link(1), record);
    data
}

/// Stand-alone shutoff valve record (no friction) between reservoir and demand.
pub fn two_node_shutoff_valve() -> NetworkData {
    let mut data = source_and_sink();
    let mut record = LinkRecord::new(node(1), node(2));
    record.valve_type = Some("shutoff".to_string());
    data.valve.insert(link(1), record);
    data
}

/// Pressure-reducing valve holding node 2 at 20 m.
pub fn two_node_regulator() -> NetworkData {
    let mut data = source_and_sink();
    let mut record = LinkRecord::new(node(1), node(2));
    record.valve_type = Some("prv".to_string());
    record.setting = Some(20.0);
    data.valve.insert(link(1), record);
    data
}

/// Pump lifting from a reservoir at head 0 to a demand node at elevation 10.
/// The curve samples `g(q) = 30 - q²`.
pub fn pumped() -> NetworkData {
    let mut data = NetworkData::new();
    data.node.insert(node(1), Node::new(0.0));
    data.node.insert(node(2), Node::new(10.0));
    data.reservoir
        .insert(ReservoirId::new(1), Reservoir::fixed(node(1), 0.0));
    data.demand
        .insert(DemandId::new(1), Demand::fixed(node(2), 3.0));
    data.pump.insert(
        link(1),
        PumpRecord::new(node(1), node(2), vec![(1.0, 29.0), (2.0, 26.0), (3.0, 21.0)]),
    );
    data
}

/// Reservoir feeding a cylindrical tank node (D = 10, levels 1 to 5) that
/// also carries a small demand.
pub fn tank_network(time_step: Option<f64>) -> NetworkData {
    let mut data = NetworkData::new();
    data.node.insert(node(1), Node::new(50.0));
    data.node.insert(node(2), Node::new(0.0));
    data.pipe.insert(
        link(1),
        LinkRecord::new(node(1), node(2)).with_pipe(100.0, 0.3, 120.0),
    );
    data.reservoir
        .insert(ReservoirId::new(1), Reservoir::fixed(node(1), 50.0));
    data.demand
        .insert(DemandId::new(1), Demand::fixed(node(2), 1.0));
    data.tank.insert(
        TankId::new(1),
        Tank::cylinder(node(2), 10.0, 1.0, 5.0, 2.0),
    );
    data.options.time_step = time_step;
    data
}

/// Zero assignment with the listed variables set.
pub fn assign(model: &SymbolicModel, values: &[(VarKey, f64)]) -> Vec<f64> {
    let mut x = vec![0.0; model.num_variables()];
    for (key, value) in values {
        let id = model.var(*key).expect("variable declared");
        x[id.index()] = *value;
    }
    x
}

/// Largest violation among the constraints of one group.
pub fn group_violation(
    ctx: &ModelContext,
    category: wdn_algo::ConstraintCategory,
    component: wdn_algo::ComponentKey,
    x: &[f64],
) -> f64 {
    ctx.model
        .group(category, component)
        .expect("group registered")
        .iter()
        .map(|c| c.violation(x))
        .fold(0.0, f64::max)
}
