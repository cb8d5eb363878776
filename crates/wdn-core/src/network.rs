//! Category-keyed network records.
//!
//! These types mirror the normalized mapping produced by upstream parsers
//! (EPANET/INP or JSON importers). They are deserialized as-is and treated as
//! immutable by model construction.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{DemandId, LinkId, NodeId, ReservoirId, TankId, WdnError, WdnResult};

/// A junction point in the network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Ground elevation (m)
    pub elevation: f64,
    /// Optional explicit minimum head (m)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head_min: Option<f64>,
    /// Optional explicit maximum head (m)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head_max: Option<f64>,
}

impl Node {
    pub fn new(elevation: f64) -> Self {
        Self {
            elevation,
            head_min: None,
            head_max: None,
        }
    }

    pub fn with_head_limits(mut self, head_min: Option<f64>, head_max: Option<f64>) -> Self {
        self.head_min = head_min;
        self.head_max = head_max;
        self
    }
}

/// Declared restriction on the sign of a link's flow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowDirection {
    Positive,
    Negative,
    #[default]
    Unknown,
}

/// One discrete diameter choice of a design-candidate pipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiameterOption {
    /// Internal diameter (m)
    pub diameter: f64,
    /// Cost per unit length
    #[serde(default)]
    pub unit_cost: f64,
}

/// Flat record shared by the `pipe`, `des_pipe`, `short_pipe` and `valve`
/// categories. Device subtype is decided by the classifier from the flags.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LinkRecord {
    pub node_fr: NodeId,
    pub node_to: NodeId,
    /// Length (m)
    #[serde(default)]
    pub length: f64,
    /// Internal diameter (m)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diameter: Option<f64>,
    /// Hazen-Williams C factor, or absolute roughness (m) for Darcy-Weisbach
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roughness: Option<f64>,
    #[serde(default)]
    pub flow_direction: FlowDirection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_max: Option<f64>,
    /// Per-link velocity limit (m/s); falls back to the global option
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_velocity: Option<f64>,
    #[serde(default)]
    pub check_valve: bool,
    #[serde(default)]
    pub shutoff_valve: bool,
    /// Valve type tag (`prv`, `tcv`, `gpv`, `shutoff`, `isolation`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valve_type: Option<String>,
    /// Regulator pressure setting (m above the downstream node elevation)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setting: Option<f64>,
    /// Candidate diameters for design pipes, in decision order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diameters: Vec<DiameterOption>,
}

impl LinkRecord {
    pub fn new(node_fr: NodeId, node_to: NodeId) -> Self {
        Self {
            node_fr,
            node_to,
            ..Self::default()
        }
    }

    pub fn with_pipe(mut self, length: f64, diameter: f64, roughness: f64) -> Self {
        self.length = length;
        self.diameter = Some(diameter);
        self.roughness = Some(roughness);
        self
    }
}

/// Functional form used to interpret a pump head curve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeadCurveForm {
    #[default]
    Quadratic,
    BestEfficiencyPoint,
}

/// Pump record with its sampled head-gain curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PumpRecord {
    pub node_fr: NodeId,
    pub node_to: NodeId,
    /// Ordered `(flow, head_gain)` samples
    #[serde(default)]
    pub head_curve: Vec<(f64, f64)>,
    #[serde(default)]
    pub head_curve_form: HeadCurveForm,
    /// Minimum forward flow while the pump runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_min_forward: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_max: Option<f64>,
}

impl PumpRecord {
    pub fn new(node_fr: NodeId, node_to: NodeId, head_curve: Vec<(f64, f64)>) -> Self {
        Self {
            node_fr,
            node_to,
            head_curve,
            head_curve_form: HeadCurveForm::Quadratic,
            flow_min_forward: None,
            flow_max: None,
        }
    }
}

/// Storage tank attached to a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tank {
    pub node: NodeId,
    /// Cylinder diameter (m)
    pub diameter: f64,
    pub min_level: f64,
    pub max_level: f64,
    pub init_level: f64,
    /// Declared minimum volume (m^3)
    #[serde(default)]
    pub min_vol: f64,
    /// Level-to-volume curve for non-cylindrical tanks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_curve: Option<Vec<(f64, f64)>>,
    #[serde(default)]
    pub dispatchable: bool,
}

impl Tank {
    pub fn cylinder(node: NodeId, diameter: f64, min_level: f64, max_level: f64, init_level: f64) -> Self {
        Self {
            node,
            diameter,
            min_level,
            max_level,
            init_level,
            min_vol: 0.0,
            volume_curve: None,
            dispatchable: false,
        }
    }
}

/// Fixed-head (or head-ranged) source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservoir {
    pub node: NodeId,
    pub head_nominal: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head_max: Option<f64>,
    #[serde(default)]
    pub dispatchable: bool,
}

impl Reservoir {
    pub fn fixed(node: NodeId, head: f64) -> Self {
        Self {
            node,
            head_nominal: head,
            head_min: None,
            head_max: None,
            dispatchable: false,
        }
    }
}

/// Withdrawal at a node (negative values inject water).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Demand {
    pub node: NodeId,
    pub flow_nominal: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_max: Option<f64>,
    #[serde(default)]
    pub dispatchable: bool,
}

impl Demand {
    pub fn fixed(node: NodeId, flow: f64) -> Self {
        Self {
            node,
            flow_nominal: flow,
            flow_min: None,
            flow_max: None,
            dispatchable: false,
        }
    }
}

/// Friction head-loss law.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeadLossMethod {
    /// Hazen-Williams (exponent 1.852)
    #[default]
    #[serde(rename = "hw", alias = "h-w", alias = "hazen_williams")]
    HazenWilliams,
    /// Darcy-Weisbach (exponent 2.0)
    #[serde(rename = "dw", alias = "d-w", alias = "darcy_weisbach")]
    DarcyWeisbach,
}

impl HeadLossMethod {
    /// Head-loss exponent `alpha`
    pub fn exponent(&self) -> f64 {
        match self {
            HeadLossMethod::HazenWilliams => 1.852,
            HeadLossMethod::DarcyWeisbach => 2.0,
        }
    }
}

/// Global network options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    pub head_loss: HeadLossMethod,
    /// Kinematic viscosity (m^2/s)
    pub viscosity: f64,
    /// Nominal velocity used to evaluate the Reynolds number (m/s)
    pub base_speed: f64,
    /// Global velocity limit (m/s)
    pub max_velocity: Option<f64>,
    /// Duration of one period (s)
    pub time_step: Option<f64>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            head_loss: HeadLossMethod::HazenWilliams,
            viscosity: 1.0e-6,
            base_speed: 1.0,
            max_velocity: None,
            time_step: None,
        }
    }
}

/// Single-period network description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkData {
    pub node: BTreeMap<NodeId, Node>,
    pub pipe: BTreeMap<LinkId, LinkRecord>,
    pub des_pipe: BTreeMap<LinkId, LinkRecord>,
    pub short_pipe: BTreeMap<LinkId, LinkRecord>,
    pub valve: BTreeMap<LinkId, LinkRecord>,
    pub pump: BTreeMap<LinkId, PumpRecord>,
    pub tank: BTreeMap<TankId, Tank>,
    pub reservoir: BTreeMap<ReservoirId, Reservoir>,
    pub demand: BTreeMap<DemandId, Demand>,
    pub options: Options,
}

impl NetworkData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(json: &str) -> WdnResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Number of link records over every link category
    pub fn num_links(&self) -> usize {
        self.pipe.len()
            + self.des_pipe.len()
            + self.short_pipe.len()
            + self.valve.len()
            + self.pump.len()
    }

    /// Endpoints of every link record, across categories.
    pub fn link_endpoints(&self) -> impl Iterator<Item = (LinkId, NodeId, NodeId)> + '_ {
        let records = self
            .pipe
            .iter()
            .chain(self.des_pipe.iter())
            .chain(self.short_pipe.iter())
            .chain(self.valve.iter())
            .map(|(id, link)| (*id, link.node_fr, link.node_to));
        let pumps = self
            .pump
            .iter()
            .map(|(id, pump)| (*id, pump.node_fr, pump.node_to));
        records.chain(pumps)
    }
}

/// Ordered sequence of per-period networks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MultiNetworkData {
    #[serde(default)]
    pub multinetwork: bool,
    /// Shared period duration (s); per-period options take precedence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_step: Option<f64>,
    pub nw: BTreeMap<usize, NetworkData>,
}

impl MultiNetworkData {
    pub fn new(time_step: Option<f64>) -> Self {
        Self {
            multinetwork: true,
            time_step,
            nw: BTreeMap::new(),
        }
    }

    pub fn with_period(mut self, index: usize, network: NetworkData) -> Self {
        self.nw.insert(index, network);
        self
    }

    /// Period duration for the period at `index`.
    pub fn time_step_for(&self, index: usize) -> Option<f64> {
        self.nw
            .get(&index)
            .and_then(|network| network.options.time_step)
            .or(self.time_step)
    }
}

/// Either shape of input accepted by the model builder.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelInput {
    Single(NetworkData),
    MultiPeriod(MultiNetworkData),
}

impl ModelInput {
    /// Decode either shape, using the top-level `multinetwork` flag.
    pub fn from_json_str(json: &str) -> WdnResult<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let is_multi = value
            .get("multinetwork")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false);
        if is_multi {
            let data: MultiNetworkData = serde_json::from_value(value)?;
            if data.nw.is_empty() {
                return Err(WdnError::Validation(
                    "multinetwork input has no periods".to_string(),
                ));
            }
            Ok(ModelInput::MultiPeriod(data))
        } else {
            Ok(ModelInput::Single(serde_json::from_value(value)?))
        }
    }

    pub fn is_multi_period(&self) -> bool {
        matches!(self, ModelInput::MultiPeriod(_))
    }
}

impl From<NetworkData> for ModelInput {
    fn from(data: NetworkData) -> Self {
        ModelInput::Single(data)
    }
}

impl From<MultiNetworkData> for ModelInput {
    fn from(data: MultiNetworkData) -> Self {
        ModelInput::MultiPeriod(data)
    }
}
