use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;

use serde::Serialize;
use wdn_core::{LinkId, NodeId, TankId};

use crate::error::{BuildError, BuildResult};

/// Constraint groups emitted by the templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintCategory {
    FlowConservation,
    Directionality,
    /// `q = q⁺ - q⁻`, `dh = dh⁺ - dh⁻` and direction coupling
    DirectedFlow,
    HeadLoss,
    CheckValve,
    ShutoffValve,
    Regulator,
    GenericValve,
    ShortPipe,
    Pump,
    PumpHeadGain,
    DesignSelection,
    TankVolume,
    TankInitialVolume,
    TankContinuity,
}

impl fmt::Display for ConstraintCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConstraintCategory::FlowConservation => "flow_conservation",
            ConstraintCategory::Directionality => "directionality",
            ConstraintCategory::DirectedFlow => "directed_flow",
            ConstraintCategory::HeadLoss => "head_loss",
            ConstraintCategory::CheckValve => "check_valve",
            ConstraintCategory::ShutoffValve => "shutoff_valve",
            ConstraintCategory::Regulator => "regulator",
            ConstraintCategory::GenericValve => "generic_valve",
            ConstraintCategory::ShortPipe => "short_pipe",
            ConstraintCategory::Pump => "pump",
            ConstraintCategory::PumpHeadGain => "pump_head_gain",
            ConstraintCategory::DesignSelection => "design_selection",
            ConstraintCategory::TankVolume => "tank_volume",
            ConstraintCategory::TankInitialVolume => "tank_initial_volume",
            ConstraintCategory::TankContinuity => "tank_continuity",
        };
        f.write_str(name)
    }
}

/// Component a constraint group belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ComponentKey {
    Node(NodeId),
    Link(LinkId),
    Tank(TankId),
}

impl fmt::Display for ComponentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentKey::Node(id) => write!(f, "{}", id),
            ComponentKey::Link(id) => write!(f, "{}", id),
            ComponentKey::Tank(id) => write!(f, "{}", id),
        }
    }
}

/// Registry key; `period` is set in flattened multi-period models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RegistryKey {
    pub category: ConstraintCategory,
    pub component: ComponentKey,
    pub period: Option<usize>,
}

/// Maps each registered key to its constraint index range. One writer per key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstraintRegistry {
    entries: BTreeMap<RegistryKey, Range<usize>>,
}

impl ConstraintRegistry {
    pub fn insert(&mut self, key: RegistryKey, range: Range<usize>) -> BuildResult<()> {
        self.check_vacant(&key)?;
        self.entries.insert(key, range);
        Ok(())
    }

    pub fn check_vacant(&self, key: &RegistryKey) -> BuildResult<()> {
        if self.entries.contains_key(key) {
            return Err(BuildError::DuplicateRegistration {
                category: key.category.to_string(),
                component: match key.period {
                    Some(p) => format!("{} in period {}", key.component, p),
                    None => key.component.to_string(),
                },
            });
        }
        Ok(())
    }

    pub fn contains(&self, key: &RegistryKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &RegistryKey) -> Option<Range<usize>> {
        self.entries.get(key).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RegistryKey, &Range<usize>)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of constraints registered under `category`.
    pub fn count(&self, category: ConstraintCategory) -> usize {
        self.entries
            .iter()
            .filter(|(k, _)| k.category == category)
            .map(|(_, r)| r.len())
            .sum()
    }
}
