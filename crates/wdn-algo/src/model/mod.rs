//! Formulation-agnostic symbolic model.
//!
//! The [`SymbolicModel`] owns the variable store, the constraint list and the
//! constraint registry of one build. Templates receive it by mutable
//! reference; once built it is handed to a solver backend (or flattened into
//! a multi-period model) and discarded.

mod export;
mod expr;
mod registry;

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;

use serde::Serialize;
use wdn_core::{DemandId, LinkId, NodeId, ReservoirId, TankId};

pub use expr::{Constraint, Expr, NonlinearTerm, Sense};
pub use registry::{ComponentKey, ConstraintCategory, ConstraintRegistry, RegistryKey};

use crate::bounds::Interval;
use crate::error::{BuildError, BuildResult};
use crate::formulation::ProblemClass;

/// Dense index of a variable within one model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct VarId(usize);

impl VarId {
    pub fn new(index: usize) -> Self {
        VarId(index)
    }

    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VarKind {
    Continuous,
    Binary,
}

/// Semantic identity of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum VarKey {
    Head(NodeId),
    Flow(LinkId),
    FlowPos(LinkId),
    FlowNeg(LinkId),
    HeadDiffPos(LinkId),
    HeadDiffNeg(LinkId),
    /// 1 when flow runs from `node_fr` to `node_to`
    Direction(LinkId),
    /// Shutoff valve open in the forward direction
    OpenForward(LinkId),
    /// Shutoff valve open in the reverse direction
    OpenReverse(LinkId),
    /// On/off state of a switchable device
    Status(LinkId),
    HeadGain(LinkId),
    CandidateFlow(LinkId, usize),
    CandidateFlowPos(LinkId, usize),
    CandidateFlowNeg(LinkId, usize),
    Selection(LinkId, usize),
    ReservoirFlow(ReservoirId),
    /// Outflow from a tank into the network
    TankFlow(TankId),
    TankVolume(TankId),
    DemandFlow(DemandId),
}

impl fmt::Display for VarKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarKey::Head(n) => write!(f, "h[{}]", n.value()),
            VarKey::Flow(l) => write!(f, "q[{}]", l.value()),
            VarKey::FlowPos(l) => write!(f, "q_pos[{}]", l.value()),
            VarKey::FlowNeg(l) => write!(f, "q_neg[{}]", l.value()),
            VarKey::HeadDiffPos(l) => write!(f, "dh_pos[{}]", l.value()),
            VarKey::HeadDiffNeg(l) => write!(f, "dh_neg[{}]", l.value()),
            VarKey::Direction(l) => write!(f, "y[{}]", l.value()),
            VarKey::OpenForward(l) => write!(f, "y_fwd[{}]", l.value()),
            VarKey::OpenReverse(l) => write!(f, "y_rev[{}]", l.value()),
            VarKey::Status(l) => write!(f, "z[{}]", l.value()),
            VarKey::HeadGain(l) => write!(f, "g[{}]", l.value()),
            VarKey::CandidateFlow(l, k) => write!(f, "q_des[{},{}]", l.value(), k),
            VarKey::CandidateFlowPos(l, k) => write!(f, "q_des_pos[{},{}]", l.value(), k),
            VarKey::CandidateFlowNeg(l, k) => write!(f, "q_des_neg[{},{}]", l.value(), k),
            VarKey::Selection(l, k) => write!(f, "x_des[{},{}]", l.value(), k),
            VarKey::ReservoirFlow(r) => write!(f, "q_res[{}]", r.value()),
            VarKey::TankFlow(t) => write!(f, "q_tank[{}]", t.value()),
            VarKey::TankVolume(t) => write!(f, "V[{}]", t.value()),
            VarKey::DemandFlow(d) => write!(f, "q_dem[{}]", d.value()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Variable {
    pub key: VarKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<usize>,
    pub kind: VarKind,
    pub lower: f64,
    pub upper: f64,
    pub name: String,
}

/// A constraint or bound not satisfied at an assignment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub name: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SymbolicModel {
    variables: Vec<Variable>,
    lookup: BTreeMap<(Option<usize>, VarKey), VarId>,
    constraints: Vec<Constraint>,
    registry: ConstraintRegistry,
    objective: Option<Expr>,
}

impl SymbolicModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_variable(
        &mut self,
        key: VarKey,
        kind: VarKind,
        lower: f64,
        upper: f64,
    ) -> BuildResult<VarId> {
        self.add_scoped_variable(None, key, kind, lower, upper)
    }

    pub fn add_continuous(&mut self, key: VarKey, bounds: Interval) -> BuildResult<VarId> {
        self.add_variable(key, VarKind::Continuous, bounds.min, bounds.max)
    }

    fn add_scoped_variable(
        &mut self,
        period: Option<usize>,
        key: VarKey,
        kind: VarKind,
        lower: f64,
        upper: f64,
    ) -> BuildResult<VarId> {
        let name = match period {
            Some(p) => format!("{}@{}", key, p),
            None => key.to_string(),
        };
        if self.lookup.contains_key(&(period, key)) {
            return Err(BuildError::DuplicateVariable(name));
        }
        if !(lower <= upper) {
            return Err(BuildError::InvalidBounds {
                entity: name,
                min: lower,
                max: upper,
            });
        }
        let id = VarId(self.variables.len());
        self.variables.push(Variable {
            key,
            period,
            kind,
            lower,
            upper,
            name,
        });
        self.lookup.insert((period, key), id);
        Ok(id)
    }

    /// Declared variable for `key`.
    pub fn var(&self, key: VarKey) -> BuildResult<VarId> {
        self.find(key)
            .ok_or_else(|| BuildError::MissingVariable(key.to_string()))
    }

    pub fn find(&self, key: VarKey) -> Option<VarId> {
        self.lookup.get(&(None, key)).copied()
    }

    /// Variable of a flattened multi-period model.
    pub fn var_at(&self, period: usize, key: VarKey) -> BuildResult<VarId> {
        self.lookup
            .get(&(Some(period), key))
            .copied()
            .ok_or_else(|| BuildError::MissingVariable(format!("{}@{}", key, period)))
    }

    pub fn variable(&self, id: VarId) -> &Variable {
        &self.variables[id.0]
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn registry(&self) -> &ConstraintRegistry {
        &self.registry
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn num_binaries(&self) -> usize {
        self.variables
            .iter()
            .filter(|v| v.kind == VarKind::Binary)
            .count()
    }

    /// Append a constraint group. Each (category, component) pair may be
    /// registered once per model.
    pub fn register(
        &mut self,
        category: ConstraintCategory,
        component: ComponentKey,
        constraints: Vec<Constraint>,
    ) -> BuildResult<Range<usize>> {
        let key = RegistryKey {
            category,
            component,
            period: None,
        };
        self.register_key(key, constraints)
    }

    fn register_key(
        &mut self,
        key: RegistryKey,
        constraints: Vec<Constraint>,
    ) -> BuildResult<Range<usize>> {
        self.registry.check_vacant(&key)?;
        for c in &constraints {
            for var in c.expr.vars() {
                if var.0 >= self.variables.len() {
                    return Err(BuildError::MissingVariable(format!("#{}", var.0)));
                }
            }
        }
        let start = self.constraints.len();
        self.constraints.extend(constraints);
        let range = start..self.constraints.len();
        self.registry.insert(key, range.clone())?;
        Ok(range)
    }

    /// Constraints registered under (`category`, `component`).
    pub fn group(&self, category: ConstraintCategory, component: ComponentKey) -> Option<&[Constraint]> {
        let key = RegistryKey {
            category,
            component,
            period: None,
        };
        self.registry.get(&key).map(|r| &self.constraints[r])
    }

    pub fn group_at(
        &self,
        period: usize,
        category: ConstraintCategory,
        component: ComponentKey,
    ) -> Option<&[Constraint]> {
        let key = RegistryKey {
            category,
            component,
            period: Some(period),
        };
        self.registry.get(&key).map(|r| &self.constraints[r])
    }

    /// Set a linear objective to minimize. Without one the model is a
    /// feasibility problem.
    pub fn set_objective(&mut self, objective: Expr) -> BuildResult<()> {
        if !objective.is_linear() {
            return Err(BuildError::InvalidInput(
                "objective must be linear".to_string(),
            ));
        }
        self.objective = Some(objective);
        Ok(())
    }

    pub fn objective(&self) -> Option<&Expr> {
        self.objective.as_ref()
    }

    pub fn problem_class(&self) -> ProblemClass {
        let has_integers = self.variables.iter().any(|v| v.kind == VarKind::Binary);
        let has_nonlinear = self.constraints.iter().any(|c| !c.expr.is_linear());
        ProblemClass::from_parts(has_integers, has_nonlinear)
    }

    /// Every bound, integrality and constraint violation larger than `tol`
    /// at `values` (indexed by [`VarId`]).
    pub fn violations(&self, values: &[f64], tol: f64) -> Vec<Violation> {
        let mut found = Vec::new();
        if values.len() != self.variables.len() {
            found.push(Violation {
                name: format!(
                    "expected {} values, got {}",
                    self.variables.len(),
                    values.len()
                ),
                amount: f64::INFINITY,
            });
            return found;
        }
        for (var, value) in self.variables.iter().zip(values) {
            let below = var.lower - value;
            let above = value - var.upper;
            if below > tol || above > tol {
                found.push(Violation {
                    name: format!("bounds of {}", var.name),
                    amount: below.max(above),
                });
            }
            if var.kind == VarKind::Binary {
                let frac = (value - value.round()).abs();
                if frac > tol {
                    found.push(Violation {
                        name: format!("integrality of {}", var.name),
                        amount: frac,
                    });
                }
            }
        }
        for c in &self.constraints {
            let amount = c.violation(values);
            if amount > tol {
                found.push(Violation {
                    name: c.name.clone(),
                    amount,
                });
            }
        }
        found
    }

    /// Copy every variable and constraint of `other` into this model under
    /// `period`. Returns the new id of each of `other`'s variables.
    pub fn absorb_period(&mut self, period: usize, other: &SymbolicModel) -> BuildResult<Vec<VarId>> {
        let mut mapping = Vec::with_capacity(other.variables.len());
        for var in &other.variables {
            let id = self.add_scoped_variable(Some(period), var.key, var.kind, var.lower, var.upper)?;
            mapping.push(id);
        }
        let remap = |v: VarId| mapping[v.0];
        for (key, range) in other.registry.iter() {
            let scoped = RegistryKey {
                period: Some(period),
                ..*key
            };
            let constraints = other.constraints[range.clone()]
                .iter()
                .map(|c| Constraint {
                    name: format!("{}@{}", c.name, period),
                    expr: c.expr.remap(&remap),
                    sense: c.sense,
                    rhs: c.rhs,
                })
                .collect();
            self.register_key(scoped, constraints)?;
        }
        if let Some(objective) = &other.objective {
            let shifted = objective.remap(&remap);
            let merged = match self.objective.take() {
                Some(existing) => existing.plus(shifted),
                None => shifted,
            };
            self.objective = Some(merged);
        }
        Ok(mapping)
    }

    /// Register a linking constraint group of a flattened model.
    pub fn register_at(
        &mut self,
        period: usize,
        category: ConstraintCategory,
        component: ComponentKey,
        constraints: Vec<Constraint>,
    ) -> BuildResult<Range<usize>> {
        let key = RegistryKey {
            category,
            component,
            period: Some(period),
        };
        self.register_key(key, constraints)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_variables_and_registrations_fail() {
        let mut model = SymbolicModel::new();
        let h = model
            .add_continuous(VarKey::Head(NodeId::new(1)), Interval::new(0.0, 10.0))
            .unwrap();
        assert!(matches!(
            model.add_continuous(VarKey::Head(NodeId::new(1)), Interval::new(0.0, 1.0)),
            Err(BuildError::DuplicateVariable(_))
        ));

        let component = ComponentKey::Node(NodeId::new(1));
        let c = Constraint::eq("fix", Expr::var(h), 3.0);
        model
            .register(ConstraintCategory::FlowConservation, component, vec![c.clone()])
            .unwrap();
        assert!(matches!(
            model.register(ConstraintCategory::FlowConservation, component, vec![c]),
            Err(BuildError::DuplicateRegistration { .. })
        ));
        assert_eq!(model.num_constraints(), 1);
    }

    #[test]
    fn missing_variable_is_reported() {
        let model = SymbolicModel::new();
        let err = model.var(VarKey::Flow(LinkId::new(3))).unwrap_err();
        assert_eq!(err.to_string(), "variable q[3] has not been declared");
    }

    #[test]
    fn problem_class_follows_content() {
        let mut model = SymbolicModel::new();
        let q = model
            .add_continuous(VarKey::Flow(LinkId::new(1)), Interval::new(-1.0, 1.0))
            .unwrap();
        assert_eq!(model.problem_class(), ProblemClass::LinearProgram);
        model
            .add_variable(VarKey::Status(LinkId::new(1)), VarKind::Binary, 0.0, 1.0)
            .unwrap();
        assert_eq!(model.problem_class(), ProblemClass::MixedIntegerLinear);
        model
            .register(
                ConstraintCategory::HeadLoss,
                ComponentKey::Link(LinkId::new(1)),
                vec![Constraint::eq("hl", Expr::new().signed_power(q, 1.0, 2.0), 0.0)],
            )
            .unwrap();
        assert_eq!(model.problem_class(), ProblemClass::MixedIntegerNonlinear);
    }

    #[test]
    fn violations_cover_bounds_integrality_and_rows() {
        let mut model = SymbolicModel::new();
        let x = model
            .add_continuous(VarKey::Flow(LinkId::new(1)), Interval::new(0.0, 2.0))
            .unwrap();
        let z = model
            .add_variable(VarKey::Status(LinkId::new(1)), VarKind::Binary, 0.0, 1.0)
            .unwrap();
        model
            .register(
                ConstraintCategory::CheckValve,
                ComponentKey::Link(LinkId::new(1)),
                vec![Constraint::le("cap", Expr::var(x).term(z, -2.0), 0.0)],
            )
            .unwrap();
        assert!(model.violations(&[1.0, 1.0], 1e-9).is_empty());
        let found = model.violations(&[3.0, 0.5], 1e-9);
        let names: Vec<&str> = found.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["bounds of q[1]", "integrality of z[1]", "cap"]);
    }

    #[test]
    fn absorb_period_scopes_names_and_keys() {
        let mut period = SymbolicModel::new();
        let v = period
            .add_continuous(VarKey::TankVolume(TankId::new(1)), Interval::new(1.0, 5.0))
            .unwrap();
        period
            .register(
                ConstraintCategory::TankVolume,
                ComponentKey::Tank(TankId::new(1)),
                vec![Constraint::eq("volume", Expr::var(v), 2.0)],
            )
            .unwrap();

        let mut flat = SymbolicModel::new();
        flat.absorb_period(1, &period).unwrap();
        let mapping = flat.absorb_period(2, &period).unwrap();
        assert_eq!(mapping, vec![VarId::new(1)]);
        assert_eq!(flat.num_variables(), 2);
        assert_eq!(flat.variable(mapping[0]).name, "V[1]@2");
        assert_eq!(
            flat.var_at(2, VarKey::TankVolume(TankId::new(1))).unwrap(),
            VarId::new(1)
        );
        let group = flat
            .group_at(2, ConstraintCategory::TankVolume, ComponentKey::Tank(TankId::new(1)))
            .unwrap();
        assert_eq!(group[0].expr.linear, vec![(VarId::new(1), 1.0)]);
    }
}
