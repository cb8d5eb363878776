//! JSON export of a built model for inspection and hand-off to external
//! solvers.

use std::path::Path;

use serde::Serialize;
use wdn_core::{WdnError, WdnResult};

use super::{ComponentKey, Constraint, ConstraintCategory, Expr, SymbolicModel, Variable};
use crate::formulation::ProblemClass;

#[derive(Serialize)]
struct ModelDocument<'a> {
    problem_class: ProblemClass,
    variables: &'a [Variable],
    constraints: &'a [Constraint],
    groups: Vec<GroupEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    objective: Option<&'a Expr>,
}

#[derive(Serialize)]
struct GroupEntry {
    category: ConstraintCategory,
    component: ComponentKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    period: Option<usize>,
    start: usize,
    end: usize,
}

impl SymbolicModel {
    fn document(&self) -> ModelDocument<'_> {
        let groups = self
            .registry
            .iter()
            .map(|(key, range)| GroupEntry {
                category: key.category,
                component: key.component,
                period: key.period,
                start: range.start,
                end: range.end,
            })
            .collect();
        ModelDocument {
            problem_class: self.problem_class(),
            variables: &self.variables,
            constraints: &self.constraints,
            groups,
            objective: self.objective.as_ref(),
        }
    }

    /// Convert to a JSON value (variables, constraints and the registry as
    /// index ranges).
    pub fn to_json_value(&self) -> WdnResult<serde_json::Value> {
        Ok(serde_json::to_value(self.document())?)
    }

    /// Write the model as pretty-printed JSON.
    pub fn to_json(&self, path: &Path) -> WdnResult<()> {
        let json = serde_json::to_string_pretty(&self.document())?;
        std::fs::write(path, json).map_err(|e| {
            WdnError::Io(std::io::Error::new(
                e.kind(),
                format!("writing model to {}: {}", path.display(), e),
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use wdn_core::NodeId;

    use super::*;
    use crate::bounds::Interval;
    use crate::model::VarKey;

    #[test]
    fn registry_is_exported_as_index_ranges() {
        let mut model = SymbolicModel::new();
        let h = model
            .add_continuous(VarKey::Head(NodeId::new(4)), Interval::new(0.0, 10.0))
            .unwrap();
        model
            .register(
                ConstraintCategory::FlowConservation,
                ComponentKey::Node(NodeId::new(4)),
                vec![Constraint::eq("flow_conservation[4]", Expr::var(h), 2.0)],
            )
            .unwrap();

        let value = model.to_json_value().unwrap();
        assert_eq!(value["variables"].as_array().unwrap().len(), 1);
        assert_eq!(value["constraints"][0]["name"], "flow_conservation[4]");
        assert_eq!(value["groups"][0]["category"], "flow_conservation");
        assert_eq!(value["groups"][0]["end"], 1);
        assert!(value.get("objective").is_none());
    }

    #[test]
    fn writes_pretty_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        SymbolicModel::new().to_json(&path).unwrap();
        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed["constraints"].as_array().unwrap().len(), 0);
    }
}
