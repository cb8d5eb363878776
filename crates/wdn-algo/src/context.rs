//! Single-network model construction.
//!
//! A [`ModelContext`] owns everything one build produces: the classified
//! network, its bound tables and the symbolic model. It is created by
//! [`ModelContext::build`], optionally handed to a solver backend, then
//! dropped.

use std::collections::BTreeMap;

use tracing::info;
use wdn_core::{Diagnostics, ModelInput, NetworkData};

use crate::backend::{SolveOptions, SolveOutcome, SolverBackend};
use crate::bounds::Bounds;
use crate::config::BuildConfig;
use crate::error::{BuildError, BuildResult};
use crate::formulation::Formulation;
use crate::model::{SymbolicModel, VarKey};
use crate::reference::NetworkRef;
use crate::templates::{build_all, TemplateInput};

/// Position of a network in the horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodRole {
    /// Stand-alone network
    Single,
    /// First period of a time-expanded model
    First,
    /// Any later period
    Subsequent,
}

impl PeriodRole {
    /// Whether non-dispatchable tanks start at their initial level here.
    pub fn fixes_initial_volume(&self) -> bool {
        matches!(self, PeriodRole::Single | PeriodRole::First)
    }
}

#[derive(Debug, Clone)]
pub struct ModelContext {
    pub config: BuildConfig,
    pub role: PeriodRole,
    pub reference: NetworkRef,
    pub bounds: Bounds,
    pub model: SymbolicModel,
}

impl ModelContext {
    /// Build the model of a single-period input.
    pub fn build(input: &ModelInput, config: &BuildConfig) -> BuildResult<Self> {
        match input {
            ModelInput::Single(data) => Self::build_network(data, config, PeriodRole::Single),
            ModelInput::MultiPeriod(_) => Err(BuildError::ModeMismatch {
                expected: "single-period",
                found: "multi-period",
            }),
        }
    }

    /// Classify, bound and template one network.
    pub fn build_network(
        data: &NetworkData,
        config: &BuildConfig,
        role: PeriodRole,
    ) -> BuildResult<Self> {
        config
            .validate()
            .map_err(|e| BuildError::InvalidInput(e.to_string()))?;

        let reference = NetworkRef::build(data, config.tanks_dispatchable)?;
        let bounds = Bounds::compute(&reference, config)?;
        let mut model = SymbolicModel::new();
        let input = TemplateInput {
            reference: &reference,
            bounds: &bounds,
            config,
            role,
        };
        build_all(&mut model, &input)?;

        info!(
            formulation = %config.formulation,
            class = %model.problem_class(),
            variables = model.num_variables(),
            binaries = model.num_binaries(),
            constraints = model.num_constraints(),
            warnings = reference.diagnostics.warning_count(),
            "model built"
        );

        Ok(Self {
            config: config.clone(),
            role,
            reference,
            bounds,
            model,
        })
    }

    pub fn formulation(&self) -> Formulation {
        self.config.formulation
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.reference.diagnostics
    }

    /// Hand the model to `backend`.
    pub fn solve(
        &self,
        backend: &dyn SolverBackend,
        options: &SolveOptions,
    ) -> BuildResult<SolveOutcome> {
        backend.solve(&self.model, options)
    }

    /// Values of `outcome` keyed by variable identity. Empty when the solve
    /// produced no values.
    pub fn solution(&self, outcome: &SolveOutcome) -> BTreeMap<VarKey, f64> {
        if outcome.values.len() != self.model.num_variables() {
            return BTreeMap::new();
        }
        self.model
            .variables()
            .iter()
            .zip(&outcome.values)
            .map(|(var, value)| (var.key, *value))
            .collect()
    }

    pub fn into_model(self) -> SymbolicModel {
        self.model
    }
}
