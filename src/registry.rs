//! Named factories for strategies and constraint providers.
//!
//! [`Registry::with_builtins`] knows every strategy and provider shipped with
//! the crate; [`Registry::global`] is a process-wide read-only instance of it.
//! Applications with their own strategies build a registry explicitly and
//! pass it to [`Decomposer::from_config`](crate::decompose::Decomposer::from_config).

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::constraints::{
    DecompositionConstraint, PreserveBaffles, PreserveFaceZones, PreservePatches,
    SingleProcessorFaceSets,
};
use crate::decomp_error::DecompositionError;
use crate::partitioning::{DecompositionStrategy, Hierarchical, Linear};

pub type StrategyFactory =
    fn(&Value) -> Result<Box<dyn DecompositionStrategy>, DecompositionError>;
pub type ConstraintFactory =
    fn(&Value) -> Result<Box<dyn DecompositionConstraint>, DecompositionError>;

#[derive(Debug, Clone, Default)]
pub struct Registry {
    strategies: BTreeMap<String, StrategyFactory>,
    constraints: BTreeMap<String, ConstraintFactory>,
}

static GLOBAL: Lazy<Registry> = Lazy::new(Registry::with_builtins);

/// Deserialize options; `null` means "all defaults".
pub fn parse_options<T: DeserializeOwned>(what: &str, v: &Value) -> Result<T, DecompositionError> {
    let v = if v.is_null() {
        Value::Object(Default::default())
    } else {
        v.clone()
    };
    serde_json::from_value(v)
        .map_err(|e| DecompositionError::InvalidConfig(format!("{what}: {e}")))
}

impl Registry {
    /// Registry without any entries.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut r = Self::empty();
        r.register_strategy("linear", |_| Ok(Box::new(Linear)));
        r.register_strategy("hierarchical", |v| {
            Ok(Box::new(parse_options::<Hierarchical>("hierarchical", v)?))
        });
        #[cfg(feature = "metis-support")]
        r.register_strategy("metis", |v| {
            Ok(Box::new(parse_options::<crate::partitioning::Metis>("metis", v)?))
        });

        r.register_constraint("preserveBaffles", |_| Ok(Box::new(PreserveBaffles)));
        r.register_constraint("preservePatches", |v| {
            Ok(Box::new(parse_options::<PreservePatches>("preservePatches", v)?))
        });
        r.register_constraint("preserveFaceZones", |v| {
            Ok(Box::new(parse_options::<PreserveFaceZones>("preserveFaceZones", v)?))
        });
        r.register_constraint("singleProcessorFaceSets", |v| {
            Ok(Box::new(parse_options::<SingleProcessorFaceSets>(
                "singleProcessorFaceSets",
                v,
            )?))
        });
        r
    }

    /// Shared registry of the built-in entries.
    pub fn global() -> &'static Registry {
        &GLOBAL
    }

    pub fn register_strategy(&mut self, name: impl Into<String>, factory: StrategyFactory) {
        self.strategies.insert(name.into(), factory);
    }

    pub fn register_constraint(&mut self, name: impl Into<String>, factory: ConstraintFactory) {
        self.constraints.insert(name.into(), factory);
    }

    /// Sorted names of the registered strategies.
    pub fn strategy_names(&self) -> Vec<String> {
        self.strategies.keys().cloned().collect()
    }

    /// Sorted names of the registered constraint providers.
    pub fn constraint_names(&self) -> Vec<String> {
        self.constraints.keys().cloned().collect()
    }

    pub fn strategy(
        &self,
        name: &str,
        coeffs: &Value,
    ) -> Result<Box<dyn DecompositionStrategy>, DecompositionError> {
        let factory = self
            .strategies
            .get(name)
            .ok_or_else(|| DecompositionError::UnknownStrategy {
                name: name.to_string(),
                valid: self.strategy_names(),
            })?;
        factory(coeffs)
    }

    pub fn constraint(
        &self,
        name: &str,
        options: &Value,
    ) -> Result<Box<dyn DecompositionConstraint>, DecompositionError> {
        let factory = self
            .constraints
            .get(name)
            .ok_or_else(|| DecompositionError::UnknownConstraint {
                name: name.to_string(),
                valid: self.constraint_names(),
            })?;
        factory(options)
    }
}
