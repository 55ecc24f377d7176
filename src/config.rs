//! Decomposition settings.
//!
//! ```json
//! {
//!   "numberOfSubdomains": 4,
//!   "decomposer": "hierarchical",
//!   "coeffs": { "n": [2, 2, 1] },
//!   "constraints": [
//!     { "type": "preserveBaffles" },
//!     { "type": "singleProcessorFaceSets", "sets": [{ "name": "inlet", "processor": 0 }] }
//!   ],
//!   "debug": false
//! }
//! ```
//!
//! `method` is accepted as an alias of `decomposer`.

use serde_json::{Map, Value};

use crate::decomp_error::DecompositionError;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecompositionConfig {
    pub number_of_subdomains: usize,
    /// Registered strategy name.
    #[serde(alias = "method")]
    pub decomposer: String,
    /// Strategy options, handed to the strategy factory.
    #[serde(default)]
    pub coeffs: Value,
    /// Constraint providers, in application order.
    #[serde(default)]
    pub constraints: Vec<ConstraintConfig>,
    /// Check cross-partition consistency after every decomposition.
    #[serde(default)]
    pub debug: bool,
}

/// One `{ "type": name, ...options }` entry.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ConstraintConfig {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

impl ConstraintConfig {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            options: Map::new(),
        }
    }

    /// Options as a JSON object (without the `type` key).
    pub fn options_value(&self) -> Value {
        Value::Object(self.options.clone())
    }
}

impl DecompositionConfig {
    pub fn new(number_of_subdomains: usize, decomposer: impl Into<String>) -> Self {
        Self {
            number_of_subdomains,
            decomposer: decomposer.into(),
            coeffs: Value::Null,
            constraints: Vec::new(),
            debug: false,
        }
    }

    pub fn from_json_str(s: &str) -> Result<Self, DecompositionError> {
        let cfg: Self = serde_json::from_str(s)
            .map_err(|e| DecompositionError::InvalidConfig(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), DecompositionError> {
        if self.number_of_subdomains == 0 {
            return Err(DecompositionError::InvalidConfig(
                "numberOfSubdomains must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
