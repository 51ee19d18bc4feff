//! Structural checks on projected networks.

use indexmap::IndexSet;

use crate::error::{NetworkError, Result};
use crate::model::{NetDocument, Phase};

/// Validation configuration.
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    /// Blobs fed from outside the network; bottoms may reference them
    /// without a producing layer.
    pub external_inputs: Vec<String>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            external_inputs: vec!["data".to_string(), "label".to_string()],
        }
    }
}

/// Checks that a projected network is non-empty and fully connected by name.
pub struct Validator {
    config: ValidationConfig,
}

impl Validator {
    /// Create a validator with default configuration.
    pub fn new() -> Self {
        Self::with_config(ValidationConfig::default())
    }

    /// Create a validator with custom configuration.
    pub fn with_config(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Validate the projection of a network for `phase`.
    ///
    /// Fails on the first problem: no layers, or the first bottom (in order
    /// of appearance) that no layer produces and that is not an external
    /// input.
    pub fn validate(&self, network: &NetDocument, phase: Phase) -> Result<()> {
        if network.is_empty() {
            return Err(NetworkError::Validation(format!("{} network: no layers", phase)));
        }

        let bottoms = bottoms(network);
        let tops = tops(network);

        let missing = bottoms.iter().find(|bottom| {
            !tops.contains(*bottom) && !self.config.external_inputs.iter().any(|e| e == *bottom)
        });

        match missing {
            Some(bottom) => Err(NetworkError::Validation(format!(
                "{} network: unknown layer.bottom \"{}\"",
                phase, bottom
            ))),
            None => Ok(()),
        }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique bottoms of the network, in first-seen order.
pub fn bottoms(network: &NetDocument) -> IndexSet<&str> {
    network
        .layers
        .iter()
        .flat_map(|l| l.bottom.iter().map(String::as_str))
        .collect()
}

/// Unique tops of the network, in first-seen order.
pub fn tops(network: &NetDocument) -> IndexSet<&str> {
    network
        .layers
        .iter()
        .flat_map(|l| l.top.iter().map(String::as_str))
        .collect()
}
