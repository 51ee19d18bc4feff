//! Execution phases, logical phases and name scoping.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::NetworkError;

/// Binary execution mode carried by `include`/`exclude` rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PhaseTag {
    Train,
    Test,
}

impl PhaseTag {
    /// Enum value as written in prototxt.
    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseTag::Train => "TRAIN",
            PhaseTag::Test => "TEST",
        }
    }

    pub fn from_ident(ident: &str) -> Option<Self> {
        match ident {
            "TRAIN" => Some(PhaseTag::Train),
            "TEST" => Some(PhaseTag::Test),
            _ => None,
        }
    }

    /// Enum value written as its number (`phase: 1`).
    pub fn from_number(number: i32) -> Option<Self> {
        match number {
            0 => Some(PhaseTag::Train),
            1 => Some(PhaseTag::Test),
            _ => None,
        }
    }
}

impl fmt::Display for PhaseTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logical phase a caller asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Training forward/backward pass.
    Train,
    /// Validation (TEST) pass during training.
    Val,
    /// Everything used while training: train plus val.
    TrainVal,
    /// Inference network shipped with the model.
    Deploy,
}

impl Phase {
    pub const ALL: [Phase; 4] = [Phase::Train, Phase::Val, Phase::TrainVal, Phase::Deploy];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Train => "train",
            Phase::Val => "val",
            Phase::TrainVal => "trainval",
            Phase::Deploy => "deploy",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "train" => Ok(Phase::Train),
            "val" => Ok(Phase::Val),
            "trainval" => Ok(Phase::TrainVal),
            "deploy" => Ok(Phase::Deploy),
            other => Err(NetworkError::InvalidArgument(format!(
                "unknown phase \"{}\" (expected train, val, trainval or deploy)",
                other
            ))),
        }
    }
}

/// Phase scoping encoded in a layer name prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NameScope {
    /// `train_`: train, val and trainval only.
    Train,
    /// `deploy_`: deploy only.
    Deploy,
}

impl NameScope {
    pub fn prefix(&self) -> &'static str {
        match self {
            NameScope::Train => "train_",
            NameScope::Deploy => "deploy_",
        }
    }

    /// Scope encoded in `name`, if any.
    pub fn of(name: &str) -> Option<Self> {
        if name.starts_with(NameScope::Train.prefix()) {
            Some(NameScope::Train)
        } else if name.starts_with(NameScope::Deploy.prefix()) {
            Some(NameScope::Deploy)
        } else {
            None
        }
    }

    /// `name` without its scoping prefix.
    pub fn strip(name: &str) -> &str {
        match Self::of(name) {
            Some(scope) => &name[scope.prefix().len()..],
            None => name,
        }
    }
}
