pub mod errors;

pub use errors::{HpoError, HpoErrorCategory};

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    #[default]
    Serial,
    /// One shift per rayon worker; each in-flight solve holds its own
    /// Krylov basis, so peak memory scales with the worker count.
    Parallel,
}

impl ExecutionMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Serial => "serial",
            Self::Parallel => "parallel",
        }
    }
}

impl Display for ExecutionMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

/// How reference values are paired with spectrum values.
///
/// Neither policy is a default: a run names the one it wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchingPolicy {
    /// Each reference in order takes the nearest spectrum value not yet used.
    Greedy,
    /// Minimum total absolute error over all bijections.
    Optimal,
}

impl MatchingPolicy {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Greedy => "greedy",
            Self::Optimal => "optimal",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "greedy" => Some(Self::Greedy),
            "optimal" | "hungarian" => Some(Self::Optimal),
            _ => None,
        }
    }
}

impl Display for MatchingPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}
