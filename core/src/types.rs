//! Shared primitive types used across every task.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TaskError;

/// Seconds on the session clock.
pub type Seconds = f64;

/// Numeric participant identifier entered at session start.
pub type ParticipantId = u64;

/// Index of a trial within a run, starting at 0.
pub type TrialId = u32;

/// The three tasks this crate can run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Crcp,
    Bart,
    Psap,
}

impl TaskKind {
    /// Stable short name, used for output directories and file names.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Crcp => "crcp",
            Self::Bart => "bart",
            Self::Psap => "psap",
        }
    }

    pub fn experiment_name(&self) -> &'static str {
        match self {
            Self::Crcp => "AIDM-CRCP",
            Self::Bart => "AIDM-BART",
            Self::Psap => "AIDM-PSAP",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TaskKind {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "crcp" => Ok(Self::Crcp),
            "bart" => Ok(Self::Bart),
            "psap" => Ok(Self::Psap),
            other => Err(TaskError::UnknownTask { name: other.to_string() }),
        }
    }
}

/// Experimental condition for the point-subtraction task.
/// Selects which adverse-event schedule applies.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Condition {
    /// Opponent steals a point.
    A,
    /// A system glitch halves the score.
    B,
    /// Neutral: no adverse events.
    C,
}

impl Condition {
    pub fn label(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Condition {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "A" | "a" => Ok(Self::A),
            "B" | "b" => Ok(Self::B),
            "C" | "c" => Ok(Self::C),
            other => Err(TaskError::UnknownCondition { label: other.to_string() }),
        }
    }
}
