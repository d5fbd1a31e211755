//! Calibration status and readout state.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{TypesError, TypesResult};

/// Calibration status of a `(component, node)` pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationStatus {
    /// The node has not produced valid values for the component.
    #[default]
    NotCalibrated,
    /// The node's quantities of interest are valid for the component.
    Calibrated,
}

impl CalibrationStatus {
    /// Stored string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            CalibrationStatus::NotCalibrated => "not_calibrated",
            CalibrationStatus::Calibrated => "calibrated",
        }
    }

    /// Check if this is the calibrated state.
    pub fn is_calibrated(&self) -> bool {
        matches!(self, CalibrationStatus::Calibrated)
    }
}

impl fmt::Display for CalibrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CalibrationStatus {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "calibrated" => Ok(CalibrationStatus::Calibrated),
            "not_calibrated" => Ok(CalibrationStatus::NotCalibrated),
            other => Err(TypesError::InvalidStatus(other.to_string())),
        }
    }
}

/// Readout state a node is calibrated against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum QubitState {
    /// |0⟩
    #[default]
    Ground,
    /// |1⟩
    Excited,
    /// |2⟩
    SecondExcited,
}

impl QubitState {
    /// Create from the numeric state index.
    pub fn from_index(index: u8) -> TypesResult<Self> {
        match index {
            0 => Ok(QubitState::Ground),
            1 => Ok(QubitState::Excited),
            2 => Ok(QubitState::SecondExcited),
            other => Err(TypesError::InvalidQubitState(other)),
        }
    }

    /// Numeric state index.
    pub fn index(&self) -> u8 {
        match self {
            QubitState::Ground => 0,
            QubitState::Excited => 1,
            QubitState::SecondExcited => 2,
        }
    }

    /// All states up to and including `self`.
    pub fn up_to(self) -> Vec<QubitState> {
        (0..=self.index())
            .filter_map(|i| QubitState::from_index(i).ok())
            .collect()
    }
}

impl fmt::Display for QubitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

impl TryFrom<u8> for QubitState {
    type Error = TypesError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_index(value)
    }
}

impl From<QubitState> for u8 {
    fn from(state: QubitState) -> Self {
        state.index()
    }
}
