//! The closed set of disease states an individual can occupy.
//!
//! The declaration order of [`DiseaseState`] is the canonical order: it is the order in which
//! transition candidates are offered to the weighted draw, the column order of the summary report,
//! and the index into every per-state lookup table.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{EnumIter, IntoEnumIterator};

use crate::error::EpiError;

/// Number of states in [`DiseaseState`].
pub const STATE_COUNT: usize = 5;

#[derive(
    Debug,
    Default,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    EnumIter,
)]
pub enum DiseaseState {
    /// Healthy
    #[default]
    H,
    /// Infected
    I,
    /// Serious
    S,
    /// Mild-recovered
    M,
    /// Deceased
    D,
}

impl DiseaseState {
    /// Position in the canonical order.
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            DiseaseState::H => "H",
            DiseaseState::I => "I",
            DiseaseState::S => "S",
            DiseaseState::M => "M",
            DiseaseState::D => "D",
        }
    }
}

impl fmt::Display for DiseaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for DiseaseState {
    type Err = EpiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DiseaseState::iter()
            .find(|state| state.code() == s)
            .ok_or_else(|| EpiError::ConfigError(format!("unknown disease state {s:?}")))
    }
}
