use std::fmt::{self, Debug, Display};
use std::io;

use crate::state::DiseaseState;

/// Provides `EpiError` and maps to other errors to
/// convert to an `EpiError`
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub enum EpiError {
    IoError(io::Error),
    JsonError(serde_json::Error),
    CSVError(csv::Error),
    DateError(chrono::ParseError),
    ConfigError(String),
    ReportError(String),
    /// A probability row or holding-time table that can't drive a transition.
    TransitionError {
        age_group: String,
        state: DiseaseState,
        reason: String,
    },
    /// Wraps the failure of a single individual's trajectory.
    SimulationError {
        unique_id: usize,
        source: Box<EpiError>,
    },
    EpiError(String),
}

impl EpiError {
    pub(crate) fn transition(
        age_group: &str,
        state: DiseaseState,
        reason: impl Into<String>,
    ) -> Self {
        EpiError::TransitionError {
            age_group: age_group.to_string(),
            state,
            reason: reason.into(),
        }
    }
}

impl From<io::Error> for EpiError {
    fn from(error: io::Error) -> Self {
        EpiError::IoError(error)
    }
}

impl From<serde_json::Error> for EpiError {
    fn from(error: serde_json::Error) -> Self {
        EpiError::JsonError(error)
    }
}

impl From<csv::Error> for EpiError {
    fn from(error: csv::Error) -> Self {
        EpiError::CSVError(error)
    }
}

impl From<chrono::ParseError> for EpiError {
    fn from(error: chrono::ParseError) -> Self {
        EpiError::DateError(error)
    }
}

impl From<String> for EpiError {
    fn from(error: String) -> Self {
        EpiError::EpiError(error)
    }
}

impl From<&str> for EpiError {
    fn from(error: &str) -> Self {
        EpiError::EpiError(error.to_string())
    }
}

impl std::error::Error for EpiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EpiError::IoError(e) => Some(e),
            EpiError::JsonError(e) => Some(e),
            EpiError::CSVError(e) => Some(e),
            EpiError::DateError(e) => Some(e),
            EpiError::SimulationError { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl Display for EpiError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EpiError::IoError(e) => write!(f, "I/O error: {e}"),
            EpiError::JsonError(e) => write!(f, "JSON error: {e}"),
            EpiError::CSVError(e) => write!(f, "CSV error: {e}"),
            EpiError::DateError(e) => write!(f, "invalid date (expected YYYY-MM-DD): {e}"),
            EpiError::ConfigError(msg) => write!(f, "invalid configuration: {msg}"),
            EpiError::ReportError(msg) => write!(f, "report error: {msg}"),
            EpiError::TransitionError {
                age_group,
                state,
                reason,
            } => write!(
                f,
                "invalid transition table for age group {age_group}, state {state}: {reason}"
            ),
            EpiError::SimulationError { unique_id, source } => {
                write!(f, "simulation failed for unique_id {unique_id}: {source}")
            }
            EpiError::EpiError(msg) => write!(f, "Error: {msg}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_converts() {
        let error: EpiError = io::Error::new(io::ErrorKind::NotFound, "countries.csv").into();
        assert!(matches!(error, EpiError::IoError(_)));
        assert!(error.to_string().contains("countries.csv"));
    }

    #[test]
    fn simulation_error_names_individual() {
        let error = EpiError::SimulationError {
            unique_id: 17,
            source: Box::new(EpiError::transition("over_65", DiseaseState::D, "no row")),
        };
        let message = error.to_string();
        assert!(message.contains("unique_id 17"));
        assert!(message.contains("over_65"));
        assert!(message.contains("state D"));
    }
}
