//! Per-age-group disease progression parameters.
//!
//! Each age group carries two tables indexed by [`DiseaseState`]:
//! * a holding time: the number of days an individual must have spent in a state before it is
//!   eligible to transition out of it, and
//! * a transition probability row: for each next state, the probability of moving there once the
//!   holding time has been reached. A state with no row has no outgoing transitions at all; an
//!   individual that becomes eligible to leave such a state can't be simulated.
//!
//! On disk a model is JSON:
//!
//! ```json
//! {
//!   "age_groups": [
//!     {
//!       "name": "less_5",
//!       "holding_times": {"H": 0, "I": 4, "S": 7, "M": 30, "D": 0},
//!       "transition_probabilities": {
//!         "H": {"H": 0.99, "I": 0.01},
//!         "D": {"D": 1.0}
//!       }
//!     }
//!   ]
//! }
//! ```
//!
//! The order of `age_groups` is significant: it is the order in which the sample generator
//! visits age groups.
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use approx::abs_diff_eq;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use crate::error::EpiError;
use crate::state::{DiseaseState, STATE_COUNT};

/// Tolerance on the sum of a probability row.
pub const PROBABILITY_SUM_TOLERANCE: f64 = 1e-9;

/// A row of next-state probabilities in canonical state order.
pub type TransitionRow = [f64; STATE_COUNT];

/// Builds a row from `(next_state, probability)` pairs; unnamed states get probability 0.
#[must_use]
pub fn transition_row(entries: &[(DiseaseState, f64)]) -> TransitionRow {
    let mut row = [0.0; STATE_COUNT];
    for (state, probability) in entries {
        row[state.index()] = *probability;
    }
    row
}

/// The holding times and transition probabilities of one age group.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionParameters {
    name: String,
    holding_times: [u32; STATE_COUNT],
    transition_probabilities: [Option<TransitionRow>; STATE_COUNT],
}

impl TransitionParameters {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        holding_times: [u32; STATE_COUNT],
        transition_probabilities: [Option<TransitionRow>; STATE_COUNT],
    ) -> Self {
        TransitionParameters {
            name: name.into(),
            holding_times,
            transition_probabilities,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn holding_time(&self, state: DiseaseState) -> u32 {
        self.holding_times[state.index()]
    }

    /// The probability row for leaving `state`, or `None` if `state` has no transitions.
    #[must_use]
    pub fn transition_row(&self, state: DiseaseState) -> Option<&TransitionRow> {
        self.transition_probabilities[state.index()].as_ref()
    }

    /// `P(from -> to)`, or 0 if `from` has no row.
    #[must_use]
    pub fn probability(&self, from: DiseaseState, to: DiseaseState) -> f64 {
        self.transition_row(from).map_or(0.0, |row| row[to.index()])
    }

    /// Checks every defined row is a probability distribution.
    ///
    /// # Errors
    /// Returns `EpiError::TransitionError` naming the first bad row.
    pub fn validate(&self) -> Result<(), EpiError> {
        for state in DiseaseState::iter() {
            if let Some(row) = self.transition_row(state) {
                validate_row(&self.name, state, row)?;
            }
        }
        Ok(())
    }
}

/// Checks that `row` has finite, non-negative entries summing to 1.
///
/// # Errors
/// Returns `EpiError::TransitionError` describing the problem.
pub fn validate_row(age_group: &str, state: DiseaseState, row: &TransitionRow) -> Result<(), EpiError> {
    if let Some(bad) = row.iter().find(|p| !p.is_finite() || **p < 0.0) {
        return Err(EpiError::transition(
            age_group,
            state,
            format!("probability {bad} is not a non-negative number"),
        ));
    }
    let sum: f64 = row.iter().sum();
    if !abs_diff_eq!(sum, 1.0, epsilon = PROBABILITY_SUM_TOLERANCE) {
        return Err(EpiError::transition(
            age_group,
            state,
            format!("probabilities sum to {sum}, not 1"),
        ));
    }
    Ok(())
}

/// The ordered set of age groups and their progression parameters.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(try_from = "TransitionModelInput", into = "TransitionModelInput")]
pub struct TransitionModel {
    age_groups: Vec<TransitionParameters>,
}

impl TransitionModel {
    /// # Errors
    /// Returns an `EpiError` if there are no age groups, two groups share a name, or any
    /// probability row is invalid.
    pub fn new(age_groups: Vec<TransitionParameters>) -> Result<Self, EpiError> {
        if age_groups.is_empty() {
            return Err(EpiError::ConfigError(
                "a transition model needs at least one age group".to_string(),
            ));
        }
        let mut names = HashSet::new();
        for group in &age_groups {
            if !names.insert(group.name()) {
                return Err(EpiError::ConfigError(format!(
                    "age group {} is defined more than once",
                    group.name()
                )));
            }
            group.validate()?;
        }
        Ok(TransitionModel { age_groups })
    }

    /// Reads a model from a JSON file.
    ///
    /// # Errors
    /// Returns an `EpiError` if the file is missing, malformed, or fails validation.
    pub fn from_json_file(path: &Path) -> Result<Self, EpiError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Age group names in model order.
    pub fn age_group_names(&self) -> impl Iterator<Item = &str> {
        self.age_groups.iter().map(TransitionParameters::name)
    }

    #[must_use]
    pub fn age_group(&self, name: &str) -> Option<&TransitionParameters> {
        self.age_groups.iter().find(|group| group.name() == name)
    }

    pub fn age_groups(&self) -> &[TransitionParameters] {
        &self.age_groups
    }
}

impl Default for TransitionModel {
    /// A five-band model in which risk of serious illness and death rises with age. Mild
    /// recovery confers 30 days of protection before return to `H`; `D` is absorbing.
    fn default() -> Self {
        use DiseaseState::{D, H, I, M, S};

        // (name, P(H->I), P(I->S), P(S->D), holding time of I, holding time of S)
        let bands = [
            ("less_5", 0.01, 0.05, 0.02, 4, 7),
            ("5_to_14", 0.01, 0.03, 0.01, 4, 7),
            ("15_to_24", 0.02, 0.04, 0.02, 4, 8),
            ("25_to_64", 0.03, 0.08, 0.07, 5, 10),
            ("over_65", 0.04, 0.20, 0.25, 6, 14),
        ];
        let age_groups = bands
            .into_iter()
            .map(|(name, infection, serious, death, infected_days, serious_days)| {
                TransitionParameters::new(
                    name,
                    [0, infected_days, serious_days, 30, 0],
                    [
                        Some(transition_row(&[(H, 1.0 - infection), (I, infection)])),
                        Some(transition_row(&[(S, serious), (M, 1.0 - serious)])),
                        Some(transition_row(&[(M, 1.0 - death), (D, death)])),
                        Some(transition_row(&[(H, 1.0)])),
                        Some(transition_row(&[(D, 1.0)])),
                    ],
                )
            })
            .collect();
        TransitionModel { age_groups }
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct AgeGroupInput {
    name: String,
    holding_times: BTreeMap<String, u32>,
    #[serde(default)]
    transition_probabilities: BTreeMap<String, BTreeMap<String, f64>>,
}

#[derive(Debug, Deserialize, Serialize)]
struct TransitionModelInput {
    age_groups: Vec<AgeGroupInput>,
}

fn parse_state(age_group: &str, code: &str) -> Result<DiseaseState, EpiError> {
    code.parse().map_err(|_| {
        EpiError::ConfigError(format!(
            "age group {age_group} refers to unknown state {code:?}"
        ))
    })
}

impl TryFrom<AgeGroupInput> for TransitionParameters {
    type Error = EpiError;

    fn try_from(input: AgeGroupInput) -> Result<Self, Self::Error> {
        let mut holding_times = [None; STATE_COUNT];
        for (code, days) in &input.holding_times {
            holding_times[parse_state(&input.name, code)?.index()] = Some(*days);
        }
        let mut resolved = [0; STATE_COUNT];
        for state in DiseaseState::iter() {
            resolved[state.index()] = holding_times[state.index()]
                .ok_or_else(|| EpiError::transition(&input.name, state, "missing holding time"))?;
        }

        let mut rows = [None; STATE_COUNT];
        for (code, entries) in &input.transition_probabilities {
            let from = parse_state(&input.name, code)?;
            let mut row = [0.0; STATE_COUNT];
            for (next, probability) in entries {
                row[parse_state(&input.name, next)?.index()] = *probability;
            }
            rows[from.index()] = Some(row);
        }
        Ok(TransitionParameters::new(input.name, resolved, rows))
    }
}

impl TryFrom<TransitionModelInput> for TransitionModel {
    type Error = EpiError;

    fn try_from(input: TransitionModelInput) -> Result<Self, Self::Error> {
        let age_groups = input
            .age_groups
            .into_iter()
            .map(TransitionParameters::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        TransitionModel::new(age_groups)
    }
}

impl From<TransitionModel> for TransitionModelInput {
    fn from(model: TransitionModel) -> Self {
        let age_groups = model
            .age_groups
            .into_iter()
            .map(|group| {
                let holding_times = DiseaseState::iter()
                    .map(|state| (state.code().to_string(), group.holding_time(state)))
                    .collect();
                let transition_probabilities = DiseaseState::iter()
                    .filter_map(|from| {
                        let row = group.transition_row(from)?;
                        let entries = DiseaseState::iter()
                            .filter(|to| row[to.index()] > 0.0)
                            .map(|to| (to.code().to_string(), row[to.index()]))
                            .collect();
                        Some((from.code().to_string(), entries))
                    })
                    .collect();
                AgeGroupInput {
                    name: group.name,
                    holding_times,
                    transition_probabilities,
                }
            })
            .collect();
        TransitionModelInput { age_groups }
    }
}
