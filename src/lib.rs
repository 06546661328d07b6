//! Stochastic disease-state progression for synthetic populations.
//!
//! Epistate builds a scaled-down synthetic population from per-country demographics, walks every
//! individual through the disease states `H` (healthy), `I` (infected), `S` (serious),
//! `M` (mild-recovered) and `D` (deceased) one calendar day at a time, and aggregates the result
//! into daily per-country state counts.
//!
//! A run is driven by a [`Context`](crate::context::Context), which owns module data and a queue
//! of plans executed in simulation time (days since the first simulated date). The pieces are:
//! * [`demographics`] loads country populations and age-group percentages from CSV.
//! * [`population`] expands them into individual people with contiguous ids.
//! * [`progression`] simulates each person's day-by-day state under the age group's holding
//!   times and transition probabilities ([`transition_model`]).
//! * [`summary`] counts people per state, date and country.
//! * [`report`] writes the time series and the summary as CSV.
//!
//! [`simulation::run`] does all of this in one call; the `epistate` binary exposes it on the
//! command line through [`runner`].
pub mod context;
pub mod demographics;
pub mod error;
pub mod global_properties;
mod hashing;
pub mod log;
pub mod parameters;
pub mod plan;
pub mod population;
pub mod progression;
pub mod random;
pub mod report;
pub mod runner;
pub mod simulation;
pub mod state;
pub mod summary;
pub mod transition_model;

pub use context::Context;
pub use error::EpiError;
pub use global_properties::{ContextGlobalPropertiesExt, GlobalProperty};
pub use crate::log::{debug, error, info, trace, warn};
pub use parameters::{Parameters, ParametersValues, TransitionModelProperty};
pub use population::{ContextPopulationExt, Person};
pub use progression::{ContextProgressionExt, DailyRecord, SimulationOutcome};
pub use random::{ContextRandomExt, RngId};
pub use report::{ContextReportExt, Report};
pub use runner::{run_with_custom_args, BaseArgs};
pub use state::DiseaseState;
pub use summary::{ContextSummaryExt, SummaryRecord};
pub use transition_model::{TransitionModel, TransitionParameters};

// Re-exports for use by the crate's macros
pub use csv;
pub use paste;
pub use rand;
