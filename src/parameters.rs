//! Run parameters and the global properties that hold them.
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::define_global_property;
use crate::error::EpiError;
use crate::global_properties::ContextGlobalPropertiesExt;
use crate::transition_model::TransitionModel;

/// ISO 8601 calendar date format used on the command line and in output files.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Anything that can name a simulated day: an ISO `YYYY-MM-DD` string or a `NaiveDate`.
pub trait IntoSimulationDate {
    /// # Errors
    /// Returns `EpiError::DateError` if a string isn't a valid ISO date.
    fn into_simulation_date(self) -> Result<NaiveDate, EpiError>;
}

impl IntoSimulationDate for NaiveDate {
    fn into_simulation_date(self) -> Result<NaiveDate, EpiError> {
        Ok(self)
    }
}

impl IntoSimulationDate for &str {
    fn into_simulation_date(self) -> Result<NaiveDate, EpiError> {
        Ok(NaiveDate::parse_from_str(self.trim(), DATE_FORMAT)?)
    }
}

impl IntoSimulationDate for String {
    fn into_simulation_date(self) -> Result<NaiveDate, EpiError> {
        self.as_str().into_simulation_date()
    }
}

/// Parses an ISO date; used as a `clap` value parser.
///
/// # Errors
/// Returns `EpiError::DateError` if `value` isn't `YYYY-MM-DD`.
pub fn parse_date(value: &str) -> Result<NaiveDate, EpiError> {
    value.into_simulation_date()
}

/// Every day from `start` through `end`, inclusive.
///
/// # Errors
/// Returns `EpiError::ConfigError` if `start` is after `end`.
pub fn date_range(start: NaiveDate, end: NaiveDate) -> Result<Vec<NaiveDate>, EpiError> {
    if start > end {
        return Err(EpiError::ConfigError(format!(
            "start date {start} is after end date {end}"
        )));
    }
    Ok(start
        .iter_days()
        .take_while(|date| *date <= end)
        .collect())
}

/// Number of days between the first simulated date and `date`; this is the simulation time at
/// which `date` is reported.
#[must_use]
pub fn day_offset(start: NaiveDate, date: NaiveDate) -> u64 {
    u64::try_from((date - start).num_days()).unwrap_or(0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParametersValues {
    /// CSV of country populations and age-group percentages.
    pub countries_file: PathBuf,
    /// Selected countries, in the order their summary rows are written.
    pub countries: Vec<String>,
    /// Divisor applied to each country's population.
    pub sample_ratio: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl ParametersValues {
    /// Builds parameters from either date representation, dropping repeated countries.
    ///
    /// # Errors
    /// Returns an `EpiError` if a date doesn't parse or the parameters are invalid.
    pub fn new<S, E>(
        countries_file: impl Into<PathBuf>,
        countries: impl IntoIterator<Item = impl Into<String>>,
        sample_ratio: f64,
        start_date: S,
        end_date: E,
    ) -> Result<Self, EpiError>
    where
        S: IntoSimulationDate,
        E: IntoSimulationDate,
    {
        let mut selected: Vec<String> = Vec::new();
        for country in countries {
            let country = country.into();
            if !selected.contains(&country) {
                selected.push(country);
            }
        }
        let parameters = ParametersValues {
            countries_file: countries_file.into(),
            countries: selected,
            sample_ratio,
            start_date: start_date.into_simulation_date()?,
            end_date: end_date.into_simulation_date()?,
        };
        validate_parameters(&parameters)?;
        Ok(parameters)
    }

    /// The simulated days, in order.
    ///
    /// # Errors
    /// Returns an `EpiError` if the start date is after the end date.
    pub fn dates(&self) -> Result<Vec<NaiveDate>, EpiError> {
        date_range(self.start_date, self.end_date)
    }
}

fn validate_parameters(parameters: &ParametersValues) -> Result<(), EpiError> {
    if !parameters.sample_ratio.is_finite() || parameters.sample_ratio < 1.0 {
        return Err(EpiError::ConfigError(format!(
            "sample ratio must be a number >= 1, got {}",
            parameters.sample_ratio
        )));
    }
    if parameters.countries.is_empty() {
        return Err(EpiError::ConfigError(
            "at least one country must be selected".to_string(),
        ));
    }
    let mut seen = std::collections::HashSet::new();
    if let Some(duplicate) = parameters.countries.iter().find(|c| !seen.insert(*c)) {
        return Err(EpiError::ConfigError(format!(
            "country {duplicate} is selected more than once"
        )));
    }
    date_range(parameters.start_date, parameters.end_date)?;
    Ok(())
}

define_global_property!(Parameters, ParametersValues, validate_parameters);

define_global_property!(TransitionModelProperty, TransitionModel);

/// Makes this crate's global properties loadable from a config file.
pub fn register_global_properties(context: &mut Context) {
    context.register_global_property(Parameters);
    context.register_global_property(TransitionModelProperty);
}

/// Returns the configured transition model, installing the default model if none was set.
///
/// # Errors
/// Cannot fail in practice: the default model is valid.
pub fn transition_model_or_default(context: &mut Context) -> Result<&TransitionModel, EpiError> {
    if context
        .get_global_property_value(TransitionModelProperty)
        .is_none()
    {
        context.set_global_property_value(TransitionModelProperty, TransitionModel::default())?;
    }
    context
        .get_global_property_value(TransitionModelProperty)
        .ok_or_else(|| EpiError::ConfigError("transition model is not set".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    #[test]
    fn accepts_strings_and_dates() {
        let from_strings =
            ParametersValues::new("c.csv", ["Sweden"], 1000.0, "2021-04-01", "2021-04-03".to_string())
                .unwrap();
        let from_dates = ParametersValues::new(
            "c.csv",
            ["Sweden"],
            1000.0,
            date("2021-04-01"),
            date("2021-04-03"),
        )
        .unwrap();
        assert_eq!(from_strings, from_dates);
    }

    #[test]
    fn rejects_bad_date_string() {
        let result = ParametersValues::new("c.csv", ["Sweden"], 1.0, "2021/04/01", "2021-04-03");
        assert!(matches!(result, Err(EpiError::DateError(_))));
    }

    #[test]
    fn removes_repeated_countries() {
        let parameters = ParametersValues::new(
            "c.csv",
            ["Sweden", "Chile", "Sweden"],
            1.0,
            "2021-04-01",
            "2021-04-01",
        )
        .unwrap();
        assert_eq!(parameters.countries, vec!["Sweden", "Chile"]);
    }

    #[test]
    fn rejects_invalid_parameters() {
        let start = "2021-04-01";
        assert!(ParametersValues::new("c.csv", ["Sweden"], 0.5, start, start).is_err());
        assert!(ParametersValues::new("c.csv", ["Sweden"], f64::NAN, start, start).is_err());
        assert!(ParametersValues::new("c.csv", Vec::<String>::new(), 1.0, start, start).is_err());
        assert!(ParametersValues::new("c.csv", ["Sweden"], 1.0, "2021-04-02", start).is_err());
    }

    #[test]
    fn date_range_is_inclusive() {
        let dates = date_range(date("2020-02-27"), date("2020-03-01")).unwrap();
        assert_eq!(
            dates,
            vec![
                date("2020-02-27"),
                date("2020-02-28"),
                date("2020-02-29"),
                date("2020-03-01")
            ]
        );
        assert_eq!(date_range(date("2021-01-01"), date("2021-01-01")).unwrap().len(), 1);
    }

    #[test]
    fn day_offsets() {
        let start = date("2021-04-01");
        assert_eq!(day_offset(start, date("2021-04-01")), 0);
        assert_eq!(day_offset(start, date("2021-05-01")), 30);
        assert_eq!(day_offset(start, date("2021-03-31")), 0);
    }

    #[test]
    fn default_transition_model_installed_once() {
        let mut context = Context::new();
        let names: Vec<String> = transition_model_or_default(&mut context)
            .unwrap()
            .age_group_names()
            .map(str::to_string)
            .collect();
        assert_eq!(names.len(), 5);
        assert!(context
            .get_global_property_value(TransitionModelProperty)
            .is_some());
    }

    #[test]
    fn parameters_deserialize_from_json() {
        let json = r#"{
            "countries_file": "tests/data/countries.csv",
            "countries": ["Sweden"],
            "sample_ratio": 1000000,
            "start_date": "2021-04-01",
            "end_date": "2021-04-30"
        }"#;
        let parameters: ParametersValues = serde_json::from_str(json).unwrap();
        assert_eq!(parameters.start_date, date("2021-04-01"));
        assert_eq!(parameters.dates().unwrap().len(), 30);
    }
}
