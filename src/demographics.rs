//! Loads country populations and age-group percentages from CSV.
//!
//! The file needs a header with at least a `country` column, a `population` column and one
//! column per age group holding that group's share of the population as a percentage:
//!
//! ```text
//! country,population,less_5,5_to_14,15_to_24,25_to_64,over_65
//! Afghanistan,38928341,14.5,27.3,21.3,34.3,2.6
//! ```
//!
//! Other columns are ignored.
use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::Path;

use log::{debug, warn};

use crate::error::EpiError;

#[derive(Debug, Clone, PartialEq)]
pub struct CountryDemographic {
    pub country: String,
    pub population: u64,
    /// Percentage (0-100) of the population in each age group.
    pub age_group_percentage: HashMap<String, f64>,
}

impl CountryDemographic {
    #[must_use]
    pub fn percentage(&self, age_group: &str) -> Option<f64> {
        self.age_group_percentage.get(age_group).copied()
    }
}

fn open_countries_file(path: &Path) -> Result<File, EpiError> {
    File::open(path).map_err(|e| {
        EpiError::IoError(io::Error::new(
            e.kind(),
            format!("could not open countries file {}: {e}", path.display()),
        ))
    })
}

fn parse_number(country: &str, column: &str, value: &str) -> Result<f64, EpiError> {
    let number: f64 = value.trim().parse().map_err(|_| {
        EpiError::ConfigError(format!(
            "{column} for {country} is not a number: {value:?}"
        ))
    })?;
    if !number.is_finite() || number < 0.0 {
        return Err(EpiError::ConfigError(format!(
            "{column} for {country} must be a non-negative number, got {value}"
        )));
    }
    Ok(number)
}

fn parse_percentage(country: &str, age_group: &str, value: &str) -> Result<f64, EpiError> {
    let percentage = parse_number(country, age_group, value)?;
    if percentage > 100.0 {
        return Err(EpiError::ConfigError(format!(
            "{age_group} for {country} is a percentage and can't exceed 100, got {value}"
        )));
    }
    Ok(percentage)
}

fn field<'a>(row: &'a HashMap<String, String>, column: &str) -> Result<&'a str, EpiError> {
    row.get(column)
        .map(String::as_str)
        .ok_or_else(|| EpiError::ConfigError(format!("countries file has no {column} column")))
}

/// Reads the rows of `path` whose `country` is in `selected`, in file order.
///
/// Only the columns named in `age_groups` are kept as percentages. Selected countries that
/// don't appear in the file are reported with a warning and contribute no people.
///
/// # Errors
/// Returns an `EpiError` if the file can't be opened or parsed, lacks a required column, or has
/// a population that isn't a non-negative number or a percentage outside 0-100.
pub fn load_demographics<S: AsRef<str>, A: AsRef<str>>(
    path: &Path,
    selected: &[S],
    age_groups: &[A],
) -> Result<Vec<CountryDemographic>, EpiError> {
    let file = open_countries_file(path)?;
    let mut reader = csv::Reader::from_reader(file);

    let mut demographics = Vec::new();
    for result in reader.deserialize() {
        let row: HashMap<String, String> = result?;
        let country = field(&row, "country")?;
        if !selected.iter().any(|s| s.as_ref() == country) {
            continue;
        }

        let population = parse_number(country, "population", field(&row, "population")?)?;
        let mut age_group_percentage = HashMap::new();
        for age_group in age_groups {
            let age_group = age_group.as_ref();
            let percentage = parse_percentage(country, age_group, field(&row, age_group)?)?;
            age_group_percentage.insert(age_group.to_string(), percentage);
        }
        // Populations are whole numbers; a trailing ".0" is tolerated.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let population = population as u64;
        debug!("loaded demographics for {country}: population {population}");
        demographics.push(CountryDemographic {
            country: country.to_string(),
            population,
            age_group_percentage,
        });
    }

    for country in selected {
        let country = country.as_ref();
        if !demographics.iter().any(|d| d.country == country) {
            warn!("selected country {country} is not in {}", path.display());
        }
    }
    Ok(demographics)
}
