//! Expands country demographics into individual synthetic people.
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::define_data_plugin;
use crate::demographics::CountryDemographic;

/// One synthetic individual. Identity fields never change after generation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Person {
    pub unique_id: usize,
    pub country: String,
    pub age_group_name: String,
}

/// `floor(population / sample_ratio)`
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn scaled_population(population: u64, sample_ratio: f64) -> u64 {
    (population as f64 / sample_ratio).floor() as u64
}

/// `floor(scaled_population * percentage / 100)`
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn group_size(scaled_population: u64, percentage: f64) -> usize {
    (scaled_population as f64 * percentage / 100.0).floor() as usize
}

/// Generates the people of every country in `demographics`, countries in the given order and,
/// within a country, age groups in the order of `age_groups`.
///
/// Ids start at 0 and are contiguous across countries and age groups. An age group missing from
/// a country's percentages, or whose share rounds down to nobody, contributes no people. Returns
/// the people and the next unused id, which is also the number of people.
#[must_use]
pub fn generate_sample<A: AsRef<str>>(
    demographics: &[CountryDemographic],
    sample_ratio: f64,
    age_groups: &[A],
) -> (Vec<Person>, usize) {
    let mut people = Vec::new();
    let mut unique_id = 0;
    for entry in demographics {
        let scaled = scaled_population(entry.population, sample_ratio);
        for age_group in age_groups {
            let age_group = age_group.as_ref();
            let size = entry
                .percentage(age_group)
                .map_or(0, |percentage| group_size(scaled, percentage));
            debug!("{}/{age_group}: {size} people", entry.country);
            people.extend((unique_id..unique_id + size).map(|id| Person {
                unique_id: id,
                country: entry.country.clone(),
                age_group_name: age_group.to_string(),
            }));
            unique_id += size;
        }
    }
    (people, unique_id)
}

define_data_plugin!(PopulationPlugin, Vec<Person>, Vec::new());

pub trait ContextPopulationExt {
    /// Replaces the population with one generated from `demographics`. Returns the number of
    /// people.
    fn generate_population<A: AsRef<str>>(
        &mut self,
        demographics: &[CountryDemographic],
        sample_ratio: f64,
        age_groups: &[A],
    ) -> usize;

    /// All people, in `unique_id` order.
    fn get_population(&self) -> &[Person];

    fn get_current_population(&self) -> usize {
        self.get_population().len()
    }
}

impl ContextPopulationExt for Context {
    fn generate_population<A: AsRef<str>>(
        &mut self,
        demographics: &[CountryDemographic],
        sample_ratio: f64,
        age_groups: &[A],
    ) -> usize {
        let (people, count) = generate_sample(demographics, sample_ratio, age_groups);
        info!("generated {count} people from {} countries", demographics.len());
        *self.get_data_container_mut(PopulationPlugin) = people;
        count
    }

    fn get_population(&self) -> &[Person] {
        self.get_data_container(PopulationPlugin)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
