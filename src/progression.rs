//! Day-by-day disease state progression of individuals.
//!
//! Every individual starts the first simulated day in `H`. On each later day they either stay in
//! their state, or, once they have spent at least the state's holding time there, draw their next
//! state from the state's transition row. Candidates are offered to the draw in canonical state
//! order, the current state included, and a draw always starts a fresh holding period, even when
//! it picks the state the individual was already in.
//!
//! All draws come from a single RNG stream, `ProgressionRng`. People are simulated one at a time
//! in `unique_id` order, each across the whole date range, so a fixed seed reproduces the same
//! trajectories.
use std::collections::HashMap;
use std::ops::Range;

use chrono::NaiveDate;
use log::{error, info, trace};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use crate::context::Context;
use crate::define_data_plugin;
use crate::define_report;
use crate::define_rng;
use crate::error::EpiError;
use crate::global_properties::ContextGlobalPropertiesExt;
use crate::parameters::{transition_model_or_default, TransitionModelProperty};
use crate::population::{ContextPopulationExt, Person};
use crate::rand::Rng;
use crate::random::{choose_weighted, ContextRandomExt};
use crate::state::DiseaseState;
use crate::transition_model::{validate_row, TransitionParameters};

define_rng!(ProgressionRng);

/// The state of one individual on one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    pub unique_id: usize,
    pub country: String,
    pub age_group_name: String,
    pub date: NaiveDate,
    pub state: DiseaseState,
    /// Consecutive days spent in `state` before this one; 0 on the day the state was entered.
    pub staying_days: u32,
    pub prev_state: DiseaseState,
}
define_report!(DailyRecord);

fn draw_next_state<R: Rng>(
    rng: &mut R,
    parameters: &TransitionParameters,
    current: DiseaseState,
) -> Result<DiseaseState, EpiError> {
    let row = parameters.transition_row(current).ok_or_else(|| {
        EpiError::transition(parameters.name(), current, "no transition probabilities")
    })?;
    validate_row(parameters.name(), current, row)?;

    let candidates: Vec<DiseaseState> = DiseaseState::iter().collect();
    let next = choose_weighted(rng, &candidates, row)
        .map_err(|e| EpiError::transition(parameters.name(), current, e.to_string()))?;
    trace!("{}: {current} -> {next}", parameters.name());
    Ok(next)
}

/// Simulates `person` over `dates`, producing one record per date in the same order.
///
/// # Errors
/// Returns an `EpiError` if the person becomes eligible to leave a state whose transition row is
/// missing or invalid. No records are returned in that case.
pub fn simulate_person<R: Rng>(
    person: &Person,
    dates: &[NaiveDate],
    parameters: &TransitionParameters,
    rng: &mut R,
) -> Result<Vec<DailyRecord>, EpiError> {
    let mut records = Vec::with_capacity(dates.len());
    let mut state = DiseaseState::H;
    let mut days_in_state: u32 = 0;

    for (index, date) in dates.iter().enumerate() {
        let prev_state = state;
        if index > 0 {
            if days_in_state >= parameters.holding_time(state) {
                state = draw_next_state(rng, parameters, state)?;
                days_in_state = 0;
            } else {
                days_in_state += 1;
            }
        }
        records.push(DailyRecord {
            unique_id: person.unique_id,
            country: person.country.clone(),
            age_group_name: person.age_group_name.clone(),
            date: *date,
            state,
            staying_days: days_in_state,
            prev_state,
        });
    }
    Ok(records)
}

/// What happened when the population was simulated.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SimulationOutcome {
    /// Number of people whose trajectories were recorded.
    pub simulated: usize,
    /// Ids of people whose simulation failed; they have no records.
    pub skipped: Vec<usize>,
}

struct ProgressionData {
    records: Vec<DailyRecord>,
    // Each person's slice of `records`.
    by_person: HashMap<usize, Range<usize>>,
}

define_data_plugin!(
    ProgressionPlugin,
    ProgressionData,
    ProgressionData {
        records: Vec::new(),
        by_person: HashMap::new(),
    }
);

pub trait ContextProgressionExt {
    /// Simulates every person in the population over `dates` using the configured transition
    /// model (the default model if none is set), replacing any earlier results.
    ///
    /// A person whose simulation fails is logged and skipped; the rest are still simulated.
    ///
    /// # Errors
    /// Returns an `EpiError` only if the transition model can't be installed.
    fn simulate_population(&mut self, dates: &[NaiveDate]) -> Result<SimulationOutcome, EpiError>;

    /// All records: people in `unique_id` order, each in date order.
    fn get_daily_records(&self) -> &[DailyRecord];

    /// One person's records, or `None` if they weren't simulated.
    fn get_person_records(&self, unique_id: usize) -> Option<&[DailyRecord]>;
}

impl ContextProgressionExt for Context {
    fn simulate_population(&mut self, dates: &[NaiveDate]) -> Result<SimulationOutcome, EpiError> {
        transition_model_or_default(self)?;
        let model = self
            .get_global_property_value(TransitionModelProperty)
            .ok_or_else(|| EpiError::ConfigError("transition model is not set".to_string()))?;

        info!("Simulation started");
        let mut records = Vec::with_capacity(self.get_current_population() * dates.len());
        let mut by_person = HashMap::new();
        let mut outcome = SimulationOutcome::default();

        for person in self.get_population() {
            let result = model
                .age_group(&person.age_group_name)
                .ok_or_else(|| {
                    EpiError::ConfigError(format!(
                        "no transition parameters for age group {}",
                        person.age_group_name
                    ))
                })
                .and_then(|parameters| {
                    self.sample(ProgressionRng, |rng| {
                        simulate_person(person, dates, parameters, rng)
                    })
                });

            match result {
                Ok(trajectory) => {
                    let start = records.len();
                    records.extend(trajectory);
                    by_person.insert(person.unique_id, start..records.len());
                    outcome.simulated += 1;
                }
                Err(source) => {
                    let error = EpiError::SimulationError {
                        unique_id: person.unique_id,
                        source: Box::new(source),
                    };
                    error!("{error}");
                    outcome.skipped.push(person.unique_id);
                }
            }
        }
        info!(
            "Simulation has completed: {} people simulated, {} skipped",
            outcome.simulated,
            outcome.skipped.len()
        );

        let data_container = self.get_data_container_mut(ProgressionPlugin);
        data_container.records = records;
        data_container.by_person = by_person;
        Ok(outcome)
    }

    fn get_daily_records(&self) -> &[DailyRecord] {
        self.get_data_container(ProgressionPlugin)
            .map(|data| data.records.as_slice())
            .unwrap_or(&[])
    }

    fn get_person_records(&self, unique_id: usize) -> Option<&[DailyRecord]> {
        let data = self.get_data_container(ProgressionPlugin)?;
        let range = data.by_person.get(&unique_id)?;
        Some(&data.records[range.clone()])
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    use super::*;
    use crate::demographics::CountryDemographic;
    use crate::parameters::date_range;
    use crate::state::STATE_COUNT;
    use crate::transition_model::{transition_row, TransitionModel};
    use DiseaseState::{D, H, I, M, S};

    fn person(unique_id: usize, age_group: &str) -> Person {
        Person {
            unique_id,
            country: "Sweden".to_string(),
            age_group_name: age_group.to_string(),
        }
    }

    fn dates(days: u64) -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(2021, 4, 1).unwrap();
        let end = start + chrono::Days::new(days - 1);
        date_range(start, end).unwrap()
    }

    fn parameters(
        holding_times: [u32; STATE_COUNT],
        rows: [Option<[f64; STATE_COUNT]>; STATE_COUNT],
    ) -> TransitionParameters {
        TransitionParameters::new("test", holding_times, rows)
    }

    fn assert_walk_invariants(records: &[DailyRecord]) {
        let first = &records[0];
        assert_eq!(first.state, H);
        assert_eq!(first.staying_days, 0);
        assert_eq!(first.prev_state, H);
        for pair in records.windows(2) {
            let (before, after) = (&pair[0], &pair[1]);
            assert_eq!(after.prev_state, before.state);
            if after.state == before.state {
                assert!(
                    after.staying_days == before.staying_days + 1 || after.staying_days == 0,
                    "{before:?} -> {after:?}"
                );
            } else {
                assert_eq!(after.staying_days, 0);
            }
        }
    }

    #[test]
    fn first_day_is_healthy() {
        let params = TransitionModel::default().age_groups()[0].clone();
        let mut rng = SmallRng::seed_from_u64(42);
        let records = simulate_person(&person(3, "less_5"), &dates(1), &params, &mut rng).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].unique_id, 3);
        assert_eq!(records[0].state, H);
        assert_eq!(records[0].staying_days, 0);
        assert_eq!(records[0].prev_state, H);
    }

    #[test]
    fn transition_after_holding_time() {
        // Always infected once five days in H have passed.
        let params = parameters(
            [5, 100, 0, 0, 0],
            [Some(transition_row(&[(I, 1.0)])), None, None, None, None],
        );
        let mut rng = SmallRng::seed_from_u64(42);
        let records = simulate_person(&person(0, "test"), &dates(9), &params, &mut rng).unwrap();
        let states: Vec<_> = records.iter().map(|r| r.state).collect();
        let staying: Vec<_> = records.iter().map(|r| r.staying_days).collect();
        assert_eq!(states, vec![H, H, H, H, H, H, I, I, I]);
        assert_eq!(staying, vec![0, 1, 2, 3, 4, 5, 0, 1, 2]);
        assert_eq!(records[6].prev_state, H);
        assert_eq!(records[7].prev_state, I);
        assert_walk_invariants(&records);
    }

    #[test]
    fn reselecting_same_state_resets_holding_period() {
        let params = parameters(
            [5, 0, 0, 0, 0],
            [Some(transition_row(&[(H, 1.0)])), None, None, None, None],
        );
        let mut rng = SmallRng::seed_from_u64(42);
        let records = simulate_person(&person(0, "test"), &dates(14), &params, &mut rng).unwrap();
        assert!(records.iter().all(|r| r.state == H));
        let staying: Vec<_> = records.iter().map(|r| r.staying_days).collect();
        assert_eq!(staying, vec![0, 1, 2, 3, 4, 5, 0, 1, 2, 3, 4, 5, 0, 1]);
    }

    #[test]
    fn zero_holding_time_draws_every_day() {
        let params = parameters(
            [0, 0, 0, 0, 0],
            [
                Some(transition_row(&[(I, 1.0)])),
                Some(transition_row(&[(S, 1.0)])),
                Some(transition_row(&[(M, 1.0)])),
                Some(transition_row(&[(D, 1.0)])),
                Some(transition_row(&[(D, 1.0)])),
            ],
        );
        let mut rng = SmallRng::seed_from_u64(1);
        let records = simulate_person(&person(0, "test"), &dates(7), &params, &mut rng).unwrap();
        let states: Vec<_> = records.iter().map(|r| r.state).collect();
        assert_eq!(states, vec![H, I, S, M, D, D, D]);
        assert!(records.iter().all(|r| r.staying_days == 0));
    }

    #[test]
    fn missing_row_fails_only_when_reached() {
        // D has no row: fine until someone has spent its holding time there.
        let params = parameters(
            [0, 0, 0, 0, 2],
            [Some(transition_row(&[(D, 1.0)])), None, None, None, None],
        );
        let mut rng = SmallRng::seed_from_u64(42);
        let short = simulate_person(&person(0, "test"), &dates(4), &params, &mut rng).unwrap();
        assert_eq!(short.last().unwrap().staying_days, 2);

        let result = simulate_person(&person(0, "test"), &dates(5), &params, &mut rng);
        match result {
            Err(EpiError::TransitionError { state, .. }) => assert_eq!(state, D),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn invalid_row_fails() {
        let params = parameters(
            [0, 0, 0, 0, 0],
            [Some(transition_row(&[(H, 0.5), (I, 0.2)])), None, None, None, None],
        );
        let mut rng = SmallRng::seed_from_u64(42);
        assert!(simulate_person(&person(0, "test"), &dates(2), &params, &mut rng).is_err());
    }

    #[test]
    fn default_model_walks_are_consistent() {
        let model = TransitionModel::default();
        let mut rng = SmallRng::seed_from_u64(7);
        for (id, params) in model.age_groups().iter().enumerate() {
            for _ in 0..50 {
                let records =
                    simulate_person(&person(id, params.name()), &dates(120), params, &mut rng)
                        .unwrap();
                assert_eq!(records.len(), 120);
                assert_walk_invariants(&records);
                for record in &records {
                    assert!(record.staying_days <= params.holding_time(record.state));
                }
            }
        }
    }

    fn context_with_people(model: TransitionModel, people: &[(&str, f64)]) -> Context {
        let mut context = Context::new();
        context.init_random(42);
        context
            .set_global_property_value(TransitionModelProperty, model)
            .unwrap();
        let demographics = [CountryDemographic {
            country: "Sweden".to_string(),
            population: 100,
            age_group_percentage: people
                .iter()
                .map(|(group, p)| ((*group).to_string(), *p))
                .collect::<HashMap<_, _>>(),
        }];
        let groups: Vec<&str> = people.iter().map(|(group, _)| *group).collect();
        context.generate_population(&demographics, 1.0, &groups);
        context
    }

    #[test]
    fn failed_person_is_skipped() {
        let healthy = TransitionParameters::new(
            "healthy",
            [0; STATE_COUNT],
            [Some(transition_row(&[(H, 1.0)])), None, None, None, None],
        );
        let broken = TransitionParameters::new("broken", [0; STATE_COUNT], [None; STATE_COUNT]);
        let model = TransitionModel::new(vec![healthy, broken]).unwrap();
        let mut context = context_with_people(model, &[("healthy", 3.0), ("broken", 2.0)]);

        let outcome = context.simulate_population(&dates(3)).unwrap();
        assert_eq!(outcome.simulated, 3);
        assert_eq!(outcome.skipped, vec![3, 4]);
        assert_eq!(context.get_daily_records().len(), 9);
        assert!(context.get_person_records(3).is_none());
        let records = context.get_person_records(2).unwrap();
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.unique_id == 2));
    }

    #[test]
    fn unknown_age_group_is_skipped() {
        let model = TransitionModel::default();
        let mut context = context_with_people(model, &[("less_5", 2.0), ("centenarian", 1.0)]);
        let outcome = context.simulate_population(&dates(5)).unwrap();
        assert_eq!(outcome.simulated, 2);
        assert_eq!(outcome.skipped, vec![2]);
    }

    #[test]
    fn same_seed_same_trajectories() {
        let run = || {
            let mut context =
                context_with_people(TransitionModel::default(), &[("over_65", 20.0)]);
            context.simulate_population(&dates(60)).unwrap();
            context.get_daily_records().to_vec()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn records_are_grouped_by_person_in_date_order() {
        let mut context =
            context_with_people(TransitionModel::default(), &[("25_to_64", 10.0)]);
        let days = dates(10);
        context.simulate_population(&days).unwrap();
        let records = context.get_daily_records();
        assert_eq!(records.len(), 100);
        for (i, record) in records.iter().enumerate() {
            assert_eq!(record.unique_id, i / 10);
            assert_eq!(record.date, days[i % 10]);
        }
    }
}
