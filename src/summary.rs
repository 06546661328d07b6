//! Daily per-country counts of people in each disease state.
use std::cell::RefCell;
use std::collections::HashMap;

use chrono::NaiveDate;
use log::{error, info, trace};
use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::define_data_plugin;
use crate::define_report;
use crate::error::EpiError;
use crate::parameters::day_offset;
use crate::progression::{ContextProgressionExt, DailyRecord};
use crate::report::ContextReportExt;
use crate::state::{DiseaseState, STATE_COUNT};

/// Number of people in each state in one country on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub date: NaiveDate,
    pub country: String,
    #[serde(rename = "H")]
    pub healthy: usize,
    #[serde(rename = "I")]
    pub infected: usize,
    #[serde(rename = "S")]
    pub seriously_ill: usize,
    #[serde(rename = "M")]
    pub mildly_recovered: usize,
    #[serde(rename = "D")]
    pub dead: usize,
}
define_report!(SummaryRecord);

impl SummaryRecord {
    fn new(date: NaiveDate, country: &str, counts: &StateCounts) -> Self {
        SummaryRecord {
            date,
            country: country.to_string(),
            healthy: counts[DiseaseState::H.index()],
            infected: counts[DiseaseState::I.index()],
            seriously_ill: counts[DiseaseState::S.index()],
            mildly_recovered: counts[DiseaseState::M.index()],
            dead: counts[DiseaseState::D.index()],
        }
    }

    #[must_use]
    pub fn count(&self, state: DiseaseState) -> usize {
        match state {
            DiseaseState::H => self.healthy,
            DiseaseState::I => self.infected,
            DiseaseState::S => self.seriously_ill,
            DiseaseState::M => self.mildly_recovered,
            DiseaseState::D => self.dead,
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.healthy + self.infected + self.seriously_ill + self.mildly_recovered + self.dead
    }
}

type StateCounts = [usize; STATE_COUNT];

/// State counts keyed by `(date, country)`, built in a single pass over the records.
#[derive(Debug, Default, Clone)]
pub struct SummaryIndex {
    counts: HashMap<(NaiveDate, String), StateCounts>,
}

impl SummaryIndex {
    #[must_use]
    pub fn new(records: &[DailyRecord]) -> Self {
        let mut counts: HashMap<(NaiveDate, String), StateCounts> = HashMap::new();
        for record in records {
            let key = (record.date, record.country.clone());
            counts.entry(key).or_default()[record.state.index()] += 1;
        }
        SummaryIndex { counts }
    }

    /// Counts for `country` on `date`, zero if nobody was recorded there.
    #[must_use]
    pub fn record(&self, date: NaiveDate, country: &str) -> SummaryRecord {
        let counts = self
            .counts
            .get(&(date, country.to_string()))
            .copied()
            .unwrap_or_default();
        SummaryRecord::new(date, country, &counts)
    }

    /// One record per country in `countries` on `date`.
    pub fn day<S: AsRef<str>>(&self, date: NaiveDate, countries: &[S]) -> Vec<SummaryRecord> {
        countries
            .iter()
            .map(|country| self.record(date, country.as_ref()))
            .collect()
    }
}

/// Summarizes `records` into one row per date and country: dates outer, `countries` inner, both
/// in the given order. A date and country with no records gives a row of zeros.
#[must_use]
pub fn summarize<S: AsRef<str>>(
    records: &[DailyRecord],
    dates: &[NaiveDate],
    countries: &[S],
) -> Vec<SummaryRecord> {
    let index = SummaryIndex::new(records);
    dates
        .iter()
        .flat_map(|date| index.day(*date, countries))
        .collect()
}

struct SummaryData {
    index: SummaryIndex,
    countries: Vec<String>,
    // First failure while writing a scheduled summary.
    report_error: RefCell<Option<EpiError>>,
}

define_data_plugin!(
    SummaryPlugin,
    SummaryData,
    SummaryData {
        index: SummaryIndex::default(),
        countries: Vec::new(),
        report_error: RefCell::new(None),
    }
);

pub trait ContextSummaryExt {
    /// Indexes the simulated records for summaries over `countries`.
    fn index_daily_records(&mut self, countries: &[String]);

    /// The summary rows for `date`, one per indexed country.
    fn daily_summary(&self, date: NaiveDate) -> Vec<SummaryRecord>;

    /// Sends the summary rows for `date` to the summary report.
    ///
    /// # Errors
    /// Returns an `EpiError` if the report hasn't been added or can't be written.
    fn report_daily_summary(&self, date: NaiveDate) -> Result<(), EpiError>;

    /// Schedules one plan per date, at its day offset from the first date, that reports that
    /// day's summary.
    fn schedule_daily_summaries(&mut self, dates: &[NaiveDate]);

    /// Takes the first error hit by a scheduled summary, if any.
    fn take_summary_error(&self) -> Option<EpiError>;
}

impl ContextSummaryExt for Context {
    fn index_daily_records(&mut self, countries: &[String]) {
        info!("Summarising the simulated data");
        let index = SummaryIndex::new(self.get_daily_records());
        let data_container = self.get_data_container_mut(SummaryPlugin);
        data_container.index = index;
        data_container.countries = countries.to_vec();
    }

    fn daily_summary(&self, date: NaiveDate) -> Vec<SummaryRecord> {
        self.get_data_container(SummaryPlugin)
            .map(|data| data.index.day(date, &data.countries))
            .unwrap_or_default()
    }

    fn report_daily_summary(&self, date: NaiveDate) -> Result<(), EpiError> {
        for record in self.daily_summary(date) {
            self.send_report(record)?;
        }
        Ok(())
    }

    #[allow(clippy::cast_precision_loss)]
    fn schedule_daily_summaries(&mut self, dates: &[NaiveDate]) {
        let Some(first) = dates.first().copied() else {
            return;
        };
        for date in dates.iter().copied() {
            let time = day_offset(first, date) as f64;
            trace!("scheduling summary of {date} at t={time}");
            self.add_plan(time, move |context| {
                if let Err(e) = context.report_daily_summary(date) {
                    error!("could not write summary for {date}: {e}");
                    let data_container = context.get_data_container_mut(SummaryPlugin);
                    let report_error = data_container.report_error.get_mut();
                    if report_error.is_none() {
                        *report_error = Some(e);
                    }
                }
            });
        }
    }

    fn take_summary_error(&self) -> Option<EpiError> {
        self.get_data_container(SummaryPlugin)
            .and_then(|data| data.report_error.borrow_mut().take())
    }
}
