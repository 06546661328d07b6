//! Wires the pipeline together: load demographics, generate the sample, simulate every person,
//! and write the time series and daily summary reports.
use std::path::PathBuf;

use log::info;

use crate::context::Context;
use crate::demographics::load_demographics;
use crate::error::EpiError;
use crate::global_properties::ContextGlobalPropertiesExt;
use crate::parameters::{transition_model_or_default, IntoSimulationDate, Parameters, ParametersValues};
use crate::population::ContextPopulationExt;
use crate::progression::{ContextProgressionExt, DailyRecord, SimulationOutcome};
use crate::random::ContextRandomExt;
use crate::report::ContextReportExt;
use crate::summary::{ContextSummaryExt, SummaryRecord};

pub const TIMESERIES_REPORT: &str = "covid_simulated_timeseries";
pub const SUMMARY_REPORT: &str = "covid_summary_timeseries";

/// Sets up a run from the `Parameters` global property and the transition model (the default
/// model if none is configured).
///
/// People are generated and simulated straight away and the time series report is written.
/// Summary rows are written by plans, one per simulated day, so the summary report is only
/// complete once the context has executed.
///
/// # Errors
/// Returns an `EpiError` if parameters are missing, the countries file can't be read or a report
/// file can't be created. Nothing is written in those cases.
pub fn init(context: &mut Context) -> Result<SimulationOutcome, EpiError> {
    let parameters = context
        .get_global_property_value(Parameters)
        .cloned()
        .ok_or_else(|| EpiError::ConfigError("epistate.Parameters is not set".to_string()))?;
    let age_groups: Vec<String> = transition_model_or_default(context)?
        .age_group_names()
        .map(str::to_string)
        .collect();

    let demographics = load_demographics(
        &parameters.countries_file,
        &parameters.countries,
        &age_groups,
    )?;
    let dates = parameters.dates()?;
    context.generate_population(&demographics, parameters.sample_ratio, &age_groups);

    context.add_report::<DailyRecord>(TIMESERIES_REPORT)?;
    context.add_report::<SummaryRecord>(SUMMARY_REPORT)?;

    let outcome = context.simulate_population(&dates)?;
    for record in context.get_daily_records() {
        context.send_report(record.clone())?;
    }

    context.index_daily_records(&parameters.countries);
    context.schedule_daily_summaries(&dates);
    Ok(outcome)
}

/// Runs a whole simulation on a fresh context and writes both reports to `output_dir`,
/// replacing any earlier output.
///
/// # Errors
/// Returns an `EpiError` if the parameters are invalid, the countries file can't be read, or a
/// report can't be written.
pub fn run<S, E>(
    countries_file: impl Into<PathBuf>,
    countries: impl IntoIterator<Item = impl Into<String>>,
    sample_ratio: f64,
    start_date: S,
    end_date: E,
    random_seed: u64,
    output_dir: impl Into<PathBuf>,
) -> Result<SimulationOutcome, EpiError>
where
    S: IntoSimulationDate,
    E: IntoSimulationDate,
{
    let parameters =
        ParametersValues::new(countries_file, countries, sample_ratio, start_date, end_date)?;

    let mut context = Context::new();
    context.set_global_property_value(Parameters, parameters)?;
    context
        .report_options()
        .directory(output_dir.into())
        .overwrite(true);
    context.init_random(random_seed);

    let outcome = init(&mut context)?;
    context.execute();
    context.flush_reports()?;
    if let Some(error) = context.take_summary_error() {
        return Err(error);
    }
    info!("Summarising the data is done.");
    Ok(outcome)
}
