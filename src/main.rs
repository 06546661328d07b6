use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::Args;
use epistate::parameters::parse_date;
use epistate::runner::run_with_custom_args;
use epistate::simulation;
use epistate::{
    info, warn, BaseArgs, Context, ContextGlobalPropertiesExt, ContextSummaryExt, EpiError,
    Parameters, ParametersValues, TransitionModel, TransitionModelProperty,
};

/// Run parameters. Each one overrides the matching field of `epistate.Parameters` in the
/// `--config` file.
#[derive(Args, Debug)]
struct SimulationArgs {
    /// CSV of country populations and age-group percentages
    #[arg(long)]
    countries_file: Option<PathBuf>,

    /// Country to simulate; repeat for more than one
    #[arg(long = "country")]
    countries: Vec<String>,

    /// Divisor applied to each country's population
    #[arg(long)]
    sample_ratio: Option<f64>,

    /// First simulated day (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    start_date: Option<NaiveDate>,

    /// Last simulated day, inclusive (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    end_date: Option<NaiveDate>,

    /// JSON transition model; the built-in model is used if neither this nor the config sets one
    #[arg(long)]
    transition_model: Option<PathBuf>,
}

fn missing(flag: &str) -> EpiError {
    EpiError::ConfigError(format!("{flag} is required (on the command line or in --config)"))
}

fn resolve_parameters(
    configured: Option<&ParametersValues>,
    args: SimulationArgs,
) -> Result<ParametersValues, EpiError> {
    let countries_file = args
        .countries_file
        .or_else(|| configured.map(|p| p.countries_file.clone()))
        .ok_or_else(|| missing("--countries-file"))?;
    let countries = if args.countries.is_empty() {
        configured.map(|p| p.countries.clone()).unwrap_or_default()
    } else {
        args.countries
    };
    let sample_ratio = args
        .sample_ratio
        .or_else(|| configured.map(|p| p.sample_ratio))
        .ok_or_else(|| missing("--sample-ratio"))?;
    let start_date = args
        .start_date
        .or_else(|| configured.map(|p| p.start_date))
        .ok_or_else(|| missing("--start-date"))?;
    let end_date = args
        .end_date
        .or_else(|| configured.map(|p| p.end_date))
        .ok_or_else(|| missing("--end-date"))?;
    ParametersValues::new(countries_file, countries, sample_ratio, start_date, end_date)
}

fn setup(
    context: &mut Context,
    _args: BaseArgs,
    simulation_args: Option<SimulationArgs>,
) -> Result<(), EpiError> {
    let simulation_args = simulation_args.ok_or_else(|| missing("run parameters"))?;
    if let Some(path) = &simulation_args.transition_model {
        info!("Loading transition model from: {}", path.display());
        let model = TransitionModel::from_json_file(path)?;
        context.set_global_property_value(TransitionModelProperty, model)?;
    }

    let parameters = resolve_parameters(
        context.get_global_property_value(Parameters),
        simulation_args,
    )?;
    context.set_global_property_value(Parameters, parameters)?;

    let outcome = simulation::init(context)?;
    if !outcome.skipped.is_empty() {
        warn!(
            "{} people could not be simulated and were left out",
            outcome.skipped.len()
        );
    }
    Ok(())
}

fn main() -> ExitCode {
    let result = run_with_custom_args(setup).and_then(|context| match context.take_summary_error() {
        Some(error) => Err(error.into()),
        None => Ok(()),
    });
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("epistate: {error}");
            ExitCode::FAILURE
        }
    }
}
