use std::path::{Path, PathBuf};

use clap::{Args, Command, FromArgMatches as _};
use log::info;

use crate::context::Context;
use crate::error::EpiError;
use crate::global_properties::ContextGlobalPropertiesExt;
use crate::log::set_log_spec;
use crate::parameters::register_global_properties;
use crate::random::ContextRandomExt;
use crate::report::ContextReportExt;

/// Default cli arguments for the epistate runner
#[derive(Args, Debug, Default)]
pub struct BaseArgs {
    /// Random seed
    #[arg(short, long, default_value = "0")]
    pub random_seed: u64,

    /// Optional path for a global properties config file
    #[arg(short, long, default_value = "")]
    pub config: String,

    /// Optional path for report output
    #[arg(short, long, default_value = "")]
    pub output_dir: String,

    /// Optional prefix for report file names
    #[arg(short, long, default_value = "")]
    pub prefix: String,

    /// Overwrite existing report files
    #[arg(short, long)]
    pub force_overwrite: bool,

    /// Log level, e.g. `info` or `warn,epistate::progression=trace`
    #[arg(short, long)]
    pub log_level: Option<String>,
}

fn create_epistate_cli() -> Command {
    let cli = Command::new("epistate");
    BaseArgs::augment_args(cli)
}

/// Runs a simulation with custom cli arguments.
///
/// This function allows you to define custom arguments and a setup function
///
/// # Parameters
/// - `setup_fn`: A function that takes a mutable reference to a `Context`, a `BaseArgs` struct,
///   a Option<A> where A is the custom cli arguments struct
///
/// # Errors
/// Returns an error if argument parsing, configuration, the setup function or writing reports
/// fails
pub fn run_with_custom_args<A, F>(setup_fn: F) -> Result<Context, Box<dyn std::error::Error>>
where
    A: Args,
    F: Fn(&mut Context, BaseArgs, Option<A>) -> Result<(), EpiError>,
{
    let mut cli = create_epistate_cli();
    cli = A::augment_args(cli);
    let matches = cli.get_matches();

    let base_args_matches = BaseArgs::from_arg_matches(&matches)?;
    let custom_matches = A::from_arg_matches(&matches)?;
    run_with_args_internal(base_args_matches, Some(custom_matches), setup_fn)
}

fn run_with_args_internal<A, F>(
    args: BaseArgs,
    custom_args: Option<A>,
    setup_fn: F,
) -> Result<Context, Box<dyn std::error::Error>>
where
    F: Fn(&mut Context, BaseArgs, Option<A>) -> Result<(), EpiError>,
{
    if let Some(log_level) = &args.log_level {
        set_log_spec(log_level)?;
    }

    // Instantiate a context
    let mut context = Context::new();
    register_global_properties(&mut context);

    // Optionally set global properties from a file
    if !args.config.is_empty() {
        info!("Loading global properties from: {}", args.config);
        let config_path = Path::new(&args.config);
        context.load_global_properties(config_path)?;
    }

    let report_config = context.report_options();
    // Optionally set output dir for reports
    if !args.output_dir.is_empty() {
        report_config.directory(PathBuf::from(&args.output_dir));
    }
    report_config
        .file_prefix(args.prefix.clone())
        .overwrite(args.force_overwrite);

    context.init_random(args.random_seed);

    // Run the provided Fn
    setup_fn(&mut context, args, custom_args)?;

    // Execute the context
    context.execute();
    context.flush_reports()?;
    Ok(context)
}
