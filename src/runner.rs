use std::path::PathBuf;
use std::str::FromStr;

use clap::{Args, Command, FromArgMatches as _};

use crate::context::Context;
use crate::error::ModelError;
use crate::log::{enable_logging, info, set_log_level, LevelFilter};
use crate::parameters::ModelConfig;
use crate::report::ContextReportExt;

/// Default cli arguments for the model runner
#[derive(Args, Debug, Default)]
pub struct BaseArgs {
    /// Random seed; overrides the seed in the config file
    #[arg(short, long)]
    pub random_seed: Option<u64>,

    /// Optional path for a JSON model config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Optional directory for CSV reports; no reports are written without it
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Prefix for report file names
    #[arg(long, default_value = "")]
    pub prefix: String,

    /// Replace report files that already exist
    #[arg(short, long)]
    pub force_overwrite: bool,

    /// Enable logging at the given level (error, warn, info, debug, trace)
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Number of steps; overrides the config file
    #[arg(short, long)]
    pub steps: Option<usize>,
}

fn create_cli() -> Command {
    let cli = Command::new("ixa-colocation")
        .about("Co-location transmission model between Community, Hospital and Home");
    BaseArgs::augment_args(cli)
}

/// Parses `args` the way the command line is parsed.
///
/// # Errors
///
/// Returns the clap error for unknown or malformed arguments.
pub fn parse_args<I, T>(args: I) -> Result<BaseArgs, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let matches = create_cli().try_get_matches_from(args)?;
    BaseArgs::from_arg_matches(&matches)
}

/// Runs a simulation with the command line arguments of the process.
///
/// The config file (or the default config) is loaded and the seed and step
/// overrides applied, then `setup_fn` receives the context, the arguments
/// and the resulting config. The context is executed and returned.
///
/// # Errors
/// Returns an error if argument parsing, config loading or the setup function fails
pub fn run_with_args<F>(setup_fn: F) -> Result<Context, Box<dyn std::error::Error>>
where
    F: Fn(&mut Context, &BaseArgs, &ModelConfig) -> Result<(), ModelError>,
{
    let args = BaseArgs::from_arg_matches(&create_cli().get_matches())?;
    Ok(run_with_args_internal(&args, setup_fn)?)
}

pub(crate) fn run_with_args_internal<F>(args: &BaseArgs, setup_fn: F) -> Result<Context, ModelError>
where
    F: Fn(&mut Context, &BaseArgs, &ModelConfig) -> Result<(), ModelError>,
{
    // Instantiate a context
    let mut context = Context::new();

    if let Some(level) = &args.log_level {
        let level = LevelFilter::from_str(level)
            .map_err(|_| ModelError::ConfigError(format!("Unknown log level: {level}")))?;
        enable_logging();
        set_log_level(level);
    }

    // Optionally load the config from a file
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading model config from: {}", path.display());
            ModelConfig::from_json_file(&context, path)?
        }
        None => ModelConfig::default(),
    };
    if let Some(seed) = args.random_seed {
        config.seed = seed;
    }
    if let Some(steps) = args.steps {
        config.steps = steps;
    }

    // Optionally set output dir for reports
    if let Some(output_dir) = &args.output_dir {
        context
            .report_options()
            .directory(output_dir.clone())
            .file_prefix(args.prefix.clone())
            .overwrite(args.force_overwrite);
    }

    // Run the provided Fn
    setup_fn(&mut context, args, &config)?;

    // Execute the context
    context.execute();
    Ok(context)
}
