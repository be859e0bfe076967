use std::process::ExitCode;

use ixa_colocation::runner::run_with_args;
use ixa_colocation::{incidence_report, simulation, state_counts_report, summary};

fn main() -> ExitCode {
    let result = run_with_args(|context, args, config| {
        // Reports are only written when an output directory is given.
        if args.output_dir.is_some() {
            incidence_report::init(context)?;
            state_counts_report::init(context)?;
        }
        simulation::init(context, config)
    });

    match result {
        Ok(context) => {
            summary::print_summary(&context);
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("Error: {error}");
            ExitCode::FAILURE
        }
    }
}
