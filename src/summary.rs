//! The human-readable report printed at the end of a run.
//!
//! It lists every infection event in the order it happened, then the run
//! settings and state totals, then the number of agents in each state at each
//! location.
use std::fmt::Write;

use crate::agents::EpiState;
use crate::context::Context;
use crate::infection_log::ContextInfectionLogExt;
use crate::location::Location;
use crate::parameters::get_parameters;
use crate::simulation::ContextSimulationExt;

/// Renders the summary of a finished run.
///
/// # Panics
///
/// Panics if the model parameters have not been set.
#[must_use]
pub fn format_summary(context: &Context) -> String {
    let mut summary = String::new();
    write_summary(context, &mut summary).expect("writing to a String cannot fail");
    summary
}

fn write_summary(context: &Context, out: &mut String) -> std::fmt::Result {
    writeln!(out, "Infection events:")?;
    for event in context.get_infection_log() {
        writeln!(
            out,
            "  Step {}: susceptible agent {} infected by agent {} in {}",
            event.step, event.susceptible, event.infector, event.location
        )?;
    }

    writeln!(out)?;
    writeln!(out, "Model summary:")?;
    if let Some(pathogen) = context.get_model_pathogen() {
        writeln!(out, "  Pathogen: {pathogen}")?;
    }
    if let Some(steps) = context.get_step_count() {
        writeln!(out, "  Steps: {steps}")?;
    }
    for line in get_parameters(context).to_string().lines() {
        writeln!(out, "  {line}")?;
    }
    writeln!(
        out,
        "  Infection events: {}",
        context.get_infection_log().len()
    )?;

    let counts = context.count_states_by_location();
    writeln!(out)?;
    writeln!(out, "Final state totals:")?;
    for state in EpiState::ALL {
        writeln!(out, "  {state}: {}", counts.state_total(state))?;
    }

    writeln!(out)?;
    writeln!(out, "Location-wise distribution of states:")?;
    for state in EpiState::ALL {
        writeln!(out, "  {state}:")?;
        for location in Location::ALL {
            writeln!(out, "    {location}: {}", counts.get(state, location))?;
        }
    }
    Ok(())
}

/// Prints the summary of a finished run to stdout.
pub fn print_summary(context: &Context) {
    print!("{}", format_summary(context));
}
