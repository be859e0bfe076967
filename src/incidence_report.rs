//! CSV report of transmission events, one row per infection.
use serde::{Deserialize, Serialize};

use crate::agents::AgentId;
use crate::context::Context;
use crate::define_data_plugin;
use crate::define_report;
use crate::error::ModelError;
use crate::infection_log::ContextInfectionLogExt;
use crate::location::Location;
use crate::report::ContextReportExt;
use crate::simulation::StepCompletedEvent;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct IncidenceReportItem {
    pub step: usize,
    pub susceptible: AgentId,
    pub infector: AgentId,
    pub location: Location,
}

define_report!(IncidenceReportItem);

// Number of infection log entries already written.
define_data_plugin!(IncidenceReportCursor, usize, 0);

fn handle_step_completed(context: &mut Context, _event: StepCompletedEvent) {
    let written = *context.get_data_mut(IncidenceReportCursor);
    let log = context.get_infection_log();
    for event in &log[written..] {
        context.send_report(IncidenceReportItem {
            step: event.step,
            susceptible: event.susceptible,
            infector: event.infector,
            location: event.location,
        });
    }
    let total = log.len();
    *context.get_data_mut(IncidenceReportCursor) = total;
}

/// Opens `incidence.csv` under the configured report directory and appends
/// the new infection log entries after every step.
///
/// # Errors
///
/// Returns an error if the report file cannot be created.
pub fn init(context: &mut Context) -> Result<(), ModelError> {
    context.add_report::<IncidenceReportItem>("incidence")?;
    context.subscribe_to_event::<StepCompletedEvent>(handle_step_completed);
    Ok(())
}
