//! CSV report of the number of agents per state and location after each step.
use serde::{Deserialize, Serialize};

use crate::agents::EpiState;
use crate::context::Context;
use crate::define_report;
use crate::error::ModelError;
use crate::location::Location;
use crate::report::ContextReportExt;
use crate::simulation::{ContextSimulationExt, StepCompletedEvent};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct StateCountsReportItem {
    pub step: usize,
    pub state: EpiState,
    pub location: Location,
    pub count: usize,
}

define_report!(StateCountsReportItem);

fn handle_step_completed(context: &mut Context, event: StepCompletedEvent) {
    let Some(counts) = context.get_state_count_history().last().copied() else {
        return;
    };
    for state in EpiState::ALL {
        for location in Location::ALL {
            context.send_report(StateCountsReportItem {
                step: event.step,
                state,
                location,
                count: counts.get(state, location),
            });
        }
    }
}

/// Opens `state_counts.csv` under the configured report directory and writes
/// nine rows, one per state and location, after every step.
///
/// # Errors
///
/// Returns an error if the report file cannot be created.
pub fn init(context: &mut Context) -> Result<(), ModelError> {
    context.add_report::<StateCountsReportItem>("state_counts")?;
    context.subscribe_to_event::<StepCompletedEvent>(handle_step_completed);
    Ok(())
}
