//! Append-only record of transmission events.
//!
//! Events are appended by the susceptible handler at the moment a
//! transmission succeeds, so the log is ordered by step and, within a step,
//! by agent id. Nothing ever removes or edits an entry.
use serde::{Deserialize, Serialize};

use crate::agents::AgentId;
use crate::context::Context;
use crate::define_data_plugin;
use crate::location::Location;

/// One successful transmission.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfectionEvent {
    /// The step in which the transmission happened.
    pub step: usize,
    pub susceptible: AgentId,
    pub infector: AgentId,
    /// The location shared by both agents when the transmission happened.
    pub location: Location,
}

define_data_plugin!(InfectionLogPlugin, Vec<InfectionEvent>, Vec::new());

pub trait ContextInfectionLogExt {
    fn record_infection(&mut self, event: InfectionEvent);

    /// Every event recorded so far, oldest first.
    fn get_infection_log(&self) -> &[InfectionEvent];
}

impl ContextInfectionLogExt for Context {
    fn record_infection(&mut self, event: InfectionEvent) {
        self.get_data_mut(InfectionLogPlugin).push(event);
    }

    fn get_infection_log(&self) -> &[InfectionEvent] {
        self.get_data(InfectionLogPlugin)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
