//! Where each agent is during a step.
//!
//! The location store holds exactly one `Location` per agent, indexed by
//! `AgentId`. New agents start at `Location::Home` until the initial
//! locations are drawn. It is written in place by each agent's own handler, so during a
//! step it mixes this step's locations (agents already handled) with last
//! step's locations (agents not handled yet).
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::agents::AgentId;
use crate::context::Context;
use crate::define_data_plugin;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Location {
    Community,
    Hospital,
    #[default]
    Home,
}

impl Location {
    pub const ALL: [Location; 3] = [Location::Community, Location::Hospital, Location::Home];

    /// Position of the location in `Location::ALL`.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Location::Community => 0,
            Location::Hospital => 1,
            Location::Home => 2,
        }
    }

    /// Maps a uniform draw in `[0, 1)` to a location with `floor(draw * 3)`.
    #[must_use]
    pub fn from_uniform(draw: f64) -> Location {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        match (draw * 3.0).floor() as usize {
            0 => Location::Community,
            1 => Location::Hospital,
            _ => Location::Home,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Location::Community => "Community",
            Location::Hospital => "Hospital",
            Location::Home => "Home",
        }
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Default)]
struct LocationStore {
    locations: Vec<Location>,
}

define_data_plugin!(LocationPlugin, LocationStore, LocationStore::default());

pub trait ContextLocationExt {
    /// Overwrites the location of `agent`. Agents below `agent` that have no
    /// location yet get `Location::default()`.
    fn set_location(&mut self, agent: AgentId, location: Location);

    /// # Panics
    ///
    /// Panics if `agent` is not in the location store.
    fn get_location(&self, agent: AgentId) -> Location;

    /// Whether every one of the first `population` agents has a location.
    fn all_agents_located(&self, population: usize) -> bool;
}

impl ContextLocationExt for Context {
    fn set_location(&mut self, agent: AgentId, location: Location) {
        let store = &mut self.get_data_mut(LocationPlugin).locations;
        if agent.0 >= store.len() {
            store.resize(agent.0 + 1, Location::default());
        }
        store[agent.0] = location;
    }

    fn get_location(&self, agent: AgentId) -> Location {
        self.get_data(LocationPlugin)
            .and_then(|store| store.locations.get(agent.0).copied())
            .unwrap_or_else(|| panic!("Agent {agent} has no location"))
    }

    fn all_agents_located(&self, population: usize) -> bool {
        self.get_data(LocationPlugin)
            .map_or(0, |store| store.locations.len())
            >= population
    }
}
