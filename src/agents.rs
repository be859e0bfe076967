//! The population: agent ids, epidemic states and pathogen attachments.
//!
//! Agents are stored in an arena indexed by `AgentId`, in the order they were
//! added. Ids are dense and never reused, so ascending id order is also the
//! order in which a step visits agents.
//!
//! The state of an agent only changes together with its pathogen attachment:
//! `infect_agent` attaches a pathogen and moves the agent into an infected
//! state, `recover_agent` detaches it and moves the agent back to
//! `EpiState::Susceptible`, and `progress_agent` moves between the two
//! infected states while keeping the pathogen.
use std::fmt::{self, Display};
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::define_data_plugin;
use crate::location::{ContextLocationExt, Location};
use crate::pathogen::Pathogen;

/// Stable identifier of an agent; the index of the agent in the population.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub usize);

impl Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The epidemic states of the model.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EpiState {
    Susceptible,
    Infected,
    InfectedHospitalized,
}

impl EpiState {
    pub const ALL: [EpiState; 3] = [
        EpiState::Susceptible,
        EpiState::Infected,
        EpiState::InfectedHospitalized,
    ];

    /// Position of the state in `EpiState::ALL`.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            EpiState::Susceptible => 0,
            EpiState::Infected => 1,
            EpiState::InfectedHospitalized => 2,
        }
    }

    /// Whether agents in this state carry a pathogen.
    #[must_use]
    pub fn is_infected(self) -> bool {
        !matches!(self, EpiState::Susceptible)
    }

    /// Human readable name used in output.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            EpiState::Susceptible => "Susceptible",
            EpiState::Infected => "Infected",
            EpiState::InfectedHospitalized => "Infected (hospitalized)",
        }
    }
}

impl Display for EpiState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

struct AgentRecord {
    state: EpiState,
    pathogen: Option<Rc<Pathogen>>,
}

#[derive(Default)]
struct PopulationData {
    agents: Vec<AgentRecord>,
}

impl PopulationData {
    fn record(&self, agent: AgentId) -> &AgentRecord {
        self.agents
            .get(agent.0)
            .unwrap_or_else(|| panic!("Agent {agent} does not exist"))
    }

    fn record_mut(&mut self, agent: AgentId) -> &mut AgentRecord {
        self.agents
            .get_mut(agent.0)
            .unwrap_or_else(|| panic!("Agent {agent} does not exist"))
    }
}

define_data_plugin!(PopulationPlugin, PopulationData, PopulationData::default());

pub trait ContextAgentsExt {
    /// Adds a susceptible agent without a pathogen, located at `Location::Home`.
    fn add_agent(&mut self) -> AgentId;

    /// Adds `count` susceptible agents and returns their ids in order.
    fn add_agents(&mut self, count: usize) -> Vec<AgentId>;

    /// The number of agents in the population.
    fn get_population(&self) -> usize;

    /// # Panics
    ///
    /// Panics if the agent does not exist.
    fn get_agent_state(&self, agent: AgentId) -> EpiState;

    /// The pathogen attached to an agent; `None` exactly when the agent is
    /// susceptible.
    ///
    /// # Panics
    ///
    /// Panics if the agent does not exist.
    fn get_agent_pathogen(&self, agent: AgentId) -> Option<&Rc<Pathogen>>;

    /// Attaches `pathogen` and moves the agent into the infected state `state`.
    ///
    /// # Panics
    ///
    /// Panics if `state` is `EpiState::Susceptible` or the agent does not exist.
    fn infect_agent(&mut self, agent: AgentId, pathogen: Rc<Pathogen>, state: EpiState);

    /// Moves an infected agent to the other infected state, keeping its pathogen.
    ///
    /// # Panics
    ///
    /// Panics if the agent is not infected, `state` is not an infected state,
    /// or the agent does not exist.
    fn progress_agent(&mut self, agent: AgentId, state: EpiState);

    /// Detaches the pathogen and makes the agent susceptible again.
    ///
    /// # Panics
    ///
    /// Panics if the agent does not exist.
    fn recover_agent(&mut self, agent: AgentId);

    fn count_agents_in_state(&self, state: EpiState) -> usize;
}

impl ContextAgentsExt for Context {
    fn add_agent(&mut self) -> AgentId {
        let data_container = self.get_data_mut(PopulationPlugin);
        let agent = AgentId(data_container.agents.len());
        data_container.agents.push(AgentRecord {
            state: EpiState::Susceptible,
            pathogen: None,
        });
        self.set_location(agent, Location::default());
        agent
    }

    fn add_agents(&mut self, count: usize) -> Vec<AgentId> {
        (0..count).map(|_| self.add_agent()).collect()
    }

    fn get_population(&self) -> usize {
        self.get_data(PopulationPlugin)
            .map_or(0, |data_container| data_container.agents.len())
    }

    fn get_agent_state(&self, agent: AgentId) -> EpiState {
        population(self, agent).record(agent).state
    }

    fn get_agent_pathogen(&self, agent: AgentId) -> Option<&Rc<Pathogen>> {
        population(self, agent).record(agent).pathogen.as_ref()
    }

    fn infect_agent(&mut self, agent: AgentId, pathogen: Rc<Pathogen>, state: EpiState) {
        assert!(
            state.is_infected(),
            "Agent {agent} cannot be infected into state {state}"
        );
        let record = self.get_data_mut(PopulationPlugin).record_mut(agent);
        record.state = state;
        record.pathogen = Some(pathogen);
    }

    fn progress_agent(&mut self, agent: AgentId, state: EpiState) {
        let record = self.get_data_mut(PopulationPlugin).record_mut(agent);
        assert!(
            record.state.is_infected() && state.is_infected(),
            "Agent {agent} cannot move from {} to {state} without changing its pathogen",
            record.state
        );
        debug_assert!(record.pathogen.is_some());
        record.state = state;
    }

    fn recover_agent(&mut self, agent: AgentId) {
        let record = self.get_data_mut(PopulationPlugin).record_mut(agent);
        record.state = EpiState::Susceptible;
        record.pathogen = None;
    }

    fn count_agents_in_state(&self, state: EpiState) -> usize {
        self.get_data(PopulationPlugin).map_or(0, |data_container| {
            data_container
                .agents
                .iter()
                .filter(|record| record.state == state)
                .count()
        })
    }
}

fn population(context: &Context, agent: AgentId) -> &PopulationData {
    context
        .get_data(PopulationPlugin)
        .unwrap_or_else(|| panic!("Agent {agent} does not exist"))
}
