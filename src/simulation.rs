//! Setting up and running the model.
//!
//! `init` builds everything a run needs from a `ModelConfig` and schedules
//! one plan per step at times `1, 2, ..., steps`. Each step runs the handler
//! of every agent in ascending id order, commits the requested state changes,
//! records the state/location counts and emits a `StepCompletedEvent`.
use std::rc::Rc;

use log::{debug, info};
use serde::Serialize;

use crate::agents::{AgentId, ContextAgentsExt, EpiState};
use crate::context::{Context, Event, ExecutionPhase};
use crate::define_data_plugin;
use crate::define_global_property;
use crate::error::ModelError;
use crate::global_properties::ContextGlobalPropertiesExt;
use crate::infection_log::ContextInfectionLogExt;
use crate::location::{ContextLocationExt, Location};
use crate::network::init_small_world;
use crate::parameters::{ModelConfig, Parameters};
use crate::pathogen::{seed_randomly, Pathogen};
use crate::random::ContextRandomExt;
use crate::transitions::{assign_initial_locations, ContextTransitionsExt};

define_global_property!(ModelPathogen, Rc<Pathogen>);
define_global_property!(StepCount, usize);

/// Emitted once a step has been committed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StepCompletedEvent {
    pub step: usize,
}

impl Event for StepCompletedEvent {}

/// Number of agents in each state at each location.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StateLocationCounts {
    counts: [[usize; 3]; 3],
}

impl StateLocationCounts {
    #[must_use]
    pub fn get(&self, state: EpiState, location: Location) -> usize {
        self.counts[state.index()][location.index()]
    }

    /// Agents in `state`, wherever they are.
    #[must_use]
    pub fn state_total(&self, state: EpiState) -> usize {
        self.counts[state.index()].iter().sum()
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }
}

define_data_plugin!(StateCountHistoryPlugin, Vec<StateLocationCounts>, Vec::new());

pub trait ContextSimulationExt {
    /// Counts the current population by state and location.
    fn count_states_by_location(&self) -> StateLocationCounts;

    /// Counts recorded by `init` (index 0) and after every step since (index
    /// `n` for step `n`).
    fn get_state_count_history(&self) -> &[StateLocationCounts];

    /// Runs one step: every agent's handler in ascending id order, then the
    /// commit of the requested state changes.
    fn run_step(&mut self, step: usize);

    /// The pathogen the run was seeded with, if `init` has been called.
    fn get_model_pathogen(&self) -> Option<&Rc<Pathogen>>;

    /// The number of steps scheduled by `init`.
    fn get_step_count(&self) -> Option<usize>;
}

impl ContextSimulationExt for Context {
    fn count_states_by_location(&self) -> StateLocationCounts {
        let mut counts = StateLocationCounts::default();
        for id in 0..self.get_population() {
            let agent = AgentId(id);
            let state = self.get_agent_state(agent);
            let location = self.get_location(agent);
            counts.counts[state.index()][location.index()] += 1;
        }
        counts
    }

    fn get_state_count_history(&self) -> &[StateLocationCounts] {
        self.get_data(StateCountHistoryPlugin)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn run_step(&mut self, step: usize) {
        for id in 0..self.get_population() {
            let agent = AgentId(id);
            let handler = self.get_agent_state(agent).handler();
            handler(self, agent);
        }
        let committed = self.commit_transitions();

        let counts = self.count_states_by_location();
        debug!(
            "step {step}: {committed} transitions, {} susceptible, {} infected, {} hospitalized",
            counts.state_total(EpiState::Susceptible),
            counts.state_total(EpiState::Infected),
            counts.state_total(EpiState::InfectedHospitalized),
        );
        self.get_data_mut(StateCountHistoryPlugin).push(counts);
        self.emit_event(StepCompletedEvent { step });
    }

    fn get_model_pathogen(&self) -> Option<&Rc<Pathogen>> {
        self.get_global_property_value(ModelPathogen)
    }

    fn get_step_count(&self) -> Option<usize> {
        self.get_global_property_value(StepCount).copied()
    }
}

/// Sets up a run: parameters, population, contact graph, seeded pathogen,
/// initial locations and the step plans.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the contact graph
/// cannot be built.
pub fn init(context: &mut Context, config: &ModelConfig) -> Result<(), ModelError> {
    config.validate()?;
    context.init_random(config.seed);
    context.set_global_property_value(Parameters, config.parameters)?;
    context.set_global_property_value(StepCount, config.steps)?;

    context.add_agents(config.population);
    init_small_world(context, config.average_degree, config.rewiring_probability)?;

    let pathogen = Rc::new(config.pathogen.clone());
    let seeded = seed_randomly(context, &pathogen, config.initial_prevalence)?;
    context.set_global_property_value(ModelPathogen, pathogen)?;
    assign_initial_locations(context);

    let initial_counts = context.count_states_by_location();
    context
        .get_data_mut(StateCountHistoryPlugin)
        .push(initial_counts);

    for step in 1..=config.steps {
        #[allow(clippy::cast_precision_loss)]
        let time = step as f64;
        context.add_plan(time, move |context| context.run_step(step));
    }
    #[allow(clippy::cast_precision_loss)]
    let end = config.steps as f64;
    context.add_plan_with_phase(
        end,
        |context| {
            info!(
                "run finished after {} infection events",
                context.get_infection_log().len()
            );
        },
        ExecutionPhase::Last,
    );
    info!(
        "initialized {} agents with {} seeded infections; running {} steps with seed {}",
        config.population,
        seeded.len(),
        config.steps,
        config.seed
    );
    Ok(())
}

/// Builds a fresh context for `config`, runs it to completion and returns it
/// for inspection.
///
/// # Errors
///
/// Returns an error if setup fails; see `init`.
pub fn run(config: &ModelConfig) -> Result<Context, ModelError> {
    let mut context = Context::new();
    init(&mut context, config)?;
    context.execute();
    Ok(context)
}
