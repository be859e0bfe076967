//! The per-agent state handlers.
//!
//! Every step, each agent's handler reassigns its location and decides on a
//! state change:
//!
//! | State                  | Location                        | Possible change                       |
//! |------------------------|---------------------------------|---------------------------------------|
//! | Susceptible            | uniform over the three          | infected by a co-located neighbor     |
//! | Infected               | Community or Home, even odds    | hospitalized or recovered (roulette)  |
//! | Infected (hospitalized)| Hospital                        | recovered, else discharged            |
//!
//! Location writes take effect immediately, so a handler sees the new location
//! of agents handled earlier in the step and the previous location of the
//! rest. State changes are queued and applied by `commit_transitions` once
//! every agent has been handled; within a step all handlers see the states as
//! they were when the step began.
//!
//! Every draw comes from `ModelRng`, in the order the handlers make them.
use std::rc::Rc;

use log::trace;

use crate::agents::{AgentId, ContextAgentsExt, EpiState};
use crate::context::Context;
use crate::define_data_plugin;
use crate::define_rng;
use crate::infection_log::{ContextInfectionLogExt, InfectionEvent};
use crate::location::{ContextLocationExt, Location};
use crate::network::ContextNetworkExt;
use crate::parameters::{get_parameters, InfectorSelection};
use crate::pathogen::Pathogen;
use crate::random::ContextRandomExt;

define_rng!(pub ModelRng);

/// Success probability of a transmission trial between a susceptible agent
/// and one co-located infected neighbor.
pub const TRANSMISSION_PROBABILITY: f64 = 0.3;

/// Probability that an infected agent spends the step in the community
/// rather than at home.
pub const COMMUNITY_PROBABILITY: f64 = 0.5;

/// The signature shared by all state handlers.
pub type Handler = fn(&mut Context, AgentId);

impl EpiState {
    /// The handler run once per step for agents in this state.
    #[must_use]
    pub fn handler(self) -> Handler {
        match self {
            EpiState::Susceptible => update_susceptible,
            EpiState::Infected => update_infected,
            EpiState::InfectedHospitalized => update_hospitalized,
        }
    }
}

/// A state change requested by a handler.
#[derive(Clone, Debug, PartialEq)]
pub enum Transition {
    /// A susceptible agent acquires `pathogen` and enters `state`.
    Infect {
        agent: AgentId,
        pathogen: Rc<Pathogen>,
        state: EpiState,
    },
    /// An infected agent moves to the other infected state.
    Progress { agent: AgentId, state: EpiState },
    /// An infected agent loses its pathogen and becomes susceptible.
    Recover { agent: AgentId },
}

define_data_plugin!(PendingTransitionsPlugin, Vec<Transition>, Vec::new());

pub trait ContextTransitionsExt {
    /// Queues a state change to be applied by `commit_transitions`.
    fn request_transition(&mut self, transition: Transition);

    /// Number of state changes waiting to be committed.
    fn pending_transition_count(&self) -> usize;

    /// Applies the queued state changes in the order they were requested and
    /// returns how many there were. An agent entering
    /// `EpiState::InfectedHospitalized` is moved to the hospital.
    fn commit_transitions(&mut self) -> usize;
}

impl ContextTransitionsExt for Context {
    fn request_transition(&mut self, transition: Transition) {
        trace!("requested {transition:?}");
        self.get_data_mut(PendingTransitionsPlugin).push(transition);
    }

    fn pending_transition_count(&self) -> usize {
        self.get_data(PendingTransitionsPlugin).map_or(0, Vec::len)
    }

    fn commit_transitions(&mut self) -> usize {
        let pending = std::mem::take(self.get_data_mut(PendingTransitionsPlugin));
        let committed = pending.len();
        for transition in pending {
            match transition {
                Transition::Infect {
                    agent,
                    pathogen,
                    state,
                } => {
                    self.infect_agent(agent, pathogen, state);
                    if state == EpiState::InfectedHospitalized {
                        self.set_location(agent, Location::Hospital);
                    }
                }
                Transition::Progress { agent, state } => {
                    self.progress_agent(agent, state);
                    if state == EpiState::InfectedHospitalized {
                        self.set_location(agent, Location::Hospital);
                    }
                }
                Transition::Recover { agent } => self.recover_agent(agent),
            }
        }
        committed
    }
}

/// The step the context is currently executing. Steps run at integer times.
#[must_use]
pub fn current_step(context: &Context) -> usize {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let step = context.get_current_time() as usize;
    step
}

/// Gives every agent a uniformly chosen starting location.
pub fn assign_initial_locations(context: &mut Context) {
    for id in 0..context.get_population() {
        let location = Location::from_uniform(context.sample_uniform(ModelRng));
        context.set_location(AgentId(id), location);
    }
}

fn is_eligible_infector(context: &Context, neighbor: AgentId, location: Location) -> bool {
    context.get_agent_state(neighbor) == EpiState::Infected
        && context.get_location(neighbor) == location
}

/// Scans the neighbors in order and runs a transmission trial for each
/// eligible one until a trial succeeds.
fn select_first_success(context: &Context, agent: AgentId, location: Location) -> Option<AgentId> {
    context.get_neighbors(agent).iter().copied().find(|&neighbor| {
        is_eligible_infector(context, neighbor, location)
            && context.sample_uniform(ModelRng) < TRANSMISSION_PROBABILITY
    })
}

/// Picks one eligible neighbor uniformly with a single draw.
fn select_uniform_among_eligible(
    context: &Context,
    agent: AgentId,
    location: Location,
) -> Option<AgentId> {
    let eligible: Vec<AgentId> = context
        .get_neighbors(agent)
        .iter()
        .copied()
        .filter(|&neighbor| is_eligible_infector(context, neighbor, location))
        .collect();
    if eligible.is_empty() {
        return None;
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let index = (context.sample_uniform(ModelRng) * eligible.len() as f64).floor() as usize;
    Some(eligible[index.min(eligible.len() - 1)])
}

/// Handler for susceptible agents.
///
/// Does nothing if the agent is no longer susceptible. Otherwise draws a new
/// location and looks for an infector among the neighbors that are infected
/// and at that location. On infection the event is logged right away and the
/// agent is queued to become infected with the infector's pathogen,
/// hospitalized with probability "Prob hospitalization".
pub fn update_susceptible(context: &mut Context, agent: AgentId) {
    if context.get_agent_state(agent) != EpiState::Susceptible {
        return;
    }

    let location = Location::from_uniform(context.sample_uniform(ModelRng));
    context.set_location(agent, location);

    let parameters = get_parameters(context);
    let infector = match parameters.infector_selection {
        InfectorSelection::FirstSuccess => select_first_success(context, agent, location),
        InfectorSelection::UniformAmongEligible => {
            select_uniform_among_eligible(context, agent, location)
        }
    };
    let Some(infector) = infector else {
        return;
    };

    let step = current_step(context);
    trace!("step {step}: agent {infector} infects agent {agent} at {location}");
    context.record_infection(InfectionEvent {
        step,
        susceptible: agent,
        infector,
        location,
    });

    let pathogen = Rc::clone(
        context
            .get_agent_pathogen(infector)
            .expect("Infected agents always carry a pathogen"),
    );
    let state = if parameters.prob_hospitalization > context.sample_uniform(ModelRng) {
        EpiState::InfectedHospitalized
    } else {
        EpiState::Infected
    };
    context.request_transition(Transition::Infect {
        agent,
        pathogen,
        state,
    });
}

/// Handler for infected agents: Community or Home, then a roulette over
/// hospitalization and recovery.
pub fn update_infected(context: &mut Context, agent: AgentId) {
    let location = if context.sample_uniform(ModelRng) < COMMUNITY_PROBABILITY {
        Location::Community
    } else {
        Location::Home
    };
    context.set_location(agent, location);

    let parameters = get_parameters(context);
    match context.sample_roulette(ModelRng, &parameters.infected_outcomes()) {
        Some(0) => context.request_transition(Transition::Progress {
            agent,
            state: EpiState::InfectedHospitalized,
        }),
        Some(1) => context.request_transition(Transition::Recover { agent }),
        _ => {}
    }
}

/// Handler for hospitalized agents: stay at the hospital, then recover or,
/// failing that, get discharged.
pub fn update_hospitalized(context: &mut Context, agent: AgentId) {
    context.set_location(agent, Location::Hospital);

    let parameters = get_parameters(context);
    if parameters.prob_recovery > context.sample_uniform(ModelRng) {
        context.request_transition(Transition::Recover { agent });
    } else if parameters.discharge_infected > context.sample_uniform(ModelRng) {
        context.request_transition(Transition::Progress {
            agent,
            state: EpiState::Infected,
        });
    }
}

#[cfg(all(test, feature = "scripted_draws"))]
#[allow(clippy::float_cmp)]
mod test {
    use super::*;
    use crate::global_properties::ContextGlobalPropertiesExt;
    use crate::parameters::{Parameters, ParametersValues};

    fn setup(agents: usize, parameters: ParametersValues) -> Context {
        let mut context = Context::new();
        context.init_random(7);
        context
            .set_global_property_value(Parameters, parameters)
            .unwrap();
        context.add_agents(agents);
        context
    }

    fn infect(context: &mut Context, agent: AgentId, location: Location) {
        context.infect_agent(agent, Rc::new(Pathogen::default()), EpiState::Infected);
        context.set_location(agent, location);
    }

    #[test]
    fn dispatch_matches_state() {
        let mut context = setup(3, ParametersValues::default());
        infect(&mut context, AgentId(1), Location::Home);
        context.infect_agent(
            AgentId(2),
            Rc::new(Pathogen::default()),
            EpiState::InfectedHospitalized,
        );
        context.set_location(AgentId(2), Location::Home);

        // Community for the susceptible agent, Community for the infected one
        context.script_uniform_draws(ModelRng, [0.0, 0.0, 0.9]);
        for id in 0..3 {
            let agent = AgentId(id);
            let handler = context.get_agent_state(agent).handler();
            handler(&mut context, agent);
        }
        assert_eq!(context.get_location(AgentId(0)), Location::Community);
        assert_eq!(context.get_location(AgentId(1)), Location::Community);
        assert_eq!(context.get_location(AgentId(2)), Location::Hospital);
    }

    #[test]
    fn co_located_infected_neighbor_infects() {
        let mut context = setup(2, ParametersValues::default());
        context.add_edge_bidi(AgentId(0), AgentId(1)).unwrap();
        infect(&mut context, AgentId(0), Location::Community);
        context.set_location(AgentId(1), Location::Home);

        // location Community, trial succeeds, hospitalization fails
        context.script_uniform_draws(ModelRng, [0.1, 0.05, 0.9]);
        update_susceptible(&mut context, AgentId(1));

        assert_eq!(context.get_location(AgentId(1)), Location::Community);
        assert_eq!(
            context.get_infection_log(),
            &[InfectionEvent {
                step: 0,
                susceptible: AgentId(1),
                infector: AgentId(0),
                location: Location::Community,
            }]
        );
        // The change is only applied on commit.
        assert_eq!(context.get_agent_state(AgentId(1)), EpiState::Susceptible);
        assert_eq!(context.commit_transitions(), 1);
        assert_eq!(context.get_agent_state(AgentId(1)), EpiState::Infected);
        assert!(Rc::ptr_eq(
            context.get_agent_pathogen(AgentId(1)).unwrap(),
            context.get_agent_pathogen(AgentId(0)).unwrap()
        ));
    }

    #[test]
    fn infection_can_go_straight_to_hospital() {
        let mut context = setup(2, ParametersValues::default());
        context.add_edge_bidi(AgentId(0), AgentId(1)).unwrap();
        infect(&mut context, AgentId(0), Location::Home);

        // location Home, trial succeeds, hospitalization succeeds
        context.script_uniform_draws(ModelRng, [0.9, 0.2, 0.05]);
        update_susceptible(&mut context, AgentId(1));
        context.commit_transitions();
        assert_eq!(
            context.get_agent_state(AgentId(1)),
            EpiState::InfectedHospitalized
        );
        assert_eq!(context.get_location(AgentId(1)), Location::Hospital);
        assert!(context.get_agent_pathogen(AgentId(1)).is_some());
    }

    #[test]
    fn different_location_means_no_trial() {
        let mut context = setup(2, ParametersValues::default());
        context.add_edge_bidi(AgentId(0), AgentId(1)).unwrap();
        infect(&mut context, AgentId(0), Location::Community);

        // location Hospital; the second draw must not be consumed
        context.script_uniform_draws(ModelRng, [0.5, 0.0]);
        update_susceptible(&mut context, AgentId(1));
        assert!(context.get_infection_log().is_empty());
        assert_eq!(context.pending_transition_count(), 0);
        assert_eq!(context.sample_uniform(ModelRng), 0.0);
    }

    #[test]
    fn failed_trials_continue_in_neighbor_order() {
        let mut context = setup(4, ParametersValues::default());
        context.add_edge_bidi(AgentId(3), AgentId(2)).unwrap();
        context.add_edge_bidi(AgentId(3), AgentId(0)).unwrap();
        context.add_edge_bidi(AgentId(3), AgentId(1)).unwrap();
        infect(&mut context, AgentId(2), Location::Home);
        infect(&mut context, AgentId(0), Location::Home);
        infect(&mut context, AgentId(1), Location::Home);

        // location Home, agent 2 fails, agent 0 succeeds, no hospitalization
        context.script_uniform_draws(ModelRng, [0.8, 0.3, 0.29, 0.5]);
        update_susceptible(&mut context, AgentId(3));
        assert_eq!(context.get_infection_log()[0].infector, AgentId(0));
    }

    #[test]
    fn only_infected_neighbors_are_eligible() {
        let mut context = setup(3, ParametersValues::default());
        context.add_edge_bidi(AgentId(2), AgentId(0)).unwrap();
        context.add_edge_bidi(AgentId(2), AgentId(1)).unwrap();
        context.infect_agent(
            AgentId(0),
            Rc::new(Pathogen::default()),
            EpiState::InfectedHospitalized,
        );
        context.set_location(AgentId(0), Location::Hospital);
        context.set_location(AgentId(1), Location::Hospital);

        context.script_uniform_draws(ModelRng, [0.5]);
        update_susceptible(&mut context, AgentId(2));
        assert_eq!(context.get_location(AgentId(2)), Location::Hospital);
        assert!(context.get_infection_log().is_empty());
    }

    #[test]
    fn non_susceptible_agent_is_skipped() {
        let mut context = setup(1, ParametersValues::default());
        infect(&mut context, AgentId(0), Location::Home);
        context.script_uniform_draws(ModelRng, [0.1]);
        update_susceptible(&mut context, AgentId(0));
        assert_eq!(context.get_location(AgentId(0)), Location::Home);
        assert_eq!(context.sample_uniform(ModelRng), 0.1);
    }

    #[test]
    fn uniform_selection_uses_one_draw() {
        let parameters = ParametersValues {
            infector_selection: InfectorSelection::UniformAmongEligible,
            ..ParametersValues::default()
        };
        let mut context = setup(4, parameters);
        for neighbor in 0..3 {
            context
                .add_edge_bidi(AgentId(3), AgentId(neighbor))
                .unwrap();
            infect(&mut context, AgentId(neighbor), Location::Community);
        }

        // location Community, pick index floor(0.7 * 3) = 2, no hospitalization
        context.script_uniform_draws(ModelRng, [0.0, 0.7, 0.5]);
        update_susceptible(&mut context, AgentId(3));
        assert_eq!(context.get_infection_log()[0].infector, AgentId(2));
        context.commit_transitions();
        assert_eq!(context.get_agent_state(AgentId(3)), EpiState::Infected);
    }

    #[test]
    fn infected_roulette_outcomes() {
        let mut context = setup(3, ParametersValues::default());
        for id in 0..3 {
            infect(&mut context, AgentId(id), Location::Home);
        }

        // agent 0: Community, hospitalized; agent 1: Home, nothing;
        // agent 2: Community, nothing
        context.script_uniform_draws(ModelRng, [0.2, 0.05, 0.5, 0.1, 0.49, 0.99]);
        for id in 0..3 {
            update_infected(&mut context, AgentId(id));
        }
        assert_eq!(context.get_location(AgentId(0)), Location::Community);
        assert_eq!(context.get_location(AgentId(1)), Location::Home);
        assert_eq!(context.get_location(AgentId(2)), Location::Community);
        assert_eq!(context.commit_transitions(), 1);
        assert_eq!(
            context.get_agent_state(AgentId(0)),
            EpiState::InfectedHospitalized
        );
        assert_eq!(context.get_location(AgentId(0)), Location::Hospital);
        assert_eq!(context.get_agent_state(AgentId(1)), EpiState::Infected);
    }

    #[test]
    fn infected_recovery_detaches_pathogen() {
        let parameters = ParametersValues {
            prob_hospitalization: 0.0,
            prob_recovery: 1.0,
            ..ParametersValues::default()
        };
        let mut context = setup(1, parameters);
        infect(&mut context, AgentId(0), Location::Home);
        update_infected(&mut context, AgentId(0));
        context.commit_transitions();
        assert_eq!(context.get_agent_state(AgentId(0)), EpiState::Susceptible);
        assert!(context.get_agent_pathogen(AgentId(0)).is_none());
    }

    #[test]
    fn zero_probabilities_never_change_infected_state() {
        let parameters = ParametersValues {
            prob_hospitalization: 0.0,
            prob_recovery: 0.0,
            ..ParametersValues::default()
        };
        let mut context = setup(50, parameters);
        for id in 0..50 {
            infect(&mut context, AgentId(id), Location::Home);
        }
        for _ in 0..20 {
            for id in 0..50 {
                update_infected(&mut context, AgentId(id));
            }
            assert_eq!(context.commit_transitions(), 0);
        }
        assert_eq!(context.count_agents_in_state(EpiState::Infected), 50);
    }

    #[test]
    fn hospitalized_recovery_is_checked_before_discharge() {
        let parameters = ParametersValues {
            prob_recovery: 0.5,
            discharge_infected: 0.5,
            ..ParametersValues::default()
        };
        let mut context = setup(3, parameters);
        for id in 0..3 {
            context.infect_agent(
                AgentId(id),
                Rc::new(Pathogen::default()),
                EpiState::InfectedHospitalized,
            );
            context.set_location(AgentId(id), Location::Home);
        }

        // agent 0 recovers with one draw; agent 1 is discharged; agent 2 stays
        context.script_uniform_draws(ModelRng, [0.1, 0.9, 0.2, 0.9, 0.9]);
        for id in 0..3 {
            update_hospitalized(&mut context, AgentId(id));
            assert_eq!(context.get_location(AgentId(id)), Location::Hospital);
        }
        context.commit_transitions();
        assert_eq!(context.get_agent_state(AgentId(0)), EpiState::Susceptible);
        assert!(context.get_agent_pathogen(AgentId(0)).is_none());
        assert_eq!(context.get_agent_state(AgentId(1)), EpiState::Infected);
        assert!(context.get_agent_pathogen(AgentId(1)).is_some());
        assert_eq!(
            context.get_agent_state(AgentId(2)),
            EpiState::InfectedHospitalized
        );
    }

    #[test]
    fn certain_recovery_always_recovers() {
        let parameters = ParametersValues {
            prob_recovery: 1.0,
            prob_hospitalization: 0.0,
            ..ParametersValues::default()
        };
        let mut context = setup(100, parameters);
        for id in 0..100 {
            context.infect_agent(
                AgentId(id),
                Rc::new(Pathogen::default()),
                EpiState::InfectedHospitalized,
            );
            update_hospitalized(&mut context, AgentId(id));
        }
        context.commit_transitions();
        assert_eq!(context.count_agents_in_state(EpiState::Susceptible), 100);
    }

    #[test]
    fn initial_locations_cover_everyone() {
        let mut context = setup(30, ParametersValues::default());
        assign_initial_locations(&mut context);
        assert!(context.all_agents_located(30));
    }
}
