use std::rc::Rc;

use assert_approx_eq::assert_approx_eq;
use ixa_colocation::prelude::*;
use ixa_colocation::simulation::{self, ContextSimulationExt};
use ixa_colocation::transitions::assign_initial_locations;

fn context_with_parameters(agents: usize, parameters: ParametersValues) -> Context {
    let mut context = Context::new();
    context.init_random(1231);
    context
        .set_global_property_value(Parameters, parameters)
        .unwrap();
    context.add_agents(agents);
    context
}

fn schedule_steps(context: &mut Context, steps: usize) {
    for step in 1..=steps {
        #[allow(clippy::cast_precision_loss)]
        let time = step as f64;
        context.add_plan(time, move |context| context.run_step(step));
    }
}

#[test]
fn two_agent_transmission() {
    let mut context = context_with_parameters(2, ParametersValues::default());
    context.add_edge_bidi(AgentId(0), AgentId(1)).unwrap();
    context.infect_agent(AgentId(0), Rc::new(Pathogen::default()), EpiState::Infected);
    context.set_location(AgentId(0), Location::Community);
    context.set_location(AgentId(1), Location::Home);

    context.script_uniform_draws(
        ModelRng,
        [
            0.1,  // agent 0 stays in the community
            0.99, // agent 0 neither hospitalized nor recovered
            0.0,  // agent 1 goes to the community
            0.0,  // transmission from agent 0 succeeds
            0.99, // agent 1 is not hospitalized
        ],
    );
    schedule_steps(&mut context, 1);
    context.execute();

    assert_eq!(
        context.get_infection_log(),
        &[InfectionEvent {
            step: 1,
            susceptible: AgentId(1),
            infector: AgentId(0),
            location: Location::Community,
        }]
    );
    assert_eq!(context.get_agent_state(AgentId(1)), EpiState::Infected);
    assert_eq!(context.get_agent_pathogen(AgentId(1)).unwrap().name, "MRSA");
    assert_eq!(context.get_agent_state(AgentId(0)), EpiState::Infected);
}

// Agent 1 sits between two infected agents. Agent 0 is handled first and
// moves into the community; agent 2 is handled last and was in the community
// at the end of the previous step.
fn context_with_infected_on_both_sides(parameters: ParametersValues) -> Context {
    let mut context = context_with_parameters(3, parameters);
    context.add_edge_bidi(AgentId(1), AgentId(0)).unwrap();
    context.add_edge_bidi(AgentId(1), AgentId(2)).unwrap();
    let pathogen = Rc::new(Pathogen::default());
    context.infect_agent(AgentId(0), Rc::clone(&pathogen), EpiState::Infected);
    context.infect_agent(AgentId(2), pathogen, EpiState::Infected);
    context.set_location(AgentId(0), Location::Home);
    context.set_location(AgentId(1), Location::Home);
    context.set_location(AgentId(2), Location::Community);
    context
}

#[test]
fn handlers_see_new_locations_of_earlier_agents_and_old_locations_of_later_ones() {
    let mut context = context_with_infected_on_both_sides(ParametersValues::default());
    context.script_uniform_draws(
        ModelRng,
        [
            0.1,  // agent 0 moves from home to the community
            0.99, // agent 0 neither hospitalized nor recovered
            0.0,  // agent 1 goes to the community
            0.9,  // transmission from agent 0 fails
            0.0,  // transmission from agent 2 succeeds
            0.99, // agent 1 is not hospitalized
            0.9,  // agent 2 goes home
            0.99, // agent 2 neither hospitalized nor recovered
        ],
    );
    schedule_steps(&mut context, 1);
    context.execute();

    assert_eq!(
        context.get_infection_log(),
        &[InfectionEvent {
            step: 1,
            susceptible: AgentId(1),
            infector: AgentId(2),
            location: Location::Community,
        }]
    );
    assert_eq!(context.get_location(AgentId(0)), Location::Community);
    assert_eq!(context.get_location(AgentId(1)), Location::Community);
    assert_eq!(context.get_location(AgentId(2)), Location::Home);
    assert_eq!(context.get_agent_state(AgentId(1)), EpiState::Infected);
}

#[test]
fn uniform_selection_counts_both_sides_as_eligible() {
    let parameters = ParametersValues {
        infector_selection: InfectorSelection::UniformAmongEligible,
        ..ParametersValues::default()
    };
    for (selection_draw, infector) in [(0.4, AgentId(0)), (0.6, AgentId(2))] {
        let mut context = context_with_infected_on_both_sides(parameters);
        context.script_uniform_draws(
            ModelRng,
            [0.1, 0.99, 0.0, selection_draw, 0.99, 0.9, 0.99],
        );
        schedule_steps(&mut context, 1);
        context.execute();

        let log = context.get_infection_log();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].infector, infector);
        assert_eq!(log[0].location, Location::Community);
    }
}

#[test]
fn infected_agent_without_neighbors_infects_nobody() {
    let mut context = context_with_parameters(5, ParametersValues::default());
    context.infect_agent(AgentId(2), Rc::new(Pathogen::default()), EpiState::Infected);
    assign_initial_locations(&mut context);
    schedule_steps(&mut context, 50);
    context.execute();
    assert!(context.get_infection_log().is_empty());
    assert_eq!(context.count_agents_in_state(EpiState::Susceptible), 4);
}

#[test]
fn no_seeded_infection_means_no_events() {
    let config = ModelConfig {
        population: 300,
        initial_prevalence: 0.0,
        steps: 30,
        ..ModelConfig::default()
    };
    let context = simulation::run(&config).unwrap();
    assert!(context.get_infection_log().is_empty());
    assert_eq!(context.count_agents_in_state(EpiState::Susceptible), 300);
}

#[test]
fn hospitalized_neighbors_do_not_transmit() {
    let parameters = ParametersValues {
        prob_recovery: 0.0,
        discharge_infected: 0.0,
        ..ParametersValues::default()
    };
    let mut context = context_with_parameters(10, parameters);
    for id in 1..10 {
        context.add_edge_bidi(AgentId(0), AgentId(id)).unwrap();
        context.infect_agent(
            AgentId(id),
            Rc::new(Pathogen::default()),
            EpiState::InfectedHospitalized,
        );
    }
    assign_initial_locations(&mut context);
    schedule_steps(&mut context, 30);
    context.execute();
    assert!(context.get_infection_log().is_empty());
    assert_eq!(context.get_agent_state(AgentId(0)), EpiState::Susceptible);
}

#[test]
fn same_seed_same_run() {
    let config = ModelConfig {
        population: 500,
        initial_prevalence: 0.02,
        steps: 40,
        ..ModelConfig::default()
    };
    let first = simulation::run(&config).unwrap();
    let second = simulation::run(&config).unwrap();
    assert!(!first.get_infection_log().is_empty());
    assert_eq!(first.get_infection_log(), second.get_infection_log());
    assert_eq!(
        first.get_state_count_history(),
        second.get_state_count_history()
    );
    for id in 0..500 {
        assert_eq!(
            first.get_location(AgentId(id)),
            second.get_location(AgentId(id))
        );
    }

    let reseeded = simulation::run(&ModelConfig {
        seed: 99,
        ..config
    })
    .unwrap();
    assert_ne!(first.get_infection_log(), reseeded.get_infection_log());
}

#[test]
fn invariants_hold_after_every_step() {
    let config = ModelConfig {
        parameters: ParametersValues {
            prob_hospitalization: 0.3,
            prob_recovery: 0.2,
            discharge_infected: 0.3,
            ..ParametersValues::default()
        },
        population: 300,
        initial_prevalence: 0.1,
        steps: 30,
        ..ModelConfig::default()
    };
    let mut context = Context::new();
    context.subscribe_to_event(|context: &mut Context, _event: StepCompletedEvent| {
        for id in 0..context.get_population() {
            let agent = AgentId(id);
            let state = context.get_agent_state(agent);
            assert_eq!(context.get_agent_pathogen(agent).is_some(), state.is_infected());
            if state == EpiState::InfectedHospitalized {
                assert_eq!(context.get_location(agent), Location::Hospital);
            }
        }
    });
    simulation::init(&mut context, &config).unwrap();
    context.execute();
    assert_eq!(context.get_state_count_history().len(), 31);
}

#[test]
fn uniform_infector_selection_runs_deterministically() {
    let config = ModelConfig {
        parameters: ParametersValues {
            infector_selection: InfectorSelection::UniformAmongEligible,
            ..ParametersValues::default()
        },
        population: 300,
        initial_prevalence: 0.05,
        steps: 20,
        ..ModelConfig::default()
    };
    let first = simulation::run(&config).unwrap();
    let second = simulation::run(&config).unwrap();
    assert!(!first.get_infection_log().is_empty());
    assert_eq!(first.get_infection_log(), second.get_infection_log());
}

#[test]
fn certain_recovery_empties_the_hospital() {
    let parameters = ParametersValues {
        prob_hospitalization: 0.0,
        prob_recovery: 1.0,
        discharge_infected: 0.0,
        ..ParametersValues::default()
    };
    let mut context = context_with_parameters(20, parameters);
    for id in 0..20 {
        context.infect_agent(
            AgentId(id),
            Rc::new(Pathogen::default()),
            EpiState::InfectedHospitalized,
        );
    }
    assign_initial_locations(&mut context);
    schedule_steps(&mut context, 1);
    context.execute();
    assert_eq!(context.count_agents_in_state(EpiState::Susceptible), 20);
    for id in 0..20 {
        assert!(context.get_agent_pathogen(AgentId(id)).is_none());
    }
}

#[test]
fn zero_probabilities_keep_agents_infected() {
    let config = ModelConfig {
        parameters: ParametersValues {
            prob_hospitalization: 0.0,
            prob_recovery: 0.0,
            discharge_infected: 0.0,
            ..ParametersValues::default()
        },
        population: 100,
        initial_prevalence: 0.1,
        steps: 25,
        ..ModelConfig::default()
    };
    let context = simulation::run(&config).unwrap();
    let history = context.get_state_count_history();
    for window in history.windows(2) {
        assert!(
            window[1].state_total(EpiState::Infected)
                >= window[0].state_total(EpiState::Infected)
        );
        assert_eq!(window[1].state_total(EpiState::InfectedHospitalized), 0);
    }
    assert_eq!(
        context.count_agents_in_state(EpiState::Infected),
        10 + context.get_infection_log().len()
    );
}

#[test]
fn initial_locations_are_uniform() {
    let mut context = context_with_parameters(30_000, ParametersValues::default());
    assign_initial_locations(&mut context);
    let counts = context.count_states_by_location();
    for location in Location::ALL {
        #[allow(clippy::cast_precision_loss)]
        let share = counts.get(EpiState::Susceptible, location) as f64 / 30_000.0;
        assert_approx_eq!(share, 1.0 / 3.0, 0.02);
    }
}
