//! An agent-based model of disease transmission driven by co-location.
//!
//! Agents live on a fixed small-world contact graph and move every step
//! between three locations: Community, Hospital and Home. A susceptible agent
//! can only be infected by a neighbor that is infected and at the same
//! location. Infected agents may be hospitalized or recover; hospitalized
//! agents may recover or be discharged back to the infected state.
//!
//! The model is built from modules that keep their state in the `Context`:
//! * `agents`: the population, epidemic states and pathogen attachments.
//! * `network`: the contact graph and its small-world generator.
//! * `location`: the per-agent location store.
//! * `transitions`: the per-state handlers run once per agent per step.
//! * `infection_log`: every successful transmission.
//! * `simulation`: wires the above together and runs the steps.
//!
//! A run is usually started from `simulation::run` or, from the command line,
//! through `runner::run_with_args`.
pub mod context;
pub mod error;
pub mod global_properties;
pub mod hashing;
pub mod log;
pub mod plan;
pub mod random;
pub mod report;
pub mod runner;

pub mod agents;
pub mod incidence_report;
pub mod infection_log;
pub mod location;
pub mod network;
pub mod parameters;
pub mod pathogen;
pub mod simulation;
pub mod state_counts_report;
pub mod summary;
pub mod transitions;

pub mod prelude;

// Re-exported for use in macros
pub use paste;
pub use rand;

pub use agents::{AgentId, ContextAgentsExt, EpiState};
pub use context::{Context, ExecutionPhase};
pub use error::ModelError;
pub use location::{ContextLocationExt, Location};
pub use network::ContextNetworkExt;
pub use parameters::{InfectorSelection, ModelConfig, Parameters, ParametersValues};
pub use simulation::ContextSimulationExt;
