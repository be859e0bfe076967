pub use crate::agents::{AgentId, ContextAgentsExt, EpiState};
pub use crate::context::{Context, Event, ExecutionPhase};
pub use crate::error::ModelError;
pub use crate::global_properties::ContextGlobalPropertiesExt;
pub use crate::infection_log::{ContextInfectionLogExt, InfectionEvent};
pub use crate::location::{ContextLocationExt, Location};
pub use crate::network::ContextNetworkExt;
pub use crate::parameters::{InfectorSelection, ModelConfig, Parameters, ParametersValues};
pub use crate::pathogen::Pathogen;
pub use crate::random::ContextRandomExt;
pub use crate::report::ContextReportExt;
pub use crate::simulation::{ContextSimulationExt, StateLocationCounts, StepCompletedEvent};
pub use crate::transitions::{ContextTransitionsExt, ModelRng};
pub use crate::{define_data_plugin, define_global_property, define_report, define_rng};
