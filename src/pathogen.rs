//! The pathogen carried by infected agents and its initial seeding.
use std::fmt::{self, Display};
use std::rc::Rc;

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::agents::{AgentId, ContextAgentsExt, EpiState};
use crate::context::Context;
use crate::define_rng;
use crate::error::ModelError;
use crate::rand::seq::index::sample as sample_indices;
use crate::random::ContextRandomExt;

define_rng!(SeedingRng);

/// A transmissible pathogen.
///
/// `prob_infecting` and `prob_recovery` describe the pathogen and appear in the
/// run summary. The transition handlers do not consult them: transmission uses
/// the fixed per-contact probability in `transitions`, and recovery uses the
/// model parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Pathogen {
    pub name: String,
    #[serde(default)]
    pub prob_infecting: f64,
    #[serde(default)]
    pub prob_recovery: f64,
}

impl Pathogen {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Pathogen {
            name: name.to_string(),
            prob_infecting: 0.0,
            prob_recovery: 0.0,
        }
    }

    #[must_use]
    pub fn with_prob_infecting(mut self, prob_infecting: f64) -> Self {
        self.prob_infecting = prob_infecting;
        self
    }

    #[must_use]
    pub fn with_prob_recovery(mut self, prob_recovery: f64) -> Self {
        self.prob_recovery = prob_recovery;
        self
    }

    /// # Errors
    ///
    /// Returns `ModelError::IllegalParameterValue` if a probability is not a
    /// finite value in `[0, 1]`.
    pub fn validate(&self) -> Result<(), ModelError> {
        for (name, value) in [
            ("prob_infecting", self.prob_infecting),
            ("prob_recovery", self.prob_recovery),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(ModelError::IllegalParameterValue(format!(
                    "pathogen {} has {name} = {value}, expected a value in [0, 1]",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

impl Default for Pathogen {
    fn default() -> Self {
        Pathogen::new("MRSA").with_prob_infecting(0.1)
    }
}

impl Display for Pathogen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (prob. infecting {}, prob. recovery {})",
            self.name, self.prob_infecting, self.prob_recovery
        )
    }
}

/// Infects `floor(prevalence * population)` distinct agents, chosen uniformly
/// at random, with `pathogen`. Seeded agents start in `EpiState::Infected`.
/// Returns the seeded agents in ascending id order.
///
/// # Errors
///
/// Returns `ModelError::IllegalParameterValue` if `prevalence` is not in
/// `[0, 1]` or the pathogen is invalid.
pub fn seed_randomly(
    context: &mut Context,
    pathogen: &Rc<Pathogen>,
    prevalence: f64,
) -> Result<Vec<AgentId>, ModelError> {
    pathogen.validate()?;
    if !prevalence.is_finite() || !(0.0..=1.0).contains(&prevalence) {
        return Err(ModelError::IllegalParameterValue(format!(
            "prevalence is {prevalence}, expected a value in [0, 1]"
        )));
    }

    let population = context.get_population();
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let to_seed = (prevalence * population as f64).floor() as usize;

    let mut seeded: Vec<AgentId> = context
        .sample(SeedingRng, |rng| sample_indices(rng, population, to_seed))
        .into_iter()
        .map(AgentId)
        .collect();
    seeded.sort_unstable();

    for agent in &seeded {
        trace!("seeding {} into agent {agent}", pathogen.name);
        context.infect_agent(*agent, Rc::clone(pathogen), EpiState::Infected);
    }
    debug!(
        "seeded {} of {population} agents with {}",
        seeded.len(),
        pathogen.name
    );
    Ok(seeded)
}
