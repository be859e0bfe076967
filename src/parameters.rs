//! Model parameters and run configuration.
//!
//! The transition probabilities live in the `Parameters` global property,
//! set once before the run. `ModelConfig` bundles them with everything else a
//! run needs and can be read from a JSON file; the parameter keys may be
//! written either in snake case or with their display names
//! (`"Prob hospitalization"`, `"Prob recovery"`, `"Discharge infected"`).
use std::fmt::{self, Display};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::define_global_property;
use crate::error::ModelError;
use crate::global_properties::ContextGlobalPropertiesExt;
use crate::pathogen::Pathogen;
use crate::random::validate_roulette_probabilities;

/// How the susceptible handler picks an infector among the neighbors that
/// are infected and share its location.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InfectorSelection {
    /// An independent transmission trial per eligible neighbor in neighbor
    /// order; the first success is the infector.
    #[default]
    FirstSuccess,
    /// One eligible neighbor chosen uniformly with a single draw; any eligible
    /// neighbor means infection.
    UniformAmongEligible,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParametersValues {
    #[serde(alias = "Prob hospitalization")]
    pub prob_hospitalization: f64,
    #[serde(alias = "Prob recovery")]
    pub prob_recovery: f64,
    #[serde(alias = "Discharge infected")]
    pub discharge_infected: f64,
    #[serde(default)]
    pub infector_selection: InfectorSelection,
}

impl Default for ParametersValues {
    fn default() -> Self {
        ParametersValues {
            prob_hospitalization: 0.1,
            prob_recovery: 0.0,
            discharge_infected: 0.1,
            infector_selection: InfectorSelection::FirstSuccess,
        }
    }
}

impl ParametersValues {
    /// The outcome probabilities of the infected handler's roulette, in
    /// outcome order: hospitalization, then recovery.
    #[must_use]
    pub fn infected_outcomes(&self) -> [f64; 2] {
        [self.prob_hospitalization, self.prob_recovery]
    }
}

impl Display for ParametersValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Prob hospitalization: {}", self.prob_hospitalization)?;
        writeln!(f, "Prob recovery:        {}", self.prob_recovery)?;
        write!(f, "Discharge infected:   {}", self.discharge_infected)
    }
}

fn validate_parameters(parameters: &ParametersValues) -> Result<(), ModelError> {
    for (name, value) in [
        ("Prob hospitalization", parameters.prob_hospitalization),
        ("Prob recovery", parameters.prob_recovery),
        ("Discharge infected", parameters.discharge_infected),
    ] {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err(ModelError::IllegalParameterValue(format!(
                "{name} is {value}, expected a value in [0, 1]"
            )));
        }
    }
    validate_roulette_probabilities(&parameters.infected_outcomes())
}

define_global_property!(Parameters, ParametersValues, validate_parameters);

/// Returns the model parameters.
///
/// # Panics
///
/// Panics if the parameters have not been set.
#[must_use]
pub fn get_parameters(context: &Context) -> ParametersValues {
    *context
        .get_global_property_value(Parameters)
        .expect("Parameters must be set before the model runs")
}

fn default_population() -> usize {
    1000
}

fn default_average_degree() -> usize {
    4
}

fn default_rewiring_probability() -> f64 {
    0.1
}

fn default_initial_prevalence() -> f64 {
    0.01
}

fn default_steps() -> usize {
    100
}

fn default_seed() -> u64 {
    1231
}

/// Everything needed to set up and run the model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    #[serde(default)]
    pub parameters: ParametersValues,
    #[serde(default = "default_population")]
    pub population: usize,
    #[serde(default = "default_average_degree")]
    pub average_degree: usize,
    #[serde(default = "default_rewiring_probability")]
    pub rewiring_probability: f64,
    #[serde(default = "default_initial_prevalence")]
    pub initial_prevalence: f64,
    #[serde(default)]
    pub pathogen: Pathogen,
    #[serde(default = "default_steps")]
    pub steps: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            parameters: ParametersValues::default(),
            population: default_population(),
            average_degree: default_average_degree(),
            rewiring_probability: default_rewiring_probability(),
            initial_prevalence: default_initial_prevalence(),
            pathogen: Pathogen::default(),
            steps: default_steps(),
            seed: default_seed(),
        }
    }
}

impl ModelConfig {
    /// Reads a configuration from a JSON file. Missing fields take their
    /// default values.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON, or
    /// contains unknown fields.
    pub fn from_json_file(context: &Context, path: &Path) -> Result<ModelConfig, ModelError> {
        context.load_parameters_from_json::<ModelConfig>(path)
    }

    /// Checks the values that do not depend on the contact graph.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::IllegalParameterValue` describing the first
    /// invalid value.
    pub fn validate(&self) -> Result<(), ModelError> {
        validate_parameters(&self.parameters)?;
        self.pathogen.validate()?;
        if self.population == 0 {
            return Err(ModelError::IllegalParameterValue(
                "population must be positive".to_string(),
            ));
        }
        for (name, value) in [
            ("rewiring_probability", self.rewiring_probability),
            ("initial_prevalence", self.initial_prevalence),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(ModelError::IllegalParameterValue(format!(
                    "{name} is {value}, expected a value in [0, 1]"
                )));
            }
        }
        Ok(())
    }
}
