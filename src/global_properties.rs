//! Typed, validated, set-once global properties.
//!
//! A global property is a value that every module can read and that does not
//! change while the model runs, such as the transition probabilities. Each
//! property is declared with `define_global_property!`, which names a type for
//! it and optionally a validation function that runs when the value is set:
//!
//! ```
//! use ixa_colocation::define_global_property;
//! use ixa_colocation::error::ModelError;
//!
//! define_global_property!(MaxSteps, usize, |steps: &usize| {
//!     if *steps == 0 {
//!         return Err(ModelError::IllegalParameterValue("steps must be positive".into()));
//!     }
//!     Ok(())
//! });
//! ```
use std::any::{Any, TypeId};
use std::fs;
use std::path::Path;

use log::trace;
use serde::de::DeserializeOwned;

use crate::context::Context;
use crate::define_data_plugin;
use crate::error::ModelError;
use crate::hashing::HashMap;

/// Defines a global property with the following parameters:
/// * `$global_property`: Name for the identifier type of the global property
/// * `$value`: The type of the property's value
/// * `$validate`: A function (or closure) that checks the validity of the property (optional)
#[macro_export]
macro_rules! define_global_property {
    ($global_property:ident, $value:ty, $validate: expr) => {
        #[derive(Copy, Clone)]
        pub struct $global_property;

        impl $crate::global_properties::GlobalProperty for $global_property {
            type Value = $value;

            fn name() -> &'static str {
                stringify!($global_property)
            }

            fn validate(value: &$value) -> Result<(), $crate::error::ModelError> {
                $validate(value)
            }
        }
    };

    ($global_property: ident, $value: ty) => {
        $crate::define_global_property!($global_property, $value, |_| { Ok(()) });
    };
}
pub use define_global_property;

pub trait GlobalProperty: Any {
    type Value: Any;

    fn name() -> &'static str;

    /// # Errors
    ///
    /// Returns an error describing why `value` is not acceptable.
    fn validate(value: &Self::Value) -> Result<(), ModelError>;
}

#[derive(Default)]
struct GlobalPropertiesDataContainer {
    global_property_container: HashMap<TypeId, Box<dyn Any>>,
}

define_data_plugin!(
    GlobalPropertiesPlugin,
    GlobalPropertiesDataContainer,
    GlobalPropertiesDataContainer::default()
);

pub trait ContextGlobalPropertiesExt {
    /// Validates and stores the value of a global property.
    ///
    /// # Errors
    ///
    /// Returns the validation error, or `ModelError::ParameterAlreadySet` if
    /// the property already has a value.
    fn set_global_property_value<T: GlobalProperty>(
        &mut self,
        property: T,
        value: T::Value,
    ) -> Result<(), ModelError>;

    /// Returns the value of a global property, or `None` if it has not been set.
    fn get_global_property_value<T: GlobalProperty>(&self, property: T) -> Option<&T::Value>;

    /// Deserializes a JSON file into `T`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or does not match `T`.
    fn load_parameters_from_json<T: DeserializeOwned>(&self, path: &Path)
        -> Result<T, ModelError>;
}

impl ContextGlobalPropertiesExt for Context {
    fn set_global_property_value<T: GlobalProperty>(
        &mut self,
        _property: T,
        value: T::Value,
    ) -> Result<(), ModelError> {
        T::validate(&value)?;
        let data_container = self.get_data_mut(GlobalPropertiesPlugin);
        if data_container
            .global_property_container
            .contains_key(&TypeId::of::<T>())
        {
            return Err(ModelError::ParameterAlreadySet(T::name().to_string()));
        }
        trace!("setting global property {}", T::name());
        data_container
            .global_property_container
            .insert(TypeId::of::<T>(), Box::new(value));
        Ok(())
    }

    fn get_global_property_value<T: GlobalProperty>(&self, _property: T) -> Option<&T::Value> {
        self.get_data(GlobalPropertiesPlugin)?
            .global_property_container
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T::Value>())
    }

    fn load_parameters_from_json<T: DeserializeOwned>(
        &self,
        path: &Path,
    ) -> Result<T, ModelError> {
        trace!("loading parameters from {}", path.display());
        let contents = fs::read_to_string(path)?;
        let parameters = serde_json::from_str(&contents)?;
        Ok(parameters)
    }
}
