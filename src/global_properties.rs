//! Global properties are typed, run-wide values such as the simulation parameters and the
//! transition model.
//!
//! A global property is declared with [`define_global_property!`](crate::define_global_property),
//! which names a unit type used as the key and the type of its value. Values can be set directly
//! from code with `set_global_property_value()` or loaded from a JSON config file with
//! `load_global_properties()`. A config file is a JSON object whose keys are the property names
//! qualified by crate, e.g.:
//!
//! ```json
//! {
//!     "epistate.Parameters": { "countries_file": "countries.csv", ... }
//! }
//! ```
//!
//! Loading by name only works for properties that have been registered with
//! `register_global_property()` first.
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use log::{debug, trace};
use serde::de::DeserializeOwned;

use crate::context::Context;
use crate::define_data_plugin;
use crate::error::EpiError;

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

            fn new() -> Self {
                $global_property
            }

            fn name() -> String {
                let module = module_path!();
                let mut name = module.split("::").next().unwrap().to_string();
                name += ".";
                name += stringify!($global_property);
                name
            }

            fn validate(val: &$value) -> Result<(), $crate::error::EpiError> {
                $validate(val)
            }
        }
    };

    ($global_property: ident, $value: ty) => {
        $crate::define_global_property!($global_property, $value, |_| { Ok(()) });
    };
}
pub use define_global_property;

pub trait GlobalProperty: Any + Copy {
    type Value: Any + DeserializeOwned;

    fn new() -> Self;

    /// The key under which this property appears in a config file.
    fn name() -> String;

    /// # Errors
    /// Returns an `EpiError` describing why `value` is unacceptable.
    fn validate(value: &Self::Value) -> Result<(), EpiError>;
}

type PropertyLoader = fn(&mut Context, serde_json::Value) -> Result<(), EpiError>;

struct GlobalPropertiesDataContainer {
    global_property_container: HashMap<TypeId, Box<dyn Any>>,
    loaders: HashMap<String, PropertyLoader>,
}

define_data_plugin!(
    GlobalPropertiesPlugin,
    GlobalPropertiesDataContainer,
    GlobalPropertiesDataContainer {
        global_property_container: HashMap::new(),
        loaders: HashMap::new(),
    }
);

fn load_property<T: GlobalProperty>(
    context: &mut Context,
    value: serde_json::Value,
) -> Result<(), EpiError> {
    let value: T::Value = serde_json::from_value(value)?;
    context.set_global_property_value(T::new(), value)
}

pub trait ContextGlobalPropertiesExt {
    /// Validates `value` and stores it as the value of `property`, replacing any earlier value.
    ///
    /// # Errors
    /// Returns the validation error if `value` is rejected.
    fn set_global_property_value<T: GlobalProperty>(
        &mut self,
        property: T,
        value: T::Value,
    ) -> Result<(), EpiError>;

    /// Returns the value of `property`, or `None` if it has not been set.
    fn get_global_property_value<T: GlobalProperty>(&self, property: T) -> Option<&T::Value>;

    /// Makes `property` loadable by name from a config file.
    fn register_global_property<T: GlobalProperty>(&mut self, property: T);

    /// Reads a JSON file and deserializes it into `T`.
    ///
    /// # Errors
    /// Returns an `EpiError` if the file can't be read or doesn't deserialize into `T`.
    fn load_parameters_from_json<T: DeserializeOwned>(
        &mut self,
        file_path: &Path,
    ) -> Result<T, EpiError>;

    /// Loads every property in the JSON object at `file_path`.
    ///
    /// # Errors
    /// Returns an `EpiError` if the file can't be read, names a property that hasn't been
    /// registered, or holds a value that fails to deserialize or validate.
    fn load_global_properties(&mut self, file_path: &Path) -> Result<(), EpiError>;
}

impl ContextGlobalPropertiesExt for Context {
    fn set_global_property_value<T: GlobalProperty>(
        &mut self,
        _property: T,
        value: T::Value,
    ) -> Result<(), EpiError> {
        T::validate(&value)?;
        let data_container = self.get_data_container_mut(GlobalPropertiesPlugin);
        if data_container
            .global_property_container
            .insert(TypeId::of::<T>(), Box::new(value))
            .is_some()
        {
            debug!("replaced global property {}", T::name());
        }
        Ok(())
    }

    fn get_global_property_value<T: GlobalProperty>(&self, _property: T) -> Option<&T::Value> {
        self.get_data_container(GlobalPropertiesPlugin)?
            .global_property_container
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T::Value>())
    }

    fn register_global_property<T: GlobalProperty>(&mut self, _property: T) {
        trace!("registering global property {}", T::name());
        self.get_data_container_mut(GlobalPropertiesPlugin)
            .loaders
            .insert(T::name(), load_property::<T>);
    }

    fn load_parameters_from_json<T: DeserializeOwned>(
        &mut self,
        file_path: &Path,
    ) -> Result<T, EpiError> {
        trace!("loading parameters from {}", file_path.display());
        let config_file = fs::read_to_string(file_path)?;
        let parameters: T = serde_json::from_str(&config_file)?;
        Ok(parameters)
    }

    fn load_global_properties(&mut self, file_path: &Path) -> Result<(), EpiError> {
        let properties: serde_json::Map<String, serde_json::Value> =
            self.load_parameters_from_json(file_path)?;
        for (name, value) in properties {
            let loader = self
                .get_data_container(GlobalPropertiesPlugin)
                .and_then(|container| container.loaders.get(&name).copied())
                .ok_or_else(|| EpiError::ConfigError(format!("unknown global property {name}")))?;
            loader(self, value)?;
        }
        Ok(())
    }
}
