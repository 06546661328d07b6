//! The `Context` that drives a simulation run.
//!
//! A `Context` holds two things: module-specific data, registered with
//! [`define_data_plugin!`](crate::define_data_plugin) and created lazily on first use, and a queue
//! of plans to be executed at a given simulation time. Simulation time is measured in days since
//! the first simulated date.
use std::any::{Any, TypeId};
use std::collections::HashMap;

use log::trace;

use crate::plan::{Id as PlanId, Queue as PlanQueue};

/// A trait for objects that can provide data containers to be held by `Context`
pub trait DataPlugin: Any {
    type DataContainer;

    fn create_data_container() -> Self::DataContainer;
}

/// Defines a new type for storing data in Context.
#[macro_export]
macro_rules! define_data_plugin {
    ($plugin:ident, $data_container:ty, $default: expr) => {
        struct $plugin;

        impl $crate::context::DataPlugin for $plugin {
            type DataContainer = $data_container;

            fn create_data_container() -> Self::DataContainer {
                $default
            }
        }
    };
}
pub use define_data_plugin;

type Callback = dyn FnOnce(&mut Context);

pub struct Context {
    plan_queue: PlanQueue<Box<Callback>>,
    data_plugins: HashMap<TypeId, Box<dyn Any>>,
    current_time: f64,
}

impl Context {
    #[must_use]
    pub fn new() -> Context {
        Context {
            plan_queue: PlanQueue::new(),
            data_plugins: HashMap::new(),
            current_time: 0.0,
        }
    }

    /// Schedules `callback` to run at simulation time `time`.
    ///
    /// # Panics
    ///
    /// Panics if `time` is NaN, infinite, or earlier than the current time.
    pub fn add_plan(&mut self, time: f64, callback: impl FnOnce(&mut Context) + 'static) -> PlanId {
        assert!(
            !time.is_nan() && !time.is_infinite() && time >= self.current_time,
            "Invalid time value"
        );
        trace!("adding plan at {time}");
        self.plan_queue.add_plan(time, Box::new(callback))
    }

    fn add_plugin<T: DataPlugin>(&mut self) {
        self.data_plugins
            .insert(TypeId::of::<T>(), Box::new(T::create_data_container()));
    }

    /// Returns the data container for `plugin`, creating it if this is the first access.
    pub fn get_data_container_mut<T: DataPlugin>(&mut self, _plugin: T) -> &mut T::DataContainer {
        let type_id = TypeId::of::<T>();
        if !self.data_plugins.contains_key(&type_id) {
            self.add_plugin::<T>();
        }
        self.data_plugins
            .get_mut(&type_id)
            .and_then(|container| container.downcast_mut::<T::DataContainer>())
            .expect("data plugin registered under the wrong type")
    }

    /// Returns the data container for `plugin` if it has been created.
    #[must_use]
    pub fn get_data_container<T: DataPlugin>(&self, _plugin: T) -> Option<&T::DataContainer> {
        self.data_plugins
            .get(&TypeId::of::<T>())
            .and_then(|container| container.downcast_ref::<T::DataContainer>())
    }

    #[must_use]
    pub fn get_current_time(&self) -> f64 {
        self.current_time
    }

    /// Runs plans in time order until the queue is empty.
    pub fn execute(&mut self) {
        trace!("entering event loop");
        while let Some(plan) = self.plan_queue.get_next_plan() {
            self.current_time = plan.time;
            (plan.data)(self);
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
