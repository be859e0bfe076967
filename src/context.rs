//! The `Context` that owns a simulation run.
//!
//! A run is a sequence of plans (callbacks at a point in time) executed in time
//! order. Modules keep their state in data plugins held by the `Context`, so
//! that two runs in the same process never share anything: the population, the
//! contact graph, the location store and the infection log all live here.
use std::any::{Any, TypeId};
use std::collections::VecDeque;
use std::rc::Rc;

use log::trace;

use crate::hashing::HashMap;
use crate::plan::{PlanId, Queue};

/// A type that provides a data container to be held by `Context`.
pub trait DataPlugin: Any {
    type DataContainer: 'static;

    fn create_data_container() -> Self::DataContainer;
}

/// Defines a new type for storing data in `Context`.
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

/// The phase of a time step a plan runs in.
///
/// Plans at the same time run `First`, then `Normal`, then `Last`; within a
/// phase they run in the order they were added.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ExecutionPhase {
    First,
    Normal,
    Last,
}

type Callback = dyn FnOnce(&mut Context);
type EventHandler<E> = dyn Fn(&mut Context, E);

/// A value broadcast to every handler subscribed to its type.
pub trait Event: Copy + 'static {}

pub struct Context {
    plan_queue: Queue<Box<Callback>, ExecutionPhase>,
    callback_queue: VecDeque<Box<Callback>>,
    event_handlers: HashMap<TypeId, Box<dyn Any>>,
    data_plugins: HashMap<TypeId, Box<dyn Any>>,
    current_time: f64,
    shutdown_requested: bool,
}

impl Context {
    #[must_use]
    pub fn new() -> Context {
        Context {
            plan_queue: Queue::new(),
            callback_queue: VecDeque::new(),
            event_handlers: HashMap::default(),
            data_plugins: HashMap::default(),
            current_time: 0.0,
            shutdown_requested: false,
        }
    }

    /// Add a plan to run at `time` in the `Normal` phase.
    ///
    /// # Panics
    ///
    /// Panics if `time` is NaN, infinite, or earlier than the current time.
    pub fn add_plan(&mut self, time: f64, callback: impl FnOnce(&mut Context) + 'static) -> PlanId {
        self.add_plan_with_phase(time, callback, ExecutionPhase::Normal)
    }

    /// Add a plan to run at `time` in the given phase.
    ///
    /// # Panics
    ///
    /// Panics if `time` is NaN, infinite, or earlier than the current time.
    pub fn add_plan_with_phase(
        &mut self,
        time: f64,
        callback: impl FnOnce(&mut Context) + 'static,
        phase: ExecutionPhase,
    ) -> PlanId {
        assert!(
            !time.is_nan() && !time.is_infinite() && time >= self.current_time,
            "Time {time} is invalid"
        );
        self.plan_queue.add_plan(time, Box::new(callback), phase)
    }

    pub fn cancel_plan(&mut self, id: &PlanId) {
        self.plan_queue.cancel_plan(id);
    }

    /// Queue a callback that runs before the next plan.
    pub fn queue_callback(&mut self, callback: impl FnOnce(&mut Context) + 'static) {
        self.callback_queue.push_back(Box::new(callback));
    }

    /// Register `handler` to be called with every event of type `E`.
    pub fn subscribe_to_event<E: Event>(&mut self, handler: impl Fn(&mut Context, E) + 'static) {
        self.event_handlers
            .entry(TypeId::of::<E>())
            .or_insert_with(|| Box::new(Vec::<Rc<EventHandler<E>>>::new()))
            .downcast_mut::<Vec<Rc<EventHandler<E>>>>()
            .expect("Event handlers have the wrong type")
            .push(Rc::new(handler));
    }

    /// Queue a callback per subscriber of `E`, in subscription order. The
    /// handlers run after the current plan or callback returns.
    pub fn emit_event<E: Event>(&mut self, event: E) {
        let Some(handlers) = self
            .event_handlers
            .get(&TypeId::of::<E>())
            .and_then(|handlers| handlers.downcast_ref::<Vec<Rc<EventHandler<E>>>>())
        else {
            return;
        };
        let handlers = handlers.clone();
        for handler in handlers {
            self.queue_callback(move |context| handler(context, event));
        }
    }

    /// Stop the run after the current plan or callback returns. Pending plans
    /// are dropped.
    pub fn shutdown(&mut self) {
        trace!("shutdown requested at time {}", self.current_time);
        self.shutdown_requested = true;
    }

    /// Returns a mutable reference to the data container of plugin `T`,
    /// creating it on first use.
    ///
    /// # Panics
    ///
    /// Panics if a different container type was stored under `T`, which the
    /// `define_data_plugin!` macro rules out.
    pub fn get_data_mut<T: DataPlugin>(&mut self, _plugin: T) -> &mut T::DataContainer {
        self.data_plugins
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(T::create_data_container()))
            .downcast_mut::<T::DataContainer>()
            .expect("Data plugin container has the wrong type")
    }

    /// Returns the data container of plugin `T`, or `None` if nothing has
    /// created it yet.
    #[must_use]
    pub fn get_data<T: DataPlugin>(&self, _plugin: T) -> Option<&T::DataContainer> {
        self.data_plugins
            .get(&TypeId::of::<T>())
            .and_then(|container| container.downcast_ref::<T::DataContainer>())
    }

    #[must_use]
    pub fn get_current_time(&self) -> f64 {
        self.current_time
    }

    /// Run plans and callbacks until there are none left or `shutdown` is
    /// called.
    pub fn execute(&mut self) {
        trace!("entering event loop");
        loop {
            if self.shutdown_requested {
                self.callback_queue.clear();
                self.plan_queue.clear();
                self.shutdown_requested = false;
                break;
            }

            if let Some(callback) = self.callback_queue.pop_front() {
                callback(self);
                continue;
            }

            match self.plan_queue.get_next_plan() {
                Some(plan) => {
                    self.current_time = plan.time;
                    (plan.data)(self);
                }
                None => break,
            }
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
