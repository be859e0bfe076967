//! A time-ordered queue of plans.
//!
//! `Queue<T, P>` holds payloads of type `T` keyed by an `f64` time and a
//! priority `P`. The model uses it to hold the steps of a run: each step is a
//! plan at an integer time, and work that must follow the last step is placed
//! in a later `ExecutionPhase` at the same time.
//!
//! Adding a plan is *O*(log(*n*)); cancellation is *O*(1) and retrieval is
//! amortized *O*(log(*n*)).

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::hashing::HashMap;

/// A priority queue of plans ordered by time, then priority, then insertion
/// order.
///
/// Payloads live in a map keyed by plan id so that a plan can be cancelled
/// without touching the heap; cancelled entries are skipped when popped.
pub struct Queue<T, P: Eq + Ord> {
    queue: BinaryHeap<Entry<P>>,
    data_map: HashMap<u64, T>,
    plan_counter: u64,
}

impl<T, P: Eq + Ord> Queue<T, P> {
    #[must_use]
    pub fn new() -> Queue<T, P> {
        Queue {
            queue: BinaryHeap::new(),
            data_map: HashMap::default(),
            plan_counter: 0,
        }
    }

    /// Add a plan at `time` and return a handle that can cancel it.
    pub fn add_plan(&mut self, time: f64, data: T, priority: P) -> PlanId {
        let id = self.plan_counter;
        self.queue.push(Entry { time, id, priority });
        self.data_map.insert(id, data);
        self.plan_counter += 1;
        PlanId(id)
    }

    /// Cancel a pending plan.
    ///
    /// # Panics
    ///
    /// Panics if the plan has already run or been cancelled.
    pub fn cancel_plan(&mut self, id: &PlanId) {
        self.data_map
            .remove(&id.0)
            .expect("Plan does not exist or has already been executed");
    }

    /// Remove and return the earliest pending plan, if any.
    pub fn get_next_plan(&mut self) -> Option<Plan<T>> {
        while let Some(entry) = self.queue.pop() {
            if let Some(data) = self.data_map.remove(&entry.id) {
                return Some(Plan {
                    time: entry.time,
                    data,
                });
            }
        }
        None
    }

    /// The number of plans that have neither run nor been cancelled.
    #[must_use]
    pub fn remaining_plan_count(&self) -> usize {
        self.data_map.len()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
        self.data_map.clear();
    }
}

impl<T, P: Eq + Ord> Default for Queue<T, P> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(PartialEq, Debug)]
struct Entry<P: Eq + Ord> {
    time: f64,
    id: u64,
    priority: P,
}

impl<P: Eq + Ord> Eq for Entry<P> {}

impl<P: Eq + Ord> PartialOrd for Entry<P> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// `BinaryHeap` is a max-heap, so every comparison is reversed.
impl<P: Eq + Ord> Ord for Entry<P> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .total_cmp(&other.time)
            .then_with(|| self.priority.cmp(&other.priority))
            .then_with(|| self.id.cmp(&other.id))
            .reverse()
    }
}

/// Handle to a plan added to a `Queue`.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct PlanId(u64);

/// A payload released from the queue together with its scheduled time.
pub struct Plan<T> {
    pub time: f64,
    pub data: T,
}
