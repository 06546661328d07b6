//! A priority queue that stores arbitrary data sorted by time
//!
//! Defines a `Queue<T>` that is intended to store a queue of items of type
//! T - sorted by `f64` time - called 'plans'. Adding a plan is *O*(log(*n*))
//! and retrieval is *O*(1) amortized.
//!
//! This queue is used by `Context` to store future events where some callback
//! closure `FnOnce(&mut Context)` will be executed at a given simulation day.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A priority queue that stores arbitrary data sorted by time
///
/// Items of type `T` are stored in order by `f64` time and called `Plan<T>`.
/// When plans are created they are sequentially assigned an `Id` that is a
/// wrapped `u64`. If two plans are scheduled for the same time then the plan
/// that is scheduled first (i.e., that has the lowest id) is placed earlier.
pub struct Queue<T> {
    queue: BinaryHeap<Entry<T>>,
    plan_counter: u64,
}

impl<T> Queue<T> {
    /// Create a new empty `Queue<T>`
    #[must_use]
    pub fn new() -> Queue<T> {
        Queue {
            queue: BinaryHeap::new(),
            plan_counter: 0,
        }
    }

    /// Add a plan to the queue at the specified time
    pub fn add_plan(&mut self, time: f64, data: T) -> Id {
        let id = self.plan_counter;
        self.queue.push(Entry { time, id, data });
        self.plan_counter += 1;
        Id { id }
    }

    /// Retrieve the earliest plan in the queue
    ///
    /// Returns the next plan if it exists or else `None` if the queue is empty
    pub fn get_next_plan(&mut self) -> Option<Plan<T>> {
        self.queue.pop().map(|entry| Plan {
            time: entry.time,
            data: entry.data,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A time and id used to order plans in the `Queue<T>`, plus the payload.
struct Entry<T> {
    time: f64,
    id: u64,
    data: T,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Entry objects are ordered in increasing order by time and then plan id.
/// `BinaryHeap` is a max-heap, so both comparisons are reversed.
impl<T> Ord for Entry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Times are validated by `Context::add_plan`, so `total_cmp` agrees with `<`.
        match self.time.total_cmp(&other.time).reverse() {
            Ordering::Equal => self.id.cmp(&other.id).reverse(),
            ordering => ordering,
        }
    }
}

/// A unique identifier for a plan added to a `Queue<T>`
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Id {
    id: u64,
}

/// A plan that holds data of type `T` intended to be used at the specified time
pub struct Plan<T> {
    pub time: f64,
    pub data: T,
}

#[cfg(test)]
mod tests {
    use super::Queue;

    #[test]
    fn empty_queue() {
        let mut plan_queue = Queue::<()>::new();
        assert!(plan_queue.is_empty());
        assert!(plan_queue.get_next_plan().is_none());
    }

    #[test]
    fn add_plans() {
        let mut plan_queue = Queue::new();
        plan_queue.add_plan(1.0, 1);
        plan_queue.add_plan(3.0, 3);
        plan_queue.add_plan(2.0, 2);
        assert_eq!(plan_queue.len(), 3);

        let next_plan = plan_queue.get_next_plan().unwrap();
        assert_eq!(next_plan.time, 1.0);
        assert_eq!(next_plan.data, 1);

        let next_plan = plan_queue.get_next_plan().unwrap();
        assert_eq!(next_plan.time, 2.0);
        assert_eq!(next_plan.data, 2);

        let next_plan = plan_queue.get_next_plan().unwrap();
        assert_eq!(next_plan.time, 3.0);
        assert_eq!(next_plan.data, 3);

        assert!(plan_queue.get_next_plan().is_none());
    }

    #[test]
    fn add_plans_at_same_time() {
        let mut plan_queue = Queue::new();
        plan_queue.add_plan(1.0, 1);
        plan_queue.add_plan(1.0, 2);
        plan_queue.add_plan(0.0, 0);

        assert_eq!(plan_queue.get_next_plan().unwrap().data, 0);
        assert_eq!(plan_queue.get_next_plan().unwrap().data, 1);
        assert_eq!(plan_queue.get_next_plan().unwrap().data, 2);
        assert!(plan_queue.get_next_plan().is_none());
    }

    #[test]
    fn add_plan_after_retrieval() {
        let mut plan_queue = Queue::new();
        plan_queue.add_plan(1.0, 1);
        assert_eq!(plan_queue.get_next_plan().unwrap().data, 1);

        plan_queue.add_plan(2.0, 2);
        let next_plan = plan_queue.get_next_plan().unwrap();
        assert_eq!(next_plan.time, 2.0);
        assert_eq!(next_plan.data, 2);
    }
}
