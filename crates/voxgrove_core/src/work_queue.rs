use std::collections::VecDeque;
use std::hash::Hash;

use rustc_hash::FxHashSet;

/// FIFO queue that holds each item at most once.
///
/// Pushing an item that is already waiting is a no-op, so repeated requests for the
/// same work collapse into a single entry. Consumers drain a bounded number of items
/// per tick with [`WorkQueue::drain_budget`].
#[derive(Debug, Clone)]
pub struct WorkQueue<T> {
    order: VecDeque<T>,
    queued: FxHashSet<T>,
}

impl<T> Default for WorkQueue<T> {
    fn default() -> Self {
        Self {
            order: VecDeque::new(),
            queued: FxHashSet::default(),
        }
    }
}

impl<T: Copy + Eq + Hash> WorkQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the item was already queued.
    pub fn push(&mut self, item: T) -> bool {
        if !self.queued.insert(item) {
            return false;
        }
        self.order.push_back(item);
        true
    }

    pub fn extend<I: IntoIterator<Item = T>>(&mut self, items: I) {
        for item in items {
            self.push(item);
        }
    }

    pub fn pop(&mut self) -> Option<T> {
        let item = self.order.pop_front()?;
        self.queued.remove(&item);
        Some(item)
    }

    pub fn drain_budget(&mut self, budget: usize) -> Vec<T> {
        let count = budget.min(self.order.len());
        let mut drained = Vec::with_capacity(count);
        while drained.len() < count {
            let Some(item) = self.pop() else {
                break;
            };
            drained.push(item);
        }
        drained
    }

    /// Drops a waiting item. Returns false when it was not queued.
    pub fn remove(&mut self, item: &T) -> bool {
        if !self.queued.remove(item) {
            return false;
        }
        self.order.retain(|queued| queued != item);
        true
    }

    pub fn contains(&self, item: &T) -> bool {
        self.queued.contains(item)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.queued.clear();
    }
}
