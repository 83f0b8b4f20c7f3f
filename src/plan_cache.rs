//! A bounded cache of precomputed plans, keyed by transform length.
//!
//! Transforms along image lines reuse the same plan for every line of equal length. Plans are
//! handed out as [`PlanHandle`]s; an entry counts as in use while any handle to it lives.
use core::ops::Deref;
use std::rc::Rc;

use log::debug;

/// Number of plans a cache keeps before it evicts unused ones.
pub const DEFAULT_CAPACITY: usize = 30;

struct Entry<P> {
    length: usize,
    plan: Rc<P>,
    last_access: u64,
}

pub struct PlanCache<P> {
    entries: Vec<Entry<P>>,
    capacity: usize,
    access_counter: u64,
}

/// Shared access to a cached plan. Dropping it releases the use.
pub struct PlanHandle<P> {
    plan: Rc<P>,
}

impl<P> PlanCache<P> {
    pub fn new() -> Self {
        PlanCache::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        PlanCache {
            entries: Vec::new(),
            capacity,
            access_counter: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of cached plans, which exceeds the capacity while all of them are in use.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, length: usize) -> bool {
        self.entries.iter().any(|entry| entry.length == length)
    }

    /// Number of live handles to the plan for `length`.
    pub fn uses(&self, length: usize) -> usize {
        self.entries
            .iter()
            .find(|entry| entry.length == length)
            .map_or(0, |entry| Rc::strong_count(&entry.plan) - 1)
    }

    /// The plan for `length`, made by `make` if it is not cached.
    ///
    /// Adding to a full cache first evicts the least recently used plan that is not in use, if
    /// there is one.
    pub fn get_or_insert_with<E>(
        &mut self,
        length: usize,
        make: impl FnOnce(usize) -> Result<P, E>,
    ) -> Result<PlanHandle<P>, E> {
        self.access_counter += 1;
        let tick = self.access_counter;
        if let Some(entry) = self.entries.iter_mut().find(|entry| entry.length == length) {
            entry.last_access = tick;
            return Ok(PlanHandle {
                plan: Rc::clone(&entry.plan),
            });
        }

        let plan = Rc::new(make(length)?);
        if self.entries.len() >= self.capacity {
            self.evict();
        }
        self.entries.push(Entry {
            length,
            plan: Rc::clone(&plan),
            last_access: tick,
        });
        Ok(PlanHandle { plan })
    }

    fn evict(&mut self) {
        let unused = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| Rc::strong_count(&entry.plan) == 1)
            .min_by_key(|(_, entry)| entry.last_access)
            .map(|(index, _)| index);
        match unused {
            Some(index) => {
                let entry = self.entries.swap_remove(index);
                debug!("plan cache evicts plan for length {}", entry.length);
            }
            None => debug!("plan cache grows past {} plans, all in use", self.capacity),
        }
    }
}

impl<P> Default for PlanCache<P> {
    fn default() -> Self {
        PlanCache::new()
    }
}

impl<P> Deref for PlanHandle<P> {
    type Target = P;

    fn deref(&self) -> &P {
        &self.plan
    }
}

impl<P> Clone for PlanHandle<P> {
    fn clone(&self) -> Self {
        PlanHandle {
            plan: Rc::clone(&self.plan),
        }
    }
}
