//! Tick scheduler: pending output flips keyed by future tick.
//!
//! A group whose desired output differs from its current output gets one
//! flip scheduled a short, randomly jittered distance in the future. When
//! the tick arrives the flip is applied and the group's successors are
//! re-evaluated. If the desired output changes back before then, the
//! pending flip is cancelled.

use crate::dependency::DependencyGraph;
use indexmap::{IndexMap, IndexSet};
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Simulation state of one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Status {
    /// Power input, recomputed on every parse
    pub powered: bool,
    /// Simulated output bit
    pub active: bool,
    /// Tick of the pending flip, if any
    pub next_tick: Option<u64>,
}

impl Status {
    /// A status whose output already matches its power input.
    #[must_use]
    pub fn settled(powered: bool) -> Self {
        Self {
            powered,
            active: powered,
            next_tick: None,
        }
    }
}

/// Owns node statuses and the queue of scheduled flips.
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    statuses: IndexMap<String, Status>,
    toggles: BTreeMap<u64, IndexSet<String>>,
    current: u64,
}

impl Scheduler {
    /// Create a scheduler at tick zero with the given statuses.
    #[must_use]
    pub fn new(statuses: IndexMap<String, Status>) -> Self {
        Self {
            statuses,
            toggles: BTreeMap::new(),
            current: 0,
        }
    }

    /// The tick that the next call to [`Scheduler::next_tick`] processes.
    #[must_use]
    pub fn current(&self) -> u64 {
        self.current
    }

    /// Status of `id`.
    #[must_use]
    pub fn status(&self, id: &str) -> Option<&Status> {
        self.statuses.get(id)
    }

    /// Mutable status of `id`.
    pub fn status_mut(&mut self, id: &str) -> Option<&mut Status> {
        self.statuses.get_mut(id)
    }

    /// Iterate over every status.
    pub fn statuses(&self) -> impl Iterator<Item = (&String, &Status)> {
        self.statuses.iter()
    }

    /// Add an inactive, unpowered status for `id` unless one exists.
    pub fn ensure(&mut self, id: &str) {
        if !self.statuses.contains_key(id) {
            self.statuses.insert(id.to_string(), Status::default());
        }
    }

    /// Drop statuses rejected by `keep`, cancelling their pending flips.
    ///
    /// Returns the number of statuses removed.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) -> usize {
        let removed: Vec<String> = self
            .statuses
            .keys()
            .filter(|id| !keep(id))
            .cloned()
            .collect();
        for id in &removed {
            self.cancel(id);
            self.statuses.shift_remove(id);
        }
        removed.len()
    }

    /// Replace every status and forget all pending flips. Time keeps running.
    pub fn reset(&mut self, statuses: IndexMap<String, Status>) {
        self.statuses = statuses;
        self.toggles.clear();
    }

    /// Total number of pending flips.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.toggles.values().map(IndexSet::len).sum()
    }

    /// Check if no flip is pending.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.toggles.is_empty()
    }

    /// Re-evaluate `root` and schedule or cancel its flip.
    ///
    /// The desired output is on if the group is powered or any precursor is
    /// inactive.
    pub fn activate(&mut self, root: &str, dependencies: &DependencyGraph, rng: &mut dyn RngCore) {
        let Some(status) = self.statuses.get(root) else {
            tracing::warn!(node_id = root, "Activation of unknown node ignored");
            return;
        };
        let desired = status.powered
            || dependencies
                .precursors(root)
                .any(|p| self.statuses.get(p).is_some_and(|s| !s.active));

        if desired == status.active {
            self.cancel(root);
            return;
        }
        if status.next_tick.is_some() {
            return;
        }

        let tick = (self.current | 1) + rng.gen_range(0..=1u64) + 1;
        self.toggles
            .entry(tick)
            .or_default()
            .insert(root.to_string());
        if let Some(status) = self.statuses.get_mut(root) {
            status.next_tick = Some(tick);
        }
        tracing::trace!(node_id = root, tick, desired, "Scheduled flip");
    }

    /// Apply the flips due at the current tick, re-evaluate their
    /// successors, then advance one tick.
    ///
    /// Returns the number of flips applied.
    pub fn next_tick(&mut self, dependencies: &DependencyGraph, rng: &mut dyn RngCore) -> usize {
        let Some(due) = self.toggles.remove(&self.current) else {
            self.current += 1;
            return 0;
        };

        let mut successors: IndexSet<&str> = IndexSet::new();
        for id in &due {
            if let Some(status) = self.statuses.get_mut(id) {
                status.active = !status.active;
                status.next_tick = None;
            }
            successors.extend(dependencies.successors(id));
        }
        for successor in successors {
            self.activate(successor, dependencies, rng);
        }

        tracing::debug!(tick = self.current, flipped = due.len(), "Applied flips");
        self.current += 1;
        due.len()
    }

    fn cancel(&mut self, id: &str) {
        let Some(tick) = self.statuses.get_mut(id).and_then(|s| s.next_tick.take()) else {
            return;
        };
        if let Some(pending) = self.toggles.get_mut(&tick) {
            pending.shift_remove(id);
            if pending.is_empty() {
                self.toggles.remove(&tick);
            }
        }
    }
}
