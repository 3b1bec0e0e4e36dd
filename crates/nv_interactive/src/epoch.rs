//! Notebook epoch tracking.
//!
//! A notebook cell can be re-executed many times; each execution is a new
//! epoch. `EpochManager` keeps the dependency graph at epoch granularity
//! (not symbol granularity like [`crate::session::SessionManager`]) since a
//! notebook's unit of re-run is the whole cell, and maps cells to their
//! current epoch so a later re-run of the same cell supersedes the earlier
//! one without the caller juggling ids by hand.

use std::collections::{HashMap, HashSet, VecDeque};

#[derive(Debug, Clone)]
pub struct Epoch {
    pub id: i32,
    pub valid: bool,
    pub cell: usize,
    pub defined_symbols: HashSet<String>,
    pub used_symbols: HashSet<String>,
}

/// Tracks notebook cell executions as a sequence of epochs, invalidating
/// downstream cells when an upstream one is re-run with different output.
#[derive(Debug, Default)]
pub struct EpochManager {
    epoch_counter: i32,
    epochs: HashMap<i32, Epoch>,
    cell_epoch: HashMap<usize, i32>,
    deps: HashMap<i32, HashSet<i32>>,
    rdeps: HashMap<i32, HashSet<i32>>,
    symbol_producer_epoch: HashMap<String, i32>,
}

impl EpochManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new epoch for `cell`, wiring its dependencies from
    /// `used_symbols` by looking up which earlier epoch currently owns each
    /// name. Does not retire the cell's previous epoch — call
    /// [`commit_epoch`](Self::commit_epoch) once the new one's IR has built
    /// successfully.
    pub fn create_epoch_for_cell(
        &mut self,
        cell: usize,
        defined_symbols: HashSet<String>,
        used_symbols: HashSet<String>,
    ) -> i32 {
        let id = self.epoch_counter;
        self.epoch_counter += 1;

        let mut dep_epochs = HashSet::new();
        for name in &used_symbols {
            if let Some(&producer) = self.symbol_producer_epoch.get(name) {
                dep_epochs.insert(producer);
            }
        }
        self.deps.insert(id, dep_epochs.clone());
        for dep in dep_epochs {
            self.rdeps.entry(dep).or_default().insert(id);
        }

        self.epochs.insert(
            id,
            Epoch { id, valid: true, cell, defined_symbols, used_symbols },
        );
        id
    }

    /// Commits `epoch_id` as the current epoch for its cell: retires
    /// whatever epoch previously owned that cell (invalidating it and its
    /// dependents) and registers this epoch's symbols as the live
    /// producers.
    pub fn commit_epoch(&mut self, epoch_id: i32) -> Vec<i32> {
        let cell = match self.epochs.get(&epoch_id) {
            Some(e) => e.cell,
            None => return Vec::new(),
        };

        let mut invalidated = Vec::new();
        if let Some(previous) = self.cell_epoch.get(&cell).copied() {
            if previous != epoch_id {
                invalidated = self.invalidate_epoch_local(previous);
            }
        }

        self.cell_epoch.insert(cell, epoch_id);
        if let Some(epoch) = self.epochs.get(&epoch_id) {
            for name in epoch.defined_symbols.clone() {
                self.symbol_producer_epoch.insert(name, epoch_id);
            }
        }
        invalidated
    }

    /// Invalidates `epoch_id` and every epoch transitively depending on it,
    /// returning the cells affected (deduplicated, in discovery order).
    pub fn invalidate_epoch(&mut self, epoch_id: i32) -> Vec<usize> {
        let invalidated = self.invalidate_epoch_local(epoch_id);
        let mut cells = Vec::new();
        let mut seen = HashSet::new();
        for id in invalidated {
            if let Some(epoch) = self.epochs.get(&id) {
                if seen.insert(epoch.cell) {
                    cells.push(epoch.cell);
                }
            }
        }
        cells
    }

    fn invalidate_epoch_local(&mut self, epoch_id: i32) -> Vec<i32> {
        self.bfs_collect_dependents(epoch_id)
            .into_iter()
            .inspect(|id| {
                if let Some(epoch) = self.epochs.get_mut(id) {
                    epoch.valid = false;
                }
            })
            .collect()
    }

    fn bfs_collect_dependents(&self, start: i32) -> Vec<i32> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut queue = VecDeque::new();
        queue.push_back(start);
        while let Some(id) = queue.pop_front() {
            if !seen.insert(id) {
                continue;
            }
            order.push(id);
            for &dependent in self.rdeps.get(&id).into_iter().flatten() {
                queue.push_back(dependent);
            }
        }
        order
    }

    pub fn is_epoch_valid(&self, epoch_id: i32) -> bool {
        self.epochs.get(&epoch_id).map(|e| e.valid).unwrap_or(false)
    }

    pub fn current_epoch_for_cell(&self, cell: usize) -> Option<i32> {
        self.cell_epoch.get(&cell).copied()
    }

    pub fn get_epoch(&self, epoch_id: i32) -> Option<&Epoch> {
        self.epochs.get(&epoch_id)
    }

    /// The epoch currently credited with producing `name`, if any symbol
    /// by that name has ever been defined.
    pub fn producer_epoch_of(&self, name: &str) -> Option<i32> {
        self.symbol_producer_epoch.get(name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn a_fresh_epoch_depends_on_the_epoch_that_currently_produces_a_used_symbol() {
        let mut mgr = EpochManager::new();
        let e0 = mgr.create_epoch_for_cell(0, set(&["a"]), set(&[]));
        mgr.commit_epoch(e0);
        let e1 = mgr.create_epoch_for_cell(1, set(&["b"]), set(&["a"]));
        mgr.commit_epoch(e1);
        assert!(mgr.is_epoch_valid(e0));
        assert!(mgr.is_epoch_valid(e1));
    }

    #[test]
    fn re_running_a_cell_invalidates_downstream_cells() {
        let mut mgr = EpochManager::new();
        let e0 = mgr.create_epoch_for_cell(0, set(&["a"]), set(&[]));
        mgr.commit_epoch(e0);
        let e1 = mgr.create_epoch_for_cell(1, set(&["b"]), set(&["a"]));
        mgr.commit_epoch(e1);

        let e0_rerun = mgr.create_epoch_for_cell(0, set(&["a"]), set(&[]));
        let invalidated_cells = mgr.invalidate_epoch(mgr.current_epoch_for_cell(0).unwrap());
        mgr.commit_epoch(e0_rerun);

        assert!(invalidated_cells.contains(&0));
        assert!(invalidated_cells.contains(&1));
        assert!(!mgr.is_epoch_valid(e1));
    }

    #[test]
    fn committing_a_new_epoch_for_a_cell_retires_its_previous_epoch() {
        let mut mgr = EpochManager::new();
        let e0 = mgr.create_epoch_for_cell(0, set(&["a"]), set(&[]));
        mgr.commit_epoch(e0);
        let e0b = mgr.create_epoch_for_cell(0, set(&["a"]), set(&[]));
        mgr.commit_epoch(e0b);
        assert!(!mgr.is_epoch_valid(e0));
        assert!(mgr.is_epoch_valid(e0b));
        assert_eq!(mgr.current_epoch_for_cell(0), Some(e0b));
    }
}
