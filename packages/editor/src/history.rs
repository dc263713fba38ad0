//! # History Manager
//!
//! Linear undo/redo over whole-document snapshots.
//!
//! ## Design
//!
//! - Snapshots are full `Document` values, not diffs; documents are
//!   report-scale, so the memory trade buys determinism
//! - A fresh `record` clears the redo stack (linear history, no branches)
//! - The past stack is capped; the oldest snapshot is dropped silently
//!
//! The manager exclusively owns its snapshots; the live editing surface
//! only ever sees `present()`.

use esgdoc_model::Document;

#[derive(Debug)]
pub struct History {
    /// Past snapshots, most recent last
    past: Vec<Document>,

    /// The live document value
    present: Document,

    /// Undone snapshots, next redo first
    future: Vec<Document>,

    /// Maximum past snapshots (0 = unlimited)
    limit: usize,
}

impl History {
    pub fn new(present: Document, limit: usize) -> Self {
        Self {
            past: Vec::new(),
            present,
            future: Vec::new(),
            limit,
        }
    }

    pub fn present(&self) -> &Document {
        &self.present
    }

    /// Push the current present onto the past and make `next` the
    /// present. Invalidates redo history.
    pub fn record(&mut self, next: Document) {
        let previous = std::mem::replace(&mut self.present, next);
        self.past.push(previous);

        if self.limit > 0 && self.past.len() > self.limit {
            self.past.remove(0);
        }

        self.future.clear();
    }

    /// Step back one snapshot. Returns false (and changes nothing) when
    /// there is no past.
    pub fn undo(&mut self) -> bool {
        match self.past.pop() {
            Some(previous) => {
                let current = std::mem::replace(&mut self.present, previous);
                self.future.insert(0, current);
                true
            }
            None => false,
        }
    }

    /// Step forward one snapshot. Mirror of `undo`.
    pub fn redo(&mut self) -> bool {
        if self.future.is_empty() {
            return false;
        }
        let next = self.future.remove(0);
        let current = std::mem::replace(&mut self.present, next);
        self.past.push(current);
        true
    }

    /// Drop both stacks and set a new present (document load / discard)
    pub fn reset(&mut self, document: Document) {
        self.past.clear();
        self.future.clear();
        self.present = document;
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.past.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.future.len()
    }
}
