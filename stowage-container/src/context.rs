//! Per-call resolution bookkeeping.
//!
//! One [`ResolutionContext`] lives for exactly one top-level `get`. It
//! records, per service name, whether that name is being built right now or
//! has already been built during this call. Two things fall out of that:
//! - a name reached again while still in progress is a cycle
//! - `perRequest` services built earlier in the call are reused by siblings
//!
//! The context also keeps the in-progress names as a stack, so a cycle error
//! can show the whole loop and a missing dependency can name its consumer.

use std::collections::HashMap;
use std::sync::Arc;

use crate::class::Instance;

enum Entry {
    InProgress,
    Resolved(Instance),
}

/// Visit status of a name within one resolution.
pub(crate) enum Visit {
    /// Not reached yet in this call.
    Unseen,
    /// Reached and still on the call stack.
    InProgress,
    /// Built earlier in this call and shareable.
    Resolved(Instance),
}

#[derive(Default)]
pub(crate) struct ResolutionContext {
    entries: HashMap<String, Entry>,
    stack: Vec<String>,
}

impl ResolutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visit(&self, name: &str) -> Visit {
        match self.entries.get(name) {
            None => Visit::Unseen,
            Some(Entry::InProgress) => Visit::InProgress,
            Some(Entry::Resolved(instance)) => Visit::Resolved(Arc::clone(instance)),
        }
    }

    /// Marks `name` as in progress.
    pub fn enter(&mut self, name: &str) {
        self.entries.insert(name.to_string(), Entry::InProgress);
        self.stack.push(name.to_string());
    }

    /// Leaves `name`. With `share` set the instance stays visible to the rest
    /// of the call, otherwise the entry is dropped entirely.
    pub fn leave(&mut self, name: &str, share: Option<Instance>) {
        if self.stack.last().is_some_and(|top| top == name) {
            self.stack.pop();
        }
        match share {
            Some(instance) => {
                self.entries.insert(name.to_string(), Entry::Resolved(instance));
            }
            None => {
                self.entries.remove(name);
            }
        }
    }

    /// The service currently being built, if any.
    pub fn current(&self) -> Option<&str> {
        self.stack.last().map(String::as_str)
    }

    /// The loop closed by reaching `name` again: `[name, .., name]`.
    pub fn cycle_through(&self, name: &str) -> Vec<String> {
        let start = self.stack.iter().position(|n| n == name).unwrap_or(0);
        let mut chain = self.stack[start..].to_vec();
        chain.push(name.to_string());
        chain
    }
}
