//! Measurement gating for container layouts
//!
//! Rendered children report their size once measured and again whenever it
//! changes. [`LayoutCoordinator`] caches those reports, tracks which
//! containers still wait for a first measurement of some child, and tells the
//! caller when a container should run its layout again.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thinview_core::Size;

use crate::measure::Measure;

/// "Size calculated" report from a rendered child.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeCalculated {
    pub id: String,
    pub parent: Option<String>,
    pub size: Size,
}

impl SizeCalculated {
    pub fn new(id: impl Into<String>, parent: Option<&str>, size: Size) -> Self {
        Self {
            id: id.into(),
            parent: parent.map(str::to_string),
            size,
        }
    }
}

/// What a size report means for the reporting child's parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Relayout {
    /// Same size as the last report.
    Unchanged,
    /// The parent still waits for other children.
    Pending { parent: String, remaining: usize },
    /// The parent has every first measurement and should lay out again.
    Ready(String),
    /// The reporting component has no parent.
    Root,
}

#[derive(Debug, Default)]
pub struct LayoutCoordinator {
    measured: HashMap<String, Size>,
    pending: HashMap<String, HashSet<String>>,
    invalid: HashSet<String>,
}

impl LayoutCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the children `container` lays out. Children that already
    /// reported a size are not waited on.
    pub fn expect_children<I, S>(&mut self, container: &str, children: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let waiting: HashSet<String> = children
            .into_iter()
            .map(Into::into)
            .filter(|id| !self.measured.contains_key(id))
            .collect();
        if waiting.is_empty() {
            self.pending.remove(container);
        } else {
            self.pending.insert(container.to_string(), waiting);
        }
    }

    pub fn report(&mut self, event: SizeCalculated) -> Relayout {
        let SizeCalculated { id, parent, size } = event;
        if self.measured.insert(id.clone(), size) == Some(size) {
            return Relayout::Unchanged;
        }
        let Some(parent) = parent else {
            return Relayout::Root;
        };

        self.invalid.insert(parent.clone());
        if let Some(waiting) = self.pending.get_mut(&parent) {
            waiting.remove(&id);
            if !waiting.is_empty() {
                let remaining = waiting.len();
                tracing::trace!("{} waits for {} more measurements", parent, remaining);
                return Relayout::Pending { parent, remaining };
            }
            self.pending.remove(&parent);
        }
        Relayout::Ready(parent)
    }

    pub fn pending_count(&self, container: &str) -> usize {
        self.pending.get(container).map_or(0, HashSet::len)
    }

    /// Whether every child of `container` reported at least once.
    pub fn is_settled(&self, container: &str) -> bool {
        self.pending_count(container) == 0
    }

    /// Mark `container` for a full relayout, e.g. after a resize or a change
    /// of its own layout properties.
    pub fn invalidate(&mut self, container: &str) {
        self.invalid.insert(container.to_string());
    }

    /// Clear and return the invalid mark of `container`.
    pub fn take_invalid(&mut self, container: &str) -> bool {
        self.invalid.remove(container)
    }

    /// Drop everything known about a destroyed component.
    pub fn forget(&mut self, id: &str) {
        self.measured.remove(id);
        self.pending.remove(id);
        self.invalid.remove(id);
        for waiting in self.pending.values_mut() {
            waiting.remove(id);
        }
        self.pending.retain(|_, waiting| !waiting.is_empty());
    }

    pub fn measured(&self, id: &str) -> Option<Size> {
        self.measured.get(id).copied()
    }
}

impl Measure for LayoutCoordinator {
    fn preferred_size(&self, id: &str) -> Option<Size> {
        self.measured(id)
    }
}
