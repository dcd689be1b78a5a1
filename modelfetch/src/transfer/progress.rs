//! Observational progress events emitted by the transfer engine.
//!
//! Observers never influence a transfer; they exist so a front end can draw
//! progress bars. Events for one entry always arrive in the order
//! `on_start`, any number of `on_progress` / `on_message`, `on_finish`.

use std::fmt;

use super::outcome::TransferOutcome;

/// Which plan category an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntryKind {
    Model,
    Node,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Model => write!(f, "model"),
            Self::Node => write!(f, "node"),
        }
    }
}

/// Position of an entry in the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId {
    pub kind: EntryKind,
    pub index: usize,
}

impl EntryId {
    pub fn model(index: usize) -> Self {
        Self {
            kind: EntryKind::Model,
            index,
        }
    }

    pub fn node(index: usize) -> Self {
        Self {
            kind: EntryKind::Node,
            index,
        }
    }
}

/// Receives progress events. All methods default to doing nothing.
///
/// With a worker pool, events for different entries interleave and arrive
/// from several threads.
pub trait TransferObserver: Send + Sync {
    /// An entry started.
    fn on_start(&self, _id: EntryId, _name: &str) {}

    /// Bytes on disk for a download; `total` is known only when the server
    /// declared it.
    fn on_progress(&self, _id: EntryId, _bytes: u64, _total: Option<u64>) {}

    /// A notable event within an entry, e.g. a retry.
    fn on_message(&self, _id: EntryId, _message: &str) {}

    /// An entry reached its terminal outcome.
    fn on_finish(&self, _id: EntryId, _outcome: &TransferOutcome) {}
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl TransferObserver for NoopObserver {}
