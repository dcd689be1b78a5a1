//! Per-entry results and the aggregate run report.

use std::fmt;
use std::path::PathBuf;

use super::progress::{EntryId, EntryKind};

/// Terminal result for a single entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// The artifact was downloaded (and verified when a hash was given).
    Downloaded { bytes: u64 },
    /// The repository was cloned.
    Cloned,
    /// The target already existed; `verified` is true when a hash was checked.
    SkippedPresent { verified: bool },
    /// The digest still did not match after one retry.
    IntegrityFailed { expected: String, actual: String },
    /// The transfer could not be completed.
    Failed { reason: String },
}

impl TransferOutcome {
    /// Whether the entry ended in an acceptable state.
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            Self::Downloaded { .. } | Self::Cloned | Self::SkippedPresent { .. }
        )
    }

    /// Whether something new was written to the destination root.
    pub fn is_installed(&self) -> bool {
        matches!(self, Self::Downloaded { .. } | Self::Cloned)
    }

    /// Whether the entry was left alone because it was already present.
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::SkippedPresent { .. })
    }
}

impl fmt::Display for TransferOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Downloaded { bytes } => write!(f, "downloaded ({} bytes)", bytes),
            Self::Cloned => write!(f, "cloned"),
            Self::SkippedPresent { verified: true } => write!(f, "already present, hash verified"),
            Self::SkippedPresent { verified: false } => write!(f, "already present"),
            Self::IntegrityFailed { expected, actual } => {
                write!(f, "hash mismatch: expected {}, got {}", expected, actual)
            }
            Self::Failed { reason } => write!(f, "failed: {}", reason),
        }
    }
}

/// Outcome of one entry, with what is needed to report it.
#[derive(Debug, Clone)]
pub struct EntryReport {
    pub id: EntryId,
    pub name: String,
    pub target: PathBuf,
    pub outcome: TransferOutcome,
}

/// Outcomes for a whole run, in plan order: models first, then nodes.
#[derive(Debug, Clone, Default)]
pub struct TransferReport {
    pub entries: Vec<EntryReport>,
}

impl TransferReport {
    /// Entries that downloaded or cloned something.
    pub fn installed(&self) -> usize {
        self.count(TransferOutcome::is_installed)
    }

    /// Entries skipped because they were already present.
    pub fn skipped(&self) -> usize {
        self.count(TransferOutcome::is_skipped)
    }

    /// Entries that failed, including integrity failures.
    pub fn failed(&self) -> usize {
        self.count(|o| !o.is_success())
    }

    /// Entries that ended in an acceptable state.
    pub fn succeeded(&self) -> usize {
        self.count(TransferOutcome::is_success)
    }

    /// True only when every entry succeeded.
    pub fn all_succeeded(&self) -> bool {
        self.entries.iter().all(|e| e.outcome.is_success())
    }

    /// Reports for one category.
    pub fn of_kind(&self, kind: EntryKind) -> impl Iterator<Item = &EntryReport> {
        self.entries.iter().filter(move |e| e.id.kind == kind)
    }

    /// Reports for entries that did not succeed.
    pub fn failures(&self) -> impl Iterator<Item = &EntryReport> {
        self.entries.iter().filter(|e| !e.outcome.is_success())
    }

    fn count(&self, predicate: impl Fn(&TransferOutcome) -> bool) -> usize {
        self.entries.iter().filter(|e| predicate(&e.outcome)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(kind: EntryKind, index: usize, outcome: TransferOutcome) -> EntryReport {
        EntryReport {
            id: EntryId { kind, index },
            name: format!("entry-{index}"),
            target: PathBuf::from(format!("/root/{index}")),
            outcome,
        }
    }

    #[test]
    fn test_counts() {
        let report = TransferReport {
            entries: vec![
                entry(EntryKind::Model, 0, TransferOutcome::Downloaded { bytes: 10 }),
                entry(EntryKind::Model, 1, TransferOutcome::SkippedPresent { verified: true }),
                entry(
                    EntryKind::Model,
                    2,
                    TransferOutcome::IntegrityFailed {
                        expected: "aa".into(),
                        actual: "bb".into(),
                    },
                ),
                entry(EntryKind::Node, 0, TransferOutcome::Cloned),
                entry(
                    EntryKind::Node,
                    1,
                    TransferOutcome::Failed {
                        reason: "git failed".into(),
                    },
                ),
            ],
        };

        assert_eq!(report.installed(), 2);
        assert_eq!(report.skipped(), 1);
        assert_eq!(report.failed(), 2);
        assert_eq!(report.succeeded(), 3);
        assert!(!report.all_succeeded());
        assert_eq!(report.of_kind(EntryKind::Node).count(), 2);
        assert_eq!(report.failures().count(), 2);
    }

    #[test]
    fn test_empty_report_succeeds() {
        let report = TransferReport::default();
        assert!(report.all_succeeded());
        assert_eq!(report.failed(), 0);
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(TransferOutcome::Cloned.to_string(), "cloned");
        assert_eq!(
            TransferOutcome::SkippedPresent { verified: false }.to_string(),
            "already present"
        );
    }
}
