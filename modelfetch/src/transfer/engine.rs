//! Executes a [`Plan`] against the destination root.
//!
//! # Model entries
//!
//! ```text
//! target exists? ── no hash ──────────────────────────▶ SkippedPresent
//!        │          hash matches ─────────────────────▶ SkippedPresent
//!        │          hash mismatch ─▶ delete target ─┐
//!        no                                         │
//!        ▼                                          ▼
//! fetch into <target>.part (resumes) ─▶ verify ─▶ rename ─▶ Downloaded
//!                                         │
//!                                         └ mismatch ─▶ delete, retry once ─▶ IntegrityFailed
//! ```
//!
//! A failed transfer leaves `<target>.part` on disk so the next run resumes
//! it. The final path only ever holds a complete file.
//!
//! # Concurrency
//!
//! With `parallel > 1` entries are grouped into lanes by target path, so two
//! workers never touch the same path. Scoped worker threads pull whole lanes
//! from a shared cursor and send outcomes back over a channel; the report is
//! assembled in plan order once every worker has finished.

use std::collections::HashMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;

use reqwest::blocking::Client;
use tracing::{debug, info, warn};

use super::checksum::{verify, Verification};
use super::config::EngineConfig;
use super::error::{TransferError, TransferResult};
use super::git::{GitCloner, RepositoryCloner};
use super::outcome::{EntryReport, TransferOutcome, TransferReport};
use super::progress::{EntryId, EntryKind, TransferObserver};
use super::strategy::{LayeredStrategy, TransferStrategy};
use crate::manifest::{ModelEntry, NodeEntry};
use crate::plan::Plan;

/// Attempts per model before a digest mismatch is final.
const MAX_ATTEMPTS: usize = 2;

/// Suffix of the staging file a download is written to.
pub const STAGING_SUFFIX: &str = ".part";

/// What a run would do for one entry, computed without any network access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedStep {
    /// Nothing on disk; download from scratch.
    Download,
    /// A staging file exists; resume from `bytes`.
    Resume { bytes: u64 },
    /// Target exists without an expected hash; skip.
    SkipPresent,
    /// Target exists and will be checked against the expected hash.
    Verify,
    /// Repository directory missing; clone.
    Clone,
    /// Repository directory exists; skip.
    SkipInstalled,
}

/// One line of a dry run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedAction {
    pub id: EntryId,
    pub name: String,
    pub source: String,
    pub target: PathBuf,
    pub step: PlannedStep,
}

/// Downloads models and clones nodes into a destination root.
pub struct TransferEngine {
    root: PathBuf,
    parallel: usize,
    strategy: Box<dyn TransferStrategy>,
    cloner: Box<dyn RepositoryCloner>,
}

impl TransferEngine {
    /// Create an engine, probing for external tools once.
    pub fn new(config: &EngineConfig, client: Client) -> Self {
        Self::with_components(
            config,
            Box::new(LayeredStrategy::probe(config, client)),
            Box::new(GitCloner::default()),
        )
    }

    /// Create an engine from explicit transfer components.
    pub fn with_components(
        config: &EngineConfig,
        strategy: Box<dyn TransferStrategy>,
        cloner: Box<dyn RepositoryCloner>,
    ) -> Self {
        Self {
            root: config.root.clone(),
            parallel: config.parallel.max(1),
            strategy,
            cloner,
        }
    }

    /// The destination root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute target file for a model.
    pub fn model_target(&self, entry: &ModelEntry) -> PathBuf {
        self.root.join(entry.relative_target())
    }

    /// Absolute clone directory for a node.
    pub fn node_target(&self, entry: &NodeEntry) -> PathBuf {
        self.root.join(&entry.destination_path)
    }

    /// Describe what [`run`](Self::run) would do, touching only the local
    /// filesystem.
    pub fn plan_actions(&self, plan: &Plan) -> Vec<PlannedAction> {
        let models = plan.models.iter().enumerate().map(|(index, entry)| {
            let target = self.model_target(entry);
            let staging = staging_path(&target);
            let step = if target.exists() {
                if entry.expected_hash.is_some() {
                    PlannedStep::Verify
                } else {
                    PlannedStep::SkipPresent
                }
            } else {
                match staging.metadata().map(|m| m.len()) {
                    Ok(bytes) if bytes > 0 => PlannedStep::Resume { bytes },
                    _ => PlannedStep::Download,
                }
            };
            PlannedAction {
                id: EntryId::model(index),
                name: entry.name.clone(),
                source: entry.url.clone(),
                target,
                step,
            }
        });

        let nodes = plan.nodes.iter().enumerate().map(|(index, entry)| {
            let target = self.node_target(entry);
            let step = if target.exists() {
                PlannedStep::SkipInstalled
            } else {
                PlannedStep::Clone
            };
            PlannedAction {
                id: EntryId::node(index),
                name: entry.name.clone(),
                source: entry.repo_url.clone(),
                target,
                step,
            }
        });

        models.chain(nodes).collect()
    }

    /// Execute every entry of `plan`.
    ///
    /// Every entry is attempted; failures are recorded, never propagated.
    pub fn run(&self, plan: &Plan, observer: &dyn TransferObserver) -> TransferReport {
        let jobs = self.jobs(plan);
        info!(
            models = plan.models.len(),
            nodes = plan.nodes.len(),
            workers = self.parallel,
            root = %self.root.display(),
            "Starting transfers"
        );

        let entries = if self.parallel <= 1 || jobs.len() <= 1 {
            jobs.iter()
                .map(|job| self.execute(plan, job, observer))
                .collect()
        } else {
            self.run_pooled(plan, &jobs, observer)
        };

        let report = TransferReport { entries };
        info!(
            installed = report.installed(),
            skipped = report.skipped(),
            failed = report.failed(),
            "Transfers finished"
        );
        report
    }

    fn jobs(&self, plan: &Plan) -> Vec<Job> {
        let models = plan.models.iter().enumerate().map(|(index, entry)| Job {
            id: EntryId::model(index),
            target: self.model_target(entry),
        });
        let nodes = plan.nodes.iter().enumerate().map(|(index, entry)| Job {
            id: EntryId::node(index),
            target: self.node_target(entry),
        });
        models.chain(nodes).collect()
    }

    fn run_pooled(
        &self,
        plan: &Plan,
        jobs: &[Job],
        observer: &dyn TransferObserver,
    ) -> Vec<EntryReport> {
        let lanes = lanes_by_target(jobs);
        let workers = self.parallel.min(lanes.len());
        let cursor = AtomicUsize::new(0);
        let (tx, rx) = mpsc::channel::<(usize, EntryReport)>();

        debug!(lanes = lanes.len(), workers, "Running worker pool");

        thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    let tx = tx.clone();
                    let lanes = &lanes;
                    let cursor = &cursor;
                    scope.spawn(move || loop {
                        let lane = cursor.fetch_add(1, Ordering::SeqCst);
                        let Some(positions) = lanes.get(lane) else {
                            break;
                        };
                        for &position in positions {
                            let report = self.execute(plan, &jobs[position], observer);
                            if tx.send((position, report)).is_err() {
                                return;
                            }
                        }
                    })
                })
                .collect();

            // Joined explicitly so a panicking worker does not unwind the run.
            for handle in handles {
                if handle.join().is_err() {
                    warn!("Transfer worker panicked");
                }
            }
        });
        drop(tx);

        let mut slots: Vec<Option<EntryReport>> = vec![None; jobs.len()];
        for (position, report) in rx {
            slots[position] = Some(report);
        }

        // A worker that panicked leaves a hole; report it instead of losing it.
        slots
            .into_iter()
            .zip(jobs)
            .map(|(slot, job)| {
                slot.unwrap_or_else(|| EntryReport {
                    id: job.id,
                    name: entry_name(plan, job.id),
                    target: job.target.clone(),
                    outcome: TransferOutcome::Failed {
                        reason: "worker terminated unexpectedly".to_string(),
                    },
                })
            })
            .collect()
    }

    fn execute(&self, plan: &Plan, job: &Job, observer: &dyn TransferObserver) -> EntryReport {
        let name = entry_name(plan, job.id);
        observer.on_start(job.id, &name);

        let result = match job.id.kind {
            EntryKind::Model => self.transfer_model(job, &plan.models[job.id.index], observer),
            EntryKind::Node => self.install_node(job, &plan.nodes[job.id.index]),
        };

        let outcome = result.unwrap_or_else(|e| TransferOutcome::Failed {
            reason: e.to_string(),
        });

        if outcome.is_success() {
            info!(name = %name, target = %job.target.display(), outcome = %outcome, "Entry finished");
        } else {
            warn!(name = %name, target = %job.target.display(), outcome = %outcome, "Entry failed");
        }

        observer.on_finish(job.id, &outcome);
        EntryReport {
            id: job.id,
            name,
            target: job.target.clone(),
            outcome,
        }
    }

    fn transfer_model(
        &self,
        job: &Job,
        entry: &ModelEntry,
        observer: &dyn TransferObserver,
    ) -> TransferResult<TransferOutcome> {
        let target = &job.target;
        let expected = entry.expected_hash.as_deref();

        if target.exists() {
            match verify(target, expected)? {
                Verification::Unspecified => {
                    return Ok(TransferOutcome::SkippedPresent { verified: false })
                }
                Verification::Match => return Ok(TransferOutcome::SkippedPresent { verified: true }),
                Verification::Mismatch { actual } => {
                    warn!(target = %target.display(), actual = %actual, "Existing file failed verification, downloading again");
                    observer.on_message(job.id, "existing file failed verification");
                    remove_file(target)?;
                }
            }
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| TransferError::CreateDirFailed {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let staging = staging_path(target);
        let progress = |bytes: u64, total: Option<u64>| observer.on_progress(job.id, bytes, total);

        for attempt in 1..=MAX_ATTEMPTS {
            let bytes = self.strategy.fetch(&entry.url, &staging, &progress)?;

            match verify(&staging, expected)? {
                Verification::Mismatch { actual } => {
                    remove_file(&staging)?;
                    if attempt == MAX_ATTEMPTS {
                        return Ok(TransferOutcome::IntegrityFailed {
                            expected: expected.unwrap_or_default().to_string(),
                            actual,
                        });
                    }
                    warn!(url = %entry.url, actual = %actual, "Checksum mismatch, retrying download");
                    observer.on_message(job.id, "checksum mismatch, retrying");
                }
                Verification::Match | Verification::Unspecified => {
                    fs::rename(&staging, target).map_err(|e| TransferError::WriteFailed {
                        path: target.clone(),
                        source: e,
                    })?;
                    return Ok(TransferOutcome::Downloaded { bytes });
                }
            }
        }

        // MAX_ATTEMPTS >= 1, so the loop always returns.
        Err(TransferError::download(&entry.url, "no download attempt made"))
    }

    fn install_node(&self, job: &Job, entry: &NodeEntry) -> TransferResult<TransferOutcome> {
        let target = &job.target;
        if target.exists() {
            return Ok(TransferOutcome::SkippedPresent { verified: false });
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| TransferError::CreateDirFailed {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        self.cloner.clone_repo(&entry.repo_url, target)?;
        Ok(TransferOutcome::Cloned)
    }
}

/// One unit of work: an entry and the path it owns.
#[derive(Debug)]
struct Job {
    id: EntryId,
    target: PathBuf,
}

/// Path of the staging file for `target`.
pub fn staging_path(target: &Path) -> PathBuf {
    let mut path = OsString::from(target.as_os_str());
    path.push(STAGING_SUFFIX);
    PathBuf::from(path)
}

/// Group job positions by target, keeping first-seen order of lanes and of
/// jobs within a lane.
fn lanes_by_target(jobs: &[Job]) -> Vec<Vec<usize>> {
    let mut lanes: Vec<Vec<usize>> = Vec::new();
    let mut by_target: HashMap<&Path, usize> = HashMap::new();

    for (position, job) in jobs.iter().enumerate() {
        let lane = *by_target.entry(job.target.as_path()).or_insert_with(|| {
            lanes.push(Vec::new());
            lanes.len() - 1
        });
        lanes[lane].push(position);
    }
    lanes
}

fn entry_name(plan: &Plan, id: EntryId) -> String {
    let name = match id.kind {
        EntryKind::Model => plan.models.get(id.index).map(|m| m.name.clone()),
        EntryKind::Node => plan.nodes.get(id.index).map(|n| n.name.clone()),
    };
    name.unwrap_or_default()
}

fn remove_file(path: &Path) -> TransferResult<()> {
    fs::remove_file(path).map_err(|e| TransferError::RemoveFailed {
        path: path.to_path_buf(),
        source: e,
    })
}
