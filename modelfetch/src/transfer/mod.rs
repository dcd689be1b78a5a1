//! Artifact transfer: downloading models and cloning custom nodes.
//!
//! # Architecture
//!
//! ```text
//! TransferEngine
//!         │
//!         ├── TransferStrategy (trait)
//!         │       └── LayeredStrategy
//!         │               ├── CurlStrategy (external curl, when installed)
//!         │               └── HttpStrategy (built-in client, Range resume)
//!         │
//!         ├── RepositoryCloner (trait)
//!         │       └── GitCloner
//!         │
//!         ├── checksum::verify (SHA-256)
//!         │
//!         └── TransferObserver (progress events)
//! ```

mod checksum;
mod config;
mod curl;
mod engine;
mod error;
mod git;
mod http;
mod outcome;
mod progress;
mod strategy;

pub use checksum::{calculate_file_checksum, verify, Verification};
pub use config::{
    EngineConfig, DEFAULT_CONNECT_TIMEOUT, DEFAULT_ROOT, DEFAULT_STALL_TIMEOUT, DEFAULT_USER_AGENT,
};
pub use curl::CurlStrategy;
pub use engine::{staging_path, PlannedAction, PlannedStep, TransferEngine, STAGING_SUFFIX};
pub use error::{TransferError, TransferResult};
pub use git::{GitCloner, RepositoryCloner};
pub use http::{build_client, HttpStrategy};
pub use outcome::{EntryReport, TransferOutcome, TransferReport};
pub use progress::{EntryId, EntryKind, NoopObserver, TransferObserver};
pub use strategy::{LayeredStrategy, ProgressFn, TransferStrategy};
