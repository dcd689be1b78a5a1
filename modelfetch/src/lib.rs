//! modelfetch - manifest-driven model and custom node installer
//!
//! This library reads one or more JSON manifests describing model artifacts
//! and git-hosted custom node repositories, merges them into a deduplicated
//! [`plan::Plan`], and installs that plan into a destination root with
//! resumable, integrity-checked transfers.
//!
//! ```text
//! sources ─▶ manifest::ManifestMerger ─▶ plan::Plan ─▶ Plan::filter ─▶ transfer::TransferEngine
//! ```
//!
//! # Example
//!
//! ```ignore
//! use modelfetch::manifest::{ManifestFetcher, ManifestMerger, ManifestSource};
//! use modelfetch::plan::FilterConfig;
//! use modelfetch::transfer::{build_client, EngineConfig, NoopObserver, TransferEngine};
//!
//! let config = EngineConfig::new("/app/ComfyUI");
//! let client = build_client(&config)?;
//! let fetcher = ManifestFetcher::new(client.clone(), config.manifest_timeout);
//!
//! let sources = vec![ManifestSource::parse("https://example.com/sdxl.json")];
//! let plan = ManifestMerger::load(&fetcher, &sources).filter(&FilterConfig::default());
//!
//! let report = TransferEngine::new(&config, client).run(&plan, &NoopObserver);
//! assert!(report.all_succeeded());
//! ```

pub mod config;
pub mod logging;
pub mod manifest;
pub mod plan;
pub mod transfer;
