//! End-to-end tests: manifests on disk, artifacts from a mock HTTP server,
//! installs into a temporary root.
//!
//! The external curl strategy is disabled so every transfer goes through the
//! built-in HTTP client and hits the mock server.
//!
//! Run with: `cargo test --test install_integration`

use std::fs;
use std::path::{Path, PathBuf};

use httpmock::prelude::*;
use tempfile::TempDir;

use modelfetch::manifest::{ManifestFetcher, ManifestMerger, ManifestSource};
use modelfetch::plan::{FilterConfig, Plan};
use modelfetch::transfer::{
    build_client, staging_path, EngineConfig, NoopObserver, TransferEngine, TransferOutcome,
    TransferReport,
};

// ============================================================================
// Helper Functions
// ============================================================================

const WEIGHTS: &str = "model weights";
const WEIGHTS_SHA256: &str = "a2d42c4aa884e21216cbb8da4c7ba2fcf9b6033b2331666e666145c24caf7a38";
const DIGITS_SHA256: &str = "84d89877f0d4041efb6bf91a16f0248f2fd573e6af05c19f96bedb9f882f7882";

struct Fixture {
    work: TempDir,
    root: TempDir,
    config: EngineConfig,
}

impl Fixture {
    fn new() -> Self {
        let work = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        let config = EngineConfig::new(root.path()).with_curl(false);
        Self { work, root, config }
    }

    fn manifest(&self, name: &str, body: &str) -> ManifestSource {
        let path = self.work.path().join(name);
        fs::write(&path, body).unwrap();
        ManifestSource::Local(path)
    }

    fn load(&self, sources: &[ManifestSource]) -> Plan {
        let client = build_client(&self.config).unwrap();
        let fetcher = ManifestFetcher::new(client, self.config.manifest_timeout);
        ManifestMerger::load(&fetcher, sources)
    }

    fn install(&self, plan: &Plan) -> TransferReport {
        let client = build_client(&self.config).unwrap();
        TransferEngine::new(&self.config, client).run(plan, &NoopObserver)
    }

    fn path(&self, relative: &str) -> PathBuf {
        self.root.path().join(relative)
    }
}

fn model_manifest(models: &[String]) -> String {
    format!(r#"{{"models": [{}]}}"#, models.join(","))
}

fn model(name: &str, url: &str, sha256: Option<&str>) -> String {
    match sha256 {
        Some(hash) => format!(
            r#"{{"name": "{}", "type": "checkpoint", "url": "{}", "sha256": "{}"}}"#,
            name, url, hash
        ),
        None => format!(r#"{{"name": "{}", "type": "checkpoint", "url": "{}"}}"#, name, url),
    }
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}

// ============================================================================
// Transfers
// ============================================================================

#[test]
fn test_reachable_and_unreachable_entries() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/ok.safetensors");
        then.status(200).body(WEIGHTS);
    });
    server.mock(|when, then| {
        when.method(GET).path("/gone.safetensors");
        then.status(404);
    });

    let fixture = Fixture::new();
    let source = fixture.manifest(
        "m.json",
        &model_manifest(&[
            model("Gone", &server.url("/gone.safetensors"), None),
            model("Ok", &server.url("/ok.safetensors"), Some(WEIGHTS_SHA256)),
        ]),
    );

    let report = fixture.install(&fixture.load(&[source]));

    assert!(!report.all_succeeded());
    assert_eq!(report.failed(), 1);
    assert_eq!(report.installed(), 1);
    assert!(matches!(report.entries[0].outcome, TransferOutcome::Failed { .. }));
    assert!(matches!(report.entries[1].outcome, TransferOutcome::Downloaded { .. }));

    assert_eq!(read(&fixture.path("models/checkpoints/ok.safetensors")), WEIGHTS);
    assert!(!fixture.path("models/checkpoints/gone.safetensors").exists());
}

#[test]
fn test_interrupted_download_resumes() {
    let server = MockServer::start();
    let tail = server.mock(|when, then| {
        when.method(GET)
            .path("/digits.bin")
            .header("range", "bytes=5-");
        then.status(206)
            .header("content-range", "bytes 5-9/10")
            .body("56789");
    });

    let fixture = Fixture::new();
    let source = fixture.manifest(
        "m.json",
        &model_manifest(&[model("Digits", &server.url("/digits.bin"), Some(DIGITS_SHA256))]),
    );

    let target = fixture.path("models/checkpoints/digits.bin");
    fs::create_dir_all(target.parent().unwrap()).unwrap();
    fs::write(staging_path(&target), "01234").unwrap();

    let report = fixture.install(&fixture.load(&[source]));

    tail.assert_hits(1);
    assert!(report.all_succeeded());
    assert_eq!(read(&target), "0123456789");
    assert!(!staging_path(&target).exists());
}

#[test]
fn test_checksum_mismatch_is_retried_once() {
    let server = MockServer::start();
    let artifact = server.mock(|when, then| {
        when.method(GET).path("/bad.safetensors");
        then.status(200).body("corrupt");
    });

    let fixture = Fixture::new();
    let source = fixture.manifest(
        "m.json",
        &model_manifest(&[model("Bad", &server.url("/bad.safetensors"), Some(WEIGHTS_SHA256))]),
    );

    let report = fixture.install(&fixture.load(&[source]));

    artifact.assert_hits(2);
    match &report.entries[0].outcome {
        TransferOutcome::IntegrityFailed { expected, .. } => assert_eq!(expected, WEIGHTS_SHA256),
        other => panic!("expected IntegrityFailed, got {:?}", other),
    }
    let target = fixture.path("models/checkpoints/bad.safetensors");
    assert!(!target.exists());
    assert!(!staging_path(&target).exists());
}

#[test]
fn test_present_file_without_hash_is_not_fetched() {
    let server = MockServer::start();
    let artifact = server.mock(|when, then| {
        when.method(GET).path("/present.safetensors");
        then.status(200).body("newer");
    });

    let fixture = Fixture::new();
    let source = fixture.manifest(
        "m.json",
        &model_manifest(&[model("Present", &server.url("/present.safetensors"), None)]),
    );

    let target = fixture.path("models/checkpoints/present.safetensors");
    fs::create_dir_all(target.parent().unwrap()).unwrap();
    fs::write(&target, "original").unwrap();

    let report = fixture.install(&fixture.load(&[source]));

    artifact.assert_hits(0);
    assert_eq!(
        report.entries[0].outcome,
        TransferOutcome::SkippedPresent { verified: false }
    );
    assert_eq!(read(&target), "original");
}

#[test]
fn test_empty_hash_never_verifies() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/w.safetensors");
        then.status(200).body(WEIGHTS);
    });

    let fixture = Fixture::new();
    let source = fixture.manifest(
        "m.json",
        &model_manifest(&[model("Empty", &server.url("/w.safetensors"), Some(""))]),
    );

    let report = fixture.install(&fixture.load(&[source]));

    assert!(matches!(
        report.entries[0].outcome,
        TransferOutcome::IntegrityFailed { .. }
    ));
    assert!(!report.all_succeeded());
}

#[test]
fn test_second_run_is_idempotent() {
    let server = MockServer::start();
    let artifact = server.mock(|when, then| {
        when.method(GET).path("/w.safetensors");
        then.status(200).body(WEIGHTS);
    });

    let fixture = Fixture::new();
    let source = fixture.manifest(
        "m.json",
        &model_manifest(&[model("W", &server.url("/w.safetensors"), Some(WEIGHTS_SHA256))]),
    );
    let plan = fixture.load(&[source]);

    assert_eq!(fixture.install(&plan).installed(), 1);
    let second = fixture.install(&plan);

    artifact.assert_hits(1);
    assert_eq!(
        second.entries[0].outcome,
        TransferOutcome::SkippedPresent { verified: true }
    );
}

// ============================================================================
// Merging and filtering
// ============================================================================

#[test]
fn test_same_manifest_twice_is_deduplicated() {
    let fixture = Fixture::new();
    let body = r#"{
        "models": [
            {"type": "lora", "url": "https://h.invalid/a.safetensors"},
            {"type": "vae", "url": "https://h.invalid/b.safetensors"}
        ],
        "custom_nodes": [{"repo": "https://h.invalid/acme/nodes"}]
    }"#;
    let source = fixture.manifest("m.json", body);

    let plan = fixture.load(&[source.clone(), source]);

    assert_eq!(plan.models.len(), 2);
    assert_eq!(plan.nodes.len(), 1);
    assert_eq!(plan.duplicate_count(), 3);
    assert_eq!(plan.sources[1].models_added, 0);
}

#[test]
fn test_identity_ignores_case() {
    let fixture = Fixture::new();
    let first = fixture.manifest(
        "first.json",
        r#"{"models": [{"name": "First", "url": "https://H.invalid/Model.safetensors"}]}"#,
    );
    let second = fixture.manifest(
        "second.json",
        r#"{"models": [{"name": "Second", "url": "https://h.invalid/model.safetensors"}]}"#,
    );

    let plan = fixture.load(&[first, second]);

    assert_eq!(plan.models.len(), 1);
    assert_eq!(plan.models[0].name, "First");
    assert_eq!(plan.model_duplicate_count(), 1);
}

#[test]
fn test_unreadable_source_does_not_block_others() {
    let fixture = Fixture::new();
    let good = fixture.manifest(
        "good.json",
        r#"{"models": [{"url": "https://h.invalid/a.safetensors"}]}"#,
    );
    let missing = ManifestSource::Local(fixture.work.path().join("missing.json"));

    let plan = fixture.load(&[missing, good]);

    assert_eq!(plan.models.len(), 1);
    assert_eq!(plan.failed_sources().count(), 1);
    assert_eq!(
        plan.model_source(0),
        Some(&ManifestSource::Local(fixture.work.path().join("good.json")))
    );
}

#[test]
fn test_filter_then_install_only_selected_types() {
    let server = MockServer::start();
    let lora = server.mock(|when, then| {
        when.method(GET).path("/style.safetensors");
        then.status(200).body("lora");
    });
    let vae = server.mock(|when, then| {
        when.method(GET).path("/vae.safetensors");
        then.status(200).body("vae");
    });

    let fixture = Fixture::new();
    let source = fixture.manifest(
        "m.json",
        &format!(
            r#"{{
                "models": [
                    {{"type": "lora", "url": "{}"}},
                    {{"type": "vae", "url": "{}"}}
                ],
                "custom_nodes": [{{"repo": "https://h.invalid/acme/nodes"}}]
            }}"#,
            server.url("/style.safetensors"),
            server.url("/vae.safetensors")
        ),
    );

    let types = ["lora".to_string()].into_iter().collect();
    let filter = FilterConfig::new(Some(types), true, false).unwrap();
    let plan = fixture.load(&[source]).filter(&filter);
    let report = fixture.install(&plan);

    assert!(report.all_succeeded());
    assert_eq!(report.entries.len(), 1);
    lora.assert_hits(1);
    vae.assert_hits(0);
    assert_eq!(read(&fixture.path("models/loras/style.safetensors")), "lora");
    assert!(!fixture.path("custom_nodes").exists());
}
