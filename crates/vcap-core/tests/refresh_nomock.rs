//! No-mock refresh tests against real capability dumps on disk.
//!
//! The fixture directory mirrors what a node-labeller sidecar writes:
//! `virsh_domcapabilities.xml` plus one `cpu_model_<name>.xml` per model.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use vcap_config::UnavailableFeatures;
use vcap_core::{
    refresh, AggregateOptions, CapabilityAggregator, DirectorySource, RefreshError,
    SnapshotStore,
};

fn fixture_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/node")
}

/// Copy the fixture node into a scratch directory that tests may mutate.
fn scratch_node() -> TempDir {
    let dir = TempDir::new().expect("tempdir");
    for entry in fs::read_dir(fixture_dir()).expect("fixture dir") {
        let entry = entry.expect("dir entry");
        fs::copy(entry.path(), dir.path().join(entry.file_name())).expect("copy fixture");
    }
    dir
}

fn default_aggregator() -> CapabilityAggregator {
    CapabilityAggregator::default()
}

#[test]
fn fixture_node_produces_expected_snapshot() {
    let source = DirectorySource::new(fixture_dir());
    let report = refresh(&source, &default_aggregator()).expect("refresh");

    assert_eq!(report.candidates, vec!["Haswell", "Skylake-Client"]);
    assert!(report.failures.is_empty());
    assert!(!report.is_degraded());

    let snapshot = &report.snapshot;
    let names: Vec<&str> = snapshot.model_names().collect();
    assert_eq!(names, vec!["Haswell", "Skylake-Client"]);

    let haswell = snapshot.model("Haswell").expect("Haswell present");
    assert_eq!(haswell.get("vmx"), Some(true));
    assert_eq!(haswell.get("mpx"), Some(true));
    assert_eq!(haswell.get("hle"), Some(false));

    let skylake = snapshot.model("Skylake-Client").expect("Skylake present");
    assert_eq!(skylake.get("pcid"), Some(true));
    assert_eq!(skylake.get("mpx"), Some(false));
    assert_eq!(skylake.get("sse4.2"), Some(true));

    assert_eq!(snapshot.supported_features(), &["vmx", "avx2", "pcid"]);
}

#[test]
fn unusable_and_unknown_models_never_appear() {
    let source = DirectorySource::new(fixture_dir());
    let report = refresh(&source, &default_aggregator()).expect("refresh");

    assert!(report.snapshot.model("EPYC").is_none());
    assert!(report.snapshot.model("Westmere").is_none());
    assert!(report.snapshot.model("Skylake-Client-IBRS").is_none());

    // Every mode's models are still visible on the parsed document.
    assert_eq!(report.capabilities.models().count(), 5);
}

#[test]
fn refresh_is_deterministic() {
    let source = DirectorySource::new(fixture_dir());
    let first = refresh(&source, &default_aggregator()).expect("first");
    let second = refresh(&source, &default_aggregator()).expect("second");

    assert_eq!(first.snapshot, second.snapshot);
    assert_eq!(first.snapshot.fingerprint(), second.snapshot.fingerprint());
}

#[test]
fn snapshot_serializes_with_camel_case_keys() {
    let source = DirectorySource::new(fixture_dir());
    let report = refresh(&source, &default_aggregator()).expect("refresh");

    let json = serde_json::to_value(&report.snapshot).expect("serialize");
    assert_eq!(json["models"]["Haswell"]["hle"], serde_json::json!(false));
    assert_eq!(
        json["supportedFeatures"],
        serde_json::json!(["vmx", "avx2", "pcid"])
    );
    assert!(json.get("degradedModels").is_none());
}

#[test]
fn missing_feature_file_degrades_only_that_model() {
    let node = scratch_node();
    fs::remove_file(node.path().join("cpu_model_Skylake-Client.xml")).expect("remove");

    let source = DirectorySource::new(node.path());
    let report = refresh(&source, &default_aggregator()).expect("refresh");

    assert!(report.is_degraded());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].model, "Skylake-Client");

    let snapshot = &report.snapshot;
    assert!(snapshot.model("Haswell").is_some());
    assert!(snapshot.model("Skylake-Client").is_none());
    assert_eq!(snapshot.degraded_models(), &["Skylake-Client"]);
    assert_eq!(snapshot.supported_features(), &["vmx", "avx2", "pcid"]);
}

#[test]
fn malformed_feature_file_kept_empty_clears_baseline() {
    let node = scratch_node();
    fs::write(
        node.path().join("cpu_model_Haswell.xml"),
        "<cpu><feature policy='require' name='vmx'>",
    )
    .expect("write");

    let aggregator = CapabilityAggregator::new(AggregateOptions {
        unavailable: UnavailableFeatures::Empty,
        ignored_models: Vec::new(),
    });
    let report = refresh(&DirectorySource::new(node.path()), &aggregator).expect("refresh");

    let haswell = report.snapshot.model("Haswell").expect("kept with empty map");
    assert!(haswell.is_empty());
    assert!(report.snapshot.model("Skylake-Client").is_some());
    assert!(report.snapshot.supported_features().is_empty());
    assert_eq!(report.snapshot.degraded_models(), &["Haswell"]);
}

#[test]
fn ignored_models_are_dropped_before_aggregation() {
    let aggregator = CapabilityAggregator::new(AggregateOptions {
        unavailable: UnavailableFeatures::Exclude,
        ignored_models: vec!["Skylake-Client".to_string()],
    });
    let report =
        refresh(&DirectorySource::new(fixture_dir()), &aggregator).expect("refresh");

    assert_eq!(report.candidates, vec!["Haswell"]);
    assert_eq!(
        report.snapshot.supported_features(),
        &["vmx", "avx2", "pcid"]
    );
    assert!(report.snapshot.model("Skylake-Client").is_none());
}

#[test]
fn missing_capability_document_aborts_refresh() {
    let empty = TempDir::new().expect("tempdir");
    let err = refresh(&DirectorySource::new(empty.path()), &default_aggregator())
        .expect_err("no capability document");

    assert!(matches!(err, RefreshError::Source(_)));
    let common: vcap_common::Error = err.into();
    assert_eq!(common.code(), 20);
}

#[test]
fn malformed_capability_document_aborts_refresh() {
    let node = scratch_node();
    fs::write(
        node.path().join("virsh_domcapabilities.xml"),
        "<domainCapabilities><cpu><mode name='custom'>",
    )
    .expect("write");

    let err = refresh(&DirectorySource::new(node.path()), &default_aggregator())
        .expect_err("malformed");
    assert!(matches!(err, RefreshError::Parse { .. }));
}

#[test]
fn bad_host_model_feature_does_not_abort_refresh() {
    let node = scratch_node();
    let path = node.path().join("virsh_domcapabilities.xml");
    let caps = fs::read_to_string(&path).expect("read fixture");
    let caps = caps.replace(
        "<feature policy='require' name='ss'/>",
        "<feature policy='sometimes' name='ss'/>",
    );
    fs::write(&path, caps).expect("write");

    let report =
        refresh(&DirectorySource::new(node.path()), &default_aggregator()).expect("refresh");
    assert_eq!(report.candidates, vec!["Haswell", "Skylake-Client"]);
    assert!(!report.is_degraded());
}

#[test]
fn capability_document_without_usable_models_yields_empty_snapshot() {
    let node = scratch_node();
    fs::write(
        node.path().join("virsh_domcapabilities.xml"),
        "<domainCapabilities><cpu><mode name='custom' supported='yes'>\
         <model usable='no'>Haswell</model></mode></cpu></domainCapabilities>",
    )
    .expect("write");

    let report =
        refresh(&DirectorySource::new(node.path()), &default_aggregator()).expect("refresh");
    assert!(report.snapshot.is_empty());
    assert!(report.snapshot.supported_features().is_empty());
    assert!(report.candidates.is_empty());
}

#[test]
fn store_keeps_previous_snapshot_when_documents_break() {
    let node = scratch_node();
    let source = DirectorySource::new(node.path());
    let store = SnapshotStore::new();

    store
        .refresh_from(&source, &default_aggregator())
        .expect("first refresh");
    let before = store.load().expect("published");
    assert_eq!(store.generation(), 1);

    fs::write(node.path().join("virsh_domcapabilities.xml"), "not xml <").expect("write");
    assert!(store.refresh_from(&source, &default_aggregator()).is_err());

    let after = store.load().expect("still published");
    assert_eq!(store.generation(), 1);
    assert_eq!(before.fingerprint(), after.fingerprint());
}
