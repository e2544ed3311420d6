use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;

fn fixture_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../fixtures/basic")
}

fn manifest() -> PathBuf {
    fixture_dir().join("manifest.json")
}

fn ccs() -> Command {
    let mut cmd = Command::cargo_bin("ccs").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

/// Copy of the fixture manifest with absolute input paths and extra top-level keys.
fn manifest_with(dir: &Path, extra: serde_json::Value) -> PathBuf {
    let text = fs::read_to_string(manifest()).unwrap();
    let mut m: serde_json::Value = serde_json::from_str(&text).unwrap();
    let base = fs::canonicalize(fixture_dir()).unwrap();
    for (_, v) in m["inputs"].as_object_mut().unwrap().iter_mut() {
        let rel = v.as_str().unwrap().to_string();
        *v = serde_json::Value::String(base.join(rel).display().to_string());
    }
    for (k, v) in extra.as_object().unwrap() {
        m[k] = v.clone();
    }
    let path = dir.join("manifest.json");
    fs::write(&path, serde_json::to_string_pretty(&m).unwrap()).unwrap();
    path
}

#[test]
fn run_writes_tables_and_prints_run_id() {
    let out = tempfile::tempdir().unwrap();
    ccs()
        .arg("--manifest")
        .arg(manifest())
        .arg("--out")
        .arg(out.path())
        .args(["--render", "json", "html", "--quiet"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("RUN:"));

    for f in ["current_credits.json", "projected_credits.json", "scenario_report.json", "run_record.json", "summary.json", "summary.html"] {
        assert!(out.path().join(f).is_file(), "missing {f}");
    }
    assert!(!out.path().join("interim").exists());

    let record: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.path().join("run_record.json")).unwrap()).unwrap();
    assert_eq!(record["projection_source"], "manifest");
    assert_eq!(record["options"]["join_policy"], "inner");
}

#[test]
fn save_interims_and_no_scenarios() {
    let out = tempfile::tempdir().unwrap();
    ccs()
        .arg("--manifest")
        .arg(manifest())
        .arg("--out")
        .arg(out.path())
        .args(["--save-interims", "--no-scenarios", "--quiet"])
        .assert()
        .success();

    assert!(out.path().join("interim/current_scores.json").is_file());
    assert!(out.path().join("interim/projected_facres.json").is_file());
    assert!(!out.path().join("scenario_report.json").exists());
    assert!(!out.path().join("interim/scenario").exists());
}

#[test]
fn validate_only_writes_nothing() {
    let out = tempfile::tempdir().unwrap();
    ccs()
        .arg("--manifest")
        .arg(manifest())
        .arg("--out")
        .arg(out.path())
        .arg("--validate-only")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
    assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
}

#[test]
fn missing_manifest_exits_2() {
    ccs()
        .args(["--manifest", "no/such/manifest.json", "--quiet"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("file not found"));
}

#[test]
fn digest_mismatch_exits_3() {
    let dir = tempfile::tempdir().unwrap();
    let m = manifest_with(dir.path(), serde_json::json!({ "inputs_sha256": { "map_units": "0".repeat(64) } }));
    ccs()
        .arg("--manifest")
        .arg(&m)
        .arg("--validate-only")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("sha256 mismatch for map_units"));
}

#[test]
fn unknown_manifest_key_exits_2() {
    let dir = tempfile::tempdir().unwrap();
    let m = manifest_with(dir.path(), serde_json::json!({ "seed": 7 }));
    ccs().arg("--manifest").arg(&m).arg("--validate-only").assert().code(2);
}

#[test]
fn strict_join_exits_5_naming_the_map_unit() {
    let out = tempfile::tempdir().unwrap();
    ccs()
        .arg("--manifest")
        .arg(manifest())
        .arg("--out")
        .arg(out.path())
        .args(["--join-policy", "strict", "--quiet"])
        .assert()
        .code(5)
        .stderr(predicate::str::contains("103"));
}

#[test]
fn projected_values_override_is_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let pv = dir.path().join("pv.json");
    fs::write(&pv, r#"[{"map_unit_id": "103", "hab_attr": "w_sage_cover", "attr_value": 0.3}]"#).unwrap();
    let out = dir.path().join("out");
    ccs()
        .arg("--manifest")
        .arg(manifest())
        .arg("--projected-values")
        .arg(&pv)
        .arg("--out")
        .arg(&out)
        .arg("--quiet")
        .assert()
        .success();

    let record: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("run_record.json")).unwrap()).unwrap();
    assert_eq!(record["projection_source"], "override");
    let projected: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("projected_credits.json")).unwrap()).unwrap();
    assert_eq!(projected.as_array().unwrap().len(), 1);
    assert_eq!(projected[0]["map_unit_id"], "103");
}
