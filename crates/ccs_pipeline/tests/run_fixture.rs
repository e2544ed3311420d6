//! End-to-end pipeline runs over `fixtures/basic`.

use std::fs;
use std::path::{Path, PathBuf};

use ccs_core::{HabitatType, JoinPolicy};
use ccs_io::loader::{load_project, load_projected_values};
use ccs_pipeline::{run_from_manifest_path, run_project, write_outputs, PipelineCtx, PipelineError, ProjectedOverride, ProjectionSource};

fn manifest() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../fixtures/basic/manifest.json")
}

#[test]
fn fixture_run_satisfies_the_credit_laws() {
    let out = run_from_manifest_path(manifest()).unwrap();
    assert_eq!(out.current_credits.len(), 3);
    for c in out.current_credits.iter().chain(&out.projected_credits) {
        assert_eq!(c.saleable_credits, c.credits - c.reserve_credits);
        let max = c.breed_credits.max(c.summer_credits).max(c.winter_credits);
        assert_eq!(c.credits, max);
        assert_eq!(c.habitat_type == HabitatType::None, c.credits == 0.0);
    }
    for (b, s) in out.intermediates.baseline_scores.iter().zip(&out.intermediates.current_scores) {
        assert!(b.breed <= s.breed && b.summer <= s.summer && b.winter <= s.winter);
    }
}

#[test]
fn unit_without_projection_is_dropped_under_inner_join() {
    let out = run_from_manifest_path(manifest()).unwrap();
    let ids: Vec<&str> = out.projected_credits.iter().map(|c| c.map_unit_id.as_str()).collect();
    assert_eq!(ids, ["101", "102"]);
    // scenario branches cover every unit
    assert_eq!(out.scenario_report().unwrap().rows.len(), 3);
}

#[test]
fn strict_join_rejects_the_missing_projection() {
    let mut ctx = PipelineCtx::new(load_project(&manifest()).unwrap());
    ctx.options.join_policy = JoinPolicy::Strict;
    match run_project(&ctx) {
        Err(PipelineError::Calc(e)) => assert_eq!(e.map_unit().map(|m| m.as_str()), Some("103")),
        other => panic!("expected a join failure, got {other:?}"),
    }
}

#[test]
fn override_is_recorded_in_the_run_record() {
    let dir = tempfile::tempdir().unwrap();
    let pv = dir.path().join("pv.json");
    fs::write(
        &pv,
        r#"[{"map_unit_id": "103", "hab_attr": "b_sage_cover", "attr_value": 0.25}]"#,
    )
    .unwrap();
    let (rows, sha256) = load_projected_values(&pv).unwrap();

    let mut ctx = PipelineCtx::new(load_project(&manifest()).unwrap());
    ctx.projected_override = Some(ProjectedOverride { rows, sha256: sha256.clone() });
    let out = run_project(&ctx).unwrap();
    assert_eq!(out.projected_credits.len(), 1);
    assert_eq!(out.run_record.projection_source, ProjectionSource::Override);
    assert_eq!(out.run_record.inputs["projected_values"], sha256);
}

#[test]
fn reruns_write_identical_bytes() {
    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();
    let first = run_from_manifest_path(manifest()).unwrap();
    let second = run_from_manifest_path(manifest()).unwrap();
    assert_eq!(first.run_record.id, second.run_record.id);

    let files = write_outputs(a.path(), &first, true).unwrap();
    write_outputs(b.path(), &second, true).unwrap();
    assert!(files.iter().any(|f| f.name == "interim/scenario/conifer.json"));
    for f in &files {
        let other = b.path().join(&f.name);
        assert_eq!(fs::read(&f.path).unwrap(), fs::read(other).unwrap(), "{} differs", f.name);
    }

    let text = fs::read_to_string(a.path().join("current_credits.json")).unwrap();
    let first_key = text.find("map_unit_id").unwrap();
    assert!(first_key < text.find("saleable_credits").unwrap());
}
