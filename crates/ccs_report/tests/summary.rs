use std::path::{Path, PathBuf};

use approx::assert_relative_eq;
use ccs_core::HabitatType;
use ccs_pipeline::run_from_manifest_path;
use ccs_report::{build_summary, render_html, render_json};

fn manifest() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../fixtures/basic/manifest.json")
}

#[test]
fn summary_matches_the_output_tables() {
    let out = run_from_manifest_path(manifest()).unwrap();
    let s = build_summary(&out).unwrap();

    assert_eq!(s.project.as_deref(), Some("basic"));
    assert_eq!(s.integrity.run_id, out.run_record.id);
    assert_eq!(s.current.map_units, 3);
    assert_eq!(s.projected.map_units, 2);

    let saleable: f64 = out.current_credits.iter().map(|c| c.saleable_credits).sum();
    assert_relative_eq!(s.current.saleable_credits, saleable, epsilon = 1e-9);
    assert_relative_eq!(
        s.current.saleable_credits,
        s.current.credits - s.current.reserve_credits,
        epsilon = 1e-9
    );

    let counted: usize = s.habitat_types.iter().map(|h| h.current).sum();
    assert_eq!(counted, 3);
    assert_eq!(s.habitat_types.len(), HabitatType::ALL.len());

    let keys: Vec<&str> = s.scenarios.iter().map(|t| t.key.as_str()).collect();
    assert_eq!(keys.first(), Some(&"brotec_low"));
    assert_eq!(keys.last(), Some(&"conifer"));
    assert_eq!(keys.len(), 10);
}

#[test]
fn json_rendering_keeps_section_order() {
    let out = run_from_manifest_path(manifest()).unwrap();
    let text = render_json(&build_summary(&out).unwrap()).unwrap();
    assert!(text.ends_with('\n'));
    let v: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(v["current"]["map_units"], 3);
    assert!(text.find("\"current\"").unwrap() < text.find("\"projected\"").unwrap());
}

#[test]
fn html_rendering_is_escaped_and_complete() {
    let out = run_from_manifest_path(manifest()).unwrap();
    let mut s = build_summary(&out).unwrap();
    s.project = Some("<north>".into());
    let html = render_html(&s).unwrap();
    assert!(html.starts_with("<!doctype html>"));
    assert!(html.contains("&lt;north&gt;"));
    assert!(html.contains("Late Brood-Rearing"));
    assert!(html.contains("conifer"));
    assert!(html.contains(&out.run_record.id));
}

#[test]
fn html_integrity_section_names_engine_and_run() {
    let out = run_from_manifest_path(manifest()).unwrap();
    let s = build_summary(&out).unwrap();
    let html = render_html(&s).unwrap();
    let engine = format!("<p>Engine: {} v{}</p>", s.integrity.engine_name, s.integrity.engine_version);
    assert!(html.contains(&engine), "{html}");
    assert!(html.contains(&format!("<p>Run: {}</p>", s.integrity.run_id)));
}
