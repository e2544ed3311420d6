//! Loader: manifest → input tables → digest check → ingestion validation.
//! Returns a typed, map-unit-ordered `ProjectInputs` for the pipeline.
//! No network I/O.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use ccs_core::determinism::{sort_by_map_unit, Keyed};
use ccs_core::entities::{
    AttributeRow, CurveLookup, MapUnit, ProjectInputs, ProjectedValue, ScoringCurves,
};
use ccs_core::{Attribute, MapUnitId, FRACTION_SUM_TOLERANCE};
use serde::de::DeserializeOwned;

use crate::hasher::sha256_hex;
use crate::manifest::{load_and_resolve_manifest, InputTable, ManifestError, ResolvedManifest};
use crate::{IoError, IoResult, Violation, Violations};

/// Inputs larger than this are refused.
const MAX_TABLE_BYTES: u64 = 256 * 1024 * 1024;

/// Loaded, verified and validated project.
#[derive(Debug, Clone)]
pub struct LoadedProject {
    pub manifest: ResolvedManifest,
    pub inputs: ProjectInputs,
    /// sha256 of each raw input file that was read.
    pub input_digests: BTreeMap<InputTable, String>,
}

/// Load everything named by a manifest file.
pub fn load_project(manifest_path: &Path) -> IoResult<LoadedProject> {
    let manifest = load_and_resolve_manifest(manifest_path)?;
    let mut digests = BTreeMap::new();

    let mut read = |table: InputTable| -> IoResult<Option<Vec<u8>>> {
        let Some(path) = manifest.path(table) else { return Ok(None) };
        let bytes = read_bytes(path)?;
        let got = sha256_hex(&bytes);
        if let Some(expected) = manifest.digests.get(&table) {
            if *expected != got {
                return Err(ManifestError::DigestMismatch { table, expected: expected.clone(), got }.into());
            }
        }
        digests.insert(table, got);
        Ok(Some(bytes))
    };

    let mut inputs = ProjectInputs {
        map_units: parse_required(&mut read, InputTable::MapUnits)?,
        site_scale_values: parse_required(&mut read, InputTable::SiteScaleValues)?,
        curves: parse_required::<ScoringCurves>(&mut read, InputTable::ScoringCurves)?,
        curve_lookup: parse_optional::<CurveLookup>(&mut read, InputTable::CurveLookup)?.unwrap_or_default(),
        scoring_weights: parse_required(&mut read, InputTable::ScoringWeights)?,
        current_ls: parse_required(&mut read, InputTable::CurrentLs)?,
        projected_ls: parse_required(&mut read, InputTable::ProjectedLs)?,
        standard_baseline: parse_required(&mut read, InputTable::StandardBaseline)?,
        reserve_account: parse_required(&mut read, InputTable::ReserveAccount)?,
        credit_policy: parse_required(&mut read, InputTable::CreditPolicy)?,
        projected_values: parse_optional(&mut read, InputTable::ProjectedValues)?.unwrap_or_default(),
    };

    validate_inputs(&inputs).map_err(IoError::Validation)?;
    normalize(&mut inputs);

    tracing::info!(
        project = manifest.id.as_deref().unwrap_or("-"),
        map_units = inputs.map_units.len(),
        projected_values = inputs.projected_values.len(),
        "loaded project"
    );
    Ok(LoadedProject { manifest, inputs, input_digests: digests })
}

/// Load an externally supplied tidy projected-values table. Returns rows and the raw digest.
pub fn load_projected_values(path: &Path) -> IoResult<(Vec<ProjectedValue>, String)> {
    let bytes = read_bytes(path)?;
    let digest = sha256_hex(&bytes);
    let mut rows: Vec<ProjectedValue> = parse_bytes(&bytes, InputTable::ProjectedValues)?;
    sort_by_map_unit(&mut rows);
    Ok((rows, digest))
}

fn read_bytes(path: &Path) -> IoResult<Vec<u8>> {
    let md = fs::metadata(path).map_err(|e| IoError::Path(format!("{}: {e}", path.display())))?;
    if md.len() > MAX_TABLE_BYTES {
        return Err(IoError::Path(format!("{}: file exceeds {MAX_TABLE_BYTES} bytes", path.display())));
    }
    fs::read(path).map_err(|e| IoError::Path(format!("{}: {e}", path.display())))
}

fn parse_bytes<T: DeserializeOwned>(bytes: &[u8], table: InputTable) -> IoResult<T> {
    serde_json::from_slice(bytes).map_err(|e| IoError::Json { table: table.to_string(), msg: e.to_string() })
}

fn parse_optional<T: DeserializeOwned>(
    read: &mut impl FnMut(InputTable) -> IoResult<Option<Vec<u8>>>,
    table: InputTable,
) -> IoResult<Option<T>> {
    read(table)?.map(|b| parse_bytes(&b, table)).transpose()
}

fn parse_required<T: DeserializeOwned>(
    read: &mut impl FnMut(InputTable) -> IoResult<Option<Vec<u8>>>,
    table: InputTable,
) -> IoResult<T> {
    parse_optional(read, table)?.ok_or_else(|| ManifestError::Missing(table).into())
}

/// Order every keyed table by map unit.
fn normalize(inputs: &mut ProjectInputs) {
    sort_by_map_unit(&mut inputs.map_units);
    sort_by_map_unit(&mut inputs.site_scale_values);
    sort_by_map_unit(&mut inputs.current_ls);
    sort_by_map_unit(&mut inputs.projected_ls);
    sort_by_map_unit(&mut inputs.reserve_account);
    inputs.standard_baseline.sort_by(|a, b| (&a.map_unit_id, a.season).cmp(&(&b.map_unit_id, b.season)));
    sort_by_map_unit(&mut inputs.projected_values);
}

// ----------------------------- Ingestion validation -----------------------------

#[derive(Default)]
struct Checker {
    found: Vec<Violation>,
}

impl Checker {
    fn push(&mut self, table: InputTable, id: Option<&MapUnitId>, field: &str, message: String) {
        self.found.push(Violation {
            table: table.as_str(),
            map_unit: id.map(|i| i.to_string()),
            field: field.to_owned(),
            message,
        });
    }

    fn range(&mut self, table: InputTable, id: &MapUnitId, field: &str, v: f64, lo: f64, hi: f64) {
        if !(lo..=hi).contains(&v) {
            self.push(table, Some(id), field, format!("{v} outside [{lo}, {hi}]"));
        }
    }

    fn non_negative(&mut self, table: InputTable, id: &MapUnitId, field: &str, v: f64) {
        if !(v >= 0.0) {
            self.push(table, Some(id), field, format!("{v} must be >= 0"));
        }
    }

    fn unique<T: Keyed>(&mut self, table: InputTable, rows: &[T]) {
        let mut seen = BTreeSet::new();
        for r in rows {
            if !seen.insert(r.map_unit_id()) {
                self.push(table, Some(r.map_unit_id()), "map_unit_id", "duplicate map unit".into());
            }
        }
    }
}

/// Domain checks on every input table; reports all violations at once.
pub fn validate_inputs(inputs: &ProjectInputs) -> Result<(), Violations> {
    let mut c = Checker::default();

    c.unique(InputTable::MapUnits, &inputs.map_units);
    for u in &inputs.map_units {
        check_map_unit(&mut c, u);
    }

    c.unique(InputTable::SiteScaleValues, &inputs.site_scale_values);
    for r in &inputs.site_scale_values {
        check_attributes(&mut c, r);
    }

    for (table, rows) in [(InputTable::CurrentLs, &inputs.current_ls), (InputTable::ProjectedLs, &inputs.projected_ls)] {
        c.unique(table, rows);
        for r in rows {
            c.range(table, &r.map_unit_id, "ls_breed", r.ls_breed, 0.0, 1.0);
            c.range(table, &r.map_unit_id, "ls_summer", r.ls_summer, 0.0, 1.0);
            c.range(table, &r.map_unit_id, "ls_winter", r.ls_winter, 0.0, 1.0);
        }
    }

    c.unique(InputTable::ReserveAccount, &inputs.reserve_account);
    for r in &inputs.reserve_account {
        c.range(InputTable::ReserveAccount, &r.map_unit_id, "total_contribution", r.total_contribution, 0.0, 1.0);
    }

    for r in &inputs.standard_baseline {
        c.non_negative(InputTable::StandardBaseline, &r.map_unit_id, r.season.as_str(), r.value);
    }

    let policy = &inputs.credit_policy;
    if !(policy.meadow_multiplier >= 0.0) {
        c.push(InputTable::CreditPolicy, None, "meadow_multiplier", format!("{} must be >= 0", policy.meadow_multiplier));
    }
    for (cat, m) in &policy.mgmt_multipliers {
        if !(*m >= 0.0) {
            c.push(InputTable::CreditPolicy, None, cat.as_str(), format!("{m} must be >= 0"));
        }
    }

    if c.found.is_empty() {
        Ok(())
    } else {
        tracing::warn!(violations = c.found.len(), "ingestion validation failed");
        Err(Violations(c.found))
    }
}

fn check_map_unit(c: &mut Checker, u: &MapUnit) {
    let t = InputTable::MapUnits;
    let id = &u.map_unit_id;
    c.non_negative(t, id, "map_unit_area", u.map_unit_area);
    c.range(t, id, "phma", u.phma, 0.0, 1.0);
    c.range(t, id, "ghma", u.ghma, 0.0, 1.0);
    c.range(t, id, "ohma", u.ohma, 0.0, 1.0);
    let sum = u.phma + u.ghma + u.ohma;
    if (sum - 1.0).abs() > FRACTION_SUM_TOLERANCE {
        c.push(t, Some(id), "phma+ghma+ohma", format!("fractions sum to {sum}, expected 1"));
    }
}

fn check_attributes(c: &mut Checker, r: &AttributeRow) {
    let t = InputTable::SiteScaleValues;
    let id = &r.map_unit_id;
    for &attr in Attribute::ALL {
        let Some(v) = r.get(attr) else { continue };
        if attr.is_cover() {
            c.range(t, id, attr.as_str(), v, 0.0, 1.0);
        } else {
            c.non_negative(t, id, attr.as_str(), v);
        }
    }
    for (field, v) in [("arid", r.arid), ("mesic", r.mesic)] {
        if let Some(v) = v {
            c.range(t, id, field, v, 0.0, 1.0);
        }
    }
}
