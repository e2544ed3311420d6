// crates/ccs_io/src/manifest.rs
//
// Project manifest: one JSON file naming every input table.
// - Paths are relative to the manifest directory (absolute paths are kept as-is).
// - Offline only: any path with a scheme ("://", "http:", "https:") is rejected.
// - Optional lowercase 64-hex sha256 per input, verified over the raw file bytes.
// - Optional `options` block (join / bucket / duplicate policies).

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use ccs_core::ids::is_valid_sha256;
use ccs_core::CalcOptions;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const MAX_MANIFEST_BYTES: u64 = 4 * 1024 * 1024;

/// Input tables a project may name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputTable {
    MapUnits,
    SiteScaleValues,
    ScoringCurves,
    CurveLookup,
    ScoringWeights,
    CurrentLs,
    ProjectedLs,
    StandardBaseline,
    ReserveAccount,
    CreditPolicy,
    ProjectedValues,
}

impl InputTable {
    pub const ALL: [InputTable; 11] = [
        InputTable::MapUnits,
        InputTable::SiteScaleValues,
        InputTable::ScoringCurves,
        InputTable::CurveLookup,
        InputTable::ScoringWeights,
        InputTable::CurrentLs,
        InputTable::ProjectedLs,
        InputTable::StandardBaseline,
        InputTable::ReserveAccount,
        InputTable::CreditPolicy,
        InputTable::ProjectedValues,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            InputTable::MapUnits => "map_units",
            InputTable::SiteScaleValues => "site_scale_values",
            InputTable::ScoringCurves => "scoring_curves",
            InputTable::CurveLookup => "curve_lookup",
            InputTable::ScoringWeights => "scoring_weights",
            InputTable::CurrentLs => "current_ls",
            InputTable::ProjectedLs => "projected_ls",
            InputTable::StandardBaseline => "standard_baseline",
            InputTable::ReserveAccount => "reserve_account",
            InputTable::CreditPolicy => "credit_policy",
            InputTable::ProjectedValues => "projected_values",
        }
    }

    /// The curve lookup has a built-in default; projected values may come from the CLI.
    pub const fn is_required(self) -> bool {
        !matches!(self, InputTable::CurveLookup | InputTable::ProjectedValues)
    }
}

impl fmt::Display for InputTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// External manifest as written by the user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Optional project label (informational).
    #[serde(default)]
    pub id: Option<String>,
    /// Input table → path.
    pub inputs: BTreeMap<InputTable, String>,
    /// Input table → expected sha256 of the raw file.
    #[serde(default)]
    pub inputs_sha256: BTreeMap<InputTable, String>,
    #[serde(default)]
    pub options: CalcOptions,
}

/// Paths resolved against the manifest directory and checked to exist.
#[derive(Debug, Clone)]
pub struct ResolvedManifest {
    pub id: Option<String>,
    pub base_dir: PathBuf,
    pub paths: BTreeMap<InputTable, PathBuf>,
    pub digests: BTreeMap<InputTable, String>,
    pub options: CalcOptions,
}

impl ResolvedManifest {
    pub fn path(&self, table: InputTable) -> Option<&Path> {
        self.paths.get(&table).map(PathBuf::as_path)
    }
}

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("missing required input: {0}")]
    Missing(InputTable),
    #[error("path must not be empty for {0}")]
    Empty(InputTable),
    #[error("path must be offline (no scheme) for {0}: {1}")]
    UrlPath(InputTable, String),
    #[error("cannot access {0}: {1}")]
    Io(String, String),
    #[error("path is not a file for {0}: {1}")]
    NotAFile(InputTable, String),
    #[error("cannot parse manifest {0}: {1}")]
    Parse(String, String),
    #[error("invalid sha256 format for {0}: {1}")]
    DigestShape(InputTable, String),
    #[error("digest supplied for missing input: {0}")]
    DigestForMissing(InputTable),
    #[error("sha256 mismatch for {table}: expected={expected} got={got}")]
    DigestMismatch { table: InputTable, expected: String, got: String },
}

#[inline]
fn has_any_scheme(s: &str) -> bool {
    s.contains("://") || s.starts_with("http:") || s.starts_with("https:")
}

#[inline]
fn join_under(base: &Path, rel: &str) -> PathBuf {
    let p = Path::new(rel);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base.join(p)
    }
}

/// Shape and offline checks. No I/O.
pub fn validate_manifest(man: &Manifest) -> Result<(), ManifestError> {
    for table in InputTable::ALL {
        match man.inputs.get(&table) {
            None if table.is_required() => return Err(ManifestError::Missing(table)),
            None => {}
            Some(p) if p.trim().is_empty() => return Err(ManifestError::Empty(table)),
            Some(p) if has_any_scheme(p) => return Err(ManifestError::UrlPath(table, p.clone())),
            Some(_) => {}
        }
    }
    for (table, hex) in &man.inputs_sha256 {
        if !man.inputs.contains_key(table) {
            return Err(ManifestError::DigestForMissing(*table));
        }
        if !is_valid_sha256(hex) {
            return Err(ManifestError::DigestShape(*table, hex.clone()));
        }
    }
    Ok(())
}

/// Resolve paths under `base_dir` and check every named input is a file.
pub fn resolve_paths(base_dir: &Path, man: &Manifest) -> Result<ResolvedManifest, ManifestError> {
    let mut paths = BTreeMap::new();
    for (table, rel) in &man.inputs {
        let p = join_under(base_dir, rel);
        let md = fs::metadata(&p)
            .map_err(|e| ManifestError::Io(table.to_string(), format!("{} ({e})", p.display())))?;
        if !md.is_file() {
            return Err(ManifestError::NotAFile(*table, p.display().to_string()));
        }
        paths.insert(*table, p);
    }
    Ok(ResolvedManifest {
        id: man.id.clone(),
        base_dir: base_dir.to_path_buf(),
        paths,
        digests: man.inputs_sha256.clone(),
        options: man.options,
    })
}

/// Read, validate and resolve a manifest file. Digests are verified by the loader.
pub fn load_and_resolve_manifest(manifest_path: &Path) -> Result<ResolvedManifest, ManifestError> {
    let label = manifest_path.display().to_string();
    let mut buf = Vec::new();
    fs::File::open(manifest_path)
        .and_then(|f| f.take(MAX_MANIFEST_BYTES).read_to_end(&mut buf))
        .map_err(|e| ManifestError::Io("manifest".into(), format!("{label} ({e})")))?;

    let man: Manifest = serde_json::from_slice(&buf).map_err(|e| ManifestError::Parse(label, e.to_string()))?;
    validate_manifest(&man)?;

    let base = manifest_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    resolve_paths(&base, &man)
}
