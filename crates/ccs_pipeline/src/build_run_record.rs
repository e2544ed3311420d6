// crates/ccs_pipeline/src/build_run_record.rs
//
// Run record: what was run, on which inputs, with which options, producing
// which outputs.
// - Input digests: SHA-256 of the raw input files (as loaded).
// - Output digests: SHA-256 of the canonical JSON of each output table.
// - Run id: `RUN:<hex>` over the canonical record without its `id` field.
// No timestamp is recorded; identical inputs give an identical record.

use std::collections::BTreeMap;

use ccs_core::results::DivergentDuplicate;
use ccs_core::CalcOptions;
use ccs_io::hasher::{run_id_from_canonical, sha256_canonical};
use serde::{Deserialize, Serialize};

use crate::{EngineMeta, PipelineError};

/// Where the projected values came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionSource {
    Manifest,
    Override,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    /// "RUN:<hex64>"
    pub id: String,
    pub engine: EngineMeta,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    /// Input table → sha256 of the raw file.
    pub inputs: BTreeMap<String, String>,
    pub projection_source: ProjectionSource,
    pub options: CalcOptions,
    /// Output table → sha256 of its canonical JSON.
    pub outputs: BTreeMap<String, String>,
    /// Divergent projected duplicates averaged during the run.
    #[serde(default)]
    pub divergent_duplicates: Vec<DivergentDuplicate>,
}

#[derive(Serialize)]
struct RunNoId<'a> {
    engine: &'a EngineMeta,
    #[serde(skip_serializing_if = "Option::is_none")]
    project: Option<&'a str>,
    inputs: &'a BTreeMap<String, String>,
    projection_source: ProjectionSource,
    options: &'a CalcOptions,
    outputs: &'a BTreeMap<String, String>,
    divergent_duplicates: &'a [DivergentDuplicate],
}

/// Digest one output table.
pub fn output_digest<T: Serialize + ?Sized>(name: &str, table: &T) -> Result<String, PipelineError> {
    sha256_canonical(table).map_err(|e| PipelineError::Build(format!("digest {name}: {e}")))
}

pub struct RunRecordParts<'a> {
    pub engine: EngineMeta,
    pub project: Option<String>,
    pub inputs: BTreeMap<String, String>,
    pub projection_source: ProjectionSource,
    pub options: CalcOptions,
    pub outputs: BTreeMap<String, String>,
    pub divergent_duplicates: &'a [DivergentDuplicate],
}

/// Assemble the record and derive its id.
pub fn build_run_record(parts: RunRecordParts<'_>) -> Result<RunRecord, PipelineError> {
    let payload = RunNoId {
        engine: &parts.engine,
        project: parts.project.as_deref(),
        inputs: &parts.inputs,
        projection_source: parts.projection_source,
        options: &parts.options,
        outputs: &parts.outputs,
        divergent_duplicates: parts.divergent_duplicates,
    };
    let id = run_id_from_canonical(&payload).map_err(|e| PipelineError::Build(format!("run id: {e}")))?;
    Ok(RunRecord {
        id,
        engine: parts.engine,
        project: parts.project,
        inputs: parts.inputs,
        projection_source: parts.projection_source,
        options: parts.options,
        outputs: parts.outputs,
        divergent_duplicates: parts.divergent_duplicates.to_vec(),
    })
}
