//! Output files.
//!
//! <out>/current_credits.json
//! <out>/projected_credits.json
//! <out>/scenario_report.json     (when scenarios ran)
//! <out>/run_record.json          (canonical JSON)
//! <out>/interim/...              (with `save_interims`)

use std::path::{Path, PathBuf};

use ccs_io::canonical_json::{write_canonical_file, write_table_file};
use serde::Serialize;

use crate::{PipelineError, PipelineOutputs};

/// One file written by `write_outputs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFile {
    pub name: String,
    pub path: PathBuf,
}

struct Writer<'a> {
    dir: &'a Path,
    written: Vec<WrittenFile>,
}

impl Writer<'_> {
    fn table<T: Serialize + ?Sized>(&mut self, rel: &str, rows: &T) -> Result<(), PipelineError> {
        let path = self.dir.join(rel);
        write_table_file(&path, rows).map_err(|e| PipelineError::Io(format!("{}: {e}", path.display())))?;
        self.written.push(WrittenFile { name: rel.to_string(), path });
        Ok(())
    }
}

/// Write the output tables, run record and (optionally) the intermediates.
pub fn write_outputs(out_dir: &Path, out: &PipelineOutputs, save_interims: bool) -> Result<Vec<WrittenFile>, PipelineError> {
    let mut w = Writer { dir: out_dir, written: Vec::new() };

    w.table("current_credits.json", &out.current_credits)?;
    w.table("projected_credits.json", &out.projected_credits)?;
    if let Some(report) = out.scenario_report() {
        w.table("scenario_report.json", report)?;
    }

    if save_interims {
        let i = &out.intermediates;
        w.table("interim/current_scores.json", &i.current_scores)?;
        w.table("interim/current_facres.json", &i.current_facres)?;
        w.table("interim/baseline_scores.json", &i.baseline_scores)?;
        w.table("interim/baseline_facres.json", &i.baseline_facres)?;
        w.table("interim/projected_scores.json", &i.projected_scores)?;
        w.table("interim/projected_facres.json", &i.projected_facres)?;
        if let Some(s) = &out.scenario {
            for branch in &s.branches {
                w.table(&format!("interim/scenario/{}.json", branch.key), &branch.credits)?;
            }
        }
    }

    let record_path = out_dir.join("run_record.json");
    let record = serde_json::to_value(&out.run_record).map_err(|e| PipelineError::Build(format!("run record: {e}")))?;
    write_canonical_file(&record_path, &record)
        .map_err(|e| PipelineError::Io(format!("{}: {e}", record_path.display())))?;
    w.written.push(WrittenFile { name: "run_record.json".into(), path: record_path });

    tracing::info!(dir = %out_dir.display(), files = w.written.len(), "outputs written");
    Ok(w.written)
}
