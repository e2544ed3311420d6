//! crates/ccs_io/src/lib.rs
//! I/O for the credit engine.
//!
//! - `manifest`: project manifest (input table paths, digests, run options)
//! - `loader`: read every input table, verify digests, run ingestion validation
//! - `canonical_json`: canonical bytes for hashing, atomic file writes
//! - `hasher`: SHA-256 helpers and the `RUN:` id
//!
//! No network I/O. Every path is local and resolved against the manifest directory.

#![forbid(unsafe_code)]

use std::fmt;

use thiserror::Error;

pub mod canonical_json;
pub mod hasher;
pub mod loader;
pub mod manifest;

pub use hasher::HashError;
pub use manifest::ManifestError;

/// One ingestion-validation failure: which table, which map unit, which field.
#[derive(Clone, Debug, PartialEq)]
pub struct Violation {
    pub table: &'static str,
    pub map_unit: Option<String>,
    pub field: String,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.map_unit {
            Some(id) => write!(f, "{}[{}].{}: {}", self.table, id, self.field, self.message),
            None => write!(f, "{}.{}: {}", self.table, self.field, self.message),
        }
    }
}

/// Every violation found in one validation pass (never empty).
#[derive(Clone, Debug, PartialEq)]
pub struct Violations(pub Vec<Violation>);

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ingestion violation(s)", self.0.len())?;
        for v in &self.0 {
            write!(f, "\n  - {v}")?;
        }
        Ok(())
    }
}

/// Unified error for ccs_io.
#[derive(Debug, Error)]
pub enum IoError {
    /// Filesystem / path errors (open, create_dir_all, rename, fsync).
    #[error("io/path error: {0}")]
    Path(String),

    /// JSON parse or shape error in one input table.
    #[error("json error in {table}: {msg}")]
    Json { table: String, msg: String },

    #[error("manifest error: {0}")]
    Manifest(#[from] ManifestError),

    #[error("hash error: {0}")]
    Hash(#[from] HashError),

    /// Input rows outside their domain.
    #[error("{0}")]
    Validation(Violations),
}

pub type IoResult<T> = Result<T, IoError>;

impl From<std::io::Error> for IoError {
    fn from(e: std::io::Error) -> Self {
        IoError::Path(e.to_string())
    }
}

impl From<serde_json::Error> for IoError {
    fn from(e: serde_json::Error) -> Self {
        IoError::Json { table: "<output>".to_string(), msg: e.to_string() }
    }
}

pub mod prelude {
    pub use crate::canonical_json::{to_canonical_json_bytes, write_canonical_file, write_table_file};
    pub use crate::hasher::{run_id_from_canonical, sha256_canonical, sha256_file, sha256_hex};
    pub use crate::loader::{load_project, load_projected_values, LoadedProject};
    pub use crate::manifest::{InputTable, Manifest, ResolvedManifest};
    pub use crate::{IoError, IoResult, Violation, Violations};
}
