//! crates/ccs_io/src/hasher.rs
//!
//! SHA-256 helpers. Hex digests are lowercase.
//! - `sha256_hex`, `sha256_stream`, `sha256_file`: raw bytes (input files).
//! - `sha256_canonical`: canonical JSON of a value (output tables, run record).
//! - `run_id_from_canonical`: `RUN:<hex>` over the canonical run payload.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::canonical_json::canonical_bytes;

#[derive(Error, Debug)]
pub enum HashError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

fn to_lower_hex(bytes: &[u8]) -> String {
    const LUT: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        out.push(LUT[(b >> 4) as usize] as char);
        out.push(LUT[(b & 0x0F) as usize] as char);
    }
    out
}

/// SHA-256 over raw bytes.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    to_lower_hex(&hasher.finalize())
}

/// SHA-256 over a reader stream.
pub fn sha256_stream<R: Read>(reader: &mut R) -> Result<String, HashError> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(to_lower_hex(&hasher.finalize()))
}

/// SHA-256 over a file's raw bytes.
pub fn sha256_file(path: &Path) -> Result<String, HashError> {
    let mut r = BufReader::new(File::open(path)?);
    sha256_stream(&mut r)
}

/// SHA-256 over the canonical JSON bytes of a value.
pub fn sha256_canonical<T: Serialize + ?Sized>(value: &T) -> Result<String, HashError> {
    Ok(sha256_hex(&canonical_bytes(value)?))
}

/// `RUN:<hex>` id for a run record payload. The payload must not contain the id itself.
pub fn run_id_from_canonical<T: Serialize + ?Sized>(payload: &T) -> Result<String, HashError> {
    Ok(format!("RUN:{}", sha256_canonical(payload)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hex_encoding_is_lowercase() {
        assert_eq!(sha256_hex(b"abc"), "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad");
    }

    #[test]
    fn canonical_hash_ignores_key_order() {
        #[derive(Serialize)]
        struct T {
            summer: f64,
            breed: f64,
        }
        let h1 = sha256_canonical(&T { summer: 2.0, breed: 1.0 }).unwrap();
        let h2 = sha256_canonical(&json!({"breed": 1.0, "summer": 2.0})).unwrap();
        assert_eq!(h1, h2);
    }

    #[test]
    fn file_digest_matches_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("t.json");
        std::fs::write(&p, b"[]").unwrap();
        assert_eq!(sha256_file(&p).unwrap(), sha256_hex(b"[]"));
    }

    #[test]
    fn run_id_is_prefixed_and_stable() {
        let a = run_id_from_canonical(&json!({"engine": "ccs", "n": 1})).unwrap();
        let b = run_id_from_canonical(&json!({"n": 1, "engine": "ccs"})).unwrap();
        assert_eq!(a, b);
        assert!(a.starts_with("RUN:"));
        assert_eq!(a.len(), 4 + 64);
    }
}
