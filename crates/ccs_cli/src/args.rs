// crates/ccs_cli/src/args.rs
//
// Offline CLI argument surface.
// - Every path flag must be local (no scheme:// URLs).
// - --manifest is required and must exist; --projected-values, when given, too.
// - Policy flags override the manifest's `options` block.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use ccs_core::{BucketPolicy, CalcOptions, DuplicatePolicy, JoinPolicy};
use clap::{ArgAction, Parser, ValueEnum};

/// Parsed CLI arguments.
#[derive(Debug, Parser, Clone)]
#[command(
    name = "ccs",
    version,
    disable_help_subcommand = true,
    about = "Offline, deterministic habitat conservation credit calculator"
)]
pub struct Args {
    /// Project manifest JSON naming every input table.
    #[arg(long)]
    pub manifest: PathBuf,

    /// Tidy projected-values table replacing the manifest's `projected_values`.
    #[arg(long)]
    pub projected_values: Option<PathBuf>,

    /// Output directory (created when missing).
    #[arg(long, default_value = ".")]
    pub out: PathBuf,

    /// Also write scores, functional acres and per-scenario credits under <out>/interim.
    #[arg(long)]
    pub save_interims: bool,

    /// Skip the scenario report.
    #[arg(long)]
    pub no_scenarios: bool,

    /// Summary renderer(s) to emit (json, html). Omit to skip rendering.
    #[arg(long, value_parser = ["json", "html"], num_args = 0..=2)]
    pub render: Vec<String>,

    #[arg(long, value_enum)]
    pub join_policy: Option<JoinArg>,
    #[arg(long, value_enum)]
    pub bucket_policy: Option<BucketArg>,
    #[arg(long, value_enum)]
    pub duplicate_policy: Option<DuplicateArg>,

    /// Load, validate and resolve the configuration without running the engine.
    #[arg(long)]
    pub validate_only: bool,

    /// More logging (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Warnings and errors only.
    #[arg(long)]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum JoinArg {
    Inner,
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BucketArg {
    Reject,
    Clamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DuplicateArg {
    Average,
    Reject,
}

impl Args {
    /// Manifest options with any policy flags applied on top.
    pub fn effective_options(&self, manifest: CalcOptions) -> CalcOptions {
        let mut o = manifest;
        if let Some(j) = self.join_policy {
            o.join_policy = match j {
                JoinArg::Inner => JoinPolicy::Inner,
                JoinArg::Strict => JoinPolicy::Strict,
            };
        }
        if let Some(b) = self.bucket_policy {
            o.bucket_policy = match b {
                BucketArg::Reject => BucketPolicy::Reject,
                BucketArg::Clamp => BucketPolicy::Clamp,
            };
        }
        if let Some(d) = self.duplicate_policy {
            o.duplicate_policy = match d {
                DuplicateArg::Average => DuplicatePolicy::Average,
                DuplicateArg::Reject => DuplicatePolicy::Reject,
            };
        }
        o
    }

    /// Default filter directive when `RUST_LOG` is unset.
    pub fn log_level(&self) -> &'static str {
        match (self.quiet, self.verbose) {
            (true, _) => "warn",
            (false, 0) => "info",
            (false, 1) => "debug",
            (false, _) => "trace",
        }
    }
}

/// Errors surfaced by argument validation. Messages are short and stable.
#[derive(Debug)]
pub enum CliError {
    NonLocalPath(String),
    NotFound(String),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::NonLocalPath(p) => write!(f, "path must be local file (no scheme): {p}"),
            CliError::NotFound(p) => write!(f, "file not found: {p}"),
        }
    }
}
impl std::error::Error for CliError {}

/// Entry point used by main.rs
pub fn parse_and_validate() -> Result<Args, CliError> {
    validate(Args::parse())
}

fn validate(mut args: Args) -> Result<Args, CliError> {
    ensure_local_path(&args.out)?;
    ensure_local_exists(&args.manifest, "--manifest")?;
    if let Some(pv) = &args.projected_values {
        ensure_local_exists(pv, "--projected-values")?;
    }

    args.manifest = normalize_path(&args.manifest);
    args.projected_values = args.projected_values.take().map(|p| normalize_path(&p));
    args.out = normalize_path(&args.out);
    Ok(args)
}

#[inline]
fn has_scheme(s: &str) -> bool {
    let lower = s.trim().to_ascii_lowercase();
    lower.contains("://") || lower.starts_with("http:") || lower.starts_with("https:") || lower.starts_with("file:")
}

#[inline]
fn ensure_local_path(p: &Path) -> Result<(), CliError> {
    if let Some(s) = p.to_str() {
        if has_scheme(s) {
            return Err(CliError::NonLocalPath(s.to_string()));
        }
    }
    Ok(())
}

/// Local (no scheme) and an existing regular file.
fn ensure_local_exists(p: &Path, label: &'static str) -> Result<(), CliError> {
    ensure_local_path(p)?;
    let meta = fs::metadata(p).map_err(|_| CliError::NotFound(format!("{label} {}", p.display())))?;
    if !meta.is_file() {
        return Err(CliError::NotFound(format!("{label} {}", p.display())));
    }
    Ok(())
}

/// Absolute path; falls back to CWD-relative when the path does not exist yet.
fn normalize_path(p: &Path) -> PathBuf {
    fs::canonicalize(p).unwrap_or_else(|_| {
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            env::current_dir().unwrap_or_else(|_| PathBuf::from(".")).join(p)
        }
    })
}
