// crates/ccs_cli/src/main.rs
//
// ccs: load a project manifest, run the credit engine, write the output tables,
// run record and optional summary renders. Logs go to stderr; stdout carries
// only the run id.

mod args;

mod exitcodes {
    pub const OK: i32 = 0;
    pub const VALIDATION: i32 = 2;
    pub const SELF_VERIFY: i32 = 3;
    pub const IO: i32 = 4;
    pub const CALC: i32 = 5;
}

use std::fs;
use std::path::Path;
use std::process::ExitCode;

use args::{parse_and_validate as parse_cli, Args};
use ccs_io::loader;
use ccs_pipeline::{run_project, validate_project, write_outputs, PipelineCtx, PipelineError, PipelineOutputs, ProjectedOverride};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Central error type for CLI → exit-code mapping.
#[derive(Debug)]
enum MainError {
    /// Manifest shape, JSON parse or ingestion validation failures
    Validation(String),
    /// Input bytes differ from a declared digest
    SelfVerify(String),
    /// Read/write/path failures
    Io(String),
    /// Scoring, configuration, input or join failures inside the engine
    Calc(String),
    /// Summary build or render failures
    Render(String),
}

impl std::fmt::Display for MainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MainError::Validation(m) => write!(f, "validation: {m}"),
            MainError::SelfVerify(m) => write!(f, "verify: {m}"),
            MainError::Io(m) => write!(f, "io: {m}"),
            MainError::Calc(m) => write!(f, "calculation: {m}"),
            MainError::Render(m) => write!(f, "render: {m}"),
        }
    }
}

fn main() -> ExitCode {
    let args = match parse_cli() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("ccs: error: {e}");
            return ExitCode::from(exitcodes::VALIDATION as u8);
        }
    };
    init_logging(&args);

    let result = if args.validate_only { validate_only(&args) } else { run_once(&args) };
    let rc = match result {
        Ok(()) => exitcodes::OK,
        Err(e) => {
            eprintln!("ccs: error: {e}");
            map_error(&e)
        }
    };
    ExitCode::from(rc as u8)
}

/// stderr fmt layer; `RUST_LOG` wins over the verbosity flags.
fn init_logging(args: &Args) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_level()));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

/// Load + ingestion validation + configuration resolution; no engine run, no files.
fn validate_only(args: &Args) -> Result<(), MainError> {
    let loaded = loader::load_project(&args.manifest).map_err(|e| map_pipeline_err(e.into()))?;
    let options = args.effective_options(loaded.manifest.options);
    if let Some(pv) = &args.projected_values {
        loader::load_projected_values(pv).map_err(|e| map_pipeline_err(e.into()))?;
    }
    validate_project(&loaded, options).map_err(map_pipeline_err)?;
    tracing::info!(manifest = %args.manifest.display(), "validate-only: inputs OK");
    Ok(())
}

fn run_once(args: &Args) -> Result<(), MainError> {
    let loaded = loader::load_project(&args.manifest).map_err(|e| map_pipeline_err(e.into()))?;

    let mut ctx = PipelineCtx::new(loaded);
    ctx.options = args.effective_options(ctx.options);
    ctx.scenarios = !args.no_scenarios;
    if let Some(pv) = &args.projected_values {
        let (rows, sha256) = loader::load_projected_values(pv).map_err(|e| map_pipeline_err(e.into()))?;
        ctx.projected_override = Some(ProjectedOverride { rows, sha256 });
    }

    let outs = run_project(&ctx).map_err(map_pipeline_err)?;

    fs::create_dir_all(&args.out).map_err(|e| MainError::Io(format!("mkdir {}: {e}", args.out.display())))?;
    write_outputs(&args.out, &outs, args.save_interims).map_err(map_pipeline_err)?;
    maybe_render_reports(args, &outs, &args.out)?;

    println!("{}", outs.run_record.id);
    Ok(())
}

fn maybe_render_reports(args: &Args, outs: &PipelineOutputs, out_dir: &Path) -> Result<(), MainError> {
    if args.render.is_empty() {
        return Ok(());
    }
    let model = ccs_report::build_summary(outs).map_err(|e| MainError::Render(e.to_string()))?;
    for kind in &args.render {
        match kind.as_str() {
            "json" => render_json_report(&model, out_dir)?,
            "html" => render_html_report(&model, out_dir)?,
            other => return Err(MainError::Render(format!("unknown renderer: {other}"))),
        }
    }
    Ok(())
}

fn render_json_report(model: &ccs_report::CreditSummary, out_dir: &Path) -> Result<(), MainError> {
    #[cfg(feature = "report-json")]
    {
        let text = ccs_report::render_json(model).map_err(|e| MainError::Render(e.to_string()))?;
        write_text(&out_dir.join("summary.json"), &text)
    }
    #[cfg(not(feature = "report-json"))]
    {
        let _ = (model, out_dir);
        Err(MainError::Render("json renderer not enabled (build with feature `report-json`)".into()))
    }
}

fn render_html_report(model: &ccs_report::CreditSummary, out_dir: &Path) -> Result<(), MainError> {
    #[cfg(feature = "report-html")]
    {
        let text = ccs_report::render_html(model).map_err(|e| MainError::Render(e.to_string()))?;
        write_text(&out_dir.join("summary.html"), &text)
    }
    #[cfg(not(feature = "report-html"))]
    {
        let _ = (model, out_dir);
        Err(MainError::Render("html renderer not enabled (build with feature `report-html`)".into()))
    }
}

#[allow(dead_code)]
fn write_text(path: &Path, text: &str) -> Result<(), MainError> {
    fs::write(path, text).map_err(|e| MainError::Io(format!("write {}: {e}", path.display())))
}

fn map_error(e: &MainError) -> i32 {
    use exitcodes::*;
    match e {
        MainError::Validation(_) => VALIDATION,
        MainError::SelfVerify(_) => SELF_VERIFY,
        MainError::Io(_) => IO,
        MainError::Calc(_) => CALC,
        MainError::Render(_) => IO,
    }
}

fn map_pipeline_err(e: PipelineError) -> MainError {
    match e {
        PipelineError::Manifest(m) | PipelineError::Validate(m) => MainError::Validation(m),
        PipelineError::Verify(m) => MainError::SelfVerify(m),
        PipelineError::Io(m) | PipelineError::Build(m) => MainError::Io(m),
        PipelineError::Calc(c) => MainError::Calc(c.to_string()),
    }
}
