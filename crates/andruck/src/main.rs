//! andruck: CLI host for the print-simulation pipeline.
//!
//! Loads an image, resolves a module parameter bundle, runs the
//! rendering pipeline, writes the finished PNG, and prints per-stage
//! diagnostics. Useful for:
//!
//! - Proofing parameter bundles before wiring them into a UI
//! - Comparing screen geometries and press defect settings
//! - Measuring per-stage durations to identify bottlenecks
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin andruck -- photo.jpg -o proof.png \
//!     --active filmstock,grain,halftone,press --export --upscale 2
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use andruck_pipeline::{
    render_staged, ActiveModules, ParamBundle, PipelineDiagnostics, RenderOptions,
    StageDiagnostics, StageMetrics, StagedResult,
};

/// Render an image through the simulated print pipeline and report
/// per-stage timing and count diagnostics.
#[derive(Parser)]
#[command(name = "andruck", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    input: PathBuf,

    /// Output PNG path. Omit to run diagnostics only.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON file holding the module parameter bundle
    /// (`{"module": {"param": value, ...}, ...}`).
    #[arg(long)]
    params: Option<PathBuf>,

    /// Comma-separated active module ids.
    #[arg(long, default_value = "filmstock,grain,halftone,press,dotgain,inkbleed,paper")]
    active: String,

    /// Render at export scale instead of the clamped preview.
    #[arg(long)]
    export: bool,

    /// Integer export upscale factor (with --export).
    #[arg(long, default_value_t = 1)]
    upscale: u32,

    /// Longest-axis clamp in pixels for preview renders.
    #[arg(long, default_value_t = 1400)]
    preview_max: u32,

    /// Number of runs (diagnostics printed per run).
    #[arg(long, default_value_t = 1)]
    runs: usize,

    /// Output diagnostics as JSON instead of a human-readable report.
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.runs == 0 {
        eprintln!("Error: --runs must be at least 1");
        return ExitCode::FAILURE;
    }

    let image_bytes = match std::fs::read(&cli.input) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error reading {}: {e}", cli.input.display());
            return ExitCode::FAILURE;
        }
    };
    let source = match image::load_from_memory(&image_bytes) {
        Ok(decoded) => decoded.to_rgba8(),
        Err(e) => {
            eprintln!("Error decoding {}: {e}", cli.input.display());
            return ExitCode::FAILURE;
        }
    };

    let params: ParamBundle = match &cli.params {
        Some(path) => {
            let json = match std::fs::read_to_string(path) {
                Ok(json) => json,
                Err(e) => {
                    eprintln!("Error reading {}: {e}", path.display());
                    return ExitCode::FAILURE;
                }
            };
            match serde_json::from_str(&json) {
                Ok(bundle) => bundle,
                Err(e) => {
                    eprintln!("Error parsing {}: {e}", path.display());
                    return ExitCode::FAILURE;
                }
            }
        }
        None => ParamBundle::new(),
    };

    let active: ActiveModules = cli
        .active
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_owned)
        .collect();

    let options = if cli.export {
        RenderOptions::export(cli.upscale)
    } else {
        RenderOptions::preview(cli.preview_max)
    };

    eprintln!(
        "Image: {} ({}x{}), active: [{}]",
        cli.input.display(),
        source.width(),
        source.height(),
        active.iter().cloned().collect::<Vec<_>>().join(", "),
    );

    let mut last: Option<StagedResult> = None;
    for run in 1..=cli.runs {
        let result = match render_staged(&source, &active, &params, &options) {
            Ok(result) => result,
            Err(e) => {
                eprintln!("Render failed: {e}");
                return ExitCode::FAILURE;
            }
        };

        if cli.json {
            match serde_json::to_string_pretty(&result.diagnostics) {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    eprintln!("Error serializing diagnostics: {e}");
                    return ExitCode::FAILURE;
                }
            }
        } else {
            if cli.runs > 1 {
                println!("--- run {run}/{} ---", cli.runs);
            }
            print_report(&result.diagnostics);
        }
        last = Some(result);
    }

    if let (Some(path), Some(result)) = (&cli.output, last) {
        if let Err(e) = result.output.save(path) {
            eprintln!("Error writing {}: {e}", path.display());
            return ExitCode::FAILURE;
        }
        eprintln!("Wrote {} ({})", path.display(), result.dimensions);
    }

    ExitCode::SUCCESS
}

/// Human-readable per-stage report.
fn print_report(diagnostics: &PipelineDiagnostics) {
    print_stage("resample", Some(&diagnostics.resample));
    print_stage("film", diagnostics.film.as_ref());
    print_stage("velox", diagnostics.velox.as_ref());
    print_stage("grain", diagnostics.grain.as_ref());
    print_stage("halftone", Some(&diagnostics.halftone));
    print_stage("bleed", diagnostics.bleed.as_ref());
    print_stage("paper", diagnostics.paper.as_ref());
    println!(
        "{:<10} {:>9.2} ms  {} plates, {} px",
        "total",
        diagnostics.total_duration.as_secs_f64() * 1000.0,
        diagnostics.summary.plates,
        diagnostics.summary.pixel_count,
    );
}

/// One line per stage; skipped stages print as such.
fn print_stage(name: &str, stage: Option<&StageDiagnostics>) {
    match stage {
        Some(stage) => println!(
            "{name:<10} {:>9.2} ms  {}",
            stage.duration.as_secs_f64() * 1000.0,
            describe(&stage.metrics),
        ),
        None => println!("{name:<10} {:>12}", "(skipped)"),
    }
}

/// Compact metric description for the report.
fn describe(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Resample { from, to, applied } => {
            if *applied {
                format!("{from} -> {to}")
            } else {
                format!("{to} (copy)")
            }
        }
        StageMetrics::Film { stock } => format!("stock={stock}"),
        StageMetrics::Velox => "sigmoid crush".to_owned(),
        StageMetrics::Grain => "unseeded noise".to_owned(),
        StageMetrics::Halftone { plates, dots } => {
            format!("{plates} plates, {dots} dots")
        }
        StageMetrics::Bleed { radius } => format!("radius={radius}px"),
        StageMetrics::Paper { fibers } => format!("{fibers} fibers"),
    }
}
