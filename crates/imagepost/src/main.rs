//! imagepost: render a photo through the filter chain from the command line.
//!
//! Loads an image, scales it to a view of the given size on a screen of
//! the given scale factor, runs the blur / tile / bloom / gloom /
//! pixellate chain and writes the rendered bitmap. Optionally prints
//! per-stage diagnostics.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin imagepost -- [OPTIONS] <INPUT> <OUTPUT>
//! ```
//!
//! Set `RUST_LOG=imagepost_pipeline=debug` to trace every stage.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use imagepost_pipeline::{
    Dimensions, FilterConfig, Pipeline, PipelineDiagnostics, RenderLimits, ResampleFilter,
    decode::decode_dynamic, scale_to_view,
};

/// Render a photo through the imagepost filter chain.
///
/// The gaussian blur always runs; every other filter runs only when its
/// switch is given, always in the order tile, bloom, gloom, pixellate.
#[derive(Parser)]
#[command(name = "imagepost", version)]
#[allow(clippy::struct_excessive_bools)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    input: PathBuf,

    /// Path of the rendered image to write (format from extension).
    output: PathBuf,

    /// Gaussian blur radius in pixels.
    #[arg(long, default_value_t = FilterConfig::DEFAULT_BLUR_RADIUS)]
    blur_radius: f32,

    /// Apply the eightfold reflected tile.
    #[arg(long)]
    tiled: bool,

    /// Apply bloom.
    #[arg(long)]
    bloom: bool,

    /// Apply gloom.
    #[arg(long)]
    gloom: bool,

    /// Apply pixellate.
    #[arg(long)]
    pixellate: bool,

    /// View width in points.
    #[arg(long, default_value_t = 375, value_parser = clap::value_parser!(u32).range(1..))]
    view_width: u32,

    /// View height in points.
    #[arg(long, default_value_t = 375, value_parser = clap::value_parser!(u32).range(1..))]
    view_height: u32,

    /// Device pixels per point.
    #[arg(long, default_value_t = 2.0)]
    screen_scale: f32,

    /// Resampling filter used when scaling to the view.
    #[arg(long, value_enum, default_value_t = Resample::Triangle)]
    resample: Resample,

    /// Per-stage time budget in milliseconds.
    #[arg(long, default_value_t = 2000)]
    stage_budget_ms: u64,

    /// Filter configuration as a JSON string.
    ///
    /// When provided, `--blur-radius` and the filter switches are
    /// ignored. The JSON must be a valid `FilterConfig` serialization.
    #[arg(long)]
    config_json: Option<String>,

    /// Print diagnostics as JSON instead of a human-readable report.
    #[arg(long)]
    json: bool,

    /// Do not print diagnostics at all.
    #[arg(long, conflicts_with = "json")]
    quiet: bool,
}

/// Resampling filter selection.
#[derive(Clone, Copy, ValueEnum)]
enum Resample {
    /// Nearest-neighbor (fastest, blocky).
    Nearest,
    /// Bilinear interpolation (fast, decent quality).
    Triangle,
    /// Bicubic Catmull-Rom (moderate, good quality).
    CatmullRom,
    /// Gaussian (moderate, smooth).
    Gaussian,
    /// Lanczos with 3 lobes (slowest, sharpest).
    Lanczos3,
}

impl From<Resample> for ResampleFilter {
    fn from(value: Resample) -> Self {
        match value {
            Resample::Nearest => Self::Nearest,
            Resample::Triangle => Self::Triangle,
            Resample::CatmullRom => Self::CatmullRom,
            Resample::Gaussian => Self::Gaussian,
            Resample::Lanczos3 => Self::Lanczos3,
        }
    }
}

/// Build a [`FilterConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and the
/// individual filter flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<FilterConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    Ok(FilterConfig {
        blur_radius: cli.blur_radius,
        tiled_enabled: cli.tiled,
        bloom_enabled: cli.bloom,
        gloom_enabled: cli.gloom,
        pixellate_enabled: cli.pixellate,
    })
}

fn print_diagnostics(diagnostics: &PipelineDiagnostics, json: bool) -> Result<(), String> {
    if json {
        let text = serde_json::to_string_pretty(diagnostics)
            .map_err(|e| format!("Error serializing diagnostics: {e}"))?;
        println!("{text}");
    } else {
        println!("{}", diagnostics.report());
    }
    Ok(())
}

fn run(cli: &Cli) -> Result<(), String> {
    let config = config_from_cli(cli)?;

    let bytes = std::fs::read(&cli.input)
        .map_err(|e| format!("Error reading {}: {e}", cli.input.display()))?;
    tracing::info!(path = %cli.input.display(), bytes = bytes.len(), "loaded input");

    let photo = decode_dynamic(&bytes).map_err(|e| format!("Error decoding {}: {e}", cli.input.display()))?;
    let view = Dimensions {
        width: cli.view_width,
        height: cli.view_height,
    };
    let source = scale_to_view(&photo, view, cli.screen_scale, cli.resample.into())
        .map_err(|e| format!("Error scaling to view: {e}"))?;

    let pipeline = Pipeline::new().with_limits(RenderLimits {
        stage_budget: std::time::Duration::from_millis(cli.stage_budget_ms),
        ..RenderLimits::default()
    });
    let (rendered, diagnostics) = pipeline
        .run_with_diagnostics(Some(&source), &config)
        .map_err(|e| format!("Pipeline error: {e}"))?;

    if !cli.quiet {
        print_diagnostics(&diagnostics, cli.json)?;
    }

    let dims = rendered.dimensions();
    rendered
        .into_pixels()
        .save(&cli.output)
        .map_err(|e| format!("Error writing {}: {e}", cli.output.display()))?;
    eprintln!(
        "Rendered {}x{} image written to {}",
        dims.width,
        dims.height,
        cli.output.display(),
    );
    Ok(())
}

fn main() -> ExitCode {
    // RUST_LOG controls verbosity, e.g. RUST_LOG=imagepost_pipeline=debug.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("{msg}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["imagepost", "in.png", "out.png"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_map_to_gates() {
        let cli = parse(&["--blur-radius", "4.5", "--bloom", "--pixellate"]);
        let config = config_from_cli(&cli).unwrap();
        assert!((config.blur_radius - 4.5).abs() < f32::EPSILON);
        assert!(config.bloom_enabled);
        assert!(config.pixellate_enabled);
        assert!(!config.tiled_enabled);
        assert!(!config.gloom_enabled);
    }

    #[test]
    fn config_json_overrides_flags() {
        let cli = parse(&["--bloom", "--config-json", r#"{"gloom_enabled": true}"#]);
        let config = config_from_cli(&cli).unwrap();
        assert!(config.gloom_enabled);
        assert!(!config.bloom_enabled);
    }

    #[test]
    fn bad_config_json_is_reported() {
        let cli = parse(&["--config-json", "{not json"]);
        assert!(config_from_cli(&cli).unwrap_err().contains("--config-json"));
    }

    #[test]
    fn zero_view_width_is_rejected_by_parser() {
        let result = Cli::try_parse_from(["imagepost", "a.png", "b.png", "--view-width", "0"]);
        assert!(result.is_err());
    }
}
