// ============================================================================
// weldmark-cli: headless annotation of one weld X-ray image
// ============================================================================
//
// Usage examples:
//   weldmark-cli weld.png --predictions results.json --output-png annotated.png
//   weldmark-cli weld.png -p results.txt --report-xlsx report.xlsx --dump
//   weldmark-cli weld.png -p results.json --out-dir conclusion/
//   weldmark-cli weld.png --save-config
//
// The engine runs without a window: predictions become polygons, and the
// annotated image and the region report are written to disk.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use weldmark::config::{ConfigError, LogLevel};
use weldmark::constants::export::{IMAGE_FILENAME, REPORT_FILENAME};
use weldmark::{AnnotationEngine, CanvasSize, EngineConfig};

/// Annotate a weld X-ray image with defect polygons and write the results.
#[derive(Parser, Debug)]
#[command(name = "weldmark-cli", version, about)]
struct CliArgs {
    /// Image to annotate (PNG, JPEG, ...)
    image: PathBuf,

    /// Inference results: a JSON array/object of segments or text lines
    /// `class x1 y1 x2 y2 x3 y3 ...`
    #[arg(short, long, value_name = "FILE")]
    predictions: Option<PathBuf>,

    /// Configuration file. Defaults to the per-user config when present.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write the annotated image at full resolution
    #[arg(long, value_name = "FILE")]
    output_png: Option<PathBuf>,

    /// Write the live view as rendered for a canvas of --width x --height
    #[arg(long, value_name = "FILE")]
    frame_png: Option<PathBuf>,

    /// Write the annotated image and the report workbook into this directory
    #[arg(long, value_name = "DIR")]
    out_dir: Option<PathBuf>,

    /// Write the region report as an XLSX workbook
    #[arg(long, value_name = "FILE")]
    report_xlsx: Option<PathBuf>,

    /// Write the region report as CSV
    #[arg(long, value_name = "FILE")]
    report_csv: Option<PathBuf>,

    /// Write the region report as JSON
    #[arg(long, value_name = "FILE")]
    report_json: Option<PathBuf>,

    /// Print every polygon and its vertices
    #[arg(long)]
    dump: bool,

    /// Store the effective configuration as the per-user config
    #[arg(long)]
    save_config: bool,

    /// Canvas width for the live view
    #[arg(long, default_value_t = 1280.0)]
    width: f32,

    /// Canvas height for the live view
    #[arg(long, default_value_t = 720.0)]
    height: f32,

    /// Log level override: error, warn, info, debug, trace
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<LogLevel>,
}

fn load_config(path: Option<&PathBuf>) -> Result<EngineConfig, ConfigError> {
    match path {
        Some(path) => EngineConfig::load(path),
        None => Ok(EngineConfig::load_from_default_path().unwrap_or_default()),
    }
}

fn run(args: CliArgs, config: EngineConfig) -> weldmark::Result<()> {
    let mut engine = AnnotationEngine::new(config, CanvasSize::new(args.width, args.height, 1.0))?;
    engine.on_annotations_changed(Box::new(|polygons| {
        log::debug!("{} polygon(s) annotated", polygons.len());
    }));

    engine.load_image_file(&args.image)?;

    if let Some(path) = &args.predictions {
        let payload = std::fs::read_to_string(path)?;
        let added = engine.ingest_payload(&payload)?;
        log::info!("Added {} polygon(s) from {}", added, path.display());
    }

    if args.dump {
        print!("{}", engine.debug_dump());
    }

    let (image_path, xlsx_path) = match &args.out_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            (
                args.output_png.clone().or_else(|| Some(dir.join(IMAGE_FILENAME))),
                args.report_xlsx.clone().or_else(|| Some(dir.join(REPORT_FILENAME))),
            )
        }
        None => (args.output_png.clone(), args.report_xlsx.clone()),
    };

    if let Some(path) = &image_path {
        if let Some(png) = engine.export_annotated_png()? {
            std::fs::write(path, png)?;
            log::info!("Wrote annotated image to {}", path.display());
        }
    }

    if let Some(path) = &xlsx_path {
        if let Some(workbook) = engine.export_report_xlsx()? {
            std::fs::write(path, workbook)?;
            log::info!("Wrote report workbook to {}", path.display());
        }
    }

    if let Some(path) = &args.frame_png {
        let png = engine.surface().encode_png()?;
        std::fs::write(path, png)?;
        log::info!("Wrote live view to {}", path.display());
    }

    if args.report_csv.is_some() || args.report_json.is_some() {
        if let Some(report) = engine.region_report() {
            if let Some(path) = &args.report_csv {
                std::fs::write(path, report.to_csv()?)?;
                log::info!("Wrote region report to {}", path.display());
            }
            if let Some(path) = &args.report_json {
                std::fs::write(path, report.to_json()?)?;
                log::info!("Wrote region report to {}", path.display());
            }
        }
    }

    engine.teardown();
    Ok(())
}

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let config = match load_config(args.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            match &args.config {
                Some(path) => eprintln!("error: could not read config '{}': {}", path.display(), e),
                None => eprintln!("error: {}", e),
            }
            return ExitCode::FAILURE;
        }
    };

    let level = args.log_level.unwrap_or(config.log_level);
    env_logger::Builder::new()
        .filter_level(level.to_level_filter())
        .parse_default_env()
        .init();

    if args.save_config {
        if let Err(e) = config.save_to_default_path() {
            eprintln!("error: could not save config: {}", e);
            return ExitCode::FAILURE;
        }
    }

    match run(args, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
