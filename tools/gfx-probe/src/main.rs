//! Probe tool for the RustKit graphics device.
//!
//! Creates a device on a simulated canvas and either dumps what it
//! negotiated or renders a small smoke scene.
//!
//! ## Usage
//!
//! ```bash
//! # Capabilities of a WebGL1 mobile profile
//! gfx-probe --profile mali450 caps
//!
//! # Smoke render with device options from a file, compared to a golden
//! gfx-probe --config device.json smoke --output smoke.png --golden golden.png
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use rustkit_common::logging::{init_logging, LogConfig, LogFormat};
use rustkit_common::ResultExt;
use rustkit_gfx::{DeviceOptions, WebglGraphicsDevice};
use rustkit_webgl::{GpuProfile, HtmlCanvas};
use tracing::{info, warn};

mod image;
mod scene;

use image::Image;
use scene::SceneOptions;

#[derive(Parser)]
#[command(name = "gfx-probe")]
#[command(about = "Capability dump and smoke render for the RustKit graphics device")]
struct Cli {
    /// Simulated GPU
    #[arg(long, value_enum, default_value = "desktop")]
    profile: Profile,
    /// Device options as JSON
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, default_value = "256")]
    width: u32,
    #[arg(long, default_value = "256")]
    height: u32,
    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Profile {
    Desktop,
    Mali450,
    BrokenFloat,
    Webgl1,
}

impl Profile {
    fn gpu(self) -> GpuProfile {
        match self {
            Profile::Desktop => GpuProfile::desktop(),
            Profile::Mali450 => GpuProfile::mali_450(),
            Profile::BrokenFloat => GpuProfile::broken_float_targets(),
            Profile::Webgl1 => GpuProfile::desktop().webgl1_only(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print the negotiated context, extensions and capabilities as JSON
    Caps,

    /// Render the smoke scene and check the canvas readback
    Smoke {
        /// Write the canvas readback to this PNG
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Golden PNG to compare the readback against
        #[arg(short, long)]
        golden: Option<PathBuf>,
        /// Per-channel difference threshold (0-255)
        #[arg(short, long, default_value = "0")]
        threshold: u8,
        /// Identical draws submitted after the offscreen pass
        #[arg(long, default_value = "16")]
        draws: u32,
        /// Write the JSON report to this path instead of stdout
        #[arg(long)]
        report: Option<PathBuf>,
    },
}

#[derive(serde::Serialize)]
struct CapsReport<'a> {
    context_id: &'static str,
    webgl2: bool,
    extensions: &'a rustkit_gfx::Extensions,
    capabilities: &'a rustkit_gfx::DeviceCapabilities,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut log_config = if cli.verbose {
        LogConfig::debug()
    } else {
        LogConfig::default()
    };
    if cli.json_logs {
        log_config.format = LogFormat::Json;
    }
    init_logging(log_config);

    let options = match &cli.config {
        Some(path) => DeviceOptions::from_path(path)?,
        None => DeviceOptions::default(),
    };
    let canvas = HtmlCanvas::with_profile(cli.width, cli.height, cli.profile.gpu());
    let mut device = WebglGraphicsDevice::new(canvas, options)?;
    info!(
        context = device.context_id(),
        width = device.width(),
        height = device.height(),
        "Device created"
    );

    match cli.command {
        Commands::Caps => {
            let report = CapsReport {
                context_id: device.context_id(),
                webgl2: device.is_webgl2(),
                extensions: device.extensions(),
                capabilities: device.capabilities(),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Commands::Smoke {
            output,
            golden,
            threshold,
            draws,
            report,
        } => {
            let scene_options = SceneOptions {
                background: [0.1, 0.2, 0.3, 1.0],
                accent: [1.0, 0.5, 0.0, 1.0],
                draws,
            };
            let (readback, smoke) = scene::run(&mut device, scene_options)?;
            device.destroy();

            let json = serde_json::to_string_pretty(&smoke)?;
            match report {
                Some(path) => {
                    std::fs::write(&path, json).context("writing smoke report")?;
                    println!("Report written to: {}", path.display());
                }
                None => println!("{json}"),
            }
            if let Some(path) = output {
                readback.save_png(&path).context("writing readback")?;
                println!("Readback written to: {}", path.display());
            }

            let mut failed = false;
            let expected = scene::to_bytes(scene_options.background);
            if readback.pixel(0, 0) != Some(expected) {
                warn!(?expected, actual = ?readback.pixel(0, 0), "Canvas clear did not land");
                failed = true;
            }
            if smoke.target_pixel != scene::to_bytes(scene_options.accent) {
                warn!(actual = ?smoke.target_pixel, "Offscreen pass clear did not land");
                failed = true;
            }
            if let Some(error) = &smoke.gl_error {
                warn!(%error, "Context reported an error during the scene");
                failed = true;
            }
            if let Some(path) = golden {
                let golden = Image::load_png(&path).context("reading golden image")?;
                let result = readback.compare(&golden, threshold)?;
                println!(
                    "Golden: {} diff pixels ({:.2}%), max diff {}",
                    result.diff_pixels, result.diff_percent, result.max_diff
                );
                failed |= !result.matches;
            }
            if failed {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
