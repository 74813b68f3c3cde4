//! Gaze estimation command-line tool for replaying recorded pupil data.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gaze_estimation::{
    app::{OverlayOptions, ReplayApp},
    config::{Config, EXAMPLE_CONFIG},
};
use log::{info, warn};
use std::io::Write;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long, global = true)]
    config: Option<String>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fit the eye globe from a JSON-lines recording of pupil ellipses
    FitGlobe {
        /// Recording with one `{t, center, axes, angle, confidence}` per line
        #[arg(short, long)]
        input: String,

        /// Eye camera frame width (px)
        #[arg(long, default_value = "640")]
        width: f64,

        /// Eye camera frame height (px)
        #[arg(long, default_value = "480")]
        height: f64,
    },

    /// Fit a calibration from a JSON array of `{pupil, world}` pairs
    Calibrate {
        /// Calibration pairs file
        #[arg(short, long)]
        pairs: String,

        /// Output calibration file
        #[arg(short, long, default_value = "calibration.json")]
        output: String,
    },

    /// Map a JSON-lines recording of `{t, pupil}` samples to canvas coordinates
    Map {
        /// Calibration file
        #[arg(short, long, default_value = "calibration.json")]
        calibration: String,

        /// Recording with one `{t, pupil}` per line
        #[arg(short, long)]
        input: String,

        /// Write a heatmap overlay PNG to this path
        #[arg(long)]
        overlay: Option<String>,

        /// Overlay width (px)
        #[arg(long, default_value = "1280")]
        overlay_width: u32,
    },

    /// Print an example configuration file
    ExampleConfig,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logger
    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    // Load configuration if provided
    let config = if let Some(config_path) = &args.config {
        info!("Loading configuration from: {}", config_path);
        match Config::from_file(config_path) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!("Failed to load config file: {}. Using defaults.", e);
                Config::default()
            }
        }
    } else {
        Config::default()
    };

    let app = ReplayApp::new(config).context("Invalid configuration")?;

    match args.command {
        Command::FitGlobe { input, width, height } => {
            let report = app
                .fit_globe(&input, width, height)
                .with_context(|| format!("Failed to replay {input}"))?;
            let metrics = report.metrics;
            println!(
                "Rays: {}  Intersections: {}  Coverage: {:.0}%  Ready: {}{}",
                metrics.ray_count,
                metrics.intersection_count,
                metrics.angular_coverage,
                metrics.is_ready,
                if report.timed_out { " (timed out)" } else { "" }
            );
            println!("Sectors: {:?}", metrics.sectors);
            match report.globe {
                Some(globe) => println!(
                    "Globe center: ({:.1}, {:.1})  radius: {:.1}px{}",
                    globe.center.0,
                    globe.center.1,
                    globe.radius,
                    if !globe.is_plausible() {
                        "  [implausible radius]"
                    } else if globe.is_oversized() {
                        "  [oversized]"
                    } else {
                        ""
                    }
                ),
                None => println!("Globe fit failed: no convergence"),
            }
        }
        Command::Calibrate { pairs, output } => {
            let rmse = app
                .calibrate(&pairs, &output)
                .with_context(|| format!("Calibration from {pairs} failed"))?;
            println!("Calibration saved to {output} (RMSE: {rmse:.3})");
        }
        Command::Map {
            calibration,
            input,
            overlay,
            overlay_width,
        } => {
            let overlay = overlay.map(|path| OverlayOptions {
                path,
                width: overlay_width,
            });
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            let mapped = app
                .map(&calibration, &input, overlay.as_ref(), &mut out)
                .with_context(|| format!("Failed to map {input}"))?;
            out.flush()?;
            info!("{} samples reached the canvas", mapped);
        }
        Command::ExampleConfig => {
            print!("{EXAMPLE_CONFIG}");
        }
    }

    Ok(())
}
