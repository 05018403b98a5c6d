//! Head pointer trace replay.
//!
//! Feeds a recorded landmark trace through the pipeline as a camera would and
//! prints the resulting cursor moves and clicks.

use anyhow::{bail, Context, Result};
use clap::Parser;
use head_pointer::{
    calibration::CalibrationStep,
    config::Config,
    constants::DEFAULT_QUEUE_CAPACITY,
    frame_queue::{self, FrameInput},
    mapping::{ScreenPoint, ScreenRect},
    pipeline::{FrameOutput, Pipeline},
    profile::{CalibrationProfile, ClickMapping},
    trace::load_trace,
};
use log::{info, warn};
use std::{
    path::PathBuf,
    thread,
    time::{Duration, Instant},
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<PathBuf>,

    /// Calibration profile record overriding the config's profile
    #[arg(short, long)]
    profile: Option<PathBuf>,

    /// Click mapping record overriding the config's mapping
    #[arg(long)]
    clicks: Option<PathBuf>,

    /// Landmark trace to replay (YAML or JSON)
    #[arg(short, long)]
    trace: Option<PathBuf>,

    /// Target screen as WIDTHxHEIGHT or WIDTHxHEIGHT+X+Y
    #[arg(short, long, value_parser = parse_screen)]
    screen: Option<ScreenRect>,

    /// Run a calibration at the start of the trace
    #[arg(long)]
    calibrate: bool,

    /// Write the calibrated profile here
    #[arg(long, requires = "calibrate")]
    save_profile: Option<PathBuf>,

    /// Frames buffered between the trace reader and the pipeline
    #[arg(long, default_value_t = DEFAULT_QUEUE_CAPACITY)]
    queue_capacity: usize,

    /// Replay as fast as possible instead of at the recorded pace
    #[arg(long)]
    fast: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,
}

fn parse_screen(value: &str) -> std::result::Result<ScreenRect, String> {
    let (size, offset) = match value.split_once('+') {
        Some((size, offset)) => (size, Some(offset)),
        None => (value, None),
    };
    let (width, height) = size
        .split_once('x')
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{value}'"))?;
    let width: u32 = width.parse().map_err(|e| format!("bad width '{width}': {e}"))?;
    let height: u32 = height.parse().map_err(|e| format!("bad height '{height}': {e}"))?;

    let (x, y) = match offset {
        Some(offset) => {
            let (x, y) = offset
                .split_once('+')
                .ok_or_else(|| format!("expected +X+Y offset, got '+{offset}'"))?;
            (
                x.parse().map_err(|e| format!("bad x offset '{x}': {e}"))?,
                y.parse().map_err(|e| format!("bad y offset '{y}': {e}"))?,
            )
        }
        None => (0, 0),
    };

    let screen = ScreenRect::new(x, y, width, height);
    screen.validate().map_err(|e| e.to_string())?;
    Ok(screen)
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            Config::from_file(path).with_context(|| format!("loading {}", path.display()))?
        }
        None => Config::default(),
    };

    if let Some(path) = &args.profile {
        config.profile = CalibrationProfile::from_file(path).with_context(|| format!("loading {}", path.display()))?;
    }
    if let Some(path) = &args.clicks {
        config.clicks = ClickMapping::from_file(path).with_context(|| format!("loading {}", path.display()))?;
    }
    if let Some(screen) = args.screen {
        config.screen = screen;
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn report(output: &FrameOutput, timestamp_s: f64, last: &mut Option<ScreenPoint>) {
    if *last != Some(output.position) {
        println!("{timestamp_s:.3} move {}", output.position);
        *last = Some(output.position);
    }
    if let Some(click) = output.click {
        println!("{timestamp_s:.3} click {:?}", click.kind);
    }
}

fn replay(pipeline: &mut Pipeline, frames: Vec<FrameInput>, capacity: usize, fast: bool) -> Result<()> {
    let mut last = None;

    if fast {
        for input in &frames {
            if let Some(output) = pipeline.process_frame(input.frame.as_ref(), input.timestamp_s) {
                report(&output, input.timestamp_s, &mut last);
            }
        }
        return Ok(());
    }

    let (sender, receiver) = frame_queue::channel(capacity);
    let producer = thread::spawn(move || {
        let start = Instant::now();
        let origin = frames.first().map_or(0.0, |f| f.timestamp_s);
        for input in frames {
            let due = Duration::from_secs_f64((input.timestamp_s - origin).max(0.0));
            if let Some(wait) = due.checked_sub(start.elapsed()) {
                thread::sleep(wait);
            }
            sender.push(input);
        }
        sender.close();
    });

    while !receiver.is_finished() {
        let Some(input) = receiver.recv_timeout(Duration::from_millis(100)) else {
            continue;
        };
        if let Some(output) = pipeline.process_frame(input.frame.as_ref(), input.timestamp_s) {
            report(&output, input.timestamp_s, &mut last);
        }
    }

    if producer.join().is_err() {
        bail!("trace reader thread panicked");
    }
    if receiver.dropped() > 0 {
        warn!("{} frames dropped by the frame queue", receiver.dropped());
    }
    Ok(())
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

    let config = load_config(&args)?;

    if args.print_config {
        print!("{}", serde_yaml::to_string(&config)?);
        return Ok(());
    }

    let Some(trace_path) = &args.trace else {
        bail!("no trace given, pass --trace <FILE>");
    };
    let frames = load_trace(trace_path).with_context(|| format!("loading {}", trace_path.display()))?;
    info!("Replaying {} frames from {}", frames.len(), trace_path.display());

    let mut pipeline = Pipeline::new(&config)?;
    if args.calibrate {
        pipeline.start_calibration();
    }

    replay(&mut pipeline, frames, args.queue_capacity, args.fast)?;

    if args.calibrate {
        if pipeline.is_calibrating() {
            let progress = pipeline.calibration_progress();
            warn!(
                "Trace ended during calibration ({}, {}/{} samples)",
                progress.step, progress.collected, progress.needed
            );
        } else if pipeline.calibration_progress().step != CalibrationStep::Complete {
            warn!("Calibration did not produce a profile");
        } else if let Some(path) = &args.save_profile {
            pipeline.profile().to_file(path)?;
            info!("Profile saved to {}", path.display());
        }
    }

    let stats = pipeline.stats();
    info!(
        "Done: {} frames, {} processed, {} dropped, {} without face, {} outliers, {} clicks",
        stats.frames_received,
        stats.frames_processed,
        stats.frames_dropped,
        stats.no_face_frames,
        stats.rejected_outliers,
        stats.clicks
    );

    Ok(())
}
