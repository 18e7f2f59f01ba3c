// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Synchronized capture demo.
//!
//! Captures rounds from one or more cameras until the frame count is reached
//! or Ctrl+C is pressed, optionally writing JPEG files per camera.
//!
//! ```text
//! cargo run --example capture -- --camera 0:left --camera 1:right --fps 30 --output /tmp/capture
//! cargo run --example capture -- --synthetic 2 --camera 0:a --camera 1:b --frames 10
//! ```

use clap::Parser;
use jepture::{
    backend::{
        argus::ArgusBackend,
        synthetic::{SyntheticBackend, SyntheticCamera},
        CaptureBackend,
    },
    config::{CameraRequest, CaptureConfig},
    jpeg::{FrameStamp, JpegFileStream},
    settings::SettingsOverlay,
    stream::CaptureStream,
    Error,
};
use signal_hook::{consts::SIGINT, flag};
use std::{
    path::PathBuf,
    process::ExitCode,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Instant,
};

/// Capture synchronized frames from multiple cameras
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Camera as ID:NAME, repeat for each camera (overrides --config)
    #[arg(short, long = "camera", value_parser = parse_camera)]
    cameras: Vec<CameraRequest>,

    /// JSON capture configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Capture resolution as WIDTHxHEIGHT
    #[arg(short, long, value_parser = parse_resolution)]
    resolution: Option<(u32, u32)>,

    /// Target frame rate
    #[arg(short, long)]
    fps: Option<f32>,

    /// Sensor mode for every camera instead of searching by frame rate
    #[arg(short, long)]
    mode: Option<u32>,

    /// Control override as KEY=VALUE, e.g. max_gain=8
    #[arg(short, long = "set", value_parser = parse_setting)]
    settings: Vec<(String, f64)>,

    /// Write JPEG files to OUTPUT/NAME/SEQUENCE.jpg
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of rounds to capture, 0 runs until Ctrl+C
    #[arg(short = 'n', long, default_value_t = 0)]
    frames: u64,

    /// Only process every Nth round, skipping the others
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
    every: u64,

    /// Use N in-memory cameras instead of the camera hardware
    #[arg(long, value_name = "N")]
    synthetic: Option<usize>,

    /// Enable verbose logging (use RUST_LOG=debug for more)
    #[arg(short, long)]
    verbose: bool,
}

fn parse_camera(s: &str) -> Result<CameraRequest, String> {
    let (id, name) = s
        .split_once(':')
        .ok_or_else(|| format!("expected ID:NAME, got '{}'", s))?;
    let id = id
        .parse()
        .map_err(|e| format!("invalid camera id '{}': {}", id, e))?;
    Ok(CameraRequest::new(id, name))
}

fn parse_resolution(s: &str) -> Result<(u32, u32), String> {
    let (width, height) = s
        .split_once('x')
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", s))?;
    let width = width
        .parse()
        .map_err(|e| format!("invalid width '{}': {}", width, e))?;
    let height = height
        .parse()
        .map_err(|e| format!("invalid height '{}': {}", height, e))?;
    Ok((width, height))
}

fn parse_setting(s: &str) -> Result<(String, f64), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    let value = value
        .parse()
        .map_err(|e| format!("invalid value for '{}': {}", key, e))?;
    Ok((key.to_string(), value))
}

fn init_logging(verbose: bool) {
    let env = env_logger::Env::default();
    let env = if verbose {
        env.default_filter_or("debug")
    } else {
        env.default_filter_or("info")
    };

    env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .init();
}

fn build_config(args: &Args) -> Result<CaptureConfig, Error> {
    let mut config = match &args.config {
        Some(path) => CaptureConfig::from_json_file(path)?,
        None => CaptureConfig::new(Vec::new()),
    };

    if !args.cameras.is_empty() {
        config.cameras = args.cameras.clone();
    }
    if let Some((width, height)) = args.resolution {
        config = config.with_resolution(width, height);
    }
    if let Some(fps) = args.fps {
        config = config.with_fps(fps);
    }
    if let Some(mode) = args.mode {
        config = config.with_sensor_mode(mode);
    }
    if !args.settings.is_empty() {
        let mut overlay = config.settings.unwrap_or_default();
        for (key, value) in &args.settings {
            if !overlay.set(key, *value) {
                log::warn!(
                    "ignoring unknown setting '{}', known settings: {}",
                    key,
                    SettingsOverlay::KEYS.join(", ")
                );
            }
        }
        config = config.with_settings(overlay);
    }

    Ok(config)
}

/// Pumps rounds through either a JPEG file writer or the bare frame pump.
enum Pump<B: CaptureBackend> {
    Files(JpegFileStream<B>),
    Frames(CaptureStream<B>),
}

impl<B: CaptureBackend> Pump<B> {
    fn next(&mut self, skip: bool) -> Result<Vec<FrameStamp>, Error> {
        match self {
            Pump::Files(stream) => stream.next(skip),
            Pump::Frames(stream) => Ok(stream
                .next(skip)?
                .iter()
                .map(|record| FrameStamp {
                    sequence_number: record.sequence_number,
                    timestamp: record.timestamp,
                })
                .collect()),
        }
    }

    fn names(&self) -> Vec<String> {
        let stream = match self {
            Pump::Files(stream) => stream.stream(),
            Pump::Frames(stream) => stream,
        };
        stream.names().into_iter().map(str::to_string).collect()
    }
}

fn run<B: CaptureBackend>(
    backend: B,
    config: &CaptureConfig,
    args: &Args,
    term: &AtomicBool,
) -> Result<(), Error> {
    let mut pump = match &args.output {
        Some(dir) => Pump::Files(JpegFileStream::open(backend, config, dir)?),
        None => Pump::Frames(CaptureStream::open(backend, config)?),
    };
    let names = pump.names();

    let start = Instant::now();
    let mut rounds = 0u64;
    while !term.load(Ordering::Relaxed) && (args.frames == 0 || rounds < args.frames) {
        let skip = rounds % args.every != 0;
        let stamps = pump.next(skip)?;
        rounds += 1;

        if !skip {
            let line: Vec<String> = names
                .iter()
                .zip(&stamps)
                .map(|(name, stamp)| {
                    format!("{}#{}@{}", name, stamp.sequence_number, stamp.timestamp)
                })
                .collect();
            log::info!("round {}: {}", rounds, line.join(" "));
        }
    }

    let elapsed = start.elapsed().as_secs_f64();
    if elapsed > 0.0 {
        log::info!(
            "captured {} rounds in {:.2}s ({:.1} rounds/s)",
            rounds,
            elapsed,
            rounds as f64 / elapsed
        );
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    let term = Arc::new(AtomicBool::new(false));
    if let Err(e) = flag::register(SIGINT, Arc::clone(&term)) {
        log::error!("failed to register signal handler: {}", e);
        return ExitCode::FAILURE;
    }

    let result = build_config(&args).and_then(|config| match args.synthetic {
        Some(count) => run(
            SyntheticBackend::new(vec![SyntheticCamera::default(); count]),
            &config,
            &args,
            &term,
        ),
        None => run(ArgusBackend::new()?, &config, &args, &term),
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
