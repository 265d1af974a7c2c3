use anyhow::{Context, Result};
use clap::Parser;
use cloakfx::{
    ColorRange, FrameSink, FrameSource, Hsv, LoopbackSink, PipelineConfig, PipelineController,
    PipelineState, WebcamSource,
};
use std::io::BufRead;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input webcam device index
    #[arg(short, long, default_value_t = 0)]
    input_device: u32,

    /// Output v4l2loopback device path
    #[arg(short, long, default_value = "/dev/video10")]
    output_device: String,

    /// Cloak HSV range as LH,LS,LV:UH,US,UV (repeatable; hue 0-179).
    /// Defaults to the two sub-ranges covering red.
    #[arg(long = "range", value_parser = parse_range)]
    ranges: Vec<ColorRange>,

    /// Majority-blur kernel size (odd)
    #[arg(long, default_value_t = 7)]
    blur_kernel: usize,

    /// Morphological open kernel size
    #[arg(long, default_value_t = 5)]
    open_kernel: usize,

    /// Final dilate kernel size
    #[arg(long, default_value_t = 5)]
    dilate_kernel: usize,

    /// Background warmup frames (stay out of frame while these run)
    #[arg(long, default_value_t = 30)]
    warmup_frames: usize,

    /// Target frames per second
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

fn parse_range(s: &str) -> Result<ColorRange, String> {
    let (lower, upper) = s
        .split_once(':')
        .ok_or_else(|| format!("expected LH,LS,LV:UH,US,UV, got {s:?}"))?;
    let parse_hsv = |part: &str| -> Result<Hsv, String> {
        let values: Vec<u8> = part
            .split(',')
            .map(|v| v.trim().parse::<u8>().map_err(|e| format!("{v:?}: {e}")))
            .collect::<Result<_, _>>()?;
        match values[..] {
            [h, s, v] if h <= 179 => Ok(Hsv::new(h, s, v)),
            [h, ..] if h > 179 => Err(format!("hue {h} out of 0-179")),
            _ => Err(format!("expected three components in {part:?}")),
        }
    };
    ColorRange::new(parse_hsv(lower)?, parse_hsv(upper)?).map_err(|e| e.to_string())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    tracing::info!("cloakfx starting");

    let config = PipelineConfig {
        color_ranges: if args.ranges.is_empty() {
            cloakfx::default_red_ranges()
        } else {
            args.ranges.clone()
        },
        blur_kernel: args.blur_kernel,
        open_kernel: args.open_kernel,
        dilate_kernel: args.dilate_kernel,
        warmup_frames: args.warmup_frames,
        stall_timeout: Duration::from_secs(2),
        target_fps: args.fps,
    };

    let device_index = args.input_device;
    let output_device = args.output_device.clone();
    let mut controller = PipelineController::new(
        config,
        Box::new(move || {
            WebcamSource::open(device_index).map(|s| Box::new(s) as Box<dyn FrameSource + Send>)
        }),
        Box::new(move |width, height| {
            LoopbackSink::open(&output_device, width, height)
                .map(|s| Box::new(s) as Box<dyn FrameSink + Send>)
        }),
    );

    tracing::info!("Stay out of frame; capturing background");
    let state = controller.start();
    if state != PipelineState::Running {
        let reason = controller
            .take_last_error()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown error".into());
        anyhow::bail!("pipeline failed to start: {reason}");
    }

    tracing::info!("Cloak active; press Enter to stop");
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read stdin")?;

    controller.stop();
    if let Some(err) = controller.take_last_error() {
        tracing::warn!("session ended with error: {err}");
    }
    tracing::info!("cloakfx stopped");
    Ok(())
}
