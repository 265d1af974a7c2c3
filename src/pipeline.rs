use crate::background::BackgroundModel;
use crate::capture::{FrameSource, WatchdogSource};
use crate::composite::composite;
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::output::FrameSink;
use crate::segmentation::{ColorSegmenter, MaskRefiner};
use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Run state of the pipeline, rendered as the status string the
/// control surface displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Stopped,
    Running,
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Stopped => "stopped",
            PipelineState::Running => "running",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opens the frame source for a session. Called once per `start()`, so
/// the device is acquired on start and released when the session ends.
pub type SourceFactory =
    Box<dyn FnMut() -> Result<Box<dyn FrameSource + Send>, PipelineError> + Send>;

/// Opens the output sink for a session, given the session resolution.
pub type SinkFactory =
    Box<dyn FnMut(u32, u32) -> Result<Box<dyn FrameSink + Send>, PipelineError> + Send>;

/// Commands observed by the worker at frame boundaries.
enum Command {
    Stop,
    RefreshBackground,
}

struct Shared {
    state: PipelineState,
    last_error: Option<PipelineError>,
}

/// Owns the run/stopped state machine and drives the per-frame loop
/// (capture, segment, refine, composite, emit) on a dedicated worker
/// thread.
///
/// This is the one entity an external control surface talks to:
/// `start()` and `stop()` are idempotent and return the resulting
/// state, `refresh_background()` queues a background recapture, and
/// `take_last_error()` exposes why the last session died.
pub struct PipelineController {
    config: PipelineConfig,
    open_source: SourceFactory,
    open_sink: SinkFactory,
    shared: Arc<Mutex<Shared>>,
    commands: Option<Sender<Command>>,
    worker: Option<JoinHandle<()>>,
}

impl PipelineController {
    pub fn new(config: PipelineConfig, open_source: SourceFactory, open_sink: SinkFactory) -> Self {
        Self {
            config,
            open_source,
            open_sink,
            shared: Arc::new(Mutex::new(Shared {
                state: PipelineState::Stopped,
                last_error: None,
            })),
            commands: None,
            worker: None,
        }
    }

    /// Start a session: acquire the source, capture the background,
    /// open the sink, then hand everything to the worker loop.
    ///
    /// A no-op while already running. On any failure the state stays
    /// `Stopped` and the error is kept for `take_last_error()`.
    pub fn start(&mut self) -> PipelineState {
        if self.state() == PipelineState::Running {
            tracing::debug!("start requested but pipeline already running");
            return PipelineState::Running;
        }
        self.reap_worker();

        match self.start_session() {
            Ok(()) => PipelineState::Running,
            Err(e) => {
                tracing::error!("failed to start pipeline: {e}");
                self.shared.lock().last_error = Some(e);
                PipelineState::Stopped
            }
        }
    }

    fn start_session(&mut self) -> Result<(), PipelineError> {
        tracing::info!("Starting pipeline session");
        self.config.validate()?;
        self.shared.lock().last_error = None;

        // Reads go through the watchdog's reader thread, so every
        // next_frame() wait is bounded by the stall timeout even when
        // the device wedges mid-read.
        let raw_source = (self.open_source)()?;
        let mut source: Box<dyn FrameSource + Send> = Box::new(WatchdogSource::spawn(
            raw_source,
            self.config.stall_timeout,
        )?);

        // A fresh background every session: the operator stays out of
        // frame while start() runs the warmup burst.
        let mut background = BackgroundModel::new();
        background.capture(source.as_mut(), self.config.warmup_frames)?;
        let (width, height) = background
            .current()
            .map(|frame| frame.dimensions())?;

        let sink = (self.open_sink)(width, height)?;

        let (tx, rx) = unbounded();
        let shared = Arc::clone(&self.shared);
        let config = self.config.clone();

        // Marked running before the spawn so a worker that exits
        // immediately cannot be overwritten back to Running.
        shared.lock().state = PipelineState::Running;
        let handle = std::thread::Builder::new()
            .name("cloak-pipeline".into())
            .spawn(move || run_session(source, sink, background, config, shared, rx))
            .map_err(|e| {
                self.shared.lock().state = PipelineState::Stopped;
                PipelineError::Device(format!("failed to spawn worker: {e}"))
            })?;

        self.commands = Some(tx);
        self.worker = Some(handle);
        Ok(())
    }

    /// Stop the session, joining the worker. Idempotent.
    pub fn stop(&mut self) -> PipelineState {
        if let Some(tx) = self.commands.take() {
            let _ = tx.send(Command::Stop);
        }
        self.reap_worker();
        let mut shared = self.shared.lock();
        shared.state = PipelineState::Stopped;
        tracing::info!("Pipeline stopped");
        PipelineState::Stopped
    }

    /// Queue a background recapture, applied by the worker at the next
    /// frame boundary. A no-op while stopped: every `start()` captures
    /// a fresh background anyway.
    pub fn refresh_background(&self) {
        match &self.commands {
            Some(tx) if self.state() == PipelineState::Running => {
                let _ = tx.send(Command::RefreshBackground);
            }
            _ => tracing::debug!("refresh requested while stopped; ignored"),
        }
    }

    /// Current state, reflecting worker exits (end of stream, errors)
    /// as well as explicit stop requests.
    pub fn state(&self) -> PipelineState {
        self.shared.lock().state
    }

    /// Why the last session ended abnormally, if it did. Clears the
    /// stored error.
    pub fn take_last_error(&self) -> Option<PipelineError> {
        self.shared.lock().last_error.take()
    }

    fn reap_worker(&mut self) {
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for PipelineController {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_session(
    mut source: Box<dyn FrameSource + Send>,
    mut sink: Box<dyn FrameSink + Send>,
    mut background: BackgroundModel,
    config: PipelineConfig,
    shared: Arc<Mutex<Shared>>,
    commands: Receiver<Command>,
) {
    let result = session_loop(
        source.as_mut(),
        sink.as_mut(),
        &mut background,
        &config,
        &commands,
    );

    let mut sh = shared.lock();
    if let Err(e) = &result {
        tracing::error!("pipeline session failed: {e}");
        sh.last_error = Some(e.clone());
    }
    sh.state = PipelineState::Stopped;
    // Source and sink drop here, releasing the camera and the device
    // file on every exit path.
}

fn session_loop(
    source: &mut dyn FrameSource,
    sink: &mut dyn FrameSink,
    background: &mut BackgroundModel,
    config: &PipelineConfig,
    commands: &Receiver<Command>,
) -> Result<(), PipelineError> {
    let segmenter = ColorSegmenter::new(config.color_ranges.clone());
    let refiner = MaskRefiner::new(config.blur_kernel, config.open_kernel, config.dilate_kernel)?;
    let session_dims = background.current()?.dimensions();
    let frame_duration = Duration::from_secs_f32(1.0 / config.target_fps.max(1) as f32);

    let mut frame_count = 0u64;
    let mut total_segment = Duration::ZERO;
    let mut total_refine = Duration::ZERO;
    let mut total_emit = Duration::ZERO;

    tracing::info!(
        "Pipeline loop running at {}x{}, {} color range(s)",
        session_dims.0,
        session_dims.1,
        config.color_ranges.len()
    );

    loop {
        // Frame boundary: drain pending commands before pulling the
        // next frame, so stop is observed promptly and never mid-frame.
        loop {
            match commands.try_recv() {
                Ok(Command::Stop) => {
                    tracing::info!("Stop requested after {} frames", frame_count);
                    return Ok(());
                }
                Ok(Command::RefreshBackground) => {
                    background.refresh(source, config.warmup_frames)?;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return Ok(()),
            }
        }

        let loop_start = Instant::now();
        let frame = match source.next_frame()? {
            Some(frame) => frame,
            None => {
                tracing::info!("Frame source ended after {} frames", frame_count);
                return Ok(());
            }
        };
        if frame.dimensions() != session_dims {
            return Err(PipelineError::dimension_mismatch(
                session_dims,
                frame.dimensions(),
            ));
        }

        let segment_start = Instant::now();
        let mut mask = segmenter.segment(&frame);
        total_segment += segment_start.elapsed();

        let refine_start = Instant::now();
        refiner.refine(&mut mask);
        total_refine += refine_start.elapsed();

        let output = composite(&frame, &mask, background.current()?)?;

        let emit_start = Instant::now();
        sink.write_frame(&output)?;
        total_emit += emit_start.elapsed();

        frame_count += 1;
        if frame_count % 30 == 0 {
            let avg = |d: Duration| d.as_secs_f64() * 1000.0 / frame_count as f64;
            tracing::info!(
                "Frame {}: segment={:.1}ms, refine={:.1}ms, emit={:.1}ms, cloak px={}",
                frame_count,
                avg(total_segment),
                avg(total_refine),
                avg(total_emit),
                mask.count_set()
            );
        }

        let elapsed = loop_start.elapsed();
        if elapsed < frame_duration {
            std::thread::sleep(frame_duration - elapsed);
        }
    }
}
