use super::FrameSource;
use crate::error::PipelineError;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use image::RgbImage;
use std::time::Duration;

/// Wraps a source with a dedicated reader thread so a wedged device
/// read can never block the session loop: `next_frame` waits at most
/// the configured timeout before declaring the device stalled.
///
/// The reader stays one frame ahead at most (a bounded channel of one),
/// so frames arrive in capture order with nothing dropped, and
/// end-of-stream and device errors are forwarded in sequence. Dropping
/// the guard closes the channel; a reader still parked inside the
/// device returns to a closed channel and exits, releasing the device
/// at that point.
pub struct WatchdogSource {
    frames: Receiver<Result<Option<RgbImage>, PipelineError>>,
    timeout: Duration,
    resolution: (u32, u32),
}

impl WatchdogSource {
    pub fn spawn(
        mut inner: Box<dyn FrameSource + Send>,
        timeout: Duration,
    ) -> Result<Self, PipelineError> {
        let resolution = inner.resolution();
        let (tx, rx) = bounded(1);

        std::thread::Builder::new()
            .name("cloak-reader".into())
            .spawn(move || loop {
                let item = inner.next_frame();
                let done = !matches!(item, Ok(Some(_)));
                if tx.send(item).is_err() || done {
                    return;
                }
            })
            .map_err(|e| PipelineError::Device(format!("failed to spawn frame reader: {e}")))?;

        Ok(Self {
            frames: rx,
            timeout,
            resolution,
        })
    }
}

impl FrameSource for WatchdogSource {
    fn next_frame(&mut self) -> Result<Option<RgbImage>, PipelineError> {
        match self.frames.recv_timeout(self.timeout) {
            Ok(item) => item,
            Err(RecvTimeoutError::Timeout) => Err(PipelineError::Device(format!(
                "frame acquisition stalled past {} ms",
                self.timeout.as_millis()
            ))),
            Err(RecvTimeoutError::Disconnected) => {
                Err(PipelineError::Device("frame reader exited".into()))
            }
        }
    }

    fn resolution(&self) -> (u32, u32) {
        self.resolution
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    struct ScriptedSource {
        frames: Vec<RgbImage>,
    }

    impl FrameSource for ScriptedSource {
        fn next_frame(&mut self) -> Result<Option<RgbImage>, PipelineError> {
            if self.frames.is_empty() {
                Ok(None)
            } else {
                Ok(Some(self.frames.remove(0)))
            }
        }

        fn resolution(&self) -> (u32, u32) {
            (4, 4)
        }
    }

    /// Source whose reads wedge, standing in for a hung camera driver.
    struct HangingSource;

    impl FrameSource for HangingSource {
        fn next_frame(&mut self) -> Result<Option<RgbImage>, PipelineError> {
            std::thread::sleep(Duration::from_secs(5));
            Ok(Some(RgbImage::new(4, 4)))
        }

        fn resolution(&self) -> (u32, u32) {
            (4, 4)
        }
    }

    #[test]
    fn frames_arrive_in_order_then_end_of_stream() {
        let frames = vec![
            RgbImage::from_pixel(4, 4, Rgb([1, 0, 0])),
            RgbImage::from_pixel(4, 4, Rgb([2, 0, 0])),
        ];
        let mut guard = WatchdogSource::spawn(
            Box::new(ScriptedSource { frames }),
            Duration::from_secs(1),
        )
        .unwrap();

        assert_eq!(
            guard.next_frame().unwrap().unwrap().get_pixel(0, 0),
            &Rgb([1, 0, 0])
        );
        assert_eq!(
            guard.next_frame().unwrap().unwrap().get_pixel(0, 0),
            &Rgb([2, 0, 0])
        );
        assert!(guard.next_frame().unwrap().is_none());
    }

    #[test]
    fn wedged_read_is_declared_stalled_within_the_bound() {
        let mut guard =
            WatchdogSource::spawn(Box::new(HangingSource), Duration::from_millis(50)).unwrap();

        let start = std::time::Instant::now();
        let err = guard.next_frame().unwrap_err();
        assert!(matches!(err, PipelineError::Device(_)));
        assert!(
            start.elapsed() < Duration::from_secs(1),
            "stall bound not honored: waited {:?}",
            start.elapsed()
        );
    }

    #[test]
    fn inner_device_error_is_forwarded() {
        struct FailingSource;
        impl FrameSource for FailingSource {
            fn next_frame(&mut self) -> Result<Option<RgbImage>, PipelineError> {
                Err(PipelineError::Device("unplugged".into()))
            }
            fn resolution(&self) -> (u32, u32) {
                (4, 4)
            }
        }

        let mut guard =
            WatchdogSource::spawn(Box::new(FailingSource), Duration::from_secs(1)).unwrap();
        assert!(matches!(
            guard.next_frame(),
            Err(PipelineError::Device(msg)) if msg == "unplugged"
        ));
    }
}
