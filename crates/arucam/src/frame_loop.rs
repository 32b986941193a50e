//! Acquire → detect → annotate → show, until the stream ends or a key is hit.

use crate::canvas::Canvas;
use crate::composite::{CompositeOutcome, PlanarCompositor};
use crate::overlay::{OverlayOptions, OverlayRenderer};
use crate::pose::{MarkerPose, PoseEstimator};
use arucam_aruco::{BackendError, DetectionResult, MarkerDetector};
use log::{debug, info, warn};
use serde::Serialize;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Produces frames until the device fails or the stream ends.
pub trait FrameSource {
    type Frame;

    /// `None` when no frame could be acquired. The loop stops on the first `None`.
    fn grab(&mut self) -> Option<Self::Frame>;
}

/// Displays annotated frames and reports key presses.
pub trait FrameSink<F> {
    fn show(&mut self, frame: &F) -> Result<(), BackendError>;

    /// Process window events for about a millisecond; `Some(key)` if one was pressed.
    fn poll_key(&mut self) -> Result<Option<i32>, BackendError>;
}

#[derive(thiserror::Error, Debug)]
pub enum FrameLoopError {
    #[error("marker detection failed: {0}")]
    Detect(#[source] BackendError),
    #[error("drawing on frame failed: {0}")]
    Render(#[source] BackendError),
    #[error("displaying frame failed: {0}")]
    Display(#[source] BackendError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum StopReason {
    /// The source returned no frame.
    EndOfStream,
    /// A key was pressed in the display window.
    KeyPressed(i32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum LoopState {
    Running,
    Stopped(StopReason),
}

/// What happened to one frame.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct FrameReport {
    pub markers: usize,
    pub rejected: usize,
    /// Poses of the markers whose pose could be estimated, keyed by id.
    pub poses: Vec<(u32, MarkerPose)>,
    pub composited: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct LoopSummary {
    pub frames: usize,
    pub markers: usize,
    pub stop_reason: StopReason,
}

/// Per-frame annotation: overlay always, pose and compositing when configured.
#[derive(Clone, Debug)]
pub struct FramePipeline<I> {
    overlay: OverlayRenderer,
    pose: Option<PoseEstimator>,
    compositor: Option<PlanarCompositor<I>>,
}

impl<I> FramePipeline<I> {
    pub fn new(overlay: OverlayOptions) -> Self {
        Self {
            overlay: OverlayRenderer::new(overlay),
            pose: None,
            compositor: None,
        }
    }

    pub fn with_pose(mut self, estimator: PoseEstimator) -> Self {
        self.pose = Some(estimator);
        self
    }

    pub fn with_compositor(mut self, compositor: PlanarCompositor<I>) -> Self {
        self.compositor = Some(compositor);
        self
    }

    /// Annotate `canvas` for every detected marker, in detection order.
    ///
    /// For each marker: overlay, then axes and distance, then the composited
    /// image. Markers whose pose cannot be estimated are logged and keep
    /// their overlay.
    pub fn process<C>(
        &self,
        canvas: &mut C,
        detections: &DetectionResult,
    ) -> Result<FrameReport, FrameLoopError>
    where
        C: Canvas<Image = I>,
    {
        let mut report = FrameReport {
            markers: detections.len(),
            rejected: detections.rejected.len(),
            ..FrameReport::default()
        };

        for marker in &detections.markers {
            self.overlay
                .draw(canvas, &marker.quad, marker.id)
                .map_err(FrameLoopError::Render)?;

            if let Some(estimator) = &self.pose {
                match estimator.estimate_single(&marker.quad) {
                    Ok(pose) => {
                        estimator
                            .render_axes(canvas, &pose)
                            .map_err(FrameLoopError::Render)?;
                        estimator
                            .render_distance(canvas, &pose, &marker.quad)
                            .map_err(FrameLoopError::Render)?;
                        report.poses.push((marker.id, pose));
                    }
                    Err(e) => warn!("marker {}: no pose ({e})", marker.id),
                }
            }

            if let Some(compositor) = &self.compositor {
                let outcome = compositor
                    .composite(canvas, &marker.quad)
                    .map_err(FrameLoopError::Render)?;
                if outcome == CompositeOutcome::Composited {
                    report.composited += 1;
                }
            }
        }
        Ok(report)
    }
}

/// The `Running` → `Stopped` state machine driving one source, detector and sink.
pub struct FrameLoop<S, D, K, I> {
    source: S,
    detector: D,
    sink: K,
    pipeline: FramePipeline<I>,
    state: LoopState,
    frames: usize,
    markers: usize,
}

impl<S, D, K, I> FrameLoop<S, D, K, I>
where
    S: FrameSource,
    S::Frame: Canvas<Image = I>,
    D: MarkerDetector<S::Frame>,
    K: FrameSink<S::Frame>,
{
    pub fn new(source: S, detector: D, sink: K, pipeline: FramePipeline<I>) -> Self {
        Self {
            source,
            detector,
            sink,
            pipeline,
            state: LoopState::Running,
            frames: 0,
            markers: 0,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Run one iteration. Once stopped, further calls do nothing.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self), fields(frame = self.frames))
    )]
    pub fn step(&mut self) -> Result<LoopState, FrameLoopError> {
        if let LoopState::Stopped(_) = self.state {
            return Ok(self.state);
        }

        let Some(mut frame) = self.source.grab() else {
            self.state = LoopState::Stopped(StopReason::EndOfStream);
            return Ok(self.state);
        };

        let detections = self
            .detector
            .detect(&frame)
            .map_err(FrameLoopError::Detect)?;
        let report = if detections.is_empty() {
            FrameReport {
                rejected: detections.rejected.len(),
                ..FrameReport::default()
            }
        } else {
            self.pipeline.process(&mut frame, &detections)?
        };
        debug!(
            "frame {}: {} marker(s), {} rejected, {} pose(s), {} composited",
            self.frames,
            report.markers,
            report.rejected,
            report.poses.len(),
            report.composited
        );
        self.frames += 1;
        self.markers += report.markers;

        self.sink.show(&frame).map_err(FrameLoopError::Display)?;
        if let Some(key) = self.sink.poll_key().map_err(FrameLoopError::Display)? {
            self.state = LoopState::Stopped(StopReason::KeyPressed(key));
        }
        Ok(self.state)
    }

    /// Step until stopped.
    pub fn run(&mut self) -> Result<LoopSummary, FrameLoopError> {
        loop {
            if let LoopState::Stopped(stop_reason) = self.step()? {
                let summary = LoopSummary {
                    frames: self.frames,
                    markers: self.markers,
                    stop_reason,
                };
                info!(
                    "stopped after {} frame(s), {} marker(s): {:?}",
                    summary.frames, summary.markers, summary.stop_reason
                );
                return Ok(summary);
            }
        }
    }
}
