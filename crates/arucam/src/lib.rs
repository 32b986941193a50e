//! High-level facade crate for the `arucam-*` workspace.
//!
//! This crate provides:
//! - re-exports of the geometry core and the dictionary registry
//! - the backend seams ([`Canvas`], [`FrameSource`], [`FrameSink`], and
//!   [`aruco::MarkerDetector`]) a vision library plugs into
//! - overlay drawing, marker pose estimation and planar compositing on top of
//!   those seams
//! - the [`FrameLoop`] state machine that ties them together
//!
//! ## Quickstart
//!
//! ```no_run
//! use arucam::{FramePipeline, OverlayOptions, PoseEstimator};
//! use arucam::core::CameraCalibration;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let calib = CameraCalibration::load_json("calibration.json")?;
//! let pose = PoseEstimator::new(calib, 50.0)?;
//! let pipeline: FramePipeline<()> = FramePipeline::new(OverlayOptions::default()).with_pose(pose);
//! # let _ = pipeline;
//! # Ok(())
//! # }
//! ```
//!
//! `arucam-opencv` implements the seams on top of OpenCV; `arucam-cli` wires
//! a camera, a detector and a window into a [`FrameLoop`].
//!
//! ## API map
//! - `arucam::core`: marker quads, corners, homographies, camera model, logger.
//! - `arucam::aruco`: predefined dictionaries and the detector trait.
//! - [`overlay`], [`pose`], [`composite`]: per-marker annotation.
//! - [`frame_loop`]: acquisition/display loop.
//! - [`config`]: the serializable run configuration.

pub use arucam_aruco as aruco;
pub use arucam_core as core;

pub mod canvas;
pub mod composite;
pub mod config;
pub mod frame_loop;
pub mod overlay;
pub mod pose;

pub use canvas::{Canvas, Color, ImageSize, Stroke, TextStyle};
pub use composite::{CompositeError, CompositeOutcome, PlanarCompositor};
pub use config::{ConfigError, RunConfig};
pub use frame_loop::{
    FrameLoop, FrameLoopError, FramePipeline, FrameReport, FrameSink, FrameSource, LoopState,
    LoopSummary, StopReason,
};
pub use overlay::{OverlayOptions, OverlayRenderer};
pub use pose::{Distance, MarkerPose, PoseError, PoseEstimator, PoseOverlayOptions};
