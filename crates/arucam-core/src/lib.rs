//! Core types and utilities for arucam.
//!
//! This crate is purely geometric. It does *not* depend on any image type or
//! vision backend: marker quads come in as plain corner arrays, and
//! everything that touches pixels lives in the backend crates.

mod calibration_io;
mod camera;
mod geometry;
mod homography;
mod logger;

pub use calibration_io::CalibrationError;
pub use camera::{CameraCalibration, Distortion};
pub use geometry::{center, corners, edge_midpoints, Corners, GeometryError, MarkerQuad};
pub use homography::{homography_from_4pt, Homography};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
