//! OpenCV implementations of the `arucam` backend seams.
//!
//! - [`OpenCvDetector`]: `objdetect::ArucoDetector` behind
//!   [`arucam::aruco::MarkerDetector`].
//! - [`CameraSource`]: `videoio::VideoCapture` behind [`arucam::FrameSource`].
//! - [`WindowSink`]: a `highgui` window behind [`arucam::FrameSink`].
//! - [`Frame`]: a BGR `Mat` implementing [`arucam::Canvas`].
//!
//! Requires a system OpenCV (>= 4.7, for the `ArucoDetector` API).

mod capture;
mod detector;
mod display;
mod error;
mod frame;

pub use capture::CameraSource;
pub use detector::OpenCvDetector;
pub use display::WindowSink;
pub use error::OpenCvBackendError;
pub use frame::{load_augmentation, read_image, Frame};

pub use opencv;
