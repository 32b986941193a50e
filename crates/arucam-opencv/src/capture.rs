use crate::error::OpenCvBackendError;
use crate::frame::Frame;
use arucam::FrameSource;
use opencv::core::Mat;
use opencv::prelude::*;
use opencv::videoio::{self, VideoCapture};

/// Frames from a local camera device.
pub struct CameraSource {
    capture: VideoCapture,
    index: i32,
}

impl CameraSource {
    pub fn open(index: i32) -> Result<Self, OpenCvBackendError> {
        let capture = VideoCapture::new(index, videoio::CAP_ANY)?;
        if !capture.is_opened()? {
            return Err(OpenCvBackendError::CameraUnavailable { index });
        }
        log::info!("opened camera {index}");
        Ok(Self { capture, index })
    }

    pub fn index(&self) -> i32 {
        self.index
    }
}

impl FrameSource for CameraSource {
    type Frame = Frame;

    fn grab(&mut self) -> Option<Frame> {
        let mut mat = Mat::default();
        match self.capture.read(&mut mat) {
            Ok(true) if !mat.empty() => Some(Frame::new(mat)),
            Ok(_) => {
                log::info!("camera {}: no more frames", self.index);
                None
            }
            Err(e) => {
                log::warn!("camera {}: read failed: {e}", self.index);
                None
            }
        }
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        if let Err(e) = self.capture.release() {
            log::warn!("camera {}: release failed: {e}", self.index);
        }
    }
}
