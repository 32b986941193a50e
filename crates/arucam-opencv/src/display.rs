use crate::error::OpenCvBackendError;
use crate::frame::Frame;
use arucam::aruco::BackendError;
use arucam::FrameSink;
use opencv::highgui;

/// A `highgui` window; key presses are polled for one millisecond per frame.
pub struct WindowSink {
    title: String,
}

impl WindowSink {
    pub fn open(title: impl Into<String>) -> Result<Self, OpenCvBackendError> {
        let title = title.into();
        highgui::named_window(&title, highgui::WINDOW_AUTOSIZE)?;
        Ok(Self { title })
    }

    pub fn title(&self) -> &str {
        &self.title
    }
}

impl FrameSink<Frame> for WindowSink {
    fn show(&mut self, frame: &Frame) -> Result<(), BackendError> {
        highgui::imshow(&self.title, frame.mat())?;
        Ok(())
    }

    fn poll_key(&mut self) -> Result<Option<i32>, BackendError> {
        let key = highgui::wait_key(1)?;
        Ok((key >= 0).then_some(key))
    }
}

impl Drop for WindowSink {
    fn drop(&mut self) {
        if let Err(e) = highgui::destroy_all_windows() {
            log::warn!("closing window {:?} failed: {e}", self.title);
        }
    }
}
