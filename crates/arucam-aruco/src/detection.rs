//! Per-frame detection output and the detector seam.

use arucam_core::MarkerQuad;
use serde::{Deserialize, Serialize};

/// Error type returned by vision backends (detector, camera, display).
pub type BackendError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// One decoded marker.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerDetection {
    pub id: u32,
    pub quad: MarkerQuad,
}

/// Everything a detector reports for one frame.
///
/// `markers` keeps the detector's order; `rejected` holds candidate quads
/// that looked like markers but did not decode (useful for debugging).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub markers: Vec<MarkerDetection>,
    pub rejected: Vec<MarkerQuad>,
}

impl DetectionResult {
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    /// Quads of all decoded markers, in detection order.
    pub fn quads(&self) -> Vec<MarkerQuad> {
        self.markers.iter().map(|m| m.quad).collect()
    }

    /// Ids of all decoded markers, in detection order.
    pub fn ids(&self) -> Vec<u32> {
        self.markers.iter().map(|m| m.id).collect()
    }
}

/// Finds markers of one dictionary in frames of type `F`.
///
/// Implementations keep no state between calls: the result depends on the
/// frame only.
pub trait MarkerDetector<F> {
    fn detect(&self, frame: &F) -> Result<DetectionResult, BackendError>;
}

impl<F, D: MarkerDetector<F> + ?Sized> MarkerDetector<F> for &D {
    fn detect(&self, frame: &F) -> Result<DetectionResult, BackendError> {
        (**self).detect(frame)
    }
}
