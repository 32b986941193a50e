//! Run configuration: everything the CLI decides before the loop starts.

use crate::overlay::OverlayOptions;
use crate::pose::{PoseError, PoseEstimator, PoseOverlayOptions};
use arucam_aruco::{builtin_dictionary, Dictionary, DictionaryError, DEFAULT_DICTIONARY};
use arucam_core::{CalibrationError, CameraCalibration};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("a marker size is required when a calibration file is given")]
    MissingMarkerLength,
    #[error(transparent)]
    Dictionary(#[from] DictionaryError),
    #[error("failed to load calibration: {0}")]
    Calibration(#[from] CalibrationError),
    #[error(transparent)]
    Pose(#[from] PoseError),
    #[error("failed to read/write config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Predefined dictionary name, e.g. `DICT_4X4_50`.
    pub dictionary: String,
    /// Calibration `.npz` archive or JSON file; enables pose estimation.
    pub calibration: Option<PathBuf>,
    /// Marker side length, in the unit the translations are reported in.
    pub marker_length: Option<f64>,
    /// Image composited onto every detected marker.
    pub augment_image: Option<PathBuf>,
    pub camera_index: i32,
    pub window_title: String,
    pub overlay: OverlayOptions,
    pub pose_overlay: PoseOverlayOptions,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            dictionary: DEFAULT_DICTIONARY.to_string(),
            calibration: None,
            marker_length: None,
            augment_image: None,
            camera_index: 0,
            window_title: "Frame".to_string(),
            overlay: OverlayOptions::default(),
            pose_overlay: PoseOverlayOptions::default(),
        }
    }
}

impl RunConfig {
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Cross-field checks that do not touch the filesystem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.calibration.is_some() && self.marker_length.is_none() {
            return Err(ConfigError::MissingMarkerLength);
        }
        Ok(())
    }

    pub fn dictionary(&self) -> Result<Dictionary, DictionaryError> {
        builtin_dictionary(&self.dictionary)
    }

    /// Load the calibration and build the estimator, if pose estimation is enabled.
    pub fn pose_estimator(&self) -> Result<Option<PoseEstimator>, ConfigError> {
        self.validate()?;
        let (Some(path), Some(length)) = (&self.calibration, self.marker_length) else {
            return Ok(None);
        };
        let calibration = CameraCalibration::load(path)?;
        log::info!("loaded calibration from {}", path.display());
        let estimator = PoseEstimator::new(calibration, length)?.with_overlay(self.pose_overlay);
        Ok(Some(estimator))
    }
}
