//! ArUco/AprilTag dictionaries and the marker detector seam.
//!
//! This crate focuses on:
//! - the registry of predefined dictionaries a detector can be built with,
//! - the per-frame detection result (decoded quads + ids + rejected quads),
//! - the [`MarkerDetector`] trait implemented by vision backends.
//!
//! It does **not** decode markers itself; `arucam-opencv` provides the
//! OpenCV-backed detector.

pub mod builtins;
mod detection;
mod dictionary;

pub use builtins::{
    builtin_dictionary, builtin_names, DictionaryError, BUILTINS, DEFAULT_DICTIONARY,
    DICTIONARY_REFERENCE_URL,
};
pub use detection::{BackendError, DetectionResult, MarkerDetection, MarkerDetector};
pub use dictionary::{Dictionary, DictionaryFamily};
