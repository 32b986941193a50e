//! Dictionary metadata.

use serde::{Deserialize, Serialize};

/// Marker encoding family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DictionaryFamily {
    /// Generated ArUco dictionaries (`DICT_NxN_M`).
    Aruco,
    /// The 1024-code dictionary of the original ArUco library.
    ArucoOriginal,
    /// AprilTag families.
    AprilTag,
}

/// A predefined ArUco/AprilTag-style dictionary.
///
/// This is a handle, not the code table: the codes themselves live in the
/// vision backend, which resolves `opencv_code` to its own dictionary object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Dictionary {
    /// Name as used on the command line, e.g. `DICT_4X4_50`.
    pub name: &'static str,
    pub family: DictionaryFamily,
    /// OpenCV `PredefinedDictionaryType` value.
    pub opencv_code: i32,
    /// Marker side length (number of inner bits per side).
    pub marker_size: usize,
    /// Number of distinct marker ids.
    pub code_count: usize,
}

impl Dictionary {
    /// Total number of inner bits per marker.
    #[inline]
    pub fn bit_count(&self) -> usize {
        self.marker_size * self.marker_size
    }

    /// Whether `id` is a valid marker id in this dictionary.
    #[inline]
    pub fn contains_id(&self, id: u32) -> bool {
        (id as usize) < self.code_count
    }
}
