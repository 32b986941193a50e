//! Registry of the predefined dictionaries the detector can be built with.

use crate::dictionary::{Dictionary, DictionaryFamily};

/// Where to look up the meaning of every dictionary name.
pub const DICTIONARY_REFERENCE_URL: &str =
    "https://docs.opencv.org/4.x/d1/d21/aruco__dictionary_8hpp.html";

/// Dictionary used when none is requested.
pub const DEFAULT_DICTIONARY: &str = "DICT_ARUCO_ORIGINAL";

/// Unknown dictionary names.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DictionaryError {
    #[error("unknown dictionary `{name}`")]
    Unknown { name: String },
}

const fn aruco(
    name: &'static str,
    opencv_code: i32,
    marker_size: usize,
    code_count: usize,
) -> Dictionary {
    Dictionary {
        name,
        family: DictionaryFamily::Aruco,
        opencv_code,
        marker_size,
        code_count,
    }
}

const fn apriltag(
    name: &'static str,
    opencv_code: i32,
    marker_size: usize,
    code_count: usize,
) -> Dictionary {
    Dictionary {
        name,
        family: DictionaryFamily::AprilTag,
        opencv_code,
        marker_size,
        code_count,
    }
}

/// All supported dictionaries, in OpenCV enum order.
pub const BUILTINS: [Dictionary; 21] = [
    aruco("DICT_4X4_50", 0, 4, 50),
    aruco("DICT_4X4_100", 1, 4, 100),
    aruco("DICT_4X4_250", 2, 4, 250),
    aruco("DICT_4X4_1000", 3, 4, 1000),
    aruco("DICT_5X5_50", 4, 5, 50),
    aruco("DICT_5X5_100", 5, 5, 100),
    aruco("DICT_5X5_250", 6, 5, 250),
    aruco("DICT_5X5_1000", 7, 5, 1000),
    aruco("DICT_6X6_50", 8, 6, 50),
    aruco("DICT_6X6_100", 9, 6, 100),
    aruco("DICT_6X6_250", 10, 6, 250),
    aruco("DICT_6X6_1000", 11, 6, 1000),
    aruco("DICT_7X7_50", 12, 7, 50),
    aruco("DICT_7X7_100", 13, 7, 100),
    aruco("DICT_7X7_250", 14, 7, 250),
    aruco("DICT_7X7_1000", 15, 7, 1000),
    Dictionary {
        name: "DICT_ARUCO_ORIGINAL",
        family: DictionaryFamily::ArucoOriginal,
        opencv_code: 16,
        marker_size: 5,
        code_count: 1024,
    },
    apriltag("DICT_APRILTAG_16h5", 17, 4, 30),
    apriltag("DICT_APRILTAG_25h9", 18, 5, 35),
    apriltag("DICT_APRILTAG_36h10", 19, 6, 2320),
    apriltag("DICT_APRILTAG_36h11", 20, 6, 587),
];

/// Names of all supported dictionaries, in OpenCV enum order.
pub fn builtin_names() -> impl Iterator<Item = &'static str> {
    BUILTINS.iter().map(|d| d.name)
}

/// Look up a dictionary by its exact (case-sensitive) name.
pub fn builtin_dictionary(name: &str) -> Result<Dictionary, DictionaryError> {
    BUILTINS
        .iter()
        .find(|d| d.name == name)
        .copied()
        .ok_or_else(|| DictionaryError::Unknown {
            name: name.to_string(),
        })
}
