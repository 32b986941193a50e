//! Reading and writing camera calibration files.
//!
//! Two layouts are accepted: a NumPy `.npz` archive (as written by
//! `np.savez(path, mtx, dist, rvecs, tvecs)`) and a JSON object whose values
//! are numeric arrays. Either way the arrays are consumed by position, not by
//! name: the first one is the 3x3 intrinsic matrix, the second one the
//! distortion coefficients, and any further arrays (for example per-view
//! rotation/translation vectors left over from the calibration run) are
//! ignored. In an archive, position is the order of the zip entries.

use crate::{CameraCalibration, Distortion};
use log::debug;
use nalgebra::Matrix3;
use serde_json::{Map, Value};
use std::fs::{self, File};
use std::io::{BufReader, Read, Seek};
use std::path::Path;

#[derive(thiserror::Error, Debug)]
pub enum CalibrationError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Archive(#[from] zip::result::ZipError),
    #[error("archive entry `{name}` is not a readable float64 array: {source}")]
    NpyArray {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("calibration JSON must be an object of named arrays")]
    NotAnObject,
    #[error("calibration file holds {found} arrays, expected at least 2")]
    MissingArrays { found: usize },
    #[error("array `{name}` is not a numeric array")]
    NotNumeric { name: String },
    #[error("intrinsic matrix `{name}` has {len} values, expected 9")]
    MatrixShape { name: String, len: usize },
    #[error("distortion `{name}` has {len} coefficients, expected one of 0, 4, 5 or 8")]
    DistortionShape { name: String, len: usize },
    #[error("intrinsic matrix `{name}` is not a valid camera matrix")]
    InvalidMatrix { name: String },
}

/// Flatten an arbitrarily nested numeric JSON array in row-major order.
fn flatten_numbers(value: &Value, out: &mut Vec<f64>) -> bool {
    match value {
        Value::Number(n) => match n.as_f64() {
            Some(v) => {
                out.push(v);
                true
            }
            None => false,
        },
        Value::Array(items) => items.iter().all(|v| flatten_numbers(v, out)),
        _ => false,
    }
}

fn numeric_array(name: &str, value: &Value) -> Result<Vec<f64>, CalibrationError> {
    let mut out = Vec::new();
    if !value.is_array() || !flatten_numbers(value, &mut out) {
        return Err(CalibrationError::NotNumeric {
            name: name.to_string(),
        });
    }
    Ok(out)
}

/// Read one `.npy` archive member as row-major `f64` values.
fn npy_array<R: Read>(name: &str, reader: R) -> Result<Vec<f64>, CalibrationError> {
    let wrap = |source| CalibrationError::NpyArray {
        name: name.to_string(),
        source,
    };
    let npy = npyz::NpyFile::new(reader).map_err(wrap)?;
    let shape = npy.shape().to_vec();
    let fortran = matches!(npy.order(), npyz::Order::Fortran);
    let mut values: Vec<f64> = npy.into_vec().map_err(wrap)?;
    if fortran && shape.len() == 2 {
        let (rows, cols) = (shape[0] as usize, shape[1] as usize);
        values = (0..rows * cols)
            .map(|i| values[(i % cols) * rows + i / cols])
            .collect();
    }
    Ok(values)
}

fn npz_entry<R: Read + Seek>(
    archive: &mut zip::ZipArchive<R>,
    index: usize,
) -> Result<(String, Vec<f64>), CalibrationError> {
    let entry = archive.by_index(index)?;
    let name = entry.name().trim_end_matches(".npy").to_string();
    let values = npy_array(&name, entry)?;
    Ok((name, values))
}

impl CameraCalibration {
    /// Parse a calibration from the positional JSON layout.
    pub fn from_json_str(raw: &str) -> Result<Self, CalibrationError> {
        let value: Value = serde_json::from_str(raw)?;
        let Value::Object(map) = value else {
            return Err(CalibrationError::NotAnObject);
        };
        let mut entries = map.iter();
        let (Some((k_name, k_value)), Some((d_name, d_value))) = (entries.next(), entries.next())
        else {
            return Err(CalibrationError::MissingArrays { found: map.len() });
        };
        let ignored: Vec<&str> = entries.map(|(name, _)| name.as_str()).collect();
        if !ignored.is_empty() {
            debug!("calibration: ignoring trailing arrays {:?}", ignored);
        }

        let k = numeric_array(k_name, k_value)?;
        let d = numeric_array(d_name, d_value)?;
        Self::from_positional(k_name, &k, d_name, &d)
    }

    /// Parse a calibration from a NumPy `.npz` archive.
    pub fn from_npz<R: Read + Seek>(reader: R) -> Result<Self, CalibrationError> {
        let mut archive = zip::ZipArchive::new(reader)?;
        if archive.len() < 2 {
            return Err(CalibrationError::MissingArrays {
                found: archive.len(),
            });
        }
        if archive.len() > 2 {
            debug!(
                "calibration: ignoring {} trailing arrays in archive",
                archive.len() - 2
            );
        }

        let (k_name, k) = npz_entry(&mut archive, 0)?;
        let (d_name, d) = npz_entry(&mut archive, 1)?;
        Self::from_positional(&k_name, &k, &d_name, &d)
    }

    fn from_positional(
        k_name: &str,
        k: &[f64],
        d_name: &str,
        d: &[f64],
    ) -> Result<Self, CalibrationError> {
        if k.len() != 9 {
            return Err(CalibrationError::MatrixShape {
                name: k_name.to_string(),
                len: k.len(),
            });
        }
        let distortion =
            Distortion::from_coeffs(d).ok_or_else(|| CalibrationError::DistortionShape {
                name: d_name.to_string(),
                len: d.len(),
            })?;

        let calibration = Self::new(Matrix3::from_row_slice(k), distortion);
        if !calibration.is_valid() {
            return Err(CalibrationError::InvalidMatrix {
                name: k_name.to_string(),
            });
        }
        debug!(
            "calibration: K from `{}`, {} distortion coefficients from `{}`",
            k_name,
            d.len(),
            d_name
        );
        Ok(calibration)
    }

    /// Load a calibration file, picking the layout from the extension:
    /// `.npz` is read as a NumPy archive, anything else as JSON.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CalibrationError> {
        let path = path.as_ref();
        let is_npz = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("npz"));
        if is_npz {
            Self::load_npz(path)
        } else {
            Self::load_json(path)
        }
    }

    pub fn load_npz(path: impl AsRef<Path>) -> Result<Self, CalibrationError> {
        let file = File::open(path)?;
        Self::from_npz(BufReader::new(file))
    }

    /// Load a JSON calibration file from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, CalibrationError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Write this calibration in the positional layout (`camera_matrix`
    /// first, then `dist_coeffs`), so that [`Self::load_json`] reads it back.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), CalibrationError> {
        let k = &self.camera_matrix;
        let rows: Vec<[f64; 3]> = (0..3)
            .map(|r| [k[(r, 0)], k[(r, 1)], k[(r, 2)]])
            .collect();
        let d = &self.distortion;
        let coeffs: Vec<f64> = if d.k4 != 0.0 || d.k5 != 0.0 || d.k6 != 0.0 {
            vec![d.k1, d.k2, d.p1, d.p2, d.k3, d.k4, d.k5, d.k6]
        } else {
            vec![d.k1, d.k2, d.p1, d.p2, d.k3]
        };

        let mut map = Map::new();
        map.insert("camera_matrix".into(), serde_json::to_value(rows)?);
        map.insert("dist_coeffs".into(), serde_json::to_value(coeffs)?);
        let json = serde_json::to_string_pretty(&Value::Object(map))?;
        fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Write;

    /// NumPy v1.0 `.npy` bytes for a C-ordered little-endian float64 array.
    fn npy_bytes(shape: &[usize], data: &[f64]) -> Vec<u8> {
        let dims = match shape {
            [n] => format!("({n},)"),
            _ => {
                let parts: Vec<String> = shape.iter().map(|d| d.to_string()).collect();
                format!("({})", parts.join(", "))
            }
        };
        let mut header = format!("{{'descr': '<f8', 'fortran_order': False, 'shape': {dims}, }}");
        let unpadded = 10 + header.len() + 1;
        header.push_str(&" ".repeat((64 - unpadded % 64) % 64));
        header.push('\n');

        let mut out = b"\x93NUMPY\x01\x00".to_vec();
        out.extend_from_slice(&(header.len() as u16).to_le_bytes());
        out.extend_from_slice(header.as_bytes());
        for v in data {
            out.extend_from_slice(&v.to_le_bytes());
        }
        out
    }

    fn write_npz(path: &Path, arrays: &[(&str, &[usize], &[f64])]) {
        let mut writer = zip::ZipWriter::new(File::create(path).unwrap());
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        for (name, shape, data) in arrays {
            writer.start_file(format!("{name}.npy"), options).unwrap();
            writer.write_all(&npy_bytes(shape, data)).unwrap();
        }
        writer.finish().unwrap();
    }

    const K: [f64; 9] = [812.4, 0.0, 319.5, 0.0, 809.9, 238.2, 0.0, 0.0, 1.0];
    const DIST: [f64; 5] = [-0.21, 0.08, 0.0012, -0.0007, -0.01];

    const NPZ_STYLE: &str = r#"{
        "mtx": [[812.4, 0.0, 319.5], [0.0, 809.9, 238.2], [0.0, 0.0, 1.0]],
        "dist": [[-0.21, 0.08, 0.0012, -0.0007, -0.01]],
        "rvecs": [[0.1, 0.2, 0.3]],
        "tvecs": [[1.0, 2.0, 3.0]]
    }"#;

    #[test]
    fn arrays_are_consumed_by_position() {
        let cal = CameraCalibration::from_json_str(NPZ_STYLE).expect("parse");
        assert_relative_eq!(cal.camera_matrix[(0, 0)], 812.4);
        assert_relative_eq!(cal.camera_matrix[(1, 2)], 238.2);
        assert_relative_eq!(cal.distortion.k1, -0.21);
        assert_relative_eq!(cal.distortion.k3, -0.01);
    }

    #[test]
    fn names_are_not_interpreted() {
        // Same values, swapped-looking names: order still decides.
        let raw = r#"{
            "dist": [800.0, 0.0, 320.0, 0.0, 800.0, 240.0, 0.0, 0.0, 1.0],
            "mtx": [0.0, 0.0, 0.0, 0.0]
        }"#;
        let cal = CameraCalibration::from_json_str(raw).expect("parse");
        assert_relative_eq!(cal.camera_matrix[(0, 2)], 320.0);
        assert!(cal.distortion.is_zero());
    }

    #[test]
    fn rejects_malformed_files() {
        assert!(matches!(
            CameraCalibration::from_json_str("[1, 2]"),
            Err(CalibrationError::NotAnObject)
        ));
        assert!(matches!(
            CameraCalibration::from_json_str(r#"{"mtx": [1, 0, 0, 0, 1, 0, 0, 0, 1]}"#),
            Err(CalibrationError::MissingArrays { found: 1 })
        ));
        assert!(matches!(
            CameraCalibration::from_json_str(r#"{"a": [1, 2, 3], "b": []}"#),
            Err(CalibrationError::MatrixShape { len: 3, .. })
        ));
        assert!(matches!(
            CameraCalibration::from_json_str(
                r#"{"a": [1, 0, 0, 0, 1, 0, 0, 0, 1], "b": [0.1, 0.2]}"#
            ),
            Err(CalibrationError::DistortionShape { len: 2, .. })
        ));
        assert!(matches!(
            CameraCalibration::from_json_str(r#"{"a": "nope", "b": []}"#),
            Err(CalibrationError::NotNumeric { .. })
        ));
        assert!(matches!(
            CameraCalibration::from_json_str(r#"{"a": [0, 0, 0, 0, 0, 0, 0, 0, 1], "b": []}"#),
            Err(CalibrationError::InvalidMatrix { .. })
        ));
    }

    #[test]
    fn write_then_load_from_disk() {
        let cal = CameraCalibration::from_json_str(NPZ_STYLE).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calib.json");
        cal.write_json(&path).unwrap();
        let loaded = CameraCalibration::load_json(&path).unwrap();
        assert_eq!(loaded, cal);
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = CameraCalibration::load_json(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, CalibrationError::Io(_)));
    }

    #[test]
    fn load_from_handwritten_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(NPZ_STYLE.as_bytes()).unwrap();
        let cal = CameraCalibration::load_json(file.path()).unwrap();
        assert_relative_eq!(cal.distortion.p1, 0.0012);
    }

    #[test]
    fn npz_arrays_are_consumed_in_entry_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calib.npz");
        write_npz(
            &path,
            &[
                ("arr_0", &[3, 3], &K),
                ("arr_1", &[1, 5], &DIST),
                ("arr_2", &[2, 3], &[0.1, 0.2, 0.3, 0.4, 0.5, 0.6]),
                ("arr_3", &[2, 3], &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]),
            ],
        );

        let cal = CameraCalibration::load(&path).unwrap();
        assert_relative_eq!(cal.camera_matrix[(0, 0)], 812.4);
        assert_relative_eq!(cal.camera_matrix[(0, 2)], 319.5);
        assert_relative_eq!(cal.camera_matrix[(1, 2)], 238.2);
        assert_relative_eq!(cal.distortion.k1, -0.21);
        assert_relative_eq!(cal.distortion.p2, -0.0007);
        assert_relative_eq!(cal.distortion.k3, -0.01);

        let from_json = CameraCalibration::from_json_str(NPZ_STYLE).unwrap();
        assert_eq!(cal, from_json);
    }

    #[test]
    fn npz_entry_order_beats_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calib.NPZ");
        write_npz(&path, &[("dist", &[9], &K), ("mtx", &[0], &[])]);

        let cal = CameraCalibration::load(&path).unwrap();
        assert_relative_eq!(cal.camera_matrix[(1, 1)], 809.9);
        assert!(cal.distortion.is_zero());
    }

    #[test]
    fn npz_with_one_array_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calib.npz");
        write_npz(&path, &[("mtx", &[3, 3], &K)]);
        assert!(matches!(
            CameraCalibration::load(&path),
            Err(CalibrationError::MissingArrays { found: 1 })
        ));
    }

    #[test]
    fn npz_extension_with_json_content_is_an_archive_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calib.npz");
        std::fs::write(&path, NPZ_STYLE).unwrap();
        assert!(matches!(
            CameraCalibration::load(&path),
            Err(CalibrationError::Archive(_))
        ));
        // Any other extension is parsed as JSON.
        let json = dir.path().join("calib.txt");
        std::fs::write(&json, NPZ_STYLE).unwrap();
        assert!(CameraCalibration::load(&json).is_ok());
    }
}
