use crate::error::OpenCvBackendError;
use crate::frame::Frame;
use arucam::aruco::{BackendError, DetectionResult, Dictionary, MarkerDetection, MarkerDetector};
use arucam::core::MarkerQuad;
use nalgebra::Point2;
use opencv::core::{Point2f, Vector};
use opencv::objdetect::{self, ArucoDetector, DetectorParameters, RefineParameters};
use opencv::prelude::*;

/// `objdetect::ArucoDetector` for one predefined dictionary, with default
/// detection and refinement parameters.
pub struct OpenCvDetector {
    dictionary: Dictionary,
    detector: ArucoDetector,
}

impl OpenCvDetector {
    pub fn new(dictionary: Dictionary) -> Result<Self, OpenCvBackendError> {
        let cv_dictionary = objdetect::get_predefined_dictionary_i32(dictionary.opencv_code)?;
        let params = DetectorParameters::default()?;
        let refine = RefineParameters::new(10.0, 3.0, true)?;
        let detector = ArucoDetector::new(&cv_dictionary, &params, refine)?;
        log::debug!(
            "created {} detector (OpenCV code {})",
            dictionary.name,
            dictionary.opencv_code
        );
        Ok(Self {
            dictionary,
            detector,
        })
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }
}

fn to_quad(corners: &Vector<Point2f>) -> Result<MarkerQuad, OpenCvBackendError> {
    let points: Vec<Point2<f32>> = corners.iter().map(|p| Point2::new(p.x, p.y)).collect();
    Ok(MarkerQuad::from_slice(&points)?)
}

impl MarkerDetector<Frame> for OpenCvDetector {
    fn detect(&self, frame: &Frame) -> Result<DetectionResult, BackendError> {
        let mut corners = Vector::<Vector<Point2f>>::new();
        let mut ids = Vector::<i32>::new();
        let mut rejected = Vector::<Vector<Point2f>>::new();
        self.detector
            .detect_markers(frame.mat(), &mut corners, &mut ids, &mut rejected)?;

        let mut result = DetectionResult::default();
        for (quad, id) in corners.iter().zip(ids.iter()) {
            let id = u32::try_from(id).map_err(|_| OpenCvBackendError::InvalidId(id))?;
            result.markers.push(MarkerDetection {
                id,
                quad: to_quad(&quad)?,
            });
        }
        // Rejected candidates are informational only; malformed ones are dropped.
        result.rejected = rejected.iter().filter_map(|q| to_quad(&q).ok()).collect();
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arucam::aruco::builtin_dictionary;
    use opencv::core::{self, Mat, Scalar};
    use opencv::imgproc;

    fn synthetic_marker_frame(dictionary: &Dictionary, id: i32) -> Frame {
        let cv_dictionary =
            objdetect::get_predefined_dictionary_i32(dictionary.opencv_code).unwrap();
        let mut marker = Mat::default();
        cv_dictionary
            .generate_image_marker(id, 200, &mut marker, 1)
            .unwrap();

        let mut padded = Mat::default();
        core::copy_make_border(
            &marker,
            &mut padded,
            50,
            50,
            50,
            50,
            core::BORDER_CONSTANT,
            Scalar::all(255.0),
        )
        .unwrap();

        let mut bgr = Mat::default();
        imgproc::cvt_color_def(&padded, &mut bgr, imgproc::COLOR_GRAY2BGR).unwrap();
        Frame::new(bgr)
    }

    #[test]
    fn detects_generated_marker() {
        let dictionary = builtin_dictionary("DICT_4X4_50").unwrap();
        let detector = OpenCvDetector::new(dictionary).unwrap();
        let frame = synthetic_marker_frame(&dictionary, 7);

        let result = detector.detect(&frame).unwrap();
        assert_eq!(result.ids(), vec![7]);
        let tl = result.markers[0].quad.top_left();
        assert!((tl.x - 50.0).abs() < 2.0 && (tl.y - 50.0).abs() < 2.0, "{tl:?}");
        let br = result.markers[0].quad.bottom_right();
        assert!((br.x - 249.0).abs() < 2.0 && (br.y - 249.0).abs() < 2.0, "{br:?}");
    }

    #[test]
    fn blank_frame_has_no_markers() {
        let detector = OpenCvDetector::new(builtin_dictionary("DICT_ARUCO_ORIGINAL").unwrap())
            .unwrap();
        let blank = Mat::new_rows_cols_with_default(120, 160, core::CV_8UC3, Scalar::all(255.0))
            .unwrap();
        assert!(detector.detect(&Frame::new(blank)).unwrap().is_empty());
    }

    #[test]
    fn every_builtin_dictionary_is_known_to_opencv() {
        for dictionary in arucam::aruco::BUILTINS {
            assert!(OpenCvDetector::new(dictionary).is_ok(), "{}", dictionary.name);
        }
    }
}
