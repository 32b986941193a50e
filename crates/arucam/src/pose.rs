//! Marker pose from four corners and a calibrated camera.
//!
//! The marker is a square of side `L` on the plane `Z = 0` of its own frame,
//! centered on the origin, with corners (in detection order)
//! `(-L/2, L/2)`, `(L/2, L/2)`, `(L/2, -L/2)`, `(-L/2, -L/2)`.
//! Corners are undistorted into normalized camera coordinates, the
//! plane-to-image homography is solved exactly from the four correspondences
//! and decomposed into `[r1 r2 t]`. Translation comes out in the unit of the
//! marker length.

use crate::canvas::{Canvas, Color, Stroke, TextStyle};
use arucam_aruco::BackendError;
use arucam_core::{corners, homography_from_4pt, CameraCalibration, MarkerQuad};
use nalgebra::{Matrix3, Point2, Rotation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PoseError {
    #[error("marker length must be positive and finite (got {0})")]
    InvalidMarkerLength(f64),
    #[error("camera matrix is not invertible")]
    InvalidCalibration,
    #[error("degenerate marker corners: {0}")]
    Degenerate(&'static str),
}

/// Marker frame to camera frame: `p_cam = R(rvec) * p_marker + tvec`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerPose {
    /// Rotation vector (axis scaled by angle, radians).
    pub rvec: Vector3<f64>,
    pub tvec: Vector3<f64>,
}

impl MarkerPose {
    pub fn rotation(&self) -> UnitQuaternion<f64> {
        UnitQuaternion::from_scaled_axis(self.rvec)
    }

    pub fn transform_point(&self, p: Vector3<f64>) -> Vector3<f64> {
        self.rotation() * p + self.tvec
    }

    pub fn distance(&self) -> Distance {
        Distance {
            x: self.tvec.x,
            y: self.tvec.y,
            z: self.tvec.z,
        }
    }
}

/// Marker origin in camera coordinates.
///
/// Displays as `x: 34.16, y: -16.52, z: 332.44`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Distance {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x: {:.2}, y: {:.2}, z: {:.2}", self.x, self.y, self.z)
    }
}

/// Axis triad and distance label settings.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseOverlayOptions {
    /// Axis length in marker-length units.
    pub axis_length: f64,
    pub axis_thickness: i32,
    pub draw_distance: bool,
    pub distance_style: TextStyle,
}

impl Default for PoseOverlayOptions {
    fn default() -> Self {
        Self {
            axis_length: 5.0,
            axis_thickness: 5,
            draw_distance: true,
            distance_style: TextStyle {
                color: Color::RED,
                scale: 0.6,
                thickness: 1,
            },
        }
    }
}

#[derive(Clone, Debug)]
pub struct PoseEstimator {
    calibration: CameraCalibration,
    marker_length: f64,
    overlay: PoseOverlayOptions,
}

impl PoseEstimator {
    pub fn new(calibration: CameraCalibration, marker_length: f64) -> Result<Self, PoseError> {
        if !(marker_length.is_finite() && marker_length > 0.0) {
            return Err(PoseError::InvalidMarkerLength(marker_length));
        }
        if !calibration.is_valid() {
            return Err(PoseError::InvalidCalibration);
        }
        Ok(Self {
            calibration,
            marker_length,
            overlay: PoseOverlayOptions::default(),
        })
    }

    pub fn with_overlay(mut self, overlay: PoseOverlayOptions) -> Self {
        self.overlay = overlay;
        self
    }

    pub fn calibration(&self) -> &CameraCalibration {
        &self.calibration
    }

    pub fn marker_length(&self) -> f64 {
        self.marker_length
    }

    pub fn overlay(&self) -> &PoseOverlayOptions {
        &self.overlay
    }

    /// Marker corners in the marker frame, in detection order.
    pub fn object_points(&self) -> [Point2<f64>; 4] {
        let h = self.marker_length / 2.0;
        [
            Point2::new(-h, h),
            Point2::new(h, h),
            Point2::new(h, -h),
            Point2::new(-h, -h),
        ]
    }

    /// One result per quad, in input order. A degenerate quad only fails its
    /// own entry.
    pub fn estimate(&self, quads: &[MarkerQuad]) -> Vec<Result<MarkerPose, PoseError>> {
        quads.iter().map(|q| self.estimate_single(q)).collect()
    }

    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn estimate_single(&self, quad: &MarkerQuad) -> Result<MarkerPose, PoseError> {
        let mut image = [Point2::origin(); 4];
        for (dst, p) in image.iter_mut().zip(quad.points.iter()) {
            let n = self
                .calibration
                .pixel_to_normalized(Point2::new(p.x as f64, p.y as f64))
                .ok_or(PoseError::InvalidCalibration)?;
            if !(n.x.is_finite() && n.y.is_finite()) {
                return Err(PoseError::Degenerate("corner does not undistort"));
            }
            *dst = Point2::new(n.x, n.y);
        }

        let h = homography_from_4pt(&self.object_points(), &image)
            .ok_or(PoseError::Degenerate("no plane-to-image homography"))?;
        let (rotation, tvec) = decompose_plane_homography(&h.h)?;

        Ok(MarkerPose {
            rvec: rotation.scaled_axis(),
            tvec,
        })
    }

    /// Draw the marker axis triad: x red, y green, z blue.
    ///
    /// Returns `false` without drawing when the origin or any axis tip
    /// projects behind the camera.
    pub fn render_axes<C: Canvas>(
        &self,
        canvas: &mut C,
        pose: &MarkerPose,
    ) -> Result<bool, BackendError> {
        let len = self.overlay.axis_length;
        let axes = [
            (Vector3::new(len, 0.0, 0.0), Color::RED),
            (Vector3::new(0.0, len, 0.0), Color::GREEN),
            (Vector3::new(0.0, 0.0, len), Color::BLUE),
        ];

        let Some(origin) = self.project(pose, Vector3::zeros()) else {
            return Ok(false);
        };
        let mut tips = [Point2::origin(); 3];
        for (tip, (axis, _)) in tips.iter_mut().zip(axes.iter()) {
            match self.project(pose, *axis) {
                Some(p) => *tip = p,
                None => return Ok(false),
            }
        }

        for (tip, (_, color)) in tips.iter().zip(axes.iter()) {
            let stroke = Stroke {
                color: *color,
                thickness: self.overlay.axis_thickness,
            };
            canvas.draw_line(origin, *tip, stroke)?;
        }
        Ok(true)
    }

    /// Write the marker's camera-frame position next to its top-right corner.
    pub fn render_distance<C: Canvas>(
        &self,
        canvas: &mut C,
        pose: &MarkerPose,
        quad: &MarkerQuad,
    ) -> Result<(), BackendError> {
        if !self.overlay.draw_distance {
            return Ok(());
        }
        let anchor = corners(quad).top_right;
        canvas.draw_text(
            anchor,
            &pose.distance().to_string(),
            self.overlay.distance_style,
        )
    }

    fn project(&self, pose: &MarkerPose, p_marker: Vector3<f64>) -> Option<Point2<i32>> {
        let px = self.calibration.project(pose.transform_point(p_marker))?;
        if !(px.x.is_finite() && px.y.is_finite()) {
            return None;
        }
        Some(Point2::new(px.x.round() as i32, px.y.round() as i32))
    }
}

/// Split `H ~ [r1 r2 t]` (normalized camera coordinates) into a rotation and
/// translation with the marker in front of the camera.
fn decompose_plane_homography(
    h: &Matrix3<f64>,
) -> Result<(UnitQuaternion<f64>, Vector3<f64>), PoseError> {
    const DEGENERATE: PoseError = PoseError::Degenerate("homography does not decompose");

    let h1 = h.column(0).into_owned();
    let h2 = h.column(1).into_owned();
    let h3 = h.column(2).into_owned();

    let norm1 = h1.norm();
    let norm2 = h2.norm();
    if norm1 <= 1e-12 || norm2 <= 1e-12 {
        return Err(DEGENERATE);
    }
    let lambda = 2.0 / (norm1 + norm2);

    let mut r1 = h1 * lambda;
    let mut r2 = h2 * lambda;
    let mut t = h3 * lambda;
    if t.z < 0.0 {
        r1 = -r1;
        r2 = -r2;
        t = -t;
    }
    let r3 = r1.cross(&r2);
    if r3.norm() <= 1e-12 {
        return Err(DEGENERATE);
    }

    let r = Matrix3::from_columns(&[r1, r2, r3]);
    let svd = r.svd(true, true);
    let (Some(u), Some(v_t)) = (svd.u, svd.v_t) else {
        return Err(DEGENERATE);
    };
    let mut r_orth = u * v_t;
    if r_orth.determinant() < 0.0 {
        let mut u_flipped = u;
        u_flipped.column_mut(2).neg_mut();
        r_orth = u_flipped * v_t;
    }
    if !t.iter().all(|v| v.is_finite()) {
        return Err(DEGENERATE);
    }

    let rotation = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(r_orth));
    Ok((rotation, t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::recording::{Op, RecordingCanvas};
    use approx::assert_relative_eq;
    use arucam_core::Distortion;

    fn calibration() -> CameraCalibration {
        CameraCalibration::new(
            Matrix3::new(800.0, 0.0, 320.0, 0.0, 780.0, 240.0, 0.0, 0.0, 1.0),
            Distortion::from_coeffs(&[-0.12, 0.03, 0.001, -0.0005, 0.0]).unwrap(),
        )
    }

    fn project_marker(est: &PoseEstimator, pose: &MarkerPose) -> MarkerQuad {
        let pts = est.object_points().map(|o| {
            let p = est
                .calibration()
                .project(pose.transform_point(Vector3::new(o.x, o.y, 0.0)))
                .unwrap();
            Point2::new(p.x as f32, p.y as f32)
        });
        MarkerQuad::new(pts)
    }

    #[test]
    fn recovers_synthetic_pose() {
        let est = PoseEstimator::new(calibration(), 50.0).unwrap();
        let rot = Rotation3::from_euler_angles(2.9, 0.2, -0.3);
        let gt = MarkerPose {
            rvec: rot.scaled_axis(),
            tvec: Vector3::new(34.16, -16.52, 332.44),
        };
        let quad = project_marker(&est, &gt);

        let pose = est.estimate_single(&quad).unwrap();
        assert_relative_eq!(pose.tvec, gt.tvec, max_relative = 1e-3);
        let angle = pose.rotation().angle_to(&gt.rotation());
        assert!(angle < 1e-3, "rotation error {angle}");
    }

    #[test]
    fn fronto_parallel_marker_faces_camera() {
        let est = PoseEstimator::new(CameraCalibration::pinhole(600.0, 600.0, 320.0, 240.0), 10.0)
            .unwrap();
        // 10 units wide at z = 100 → 60 px square centered on the principal point.
        let quad = MarkerQuad::new([
            Point2::new(290.0, 210.0),
            Point2::new(350.0, 210.0),
            Point2::new(350.0, 270.0),
            Point2::new(290.0, 270.0),
        ]);
        let pose = est.estimate_single(&quad).unwrap();
        assert_relative_eq!(pose.tvec, Vector3::new(0.0, 0.0, 100.0), epsilon = 1e-6);

        let r = pose.rotation().to_rotation_matrix();
        let expected = Matrix3::new(1.0, 0.0, 0.0, 0.0, -1.0, 0.0, 0.0, 0.0, -1.0);
        assert_relative_eq!(*r.matrix(), expected, epsilon = 1e-9);
    }

    #[test]
    fn estimate_keeps_input_order_past_degenerate_quads() {
        let est = PoseEstimator::new(CameraCalibration::pinhole(600.0, 600.0, 320.0, 240.0), 10.0)
            .unwrap();
        let near = MarkerQuad::new([
            Point2::new(290.0, 210.0),
            Point2::new(350.0, 210.0),
            Point2::new(350.0, 270.0),
            Point2::new(290.0, 270.0),
        ]);
        let far = MarkerQuad::new([
            Point2::new(305.0, 225.0),
            Point2::new(335.0, 225.0),
            Point2::new(335.0, 255.0),
            Point2::new(305.0, 255.0),
        ]);
        let p = Point2::new(100.0, 100.0);
        let collapsed = MarkerQuad::new([p, p, Point2::new(120.0, 100.0), p]);

        let poses = est.estimate(&[near, collapsed, far]);
        assert_eq!(poses.len(), 3);
        assert_relative_eq!(poses[0].as_ref().unwrap().tvec.z, 100.0, epsilon = 1e-6);
        assert!(matches!(poses[1], Err(PoseError::Degenerate(_))));
        assert_relative_eq!(poses[2].as_ref().unwrap().tvec.z, 200.0, epsilon = 1e-6);
    }

    #[test]
    fn rejects_bad_marker_length() {
        for len in [0.0, -3.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                PoseEstimator::new(calibration(), len),
                Err(PoseError::InvalidMarkerLength(_))
            ));
        }
    }

    #[test]
    fn collapsed_quad_is_degenerate() {
        let est = PoseEstimator::new(calibration(), 10.0).unwrap();
        let p = Point2::new(100.0, 100.0);
        let quad = MarkerQuad::new([p, p, Point2::new(120.0, 100.0), p]);
        assert!(matches!(
            est.estimate_single(&quad),
            Err(PoseError::Degenerate(_))
        ));
    }

    #[test]
    fn distance_text_has_two_decimals() {
        let d = Distance {
            x: 34.1649,
            y: -16.5207,
            z: 332.4401,
        };
        assert_eq!(d.to_string(), "x: 34.16, y: -16.52, z: 332.44");
        let whole = Distance {
            x: 1.0,
            y: 2.5,
            z: 300.0,
        };
        assert_eq!(whole.to_string(), "x: 1.00, y: 2.50, z: 300.00");
    }

    #[test]
    fn renders_axes_and_distance() {
        let est = PoseEstimator::new(CameraCalibration::pinhole(600.0, 600.0, 320.0, 240.0), 10.0)
            .unwrap();
        let pose = MarkerPose {
            rvec: Vector3::new(std::f64::consts::PI, 0.0, 0.0),
            tvec: Vector3::new(0.0, 0.0, 100.0),
        };
        let quad = project_marker(&est, &pose);

        let mut canvas = RecordingCanvas::default();
        assert!(est.render_axes(&mut canvas, &pose).unwrap());
        est.render_distance(&mut canvas, &pose, &quad).unwrap();

        let colors: Vec<Color> = canvas
            .ops
            .iter()
            .filter_map(|op| match op {
                Op::Line(from, _, s) => {
                    assert_eq!(*from, Point2::new(320, 240));
                    assert_eq!(s.thickness, 5);
                    Some(s.color)
                }
                _ => None,
            })
            .collect();
        assert_eq!(colors, vec![Color::RED, Color::GREEN, Color::BLUE]);

        // x axis: 5 units right at z = 100 → 30 px.
        assert!(matches!(canvas.ops[0], Op::Line(_, to, _) if to == Point2::new(350, 240)));
        match &canvas.ops[3] {
            Op::Text(at, text, style) => {
                assert_eq!(*at, Point2::new(350, 210));
                assert_eq!(text, "x: 0.00, y: 0.00, z: 100.00");
                assert_eq!(style.color, Color::RED);
            }
            other => panic!("expected distance text, got {other:?}"),
        }
    }

    #[test]
    fn axes_behind_camera_are_skipped() {
        let est = PoseEstimator::new(CameraCalibration::pinhole(600.0, 600.0, 320.0, 240.0), 10.0)
            .unwrap();
        // z axis points back toward the camera and passes the image plane.
        let pose = MarkerPose {
            rvec: Vector3::new(std::f64::consts::PI, 0.0, 0.0),
            tvec: Vector3::new(0.0, 0.0, 3.0),
        };
        let mut canvas = RecordingCanvas::default();
        assert!(!est.render_axes(&mut canvas, &pose).unwrap());
        assert!(canvas.ops.is_empty());
    }
}
