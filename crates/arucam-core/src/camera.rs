//! Pinhole camera with OpenCV-ordered lens distortion.

use nalgebra::{Matrix3, Point2, Vector2, Vector3};
use serde::{Deserialize, Serialize};

/// Lens distortion in OpenCV coefficient order `k1 k2 p1 p2 [k3 [k4 k5 k6]]`.
///
/// With `k4..k6` zero this is the plain 5-parameter Brown-Conrady model;
/// otherwise the radial term is the rational `(1 + k1 r² + k2 r⁴ + k3 r⁶) /
/// (1 + k4 r² + k5 r⁴ + k6 r⁶)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Distortion {
    pub k1: f64,
    pub k2: f64,
    pub p1: f64,
    pub p2: f64,
    pub k3: f64,
    pub k4: f64,
    pub k5: f64,
    pub k6: f64,
}

/// Number of fixed-point iterations used by [`Distortion::undistort`].
const UNDISTORT_ITERS: usize = 10;

impl Distortion {
    /// Coefficient vector lengths accepted by [`Distortion::from_coeffs`].
    pub const SUPPORTED_LENGTHS: [usize; 4] = [0, 4, 5, 8];

    /// Build from an OpenCV-style coefficient vector. Returns `None` for
    /// lengths outside [`Self::SUPPORTED_LENGTHS`].
    pub fn from_coeffs(c: &[f64]) -> Option<Self> {
        if !Self::SUPPORTED_LENGTHS.contains(&c.len()) {
            return None;
        }
        let at = |i: usize| c.get(i).copied().unwrap_or(0.0);
        Some(Self {
            k1: at(0),
            k2: at(1),
            p1: at(2),
            p2: at(3),
            k3: at(4),
            k4: at(5),
            k5: at(6),
            k6: at(7),
        })
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }

    fn radial(&self, r2: f64) -> f64 {
        let r4 = r2 * r2;
        let r6 = r4 * r2;
        let num = 1.0 + self.k1 * r2 + self.k2 * r4 + self.k3 * r6;
        let den = 1.0 + self.k4 * r2 + self.k5 * r4 + self.k6 * r6;
        num / den
    }

    fn tangential(&self, x: f64, y: f64, r2: f64) -> Vector2<f64> {
        Vector2::new(
            2.0 * self.p1 * x * y + self.p2 * (r2 + 2.0 * x * x),
            self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * x * y,
        )
    }

    /// Apply distortion to an undistorted normalized point.
    pub fn distort(&self, n: Vector2<f64>) -> Vector2<f64> {
        let r2 = n.norm_squared();
        n * self.radial(r2) + self.tangential(n.x, n.y, r2)
    }

    /// Invert [`Self::distort`] by fixed-point iteration.
    pub fn undistort(&self, nd: Vector2<f64>) -> Vector2<f64> {
        if self.is_zero() {
            return nd;
        }
        let mut n = nd;
        for _ in 0..UNDISTORT_ITERS {
            let r2 = n.norm_squared();
            let radial = self.radial(r2);
            if radial.abs() < 1e-12 {
                break;
            }
            n = (nd - self.tangential(n.x, n.y, r2)) / radial;
        }
        n
    }
}

/// Intrinsic matrix plus distortion: everything needed to go between camera
/// coordinates and image pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraCalibration {
    pub camera_matrix: Matrix3<f64>,
    pub distortion: Distortion,
}

impl CameraCalibration {
    pub fn new(camera_matrix: Matrix3<f64>, distortion: Distortion) -> Self {
        Self {
            camera_matrix,
            distortion,
        }
    }

    /// Ideal pinhole camera with the given focal length and principal point.
    pub fn pinhole(fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self::new(
            Matrix3::new(fx, 0.0, cx, 0.0, fy, cy, 0.0, 0.0, 1.0),
            Distortion::default(),
        )
    }

    /// A usable intrinsic matrix has positive focal lengths and a bottom row
    /// of `[0 0 1]`.
    pub fn is_valid(&self) -> bool {
        let k = &self.camera_matrix;
        k.iter().all(|v| v.is_finite())
            && k[(0, 0)] > 0.0
            && k[(1, 1)] > 0.0
            && k[(2, 0)] == 0.0
            && k[(2, 1)] == 0.0
            && (k[(2, 2)] - 1.0).abs() < 1e-9
    }

    /// Map a pixel to undistorted normalized camera coordinates.
    pub fn pixel_to_normalized(&self, px: Point2<f64>) -> Option<Vector2<f64>> {
        let k_inv = self.camera_matrix.try_inverse()?;
        let v = k_inv * Vector3::new(px.x, px.y, 1.0);
        let nd = Vector2::new(v.x / v.z, v.y / v.z);
        Some(self.distortion.undistort(nd))
    }

    /// Map an undistorted normalized point to a pixel.
    pub fn normalized_to_pixel(&self, n: Vector2<f64>) -> Point2<f64> {
        let d = self.distortion.distort(n);
        let v = self.camera_matrix * Vector3::new(d.x, d.y, 1.0);
        Point2::new(v.x / v.z, v.y / v.z)
    }

    /// Project a point given in camera coordinates. `None` when the point is
    /// not in front of the camera.
    pub fn project(&self, p_cam: Vector3<f64>) -> Option<Point2<f64>> {
        if p_cam.z <= 1e-9 {
            return None;
        }
        Some(self.normalized_to_pixel(Vector2::new(p_cam.x / p_cam.z, p_cam.y / p_cam.z)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn calib_with_distortion() -> CameraCalibration {
        let dist = Distortion::from_coeffs(&[-0.21, 0.08, 0.0012, -0.0007, -0.01]).unwrap();
        CameraCalibration::new(
            Matrix3::new(810.0, 0.0, 322.5, 0.0, 805.0, 241.0, 0.0, 0.0, 1.0),
            dist,
        )
    }

    #[test]
    fn coefficient_lengths() {
        assert!(Distortion::from_coeffs(&[]).unwrap().is_zero());
        assert!(Distortion::from_coeffs(&[0.1, 0.2, 0.0, 0.0]).is_some());
        assert!(Distortion::from_coeffs(&[0.1; 8]).is_some());
        assert!(Distortion::from_coeffs(&[0.1; 3]).is_none());
        assert!(Distortion::from_coeffs(&[0.1; 12]).is_none());

        let d = Distortion::from_coeffs(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert_eq!((d.k1, d.k2, d.p1, d.p2, d.k3), (1.0, 2.0, 3.0, 4.0, 5.0));
        assert_eq!(d.k4, 0.0);
    }

    #[test]
    fn undistort_inverts_distort() {
        let cal = calib_with_distortion();
        for n in [
            Vector2::new(0.0, 0.0),
            Vector2::new(0.12, -0.08),
            Vector2::new(-0.3, 0.25),
        ] {
            let back = cal.distortion.undistort(cal.distortion.distort(n));
            assert_relative_eq!(back, n, epsilon = 1e-7);
        }
    }

    #[test]
    fn pixel_round_trip() {
        let cal = calib_with_distortion();
        let px = Point2::new(400.25, 180.5);
        let n = cal.pixel_to_normalized(px).expect("invertible K");
        let back = cal.normalized_to_pixel(n);
        assert_relative_eq!(back.x, px.x, epsilon = 1e-5);
        assert_relative_eq!(back.y, px.y, epsilon = 1e-5);
    }

    #[test]
    fn project_behind_camera_is_none() {
        let cal = CameraCalibration::pinhole(800.0, 800.0, 320.0, 240.0);
        assert!(cal.project(Vector3::new(0.0, 0.0, -1.0)).is_none());
        let p = cal.project(Vector3::new(0.1, -0.05, 2.0)).unwrap();
        assert_relative_eq!(p.x, 360.0, epsilon = 1e-9);
        assert_relative_eq!(p.y, 220.0, epsilon = 1e-9);
    }

    #[test]
    fn validity() {
        assert!(CameraCalibration::pinhole(800.0, 800.0, 320.0, 240.0).is_valid());
        assert!(!CameraCalibration::pinhole(0.0, 800.0, 320.0, 240.0).is_valid());
    }
}
