//! BGR frames as drawing canvases.

use crate::error::OpenCvBackendError;
use arucam::aruco::BackendError;
use arucam::core::Homography;
use arucam::{Canvas, Color, ImageSize, PlanarCompositor, Stroke, TextStyle};
use nalgebra::Point2;
use opencv::core::{self, Mat, Point, Scalar, Vector};
use opencv::prelude::*;
use opencv::{imgcodecs, imgproc};
use std::path::Path;

/// One 8-bit BGR camera frame.
#[derive(Debug)]
pub struct Frame {
    mat: Mat,
}

impl Frame {
    pub fn new(mat: Mat) -> Self {
        Self { mat }
    }

    pub fn mat(&self) -> &Mat {
        &self.mat
    }

    pub fn mat_mut(&mut self) -> &mut Mat {
        &mut self.mat
    }

    pub fn into_inner(self) -> Mat {
        self.mat
    }

    pub fn size(&self) -> ImageSize {
        mat_size(&self.mat)
    }
}

fn mat_size(mat: &Mat) -> ImageSize {
    ImageSize::new(mat.cols().max(0) as u32, mat.rows().max(0) as u32)
}

#[inline]
pub(crate) fn bgr(c: Color) -> Scalar {
    Scalar::new(c.b as f64, c.g as f64, c.r as f64, 0.0)
}

#[inline]
fn cv_point(p: Point2<i32>) -> Point {
    Point::new(p.x, p.y)
}

impl Canvas for Frame {
    type Image = Mat;

    fn draw_line(
        &mut self,
        from: Point2<i32>,
        to: Point2<i32>,
        stroke: Stroke,
    ) -> Result<(), BackendError> {
        imgproc::line(
            &mut self.mat,
            cv_point(from),
            cv_point(to),
            bgr(stroke.color),
            stroke.thickness,
            imgproc::LINE_AA,
            0,
        )?;
        Ok(())
    }

    fn fill_circle(
        &mut self,
        center: Point2<i32>,
        radius: i32,
        color: Color,
    ) -> Result<(), BackendError> {
        imgproc::circle(
            &mut self.mat,
            cv_point(center),
            radius,
            bgr(color),
            imgproc::FILLED,
            imgproc::LINE_AA,
            0,
        )?;
        Ok(())
    }

    fn draw_text(
        &mut self,
        origin: Point2<i32>,
        text: &str,
        style: TextStyle,
    ) -> Result<(), BackendError> {
        imgproc::put_text(
            &mut self.mat,
            text,
            cv_point(origin),
            imgproc::FONT_HERSHEY_COMPLEX,
            style.scale,
            bgr(style.color),
            style.thickness,
            imgproc::LINE_AA,
            false,
        )?;
        Ok(())
    }

    fn composite_warped(
        &mut self,
        image: &Mat,
        homography: &Homography,
        region: &[Point2<i32>; 4],
    ) -> Result<(), BackendError> {
        let h = Mat::from_slice_2d(&homography.to_array())?;
        let size = self.mat.size()?;

        let mut warped = Mat::default();
        imgproc::warp_perspective(
            image,
            &mut warped,
            &h,
            size,
            imgproc::INTER_LINEAR,
            core::BORDER_CONSTANT,
            Scalar::default(),
        )?;

        let mut mask = Mat::new_rows_cols_with_default(
            size.height,
            size.width,
            core::CV_8UC1,
            Scalar::all(0.0),
        )?;
        let polygon: Vector<Point> = region.iter().map(|p| cv_point(*p)).collect();
        imgproc::fill_convex_poly(&mut mask, &polygon, Scalar::all(255.0), imgproc::LINE_8, 0)?;

        warped.copy_to_masked(&mut self.mat, &mask)?;
        Ok(())
    }
}

/// Read a color image from disk together with its size.
pub fn read_image(path: impl AsRef<Path>) -> Result<(Mat, ImageSize), OpenCvBackendError> {
    let path = path.as_ref();
    let mat = imgcodecs::imread(&path.to_string_lossy(), imgcodecs::IMREAD_COLOR)?;
    if mat.empty() {
        return Err(OpenCvBackendError::ImageRead {
            path: path.to_path_buf(),
        });
    }
    let size = mat_size(&mat);
    Ok((mat, size))
}

/// Load the image to composite onto markers.
pub fn load_augmentation(
    path: impl AsRef<Path>,
) -> Result<PlanarCompositor<Mat>, OpenCvBackendError> {
    let (mat, size) = read_image(&path)?;
    log::info!(
        "loaded augmentation image {} ({}x{})",
        path.as_ref().display(),
        size.width,
        size.height
    );
    Ok(PlanarCompositor::new(mat, size)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arucam::core::MarkerQuad;
    use opencv::core::Vec3b;

    fn black(width: i32, height: i32) -> Frame {
        Frame::new(
            Mat::new_rows_cols_with_default(height, width, core::CV_8UC3, Scalar::all(0.0))
                .unwrap(),
        )
    }

    fn pixel(frame: &Frame, x: i32, y: i32) -> Vec3b {
        *frame.mat().at_2d::<Vec3b>(y, x).unwrap()
    }

    #[test]
    fn colors_are_written_in_bgr_order() {
        assert_eq!(bgr(Color::RED), Scalar::new(0.0, 0.0, 255.0, 0.0));
        assert_eq!(bgr(Color::BLUE), Scalar::new(255.0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn filled_circle_paints_center() {
        let mut frame = black(40, 40);
        frame
            .fill_circle(Point2::new(20, 20), 8, Color::GREEN)
            .unwrap();
        assert_eq!(pixel(&frame, 20, 20), Vec3b::from([0, 255, 0]));
        assert_eq!(pixel(&frame, 2, 2), Vec3b::from([0, 0, 0]));

        // Anti-aliased rim: some edge pixels are only partially green.
        let blended = (0..40)
            .flat_map(|x| (0..40).map(move |y| (x, y)))
            .map(|(x, y)| pixel(&frame, x, y)[1])
            .any(|g| g > 0 && g < 255);
        assert!(blended);
    }

    #[test]
    fn composite_only_touches_marker_region() {
        let mut frame = black(100, 100);
        let poster = Mat::new_rows_cols_with_default(20, 20, core::CV_8UC3, Scalar::all(200.0))
            .unwrap();
        let compositor = PlanarCompositor::new(poster, ImageSize::new(20, 20)).unwrap();
        let quad = MarkerQuad::new([
            Point2::new(30.0, 30.0),
            Point2::new(70.0, 30.0),
            Point2::new(70.0, 70.0),
            Point2::new(30.0, 70.0),
        ]);

        compositor.composite(&mut frame, &quad).unwrap();
        assert_eq!(pixel(&frame, 50, 50), Vec3b::from([200, 200, 200]));
        assert_eq!(pixel(&frame, 10, 10), Vec3b::from([0, 0, 0]));
        assert_eq!(pixel(&frame, 90, 50), Vec3b::from([0, 0, 0]));
    }

    #[test]
    fn missing_image_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_image(dir.path().join("nope.png")).unwrap_err();
        assert!(matches!(err, OpenCvBackendError::ImageRead { .. }));
    }
}
