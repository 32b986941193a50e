//! Warp a flat image onto detected marker quads.

use crate::canvas::{Canvas, ImageSize};
use arucam_aruco::BackendError;
use arucam_core::{corners, homography_from_4pt, Homography, MarkerQuad};
use nalgebra::Point2;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Quads smaller than this (px²) are not worth warping into.
const MIN_QUAD_AREA: f64 = 1.0;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CompositeError {
    #[error("augmentation image is empty ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompositeOutcome {
    Composited,
    /// Quad too small, not convex, or no homography onto it.
    SkippedDegenerate,
}

/// Holds the augmentation image and pastes it over marker regions.
#[derive(Clone, Debug)]
pub struct PlanarCompositor<I> {
    image: I,
    size: ImageSize,
}

impl<I> PlanarCompositor<I> {
    pub fn new(image: I, size: ImageSize) -> Result<Self, CompositeError> {
        if size.is_empty() {
            return Err(CompositeError::EmptyImage {
                width: size.width,
                height: size.height,
            });
        }
        Ok(Self { image, size })
    }

    pub fn image(&self) -> &I {
        &self.image
    }

    pub fn size(&self) -> ImageSize {
        self.size
    }

    /// Image corners TL, TR, BR, BL, matching the quad winding order.
    pub fn source_rect(&self) -> [Point2<f64>; 4] {
        let w = self.size.width as f64;
        let h = self.size.height as f64;
        [
            Point2::new(0.0, 0.0),
            Point2::new(w, 0.0),
            Point2::new(w, h),
            Point2::new(0.0, h),
        ]
    }

    /// Image-to-frame homography for `quad`, or `None` if the quad is degenerate.
    pub fn homography_for(&self, quad: &MarkerQuad) -> Option<Homography> {
        if quad.signed_area().abs() < MIN_QUAD_AREA || !quad.is_strictly_convex() {
            return None;
        }
        let dst = quad.points.map(|p| Point2::new(p.x as f64, p.y as f64));
        homography_from_4pt(&self.source_rect(), &dst)
    }

    /// Replace the pixels inside `quad` with the perspective-warped image.
    /// Pixels outside the quad are left untouched.
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self, canvas)))]
    pub fn composite<C>(
        &self,
        canvas: &mut C,
        quad: &MarkerQuad,
    ) -> Result<CompositeOutcome, BackendError>
    where
        C: Canvas<Image = I>,
    {
        let Some(h) = self.homography_for(quad) else {
            log::debug!("skipping degenerate quad {:?}", quad.points);
            return Ok(CompositeOutcome::SkippedDegenerate);
        };
        canvas.composite_warped(&self.image, &h, &corners(quad).as_loop())?;
        Ok(CompositeOutcome::Composited)
    }
}
