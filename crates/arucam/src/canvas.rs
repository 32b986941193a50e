//! Drawing surface abstraction.
//!
//! Frames are owned by the vision backend; everything above it only needs a
//! handful of raster primitives. Colors are RGB; backends convert to their own
//! channel order.

use arucam_aruco::BackendError;
use arucam_core::Homography;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const GREEN: Color = Color::rgb(0, 255, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Line color and thickness in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stroke {
    pub color: Color,
    pub thickness: i32,
}

/// Text color, font scale and stroke thickness.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    pub color: Color,
    pub scale: f64,
    pub thickness: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// A frame that overlays can be drawn onto, in place.
pub trait Canvas {
    /// Raster type that can be composited onto this canvas.
    type Image;

    fn draw_line(
        &mut self,
        from: Point2<i32>,
        to: Point2<i32>,
        stroke: Stroke,
    ) -> Result<(), BackendError>;

    fn fill_circle(
        &mut self,
        center: Point2<i32>,
        radius: i32,
        color: Color,
    ) -> Result<(), BackendError>;

    /// Draw `text` with its baseline-left corner at `origin`.
    fn draw_text(
        &mut self,
        origin: Point2<i32>,
        text: &str,
        style: TextStyle,
    ) -> Result<(), BackendError>;

    /// Warp `image` through `homography` into this canvas' pixel grid and
    /// copy the warped pixels over the canvas, but only inside `region`.
    fn composite_warped(
        &mut self,
        image: &Self::Image,
        homography: &Homography,
        region: &[Point2<i32>; 4],
    ) -> Result<(), BackendError>;
}
