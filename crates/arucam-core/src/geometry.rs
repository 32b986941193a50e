//! Marker quads and the integer pixel geometry derived from them.
//!
//! Detected marker outlines always carry four corners in the order
//! top-left, top-right, bottom-right, bottom-left. Everything downstream
//! (center, homography, pose) relies on that order.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Errors produced when building a quad from untyped corner data.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GeometryError {
    #[error("marker quad needs exactly 4 corners, got {got}")]
    CornerCount { got: usize },
}

/// Four marker corners in image pixels, winding order TL, TR, BR, BL.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerQuad {
    pub points: [Point2<f32>; 4],
}

impl MarkerQuad {
    pub fn new(points: [Point2<f32>; 4]) -> Self {
        Self { points }
    }

    /// Build a quad from a corner slice as returned by a detector backend.
    pub fn from_slice(points: &[Point2<f32>]) -> Result<Self, GeometryError> {
        let points: [Point2<f32>; 4] = points
            .try_into()
            .map_err(|_| GeometryError::CornerCount { got: points.len() })?;
        Ok(Self { points })
    }

    #[inline]
    pub fn top_left(&self) -> Point2<f32> {
        self.points[0]
    }

    #[inline]
    pub fn top_right(&self) -> Point2<f32> {
        self.points[1]
    }

    #[inline]
    pub fn bottom_right(&self) -> Point2<f32> {
        self.points[2]
    }

    #[inline]
    pub fn bottom_left(&self) -> Point2<f32> {
        self.points[3]
    }

    /// Signed shoelace area in px². Positive for clockwise winding in image
    /// coordinates (y pointing down).
    pub fn signed_area(&self) -> f64 {
        let mut acc = 0.0_f64;
        for i in 0..4 {
            let a = self.points[i];
            let b = self.points[(i + 1) % 4];
            acc += a.x as f64 * b.y as f64 - b.x as f64 * a.y as f64;
        }
        acc * 0.5
    }

    /// True when all four turns have the same orientation and none is flat.
    pub fn is_strictly_convex(&self) -> bool {
        let mut sign = 0.0_f64;
        for i in 0..4 {
            let a = self.points[i];
            let b = self.points[(i + 1) % 4];
            let c = self.points[(i + 2) % 4];
            let cross = (b.x - a.x) as f64 * (c.y - b.y) as f64
                - (b.y - a.y) as f64 * (c.x - b.x) as f64;
            if cross.abs() < 1e-9 {
                return false;
            }
            if sign == 0.0 {
                sign = cross.signum();
            } else if cross.signum() != sign {
                return false;
            }
        }
        true
    }
}

/// The four corners of a quad truncated to integer pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Corners {
    pub top_left: Point2<i32>,
    pub top_right: Point2<i32>,
    pub bottom_right: Point2<i32>,
    pub bottom_left: Point2<i32>,
}

impl Corners {
    /// Corners in winding order, ready for drawing a closed outline.
    pub fn as_loop(&self) -> [Point2<i32>; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ]
    }

    /// Center of the bounding diagonal, see [`center`].
    pub fn center(&self) -> Point2<i32> {
        center(self.top_left, self.bottom_right)
    }
}

#[inline]
fn truncate(p: Point2<f32>) -> Point2<i32> {
    // `as` truncates toward zero, which is what the overlay coordinates expect.
    Point2::new(p.x as i32, p.y as i32)
}

/// Named integer corners of `quad`.
pub fn corners(quad: &MarkerQuad) -> Corners {
    Corners {
        top_left: truncate(quad.top_left()),
        top_right: truncate(quad.top_right()),
        bottom_right: truncate(quad.bottom_right()),
        bottom_left: truncate(quad.bottom_left()),
    }
}

#[inline]
fn midpoint(a: Point2<i32>, b: Point2<i32>) -> Point2<i32> {
    let x = (a.x as f64 + b.x as f64) / 2.0;
    let y = (a.y as f64 + b.y as f64) / 2.0;
    Point2::new(x as i32, y as i32)
}

/// Mean of the top-left and bottom-right corners, truncated toward zero.
pub fn center(top_left: Point2<i32>, bottom_right: Point2<i32>) -> Point2<i32> {
    midpoint(top_left, bottom_right)
}

/// Midpoints of the top, right, bottom and left edges.
pub fn edge_midpoints(c: &Corners) -> [Point2<i32>; 4] {
    [
        midpoint(c.top_left, c.top_right),
        midpoint(c.top_right, c.bottom_right),
        midpoint(c.bottom_right, c.bottom_left),
        midpoint(c.bottom_left, c.top_left),
    ]
}
