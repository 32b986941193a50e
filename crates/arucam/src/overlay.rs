//! Marker outline, center dot and id label.

use crate::canvas::{Canvas, Color, Stroke, TextStyle};
use arucam_aruco::BackendError;
use arucam_core::{corners, MarkerQuad};
use serde::{Deserialize, Serialize};

/// What to draw for every detected marker and how.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayOptions {
    /// Filled dot at the marker center.
    pub draw_center: bool,
    /// Marker id next to the top-left corner.
    pub draw_id: bool,
    pub outline: Stroke,
    pub center_radius: i32,
    pub center_color: Color,
    pub id_style: TextStyle,
}

impl Default for OverlayOptions {
    fn default() -> Self {
        Self {
            draw_center: true,
            draw_id: true,
            outline: Stroke {
                color: Color::GREEN,
                thickness: 3,
            },
            center_radius: 8,
            center_color: Color::GREEN,
            id_style: TextStyle {
                color: Color::BLUE,
                scale: 0.8,
                thickness: 2,
            },
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct OverlayRenderer {
    options: OverlayOptions,
}

impl OverlayRenderer {
    pub fn new(options: OverlayOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &OverlayOptions {
        &self.options
    }

    /// Draw the closed outline TL→TR→BR→BL→TL, then the optional center dot
    /// and id label.
    pub fn draw<C: Canvas>(
        &self,
        canvas: &mut C,
        quad: &MarkerQuad,
        id: u32,
    ) -> Result<(), BackendError> {
        let c = corners(quad);
        let outline = c.as_loop();
        for i in 0..outline.len() {
            let from = outline[i];
            let to = outline[(i + 1) % outline.len()];
            canvas.draw_line(from, to, self.options.outline)?;
        }

        if self.options.draw_center {
            canvas.fill_circle(c.center(), self.options.center_radius, self.options.center_color)?;
        }

        if self.options.draw_id {
            canvas.draw_text(c.top_left, &id.to_string(), self.options.id_style)?;
        }
        Ok(())
    }
}
