//! Window, panel, normalized and grid coordinate conversions.
//!
//! Everything here is pure. Normalized coordinates span `[-1, 1]` per axis
//! with y growing upward; callers flip window-pixel y before mapping.

use std::ops::Div;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RectInt {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl RectInt {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x as f32
            && x < (self.x + self.w) as f32
            && y >= self.y as f32
            && y < (self.y + self.h) as f32
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct RectFloat {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl RectFloat {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn point(x: f32, y: f32) -> Self {
        Self::new(x, y, 1.0, 1.0)
    }
}

/// `a / b` re-expresses `a` relative to `b`: the origin maps into `[-1, 1]`
/// across `b`, and the extents become fractions of `b`'s extents.
impl Div for RectFloat {
    type Output = RectFloat;

    fn div(self, rhs: RectFloat) -> RectFloat {
        RectFloat {
            x: (self.x - rhs.x) / rhs.w * 2.0 - 1.0,
            y: (self.y - rhs.y) / rhs.h * 2.0 - 1.0,
            w: self.w / rhs.w,
            h: self.h / rhs.h,
        }
    }
}

/// A panel's placement in both pixel and normalized window space.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PanelRect {
    pub pixels: RectInt,
    pub normalized: RectFloat,
}

impl PanelRect {
    pub fn from_pixels(pixels: RectInt, window_width: u32, window_height: u32) -> Self {
        let ww = window_width.max(1) as f32;
        let wh = window_height.max(1) as f32;
        let normalized = RectFloat::new(
            pixel_to_normalized(pixels.x as f32, ww),
            pixel_to_normalized(pixels.y as f32, wh),
            2.0 * pixels.w as f32 / ww,
            2.0 * pixels.h as f32 / wh,
        );
        Self { pixels, normalized }
    }

    pub fn full_window(window_width: u32, window_height: u32) -> Self {
        Self::from_pixels(
            RectInt::new(0, 0, window_width as i32, window_height as i32),
            window_width,
            window_height,
        )
    }
}

/// Grid dimensions exposed by the solver.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GridExtents {
    pub visible_x: u32,
    pub visible_y: u32,
    pub max_x: u32,
    pub max_y: u32,
    pub scale_factor: f32,
}

impl GridExtents {
    pub fn new(visible_x: u32, visible_y: u32, max_x: u32, max_y: u32, scale_factor: f32) -> Self {
        Self {
            visible_x: visible_x.min(max_x),
            visible_y: visible_y.min(max_y),
            max_x,
            max_y,
            scale_factor,
        }
    }

    pub fn contains(&self, coord: GridCoord) -> bool {
        coord.x >= 0.0
            && coord.y >= 0.0
            && coord.x < self.visible_x as f32
            && coord.y < self.visible_y as f32
    }

    pub fn max_cells(&self) -> usize {
        self.max_x as usize * self.max_y as usize
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct GridCoord {
    pub x: f32,
    pub y: f32,
}

impl GridCoord {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: GridCoord) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn cell(&self) -> (i32, i32) {
        (self.x.floor() as i32, self.y.floor() as i32)
    }
}

pub fn pixel_to_normalized(pixel: f32, extent_pixels: f32) -> f32 {
    2.0 * pixel / extent_pixels - 1.0
}

pub fn normalized_to_pixel(normalized: f32, extent_pixels: f32) -> f32 {
    (normalized + 1.0) * 0.5 * extent_pixels
}

/// Maps a normalized window point into grid coordinates through the panel.
///
/// The scale is `visible / min(panel_pixels, max * scale_factor)`; the `min`
/// keeps a panel larger than the grid's drawn size from over-scaling.
pub fn normalized_to_grid(x: f32, y: f32, panel: &PanelRect, extents: &GridExtents) -> GridCoord {
    let relative = RectFloat::point(x, y) / panel.normalized;
    let panel_w = panel.pixels.w as f32;
    let panel_h = panel.pixels.h as f32;
    GridCoord {
        x: normalized_to_pixel(relative.x, panel_w) * grid_scale(extents.visible_x, panel_w, extents.max_x, extents.scale_factor),
        y: normalized_to_pixel(relative.y, panel_h) * grid_scale(extents.visible_y, panel_h, extents.max_y, extents.scale_factor),
    }
}

/// Single-step equivalent of `pixel_to_normalized` followed by `normalized_to_grid`.
pub fn pixel_to_grid(x: f32, y: f32, panel: &PanelRect, extents: &GridExtents) -> GridCoord {
    let panel_w = panel.pixels.w as f32;
    let panel_h = panel.pixels.h as f32;
    GridCoord {
        x: (x - panel.pixels.x as f32) * grid_scale(extents.visible_x, panel_w, extents.max_x, extents.scale_factor),
        y: (y - panel.pixels.y as f32) * grid_scale(extents.visible_y, panel_h, extents.max_y, extents.scale_factor),
    }
}

/// Surface-space point to grid. Both axes use the visible X extent because the
/// surface is laid out with square cells spanning `[-1, 1]` along x.
pub fn ndc_to_grid(x: f32, y: f32, extents: &GridExtents) -> GridCoord {
    let extent = extents.visible_x as f32;
    GridCoord {
        x: (x + 1.0) * 0.5 * extent,
        y: (y + 1.0) * 0.5 * extent,
    }
}

pub fn grid_to_ndc(coord: GridCoord, extents: &GridExtents) -> (f32, f32) {
    let extent = extents.visible_x.max(1) as f32;
    (coord.x / extent * 2.0 - 1.0, coord.y / extent * 2.0 - 1.0)
}

fn grid_scale(visible: u32, panel_pixels: f32, max: u32, scale_factor: f32) -> f32 {
    visible as f32 / panel_pixels.min(max as f32 * scale_factor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_pixel_to_normalized_edges() {
        assert_eq!(pixel_to_normalized(0.0, 800.0), -1.0);
        assert_eq!(pixel_to_normalized(400.0, 800.0), 0.0);
        assert_eq!(pixel_to_normalized(800.0, 800.0), 1.0);
    }

    #[test]
    fn test_full_window_panel_is_unit_square() {
        let panel = PanelRect::full_window(800, 600);
        assert_eq!(panel.normalized, RectFloat::new(-1.0, -1.0, 2.0, 2.0));
    }

    #[test]
    fn test_rect_division_relative_to_panel() {
        let panel = RectFloat::new(0.0, -1.0, 1.0, 2.0);
        let relative = RectFloat::point(0.5, 0.0) / panel;
        assert_abs_diff_eq!(relative.x, 0.0);
        assert_abs_diff_eq!(relative.y, 0.0);
    }

    #[test]
    fn test_scale_clamps_to_grid_drawn_size() {
        // Panel is wider than max_x * scale, so the grid's drawn width bounds the scale.
        let extents = GridExtents::new(100, 100, 200, 200, 2.0);
        let panel = PanelRect::full_window(1000, 400);
        let coord = pixel_to_grid(400.0, 0.0, &panel, &extents);
        assert_abs_diff_eq!(coord.x, 100.0);
    }

    #[test]
    fn test_ndc_grid_inverse() {
        let extents = GridExtents::new(256, 128, 512, 512, 1.0);
        let (x, y) = grid_to_ndc(GridCoord::new(64.0, 32.0), &extents);
        let back = ndc_to_grid(x, y, &extents);
        assert_abs_diff_eq!(back.x, 64.0, epsilon = 1e-4);
        assert_abs_diff_eq!(back.y, 32.0, epsilon = 1e-4);
    }
}
