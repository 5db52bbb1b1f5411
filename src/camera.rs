//! View transform for the simulation viewport.
//!
//! One `ViewTransform` feeds both the render stage and the ray caster, so a
//! pick always unprojects through the same matrices the frame was drawn with.
//! Rotation is (pitch, yaw) in degrees; translation is (pan x, pan y, zoom).

use crate::coords::GridExtents;
use crate::ray::{CameraMatrices, Viewport};
use glam::{Mat4, Vec2, Vec3};

const DEFAULT_FOV_DEGREES: f32 = 45.0;
const NEAR_PLANE: f32 = 0.1;
const FAR_PLANE: f32 = 100.0;
const CAMERA_DISTANCE: f32 = 2.0;
const DEFAULT_PITCH_DEGREES: f32 = -60.0;
const MIN_PITCH_DEGREES: f32 = -180.0;
const MAX_PITCH_DEGREES: f32 = 0.0;
const MAX_ZOOM: f32 = 1.5;
const MIN_ZOOM: f32 = -20.0;
const ORTHO_NEAR: f32 = -100.0;
const ORTHO_FAR: f32 = 20.0;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ViewMode {
    TwoDimensional,
    ThreeDimensional,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ViewTransform {
    pub rotation: Vec2,
    pub translation: Vec3,
    pub mode: ViewMode,
}

impl ViewTransform {
    pub fn new(mode: ViewMode) -> Self {
        Self {
            rotation: Vec2::new(DEFAULT_PITCH_DEGREES, 0.0),
            translation: Vec3::ZERO,
            mode,
        }
    }

    pub fn rotate(&mut self, delta_pitch: f32, delta_yaw: f32) {
        self.rotation.x = (self.rotation.x + delta_pitch).clamp(MIN_PITCH_DEGREES, MAX_PITCH_DEGREES);
        self.rotation.y = (self.rotation.y + delta_yaw) % 360.0;
    }

    pub fn pan(&mut self, delta_x: f32, delta_y: f32) {
        self.translation.x += delta_x;
        self.translation.y += delta_y;
    }

    pub fn zoom(&mut self, delta: f32) {
        self.translation.z = (self.translation.z + delta).clamp(MIN_ZOOM, MAX_ZOOM);
    }

    pub fn set_mode(&mut self, mode: ViewMode) {
        if self.mode != mode {
            log::info!("View mode changed to {:?}", mode);
        }
        self.mode = mode;
    }

    pub fn toggle_mode(&mut self) {
        let next = match self.mode {
            ViewMode::TwoDimensional => ViewMode::ThreeDimensional,
            ViewMode::ThreeDimensional => ViewMode::TwoDimensional,
        };
        self.set_mode(next);
    }

    /// Identity in 2D mode: the planar view is drawn straight into the panel.
    pub fn view_matrix(&self) -> Mat4 {
        match self.mode {
            ViewMode::TwoDimensional => Mat4::IDENTITY,
            ViewMode::ThreeDimensional => {
                let eye_offset = Vec3::new(
                    self.translation.x,
                    self.translation.y,
                    -CAMERA_DISTANCE + self.translation.z,
                );
                Mat4::from_translation(eye_offset)
                    * Mat4::from_rotation_x(self.rotation.x.to_radians())
                    * Mat4::from_rotation_z(self.rotation.y.to_radians())
            }
        }
    }

    /// In 2D mode the visible grid is drawn from the panel origin over
    /// `min(panel_pixels, max * scale_factor)` pixels per axis, the same extent
    /// the coordinate mapper divides by, so a click lands on the cell under it.
    pub fn projection_matrix(&self, viewport: Viewport, extents: &GridExtents) -> Mat4 {
        match self.mode {
            ViewMode::TwoDimensional => {
                let visible_x = extents.visible_x.max(1) as f32;
                let visible_y = extents.visible_y.max(1) as f32;
                let width = viewport.width.max(1.0);
                let height = viewport.height.max(1.0);
                let drawn_x = drawn_extent(width, extents.max_x, extents.scale_factor);
                let drawn_y = drawn_extent(height, extents.max_y, extents.scale_factor);
                // Surface space spans 2 units per visible_x cells on both axes.
                let right = -1.0 + 2.0 * width / drawn_x;
                let top = -1.0 + 2.0 * (visible_y / visible_x) * height / drawn_y;
                Mat4::orthographic_rh(-1.0, right, -1.0, top, ORTHO_NEAR, ORTHO_FAR)
            }
            ViewMode::ThreeDimensional => Mat4::perspective_rh(
                DEFAULT_FOV_DEGREES.to_radians(),
                viewport.aspect_ratio(),
                NEAR_PLANE,
                FAR_PLANE,
            ),
        }
    }

    pub fn camera_matrices(&self, viewport: Viewport, extents: &GridExtents) -> CameraMatrices {
        CameraMatrices {
            view: self.view_matrix(),
            projection: self.projection_matrix(viewport, extents),
            viewport,
        }
    }

    pub fn view_projection_matrix(&self, viewport: Viewport, extents: &GridExtents) -> [[f32; 4]; 4] {
        let matrices = self.camera_matrices(viewport, extents);
        (matrices.projection * matrices.view).to_cols_array_2d()
    }
}

/// Pixels the grid occupies along one panel axis; never zero.
fn drawn_extent(panel_pixels: f32, max_cells: u32, scale_factor: f32) -> f32 {
    let drawn = panel_pixels.min(max_cells as f32 * scale_factor);
    if drawn > 0.0 {
        drawn
    } else {
        panel_pixels
    }
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::new(ViewMode::TwoDimensional)
    }
}
