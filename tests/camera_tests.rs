use approx::assert_abs_diff_eq;
use cfd_interaction::camera::{ViewMode, ViewTransform};
use cfd_interaction::coords::GridExtents;
use cfd_interaction::ray::Viewport;
use glam::{Mat4, Vec4};

fn viewport() -> Viewport {
    Viewport::new(0.0, 0.0, 800.0, 600.0)
}

fn extents() -> GridExtents {
    GridExtents::new(256, 128, 512, 512, 1.0)
}

fn assert_finite(matrix: &[[f32; 4]; 4], context: &str) {
    for column in matrix {
        for &val in column {
            assert!(val.is_finite(), "View projection contains non-finite values {}", context);
        }
    }
}

#[test]
fn test_view_transform_creation() {
    let view = ViewTransform::new(ViewMode::ThreeDimensional);
    let matrix = view.view_projection_matrix(viewport(), &extents());

    let identity = Mat4::IDENTITY.to_cols_array_2d();
    assert_ne!(matrix, identity, "3D view projection should not be identity");
    assert_finite(&matrix, "after creation");
}

#[test]
fn test_default_is_planar() {
    let view = ViewTransform::default();
    assert_eq!(view.mode, ViewMode::TwoDimensional);
    assert_eq!(view.view_matrix(), Mat4::IDENTITY);
}

#[test]
fn test_planar_projection_spans_visible_grid() {
    // Buffer larger than the panel: 256x128 visible covers x in [-1, 1], y in [-1, 0].
    let extents = GridExtents::new(256, 128, 1024, 1024, 1.0);
    let view = ViewTransform::default();
    let projection = view.projection_matrix(viewport(), &extents);

    let top_right = projection * Vec4::new(1.0, 0.0, 0.0, 1.0);
    assert_abs_diff_eq!(top_right.x, 1.0, epsilon = 1e-6);
    assert_abs_diff_eq!(top_right.y, 1.0, epsilon = 1e-6);

    let bottom_left = projection * Vec4::new(-1.0, -1.0, 0.0, 1.0);
    assert_abs_diff_eq!(bottom_left.x, -1.0, epsilon = 1e-6);
    assert_abs_diff_eq!(bottom_left.y, -1.0, epsilon = 1e-6);
}

#[test]
fn test_planar_projection_capped_by_scaled_maximum() {
    // max * scale = 512px on both axes, so the grid fills 512 of 800x600 pixels.
    let view = ViewTransform::default();
    let projection = view.projection_matrix(viewport(), &extents());

    let top_right = projection * Vec4::new(1.0, 0.0, 0.0, 1.0);
    let pixel_x = (top_right.x + 1.0) * 0.5 * 800.0;
    let pixel_y = (top_right.y + 1.0) * 0.5 * 600.0;
    assert_abs_diff_eq!(pixel_x, 512.0, epsilon = 1e-3);
    assert_abs_diff_eq!(pixel_y, 512.0, epsilon = 1e-3);

    let origin = projection * Vec4::new(-1.0, -1.0, 0.0, 1.0);
    assert_abs_diff_eq!(origin.x, -1.0, epsilon = 1e-6);
    assert_abs_diff_eq!(origin.y, -1.0, epsilon = 1e-6);
}

#[test]
fn test_rotation_changes_matrix() {
    let mut view = ViewTransform::new(ViewMode::ThreeDimensional);
    let initial = view.view_projection_matrix(viewport(), &extents());

    view.rotate(-10.0, 15.0);
    let rotated = view.view_projection_matrix(viewport(), &extents());

    assert_ne!(initial, rotated, "View projection should change after rotation");
}

#[test]
fn test_pitch_is_clamped() {
    let mut view = ViewTransform::new(ViewMode::ThreeDimensional);
    view.rotate(500.0, 0.0);
    assert_abs_diff_eq!(view.rotation.x, 0.0);

    view.rotate(-1000.0, 0.0);
    assert_abs_diff_eq!(view.rotation.x, -180.0);
    assert_finite(&view.view_projection_matrix(viewport(), &extents()), "at pitch limit");
}

#[test]
fn test_yaw_wraps() {
    let mut view = ViewTransform::new(ViewMode::ThreeDimensional);
    view.rotate(0.0, 370.0);
    assert_abs_diff_eq!(view.rotation.y, 10.0, epsilon = 1e-4);
}

#[test]
fn test_zoom_is_clamped() {
    let mut view = ViewTransform::new(ViewMode::ThreeDimensional);
    view.zoom(100.0);
    assert_abs_diff_eq!(view.translation.z, 1.5);
    assert_finite(&view.view_projection_matrix(viewport(), &extents()), "at closest zoom");

    view.zoom(-100.0);
    assert_abs_diff_eq!(view.translation.z, -20.0);
}

#[test]
fn test_aspect_ratio_changes_perspective() {
    let view = ViewTransform::new(ViewMode::ThreeDimensional);
    let wide = view.view_projection_matrix(Viewport::new(0.0, 0.0, 1600.0, 900.0), &extents());
    let square = view.view_projection_matrix(Viewport::new(0.0, 0.0, 800.0, 800.0), &extents());
    assert_ne!(wide, square, "View projection should follow the viewport aspect ratio");
}

#[test]
fn test_toggle_mode() {
    let mut view = ViewTransform::default();
    view.toggle_mode();
    assert_eq!(view.mode, ViewMode::ThreeDimensional);
    view.toggle_mode();
    assert_eq!(view.mode, ViewMode::TwoDimensional);
}
