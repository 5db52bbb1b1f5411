use approx::assert_abs_diff_eq;
use cfd_interaction::coords::{
    grid_to_ndc, ndc_to_grid, normalized_to_grid, normalized_to_pixel, pixel_to_grid,
    pixel_to_normalized, GridCoord, GridExtents, PanelRect, RectFloat, RectInt,
};

#[test]
fn test_window_center_maps_to_grid_center() {
    let panel = PanelRect::full_window(800, 600);
    let extents = GridExtents::new(400, 300, 1024, 1024, 1.0);

    let nx = pixel_to_normalized(400.0, 800.0);
    let ny = pixel_to_normalized(300.0, 600.0);
    assert_abs_diff_eq!(nx, 0.0);
    assert_abs_diff_eq!(ny, 0.0);

    let grid = normalized_to_grid(nx, ny, &panel, &extents);
    assert_abs_diff_eq!(grid.x, 200.0, epsilon = 1e-4);
    assert_abs_diff_eq!(grid.y, 150.0, epsilon = 1e-4);
}

#[test]
fn test_two_step_mapping_matches_single_step() {
    let panel = PanelRect::from_pixels(RectInt::new(100, 50, 600, 400), 800, 600);
    let extents = GridExtents::new(300, 200, 512, 512, 1.0);

    for &(px, py) in &[(100.0, 50.0), (250.0, 75.0), (400.0, 250.0), (699.0, 449.0)] {
        let nx = pixel_to_normalized(px, 800.0);
        let ny = pixel_to_normalized(py, 600.0);
        let two_step = normalized_to_grid(nx, ny, &panel, &extents);
        let one_step = pixel_to_grid(px, py, &panel, &extents);
        assert_abs_diff_eq!(two_step.x, one_step.x, epsilon = 1e-3);
        assert_abs_diff_eq!(two_step.y, one_step.y, epsilon = 1e-3);
    }
}

#[test]
fn test_panel_origin_maps_to_grid_origin() {
    let panel = PanelRect::from_pixels(RectInt::new(200, 0, 600, 600), 800, 600);
    let extents = GridExtents::new(128, 128, 256, 256, 1.0);
    let grid = pixel_to_grid(200.0, 0.0, &panel, &extents);
    assert_abs_diff_eq!(grid.x, 0.0);
    assert_abs_diff_eq!(grid.y, 0.0);
}

#[test]
fn test_scale_factor_caps_panel_size() {
    // A 64-cell grid drawn 4px per cell only occupies 256 of the 800 panel pixels.
    let panel = PanelRect::full_window(800, 800);
    let extents = GridExtents::new(64, 64, 64, 64, 4.0);
    let grid = pixel_to_grid(128.0, 128.0, &panel, &extents);
    assert_abs_diff_eq!(grid.x, 32.0, epsilon = 1e-4);
    assert_abs_diff_eq!(grid.y, 32.0, epsilon = 1e-4);
}

#[test]
fn test_normalized_pixel_round_trip() {
    for &pixel in &[0.0, 1.0, 333.0, 799.0, 800.0] {
        let back = normalized_to_pixel(pixel_to_normalized(pixel, 800.0), 800.0);
        assert_abs_diff_eq!(back, pixel, epsilon = 1e-3);
    }
}

#[test]
fn test_rect_division_relative_to_panel() {
    let panel = RectFloat::new(-1.0, -1.0, 1.0, 2.0);
    let relative = RectFloat::point(-0.5, 0.0) / panel;
    assert_abs_diff_eq!(relative.x, 0.0);
    assert_abs_diff_eq!(relative.y, 0.0);
}

#[test]
fn test_surface_space_uses_visible_width_for_both_axes() {
    let extents = GridExtents::new(200, 100, 256, 256, 1.0);
    let grid = ndc_to_grid(0.0, 0.0, &extents);
    assert_abs_diff_eq!(grid.x, 100.0);
    assert_abs_diff_eq!(grid.y, 100.0);

    let (x, y) = grid_to_ndc(GridCoord::new(50.0, 150.0), &extents);
    let back = ndc_to_grid(x, y, &extents);
    assert_abs_diff_eq!(back.x, 50.0, epsilon = 1e-4);
    assert_abs_diff_eq!(back.y, 150.0, epsilon = 1e-4);
}

#[test]
fn test_visible_extents_clamped_to_maximum() {
    let extents = GridExtents::new(2048, 64, 1024, 1024, 1.0);
    assert_eq!(extents.visible_x, 1024);
    assert!(extents.contains(GridCoord::new(1023.5, 10.0)));
    assert!(!extents.contains(GridCoord::new(10.0, 64.0)));
    assert!(!extents.contains(GridCoord::new(-0.1, 10.0)));
}
