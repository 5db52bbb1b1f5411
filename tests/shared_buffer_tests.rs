use cfd_interaction::coords::{GridCoord, GridExtents};
use cfd_interaction::heightfield::{surface_height, write_rest_surface};
use cfd_interaction::shared_buffer::{
    build_surface_indices, solution_len, vertex_offset, visible_index_ranges, AccessState,
    HostBackend, SharedBuffer, FLOOR_LAYER, SURFACE_LAYER,
};

#[test]
fn test_index_count_covers_both_layers() {
    let (max_x, max_y) = (16u32, 9u32);
    let indices = build_surface_indices(max_x, max_y);
    assert_eq!(indices.len(), 2 * ((max_x - 1) * (max_y - 1) * 6) as usize);

    let vertex_count = 2 * max_x * max_y;
    assert!(indices.iter().all(|&i| i < vertex_count));
}

#[test]
fn test_floor_indices_follow_surface_indices() {
    let indices = build_surface_indices(4, 4);
    let half = indices.len() / 2;
    let layer_vertices = 16;
    assert!(indices[..half].iter().all(|&i| i < layer_vertices));
    assert!(indices[half..].iter().all(|&i| i >= layer_vertices));
}

#[test]
fn test_solution_layout() {
    let extents = GridExtents::new(10, 5, 32, 16, 1.0);
    assert_eq!(solution_len(&extents), 2 * 32 * 16 * 4);
    assert_eq!(vertex_offset(&extents, SURFACE_LAYER, 0, 0), 0);
    assert_eq!(vertex_offset(&extents, SURFACE_LAYER, 3, 2), (3 + 2 * 32) * 4);
    assert_eq!(vertex_offset(&extents, FLOOR_LAYER, 0, 0), 32 * 16 * 4);
}

#[test]
fn test_write_through_mapping_uploads_on_drop() {
    let mut buffer = SharedBuffer::new(HostBackend::new(16), "test field");
    assert_eq!(buffer.state(), AccessState::ExclusiveForRender);
    {
        let mut field = buffer.map_for_compute().unwrap();
        field[5] = 2.5;
    }
    assert_eq!(buffer.state(), AccessState::ExclusiveForRender);
    assert_eq!(buffer.backend().uploads, 1);
    assert_eq!(buffer.backend().data()[5], 2.5);
}

#[test]
fn test_explicit_unmap() {
    let mut buffer = SharedBuffer::new(HostBackend::new(8), "test field");
    let mut field = buffer.map_for_compute().unwrap();
    field[0] = 1.0;
    field.unmap().unwrap();

    assert_eq!(buffer.state(), AccessState::ExclusiveForRender);
    assert_eq!(buffer.backend().downloads, 1);
    assert_eq!(buffer.backend().uploads, 1);
}

#[test]
fn test_rest_surface_readable_through_mapping() {
    let extents = GridExtents::new(8, 8, 8, 8, 1.0);
    let mut buffer = SharedBuffer::new(HostBackend::for_extents(&extents), "test field");
    {
        let mut field = buffer.map_for_compute().unwrap();
        write_rest_surface(&mut field, &extents, 0.25, -1.0).unwrap();
    }

    let field = buffer.map_for_compute().unwrap();
    assert_eq!(surface_height(&field, &extents, GridCoord::new(3.5, 4.2)), Some(0.25));
    assert_eq!(surface_height(&field, &extents, GridCoord::new(8.0, 0.0)), None);
}

#[test]
fn test_size_in_bytes() {
    let buffer = SharedBuffer::new(HostBackend::new(4), "test field");
    assert_eq!(buffer.len(), 4);
    assert_eq!(buffer.size_in_bytes(), 16);
}

#[test]
fn test_visible_ranges_only_reference_visible_vertices() {
    let extents = GridExtents::new(5, 3, 16, 9, 1.0);
    let indices = build_surface_indices(extents.max_x, extents.max_y);
    let max_x = extents.max_x;

    let ranges = visible_index_ranges(&extents, SURFACE_LAYER);
    assert_eq!(ranges.len(), 2);
    let drawn: Vec<u32> = ranges
        .iter()
        .flat_map(|range| indices[range.start as usize..range.end as usize].iter().copied())
        .collect();
    assert_eq!(drawn.len(), 4 * 2 * 6);
    assert!(drawn.iter().all(|&v| v % max_x < 5 && v / max_x < 3));
    // Corners of the visible grid are covered.
    assert!(drawn.contains(&0));
    assert!(drawn.contains(&(4 + 2 * max_x)));
}

#[test]
fn test_visible_floor_ranges_stay_in_floor_layer() {
    let extents = GridExtents::new(5, 3, 16, 9, 1.0);
    let indices = build_surface_indices(extents.max_x, extents.max_y);
    let layer_vertices = extents.max_x * extents.max_y;

    for range in visible_index_ranges(&extents, FLOOR_LAYER) {
        for &v in &indices[range.start as usize..range.end as usize] {
            let local = v - layer_vertices;
            assert!(v >= layer_vertices);
            assert!(local % extents.max_x < 5 && local / extents.max_x < 3);
        }
    }
}

#[test]
fn test_full_visible_grid_draws_whole_layer() {
    let extents = GridExtents::new(8, 8, 8, 8, 1.0);
    let ranges = visible_index_ranges(&extents, SURFACE_LAYER);
    let total: u32 = ranges.iter().map(|range| range.end - range.start).sum();
    assert_eq!(total, 7 * 7 * 6);
    assert!(visible_index_ranges(&GridExtents::new(1, 8, 8, 8, 1.0), SURFACE_LAYER).is_empty());
}
