//! Buffer shared between the compute stage and the render stage.
//!
//! The buffer is either exclusive for render (unmapped, bindable as a vertex
//! source) or exclusive for compute (mapped, host-visible floats). The only way
//! to reach the contents is [`SharedBuffer::map_for_compute`], which hands out
//! a guard that borrows the buffer mutably and unmaps on drop. Mapping twice or
//! binding for render while mapped therefore does not compile.
//!
//! Layout: two stacked layers of `max_x * max_y` vertices (surface, then
//! floor), each vertex four floats `[x, y, z, w]`.

use crate::coords::GridExtents;
use crate::error::InteractionError;
use std::ops::{Deref, DerefMut, Range};

pub const FLOATS_PER_VERTEX: usize = 4;
pub const LAYER_COUNT: usize = 2;
pub const SURFACE_LAYER: usize = 0;
pub const FLOOR_LAYER: usize = 1;

/// Storage behind a [`SharedBuffer`].
pub trait BufferBackend {
    /// Length in floats.
    fn len(&self) -> usize;
    fn download(&mut self) -> Result<Vec<f32>, InteractionError>;
    fn upload(&mut self, data: &[f32]) -> Result<(), InteractionError>;
    fn release(&mut self) {}

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AccessState {
    ExclusiveForRender,
    ExclusiveForCompute,
}

pub struct SharedBuffer<B: BufferBackend> {
    backend: B,
    state: AccessState,
    label: String,
}

impl<B: BufferBackend> SharedBuffer<B> {
    pub fn new(backend: B, label: &str) -> Self {
        log::info!("Registered shared buffer '{}' ({} floats)", label, backend.len());
        Self {
            backend,
            state: AccessState::ExclusiveForRender,
            label: label.to_string(),
        }
    }

    pub fn state(&self) -> AccessState {
        self.state
    }

    pub fn len(&self) -> usize {
        self.backend.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backend.is_empty()
    }

    pub fn size_in_bytes(&self) -> u64 {
        (self.backend.len() * std::mem::size_of::<f32>()) as u64
    }

    /// Render-side access. Unreachable while a [`ComputeAccess`] is alive.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn map_for_compute(&mut self) -> Result<ComputeAccess<'_, B>, InteractionError> {
        debug_assert_eq!(self.state, AccessState::ExclusiveForRender);
        let data = self.backend.download()?;
        self.state = AccessState::ExclusiveForCompute;
        log::trace!("Mapped '{}' for compute", self.label);
        Ok(ComputeAccess {
            buffer: self,
            data,
            dirty: false,
        })
    }

    /// Unregisters and frees the device storage.
    pub fn destroy(mut self) {
        self.backend.release();
        log::info!("Destroyed shared buffer '{}'", self.label);
    }
}

/// Mapped view of a [`SharedBuffer`]. Writes go back to the device on unmap.
pub struct ComputeAccess<'a, B: BufferBackend> {
    buffer: &'a mut SharedBuffer<B>,
    data: Vec<f32>,
    dirty: bool,
}

impl<B: BufferBackend> ComputeAccess<'_, B> {
    /// Explicit unmap that reports upload failures instead of logging them.
    pub fn unmap(mut self) -> Result<(), InteractionError> {
        self.flush()
    }

    fn flush(&mut self) -> Result<(), InteractionError> {
        let result = if self.dirty {
            self.buffer.backend.upload(&self.data)
        } else {
            Ok(())
        };
        self.dirty = false;
        self.buffer.state = AccessState::ExclusiveForRender;
        result
    }
}

impl<B: BufferBackend> Deref for ComputeAccess<'_, B> {
    type Target = [f32];

    fn deref(&self) -> &[f32] {
        &self.data
    }
}

impl<B: BufferBackend> DerefMut for ComputeAccess<'_, B> {
    fn deref_mut(&mut self) -> &mut [f32] {
        self.dirty = true;
        &mut self.data
    }
}

impl<B: BufferBackend> Drop for ComputeAccess<'_, B> {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            log::error!("Unmapping '{}' failed: {}", self.buffer.label, e);
        }
        log::trace!("Unmapped '{}' for render", self.buffer.label);
    }
}

/// In-memory backend for headless use and tests.
#[derive(Debug, Clone)]
pub struct HostBackend {
    data: Vec<f32>,
    pub downloads: usize,
    pub uploads: usize,
    pub released: bool,
}

impl HostBackend {
    pub fn new(len: usize) -> Self {
        Self {
            data: vec![0.0; len],
            downloads: 0,
            uploads: 0,
            released: false,
        }
    }

    pub fn for_extents(extents: &GridExtents) -> Self {
        Self::new(solution_len(extents))
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }
}

impl BufferBackend for HostBackend {
    fn len(&self) -> usize {
        self.data.len()
    }

    fn download(&mut self) -> Result<Vec<f32>, InteractionError> {
        self.downloads += 1;
        Ok(self.data.clone())
    }

    fn upload(&mut self, data: &[f32]) -> Result<(), InteractionError> {
        self.uploads += 1;
        self.data.copy_from_slice(data);
        Ok(())
    }

    fn release(&mut self) {
        self.data.clear();
        self.released = true;
    }
}

/// Floats needed for both layers at the maximum grid size.
pub fn solution_len(extents: &GridExtents) -> usize {
    LAYER_COUNT * extents.max_cells() * FLOATS_PER_VERTEX
}

/// Index of the first float of vertex `(i, j)` in `layer`.
pub fn vertex_offset(extents: &GridExtents, layer: usize, i: usize, j: usize) -> usize {
    let max_x = extents.max_x as usize;
    (layer * extents.max_cells() + i + j * max_x) * FLOATS_PER_VERTEX
}

/// Triangle-list connectivity for the surface layer followed by the floor layer.
/// Fixed for the lifetime of the buffer.
pub fn build_surface_indices(max_x: u32, max_y: u32) -> Vec<u32> {
    if max_x < 2 || max_y < 2 {
        return Vec::new();
    }
    let layer_vertices = max_x * max_y;
    let quads_per_layer = ((max_x - 1) * (max_y - 1)) as usize;
    let mut indices = Vec::with_capacity(LAYER_COUNT * quads_per_layer * 6);

    for layer in 0..LAYER_COUNT as u32 {
        let base = layer * layer_vertices;
        for j in 0..max_y - 1 {
            for i in 0..max_x - 1 {
                let a = base + i + j * max_x;
                let b = a + 1;
                let c = a + max_x;
                let d = c + 1;
                indices.extend_from_slice(&[a, b, d, a, d, c]);
            }
        }
    }
    indices
}

/// Index ranges of one layer that cover only the visible sub-grid, one per
/// quad row. Indices come from [`build_surface_indices`] for the maximum grid.
pub fn visible_index_ranges(extents: &GridExtents, layer: usize) -> Vec<Range<u32>> {
    let (max_x, max_y) = (extents.max_x, extents.max_y);
    let visible_x = extents.visible_x.min(max_x);
    let visible_y = extents.visible_y.min(max_y);
    if visible_x < 2 || visible_y < 2 || layer >= LAYER_COUNT {
        return Vec::new();
    }
    let row_quads = max_x - 1;
    let layer_base = layer as u32 * row_quads * (max_y - 1) * 6;

    (0..visible_y - 1)
        .map(|j| {
            let start = layer_base + j * row_quads * 6;
            start..start + (visible_x - 1) * 6
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_only_access_skips_upload() {
        let mut buffer = SharedBuffer::new(HostBackend::new(8), "test");
        {
            let field = buffer.map_for_compute().unwrap();
            assert_eq!(field.len(), 8);
        }
        assert_eq!(buffer.backend().downloads, 1);
        assert_eq!(buffer.backend().uploads, 0);
        assert_eq!(buffer.state(), AccessState::ExclusiveForRender);
    }

    #[test]
    fn test_degenerate_grid_has_no_indices() {
        assert!(build_surface_indices(1, 10).is_empty());
    }
}
