//! Mouse ray construction and intersection.
//!
//! A pointer position is unprojected at depth 0 and depth 1 through the
//! current view/projection/viewport; the difference is the ray direction.
//! Depth follows wgpu's `[0, 1]` clip range.

use crate::coords::{ndc_to_grid, GridCoord, GridExtents, RectInt};
use crate::error::InteractionError;
use crate::shared_buffer::{BufferBackend, SharedBuffer};
use glam::{Mat4, Vec3, Vec4};

const SINGULAR_EPSILON: f32 = 1e-12;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    pub fn degenerate() -> Self {
        Self::new(Vec3::ZERO, Vec3::ZERO)
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    pub fn is_degenerate(&self) -> bool {
        self.direction.length_squared() <= f32::EPSILON
    }
}

/// Viewport rectangle in pixels, origin at the bottom-left.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn aspect_ratio(&self) -> f32 {
        if self.height > 0.0 {
            self.width / self.height
        } else {
            1.0
        }
    }
}

impl From<RectInt> for Viewport {
    fn from(rect: RectInt) -> Self {
        Self::new(rect.x as f32, rect.y as f32, rect.w as f32, rect.h as f32)
    }
}

/// View state captured at the moment of a pointer event.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CameraMatrices {
    pub view: Mat4,
    pub projection: Mat4,
    pub viewport: Viewport,
}

/// Window point (pixels, depth in `[0, 1]`) back to world space.
/// Returns `None` when the combined transform is singular.
pub fn unproject(window: Vec3, matrices: &CameraMatrices) -> Option<Vec3> {
    let view_projection = matrices.projection * matrices.view;
    if view_projection.determinant().abs() < SINGULAR_EPSILON {
        return None;
    }
    let viewport = &matrices.viewport;
    if viewport.width <= 0.0 || viewport.height <= 0.0 {
        return None;
    }

    let ndc = Vec4::new(
        (window.x - viewport.x) / viewport.width * 2.0 - 1.0,
        (window.y - viewport.y) / viewport.height * 2.0 - 1.0,
        window.z,
        1.0,
    );
    let world = view_projection.inverse() * ndc;
    if world.w.abs() < f32::EPSILON {
        return None;
    }
    Some(world.truncate() / world.w)
}

/// Ray through a pointer position. Yields a zero-length direction if the
/// projection is singular; callers must check before dividing by it.
pub fn mouse_ray(x: f32, y: f32, matrices: &CameraMatrices) -> Ray {
    let near = unproject(Vec3::new(x, y, 0.0), matrices);
    let far = unproject(Vec3::new(x, y, 1.0), matrices);
    match (near, far) {
        (Some(near), Some(far)) => Ray::new(near, (far - near).normalize_or_zero()),
        _ => Ray::degenerate(),
    }
}

/// Intersects the ray with the plane `z = plane_z`, returning `(t, point)`.
pub fn intersect_plane(ray: &Ray, plane_z: f32) -> Option<(f32, Vec3)> {
    if ray.direction.z.abs() < f32::EPSILON {
        return None;
    }
    let t = (plane_z - ray.origin.z) / ray.direction.z;
    Some((t, ray.at(t)))
}

/// Ray/surface intersection against the live solution field.
///
/// `field` is the mapped shared buffer; the hit is returned in surface space,
/// where x and y span `[-1, 1]` over the visible grid.
pub trait SurfaceIntersector {
    fn intersect(&self, ray: &Ray, field: &[f32], extents: &GridExtents) -> Option<Vec3>;
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SurfacePick {
    pub grid: GridCoord,
    pub depth: f32,
}

/// Maps the shared buffer, runs the intersector and unmaps again.
///
/// `Ok(None)` is a miss: degenerate ray, no intersection, or a hit outside the
/// visible grid.
pub fn pick_surface<B, I>(
    ray: &Ray,
    buffer: &mut SharedBuffer<B>,
    intersector: &I,
    extents: &GridExtents,
) -> Result<Option<SurfacePick>, InteractionError>
where
    B: BufferBackend,
    I: SurfaceIntersector + ?Sized,
{
    if ray.is_degenerate() {
        return Ok(None);
    }

    let hit = {
        let field = buffer.map_for_compute()?;
        intersector.intersect(ray, &field, extents)
    };

    let Some(hit) = hit else {
        return Ok(None);
    };
    let grid = ndc_to_grid(hit.x, hit.y, extents);
    if !extents.contains(grid) {
        return Ok(None);
    }
    log::debug!("Surface pick at grid ({:.1}, {:.1}), depth {:.3}", grid.x, grid.y, hit.z);
    Ok(Some(SurfacePick { grid, depth: hit.z }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn identity_matrices() -> CameraMatrices {
        CameraMatrices {
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            viewport: Viewport::new(0.0, 0.0, 2.0, 2.0),
        }
    }

    #[test]
    fn test_unproject_identity() {
        let matrices = identity_matrices();
        let near = unproject(Vec3::new(1.0, 1.0, 0.0), &matrices).unwrap();
        let far = unproject(Vec3::new(2.0, 0.0, 1.0), &matrices).unwrap();
        assert_abs_diff_eq!(near.x, 0.0);
        assert_abs_diff_eq!(near.z, 0.0);
        assert_abs_diff_eq!(far.x, 1.0);
        assert_abs_diff_eq!(far.y, -1.0);
        assert_abs_diff_eq!(far.z, 1.0);
    }

    #[test]
    fn test_singular_projection_gives_degenerate_ray() {
        let mut matrices = identity_matrices();
        matrices.projection = Mat4::ZERO;
        let ray = mouse_ray(1.0, 1.0, &matrices);
        assert!(ray.is_degenerate());
    }

    #[test]
    fn test_parallel_ray_misses_plane() {
        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        assert!(intersect_plane(&ray, -0.5).is_none());
    }
}
