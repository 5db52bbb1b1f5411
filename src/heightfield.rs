//! CPU ray/surface intersection over the mapped solution field.
//!
//! The surface layer stores one vertex per grid cell with its height in `z`.
//! The marcher clips the ray to the box spanned by the visible surface (its
//! x/y footprint and height range), steps through that interval and, once it
//! drops below the surface, bisects the last step to refine the hit. The
//! interval comes from the ray itself, so picks work at any camera distance.

use crate::coords::{grid_to_ndc, ndc_to_grid, GridCoord, GridExtents};
use crate::error::InteractionError;
use crate::ray::{Ray, SurfaceIntersector};
use crate::shared_buffer::{solution_len, vertex_offset, FLOOR_LAYER, SURFACE_LAYER};
use glam::Vec3;

const DEFAULT_STEP: f32 = 0.002;
const DEFAULT_MAX_STEPS: usize = 20_000;
const REFINE_ITERATIONS: usize = 16;
const BOUNDS_PADDING: f32 = 1e-4;

pub const REST_SURFACE_Z: f32 = 0.0;
pub const REST_FLOOR_Z: f32 = -1.0;

/// Writes a flat surface and floor so the field is valid before the first solver step.
pub fn write_rest_surface(
    field: &mut [f32],
    extents: &GridExtents,
    surface_z: f32,
    floor_z: f32,
) -> Result<(), InteractionError> {
    let needed = solution_len(extents);
    if field.len() < needed {
        return Err(InteractionError::FieldTooSmall {
            needed,
            available: field.len(),
        });
    }

    for j in 0..extents.max_y as usize {
        for i in 0..extents.max_x as usize {
            let (x, y) = grid_to_ndc(GridCoord::new(i as f32, j as f32), extents);
            for (layer, z) in [(SURFACE_LAYER, surface_z), (FLOOR_LAYER, floor_z)] {
                let offset = vertex_offset(extents, layer, i, j);
                field[offset..offset + 4].copy_from_slice(&[x, y, z, 0.0]);
            }
        }
    }
    Ok(())
}

/// Lowest and highest surface height over the visible grid.
pub fn surface_bounds(field: &[f32], extents: &GridExtents) -> Option<(f32, f32)> {
    let mut bounds: Option<(f32, f32)> = None;
    for j in 0..extents.visible_y as usize {
        for i in 0..extents.visible_x as usize {
            let z = *field.get(vertex_offset(extents, SURFACE_LAYER, i, j) + 2)?;
            if !z.is_finite() {
                continue;
            }
            bounds = Some(match bounds {
                Some((low, high)) => (low.min(z), high.max(z)),
                None => (z, z),
            });
        }
    }
    bounds
}

/// Surface height at a grid coordinate, or `None` outside the visible grid.
pub fn surface_height(field: &[f32], extents: &GridExtents, coord: GridCoord) -> Option<f32> {
    if !extents.contains(coord) {
        return None;
    }
    let (i, j) = coord.cell();
    let offset = vertex_offset(extents, SURFACE_LAYER, i as usize, j as usize);
    field.get(offset + 2).copied()
}

#[derive(Copy, Clone, Debug)]
pub struct HeightFieldMarcher {
    /// Preferred step along the ray, in surface units.
    pub step: f32,
    /// Upper bound on samples per ray; the step grows for long intervals.
    pub max_steps: usize,
}

impl HeightFieldMarcher {
    pub fn new(step: f32, max_steps: usize) -> Self {
        Self { step, max_steps }
    }

    fn below_surface(&self, point: Vec3, field: &[f32], extents: &GridExtents) -> Option<f32> {
        let coord = ndc_to_grid(point.x, point.y, extents);
        surface_height(field, extents, coord).filter(|height| point.z <= *height)
    }

    /// Parameter interval where the ray is inside the visible surface's box.
    fn march_interval(&self, ray: &Ray, field: &[f32], extents: &GridExtents) -> Option<(f32, f32)> {
        let (low_z, high_z) = surface_bounds(field, extents)?;
        let corner = GridCoord::new(extents.visible_x as f32, extents.visible_y as f32);
        let (max_x, max_y) = grid_to_ndc(corner, extents);
        let low = Vec3::new(-1.0, -1.0, low_z - BOUNDS_PADDING);
        let high = Vec3::new(max_x, max_y, high_z + BOUNDS_PADDING);

        let mut t_enter = 0.0f32;
        let mut t_exit = f32::INFINITY;
        for axis in 0..3 {
            let origin = ray.origin[axis];
            let direction = ray.direction[axis];
            if direction.abs() < f32::EPSILON {
                if origin < low[axis] || origin > high[axis] {
                    return None;
                }
                continue;
            }
            let t0 = (low[axis] - origin) / direction;
            let t1 = (high[axis] - origin) / direction;
            t_enter = t_enter.max(t0.min(t1));
            t_exit = t_exit.min(t0.max(t1));
        }
        (t_enter <= t_exit && t_exit.is_finite()).then_some((t_enter, t_exit))
    }
}

impl Default for HeightFieldMarcher {
    fn default() -> Self {
        Self::new(DEFAULT_STEP, DEFAULT_MAX_STEPS)
    }
}

impl SurfaceIntersector for HeightFieldMarcher {
    fn intersect(&self, ray: &Ray, field: &[f32], extents: &GridExtents) -> Option<Vec3> {
        if ray.is_degenerate() || self.step <= 0.0 || self.max_steps == 0 {
            return None;
        }
        let (t_enter, t_exit) = self.march_interval(ray, field, extents)?;
        let step = self.step.max((t_exit - t_enter) / self.max_steps as f32);

        let mut previous_t = t_enter;
        let mut t = t_enter;
        loop {
            if self.below_surface(ray.at(t), field, extents).is_some() {
                // Bisect between the last point above the surface and this one.
                let (mut above, mut below) = (previous_t, t);
                for _ in 0..REFINE_ITERATIONS {
                    let mid = 0.5 * (above + below);
                    if self.below_surface(ray.at(mid), field, extents).is_some() {
                        below = mid;
                    } else {
                        above = mid;
                    }
                }
                let hit = ray.at(below);
                let coord = ndc_to_grid(hit.x, hit.y, extents);
                let height = surface_height(field, extents, coord)?;
                return Some(Vec3::new(hit.x, hit.y, height));
            }
            if t >= t_exit {
                return None;
            }
            previous_t = t;
            t = (t + step).min(t_exit);
        }
    }
}
