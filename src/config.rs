use crate::obstruction::Shape;

pub const DEFAULT_MAX_VELOCITY: f32 = 0.1;
pub const DEFAULT_TIMESTEPS_PER_FRAME: f32 = 100.0;
pub const DEFAULT_CREATE_PLANE_Z: f32 = -0.5;

/// Tunable constants of the interaction controller.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct InteractionConfig {
    /// Bound on each obstruction velocity component pushed to the solver.
    pub max_velocity: f32,
    /// Divisor turning a per-event grid delta into a per-step velocity.
    pub timesteps_per_frame: f32,
    /// Plane depth for right-click creation in 3D mode.
    pub create_plane_z: f32,
    pub drag_tolerance: f32,
    pub remove_tolerance: f32,
    pub current_shape: Shape,
    pub current_size: f32,
    /// Degrees of rotation per unit of normalized pointer travel.
    pub rotate_sensitivity: f32,
    pub pan_sensitivity: f32,
    pub zoom_step: f32,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            max_velocity: DEFAULT_MAX_VELOCITY,
            timesteps_per_frame: DEFAULT_TIMESTEPS_PER_FRAME,
            create_plane_z: DEFAULT_CREATE_PLANE_Z,
            drag_tolerance: 0.0,
            remove_tolerance: 5.0,
            current_shape: Shape::Square,
            current_size: 5.0,
            rotate_sensitivity: 100.0,
            pan_sensitivity: 1.0,
            zoom_step: 0.1,
        }
    }
}
