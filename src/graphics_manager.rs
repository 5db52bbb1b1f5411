//! Pointer-driven obstruction editing.
//!
//! `GraphicsManager` owns the obstruction registry, the view transform and the
//! shared solution buffer. Pointer events arrive in window pixels with y
//! growing downward; they are flipped once on entry and from then on every
//! coordinate has y growing upward.
//!
//! Per session the controller is either idle or dragging one obstruction:
//!
//! - left: pick (surface ray cast in 3D, direct mapping in 2D) and start dragging
//! - right: create at the resolved grid coordinate
//! - middle: remove the containing obstruction, then rotate on drag;
//!   with the pan modifier it only pans
//! - wheel: zoom

use crate::camera::{ViewMode, ViewTransform};
use crate::config::InteractionConfig;
use crate::coords::{
    ndc_to_grid, normalized_to_grid, pixel_to_normalized, GridCoord, GridExtents, PanelRect, RectInt,
};
use crate::error::InteractionError;
use crate::obstruction::{Obstruction, ObstructionMirror, ObstructionRegistry, Shape};
use crate::ray::{intersect_plane, mouse_ray, pick_surface, CameraMatrices, SurfaceIntersector, SurfacePick};
use crate::shared_buffer::{BufferBackend, SharedBuffer};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PointerButton {
    Left,
    Right,
    Middle,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WheelDirection {
    Up,
    Down,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum PointerOutcome {
    Idle,
    Dragging(usize),
    Created(usize),
    Removed(usize),
    Moved(usize),
    Missed,
    Camera,
}

#[derive(Copy, Clone, Debug)]
struct DragSession {
    active: Option<usize>,
    last_x: f32,
    last_y: f32,
    button: PointerButton,
    pan: bool,
}

pub struct GraphicsManager<B: BufferBackend, M: ObstructionMirror> {
    registry: ObstructionRegistry<M>,
    view: ViewTransform,
    surface: SharedBuffer<B>,
    intersector: Box<dyn SurfaceIntersector>,
    extents: GridExtents,
    panel: PanelRect,
    window_width: u32,
    window_height: u32,
    current_z: f32,
    session: Option<DragSession>,
    config: InteractionConfig,
}

impl<B: BufferBackend, M: ObstructionMirror> GraphicsManager<B, M> {
    pub fn new(
        mirror: M,
        surface: SharedBuffer<B>,
        intersector: Box<dyn SurfaceIntersector>,
        extents: GridExtents,
        window_width: u32,
        window_height: u32,
        config: InteractionConfig,
    ) -> Self {
        Self {
            registry: ObstructionRegistry::new(mirror, config.max_velocity),
            view: ViewTransform::default(),
            surface,
            intersector,
            extents,
            panel: PanelRect::full_window(window_width, window_height),
            window_width,
            window_height,
            current_z: config.create_plane_z,
            session: None,
            config,
        }
    }

    pub fn registry(&self) -> &ObstructionRegistry<M> {
        &self.registry
    }

    pub fn surface(&self) -> &SharedBuffer<B> {
        &self.surface
    }

    /// For the solver collaborator, which maps the buffer to write the field.
    pub fn surface_mut(&mut self) -> &mut SharedBuffer<B> {
        &mut self.surface
    }

    pub fn extents(&self) -> &GridExtents {
        &self.extents
    }

    pub fn panel(&self) -> &PanelRect {
        &self.panel
    }

    pub fn config(&self) -> &InteractionConfig {
        &self.config
    }

    pub fn current_z(&self) -> f32 {
        self.current_z
    }

    pub fn active_obstruction(&self) -> Option<usize> {
        self.session.and_then(|s| s.active)
    }

    pub fn obstruction_snapshot(&self) -> Vec<(usize, Obstruction)> {
        self.registry.snapshot()
    }

    pub fn view_transform(&self) -> ViewTransform {
        self.view
    }

    pub fn set_view_mode(&mut self, mode: ViewMode) {
        self.view.set_mode(mode);
    }

    pub fn toggle_view_mode(&mut self) {
        self.view.toggle_mode();
    }

    pub fn set_current_shape(&mut self, shape: Shape) {
        self.config.current_shape = shape;
    }

    pub fn set_current_size(&mut self, size: f32) {
        self.config.current_size = size.max(0.0);
    }

    pub fn set_panel(&mut self, panel: PanelRect) {
        self.panel = panel;
    }

    /// Window resize. The graphics panel keeps its share of the window.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        let sx = width as f32 / self.window_width.max(1) as f32;
        let sy = height as f32 / self.window_height.max(1) as f32;
        let old = self.panel.pixels;
        let pixels = RectInt::new(
            (old.x as f32 * sx).round() as i32,
            (old.y as f32 * sy).round() as i32,
            (old.w as f32 * sx).round() as i32,
            (old.h as f32 * sy).round() as i32,
        );
        self.window_width = width;
        self.window_height = height;
        self.panel = PanelRect::from_pixels(pixels, width, height);
    }

    pub fn set_grid_extents(&mut self, extents: GridExtents) -> Result<(), InteractionError> {
        if extents.visible_x > self.extents.max_x || extents.visible_y > self.extents.max_y {
            return Err(InteractionError::GridTooLarge {
                visible_x: extents.visible_x,
                visible_y: extents.visible_y,
                max_x: self.extents.max_x,
                max_y: self.extents.max_y,
            });
        }
        self.extents = GridExtents {
            max_x: self.extents.max_x,
            max_y: self.extents.max_y,
            ..extents
        };
        Ok(())
    }

    /// View state the render stage must draw with so picks agree with the frame.
    pub fn camera_matrices(&self) -> CameraMatrices {
        self.view.camera_matrices(self.panel.pixels.into(), &self.extents)
    }

    pub fn on_pointer_down(
        &mut self,
        x: f32,
        y: f32,
        button: PointerButton,
        pan_modifier: bool,
    ) -> Result<PointerOutcome, InteractionError> {
        let y = self.flip_y(y);
        let result = self.dispatch_pointer_down(x, y, button, pan_modifier);
        // A second button pressed mid-gesture acts once but does not take over.
        if self.session.is_some() {
            return result;
        }
        let active = match result {
            Ok(PointerOutcome::Dragging(slot)) => Some(slot),
            _ => None,
        };
        self.session = Some(DragSession {
            active,
            last_x: x,
            last_y: y,
            button,
            pan: pan_modifier,
        });
        result
    }

    pub fn on_pointer_move(&mut self, x: f32, y: f32) -> Result<PointerOutcome, InteractionError> {
        let y = self.flip_y(y);
        let Some(session) = self.session else {
            return Ok(PointerOutcome::Idle);
        };

        let outcome = match (session.button, session.active) {
            (PointerButton::Middle, _) => {
                self.camera_gesture(&session, x, y);
                Ok(PointerOutcome::Camera)
            }
            (PointerButton::Left, Some(slot)) => self.drag_obstruction(slot, &session, x, y),
            _ => Ok(PointerOutcome::Idle),
        };

        if let Some(session) = self.session.as_mut() {
            session.last_x = x;
            session.last_y = y;
        }
        outcome
    }

    /// Ends the session only when `button` is the one that started it.
    pub fn on_pointer_up(&mut self, _x: f32, _y: f32, button: PointerButton) -> PointerOutcome {
        match self.session {
            Some(session) if session.button != button => PointerOutcome::Idle,
            _ => {
                self.session = None;
                PointerOutcome::Idle
            }
        }
    }

    pub fn on_wheel(&mut self, direction: WheelDirection) {
        let delta = match direction {
            WheelDirection::Up => self.config.zoom_step,
            WheelDirection::Down => -self.config.zoom_step,
        };
        self.view.zoom(delta);
    }

    /// Releases the shared buffer. Consumes the controller.
    pub fn shutdown(self) {
        self.surface.destroy();
    }

    fn dispatch_pointer_down(
        &mut self,
        x: f32,
        y: f32,
        button: PointerButton,
        pan_modifier: bool,
    ) -> Result<PointerOutcome, InteractionError> {
        match (button, self.view.mode) {
            (PointerButton::Left, ViewMode::ThreeDimensional) => {
                Ok(match self.pick_surface_at(x, y)? {
                    Some(pick) => self
                        .registry
                        .find_nearest(pick.grid.x, pick.grid.y)
                        .map_or(PointerOutcome::Idle, PointerOutcome::Dragging),
                    None => PointerOutcome::Missed,
                })
            }
            (PointerButton::Left, ViewMode::TwoDimensional) => {
                let coord = self.grid_from_pointer(x, y);
                Ok(self
                    .registry
                    .find_containing(coord.x, coord.y, self.config.drag_tolerance)
                    .map_or(PointerOutcome::Idle, PointerOutcome::Dragging))
            }
            (PointerButton::Right, mode) => {
                let coord = match mode {
                    ViewMode::TwoDimensional => Some(self.grid_from_pointer(x, y)),
                    ViewMode::ThreeDimensional => self.grid_on_plane(x, y, self.config.create_plane_z),
                };
                let Some(coord) = coord else {
                    return Ok(PointerOutcome::Missed);
                };
                let slot = self.registry.create(
                    self.config.current_shape,
                    coord.x,
                    coord.y,
                    self.config.current_size,
                )?;
                Ok(PointerOutcome::Created(slot))
            }
            (PointerButton::Middle, _) if pan_modifier => Ok(PointerOutcome::Camera),
            (PointerButton::Middle, mode) => {
                let coord = match mode {
                    ViewMode::TwoDimensional => Some(self.grid_from_pointer(x, y)),
                    ViewMode::ThreeDimensional => self.pick_surface_at(x, y)?.map(|pick| pick.grid),
                };
                let Some(coord) = coord else {
                    return Ok(PointerOutcome::Missed);
                };
                match self
                    .registry
                    .find_containing(coord.x, coord.y, self.config.remove_tolerance)
                {
                    Some(slot) => {
                        self.registry.remove(Some(slot))?;
                        Ok(PointerOutcome::Removed(slot))
                    }
                    None => Ok(PointerOutcome::Idle),
                }
            }
        }
    }

    fn drag_obstruction(
        &mut self,
        slot: usize,
        session: &DragSession,
        x: f32,
        y: f32,
    ) -> Result<PointerOutcome, InteractionError> {
        let previous = self.grid_for_drag(session.last_x, session.last_y);
        let current = self.grid_for_drag(x, y);
        let (Some(previous), Some(current)) = (previous, current) else {
            return Ok(PointerOutcome::Dragging(slot));
        };
        let Some(obstruction) = self.registry.get(slot).copied() else {
            return Err(InteractionError::InvalidSlot(slot));
        };

        let dx = current.x - previous.x;
        let dy = current.y - previous.y;
        let steps = self.config.timesteps_per_frame.max(1.0);
        self.registry.move_to(
            slot,
            obstruction.x + dx,
            obstruction.y + dy,
            dx / steps,
            dy / steps,
        )?;
        Ok(PointerOutcome::Moved(slot))
    }

    fn camera_gesture(&mut self, session: &DragSession, x: f32, y: f32) {
        let dx = pixel_to_normalized(x, self.window_width as f32)
            - pixel_to_normalized(session.last_x, self.window_width as f32);
        let dy = pixel_to_normalized(y, self.window_height as f32)
            - pixel_to_normalized(session.last_y, self.window_height as f32);
        if session.pan {
            self.view.pan(dx * self.config.pan_sensitivity, dy * self.config.pan_sensitivity);
        } else {
            self.view.rotate(
                -dy * self.config.rotate_sensitivity,
                dx * self.config.rotate_sensitivity,
            );
        }
    }

    /// Drag positions: direct mapping in 2D, the remembered-depth plane in 3D.
    fn grid_for_drag(&self, x: f32, y: f32) -> Option<GridCoord> {
        match self.view.mode {
            ViewMode::TwoDimensional => Some(self.grid_from_pointer(x, y)),
            ViewMode::ThreeDimensional => self.grid_on_plane(x, y, self.current_z),
        }
    }

    fn grid_from_pointer(&self, x: f32, y: f32) -> GridCoord {
        let nx = pixel_to_normalized(x, self.window_width as f32);
        let ny = pixel_to_normalized(y, self.window_height as f32);
        normalized_to_grid(nx, ny, &self.panel, &self.extents)
    }

    fn grid_on_plane(&self, x: f32, y: f32, plane_z: f32) -> Option<GridCoord> {
        let ray = mouse_ray(x, y, &self.camera_matrices());
        if ray.is_degenerate() {
            return None;
        }
        let (_, point) = intersect_plane(&ray, plane_z)?;
        Some(ndc_to_grid(point.x, point.y, &self.extents))
    }

    /// On a hit, remembers the hit depth for later plane intersections.
    fn pick_surface_at(&mut self, x: f32, y: f32) -> Result<Option<SurfacePick>, InteractionError> {
        let ray = mouse_ray(x, y, &self.camera_matrices());
        log::debug!("Mouse ray origin {:?} direction {:?}", ray.origin, ray.direction);
        let pick = pick_surface(&ray, &mut self.surface, self.intersector.as_ref(), &self.extents)?;
        if let Some(pick) = pick {
            self.current_z = pick.depth;
        }
        Ok(pick)
    }

    fn flip_y(&self, y: f32) -> f32 {
        self.window_height as f32 - y
    }
}
