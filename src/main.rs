//! Interactive viewer for a lattice CFD solution field.
//!
//! Event handling:
//! - Left drag: move the obstruction under the pointer
//! - Right click: place an obstruction of the current shape
//! - Middle click: remove an obstruction; middle drag rotates, shift + middle drag pans
//! - Mouse wheel: zoom
//! - V: toggle 2D/3D view, 1-4: select shape
//! - Q/Escape: exit

use cfd_interaction::{
    config::InteractionConfig,
    coords::GridExtents,
    gpu::{create_shared_surface, DeviceObstructions, GpuContext, SurfaceBuffers, WgpuBackend},
    heightfield::{write_rest_surface, HeightFieldMarcher, REST_FLOOR_Z, REST_SURFACE_Z},
    ray::Viewport,
    GraphicsManager, PointerButton, Renderer, Shape, ViewMode, WheelDirection,
};
use clap::{Parser, ValueEnum};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, Event, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowBuilder},
};

const TARGET_FRAME_TIME: Duration = Duration::from_millis(16);

type Manager = GraphicsManager<WgpuBackend, DeviceObstructions>;

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ShapeArg {
    Square,
    Circle,
    Horizontal,
    Vertical,
}

impl From<ShapeArg> for Shape {
    fn from(arg: ShapeArg) -> Self {
        match arg {
            ShapeArg::Square => Shape::Square,
            ShapeArg::Circle => Shape::Circle,
            ShapeArg::Horizontal => Shape::HorizontalLine,
            ShapeArg::Vertical => Shape::VerticalLine,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "cfd-viewer")]
#[command(about = "Interactive obstruction editing over a lattice CFD field")]
struct Args {
    /// Visible grid width in cells
    #[arg(long, default_value = "256")]
    grid_x: u32,

    /// Visible grid height in cells
    #[arg(long, default_value = "128")]
    grid_y: u32,

    /// Grid width the shared buffer is sized for
    #[arg(long, default_value = "1024")]
    max_grid_x: u32,

    /// Grid height the shared buffer is sized for
    #[arg(long, default_value = "512")]
    max_grid_y: u32,

    /// Pixels per grid cell at full size
    #[arg(long, default_value = "1.0")]
    scale: f32,

    /// Shape placed by right click
    #[arg(long, value_enum, default_value = "square")]
    shape: ShapeArg,

    /// Obstruction size in grid cells
    #[arg(long, default_value = "5.0")]
    size: f32,

    /// Bound on each obstruction velocity component
    #[arg(long, default_value = "0.1")]
    velocity_limit: f32,

    /// Solver steps per frame, used to turn drag deltas into velocities
    #[arg(long, default_value = "100")]
    timesteps_per_frame: f32,

    /// Start in the 3D view
    #[arg(long)]
    three_d: bool,

    #[arg(long, default_value = "1200")]
    width: u32,

    #[arg(long, default_value = "600")]
    height: u32,
}

impl Args {
    fn interaction_config(&self) -> InteractionConfig {
        InteractionConfig {
            max_velocity: self.velocity_limit,
            timesteps_per_frame: self.timesteps_per_frame,
            current_shape: self.shape.into(),
            current_size: self.size,
            ..InteractionConfig::default()
        }
    }
}

struct ApplicationState {
    manager: Option<Manager>,
    surface_buffers: Option<SurfaceBuffers>,
    cursor: PhysicalPosition<f64>,
    pan_modifier: bool,
    last_update: Instant,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let event_loop = EventLoop::new()?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("CFD Viewer")
            .with_inner_size(winit::dpi::PhysicalSize::new(args.width, args.height))
            .build(&event_loop)?,
    );

    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
    let surface = instance.create_surface(window.clone())?;
    let gpu_context = pollster::block_on(GpuContext::with_instance(instance, Some(&surface)))?;
    let mut renderer = Renderer::new(window.clone(), &gpu_context, surface)?;

    let (manager, surface_buffers) = create_manager(&args, &gpu_context, &window)?;
    let mut app_state = ApplicationState {
        manager: Some(manager),
        surface_buffers: Some(surface_buffers),
        cursor: PhysicalPosition::new(0.0, 0.0),
        pan_modifier: false,
        last_update: Instant::now(),
    };

    event_loop.run(move |event, elwt| {
        elwt.set_control_flow(ControlFlow::Poll);

        match event {
            Event::AboutToWait => {
                if app_state.last_update.elapsed() >= TARGET_FRAME_TIME {
                    app_state.last_update = Instant::now();
                    window.request_redraw();
                }
            }
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => elwt.exit(),
                WindowEvent::Resized(physical_size) => {
                    renderer.resize(&gpu_context, physical_size);
                    if let Some(manager) = app_state.manager.as_mut() {
                        manager.resize(physical_size.width, physical_size.height);
                    }
                }
                WindowEvent::ModifiersChanged(modifiers) => {
                    app_state.pan_modifier = modifiers.state().shift_key();
                }
                WindowEvent::MouseInput { state, button, .. } => {
                    handle_mouse_input(&mut app_state, state, button);
                }
                WindowEvent::CursorMoved { position, .. } => {
                    handle_cursor_moved(&mut app_state, position);
                }
                WindowEvent::MouseWheel { delta, .. } => {
                    handle_mouse_wheel(&mut app_state, delta);
                }
                WindowEvent::KeyboardInput {
                    event:
                        KeyEvent {
                            physical_key: PhysicalKey::Code(key),
                            state: ElementState::Pressed,
                            ..
                        },
                    ..
                } => handle_key(&mut app_state, key, elwt),
                WindowEvent::RedrawRequested => {
                    handle_redraw(&app_state, &mut renderer, &gpu_context, &window, elwt);
                }
                _ => {}
            },
            Event::LoopExiting => {
                if let Some(surface_buffers) = app_state.surface_buffers.take() {
                    surface_buffers.destroy();
                }
                if let Some(manager) = app_state.manager.take() {
                    manager.shutdown();
                }
                log::info!("Shared buffers released");
            }
            _ => {}
        }
    })?;

    Ok(())
}

fn create_manager(
    args: &Args,
    gpu_context: &GpuContext,
    window: &Window,
) -> anyhow::Result<(Manager, SurfaceBuffers)> {
    let extents = GridExtents::new(args.grid_x, args.grid_y, args.max_grid_x, args.max_grid_y, args.scale);
    if args.grid_x > args.max_grid_x || args.grid_y > args.max_grid_y {
        log::warn!(
            "Visible grid {}x{} clamped to {}x{}",
            args.grid_x,
            args.grid_y,
            extents.visible_x,
            extents.visible_y
        );
    }

    let (mut solution, surface_buffers) = create_shared_surface(gpu_context, &extents)?;
    let mut field = solution.map_for_compute()?;
    write_rest_surface(&mut field, &extents, REST_SURFACE_Z, REST_FLOOR_Z)?;
    field.unmap()?;

    let obstructions = DeviceObstructions::new(gpu_context)?;
    let size = window.inner_size();
    let mut manager = GraphicsManager::new(
        obstructions,
        solution,
        Box::new(HeightFieldMarcher::default()),
        extents,
        size.width,
        size.height,
        args.interaction_config(),
    );
    if args.three_d {
        manager.set_view_mode(ViewMode::ThreeDimensional);
    }
    Ok((manager, surface_buffers))
}

fn handle_mouse_input(state: &mut ApplicationState, element_state: ElementState, button: MouseButton) {
    let Some(button) = pointer_button(button) else {
        return;
    };
    let Some(manager) = state.manager.as_mut() else {
        return;
    };
    let (x, y) = (state.cursor.x as f32, state.cursor.y as f32);

    match element_state {
        ElementState::Pressed => match manager.on_pointer_down(x, y, button, state.pan_modifier) {
            Ok(outcome) => log::debug!("{:?} press at ({}, {}): {:?}", button, x, y, outcome),
            Err(e) => log::warn!("Pointer press failed: {}", e),
        },
        ElementState::Released => {
            manager.on_pointer_up(x, y, button);
        }
    }
}

fn handle_cursor_moved(state: &mut ApplicationState, position: PhysicalPosition<f64>) {
    state.cursor = position;
    if let Some(manager) = state.manager.as_mut() {
        if let Err(e) = manager.on_pointer_move(position.x as f32, position.y as f32) {
            log::warn!("Pointer move failed: {}", e);
        }
    }
}

fn handle_mouse_wheel(state: &mut ApplicationState, delta: MouseScrollDelta) {
    let scroll_amount = match delta {
        MouseScrollDelta::LineDelta(_, y) => y,
        MouseScrollDelta::PixelDelta(pos) => pos.y as f32,
    };
    let direction = if scroll_amount > 0.0 {
        WheelDirection::Up
    } else if scroll_amount < 0.0 {
        WheelDirection::Down
    } else {
        return;
    };
    if let Some(manager) = state.manager.as_mut() {
        manager.on_wheel(direction);
    }
}

fn handle_key(state: &mut ApplicationState, key: KeyCode, elwt: &EventLoopWindowTarget<()>) {
    let Some(manager) = state.manager.as_mut() else {
        return;
    };
    match key {
        KeyCode::KeyQ | KeyCode::Escape => elwt.exit(),
        KeyCode::KeyV => manager.toggle_view_mode(),
        KeyCode::Digit1 => manager.set_current_shape(Shape::Square),
        KeyCode::Digit2 => manager.set_current_shape(Shape::Circle),
        KeyCode::Digit3 => manager.set_current_shape(Shape::HorizontalLine),
        KeyCode::Digit4 => manager.set_current_shape(Shape::VerticalLine),
        _ => {}
    }
}

fn handle_redraw(
    state: &ApplicationState,
    renderer: &mut Renderer,
    gpu_context: &GpuContext,
    window: &Window,
    elwt: &EventLoopWindowTarget<()>,
) {
    let (Some(manager), Some(surface_buffers)) = (state.manager.as_ref(), state.surface_buffers.as_ref()) else {
        return;
    };
    let view = manager.view_transform();
    let panel: Viewport = manager.panel().pixels.into();
    let view_projection = view.view_projection_matrix(panel, manager.extents());
    let draw_floor = view.mode == ViewMode::ThreeDimensional;

    match renderer.render(
        gpu_context,
        manager.surface().backend().buffer(),
        surface_buffers,
        manager.extents(),
        panel,
        view_projection,
        draw_floor,
    ) {
        Ok(_) => {}
        Err(wgpu::SurfaceError::Lost) => renderer.resize(gpu_context, window.inner_size()),
        Err(wgpu::SurfaceError::OutOfMemory) => elwt.exit(),
        Err(e) => log::warn!("Render error: {:?}", e),
    }
}

fn pointer_button(button: MouseButton) -> Option<PointerButton> {
    match button {
        MouseButton::Left => Some(PointerButton::Left),
        MouseButton::Right => Some(PointerButton::Right),
        MouseButton::Middle => Some(PointerButton::Middle),
        _ => None,
    }
}
