pub mod camera;
pub mod config;
pub mod coords;
pub mod error;
pub mod gpu;
pub mod graphics_manager;
pub mod heightfield;
pub mod obstruction;
pub mod ray;
pub mod renderer;
pub mod shared_buffer;

pub use camera::{ViewMode, ViewTransform};
pub use config::InteractionConfig;
pub use error::InteractionError;
pub use graphics_manager::{GraphicsManager, PointerButton, PointerOutcome, WheelDirection};
pub use obstruction::{Obstruction, ObstructionRegistry, Shape};
pub use renderer::Renderer;
pub use shared_buffer::SharedBuffer;
