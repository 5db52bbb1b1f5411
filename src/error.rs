use thiserror::Error;

/// Recoverable failures surfaced by the interaction core.
///
/// A ray that misses the surface is not an error; it is reported as
/// [`crate::graphics_manager::PointerOutcome::Missed`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InteractionError {
    #[error("Obstruction could not be added: all {capacity} slots are in use")]
    CapacityExceeded { capacity: usize },
    #[error("Obstruction slot {0} is out of range or not occupied")]
    InvalidSlot(usize),
    #[error("Shared buffer registration failed: {0}")]
    BufferRegistration(String),
    #[error("Shared buffer readback failed: {0}")]
    BufferReadback(String),
    #[error("Solution field holds {available} floats but {needed} are required")]
    FieldTooSmall { needed: usize, available: usize },
    #[error("Grid extents {visible_x}x{visible_y} exceed the allocated {max_x}x{max_y}")]
    GridTooLarge {
        visible_x: u32,
        visible_y: u32,
        max_x: u32,
        max_y: u32,
    },
}
