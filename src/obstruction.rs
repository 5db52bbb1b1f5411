//! Fixed-capacity obstruction registry.
//!
//! The registry is the single host owner of obstruction state. Every mutation
//! is pushed straight through an [`ObstructionMirror`] so the device array the
//! solver reads is never behind the host copy. The mirror is write-only from
//! here; nothing in this crate reads it back.

use crate::error::InteractionError;
use bytemuck::{Pod, Zeroable};

pub const MAX_OBSTRUCTIONS: usize = 100;

/// Obstruction record with GPU-aligned memory layout (32 bytes).
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Obstruction {
    pub shape: u32,
    pub x: f32,
    pub y: f32,
    pub r1: f32, // characteristic size
    pub r2: f32, // secondary size, used by line shapes
    pub u: f32,
    pub v: f32,
    pub state: u32,
}

const _: () = assert!(std::mem::size_of::<Obstruction>() == 32);

#[repr(u32)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Shape {
    Square = 0,
    Circle = 1,
    HorizontalLine = 2,
    VerticalLine = 3,
}

impl Shape {
    pub const ALL: [Shape; 4] = [
        Shape::Square,
        Shape::Circle,
        Shape::HorizontalLine,
        Shape::VerticalLine,
    ];

    pub fn from_u32(value: u32) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }
}

/// Zeroed device memory reads as `Inactive`, so a fresh mirror is all free slots.
#[repr(u32)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ObstructionState {
    Inactive = 0,
    New = 1,
    Active = 2,
    Removed = 3,
}

impl ObstructionState {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Inactive),
            1 => Some(Self::New),
            2 => Some(Self::Active),
            3 => Some(Self::Removed),
            _ => None,
        }
    }

    pub fn is_free(self) -> bool {
        matches!(self, Self::Inactive | Self::Removed)
    }
}

impl Obstruction {
    pub fn new(shape: Shape, x: f32, y: f32, size: f32) -> Self {
        Self {
            shape: shape as u32,
            x,
            y,
            r1: size,
            r2: 0.0,
            u: 0.0,
            v: 0.0,
            state: ObstructionState::New as u32,
        }
    }

    pub fn vacant() -> Self {
        Self::zeroed()
    }

    pub fn shape(&self) -> Shape {
        Shape::from_u32(self.shape).unwrap_or(Shape::Square)
    }

    pub fn state(&self) -> ObstructionState {
        ObstructionState::from_u32(self.state).unwrap_or(ObstructionState::Inactive)
    }

    pub fn is_occupied(&self) -> bool {
        !self.state().is_free()
    }

    pub fn distance_to(&self, x: f32, y: f32) -> f32 {
        let dx = self.x - x;
        let dy = self.y - y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Write target for registry pushes, normally the solver's device array.
pub trait ObstructionMirror {
    fn push(&mut self, slot: usize, obstruction: &Obstruction);
}

/// In-memory mirror that keeps the last pushed record per slot.
#[derive(Debug, Clone)]
pub struct HostMirror {
    pub slots: Vec<Obstruction>,
    pub push_count: usize,
}

impl HostMirror {
    pub fn new() -> Self {
        Self {
            slots: vec![Obstruction::vacant(); MAX_OBSTRUCTIONS],
            push_count: 0,
        }
    }
}

impl Default for HostMirror {
    fn default() -> Self {
        Self::new()
    }
}

impl ObstructionMirror for HostMirror {
    fn push(&mut self, slot: usize, obstruction: &Obstruction) {
        if let Some(entry) = self.slots.get_mut(slot) {
            *entry = *obstruction;
        }
        self.push_count += 1;
    }
}

pub struct ObstructionRegistry<M: ObstructionMirror> {
    slots: Vec<Obstruction>,
    mirror: M,
    max_velocity: f32,
}

impl<M: ObstructionMirror> ObstructionRegistry<M> {
    /// Creates an empty registry and pushes every vacant slot so the mirror
    /// starts from a known state.
    pub fn new(mirror: M, max_velocity: f32) -> Self {
        let mut registry = Self {
            slots: vec![Obstruction::vacant(); MAX_OBSTRUCTIONS],
            mirror,
            max_velocity: max_velocity.abs(),
        };
        for slot in 0..MAX_OBSTRUCTIONS {
            registry.push(slot);
        }
        registry
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn occupied_count(&self) -> usize {
        self.slots.iter().filter(|o| o.is_occupied()).count()
    }

    pub fn get(&self, slot: usize) -> Option<&Obstruction> {
        self.slots.get(slot)
    }

    pub fn mirror(&self) -> &M {
        &self.mirror
    }

    pub fn max_velocity(&self) -> f32 {
        self.max_velocity
    }

    pub fn find_unused_slot(&self) -> Result<usize, InteractionError> {
        self.slots
            .iter()
            .position(|o| o.state().is_free())
            .ok_or(InteractionError::CapacityExceeded {
                capacity: self.capacity(),
            })
    }

    /// Closest occupied obstruction; ties go to the lowest slot.
    pub fn find_nearest(&self, x: f32, y: f32) -> Option<usize> {
        self.closest_where(x, y, |_, _| true)
    }

    /// Closest occupied obstruction whose radius (plus `tolerance`) covers the point.
    pub fn find_containing(&self, x: f32, y: f32, tolerance: f32) -> Option<usize> {
        self.closest_where(x, y, |obstruction, distance| {
            distance < obstruction.r1 + tolerance
        })
    }

    pub fn create(
        &mut self,
        shape: Shape,
        x: f32,
        y: f32,
        size: f32,
    ) -> Result<usize, InteractionError> {
        let slot = self.find_unused_slot()?;
        self.slots[slot] = Obstruction::new(shape, x, y, size);
        self.push(slot);
        log::debug!("Created {:?} obstruction in slot {} at ({:.1}, {:.1})", shape, slot, x, y);
        Ok(slot)
    }

    /// Moves an occupied obstruction. Velocity components are clamped to
    /// `[-max_velocity, max_velocity]`; non-finite input becomes zero.
    pub fn move_to(
        &mut self,
        slot: usize,
        x: f32,
        y: f32,
        u: f32,
        v: f32,
    ) -> Result<(), InteractionError> {
        let limit = self.max_velocity;
        let obstruction = self.occupied_mut(slot)?;
        obstruction.x = x;
        obstruction.y = y;
        obstruction.u = clamp_velocity(u, limit);
        obstruction.v = clamp_velocity(v, limit);
        obstruction.state = ObstructionState::Active as u32;
        self.push(slot);
        Ok(())
    }

    /// Marks the slot removed so the solver clears its footprint. `None` is a no-op.
    pub fn remove(&mut self, slot: Option<usize>) -> Result<(), InteractionError> {
        let Some(slot) = slot else {
            return Ok(());
        };
        let obstruction = self.occupied_mut(slot)?;
        obstruction.u = 0.0;
        obstruction.v = 0.0;
        obstruction.state = ObstructionState::Removed as u32;
        self.push(slot);
        log::debug!("Removed obstruction in slot {}", slot);
        Ok(())
    }

    /// Occupied slots in slot order.
    pub fn snapshot(&self) -> Vec<(usize, Obstruction)> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, o)| o.is_occupied())
            .map(|(slot, o)| (slot, *o))
            .collect()
    }

    fn closest_where<F>(&self, x: f32, y: f32, accept: F) -> Option<usize>
    where
        F: Fn(&Obstruction, f32) -> bool,
    {
        let mut best: Option<(usize, f32)> = None;
        for (slot, obstruction) in self.slots.iter().enumerate() {
            if !obstruction.is_occupied() {
                continue;
            }
            let distance = obstruction.distance_to(x, y);
            if !accept(obstruction, distance) {
                continue;
            }
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((slot, distance));
            }
        }
        best.map(|(slot, _)| slot)
    }

    fn occupied_mut(&mut self, slot: usize) -> Result<&mut Obstruction, InteractionError> {
        match self.slots.get_mut(slot) {
            Some(obstruction) if obstruction.is_occupied() => Ok(obstruction),
            _ => Err(InteractionError::InvalidSlot(slot)),
        }
    }

    fn push(&mut self, slot: usize) {
        let record = self.slots[slot];
        self.mirror.push(slot, &record);
    }
}

fn clamp_velocity(value: f32, limit: f32) -> f32 {
    if value.is_finite() {
        value.clamp(-limit, limit)
    } else {
        0.0
    }
}
