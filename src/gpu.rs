use crate::coords::GridExtents;
use crate::error::InteractionError;
use crate::obstruction::{Obstruction, ObstructionMirror, MAX_OBSTRUCTIONS};
use crate::shared_buffer::{build_surface_indices, solution_len, BufferBackend, SharedBuffer};
use anyhow::Result;
use std::sync::Arc;
use wgpu::{util::DeviceExt, Buffer, BufferUsages};

/// Floats per cell in the auxiliary storage (normal xyz + shading term).
const AUX_FLOATS_PER_CELL: usize = 4;

pub struct GpuContext {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,
}

impl GpuContext {
    pub async fn new(compatible_surface: Option<&wgpu::Surface<'_>>) -> Result<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
        Self::with_instance(instance, compatible_surface).await
    }

    pub async fn with_instance(
        instance: wgpu::Instance,
        compatible_surface: Option<&wgpu::Surface<'_>>,
    ) -> Result<Self> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface,
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| anyhow::anyhow!("Failed to find suitable adapter"))?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Interaction Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                },
                None,
            )
            .await?;

        log::info!("Using adapter: {}", adapter.get_info().name);

        Ok(Self {
            instance,
            adapter,
            device: Arc::new(device),
            queue: Arc::new(queue),
        })
    }

    pub fn create_buffer_init(&self, label: &str, data: &[u8], usage: BufferUsages) -> Buffer {
        self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: data,
            usage,
        })
    }

    /// Creates a buffer inside an error scope so allocation or validation
    /// failures come back as errors instead of the device's panic handler.
    fn create_checked_buffer(
        &self,
        label: &str,
        size: u64,
        usage: BufferUsages,
    ) -> Result<Buffer, InteractionError> {
        let max = self.device.limits().max_buffer_size;
        if size > max {
            return Err(InteractionError::BufferRegistration(format!(
                "'{}' needs {} bytes, device limit is {}",
                label, size, max
            )));
        }

        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage,
            mapped_at_creation: false,
        });
        let validation = pollster::block_on(self.device.pop_error_scope());
        let out_of_memory = pollster::block_on(self.device.pop_error_scope());

        match validation.or(out_of_memory) {
            Some(error) => Err(InteractionError::BufferRegistration(format!("'{}': {}", label, error))),
            None => Ok(buffer),
        }
    }
}

/// Device-resident shared buffer. Mapping copies into a MAP_READ staging
/// buffer; unmapping writes dirty contents back through the queue.
pub struct WgpuBackend {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    buffer: Buffer,
    staging_buffer: Buffer,
    len: usize,
}

impl WgpuBackend {
    pub fn new(gpu: &GpuContext, label: &str, len: usize) -> Result<Self, InteractionError> {
        let size = (len * std::mem::size_of::<f32>()) as u64;
        let buffer = gpu.create_checked_buffer(
            label,
            size,
            BufferUsages::VERTEX | BufferUsages::STORAGE | BufferUsages::COPY_SRC | BufferUsages::COPY_DST,
        )?;
        let staging_buffer = gpu.create_checked_buffer(
            &format!("{} Staging", label),
            size,
            BufferUsages::MAP_READ | BufferUsages::COPY_DST,
        )?;

        Ok(Self {
            device: gpu.device.clone(),
            queue: gpu.queue.clone(),
            buffer,
            staging_buffer,
            len,
        })
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    fn copy_to_staging_buffer(&self) {
        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Shared Buffer Copy Encoder"),
        });
        encoder.copy_buffer_to_buffer(&self.buffer, 0, &self.staging_buffer, 0, self.staging_buffer.size());
        self.queue.submit(Some(encoder.finish()));
    }

    fn read_from_staging_buffer(&self) -> Result<Vec<f32>, InteractionError> {
        let buffer_slice = self.staging_buffer.slice(..);
        let (tx, rx) = futures::channel::oneshot::channel();

        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });

        self.device.poll(wgpu::Maintain::Wait);
        pollster::block_on(rx)
            .map_err(|e| InteractionError::BufferReadback(e.to_string()))?
            .map_err(|e| InteractionError::BufferReadback(e.to_string()))?;

        let data = buffer_slice.get_mapped_range();
        let values: Vec<f32> = bytemuck::cast_slice(&data).to_vec();

        drop(data);
        self.staging_buffer.unmap();

        Ok(values)
    }
}

impl BufferBackend for WgpuBackend {
    fn len(&self) -> usize {
        self.len
    }

    fn download(&mut self) -> Result<Vec<f32>, InteractionError> {
        self.copy_to_staging_buffer();
        self.read_from_staging_buffer()
    }

    fn upload(&mut self, data: &[f32]) -> Result<(), InteractionError> {
        self.queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(data));
        Ok(())
    }

    fn release(&mut self) {
        self.buffer.destroy();
        self.staging_buffer.destroy();
    }
}

/// Fixed-topology companions of the shared solution buffer.
pub struct SurfaceBuffers {
    pub index_buffer: Buffer,
    pub index_count: u32,
    pub aux_buffer: Buffer,
}

impl SurfaceBuffers {
    pub fn destroy(self) {
        self.index_buffer.destroy();
        self.aux_buffer.destroy();
    }
}

/// Allocates the shared solution buffer and its companions for the maximum
/// grid. Failure here is fatal for the caller: nothing works without it.
pub fn create_shared_surface(
    gpu: &GpuContext,
    extents: &GridExtents,
) -> Result<(SharedBuffer<WgpuBackend>, SurfaceBuffers)> {
    let backend = WgpuBackend::new(gpu, "Solution Field", solution_len(extents))?;
    let solution = SharedBuffer::new(backend, "Solution Field");

    let indices = build_surface_indices(extents.max_x, extents.max_y);
    let index_buffer = gpu.create_buffer_init(
        "Surface Index Buffer",
        bytemuck::cast_slice(&indices),
        BufferUsages::INDEX,
    );

    let aux_size = (extents.max_cells() * AUX_FLOATS_PER_CELL * std::mem::size_of::<f32>()) as u64;
    let aux_buffer = gpu.create_checked_buffer(
        "Auxiliary Field",
        aux_size,
        BufferUsages::STORAGE | BufferUsages::COPY_DST,
    )?;

    log::info!(
        "Shared surface ready: {}x{} max grid, {} bytes, {} indices",
        extents.max_x,
        extents.max_y,
        solution.size_in_bytes(),
        indices.len()
    );

    Ok((
        solution,
        SurfaceBuffers {
            index_buffer,
            index_count: indices.len() as u32,
            aux_buffer,
        },
    ))
}

/// Device-resident obstruction array read by the solver.
pub struct DeviceObstructions {
    queue: Arc<wgpu::Queue>,
    buffer: Buffer,
}

impl DeviceObstructions {
    pub fn new(gpu: &GpuContext) -> Result<Self, InteractionError> {
        let size = (MAX_OBSTRUCTIONS * std::mem::size_of::<Obstruction>()) as u64;
        let buffer = gpu.create_checked_buffer(
            "Obstructions Buffer",
            size,
            BufferUsages::STORAGE | BufferUsages::COPY_DST,
        )?;
        Ok(Self {
            queue: gpu.queue.clone(),
            buffer,
        })
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }
}

impl ObstructionMirror for DeviceObstructions {
    fn push(&mut self, slot: usize, obstruction: &Obstruction) {
        let offset = (slot * std::mem::size_of::<Obstruction>()) as u64;
        self.queue.write_buffer(&self.buffer, offset, bytemuck::bytes_of(obstruction));
    }
}
