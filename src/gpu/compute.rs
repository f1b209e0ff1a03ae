//! Device-resident stores and the compute sequencing of one tick.
//!
//! Per species the GPU holds the live agents, an agent clear snapshot, the
//! field front/back pair and an atomic `u32` deposit accumulator. One zeroed
//! buffer serves as the field clear snapshot for every species.
//!
//! A tick is encoded as three steps in one submission:
//!
//! 1. agent pass (every active species), atomics into the accumulators,
//! 2. field pass (every active species), `front + deposits` into `back`,
//! 3. publish: copy `back` over `front`, clear the accumulators.
//!
//! wgpu orders the passes, which gives the phase barrier.

use log::{debug, info, trace};
use wgpu::util::DeviceExt;

use crate::agent::{Agent, AgentStore};
use crate::config::SimConfig;
use crate::error::GpuError;
use crate::grid::GridSize;
use crate::params::SimParams;
use crate::simulation::active_species;

use super::shaders::{
    agent_shader, diffusion_shader, SimUniforms, AGENT_WORKGROUP, FIELD_WORKGROUP, MAX_DISPATCH,
};

/// GPU buffers of one species.
pub struct SpeciesGpu {
    pub agents: wgpu::Buffer,
    pub agents_clear: wgpu::Buffer,
    pub front: wgpu::Buffer,
    pub back: wgpu::Buffer,
    pub deposits: wgpu::Buffer,
    pub uniforms: wgpu::Buffer,
}

impl SpeciesGpu {
    fn new(device: &wgpu::Device, index: usize, agents: &[Agent], field_bytes: u64) -> Self {
        let field_buffer = |name: &str| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(&format!("Species {} {}", index, name)),
                size: field_bytes,
                usage: wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::COPY_SRC
                    | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        };

        Self {
            agents: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("Species {} Agents", index)),
                contents: bytemuck::cast_slice(agents),
                usage: wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::COPY_SRC
                    | wgpu::BufferUsages::COPY_DST,
            }),
            agents_clear: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("Species {} Agents Clear", index)),
                contents: bytemuck::cast_slice(agents),
                usage: wgpu::BufferUsages::COPY_SRC,
            }),
            front: field_buffer("Field Front"),
            back: field_buffer("Field Back"),
            deposits: field_buffer("Deposits"),
            uniforms: device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(&format!("Species {} Uniforms", index)),
                size: std::mem::size_of::<SimUniforms>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }),
        }
    }
}

/// The simulation running on a wgpu device.
pub struct GpuSimulation {
    grid: GridSize,
    agent_count: u32,
    species: Vec<SpeciesGpu>,
    /// `(agent, field)` bind groups per species.
    bind_groups: Vec<(wgpu::BindGroup, wgpu::BindGroup)>,
    field_clear: wgpu::Buffer,
    field_bytes: u64,
    agent_pipeline: wgpu::ComputePipeline,
    field_pipeline: wgpu::ComputePipeline,
    tick: u64,
}

impl GpuSimulation {
    /// Upload the initial populations in `agents` and allocate zeroed fields.
    pub fn new(device: &wgpu::Device, config: &SimConfig, agents: &AgentStore) -> Self {
        let field_bytes = config.grid.cells() as u64 * 4;
        info!(
            "Uploading {} species to GPU ({} agents each, {} cells)",
            agents.species_count(),
            config.agent_count,
            config.grid.cells()
        );

        let species: Vec<SpeciesGpu> = (0..agents.species_count())
            .map(|s| SpeciesGpu::new(device, s, agents.species(s).live(), field_bytes))
            .collect();

        let field_clear = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Field Clear"),
            size: field_bytes,
            usage: wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: true,
        });
        // mapped_at_creation memory is zeroed
        field_clear.unmap();

        let (agent_pipeline, agent_layout) = create_agent_pipeline(device);
        let (field_pipeline, field_layout) = create_field_pipeline(device);

        // The other-field binding aliases the own field when no partner exists.
        let bind_groups: Vec<_> = (0..species.len())
            .map(|s| {
                let own = &species[s];
                let other = if species.len() > 1 { &species[1 - s] } else { own };
                let agent_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(&format!("Species {} Agent Bind Group", s)),
                    layout: &agent_layout,
                    entries: &[
                        wgpu::BindGroupEntry { binding: 0, resource: own.uniforms.as_entire_binding() },
                        wgpu::BindGroupEntry { binding: 1, resource: own.agents.as_entire_binding() },
                        wgpu::BindGroupEntry { binding: 2, resource: own.front.as_entire_binding() },
                        wgpu::BindGroupEntry { binding: 3, resource: other.front.as_entire_binding() },
                        wgpu::BindGroupEntry { binding: 4, resource: own.deposits.as_entire_binding() },
                    ],
                });
                let field_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(&format!("Species {} Field Bind Group", s)),
                    layout: &field_layout,
                    entries: &[
                        wgpu::BindGroupEntry { binding: 0, resource: own.uniforms.as_entire_binding() },
                        wgpu::BindGroupEntry { binding: 1, resource: own.front.as_entire_binding() },
                        wgpu::BindGroupEntry { binding: 2, resource: own.deposits.as_entire_binding() },
                        wgpu::BindGroupEntry { binding: 3, resource: own.back.as_entire_binding() },
                    ],
                });
                (agent_bg, field_bg)
            })
            .collect();

        Self {
            grid: config.grid,
            agent_count: config.agent_count,
            species,
            bind_groups,
            field_clear,
            field_bytes,
            agent_pipeline,
            field_pipeline,
            tick: 0,
        }
    }

    pub fn grid(&self) -> GridSize {
        self.grid
    }

    pub fn species_count(&self) -> usize {
        self.species.len()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Published field buffer of a species, for the display pass.
    pub fn front(&self, species: usize) -> &wgpu::Buffer {
        &self.species[species].front
    }

    /// Encode and submit one tick. `params` must already be clamped.
    pub fn tick(&mut self, queue: &wgpu::Queue, device: &wgpu::Device, params: &SimParams) {
        let active = active_species(params, self.species.len());
        for s in 0..active {
            let uniforms =
                SimUniforms::new(self.grid, self.agent_count, params, s, active > 1, self.tick);
            queue.write_buffer(&self.species[s].uniforms, 0, bytemuck::bytes_of(&uniforms));
        }

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Tick Encoder"),
        });

        {
            let (gx, gy) = agent_dispatch(self.agent_count);
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Agent Phase"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.agent_pipeline);
            for (agent_bg, _) in &self.bind_groups[..active] {
                pass.set_bind_group(0, agent_bg, &[]);
                pass.dispatch_workgroups(gx, gy, 1);
            }
        }

        {
            let gx = self.grid.width.div_ceil(FIELD_WORKGROUP);
            let gy = self.grid.height.div_ceil(FIELD_WORKGROUP);
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Field Phase"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.field_pipeline);
            for (_, field_bg) in &self.bind_groups[..active] {
                pass.set_bind_group(0, field_bg, &[]);
                pass.dispatch_workgroups(gx, gy, 1);
            }
        }

        for species in &self.species[..active] {
            encoder.copy_buffer_to_buffer(&species.back, 0, &species.front, 0, self.field_bytes);
            encoder.clear_buffer(&species.deposits, 0, None);
        }

        queue.submit(Some(encoder.finish()));
        trace!("GPU tick {} submitted ({} species)", self.tick, active);
        self.tick += 1;
    }

    /// Restore agents and fields from their clear snapshots.
    pub fn reset(&mut self, queue: &wgpu::Queue, device: &wgpu::Device) {
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Reset Encoder"),
        });
        let agent_bytes = self.agent_count as u64 * std::mem::size_of::<Agent>() as u64;
        for species in &self.species {
            encoder.copy_buffer_to_buffer(&species.agents_clear, 0, &species.agents, 0, agent_bytes);
            encoder.copy_buffer_to_buffer(&self.field_clear, 0, &species.front, 0, self.field_bytes);
            encoder.copy_buffer_to_buffer(&self.field_clear, 0, &species.back, 0, self.field_bytes);
            encoder.clear_buffer(&species.deposits, 0, None);
        }
        queue.submit(Some(encoder.finish()));
        self.tick = 0;
        debug!("GPU simulation reset");
    }

    /// Copy a species' published field back to the host. Blocks until the
    /// GPU has finished all submitted work.
    pub fn read_front(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        species: usize,
    ) -> Result<Vec<f32>, GpuError> {
        read_buffer(device, queue, &self.species[species].front, self.field_bytes)
    }
}

/// Agent-kernel dispatch size. Large populations spill into a second
/// dimension; the kernel flattens it back.
fn agent_dispatch(agent_count: u32) -> (u32, u32) {
    let groups = agent_count.div_ceil(AGENT_WORKGROUP);
    if groups <= MAX_DISPATCH {
        (groups, 1)
    } else {
        (MAX_DISPATCH, groups.div_ceil(MAX_DISPATCH))
    }
}

/// Blocking readback of the first `size` bytes of `buffer`.
fn read_buffer<T: bytemuck::Pod>(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    buffer: &wgpu::Buffer,
    size: u64,
) -> Result<Vec<T>, GpuError> {
    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Readback Staging"),
        size,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Readback Encoder"),
    });
    encoder.copy_buffer_to_buffer(buffer, 0, &staging, 0, size);
    queue.submit(Some(encoder.finish()));

    let slice = staging.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    device.poll(wgpu::Maintain::Wait);
    rx.recv()
        .map_err(|e| GpuError::BufferMapping(e.to_string()))?
        .map_err(|e| GpuError::BufferMapping(e.to_string()))?;

    let data = slice.get_mapped_range();
    let values = bytemuck::cast_slice(&data).to_vec();
    drop(data);
    staging.unmap();
    Ok(values)
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn create_compute_pipeline(
    device: &wgpu::Device,
    name: &str,
    source: String,
    entries: &[wgpu::BindGroupLayoutEntry],
) -> (wgpu::ComputePipeline, wgpu::BindGroupLayout) {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(&format!("{} Shader", name)),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });

    let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(&format!("{} Bind Group Layout", name)),
        entries,
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(&format!("{} Pipeline Layout", name)),
        bind_group_layouts: &[&bind_group_layout],
        push_constant_ranges: &[],
    });

    let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some(&format!("{} Pipeline", name)),
        layout: Some(&pipeline_layout),
        module: &shader,
        entry_point: Some("main"),
        compilation_options: Default::default(),
        cache: None,
    });

    (pipeline, bind_group_layout)
}

fn create_agent_pipeline(device: &wgpu::Device) -> (wgpu::ComputePipeline, wgpu::BindGroupLayout) {
    create_compute_pipeline(
        device,
        "Agent Update",
        agent_shader(),
        &[
            uniform_entry(0),
            storage_entry(1, false),
            storage_entry(2, true),
            storage_entry(3, true),
            storage_entry(4, false),
        ],
    )
}

fn create_field_pipeline(device: &wgpu::Device) -> (wgpu::ComputePipeline, wgpu::BindGroupLayout) {
    create_compute_pipeline(
        device,
        "Field Update",
        diffusion_shader(),
        &[
            uniform_entry(0),
            storage_entry(1, true),
            storage_entry(2, true),
            storage_entry(3, false),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_dispatch_one_dimension() {
        assert_eq!(agent_dispatch(256), (1, 1));
        assert_eq!(agent_dispatch(1024 * 1024), (4096, 1));
    }

    #[test]
    fn test_agent_dispatch_spills_into_second_dimension() {
        let count = 64 * 1024 * 1024;
        let (gx, gy) = agent_dispatch(count);
        assert_eq!(gx, MAX_DISPATCH);
        assert!(gx as u64 * gy as u64 * AGENT_WORKGROUP as u64 >= count as u64);
        assert!(gy <= MAX_DISPATCH);
    }
}
