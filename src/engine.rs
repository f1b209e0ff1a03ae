//! One interface over both substrates for the host.

use std::sync::Arc;

use image::RgbaImage;
use log::info;

use crate::agent::AgentStore;
use crate::config::SimConfig;
use crate::error::{GpuError, SimulationError};
use crate::gpu::{GpuDevice, GpuSimulation};
use crate::grid::GridSize;
use crate::params::SimParams;
use crate::render::{render_frame, ColourMap};
use crate::simulation::{active_species, Simulation};

/// The simulation on the CPU or on a GPU device.
pub enum Engine {
    Cpu(Simulation),
    Gpu {
        sim: GpuSimulation,
        gpu: Arc<GpuDevice>,
        params: SimParams,
    },
}

impl Engine {
    pub fn cpu(config: SimConfig) -> Result<Self, SimulationError> {
        Ok(Engine::Cpu(Simulation::new(config)?))
    }

    /// Spawn the initial populations on the host and upload them to `gpu`.
    pub fn gpu(config: SimConfig, gpu: Arc<GpuDevice>) -> Result<Self, SimulationError> {
        config.validate()?;
        let agents = AgentStore::new(&config)?;
        let sim = GpuSimulation::new(&gpu.device, &config, &agents);
        Ok(Engine::Gpu {
            sim,
            gpu,
            params: SimParams::default(),
        })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Engine::Cpu(_) => "cpu",
            Engine::Gpu { .. } => "gpu",
        }
    }

    pub fn params(&self) -> &SimParams {
        match self {
            Engine::Cpu(sim) => sim.params(),
            Engine::Gpu { params, .. } => params,
        }
    }

    pub fn set_params(&mut self, new: SimParams) {
        match self {
            Engine::Cpu(sim) => sim.set_params(new),
            Engine::Gpu { params, .. } => *params = new.sanitized(),
        }
    }

    pub fn grid(&self) -> GridSize {
        match self {
            Engine::Cpu(sim) => sim.grid(),
            Engine::Gpu { sim, .. } => sim.grid(),
        }
    }

    /// Allocated species.
    pub fn species_count(&self) -> usize {
        match self {
            Engine::Cpu(sim) => sim.config().species,
            Engine::Gpu { sim, .. } => sim.species_count(),
        }
    }

    /// Species shown and ticked under the current parameters.
    pub fn active_species(&self) -> usize {
        active_species(self.params(), self.species_count())
    }

    pub fn tick_count(&self) -> u64 {
        match self {
            Engine::Cpu(sim) => sim.tick_count(),
            Engine::Gpu { sim, .. } => sim.tick_count(),
        }
    }

    pub fn tick(&mut self) {
        match self {
            Engine::Cpu(sim) => sim.tick(),
            Engine::Gpu { sim, gpu, params } => sim.tick(&gpu.queue, &gpu.device, params),
        }
    }

    pub fn reset(&mut self) {
        info!("Reset");
        match self {
            Engine::Cpu(sim) => sim.reset(),
            Engine::Gpu { sim, gpu, .. } => sim.reset(&gpu.queue, &gpu.device),
        }
    }

    /// Published fields of the active species, copied to the host.
    pub fn read_fields(&self) -> Result<Vec<Vec<f32>>, GpuError> {
        let active = self.active_species();
        match self {
            Engine::Cpu(sim) => Ok((0..active).map(|s| sim.front(s).to_vec()).collect()),
            Engine::Gpu { sim, gpu, .. } => (0..active)
                .map(|s| sim.read_front(&gpu.device, &gpu.queue, s))
                .collect(),
        }
    }

    /// Total published intensity per active species.
    pub fn total_intensity(&self) -> Result<Vec<f64>, GpuError> {
        match self {
            Engine::Cpu(sim) => Ok((0..self.active_species()).map(|s| sim.total_intensity(s)).collect()),
            Engine::Gpu { .. } => Ok(self
                .read_fields()?
                .iter()
                .map(|f| f.iter().map(|&v| v as f64).sum())
                .collect()),
        }
    }

    /// Colour-map the published fields into an image.
    pub fn render(&self, map: &ColourMap) -> Result<RgbaImage, GpuError> {
        let grid = self.grid();
        match self {
            Engine::Cpu(sim) => {
                let fields: Vec<&[f32]> = (0..self.active_species()).map(|s| sim.front(s)).collect();
                Ok(render_frame(grid, &fields, map))
            }
            Engine::Gpu { .. } => {
                let owned = self.read_fields()?;
                let fields: Vec<&[f32]> = owned.iter().map(Vec::as_slice).collect();
                Ok(render_frame(grid, &fields, map))
            }
        }
    }
}
