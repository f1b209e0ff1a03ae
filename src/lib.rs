//! # physarum
//!
//! A Physarum-style stigmergy simulation: a large population of point agents
//! moves over a toroidal plane, deposits a pheromone trail into a grid, and
//! steers toward the trail it senses. Diffusion and decay of the field close
//! the feedback loop, and self-reinforcing networks of paths emerge.
//!
//! ## Quick Start
//!
//! ```
//! use physarum::prelude::*;
//!
//! let config = SimConfig::new()
//!     .with_grid(GridSize::new(128, 128))
//!     .with_agent_count(1024)
//!     .with_species(2);
//!
//! let mut sim = Simulation::new(config).unwrap().with_params(
//!     SimParams::default()
//!         .with_multi_species(true)
//!         .with_coupling(Coupling::Rival),
//! );
//!
//! for _ in 0..20 {
//!     sim.tick();
//! }
//! let trail: &[f32] = sim.front(0);
//! assert_eq!(trail.len(), 128 * 128);
//! ```
//!
//! ## Pipeline
//!
//! Every tick runs two data-parallel stages and a publish step:
//!
//! - **Agent Update Stage**: each agent samples the field at three sensors
//!   (left, centre, right), turns toward the strongest, steps forward with
//!   toroidal wrap, and deposits one unit into its new cell.
//! - **Field Update Stage**: each cell blends toward its 3×3 neighbourhood
//!   mean by `diffusionWeight`, then decays by `decayWeight`.
//! - **Publish**: the back buffer becomes the front buffer read by the next
//!   tick and by the display.
//!
//! The same pipeline runs on the CPU ([`Simulation`], rayon) and on the GPU
//! ([`gpu::GpuSimulation`], wgpu compute). [`engine::Engine`] hides the
//! difference from hosts.
//!
//! ## Species
//!
//! Up to two species can be allocated. With `multiSpecies` on, each species
//! also senses the other's field, combined through a [`Coupling`] policy.

pub mod agent;
pub mod app;
pub mod config;
pub mod cpu;
pub mod engine;
pub mod error;
pub mod export;
pub mod field;
pub mod gpu;
pub mod grid;
pub mod params;
pub mod policy;
pub mod render;
pub mod simulation;
pub mod spawn;
pub mod time;

pub use glam::Vec2;

pub use agent::{Agent, AgentStore};
pub use config::{SimConfig, AGENT_WORKGROUP_SIZE, MAX_SPECIES};
pub use error::{ConfigError, ExportError, GpuError, ParamError, SimulationError};
pub use field::{FieldBuffers, FieldStore, DEPOSIT_AMOUNT};
pub use grid::GridSize;
pub use params::{ParamBound, SimParams, PARAM_BOUNDS};
pub use policy::Coupling;
pub use simulation::{Phase, Simulation};
pub use spawn::{Placement, Spawner};

/// Common imports.
pub mod prelude {
    pub use crate::config::SimConfig;
    pub use crate::grid::GridSize;
    pub use crate::params::SimParams;
    pub use crate::policy::Coupling;
    pub use crate::simulation::Simulation;
    pub use crate::spawn::Placement;
    pub use crate::Vec2;
}
