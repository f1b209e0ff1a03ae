//! The simulation context: Frame Sequencer and Reset Controller on the CPU.
//!
//! [`Simulation`] owns the Agent Store, the Field Store and the Parameter
//! Set. Each call to [`Simulation::tick`] runs one full frame:
//!
//! 1. **Agent phase**: every active species senses the published fields,
//!    turns, steps and deposits into its accumulator.
//! 2. **Field phase**: every active species diffuses and decays
//!    `front + deposits` into `back`.
//! 3. **Publish**: `back` is copied over `front` and the accumulators are
//!    cleared.
//!
//! Rayon joins all workers before a stage returns, which is the barrier
//! between phases. No partial-tick state is observable from outside.
//!
//! # Example
//!
//! ```
//! use physarum::{GridSize, SimConfig, SimParams, Simulation};
//!
//! let config = SimConfig::new()
//!     .with_grid(GridSize::new(64, 64))
//!     .with_agent_count(512)
//!     .with_species(1);
//! let mut sim = Simulation::new(config).unwrap();
//! sim.set_params(SimParams::default().with_decay_weight(0.1));
//!
//! for _ in 0..10 {
//!     sim.tick();
//! }
//! assert!(sim.total_intensity(0) > 0.0);
//!
//! sim.reset();
//! assert_eq!(sim.total_intensity(0), 0.0);
//! ```

use log::{debug, info, trace};

use crate::agent::{Agent, AgentStore};
use crate::config::SimConfig;
use crate::cpu;
use crate::error::SimulationError;
use crate::field::FieldStore;
use crate::grid::GridSize;
use crate::params::SimParams;

/// Phase of the frame sequencer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Agent,
    Field,
}

impl Phase {
    pub fn next(self) -> Phase {
        match self {
            Phase::Agent => Phase::Field,
            Phase::Field => Phase::Agent,
        }
    }
}

/// Number of species that tick under `params` when `allocated` are present.
#[inline]
pub fn active_species(params: &SimParams, allocated: usize) -> usize {
    if params.multi_species && allocated > 1 {
        2
    } else {
        1
    }
}

/// A running CPU simulation.
pub struct Simulation {
    config: SimConfig,
    agents: AgentStore,
    fields: FieldStore,
    params: SimParams,
    phase: Phase,
    tick: u64,
}

impl Simulation {
    /// Validate `config`, allocate the stores and place the agents.
    pub fn new(config: SimConfig) -> Result<Self, SimulationError> {
        config.validate()?;
        info!(
            "Allocating {}x{} grid, {} agents x {} species (~{} MiB)",
            config.grid.width,
            config.grid.height,
            config.agent_count,
            config.species,
            config.memory_estimate() / (1024 * 1024)
        );
        let agents = AgentStore::new(&config)?;
        let fields = FieldStore::new(config.grid, config.species)?;
        Ok(Self {
            config,
            agents,
            fields,
            params: SimParams::default(),
            phase: Phase::Agent,
            tick: 0,
        })
    }

    pub fn with_params(mut self, params: SimParams) -> Self {
        self.set_params(params);
        self
    }

    /// Replace the Parameter Set. Takes effect on the next tick.
    ///
    /// Out-of-bounds values are clamped (with a warning) so the kernels
    /// only ever see valid coefficients.
    pub fn set_params(&mut self, params: SimParams) {
        self.params = params.sanitized();
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn grid(&self) -> GridSize {
        self.config.grid
    }

    /// Ticks completed since construction or the last reset.
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Phase the next tick starts in. Always [`Phase::Agent`] between ticks.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Species updated by the next tick.
    pub fn active_species(&self) -> usize {
        active_species(&self.params, self.config.species)
    }

    /// Run one full frame: agent phase, field phase, publish.
    pub fn tick(&mut self) {
        let params = self.params;
        let grid = self.config.grid;
        let active = self.active_species();

        debug_assert_eq!(self.phase, Phase::Agent);
        trace!("tick {}: agent phase ({} species)", self.tick, active);
        for s in 0..active {
            let other = (active > 1).then_some(1 - s);
            cpu::update_agents(
                grid,
                self.agents.species_mut(s).live_mut(),
                self.fields.all(),
                s,
                other,
                &params,
                self.tick,
            );
        }

        self.phase = self.phase.next();
        trace!("tick {}: field phase", self.tick);
        for s in 0..active {
            cpu::update_field(
                grid,
                self.fields.species_mut(s),
                params.diffusion_weight,
                params.decay_weight,
            );
        }

        for s in 0..active {
            self.fields.species_mut(s).publish();
        }
        self.phase = self.phase.next();
        self.tick += 1;
    }

    /// Restore agents and fields to their clear snapshots.
    pub fn reset(&mut self) {
        self.agents.restore();
        self.fields.restore();
        self.phase = Phase::Agent;
        self.tick = 0;
        debug!("Simulation reset");
    }

    /// Published field of a species.
    pub fn front(&self, species: usize) -> &[f32] {
        self.fields.species(species).front()
    }

    /// Live agents of a species.
    pub fn agents(&self, species: usize) -> &[Agent] {
        self.agents.species(species).live()
    }

    pub fn agent_store(&self) -> &AgentStore {
        &self.agents
    }

    pub fn field_store(&self) -> &FieldStore {
        &self.fields
    }

    /// Sum of a species' published field.
    pub fn total_intensity(&self, species: usize) -> f64 {
        self.fields.species(species).total_intensity()
    }

    /// Overwrite a species' published field, e.g. to seed a scenario.
    ///
    /// # Panics
    ///
    /// Panics if `values` does not have one entry per cell.
    pub fn load_field(&mut self, species: usize, values: &[f32]) {
        self.fields.species_mut(species).load(values);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use crate::spawn::Placement;

    fn small(species: usize) -> SimConfig {
        SimConfig::new()
            .with_grid(GridSize::new(48, 32))
            .with_agent_count(256)
            .with_species(species)
            .with_seed(11)
    }

    // ========== Construction Tests ==========

    #[test]
    fn test_new_rejects_bad_config() {
        let err = Simulation::new(small(1).with_agent_count(100)).err();
        assert!(matches!(
            err,
            Some(SimulationError::Config(ConfigError::AgentCountNotAligned { .. }))
        ));
    }

    #[test]
    fn test_new_starts_clear() {
        let sim = Simulation::new(small(2)).unwrap();
        assert_eq!(sim.tick_count(), 0);
        assert_eq!(sim.phase(), Phase::Agent);
        assert_eq!(sim.total_intensity(0), 0.0);
        assert_eq!(sim.agents(1).len(), 256);
    }

    #[test]
    fn test_set_params_clamps() {
        let mut sim = Simulation::new(small(1)).unwrap();
        sim.set_params(SimParams { decay_weight: 3.0, ..SimParams::default() });
        assert_eq!(sim.params().decay_weight, 1.0);
    }

    // ========== Sequencer Tests ==========

    #[test]
    fn test_tick_publishes_back_into_front() {
        let mut sim = Simulation::new(small(1)).unwrap();
        sim.tick();
        let field = sim.field_store().species(0);
        assert_eq!(field.front(), field.back());
        assert_eq!(sim.phase(), Phase::Agent);
        assert_eq!(sim.tick_count(), 1);
        assert!(sim.total_intensity(0) > 0.0);
    }

    #[test]
    fn test_single_species_freezes_second() {
        let mut sim = Simulation::new(small(2)).unwrap();
        let before = sim.agents(1).to_vec();
        sim.tick();
        assert_eq!(sim.active_species(), 1);
        assert_eq!(sim.agents(1), &before[..]);
        assert_eq!(sim.total_intensity(1), 0.0);
    }

    #[test]
    fn test_multi_species_ticks_both() {
        let mut sim = Simulation::new(small(2))
            .unwrap()
            .with_params(SimParams::default().with_multi_species(true));
        assert_eq!(sim.active_species(), 2);
        sim.tick();
        assert!(sim.total_intensity(0) > 0.0);
        assert!(sim.total_intensity(1) > 0.0);
    }

    #[test]
    fn test_multi_species_flag_needs_second_store() {
        let sim = Simulation::new(small(1))
            .unwrap()
            .with_params(SimParams::default().with_multi_species(true));
        assert_eq!(sim.active_species(), 1);
    }

    #[test]
    fn test_ticks_are_deterministic() {
        let params = SimParams::default().with_multi_species(true);
        let mut a = Simulation::new(small(2)).unwrap().with_params(params);
        let mut b = Simulation::new(small(2)).unwrap().with_params(params);
        for _ in 0..5 {
            a.tick();
            b.tick();
        }
        assert_eq!(a.front(0), b.front(0));
        assert_eq!(a.agents(1), b.agents(1));
    }

    // ========== Reset Tests ==========

    #[test]
    fn test_reset_restores_snapshots() {
        let mut sim = Simulation::new(small(1).with_placement(Placement::Center)).unwrap();
        for _ in 0..3 {
            sim.tick();
        }
        sim.reset();
        let agents = sim.agent_store().species(0);
        assert_eq!(agents.live(), agents.clear_snapshot());
        let field = sim.field_store().species(0);
        assert_eq!(field.front(), field.clear_snapshot());
        assert_eq!(sim.tick_count(), 0);
    }
}
