//! Startup configuration.
//!
//! Grid dimensions, population size and species count are fixed for the
//! lifetime of a simulation; everything tunable at runtime lives in
//! [`SimParams`](crate::SimParams).

use crate::agent::Agent;
use crate::error::{ConfigError, SimulationError};
use crate::grid::GridSize;
use crate::spawn::Placement;

/// Agents per compute work group. Populations must be a multiple of it so
/// every dispatched invocation owns exactly one agent.
pub const AGENT_WORKGROUP_SIZE: u32 = 256;

/// Maximum number of species.
pub const MAX_SPECIES: usize = 2;

/// Fixed-at-startup simulation shape.
#[derive(Clone, Debug, PartialEq)]
pub struct SimConfig {
    pub grid: GridSize,
    /// Agents per species.
    pub agent_count: u32,
    /// Allocated species (1 or 2).
    pub species: usize,
    pub placement: Placement,
    /// Seed for initial placement.
    pub seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            grid: GridSize::new(1080, 1080),
            agent_count: 1024 * 1024,
            species: 2,
            placement: Placement::default(),
            seed: 0x5eed,
        }
    }
}

impl SimConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_grid(mut self, grid: GridSize) -> Self {
        self.grid = grid;
        self
    }

    pub fn with_agent_count(mut self, count: u32) -> Self {
        self.agent_count = count;
        self
    }

    pub fn with_species(mut self, species: usize) -> Self {
        self.species = species;
        self
    }

    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid.width == 0 || self.grid.height == 0 {
            return Err(ConfigError::EmptyGrid);
        }
        let cells = self.grid.width as u64 * self.grid.height as u64;
        if cells > u32::MAX as u64 {
            return Err(ConfigError::TooLarge { what: "Cell", count: cells });
        }
        if self.agent_count == 0 {
            return Err(ConfigError::NoAgents);
        }
        if self.agent_count % AGENT_WORKGROUP_SIZE != 0 {
            return Err(ConfigError::AgentCountNotAligned {
                count: self.agent_count,
                workgroup: AGENT_WORKGROUP_SIZE,
            });
        }
        if self.species == 0 || self.species > MAX_SPECIES {
            return Err(ConfigError::SpeciesCount(self.species));
        }
        Ok(())
    }

    /// Bytes held by the stores: per species, live + snapshot agents and
    /// front, back, accumulator and snapshot field buffers.
    pub fn memory_estimate(&self) -> u64 {
        let agents = self.agent_count as u64 * std::mem::size_of::<Agent>() as u64 * 2;
        let field = self.grid.cells() as u64 * 4 * 4;
        (agents + field) * self.species as u64
    }
}

/// Allocate `len` copies of `value`, reporting failure instead of aborting.
pub(crate) fn try_alloc<T: Clone>(
    len: usize,
    value: T,
    what: &'static str,
) -> Result<Vec<T>, SimulationError> {
    let mut v = try_with_capacity(len, what)?;
    v.resize(len, value);
    Ok(v)
}

/// Empty vector with room for `cap` elements, reporting failure instead of aborting.
pub(crate) fn try_with_capacity<T>(cap: usize, what: &'static str) -> Result<Vec<T>, SimulationError> {
    let mut v = Vec::new();
    v.try_reserve_exact(cap).map_err(|_| SimulationError::Allocation {
        what,
        bytes: cap.saturating_mul(std::mem::size_of::<T>()),
    })?;
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(SimConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_empty_grid() {
        let c = SimConfig::new().with_grid(GridSize::new(0, 10));
        assert_eq!(c.validate(), Err(ConfigError::EmptyGrid));
    }

    #[test]
    fn test_rejects_unaligned_agent_count() {
        let c = SimConfig::new().with_agent_count(1000);
        assert_eq!(
            c.validate(),
            Err(ConfigError::AgentCountNotAligned { count: 1000, workgroup: 256 })
        );
    }

    #[test]
    fn test_rejects_species_count() {
        assert_eq!(SimConfig::new().with_species(0).validate(), Err(ConfigError::SpeciesCount(0)));
        assert_eq!(SimConfig::new().with_species(3).validate(), Err(ConfigError::SpeciesCount(3)));
    }

    #[test]
    fn test_rejects_oversized_grid() {
        let c = SimConfig::new().with_grid(GridSize::new(u32::MAX, 4));
        assert!(matches!(c.validate(), Err(ConfigError::TooLarge { .. })));
    }

    #[test]
    fn test_memory_estimate() {
        let c = SimConfig::new()
            .with_grid(GridSize::new(10, 10))
            .with_agent_count(256)
            .with_species(1);
        assert_eq!(c.memory_estimate(), 256 * 16 * 2 + 100 * 16);
    }

    #[test]
    fn test_try_alloc_reports_absurd_sizes() {
        let r = try_alloc::<u64>(usize::MAX / 4, 0, "test buffer");
        assert!(matches!(r, Err(SimulationError::Allocation { what: "test buffer", .. })));
    }
}
