//! The Agent Store.
//!
//! Agents are anonymous point particles: a position on the torus and a
//! heading. Each species owns a live buffer, mutated in place by the Agent
//! Update Stage, and an immutable clear snapshot of the initial distribution
//! used by reset.

use bytemuck::{Pod, Zeroable};

use crate::config::{try_alloc, try_with_capacity, SimConfig};
use crate::error::SimulationError;
use crate::spawn::Spawner;
use crate::Vec2;

/// One simulated agent.
///
/// 16 bytes, matching the array stride of the WGSL `Agent` struct, so the
/// live buffer uploads to the GPU without conversion.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Agent {
    /// Position in `[0, W) × [0, H)`.
    pub position: Vec2,
    /// Heading in radians. Unbounded; only its value mod 2π matters.
    pub heading: f32,
    pub _pad: f32,
}

impl Agent {
    pub fn new(position: Vec2, heading: f32) -> Self {
        Self {
            position,
            heading,
            _pad: 0.0,
        }
    }
}

/// WGSL declaration matching [`Agent`].
pub const AGENT_WGSL: &str = r#"
struct Agent {
    position: vec2<f32>,
    heading: f32,
    _pad: f32,
};
"#;

/// Live population and clear snapshot of one species.
#[derive(Debug)]
pub struct AgentBuffers {
    live: Vec<Agent>,
    clear: Vec<Agent>,
}

impl AgentBuffers {
    /// Wrap a freshly spawned population; the snapshot is a copy of it.
    pub fn from_initial(initial: Vec<Agent>) -> Result<Self, SimulationError> {
        let mut clear = try_alloc(initial.len(), Agent::zeroed(), "agent clear snapshot")?;
        clear.copy_from_slice(&initial);
        Ok(Self { live: initial, clear })
    }

    pub fn live(&self) -> &[Agent] {
        &self.live
    }

    pub fn live_mut(&mut self) -> &mut [Agent] {
        &mut self.live
    }

    /// The initial distribution, never modified after construction.
    pub fn clear_snapshot(&self) -> &[Agent] {
        &self.clear
    }

    /// Overwrite the live buffer from the snapshot without reallocating.
    pub fn restore(&mut self) {
        self.live.copy_from_slice(&self.clear);
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}

/// Agent buffers for every allocated species.
#[derive(Debug)]
pub struct AgentStore {
    species: Vec<AgentBuffers>,
}

impl AgentStore {
    /// Allocate and spawn every species described by `config`.
    pub fn new(config: &SimConfig) -> Result<Self, SimulationError> {
        let count = config.agent_count as usize;
        let mut species = Vec::with_capacity(config.species);
        for s in 0..config.species {
            let mut initial = try_with_capacity(count, "agent store")?;
            Spawner::new(config.grid, config.placement, config.seed, s).fill(&mut initial, count);
            species.push(AgentBuffers::from_initial(initial)?);
        }
        Ok(Self { species })
    }

    pub fn species(&self, s: usize) -> &AgentBuffers {
        &self.species[s]
    }

    pub fn species_mut(&mut self, s: usize) -> &mut AgentBuffers {
        &mut self.species[s]
    }

    pub fn species_count(&self) -> usize {
        self.species.len()
    }

    /// Restore every species from its snapshot.
    pub fn restore(&mut self) {
        for buffers in &mut self.species {
            buffers.restore();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridSize;

    fn config() -> SimConfig {
        SimConfig::new()
            .with_grid(GridSize::new(64, 64))
            .with_agent_count(256)
            .with_species(2)
            .with_seed(5)
    }

    #[test]
    fn test_agent_layout_matches_wgsl() {
        assert_eq!(std::mem::size_of::<Agent>(), 16);
        assert_eq!(std::mem::align_of::<Agent>(), 4);
        assert!(AGENT_WGSL.contains("heading: f32"));
    }

    #[test]
    fn test_store_allocates_every_species() {
        let store = AgentStore::new(&config()).unwrap();
        assert_eq!(store.species_count(), 2);
        assert_eq!(store.species(0).len(), 256);
        assert_eq!(store.species(1).len(), 256);
        assert_eq!(store.species(0).live(), store.species(0).clear_snapshot());
    }

    #[test]
    fn test_restore_copies_snapshot_back() {
        let mut store = AgentStore::new(&config()).unwrap();
        let original = store.species(1).clear_snapshot().to_vec();
        for a in store.species_mut(1).live_mut() {
            a.position = Vec2::new(1.0, 1.0);
            a.heading = 9.0;
        }
        assert_ne!(store.species(1).live(), &original[..]);
        store.restore();
        assert_eq!(store.species(1).live(), &original[..]);
    }
}
