//! Data-parallel CPU kernels.
//!
//! Both stages fan out with rayon: agents over the live agent buffer, cells
//! over rows of the back buffer. The only cross-worker write is the deposit
//! accumulator, which is atomic.

mod agents;
mod diffusion;

pub use agents::{step_agent, turn, update_agents, Sensing};
pub use diffusion::{diffuse_cell, update_field};
