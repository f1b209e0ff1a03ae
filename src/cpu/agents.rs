//! Agent Update Stage.

use rayon::prelude::*;

use crate::agent::Agent;
use crate::field::FieldBuffers;
use crate::grid::{wrap, GridSize};
use crate::params::SimParams;
use crate::policy::{density_speed_factor, tick_seed, tie_break_left};
use crate::Vec2;

/// Read-only view of the fields an agent senses during one tick.
#[derive(Clone, Copy)]
pub struct Sensing<'a> {
    pub grid: GridSize,
    /// Own species' published field.
    pub own: &'a [f32],
    /// Other species' published field when coupling is active.
    pub other: Option<&'a [f32]>,
    pub params: &'a SimParams,
}

impl<'a> Sensing<'a> {
    /// Box-filter average of `field` around the cell containing `p`.
    fn sample(&self, field: &[f32], p: Vec2) -> f32 {
        let r = self.params.sensor_size as i64;
        let cx = wrap(p.x, self.grid.width as f32).floor() as i64;
        let cy = wrap(p.y, self.grid.height as f32).floor() as i64;
        let mut sum = 0.0;
        for dy in -r..=r {
            for dx in -r..=r {
                sum += field[self.grid.wrapped_index(cx + dx, cy + dy)];
            }
        }
        let side = (2 * r + 1) as f32;
        sum / (side * side)
    }

    /// Coupled reading at one sensor point.
    fn read(&self, p: Vec2) -> f32 {
        let own = self.sample(self.own, p);
        match self.other {
            Some(other) => {
                let other = self.sample(other, p);
                self.params
                    .coupling
                    .blend(own, other, self.params.base_multi, self.params.density_multi)
            }
            None => own,
        }
    }

    /// Readings `[left, center, right]` for an agent. The left sensor sits at
    /// `heading - sensor_angle`.
    pub fn sense(&self, position: Vec2, heading: f32) -> [f32; 3] {
        let d = self.params.sensor_distance;
        let a = self.params.sensor_angle;
        let probe = |angle: f32| position + Vec2::from_angle(angle) * d;
        [
            self.read(probe(heading - a)),
            self.read(probe(heading)),
            self.read(probe(heading + a)),
        ]
    }
}

/// Turn decision from `[left, center, right]` readings.
///
/// Straight when the centre is at least as strong as both sides, otherwise
/// toward the stronger side. Equal (or incomparable) sides fall back to
/// `left_on_tie`.
#[inline]
pub fn turn(heading: f32, readings: [f32; 3], turning_speed: f32, left_on_tie: bool) -> f32 {
    let [left, center, right] = readings;
    if center >= left && center >= right {
        heading
    } else if left > right {
        heading - turning_speed
    } else if right > left {
        heading + turning_speed
    } else if left_on_tie {
        heading - turning_speed
    } else {
        heading + turning_speed
    }
}

/// Advance one agent by one tick. Returns the updated agent; the caller
/// deposits at its new cell.
pub fn step_agent(agent: &Agent, sensing: &Sensing, left_on_tie: bool) -> Agent {
    let params = sensing.params;
    let readings = sensing.sense(agent.position, agent.heading);

    let mut heading = turn(agent.heading, readings, params.turning_speed, left_on_tie);
    if !heading.is_finite() {
        heading = agent.heading;
    }

    let mut speed = params.max_speed;
    if params.density_speed {
        speed *= density_speed_factor(readings[1], params.density_multi);
    }

    let moved = agent.position + Vec2::from_angle(heading) * speed;
    let position = if moved.is_finite() {
        Vec2::new(
            wrap(moved.x, sensing.grid.width as f32),
            wrap(moved.y, sensing.grid.height as f32),
        )
    } else {
        agent.position
    };

    Agent::new(position, heading)
}

/// Run the Agent Update Stage for one species.
///
/// Reads only the published fronts in `fields`, mutates `agents` in place and
/// records one deposit per agent in the species' accumulator.
pub fn update_agents(
    grid: GridSize,
    agents: &mut [Agent],
    fields: &[FieldBuffers],
    species: usize,
    other: Option<usize>,
    params: &SimParams,
    tick: u64,
) {
    let sensing = Sensing {
        grid,
        own: fields[species].front(),
        other: other.map(|o| fields[o].front()),
        params,
    };
    let target = &fields[species];
    let seed = tick_seed(tick, species);

    agents.par_iter_mut().enumerate().for_each(|(i, agent)| {
        *agent = step_agent(agent, &sensing, tie_break_left(i as u32, seed));
        target.deposit(grid.cell_of(agent.position.x, agent.position.y));
    });
}
