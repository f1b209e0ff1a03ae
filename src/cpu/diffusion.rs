//! Field Update Stage: 3×3 wrapped box diffusion followed by decay.

use rayon::prelude::*;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::field::{FieldBuffers, DEPOSIT_AMOUNT};
use crate::grid::GridSize;

/// Stage input at one cell: published value plus this tick's deposits.
#[inline]
fn merged(front: &[f32], deposits: &[AtomicU32], i: usize) -> f32 {
    front[i] + deposits[i].load(Ordering::Relaxed) as f32 * DEPOSIT_AMOUNT
}

/// Next value of cell `(x, y)`.
///
/// `diffused = (1 - w) * v + w * mean3x3`, then scaled by `1 - decay`.
#[inline]
pub fn diffuse_cell(
    grid: GridSize,
    front: &[f32],
    deposits: &[AtomicU32],
    x: u32,
    y: u32,
    diffusion_weight: f32,
    decay_weight: f32,
) -> f32 {
    let (x, y) = (x as i64, y as i64);
    let mut sum = 0.0;
    for dy in -1..=1 {
        for dx in -1..=1 {
            sum += merged(front, deposits, grid.wrapped_index(x + dx, y + dy));
        }
    }
    let v = merged(front, deposits, grid.wrapped_index(x, y));
    let diffused = (1.0 - diffusion_weight) * v + diffusion_weight * (sum / 9.0);
    diffused * (1.0 - decay_weight)
}

/// Run the Field Update Stage for one species: read `front + deposits`,
/// write `back`. Never reads from `back`.
pub fn update_field(grid: GridSize, field: &mut FieldBuffers, diffusion_weight: f32, decay_weight: f32) {
    let (front, deposits, back) = field.split_for_update();
    back.par_chunks_mut(grid.width as usize)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, out) in row.iter_mut().enumerate() {
                *out = diffuse_cell(
                    grid,
                    front,
                    deposits,
                    x as u32,
                    y as u32,
                    diffusion_weight,
                    decay_weight,
                );
            }
        });
}
