//! The Field Store: pheromone grids.
//!
//! Each species owns one scalar field of `W × H` cells with:
//!
//! - **front**: read by sensing, diffusion and display. Never written during
//!   a tick.
//! - **back**: write target of the Field Update Stage.
//! - **deposits**: per-cell atomic counters, the write side of the back
//!   buffer during the agent phase. Deposits are unit amounts, so an integer
//!   `fetch_add` merges concurrent writes to the same cell without loss and
//!   independent of ordering.
//! - **clear**: all-zero snapshot used by reset.
//!
//! After every publish `front == back` and all deposit counters are zero.

use rayon::prelude::*;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::config::{try_alloc, try_with_capacity};
use crate::error::SimulationError;
use crate::grid::GridSize;

/// Intensity added to a cell by one agent deposit.
pub const DEPOSIT_AMOUNT: f32 = 1.0;

/// Buffers for one species' field.
#[derive(Debug)]
pub struct FieldBuffers {
    front: Vec<f32>,
    back: Vec<f32>,
    deposits: Vec<AtomicU32>,
    clear: Vec<f32>,
}

impl FieldBuffers {
    /// Allocate a zeroed field of `cells` cells.
    pub fn new(cells: usize) -> Result<Self, SimulationError> {
        let mut deposits = try_with_capacity(cells, "field deposit accumulator")?;
        deposits.extend((0..cells).map(|_| AtomicU32::new(0)));
        Ok(Self {
            front: try_alloc(cells, 0.0, "field front buffer")?,
            back: try_alloc(cells, 0.0, "field back buffer")?,
            deposits,
            clear: try_alloc(cells, 0.0, "field clear snapshot")?,
        })
    }

    pub fn front(&self) -> &[f32] {
        &self.front
    }

    pub fn back(&self) -> &[f32] {
        &self.back
    }

    pub fn deposits(&self) -> &[AtomicU32] {
        &self.deposits
    }

    pub fn clear_snapshot(&self) -> &[f32] {
        &self.clear
    }

    /// Record one deposit in `cell`. Safe to call from many threads at once.
    #[inline]
    pub fn deposit(&self, cell: usize) {
        self.deposits[cell].fetch_add(1, Ordering::Relaxed);
    }

    /// Deposits recorded in `cell` since the last publish.
    #[inline]
    pub fn deposit_count(&self, cell: usize) -> u32 {
        self.deposits[cell].load(Ordering::Relaxed)
    }

    /// Borrow the stage inputs (front, deposits) alongside the output (back).
    pub fn split_for_update(&mut self) -> (&[f32], &[AtomicU32], &mut [f32]) {
        (&self.front, &self.deposits, &mut self.back)
    }

    /// Publish `back` into `front` and clear the accumulator.
    pub fn publish(&mut self) {
        self.front.par_iter_mut().zip(self.back.par_iter()).for_each(|(f, b)| *f = *b);
        self.deposits.par_iter().for_each(|d| d.store(0, Ordering::Relaxed));
    }

    /// Overwrite front and back from the clear snapshot and drop pending deposits.
    pub fn restore(&mut self) {
        self.front.copy_from_slice(&self.clear);
        self.back.copy_from_slice(&self.clear);
        self.deposits.iter().for_each(|d| d.store(0, Ordering::Relaxed));
    }

    /// Load a published state into both front and back (used to seed scenarios).
    ///
    /// # Panics
    ///
    /// Panics if `values` does not have one entry per cell.
    pub fn load(&mut self, values: &[f32]) {
        self.front.copy_from_slice(values);
        self.back.copy_from_slice(values);
        self.deposits.iter().for_each(|d| d.store(0, Ordering::Relaxed));
    }

    /// Sum of published intensity.
    pub fn total_intensity(&self) -> f64 {
        self.front.par_iter().map(|&v| v as f64).sum()
    }
}

/// Fields for every allocated species.
#[derive(Debug)]
pub struct FieldStore {
    grid: GridSize,
    species: Vec<FieldBuffers>,
}

impl FieldStore {
    pub fn new(grid: GridSize, species: usize) -> Result<Self, SimulationError> {
        let species = (0..species)
            .map(|_| FieldBuffers::new(grid.cells()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { grid, species })
    }

    pub fn grid(&self) -> GridSize {
        self.grid
    }

    pub fn species(&self, s: usize) -> &FieldBuffers {
        &self.species[s]
    }

    pub fn species_mut(&mut self, s: usize) -> &mut FieldBuffers {
        &mut self.species[s]
    }

    pub fn species_count(&self) -> usize {
        self.species.len()
    }

    /// All species' buffers, for stages that read across species.
    pub fn all(&self) -> &[FieldBuffers] {
        &self.species
    }

    pub fn restore(&mut self) {
        for field in &mut self.species {
            field.restore();
        }
    }
}
