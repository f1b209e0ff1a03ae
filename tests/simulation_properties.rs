//! End-to-end properties of the CPU pipeline.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use physarum::cpu::{step_agent, turn, update_field, Sensing};
use physarum::prelude::*;
use physarum::{Agent, FieldBuffers, DEPOSIT_AMOUNT};

fn config(width: u32, height: u32, agents: u32, species: usize) -> SimConfig {
    SimConfig::new()
        .with_grid(GridSize::new(width, height))
        .with_agent_count(agents)
        .with_species(species)
        .with_seed(2024)
}

// ============================================================================
// Wraparound
// ============================================================================

#[test]
fn test_step_past_edge_wraps_not_clamps() {
    let grid = GridSize::new(200, 100);
    let field = vec![0.0; grid.cells()];
    let params = SimParams::default().with_max_speed(5.0);
    let sensing = Sensing { grid, own: &field, other: None, params: &params };

    let agent = Agent::new(Vec2::new(198.0, 40.0), 0.0);
    let next = step_agent(&agent, &sensing, false);
    assert!((next.position.x - 3.0).abs() < 1e-4, "x = {}", next.position.x);

    let agent = Agent::new(Vec2::new(20.0, 98.0), std::f32::consts::FRAC_PI_2);
    let next = step_agent(&agent, &sensing, false);
    assert!((next.position.y - 3.0).abs() < 1e-3, "y = {}", next.position.y);
}

#[test]
fn test_positions_stay_in_domain() {
    let mut sim = Simulation::new(config(64, 48, 1024, 2)).unwrap().with_params(
        SimParams::default()
            .with_max_speed(17.5)
            .with_multi_species(true)
            .with_density_speed(true),
    );
    for _ in 0..40 {
        sim.tick();
        for s in 0..2 {
            for a in sim.agents(s) {
                assert!(a.position.x >= 0.0 && a.position.x < 64.0, "{:?}", a);
                assert!(a.position.y >= 0.0 && a.position.y < 48.0, "{:?}", a);
                assert!(a.heading.is_finite());
            }
        }
    }
}

#[test]
fn test_narrow_grid_starts_and_resets_in_domain() {
    let mut sim = Simulation::new(config(64, 512, 1024, 1)).unwrap();
    let in_domain = |sim: &Simulation| {
        sim.agents(0).iter().all(|a| {
            (0.0..64.0).contains(&a.position.x) && (0.0..512.0).contains(&a.position.y)
        })
    };
    assert!(in_domain(&sim));
    for _ in 0..5 {
        sim.tick();
    }
    sim.reset();
    assert!(in_domain(&sim));
}

// ============================================================================
// Deposits
// ============================================================================

#[test]
fn test_every_deposit_lands() {
    // All agents start on one cell, so deposits collide heavily.
    let mut sim = Simulation::new(config(32, 32, 4096, 1).with_placement(Placement::Center))
        .unwrap()
        .with_params(
            SimParams::default()
                .with_max_speed(0.0)
                .with_decay_weight(0.0)
                .with_diffusion_weight(0.0),
        );
    sim.tick();
    let expected = 4096.0 * DEPOSIT_AMOUNT as f64;
    assert_eq!(sim.total_intensity(0), expected);
    let grid = sim.grid();
    assert_eq!(sim.front(0)[grid.index(16, 16)], 4096.0);
}

#[test]
fn test_mass_non_decreasing_without_decay() {
    let mut sim = Simulation::new(config(96, 64, 2048, 1))
        .unwrap()
        .with_params(SimParams::default().with_decay_weight(0.0).with_diffusion_weight(0.4));
    let mut previous = sim.total_intensity(0);
    for _ in 0..25 {
        sim.tick();
        let total = sim.total_intensity(0);
        assert!(total >= previous, "mass fell from {} to {}", previous, total);
        previous = total;
    }
}

// ============================================================================
// Field Update Stage
// ============================================================================

#[test]
fn test_decay_is_geometric() {
    let grid = GridSize::new(16, 16);
    let mut values = vec![0.0; grid.cells()];
    let mut rng = SmallRng::seed_from_u64(7);
    for v in values.iter_mut() {
        *v = rng.gen_range(0.5..50.0);
    }
    let initial = values.clone();
    let mut field = FieldBuffers::new(grid.cells()).unwrap();
    field.load(&values);

    let decay = 0.2f32;
    for n in 1..=10 {
        let before = field.front().to_vec();
        update_field(grid, &mut field, 0.0, decay);
        field.publish();
        for (i, (&now, &was)) in field.front().iter().zip(&before).enumerate() {
            assert!(now < was, "cell {} did not decrease", i);
            let expected = initial[i] * (1.0 - decay).powi(n);
            assert!((now - expected).abs() <= expected * 1e-5, "cell {} tick {}", i, n);
        }
    }
}

#[test]
fn test_diffusion_wraps_toroidally() {
    let grid = GridSize::new(10, 8);
    let mut field = FieldBuffers::new(grid.cells()).unwrap();
    field.deposit(grid.index(0, 0));
    update_field(grid, &mut field, 0.5, 0.0);
    field.publish();

    let front = field.front();
    let at = |x, y| front[grid.index(x, y)];
    let neighbour = at(1, 0);
    assert!(neighbour > 0.0);
    for (x, y) in [(9, 0), (0, 7), (0, 1)] {
        assert_eq!(at(x, y), neighbour, "cell ({}, {})", x, y);
    }
    assert_eq!(at(9, 7), at(1, 1));
    assert_eq!(at(5, 4), 0.0);
}

// ============================================================================
// Reset
// ============================================================================

fn snapshot_bits(sim: &Simulation, species: usize) -> (Vec<u32>, Vec<u32>) {
    let agents = sim
        .agents(species)
        .iter()
        .flat_map(|a| [a.position.x.to_bits(), a.position.y.to_bits(), a.heading.to_bits()])
        .collect();
    let field = sim.front(species).iter().map(|v| v.to_bits()).collect();
    (agents, field)
}

#[test]
fn test_reset_is_idempotent_and_exact() {
    let mut sim = Simulation::new(config(48, 48, 512, 2))
        .unwrap()
        .with_params(SimParams::default().with_multi_species(true));
    let initial: Vec<_> = (0..2).map(|s| snapshot_bits(&sim, s)).collect();

    for _ in 0..15 {
        sim.tick();
    }
    assert_ne!(snapshot_bits(&sim, 0), initial[0]);

    sim.reset();
    let once: Vec<_> = (0..2).map(|s| snapshot_bits(&sim, s)).collect();
    sim.reset();
    let twice: Vec<_> = (0..2).map(|s| snapshot_bits(&sim, s)).collect();

    assert_eq!(once, initial);
    assert_eq!(twice, once);
    for s in 0..2 {
        let field = sim.field_store().species(s);
        assert_eq!(field.front(), field.clear_snapshot());
        assert_eq!(field.back(), field.clear_snapshot());
    }
}

#[test]
fn test_reset_replays_the_same_run() {
    let mut sim = Simulation::new(config(40, 40, 256, 1)).unwrap();
    for _ in 0..8 {
        sim.tick();
    }
    let first = sim.front(0).to_vec();
    sim.reset();
    for _ in 0..8 {
        sim.tick();
    }
    assert_eq!(sim.front(0), &first[..]);
}

// ============================================================================
// Tie-break
// ============================================================================

#[test]
fn test_equal_sides_always_give_finite_heading() {
    let mut rng = SmallRng::seed_from_u64(99);
    for _ in 0..10_000 {
        let heading = rng.gen_range(-100.0..100.0);
        let side: f32 = rng.gen_range(0.0..10.0);
        let center = side - rng.gen_range(0.001..5.0);
        let left_on_tie = rng.gen_bool(0.5);
        let h = turn(heading, [side, center, side], 0.7, left_on_tie);
        assert!(h.is_finite());
        assert!((h - heading).abs() > 0.5, "tie must turn");
    }
}

#[test]
fn test_ties_split_both_ways() {
    for tick in 0..4 {
        let seed = physarum::policy::tick_seed(tick, 0);
        let lefts = (0..1000u32)
            .filter(|&i| physarum::policy::tie_break_left(i, seed))
            .count();
        assert!(lefts > 350 && lefts < 650, "tick {}: {} lefts", tick, lefts);
    }
}

// ============================================================================
// Species
// ============================================================================

#[test]
fn test_rival_and_mutual_diverge() {
    let run = |coupling| {
        let mut sim = Simulation::new(config(64, 64, 1024, 2)).unwrap().with_params(
            SimParams::default()
                .with_multi_species(true)
                .with_coupling(coupling)
                .with_base_multi(0.1)
                .with_density_multi(0.05),
        );
        for _ in 0..20 {
            sim.tick();
        }
        sim.front(0).to_vec()
    };
    assert_ne!(run(Coupling::Rival), run(Coupling::Mutual));
}
