//! Benchmarks for the CPU pipeline stages and shader assembly.
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use physarum::cpu::update_field;
use physarum::gpu::shaders::{agent_shader, diffusion_shader};
use physarum::prelude::*;
use physarum::render::{render_frame, ColourMap};
use physarum::FieldBuffers;

fn simulation(side: u32, agents: u32, species: usize) -> Simulation {
    let config = SimConfig::new()
        .with_grid(GridSize::new(side, side))
        .with_agent_count(agents)
        .with_species(species);
    Simulation::new(config)
        .expect("valid bench config")
        .with_params(SimParams::default().with_multi_species(species > 1))
}

fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");
    group.sample_size(20);

    for agents in [16_384u32, 65_536, 262_144] {
        group.bench_with_input(BenchmarkId::new("one_species", agents), &agents, |b, &n| {
            let mut sim = simulation(256, n, 1);
            b.iter(|| sim.tick())
        });
    }

    group.bench_function("two_species_rival", |b| {
        let mut sim = simulation(256, 65_536, 2);
        b.iter(|| sim.tick())
    });

    group.finish();
}

fn bench_field_stage(c: &mut Criterion) {
    let mut group = c.benchmark_group("field_stage");

    for side in [256u32, 512, 1024] {
        group.bench_with_input(BenchmarkId::from_parameter(side), &side, |b, &side| {
            let grid = GridSize::new(side, side);
            let mut field = FieldBuffers::new(grid.cells()).expect("field alloc");
            let seed: Vec<f32> = (0..grid.cells()).map(|i| (i % 17) as f32).collect();
            field.load(&seed);
            b.iter(|| {
                update_field(grid, &mut field, 0.5, 0.1);
                field.publish();
            })
        });
    }

    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let grid = GridSize::new(512, 512);
    let first: Vec<f32> = (0..grid.cells()).map(|i| (i % 31) as f32 * 0.2).collect();
    let second: Vec<f32> = (0..grid.cells()).map(|i| (i % 13) as f32 * 0.5).collect();

    let mut group = c.benchmark_group("render_frame");
    group.bench_function("greyscale", |b| {
        let map = ColourMap::new(false);
        b.iter(|| black_box(render_frame(grid, &[first.as_slice()], &map)))
    });
    group.bench_function("two_species_colour", |b| {
        let map = ColourMap::new(true);
        b.iter(|| black_box(render_frame(grid, &[first.as_slice(), second.as_slice()], &map)))
    });
    group.finish();
}

fn bench_shader_assembly(c: &mut Criterion) {
    let mut group = c.benchmark_group("shader_assembly");
    group.bench_function("agent", |b| b.iter(|| black_box(agent_shader())));
    group.bench_function("diffusion", |b| b.iter(|| black_box(diffusion_shader())));
    group.finish();
}

criterion_group!(
    benches,
    bench_tick,
    bench_field_stage,
    bench_render,
    bench_shader_assembly
);
criterion_main!(benches);
