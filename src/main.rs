use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use log::{error, info, warn};

use physarum::app::App;
use physarum::engine::Engine;
use physarum::export::FrameExporter;
use physarum::gpu::GpuDevice;
use physarum::render::ColourMap;
use physarum::time::FrameClock;
use physarum::{Coupling, GridSize, Placement, SimConfig, SimParams, SimulationError};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PlacementArg {
    /// Uniform in a disk around the centre
    Disk,
    /// Every agent at the centre point
    Center,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CouplingArg {
    Rival,
    Mutual,
    Ignore,
}

impl From<CouplingArg> for Coupling {
    fn from(c: CouplingArg) -> Self {
        match c {
            CouplingArg::Rival => Coupling::Rival,
            CouplingArg::Mutual => Coupling::Mutual,
            CouplingArg::Ignore => Coupling::Ignore,
        }
    }
}

/// Physarum slime-mold stigmergy simulation.
#[derive(Parser, Debug)]
#[command(name = "physarum", version, about)]
struct Args {
    /// Grid width in cells
    #[arg(long, default_value_t = 1080)]
    width: u32,

    /// Grid height in cells
    #[arg(long, default_value_t = 1080)]
    height: u32,

    /// Agents per species (multiple of 256)
    #[arg(long, default_value_t = 1024 * 1024)]
    agents: u32,

    /// Species to allocate (1 or 2)
    #[arg(long, default_value_t = 2)]
    species: usize,

    /// Initial placement policy
    #[arg(long, value_enum, default_value_t = PlacementArg::Disk)]
    placement: PlacementArg,

    /// Disk radius as a fraction of the grid height
    #[arg(long, default_value_t = 0.2)]
    radius: f32,

    /// Seed for initial placement
    #[arg(long, default_value_t = 0x5eed)]
    seed: u64,

    /// Start with both species running and coupled
    #[arg(long)]
    multi_species: bool,

    /// Cross-species sensing policy
    #[arg(long, value_enum, default_value_t = CouplingArg::Rival)]
    coupling: CouplingArg,

    /// Colour ramps instead of greyscale
    #[arg(long)]
    colouring: bool,

    /// Run the kernels on the CPU instead of the GPU
    #[arg(long)]
    cpu: bool,

    /// Run without a window
    #[arg(long)]
    headless: bool,

    /// Ticks to run in headless mode
    #[arg(long, default_value_t = 1000)]
    ticks: u64,

    /// Start with frame saving on
    #[arg(long)]
    save: bool,

    /// Directory for saved frames
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
}

impl Args {
    fn config(&self) -> SimConfig {
        let placement = match self.placement {
            PlacementArg::Disk => Placement::Disk {
                radius_fraction: self.radius,
            },
            PlacementArg::Center => Placement::Center,
        };
        SimConfig::new()
            .with_grid(GridSize::new(self.width, self.height))
            .with_agent_count(self.agents)
            .with_species(self.species)
            .with_placement(placement)
            .with_seed(self.seed)
    }

    fn params(&self) -> SimParams {
        SimParams::default()
            .with_multi_species(self.multi_species)
            .with_coupling(self.coupling.into())
            .with_colouring(self.colouring)
    }
}

fn run_headless(args: &Args, exporter: &mut FrameExporter) -> Result<(), SimulationError> {
    let mut engine = if args.cpu {
        Engine::cpu(args.config())?
    } else {
        Engine::gpu(args.config(), Arc::new(GpuDevice::headless()?))?
    };
    engine.set_params(args.params());
    info!("Running {} ticks headless on {}", args.ticks, engine.label());

    let map = ColourMap::new(args.colouring);
    let mut clock = FrameClock::new();
    for _ in 0..args.ticks {
        engine.tick();
        if exporter.is_saving() {
            let img = engine.render(&map)?;
            if let Err(e) = exporter.save(&img) {
                warn!("Frame {} not saved: {}", exporter.next_index(), e);
            }
        }
        if let Some(rate) = clock.frame() {
            info!("tick {} ({:.1} ticks/s)", engine.tick_count(), rate);
        }
    }

    let totals = engine.total_intensity()?;
    info!(
        "Finished {} ticks in {:.2?}; total intensity per species: {:?}",
        engine.tick_count(),
        clock.elapsed(),
        totals
    );
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut exporter = FrameExporter::new(&args.out_dir).with_saving(args.save);

    let result = if args.headless {
        run_headless(&args, &mut exporter)
    } else {
        App::new(args.config(), args.params(), args.cpu, exporter).run()
    };

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}
