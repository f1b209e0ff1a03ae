//! Windowed host: event loop, display, hotkeys, frame export and FPS title.
//!
//! Keys: `r` resets the simulation, `s` toggles frame saving, `Esc` quits.

use std::sync::Arc;

use log::{error, info, warn};
use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{Key, NamedKey},
    window::{Window, WindowId},
};

#[cfg(feature = "egui")]
use crate::gpu::egui_integration::EguiIntegration;

use crate::config::SimConfig;
use crate::engine::Engine;
use crate::error::SimulationError;
use crate::export::FrameExporter;
use crate::gpu::shaders::DisplayUniforms;
use crate::gpu::{DisplayPass, GpuState};
use crate::params::SimParams;
use crate::render::ColourMap;
use crate::time::FrameClock;

const TITLE: &str = "physarum";

/// Largest initial window edge, in logical pixels.
const MAX_WINDOW_EDGE: f64 = 1080.0;

/// Everything created once the window exists.
struct Running {
    window: Arc<Window>,
    gpu: GpuState,
    engine: Engine,
    display: DisplayPass,
    display_bind: wgpu::BindGroup,
    /// Host-to-device copies of the CPU fronts (empty on the GPU engine).
    uploads: Vec<wgpu::Buffer>,
    #[cfg(feature = "egui")]
    egui: EguiIntegration,
}

/// The windowed application.
pub struct App {
    config: SimConfig,
    use_cpu: bool,
    params: SimParams,
    exporter: FrameExporter,
    clock: FrameClock,
    running: Option<Running>,
    error: Option<SimulationError>,
}

impl App {
    pub fn new(config: SimConfig, params: SimParams, use_cpu: bool, exporter: FrameExporter) -> Self {
        Self {
            config,
            use_cpu,
            params,
            exporter,
            clock: FrameClock::new(),
            running: None,
            error: None,
        }
    }

    /// Open the window and run until it closes.
    pub fn run(mut self) -> Result<(), SimulationError> {
        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Poll);
        event_loop.run_app(&mut self)?;
        match self.error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<Running, SimulationError> {
        let grid = self.config.grid;
        let scale = (MAX_WINDOW_EDGE / grid.width.max(grid.height) as f64).min(1.0);
        let attrs = Window::default_attributes()
            .with_title(TITLE)
            .with_inner_size(winit::dpi::LogicalSize::new(
                grid.width as f64 * scale,
                grid.height as f64 * scale,
            ));
        let window = Arc::new(event_loop.create_window(attrs)?);
        let gpu = pollster::block_on(GpuState::new(window.clone()))?;

        let mut engine = if self.use_cpu {
            Engine::cpu(self.config.clone())?
        } else {
            Engine::gpu(self.config.clone(), gpu.gpu.clone())?
        };
        engine.set_params(self.params);
        info!("Running on {}", engine.label());

        let device = &gpu.gpu.device;
        let display = DisplayPass::new(device, gpu.format());
        let (uploads, display_bind) = match &engine {
            Engine::Cpu(_) => {
                let uploads: Vec<wgpu::Buffer> = (0..engine.species_count())
                    .map(|s| {
                        device.create_buffer(&wgpu::BufferDescriptor {
                            label: Some(&format!("Species {} Display Upload", s)),
                            size: grid.cells() as u64 * 4,
                            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
                            mapped_at_creation: false,
                        })
                    })
                    .collect();
                let second = uploads.get(1).unwrap_or(&uploads[0]);
                let bind = display.bind(device, &uploads[0], second);
                (uploads, bind)
            }
            Engine::Gpu { sim, .. } => {
                let second = if sim.species_count() > 1 { sim.front(1) } else { sim.front(0) };
                (Vec::new(), display.bind(device, sim.front(0), second))
            }
        };

        #[cfg(feature = "egui")]
        let egui = EguiIntegration::new(device, gpu.format(), &window);

        Ok(Running {
            window,
            gpu,
            engine,
            display,
            display_bind,
            uploads,
            #[cfg(feature = "egui")]
            egui,
        })
    }

    fn reset(&mut self) {
        if let Some(run) = &mut self.running {
            run.engine.reset();
        }
    }

    /// Tick once, export if saving, draw.
    fn frame(&mut self) {
        let Self {
            running,
            params,
            exporter,
            clock,
            ..
        } = self;
        let Some(run) = running.as_mut() else {
            return;
        };

        if run.engine.params() != params {
            run.engine.set_params(*params);
        }
        run.engine.tick();

        let map = ColourMap::new(params.colouring);
        if exporter.is_saving() {
            let saved = run
                .engine
                .render(&map)
                .map_err(SimulationError::from)
                .and_then(|img| exporter.save(&img).map_err(SimulationError::from));
            if let Err(e) = saved {
                warn!("Frame {} not saved: {}", exporter.next_index(), e);
            }
        }

        let gpu = run.gpu.gpu.clone();
        let active = run.engine.active_species();
        if let Engine::Cpu(sim) = &run.engine {
            for s in 0..active {
                gpu.queue
                    .write_buffer(&run.uploads[s], 0, bytemuck::cast_slice(sim.front(s)));
            }
        }
        run.display
            .update(&gpu.queue, &DisplayUniforms::new(run.engine.grid(), active > 1, &map));

        let Some(frame) = run.gpu.acquire() else {
            return;
        };
        let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Frame Encoder"),
        });
        run.display.draw(&mut encoder, &view, &run.display_bind);

        #[cfg(feature = "egui")]
        let actions = {
            let (output, actions) = run.egui.run(&run.window, params, exporter.is_saving());
            let size = [run.gpu.config.width, run.gpu.config.height];
            run.egui
                .paint(&gpu.device, &gpu.queue, &mut encoder, &view, size, &output);
            actions
        };

        gpu.queue.submit(Some(encoder.finish()));
        frame.present();

        if clock.frame().is_some() {
            run.window.set_title(&clock.title(TITLE));
        }

        #[cfg(feature = "egui")]
        {
            if actions.reset {
                run.engine.reset();
            }
            if actions.toggle_saving {
                exporter.toggle_saving();
            }
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.running.is_some() || self.error.is_some() {
            return;
        }
        match self.start(event_loop) {
            Ok(run) => self.running = Some(run),
            Err(e) => {
                error!("{}", e);
                self.error = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        #[cfg(feature = "egui")]
        if let Some(run) = &mut self.running {
            if run.egui.on_window_event(&run.window, &event) {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if let Some(run) = &mut self.running {
                    run.gpu.resize(size.width, size.height);
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key,
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => match logical_key {
                Key::Named(NamedKey::Escape) => event_loop.exit(),
                Key::Character(c) => match c.as_str() {
                    "r" => self.reset(),
                    "s" => {
                        self.exporter.toggle_saving();
                    }
                    _ => {}
                },
                _ => {}
            },
            WindowEvent::RedrawRequested => self.frame(),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(run) = &self.running {
            run.window.request_redraw();
        }
    }
}
