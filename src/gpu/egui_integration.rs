//! Egui parameter panel, enabled with the `egui` feature.
//!
//! The panel edits a copy of the Parameter Set; the host hands it back to the
//! simulation between ticks.

use std::sync::Arc;
use winit::window::Window;

use crate::params::{SimParams, PARAM_BOUNDS};
use crate::policy::Coupling;

/// Egui integration state.
///
/// Wraps egui context, winit state, and wgpu renderer.
pub struct EguiIntegration {
    pub ctx: egui::Context,
    state: egui_winit::State,
    renderer: egui_wgpu::Renderer,
}

/// Output from egui frame processing.
pub struct EguiFrameOutput {
    pub paint_jobs: Vec<egui::ClippedPrimitive>,
    pub textures_delta: egui::TexturesDelta,
    pub pixels_per_point: f32,
}

/// Commands issued from the panel this frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PanelActions {
    pub reset: bool,
    pub toggle_saving: bool,
}

impl EguiIntegration {
    pub fn new(
        device: &wgpu::Device,
        output_format: wgpu::TextureFormat,
        window: &Arc<Window>,
    ) -> Self {
        let ctx = egui::Context::default();

        let mut style = egui::Style::default();
        style.visuals = egui::Visuals::dark();
        style.visuals.window_shadow = egui::Shadow::NONE;
        style.visuals.popup_shadow = egui::Shadow::NONE;
        ctx.set_style(style);

        let state = egui_winit::State::new(
            ctx.clone(),
            egui::ViewportId::ROOT,
            window.as_ref(),
            Some(window.scale_factor() as f32),
            None,
            None,
        );

        let renderer = egui_wgpu::Renderer::new(
            device,
            output_format,
            None,  // depth format
            1,     // msaa samples
            false, // dithering
        );

        Self { ctx, state, renderer }
    }

    /// Returns true if egui consumed the event (don't treat it as a hotkey).
    pub fn on_window_event(&mut self, window: &Window, event: &winit::event::WindowEvent) -> bool {
        self.state.on_window_event(window, event).consumed
    }

    /// Run the parameter panel for one frame.
    pub fn run(
        &mut self,
        window: &Window,
        params: &mut SimParams,
        saving: bool,
    ) -> (EguiFrameOutput, PanelActions) {
        let raw_input = self.state.take_egui_input(window);
        let mut actions = PanelActions::default();
        let full_output = self.ctx.run(raw_input, |ctx| {
            actions = parameter_panel(ctx, params, saving);
        });

        self.state.handle_platform_output(window, full_output.platform_output);
        let paint_jobs = self.ctx.tessellate(full_output.shapes, full_output.pixels_per_point);

        (
            EguiFrameOutput {
                paint_jobs,
                textures_delta: full_output.textures_delta,
                pixels_per_point: full_output.pixels_per_point,
            },
            actions,
        )
    }

    /// Upload textures and buffers, draw on top of `view`, free textures.
    pub fn paint(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        size: [u32; 2],
        output: &EguiFrameOutput,
    ) {
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: size,
            pixels_per_point: output.pixels_per_point,
        };

        for (id, image_delta) in &output.textures_delta.set {
            self.renderer.update_texture(device, queue, *id, image_delta);
        }
        self.renderer
            .update_buffers(device, queue, encoder, &output.paint_jobs, &screen_descriptor);

        {
            let pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Egui Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            let mut pass = pass.forget_lifetime();
            self.renderer.render(&mut pass, &output.paint_jobs, &screen_descriptor);
        }

        for id in &output.textures_delta.free {
            self.renderer.free_texture(id);
        }
    }
}

fn slider(ui: &mut egui::Ui, name: &str, value: &mut f32) {
    if let Some(bound) = PARAM_BOUNDS.iter().find(|b| b.name == name) {
        let step = if bound.integer { 1.0 } else { 0.0 };
        ui.add(egui::Slider::new(value, bound.min..=bound.max).text(name).step_by(step));
    }
}

/// Controls for every tunable parameter plus the two host commands.
pub fn parameter_panel(ctx: &egui::Context, params: &mut SimParams, saving: bool) -> PanelActions {
    let mut actions = PanelActions::default();
    egui::Window::new("Parameters")
        .default_pos([12.0, 12.0])
        .resizable(false)
        .show(ctx, |ui| {
            ui.label("Agents");
            slider(ui, "maxSpeed", &mut params.max_speed);
            slider(ui, "turningSpeed", &mut params.turning_speed);
            slider(ui, "sensorAngle", &mut params.sensor_angle);
            slider(ui, "sensorDistance", &mut params.sensor_distance);
            let mut size = params.sensor_size as f32;
            slider(ui, "sensorSize", &mut size);
            params.sensor_size = size.round() as u32;
            ui.checkbox(&mut params.density_speed, "densitySpeed");

            ui.separator();
            ui.label("Species");
            ui.checkbox(&mut params.multi_species, "multiSpecies");
            slider(ui, "baseMulti", &mut params.base_multi);
            slider(ui, "densityMulti", &mut params.density_multi);
            egui::ComboBox::from_label("coupling")
                .selected_text(params.coupling.label())
                .show_ui(ui, |ui| {
                    for c in Coupling::ALL {
                        ui.selectable_value(&mut params.coupling, c, c.label());
                    }
                });

            ui.separator();
            ui.label("Pheromones");
            slider(ui, "decayWeight", &mut params.decay_weight);
            slider(ui, "diffusionWeight", &mut params.diffusion_weight);
            ui.checkbox(&mut params.colouring, "colouring");

            ui.separator();
            ui.horizontal(|ui| {
                actions.reset = ui.button("Reset (r)").clicked();
                let label = if saving { "Stop saving (s)" } else { "Save frames (s)" };
                actions.toggle_saving = ui.button(label).clicked();
            });
        });
    actions
}
