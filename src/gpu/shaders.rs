//! WGSL kernels and the uniform blocks they read.
//!
//! The agent and diffusion kernels are assembled from the same policy
//! snippets the CPU kernels mirror (`policy`, `agent`, `render`), so the two
//! substrates agree on coupling, speed modifier, tie-break and colour map.

use bytemuck::{Pod, Zeroable};

use crate::agent::AGENT_WGSL;
use crate::grid::GridSize;
use crate::params::SimParams;
use crate::policy::{tick_seed, COUPLING_WGSL, DENSITY_SPEED_WGSL, RANDOM_WGSL};
use crate::render::{ColourMap, COLOUR_WGSL};

/// Agents per work group in the agent kernel.
pub const AGENT_WORKGROUP: u32 = crate::config::AGENT_WORKGROUP_SIZE;

/// Work-group edge of the diffusion kernel (16×16 cells).
pub const FIELD_WORKGROUP: u32 = 16;

/// Largest work-group count per dispatch dimension guaranteed by wgpu.
pub const MAX_DISPATCH: u32 = 65_535;

/// Per-species, per-tick uniforms shared by both compute kernels.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct SimUniforms {
    pub width: u32,
    pub height: u32,
    pub agent_count: u32,
    pub seed: u32,
    pub has_other: u32,
    pub coupling: u32,
    pub sensor_size: u32,
    pub density_speed: u32,
    pub max_speed: f32,
    pub turning_speed: f32,
    pub sensor_angle: f32,
    pub sensor_distance: f32,
    pub base_multi: f32,
    pub density_multi: f32,
    pub decay_weight: f32,
    pub diffusion_weight: f32,
}

impl SimUniforms {
    pub fn new(
        grid: GridSize,
        agent_count: u32,
        params: &SimParams,
        species: usize,
        coupled: bool,
        tick: u64,
    ) -> Self {
        Self {
            width: grid.width,
            height: grid.height,
            agent_count,
            seed: tick_seed(tick, species),
            has_other: coupled as u32,
            coupling: params.coupling.as_u32(),
            sensor_size: params.sensor_size,
            density_speed: params.density_speed as u32,
            max_speed: params.max_speed,
            turning_speed: params.turning_speed,
            sensor_angle: params.sensor_angle,
            sensor_distance: params.sensor_distance,
            base_multi: params.base_multi,
            density_multi: params.density_multi,
            decay_weight: params.decay_weight,
            diffusion_weight: params.diffusion_weight,
        }
    }
}

const SIM_UNIFORMS_WGSL: &str = r#"
struct SimUniforms {
    width: u32,
    height: u32,
    agent_count: u32,
    seed: u32,
    has_other: u32,
    coupling: u32,
    sensor_size: u32,
    density_speed: u32,
    max_speed: f32,
    turning_speed: f32,
    sensor_angle: f32,
    sensor_distance: f32,
    base_multi: f32,
    density_multi: f32,
    decay_weight: f32,
    diffusion_weight: f32,
};

@group(0) @binding(0) var<uniform> params: SimUniforms;

fn finite(v: f32) -> bool {
    return abs(v) <= 3.4e38;
}

fn wrap_coord(v: f32, extent: f32) -> f32 {
    let r = v - floor(v / extent) * extent;
    if r >= extent || r < 0.0 {
        return 0.0;
    }
    return r;
}

fn cell_index(x: i32, y: i32) -> u32 {
    let w = i32(params.width);
    let h = i32(params.height);
    let wx = ((x % w) + w) % w;
    let wy = ((y % h) + h) % h;
    return u32(wx + wy * w);
}
"#;

const AGENT_MAIN_WGSL: &str = r#"
@group(0) @binding(1) var<storage, read_write> agents: array<Agent>;
@group(0) @binding(2) var<storage, read> own_field: array<f32>;
@group(0) @binding(3) var<storage, read> other_field: array<f32>;
@group(0) @binding(4) var<storage, read_write> deposits: array<atomic<u32>>;

fn sample_field(other: bool, p: vec2<f32>) -> f32 {
    let r = i32(params.sensor_size);
    let cx = i32(floor(wrap_coord(p.x, f32(params.width))));
    let cy = i32(floor(wrap_coord(p.y, f32(params.height))));
    var sum = 0.0;
    for (var dy = -r; dy <= r; dy = dy + 1) {
        for (var dx = -r; dx <= r; dx = dx + 1) {
            let i = cell_index(cx + dx, cy + dy);
            if other {
                sum = sum + other_field[i];
            } else {
                sum = sum + own_field[i];
            }
        }
    }
    let side = f32(2 * r + 1);
    return sum / (side * side);
}

fn read_sensor(p: vec2<f32>) -> f32 {
    let own = sample_field(false, p);
    if params.has_other == 0u {
        return own;
    }
    let other = sample_field(true, p);
    return couple(params.coupling, own, other, params.base_multi, params.density_multi);
}

fn probe(position: vec2<f32>, angle: f32) -> vec2<f32> {
    return position + vec2<f32>(cos(angle), sin(angle)) * params.sensor_distance;
}

@compute @workgroup_size(256)
fn main(
    @builtin(global_invocation_id) gid: vec3<u32>,
    @builtin(num_workgroups) groups: vec3<u32>,
) {
    let index = gid.x + gid.y * groups.x * 256u;
    if index >= params.agent_count {
        return;
    }

    var agent = agents[index];
    let h = agent.heading;
    let a = params.sensor_angle;
    let left = read_sensor(probe(agent.position, h - a));
    let center = read_sensor(probe(agent.position, h));
    let right = read_sensor(probe(agent.position, h + a));

    var heading = h;
    if center >= left && center >= right {
        heading = h;
    } else if left > right {
        heading = h - params.turning_speed;
    } else if right > left {
        heading = h + params.turning_speed;
    } else if tie_break_left(index, params.seed) {
        heading = h - params.turning_speed;
    } else {
        heading = h + params.turning_speed;
    }
    if !finite(heading) {
        heading = h;
    }

    var speed = params.max_speed;
    if params.density_speed != 0u {
        speed = speed * density_speed_factor(center, params.density_multi);
    }

    let moved = agent.position + vec2<f32>(cos(heading), sin(heading)) * speed;
    if finite(moved.x) && finite(moved.y) {
        agent.position = vec2<f32>(
            wrap_coord(moved.x, f32(params.width)),
            wrap_coord(moved.y, f32(params.height)),
        );
    }
    agent.heading = heading;
    agents[index] = agent;

    let cx = min(u32(floor(agent.position.x)), params.width - 1u);
    let cy = min(u32(floor(agent.position.y)), params.height - 1u);
    atomicAdd(&deposits[cx + cy * params.width], 1u);
}
"#;

const DIFFUSION_MAIN_WGSL: &str = r#"
@group(0) @binding(1) var<storage, read> front: array<f32>;
@group(0) @binding(2) var<storage, read> deposits: array<u32>;
@group(0) @binding(3) var<storage, read_write> back: array<f32>;

const DEPOSIT_AMOUNT: f32 = 1.0;

fn merged(i: u32) -> f32 {
    return front[i] + f32(deposits[i]) * DEPOSIT_AMOUNT;
}

@compute @workgroup_size(16, 16)
fn main(@builtin(global_invocation_id) gid: vec3<u32>) {
    if gid.x >= params.width || gid.y >= params.height {
        return;
    }
    let x = i32(gid.x);
    let y = i32(gid.y);

    var sum = 0.0;
    for (var dy = -1; dy <= 1; dy = dy + 1) {
        for (var dx = -1; dx <= 1; dx = dx + 1) {
            sum = sum + merged(cell_index(x + dx, y + dy));
        }
    }
    let i = gid.x + gid.y * params.width;
    let v = merged(i);
    let w = params.diffusion_weight;
    let diffused = (1.0 - w) * v + w * (sum / 9.0);
    back[i] = diffused * (1.0 - params.decay_weight);
}
"#;

/// Full agent-update kernel.
pub fn agent_shader() -> String {
    [
        AGENT_WGSL,
        SIM_UNIFORMS_WGSL,
        RANDOM_WGSL,
        COUPLING_WGSL,
        DENSITY_SPEED_WGSL,
        AGENT_MAIN_WGSL,
    ]
    .concat()
}

/// Full diffusion/decay kernel.
pub fn diffusion_shader() -> String {
    [SIM_UNIFORMS_WGSL, DIFFUSION_MAIN_WGSL].concat()
}

/// Uniforms of the display pass.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct DisplayUniforms {
    pub width: u32,
    pub height: u32,
    pub has_second: u32,
    pub colouring: u32,
    pub scale: f32,
    pub _pad: [f32; 3],
}

impl DisplayUniforms {
    pub fn new(grid: GridSize, has_second: bool, map: &ColourMap) -> Self {
        Self {
            width: grid.width,
            height: grid.height,
            has_second: has_second as u32,
            colouring: map.colouring as u32,
            scale: map.scale,
            _pad: [0.0; 3],
        }
    }
}

const DISPLAY_MAIN_WGSL: &str = r#"
struct DisplayUniforms {
    width: u32,
    height: u32,
    has_second: u32,
    colouring: u32,
    scale: f32,
    _pad0: f32,
    _pad1: f32,
    _pad2: f32,
};

@group(0) @binding(0) var<uniform> display: DisplayUniforms;
@group(0) @binding(1) var<storage, read> first_field: array<f32>;
@group(0) @binding(2) var<storage, read> second_field: array<f32>;

struct VertexOutput {
    @builtin(position) clip: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(@builtin(vertex_index) vi: u32) -> VertexOutput {
    // one triangle covering the screen
    let x = f32((vi << 1u) & 2u);
    let y = f32(vi & 2u);
    var out: VertexOutput;
    out.clip = vec4<f32>(x * 2.0 - 1.0, 1.0 - y * 2.0, 0.0, 1.0);
    out.uv = vec2<f32>(x, y);
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let cx = min(u32(in.uv.x * f32(display.width)), display.width - 1u);
    let cy = min(u32(in.uv.y * f32(display.height)), display.height - 1u);
    let i = cx + cy * display.width;
    let rgb = colour_map(
        first_field[i],
        second_field[i],
        display.has_second != 0u,
        display.colouring != 0u,
        display.scale,
    );
    return vec4<f32>(rgb, 1.0);
}
"#;

/// Full-screen display shader sampling the published fields.
pub fn display_shader() -> String {
    [COLOUR_WGSL, DISPLAY_MAIN_WGSL].concat()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Validates WGSL code using naga.
    fn validate_wgsl(code: &str) -> Result<(), String> {
        let module = naga::front::wgsl::parse_str(code)
            .map_err(|e| format!("WGSL parse error: {:?}", e))?;

        let mut validator = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        );
        validator
            .validate(&module)
            .map_err(|e| format!("WGSL validation error: {:?}", e))?;

        Ok(())
    }

    // ========== Kernel Validation ==========

    #[test]
    fn test_agent_shader_is_valid() {
        let src = agent_shader();
        assert!(src.contains("atomicAdd"));
        validate_wgsl(&src).expect("agent kernel should be valid");
    }

    #[test]
    fn test_diffusion_shader_is_valid() {
        validate_wgsl(&diffusion_shader()).expect("diffusion kernel should be valid");
    }

    #[test]
    fn test_display_shader_is_valid() {
        validate_wgsl(&display_shader()).expect("display shader should be valid");
    }

    #[test]
    fn test_workgroup_sizes_match_constants() {
        assert!(agent_shader().contains(&format!("@workgroup_size({})", AGENT_WORKGROUP)));
        assert!(diffusion_shader()
            .contains(&format!("@workgroup_size({}, {})", FIELD_WORKGROUP, FIELD_WORKGROUP)));
    }

    // ========== Uniform Layout ==========

    #[test]
    fn test_uniform_sizes_are_16_byte_multiples() {
        assert_eq!(std::mem::size_of::<SimUniforms>(), 64);
        assert_eq!(std::mem::size_of::<DisplayUniforms>(), 32);
    }

    #[test]
    fn test_sim_uniforms_from_params() {
        let params = SimParams::default().with_density_speed(true);
        let u = SimUniforms::new(GridSize::new(30, 20), 512, &params, 1, true, 9);
        assert_eq!((u.width, u.height, u.agent_count), (30, 20, 512));
        assert_eq!(u.seed, tick_seed(9, 1));
        assert_eq!(u.has_other, 1);
        assert_eq!(u.density_speed, 1);
        assert_eq!(u.coupling, params.coupling.as_u32());
    }
}
