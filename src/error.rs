//! Error types for the simulation.
//!
//! Configuration and parameter errors are raised at the boundary, before a
//! tick starts; kernels never see out-of-range input. Numerical degeneracy is
//! recovered inside the kernels and never surfaces here. Resource exhaustion
//! is fatal at startup.

use std::fmt;

/// A runtime parameter outside its declared bounds.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamError {
    /// Value lies outside `[min, max]`.
    OutOfBounds {
        name: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },
    /// Value is NaN or infinite.
    NotFinite { name: &'static str },
    /// Fractional value for an integer-valued parameter.
    NotInteger { name: &'static str, value: f32 },
}

impl fmt::Display for ParamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamError::OutOfBounds { name, value, min, max } => {
                write!(f, "Parameter '{}' = {} is outside [{}, {}]", name, value, min, max)
            }
            ParamError::NotFinite { name } => write!(f, "Parameter '{}' is not a finite number", name),
            ParamError::NotInteger { name, value } => {
                write!(f, "Parameter '{}' = {} must be a whole number", name, value)
            }
        }
    }
}

impl std::error::Error for ParamError {}

/// Invalid startup configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Grid width or height is zero.
    EmptyGrid,
    /// No agents requested.
    NoAgents,
    /// Agent count is not a multiple of the compute work-group size.
    AgentCountNotAligned { count: u32, workgroup: u32 },
    /// Only one or two species are supported.
    SpeciesCount(usize),
    /// Grid or population cannot be addressed with 32-bit indices.
    TooLarge { what: &'static str, count: u64 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::EmptyGrid => write!(f, "Grid width and height must be non-zero"),
            ConfigError::NoAgents => write!(f, "Agent count must be non-zero"),
            ConfigError::AgentCountNotAligned { count, workgroup } => write!(
                f,
                "Agent count {} must be a multiple of the work-group size {}",
                count, workgroup
            ),
            ConfigError::SpeciesCount(n) => write!(f, "Species count must be 1 or 2, got {}", n),
            ConfigError::TooLarge { what, count } => {
                write!(f, "{} count {} exceeds the addressable range", what, count)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Errors that can occur during GPU initialization.
#[derive(Debug)]
pub enum GpuError {
    /// Failed to create a surface for rendering.
    SurfaceCreation(wgpu::CreateSurfaceError),
    /// No compatible GPU adapter found.
    NoAdapter,
    /// The surface supports no texture format.
    NoSurfaceFormat,
    /// Failed to create GPU device.
    DeviceCreation(wgpu::RequestDeviceError),
    /// Failed to map buffer for reading.
    BufferMapping(String),
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuError::SurfaceCreation(e) => write!(f, "Failed to create GPU surface: {}", e),
            GpuError::NoAdapter => write!(f, "No compatible GPU adapter found. Ensure your system has a GPU with WebGPU/Vulkan/Metal/DX12 support, or run with --cpu."),
            GpuError::NoSurfaceFormat => write!(f, "GPU surface reports no supported formats"),
            GpuError::DeviceCreation(e) => write!(f, "Failed to create GPU device: {}", e),
            GpuError::BufferMapping(msg) => write!(f, "Failed to map GPU buffer: {}", msg),
        }
    }
}

impl std::error::Error for GpuError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GpuError::SurfaceCreation(e) => Some(e),
            GpuError::DeviceCreation(e) => Some(e),
            _ => None,
        }
    }
}

impl From<wgpu::CreateSurfaceError> for GpuError {
    fn from(e: wgpu::CreateSurfaceError) -> Self {
        GpuError::SurfaceCreation(e)
    }
}

impl From<wgpu::RequestDeviceError> for GpuError {
    fn from(e: wgpu::RequestDeviceError) -> Self {
        GpuError::DeviceCreation(e)
    }
}

/// Errors that can occur while writing frames to disk.
#[derive(Debug)]
pub enum ExportError {
    /// Failed to encode the image.
    Image(image::ImageError),
    /// Failed to create the output directory or file.
    Io(std::io::Error),
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::Image(e) => write!(f, "Failed to encode frame: {}", e),
            ExportError::Io(e) => write!(f, "Failed to write frame: {}", e),
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExportError::Image(e) => Some(e),
            ExportError::Io(e) => Some(e),
        }
    }
}

impl From<image::ImageError> for ExportError {
    fn from(e: image::ImageError) -> Self {
        ExportError::Image(e)
    }
}

impl From<std::io::Error> for ExportError {
    fn from(e: std::io::Error) -> Self {
        ExportError::Io(e)
    }
}

/// Errors that can occur when starting or running a simulation.
#[derive(Debug)]
pub enum SimulationError {
    /// Startup configuration rejected.
    Config(ConfigError),
    /// A store could not be allocated.
    Allocation { what: &'static str, bytes: usize },
    /// Failed to create event loop.
    EventLoop(winit::error::EventLoopError),
    /// Failed to create window.
    Window(winit::error::OsError),
    /// GPU initialization failed.
    Gpu(GpuError),
    /// Frame export failed.
    Export(ExportError),
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationError::Config(e) => write!(f, "Invalid configuration: {}", e),
            SimulationError::Allocation { what, bytes } => {
                write!(f, "Failed to allocate {} bytes for {}", bytes, what)
            }
            SimulationError::EventLoop(e) => write!(f, "Failed to create event loop: {}", e),
            SimulationError::Window(e) => write!(f, "Failed to create window: {}", e),
            SimulationError::Gpu(e) => write!(f, "GPU error: {}", e),
            SimulationError::Export(e) => write!(f, "Export error: {}", e),
        }
    }
}

impl std::error::Error for SimulationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimulationError::Config(e) => Some(e),
            SimulationError::Allocation { .. } => None,
            SimulationError::EventLoop(e) => Some(e),
            SimulationError::Window(e) => Some(e),
            SimulationError::Gpu(e) => Some(e),
            SimulationError::Export(e) => Some(e),
        }
    }
}

impl From<ConfigError> for SimulationError {
    fn from(e: ConfigError) -> Self {
        SimulationError::Config(e)
    }
}

impl From<winit::error::EventLoopError> for SimulationError {
    fn from(e: winit::error::EventLoopError) -> Self {
        SimulationError::EventLoop(e)
    }
}

impl From<winit::error::OsError> for SimulationError {
    fn from(e: winit::error::OsError) -> Self {
        SimulationError::Window(e)
    }
}

impl From<GpuError> for SimulationError {
    fn from(e: GpuError) -> Self {
        SimulationError::Gpu(e)
    }
}

impl From<ExportError> for SimulationError {
    fn from(e: ExportError) -> Self {
        SimulationError::Export(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_param_error_display() {
        let err = ParamError::OutOfBounds { name: "maxSpeed", value: 25.0, min: 0.0, max: 20.0 };
        assert_eq!(err.to_string(), "Parameter 'maxSpeed' = 25 is outside [0, 20]");
    }

    #[test]
    fn test_config_error_wraps_into_simulation_error() {
        let err: SimulationError = ConfigError::SpeciesCount(3).into();
        assert!(err.to_string().contains("1 or 2"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_export_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: ExportError = io.into();
        assert!(matches!(err, ExportError::Io(_)));
        assert!(err.source().is_some());
    }
}
