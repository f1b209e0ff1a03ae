//! The runtime Parameter Set.
//!
//! A small bag of named, bounded scalars read by both update stages. The host
//! may change them between ticks; during a tick the simulation works from its
//! own sanitized copy, so a value can never change mid-tick.
//!
//! # Example
//!
//! ```
//! use physarum::SimParams;
//!
//! let params = SimParams::default()
//!     .with_max_speed(4.0)
//!     .with_sensor_angle(0.6)
//!     .with_decay_weight(1.7); // clamped to 1.0
//!
//! assert_eq!(params.decay_weight, 1.0);
//! assert!(params.validate().is_ok());
//! ```

use std::f32::consts::PI;

use log::warn;

use crate::error::ParamError;
use crate::policy::Coupling;

/// Declared bounds of a tunable parameter, as exposed to a parameter panel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParamBound {
    pub name: &'static str,
    pub min: f32,
    pub max: f32,
    /// Integer-valued (sensor distance/size) or flag-valued parameter.
    pub integer: bool,
}

impl ParamBound {
    const fn float(name: &'static str, min: f32, max: f32) -> Self {
        Self { name, min, max, integer: false }
    }

    const fn int(name: &'static str, min: f32, max: f32) -> Self {
        Self { name, min, max, integer: true }
    }

    /// Whether `value` is finite and lies within `[min, max]`.
    pub fn contains(&self, value: f32) -> bool {
        value.is_finite() && value >= self.min && value <= self.max
    }

    fn check(&self, value: f32) -> Result<(), ParamError> {
        if !value.is_finite() {
            return Err(ParamError::NotFinite { name: self.name });
        }
        if !self.contains(value) {
            return Err(ParamError::OutOfBounds {
                name: self.name,
                value,
                min: self.min,
                max: self.max,
            });
        }
        if self.integer && value.fract() != 0.0 {
            return Err(ParamError::NotInteger { name: self.name, value });
        }
        Ok(())
    }

    /// Integer-valued bounds round to the nearest whole number.
    fn clamp(&self, value: f32, fallback: f32) -> f32 {
        if value.is_finite() {
            let v = if self.integer { value.round() } else { value };
            v.clamp(self.min, self.max)
        } else {
            fallback
        }
    }
}

pub const MAX_SPEED: ParamBound = ParamBound::float("maxSpeed", 0.0, 20.0);
pub const TURNING_SPEED: ParamBound = ParamBound::float("turningSpeed", 0.0, PI);
pub const SENSOR_ANGLE: ParamBound = ParamBound::float("sensorAngle", 0.0, PI);
pub const SENSOR_DISTANCE: ParamBound = ParamBound::int("sensorDistance", 1.0, 25.0);
pub const SENSOR_SIZE: ParamBound = ParamBound::int("sensorSize", 0.0, 5.0);
pub const DENSITY_SPEED: ParamBound = ParamBound::int("densitySpeed", 0.0, 1.0);
pub const MULTI_SPECIES: ParamBound = ParamBound::int("multiSpecies", 0.0, 1.0);
pub const BASE_MULTI: ParamBound = ParamBound::float("baseMulti", 0.001, 0.1);
pub const DENSITY_MULTI: ParamBound = ParamBound::float("densityMulti", 0.0001, 0.05);
pub const DECAY_WEIGHT: ParamBound = ParamBound::float("decayWeight", 0.0, 1.0);
pub const DIFFUSION_WEIGHT: ParamBound = ParamBound::float("diffusionWeight", 0.0, 1.0);
pub const COLOURING: ParamBound = ParamBound::int("colouring", 0.0, 1.0);

/// Every tunable parameter in panel order.
pub const PARAM_BOUNDS: [ParamBound; 12] = [
    MAX_SPEED,
    TURNING_SPEED,
    SENSOR_ANGLE,
    SENSOR_DISTANCE,
    SENSOR_SIZE,
    DENSITY_SPEED,
    MULTI_SPECIES,
    BASE_MULTI,
    DENSITY_MULTI,
    DECAY_WEIGHT,
    DIFFUSION_WEIGHT,
    COLOURING,
];

/// Tunable coefficients shared by every agent and cell within a tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimParams {
    /// Step length per tick, in cells.
    pub max_speed: f32,
    /// Heading change per tick when turning, in radians.
    pub turning_speed: f32,
    /// Angle between the centre sensor and each side sensor, in radians.
    pub sensor_angle: f32,
    /// Distance from the agent to each sensor point, in cells.
    pub sensor_distance: f32,
    /// Box-filter radius of each sensor (0 = single cell).
    pub sensor_size: u32,
    /// Scale step length by locally sensed density.
    pub density_speed: bool,
    /// Run the second species and couple the two fields.
    pub multi_species: bool,
    /// Constant part of the cross-species coupling weight.
    pub base_multi: f32,
    /// Density-dependent part of the coupling weight and of the speed modifier.
    pub density_multi: f32,
    /// Fraction of intensity removed each tick (0 = none, 1 = instant erasure).
    pub decay_weight: f32,
    /// Blend toward the 3×3 neighbourhood mean (0 = none, 1 = full replacement).
    pub diffusion_weight: f32,
    /// Display-only: colour ramps instead of greyscale.
    pub colouring: bool,
    /// How the two species' fields combine when sensing.
    pub coupling: Coupling,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            max_speed: 2.7,
            turning_speed: 1.0,
            sensor_angle: 0.3,
            sensor_distance: 10.0,
            sensor_size: 1,
            density_speed: false,
            multi_species: false,
            base_multi: 0.05,
            density_multi: 0.01,
            decay_weight: 0.5,
            diffusion_weight: 0.1,
            colouring: false,
            coupling: Coupling::default(),
        }
    }
}

impl SimParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the step length (clamped to `[0, 20]`).
    pub fn with_max_speed(mut self, v: f32) -> Self {
        self.max_speed = MAX_SPEED.clamp(v, self.max_speed);
        self
    }

    /// Set the turning step in radians (clamped to `[0, π]`).
    pub fn with_turning_speed(mut self, v: f32) -> Self {
        self.turning_speed = TURNING_SPEED.clamp(v, self.turning_speed);
        self
    }

    /// Set the side-sensor angle in radians (clamped to `[0, π]`).
    pub fn with_sensor_angle(mut self, v: f32) -> Self {
        self.sensor_angle = SENSOR_ANGLE.clamp(v, self.sensor_angle);
        self
    }

    /// Set the sensor distance (rounded, clamped to `[1, 25]`).
    pub fn with_sensor_distance(mut self, v: f32) -> Self {
        self.sensor_distance = SENSOR_DISTANCE.clamp(v, self.sensor_distance);
        self
    }

    /// Set the sensor box-filter radius (clamped to `[0, 5]`).
    pub fn with_sensor_size(mut self, v: u32) -> Self {
        self.sensor_size = v.min(SENSOR_SIZE.max as u32);
        self
    }

    pub fn with_density_speed(mut self, on: bool) -> Self {
        self.density_speed = on;
        self
    }

    pub fn with_multi_species(mut self, on: bool) -> Self {
        self.multi_species = on;
        self
    }

    /// Set the constant coupling weight (clamped to `[0.001, 0.1]`).
    pub fn with_base_multi(mut self, v: f32) -> Self {
        self.base_multi = BASE_MULTI.clamp(v, self.base_multi);
        self
    }

    /// Set the density coupling weight (clamped to `[0.0001, 0.05]`).
    pub fn with_density_multi(mut self, v: f32) -> Self {
        self.density_multi = DENSITY_MULTI.clamp(v, self.density_multi);
        self
    }

    /// Set the decay weight (clamped to `[0, 1]`).
    ///
    /// Applied each tick: `field *= 1 - decay_weight`.
    pub fn with_decay_weight(mut self, v: f32) -> Self {
        self.decay_weight = DECAY_WEIGHT.clamp(v, self.decay_weight);
        self
    }

    /// Set the diffusion weight (clamped to `[0, 1]`).
    pub fn with_diffusion_weight(mut self, v: f32) -> Self {
        self.diffusion_weight = DIFFUSION_WEIGHT.clamp(v, self.diffusion_weight);
        self
    }

    pub fn with_colouring(mut self, on: bool) -> Self {
        self.colouring = on;
        self
    }

    pub fn with_coupling(mut self, coupling: Coupling) -> Self {
        self.coupling = coupling;
        self
    }

    /// Strict check against the declared bounds.
    pub fn validate(&self) -> Result<(), ParamError> {
        MAX_SPEED.check(self.max_speed)?;
        TURNING_SPEED.check(self.turning_speed)?;
        SENSOR_ANGLE.check(self.sensor_angle)?;
        SENSOR_DISTANCE.check(self.sensor_distance)?;
        SENSOR_SIZE.check(self.sensor_size as f32)?;
        BASE_MULTI.check(self.base_multi)?;
        DENSITY_MULTI.check(self.density_multi)?;
        DECAY_WEIGHT.check(self.decay_weight)?;
        DIFFUSION_WEIGHT.check(self.diffusion_weight)?;
        Ok(())
    }

    /// Lenient boundary check used before values reach a kernel: logs the
    /// first violation and returns the clamped copy.
    pub fn sanitized(&self) -> Self {
        if let Err(e) = self.validate() {
            warn!("{}; clamping", e);
        }
        self.clamped()
    }

    /// Copy with every value forced into bounds. Non-finite values fall back
    /// to the defaults.
    pub fn clamped(&self) -> Self {
        let d = Self::default();
        Self {
            max_speed: MAX_SPEED.clamp(self.max_speed, d.max_speed),
            turning_speed: TURNING_SPEED.clamp(self.turning_speed, d.turning_speed),
            sensor_angle: SENSOR_ANGLE.clamp(self.sensor_angle, d.sensor_angle),
            sensor_distance: SENSOR_DISTANCE.clamp(self.sensor_distance, d.sensor_distance),
            sensor_size: self.sensor_size.min(SENSOR_SIZE.max as u32),
            base_multi: BASE_MULTI.clamp(self.base_multi, d.base_multi),
            density_multi: DENSITY_MULTI.clamp(self.density_multi, d.density_multi),
            decay_weight: DECAY_WEIGHT.clamp(self.decay_weight, d.decay_weight),
            diffusion_weight: DIFFUSION_WEIGHT.clamp(self.diffusion_weight, d.diffusion_weight),
            ..*self
        }
    }
}
