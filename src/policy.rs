//! Sensing policies shared by the CPU and GPU kernels.
//!
//! Each policy has a Rust implementation and a WGSL twin so both substrates
//! compute the same thing. Change one, change the other; the naga tests in
//! `gpu::shaders` only check that the WGSL compiles.

/// How a species combines its own field with the other species' field when
/// sensing.
///
/// The cross weight grows with the other species' local intensity:
/// `w = base_multi + density_multi * other`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Coupling {
    /// Other species' trails repel: `own - w * other`.
    #[default]
    Rival,
    /// Other species' trails attract: `own + w * other`.
    Mutual,
    /// Only the own field is sensed, even with both species running.
    Ignore,
}

impl Coupling {
    /// All variants, for selection widgets.
    pub const ALL: [Coupling; 3] = [Coupling::Rival, Coupling::Mutual, Coupling::Ignore];

    /// Blend one sensor reading.
    #[inline]
    pub fn blend(self, own: f32, other: f32, base_multi: f32, density_multi: f32) -> f32 {
        let w = base_multi + density_multi * other;
        match self {
            Coupling::Rival => own - w * other,
            Coupling::Mutual => own + w * other,
            Coupling::Ignore => own,
        }
    }

    /// Discriminant uploaded to the GPU.
    pub fn as_u32(self) -> u32 {
        match self {
            Coupling::Rival => 0,
            Coupling::Mutual => 1,
            Coupling::Ignore => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Coupling::Rival => "rival",
            Coupling::Mutual => "mutual",
            Coupling::Ignore => "ignore",
        }
    }
}

/// WGSL version of [`Coupling::blend`], switching on [`Coupling::as_u32`].
pub const COUPLING_WGSL: &str = r#"
fn couple(mode: u32, own: f32, other: f32, base_multi: f32, density_multi: f32) -> f32 {
    let w = base_multi + density_multi * other;
    if mode == 0u {
        return own - w * other;
    }
    if mode == 1u {
        return own + w * other;
    }
    return own;
}
"#;

/// Upper bound of the density speed-up factor.
pub const MAX_DENSITY_SPEEDUP: f32 = 3.0;

/// Step-length multiplier from the centre sensor reading.
///
/// Denser trails move agents faster, up to [`MAX_DENSITY_SPEEDUP`]. Negative
/// readings (possible under `Coupling::Rival`) count as empty.
#[inline]
pub fn density_speed_factor(center: f32, density_multi: f32) -> f32 {
    let density = if center.is_finite() { center.max(0.0) } else { 0.0 };
    (1.0 + density_multi * density).min(MAX_DENSITY_SPEEDUP)
}

/// WGSL version of [`density_speed_factor`].
pub const DENSITY_SPEED_WGSL: &str = r#"
const MAX_DENSITY_SPEEDUP: f32 = 3.0;

fn density_speed_factor(center: f32, density_multi: f32) -> f32 {
    var density = max(center, 0.0);
    // NaN fails every comparison
    if !(density <= 3.4e38) {
        density = 0.0;
    }
    return min(1.0 + density_multi * density, MAX_DENSITY_SPEEDUP);
}
"#;

/// Integer hash used for the left/right tie-break.
///
/// Same mixing constants as the `hash` in [`RANDOM_WGSL`].
#[inline]
pub fn hash(n: u32) -> u32 {
    let mut x = n;
    x ^= x >> 17;
    x = x.wrapping_mul(0xed5a_d4bb);
    x ^= x >> 11;
    x = x.wrapping_mul(0xac4c_1b51);
    x ^= x >> 15;
    x = x.wrapping_mul(0x3184_8bab);
    x ^= x >> 14;
    x
}

/// Per-tick seed for a species. Agents mix their own index into it.
#[inline]
pub fn tick_seed(tick: u64, species: usize) -> u32 {
    hash((tick as u32) ^ hash(species as u32 ^ 0x9e37_79b9))
}

/// Pseudo-random left/right choice for agent `index` in a tick.
/// Returns `true` for left.
#[inline]
pub fn tie_break_left(index: u32, seed: u32) -> bool {
    hash(index ^ seed) & 1 == 1
}

/// WGSL versions of [`hash`], [`tick_seed`] and [`tie_break_left`].
pub const RANDOM_WGSL: &str = r#"
fn hash(n: u32) -> u32 {
    var x = n;
    x = x ^ (x >> 17u);
    x = x * 0xed5ad4bbu;
    x = x ^ (x >> 11u);
    x = x * 0xac4c1b51u;
    x = x ^ (x >> 15u);
    x = x * 0x31848babu;
    x = x ^ (x >> 14u);
    return x;
}

fn tie_break_left(index: u32, seed: u32) -> bool {
    return (hash(index ^ seed) & 1u) == 1u;
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    // ========== Coupling Tests ==========

    #[test]
    fn test_rival_subtracts_weighted_other() {
        let v = Coupling::Rival.blend(10.0, 4.0, 0.05, 0.01);
        // w = 0.05 + 0.04 = 0.09
        assert!((v - (10.0 - 0.36)).abs() < 1e-5);
    }

    #[test]
    fn test_mutual_adds_weighted_other() {
        let v = Coupling::Mutual.blend(10.0, 4.0, 0.05, 0.01);
        assert!((v - 10.36).abs() < 1e-5);
    }

    #[test]
    fn test_ignore_returns_own() {
        assert_eq!(Coupling::Ignore.blend(3.0, 100.0, 0.1, 0.05), 3.0);
    }

    #[test]
    fn test_zero_other_leaves_own_unchanged() {
        for c in Coupling::ALL {
            assert_eq!(c.blend(7.5, 0.0, 0.1, 0.05), 7.5);
        }
    }

    #[test]
    fn test_discriminants_are_distinct() {
        let ids: Vec<u32> = Coupling::ALL.iter().map(|c| c.as_u32()).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    // ========== Density Speed Tests ==========

    #[test]
    fn test_density_speed_factor_grows_then_caps() {
        assert_eq!(density_speed_factor(0.0, 0.01), 1.0);
        assert!((density_speed_factor(50.0, 0.01) - 1.5).abs() < 1e-6);
        assert_eq!(density_speed_factor(1e6, 0.01), MAX_DENSITY_SPEEDUP);
    }

    #[test]
    fn test_density_speed_factor_ignores_negative_and_nan() {
        assert_eq!(density_speed_factor(-20.0, 0.05), 1.0);
        assert_eq!(density_speed_factor(f32::NAN, 0.05), 1.0);
    }

    // ========== Hash Tests ==========

    #[test]
    fn test_hash_is_deterministic_and_mixing() {
        assert_eq!(hash(12345), hash(12345));
        assert_ne!(hash(1), hash(2));
        assert_eq!(hash(0), 0);
    }

    #[test]
    fn test_tie_break_is_roughly_balanced() {
        let seed = tick_seed(7, 0);
        let lefts = (0..10_000u32).filter(|&i| tie_break_left(i, seed)).count();
        assert!(lefts > 4_000 && lefts < 6_000, "lefts = {}", lefts);
    }

    #[test]
    fn test_tick_seed_differs_per_species_and_tick() {
        assert_ne!(tick_seed(1, 0), tick_seed(1, 1));
        assert_ne!(tick_seed(1, 0), tick_seed(2, 0));
    }
}
