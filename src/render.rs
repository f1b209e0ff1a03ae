//! Colour mapping of published fields.
//!
//! The display shader and the CPU frame renderer share one mapping:
//! intensity `v` is normalised with `1 - exp(-v / scale)`, then
//!
//! - `colouring = false`: greyscale of the summed active species,
//! - `colouring = true`: species 0 on a warm ramp, species 1 on a cool ramp,
//!   blended additively.

use image::RgbaImage;
use rayon::prelude::*;

use crate::grid::GridSize;

/// Intensity that maps to ~63% brightness.
pub const DEFAULT_INTENSITY_SCALE: f32 = 4.0;

const WARM: [f32; 3] = [1.0, 0.55, 0.15];
const COOL: [f32; 3] = [0.15, 0.6, 1.0];

/// Display options read by the colour mapping.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColourMap {
    pub colouring: bool,
    pub scale: f32,
}

impl Default for ColourMap {
    fn default() -> Self {
        Self {
            colouring: false,
            scale: DEFAULT_INTENSITY_SCALE,
        }
    }
}

impl ColourMap {
    pub fn new(colouring: bool) -> Self {
        Self { colouring, ..Self::default() }
    }

    /// Map an intensity into `[0, 1)`.
    #[inline]
    pub fn normalise(&self, v: f32) -> f32 {
        if v.is_finite() && v > 0.0 {
            1.0 - (-v / self.scale.max(f32::EPSILON)).exp()
        } else {
            0.0
        }
    }

    /// RGB in `[0, 1]` for one cell. `second` is `None` when only one species
    /// is shown.
    pub fn rgb(&self, first: f32, second: Option<f32>) -> [f32; 3] {
        if self.colouring {
            let a = self.normalise(first);
            let b = second.map_or(0.0, |v| self.normalise(v));
            std::array::from_fn(|c| (WARM[c] * a + COOL[c] * b).min(1.0))
        } else {
            let t = self.normalise(first + second.unwrap_or(0.0));
            [t; 3]
        }
    }

    /// RGBA8 pixel for one cell.
    pub fn pixel(&self, first: f32, second: Option<f32>) -> [u8; 4] {
        let [r, g, b] = self.rgb(first, second);
        let q = |c: f32| (c * 255.0).round() as u8;
        [q(r), q(g), q(b), 255]
    }
}

/// Render the published fields into an image, one pixel per cell.
///
/// # Panics
///
/// Panics if `fields` is empty or a field does not match `grid`.
pub fn render_frame(grid: GridSize, fields: &[&[f32]], map: &ColourMap) -> RgbaImage {
    let first = fields[0];
    let second = fields.get(1).copied();
    assert_eq!(first.len(), grid.cells());

    let mut img = RgbaImage::new(grid.width, grid.height);
    let buf: &mut [u8] = &mut img;
    buf.par_chunks_mut(4).enumerate().for_each(|(i, px)| {
        px.copy_from_slice(&map.pixel(first[i], second.map(|s| s[i])));
    });
    img
}

/// WGSL version of [`ColourMap::rgb`].
pub const COLOUR_WGSL: &str = r#"
const WARM: vec3<f32> = vec3<f32>(1.0, 0.55, 0.15);
const COOL: vec3<f32> = vec3<f32>(0.15, 0.6, 1.0);

fn normalise(v: f32, scale: f32) -> f32 {
    if !(v > 0.0) || !(v <= 3.4e38) {
        return 0.0;
    }
    return 1.0 - exp(-v / max(scale, 1.0e-7));
}

fn colour_map(first: f32, second: f32, has_second: bool, colouring: bool, scale: f32) -> vec3<f32> {
    if colouring {
        var b = 0.0;
        if has_second {
            b = normalise(second, scale);
        }
        return min(WARM * normalise(first, scale) + COOL * b, vec3<f32>(1.0));
    }
    var total = first;
    if has_second {
        total = total + second;
    }
    return vec3<f32>(normalise(total, scale));
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalise_range() {
        let map = ColourMap::default();
        assert_eq!(map.normalise(0.0), 0.0);
        assert_eq!(map.normalise(-3.0), 0.0);
        assert_eq!(map.normalise(f32::NAN), 0.0);
        let t = map.normalise(DEFAULT_INTENSITY_SCALE);
        assert!((t - (1.0 - (-1.0f32).exp())).abs() < 1e-6);
        assert!(map.normalise(1e9) <= 1.0);
    }

    #[test]
    fn test_greyscale_sums_species() {
        let map = ColourMap::new(false);
        let [r, g, b] = map.rgb(2.0, Some(2.0));
        assert_eq!(r, g);
        assert_eq!(g, b);
        assert!((r - map.normalise(4.0)).abs() < 1e-6);
    }

    #[test]
    fn test_colouring_separates_species() {
        let map = ColourMap::new(true);
        let warm = map.rgb(10.0, Some(0.0));
        let cool = map.rgb(0.0, Some(10.0));
        assert!(warm[0] > warm[2]);
        assert!(cool[2] > cool[0]);
    }

    #[test]
    fn test_render_frame_dimensions_and_pixels() {
        let grid = GridSize::new(3, 2);
        let field = [0.0, 100.0, 0.0, 0.0, 0.0, 0.0];
        let img = render_frame(grid, &[&field[..]], &ColourMap::default());
        assert_eq!(img.dimensions(), (3, 2));
        assert_eq!(img.get_pixel(0, 0).0, [0, 0, 0, 255]);
        assert_eq!(img.get_pixel(1, 0).0, [255, 255, 255, 255]);
    }
}
