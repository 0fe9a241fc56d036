use eframe::egui::Color32;
use palette::{LinSrgb, Mix, Srgb};

// ---------------------------------------------------------------------------
// Sequential colour scale for the correlation heatmap
// ---------------------------------------------------------------------------

/// Dark-to-light ramp (purple → red → cream), sampled at even stops.
const RAMP: [(u8, u8, u8); 5] = [
    (0x03, 0x05, 0x1a),
    (0x4c, 0x1d, 0x4b),
    (0xa1, 0x1a, 0x5b),
    (0xf0, 0x60, 0x43),
    (0xfa, 0xeb, 0xdd),
];

/// Colour for undefined coefficients.
pub const UNDEFINED: Color32 = Color32::GRAY;

/// Maps a value range onto [`RAMP`], interpolating in linear RGB.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorScale {
    pub min: f64,
    pub max: f64,
}

impl ColorScale {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Position of `value` in the range, clamped to `0..=1`.
    pub fn normalize(&self, value: f64) -> f32 {
        let span = self.max - self.min;
        if span.abs() < f64::EPSILON {
            return 1.0;
        }
        ((value - self.min) / span).clamp(0.0, 1.0) as f32
    }

    pub fn color_for(&self, value: Option<f64>) -> Color32 {
        match value {
            Some(v) if v.is_finite() => sample(self.normalize(v)),
            _ => UNDEFINED,
        }
    }
}

/// Sample the ramp at `t` in `0..=1`.
pub fn sample(t: f32) -> Color32 {
    let t = t.clamp(0.0, 1.0);
    let segments = (RAMP.len() - 1) as f32;
    let pos = t * segments;
    let lo = (pos.floor() as usize).min(RAMP.len() - 2);
    let frac = pos - lo as f32;

    let to_linear = |(r, g, b): (u8, u8, u8)| -> LinSrgb {
        Srgb::new(r, g, b).into_format::<f32>().into_linear()
    };
    let mixed = to_linear(RAMP[lo]).mix(to_linear(RAMP[lo + 1]), frac);
    let rgb: Srgb<f32> = Srgb::from_linear(mixed);
    let rgb: Srgb<u8> = rgb.into_format();
    Color32::from_rgb(rgb.red, rgb.green, rgb.blue)
}
