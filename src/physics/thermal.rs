use bevy::color::LinearRgba;

/// Temperature mapped to the top of the color ramp.
pub const BLACKBODY_MAX_K: f32 = 10_000.0;

const DEEP_RED: [f32; 3] = [0.5, 0.02, 0.0];
const ORANGE: [f32; 3] = [1.0, 0.45, 0.05];
const YELLOW_WHITE: [f32; 3] = [1.0, 0.9, 0.6];
const WHITE: [f32; 3] = [1.0, 1.0, 1.0];

const FIRST_BREAK: f32 = 0.33;
const SECOND_BREAK: f32 = 0.66;

/// Approximate visible color of a body at `temperature_k`.
///
/// Piecewise-linear across four anchors keyed to `T / 10000`. Adjacent segments
/// share their anchor, so the ramp is continuous at both breakpoints.
pub fn blackbody_color(temperature_k: f32) -> LinearRgba {
    let t = (temperature_k / BLACKBODY_MAX_K).clamp(0.0, 1.0);
    let t = if t.is_nan() { 0.0 } else { t };

    let rgb = if t < FIRST_BREAK {
        lerp3(DEEP_RED, ORANGE, t / FIRST_BREAK)
    } else if t < SECOND_BREAK {
        lerp3(ORANGE, YELLOW_WHITE, (t - FIRST_BREAK) / (SECOND_BREAK - FIRST_BREAK))
    } else {
        lerp3(YELLOW_WHITE, WHITE, (t - SECOND_BREAK) / (1.0 - SECOND_BREAK))
    };

    LinearRgba::new(rgb[0], rgb[1], rgb[2], 1.0)
}

fn lerp3(a: [f32; 3], b: [f32; 3], t: f32) -> [f32; 3] {
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
    ]
}

pub fn with_alpha(color: LinearRgba, alpha: f32) -> LinearRgba {
    LinearRgba::new(color.red, color.green, color.blue, alpha)
}

pub fn mix(a: LinearRgba, b: LinearRgba, t: f32) -> LinearRgba {
    let t = t.clamp(0.0, 1.0);
    LinearRgba::new(
        a.red + (b.red - a.red) * t,
        a.green + (b.green - a.green) * t,
        a.blue + (b.blue - a.blue) * t,
        a.alpha + (b.alpha - a.alpha) * t,
    )
}
