use serde::{Deserialize, Serialize};

/// Remaps the shared playback progress onto a layer that starts at `delay`.
///
/// Always in [0, 1]. A delay of 1 (or more) never starts and yields 0 rather
/// than dividing by zero.
#[inline]
pub fn local_progress(global: f32, delay: f32) -> f32 {
    if delay >= 1.0 {
        return 0.0;
    }
    let local = (global - delay) / (1.0 - delay);
    if local.is_nan() { 0.0 } else { local.clamp(0.0, 1.0) }
}

#[inline]
pub fn is_visible(global: f32, delay: f32) -> bool {
    global >= delay
}

/// Power-law ease, `local^exponent`. Exponents below 1 decelerate.
#[inline]
pub fn eased_progress(local: f32, exponent: f32) -> f32 {
    let local = if local.is_nan() { 0.0 } else { local.clamp(0.0, 1.0) };
    local.powf(exponent)
}

#[inline]
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    if edge1 <= edge0 {
        return if x < edge0 { 0.0 } else { 1.0 };
    }
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Active window of a layer on the global progress axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    pub start: f32,
    pub end: f32,
}

impl Default for Timeline {
    fn default() -> Self {
        Self { start: 0.0, end: 1.0 }
    }
}

impl Timeline {
    pub fn starting_at(delay: f32) -> Self {
        Self { start: delay, end: 1.0 }
    }

    pub fn window(start: f32, end: f32) -> Self {
        Self { start, end }
    }

    /// Local progress inside the window. Equal to `local_progress` when the
    /// window runs to the end of playback.
    #[inline]
    pub fn local(&self, global: f32) -> f32 {
        if self.end >= 1.0 {
            return local_progress(global, self.start);
        }
        let span = self.end - self.start;
        if span <= 0.0 {
            return 0.0;
        }
        let local = (global - self.start) / span;
        if local.is_nan() { 0.0 } else { local.clamp(0.0, 1.0) }
    }

    /// Strictly after the start; a window that closes before 1 is also
    /// exclusive at its end.
    #[inline]
    pub fn is_active(&self, global: f32) -> bool {
        if !is_visible(global, self.start) || self.local(global) <= 0.0 {
            return false;
        }
        self.end >= 1.0 || global < self.end
    }
}
