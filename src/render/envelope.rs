//! Per-frame amplitude summary and the smoothed, soft-compressed envelope drawn by the waveform.

use crate::foundation::math::moving_average_edge;

/// Fixed loudness reference; raw RMS is normalized against this, not against the window peak.
pub const REFERENCE_LEVEL: f64 = 0.5;

/// Upper bound on envelope sample points per band.
pub const MAX_POINTS: usize = 500;

/// Minimum half-width of the RMS window, in audio samples.
const MIN_RMS_HALF_WIDTH: usize = 10;

const PASS1_MAX_WIDTH: usize = 25;
const PASS2_MAX_WIDTH: usize = 15;

/// Values at or below this are treated as silence.
pub const SILENCE_EPSILON: f32 = 1e-6;

/// Peak and RMS of one audio window.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AmplitudeSummary {
    pub peak: f64,
    pub rms: f64,
}

impl AmplitudeSummary {
    pub fn of(samples: &[f32]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        let mut peak = 0.0f64;
        let mut sq = 0.0f64;
        for &s in samples {
            let v = if s.is_finite() { f64::from(s) } else { 0.0 };
            peak = peak.max(v.abs());
            sq += v * v;
        }
        Self {
            peak,
            rms: (sq / samples.len() as f64).sqrt(),
        }
    }

    /// `A = (0.8 * peak + 0.2 * rms) * sensitivity * amplitude_multiplier`.
    pub fn amplitude(self, sensitivity: f64, amplitude_multiplier: f64) -> f64 {
        (0.8 * self.peak + 0.2 * self.rms) * sensitivity * amplitude_multiplier
    }
}

/// Number of envelope points for an axis of `axis_len_px` supersampled pixels.
pub fn point_count(axis_len_px: u32) -> usize {
    (axis_len_px as usize).clamp(2, MAX_POINTS)
}

/// Windowed RMS at `points` evenly spaced offsets of `samples`.
pub fn windowed_rms(samples: &[f32], points: usize) -> Vec<f32> {
    let n = samples.len();
    if n == 0 || points == 0 {
        return vec![0.0; points];
    }
    let half = MIN_RMS_HALF_WIDTH.max(n / (2 * points));

    let mut prefix = Vec::with_capacity(n + 1);
    prefix.push(0.0f64);
    let mut acc = 0.0f64;
    for &s in samples {
        let v = if s.is_finite() { f64::from(s) } else { 0.0 };
        acc += v * v;
        prefix.push(acc);
    }

    (0..points)
        .map(|k| {
            let j = k * n / points;
            let lo = j.saturating_sub(half);
            let hi = (j + half + 1).min(n);
            let mean = (prefix[hi] - prefix[lo]) / (hi - lo) as f64;
            mean.max(0.0).sqrt() as f32
        })
        .collect()
}

/// Two moving-average passes (widths `min(25, S/5)` then `min(15, S/10)`) with edge padding.
pub fn smooth(raw: &[f32]) -> Vec<f32> {
    let s = raw.len();
    let pass1 = moving_average_edge(raw, PASS1_MAX_WIDTH.min(s / 5));
    moving_average_edge(&pass1, PASS2_MAX_WIDTH.min(s / 10))
}

/// Map a raw RMS level to a drawable fraction in `[0, 1]`.
///
/// Linear up to the reference level, then logarithmically compressed so loud passages approach
/// but never flatten against the band edge.
pub fn compress(raw: f64, gain: f64) -> f64 {
    let n = (raw / REFERENCE_LEVEL).clamp(0.0, 2.0);
    let s = n * gain;
    let c = if s <= 1.0 {
        s
    } else {
        1.0 + (1.0 + (s - 1.0)).ln() / 7f64.ln() * 0.65
    };
    if c.is_finite() { c.clamp(0.0, 1.0) } else { 0.0 }
}

/// Smoothed envelope in `[0, 1]` for one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Envelope {
    values: Vec<f32>,
}

impl Envelope {
    /// Sample `points` windowed RMS values, smooth them, then compress with `gain`.
    ///
    /// `gain` is `amplitude_multiplier`; `sensitivity` only scales the frame amplitude `A`.
    pub fn build(samples: &[f32], points: usize, gain: f64) -> Self {
        let raw = windowed_rms(samples, points);
        let values = smooth(&raw)
            .into_iter()
            .map(|r| compress(f64::from(r), gain) as f32)
            .collect();
        Self { values }
    }

    pub fn from_values(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn max(&self) -> f32 {
        self.values.iter().copied().fold(0.0, f32::max)
    }

    pub fn min(&self) -> f32 {
        self.values.iter().copied().reduce(f32::min).unwrap_or(0.0)
    }

    /// `(max + min) / 2`.
    pub fn midpoint(&self) -> f32 {
        (self.max() + self.min()) / 2.0
    }

    pub fn is_silent(&self) -> bool {
        self.max() <= SILENCE_EPSILON
    }

    /// Raise every value to at least `floor`.
    pub fn with_floor(mut self, floor: f32) -> Self {
        for v in &mut self.values {
            *v = v.max(floor);
        }
        self
    }

    /// Linearly resample to `n` values (one per pixel column or row).
    pub fn interpolate(&self, n: usize) -> Vec<f32> {
        let m = self.values.len();
        match (m, n) {
            (_, 0) => Vec::new(),
            (0, _) => vec![0.0; n],
            (1, _) => vec![self.values[0]; n],
            _ if n == 1 => vec![self.values[0]],
            _ => (0..n)
                .map(|i| {
                    let t = i as f64 * (m - 1) as f64 / (n - 1) as f64;
                    let lo = t.floor() as usize;
                    let hi = (lo + 1).min(m - 1);
                    let f = (t - lo as f64) as f32;
                    self.values[lo] + (self.values[hi] - self.values[lo]) * f
                })
                .collect(),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/envelope.rs"]
mod tests;
