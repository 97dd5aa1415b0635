//! Parameter range and scaling.
//!
//! Provides normalized (0.0-1.0) ↔ real value conversion with different scaling algorithms.
//! Both directions are pure and monotonic; continuous scales are exact inverses of each other
//! up to floating-point rounding, stepped scales snap to their steps.
//!
//! # Example
//!
//! ```
//! use duetto_core::{ParameterRange, ParameterScale};
//!
//! // Filter cutoff: 20Hz to 20kHz, logarithmic scaling
//! let cutoff = ParameterRange::new(20.0, 20000.0, 1000.0, ParameterScale::Logarithmic);
//!
//! let freq_hz = cutoff.denormalize(0.5); // ~632 Hz (geometric mean)
//! let back = cutoff.normalize(freq_hz); // ~0.5
//! assert!((back - 0.5).abs() < 1e-9);
//! ```

use serde::{Deserialize, Serialize};

/// How a parameter value is scaled between normalized (0-1) and real values.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum ParameterScale {
    /// `real = min + normalized * (max - min)`
    #[default]
    Linear,

    /// `real = min * (max/min)^normalized`
    ///
    /// Requires `min > 0` and `max > min`.
    Logarithmic,

    /// Power curve with configurable shape
    ///
    /// `curve > 1.0`: More resolution at low end
    /// `curve < 1.0`: More resolution at high end
    /// `curve = 1.0`: Linear
    Exponential {
        /// Curve shape factor (typically 2.0-4.0)
        curve: f64,
    },

    /// On/off toggle (normalized < 0.5 = off, >= 0.5 = on)
    Toggle,

    /// Discrete integer steps between `min` and `max`.
    Integer,
}

impl ParameterScale {
    /// Whether the scale snaps to discrete steps.
    pub fn is_stepped(&self) -> bool {
        matches!(self, ParameterScale::Toggle | ParameterScale::Integer)
    }
}

/// Whether an exponential curve bends the mapping at all.
fn shapes(curve: f64) -> bool {
    curve > 0.0 && curve != 1.0
}

/// Parameter range with scaling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterRange {
    pub min: f64,
    pub max: f64,
    /// Default real value, clamped into range.
    pub default: f64,
    pub scale: ParameterScale,
}

impl ParameterRange {
    pub fn new(min: f64, max: f64, default: f64, scale: ParameterScale) -> Self {
        debug_assert!(max > min, "max must be greater than min");

        Self {
            min,
            max,
            default: default.clamp(min, max),
            scale,
        }
    }

    pub fn linear(min: f64, max: f64, default: f64) -> Self {
        Self::new(min, max, default, ParameterScale::Linear)
    }

    /// # Panics
    ///
    /// Panics in debug mode if `min <= 0`.
    pub fn logarithmic(min: f64, max: f64, default: f64) -> Self {
        debug_assert!(min > 0.0, "logarithmic scale requires min > 0");
        Self::new(min, max, default, ParameterScale::Logarithmic)
    }

    pub fn exponential(min: f64, max: f64, default: f64, curve: f64) -> Self {
        Self::new(min, max, default, ParameterScale::Exponential { curve })
    }

    /// `min` is the "off" value and `max` the "on" value.
    pub fn toggle(off_value: f64, on_value: f64, default_on: bool) -> Self {
        Self::new(
            off_value,
            on_value,
            if default_on { on_value } else { off_value },
            ParameterScale::Toggle,
        )
    }

    pub fn integer(min: i32, max: i32, default: i32) -> Self {
        Self::new(
            min as f64,
            max as f64,
            default as f64,
            ParameterScale::Integer,
        )
    }

    /// Number of discrete steps, 0 for continuous scales (VST3 `stepCount` convention).
    pub fn step_count(&self) -> u32 {
        match self.scale {
            ParameterScale::Toggle => 1,
            ParameterScale::Integer => (self.max - self.min).round().max(0.0) as u32,
            _ => 0,
        }
    }

    /// Natural-log bounds for a logarithmic range, `None` when it cannot
    /// be log-scaled and falls back to linear.
    fn log_bounds(&self) -> Option<(f64, f64)> {
        match self.scale {
            ParameterScale::Logarithmic if self.min > 0.0 => Some((self.min.ln(), self.max.ln())),
            _ => None,
        }
    }

    /// Round a normalized position to the nearest of `step_count` steps.
    #[inline]
    fn quantize(&self, normalized: f64) -> f64 {
        match self.step_count() {
            0 => normalized,
            steps => {
                let steps = steps as f64;
                (normalized * steps).round() / steps
            }
        }
    }

    /// Convert a real value to normalized (0.0-1.0).
    ///
    /// Stepped scales land exactly on a step.
    #[inline]
    pub fn normalize(&self, value: f64) -> f64 {
        let span = self.max - self.min;
        if span <= 0.0 {
            return 0.0;
        }
        let value = self.clamp(value);
        let position = (value - self.min) / span;

        match (self.scale, self.log_bounds()) {
            (_, Some((lo, hi))) => (value.ln() - lo) / (hi - lo),
            (ParameterScale::Exponential { curve }, _) if shapes(curve) => position.powf(curve.recip()),
            (ParameterScale::Toggle | ParameterScale::Integer, _) => self.quantize(position),
            _ => position,
        }
    }

    /// Convert a normalized value (0.0-1.0) to a real value.
    #[inline]
    pub fn denormalize(&self, normalized: f64) -> f64 {
        let position = self.quantize(normalized.clamp(0.0, 1.0));
        let span = self.max - self.min;

        match (self.scale, self.log_bounds()) {
            (_, Some((lo, hi))) => (lo + position * (hi - lo)).exp(),
            (ParameterScale::Exponential { curve }, _) if shapes(curve) => {
                self.min + position.powf(curve) * span
            }
            // Guards against the step division leaving a value a hair off the integer.
            (ParameterScale::Integer, _) => (self.min + position * span).round(),
            _ => self.min + position * span,
        }
    }

    /// Snap a normalized value onto the nearest representable step.
    ///
    /// Only clamps for continuous scales.
    #[inline]
    pub fn snap_normalized(&self, normalized: f64) -> f64 {
        self.quantize(normalized.clamp(0.0, 1.0))
    }

    #[inline]
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    #[inline]
    pub fn default_normalized(&self) -> f64 {
        self.normalize(self.default)
    }

    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

impl Default for ParameterRange {
    fn default() -> Self {
        Self::linear(0.0, 1.0, 0.5)
    }
}
