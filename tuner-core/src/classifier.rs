//! # Tuning Classifier
//!
//! Turns a cents deviation into a discrete tuning zone and a needle angle
//! for the display. Pure functions, no failure mode.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Degrees of needle travel per cent.
pub const NEEDLE_DEGREES_PER_CENT: f32 = 0.6;

/// Maximum needle deflection either side of centre.
pub const NEEDLE_MAX_DEGREES: f32 = 30.0;

/// Discrete tuning quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TuningZone {
    InTune,
    Close,
    OutOfTune,
}

/// An RGB display colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl DisplayColor {
    /// Colour from 8-bit channel values.
    pub const fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// `#rrggbb`
    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl TuningZone {
    /// Colour name the display uses for this zone.
    pub fn color_name(self) -> &'static str {
        match self {
            TuningZone::InTune => "green",
            TuningZone::Close => "amber",
            TuningZone::OutOfTune => "red",
        }
    }

    /// Display colour of this zone.
    pub fn color(self) -> DisplayColor {
        match self {
            TuningZone::InTune => DisplayColor::from_rgb8(0x2e, 0xcc, 0x71),
            TuningZone::Close => DisplayColor::from_rgb8(0xf3, 0x9c, 0x12),
            TuningZone::OutOfTune => DisplayColor::from_rgb8(0xe7, 0x4c, 0x3c),
        }
    }
}

impl fmt::Display for TuningZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TuningZone::InTune => "in tune",
            TuningZone::Close => "close",
            TuningZone::OutOfTune => "out of tune",
        })
    }
}

/// Zone boundaries in cents. A deviation below `in_tune_cents` is in tune,
/// below `close_cents` close, anything else out of tune.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneThresholds {
    pub in_tune_cents: f32,
    pub close_cents: f32,
}

impl Default for ZoneThresholds {
    fn default() -> Self {
        Self {
            in_tune_cents: 5.0,
            close_cents: 20.0,
        }
    }
}

impl ZoneThresholds {
    /// True when `0 < in_tune_cents <= close_cents`, both finite.
    pub fn is_valid(&self) -> bool {
        self.in_tune_cents.is_finite()
            && self.close_cents.is_finite()
            && self.in_tune_cents > 0.0
            && self.close_cents >= self.in_tune_cents
    }

    /// Zone of a cent deviation; the sign is ignored.
    pub fn zone(&self, cents: f32) -> TuningZone {
        let deviation = cents.abs();
        if deviation < self.in_tune_cents {
            TuningZone::InTune
        } else if deviation < self.close_cents {
            TuningZone::Close
        } else {
            // NaN lands here too.
            TuningZone::OutOfTune
        }
    }
}

/// Zone plus needle position for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TuningIndicator {
    pub zone: TuningZone,
    /// Needle angle in degrees, in `[-30, 30]`.
    pub needle_degrees: f32,
}

/// Needle angle for a deviation, clamped to the dial.
pub fn needle_angle(cents: f32) -> f32 {
    if cents.is_nan() {
        return 0.0;
    }
    (cents * NEEDLE_DEGREES_PER_CENT).clamp(-NEEDLE_MAX_DEGREES, NEEDLE_MAX_DEGREES)
}

/// Classifies with `thresholds`.
pub fn classify_with(thresholds: &ZoneThresholds, cents: f32) -> TuningIndicator {
    TuningIndicator {
        zone: thresholds.zone(cents),
        needle_degrees: needle_angle(cents),
    }
}

/// Classifies with the default 5 / 20 cent boundaries.
pub fn classify(cents: f32) -> TuningIndicator {
    classify_with(&ZoneThresholds::default(), cents)
}

/// Short advice for the player.
pub fn feedback(zone: TuningZone, cents: f32) -> &'static str {
    match zone {
        TuningZone::InTune => "Perfectly in tune!",
        TuningZone::Close => "Close, but could be more precise.",
        TuningZone::OutOfTune if cents < 0.0 => "Flat - tighten the string to raise the pitch.",
        TuningZone::OutOfTune => "Sharp - loosen the string to lower the pitch.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zone_boundaries_are_exact() {
        assert_eq!(classify(4.9).zone, TuningZone::InTune);
        assert_eq!(classify(5.0).zone, TuningZone::Close);
        assert_eq!(classify(19.9).zone, TuningZone::Close);
        assert_eq!(classify(20.0).zone, TuningZone::OutOfTune);
        assert_eq!(classify(-4.9).zone, TuningZone::InTune);
        assert_eq!(classify(-5.0).zone, TuningZone::Close);
        assert_eq!(classify(-20.0).zone, TuningZone::OutOfTune);
        assert_eq!(classify(0.0).zone, TuningZone::InTune);
    }

    #[test]
    fn needle_is_clamped() {
        assert_eq!(classify(1000.0).needle_degrees, 30.0);
        assert_eq!(classify(-1000.0).needle_degrees, -30.0);
        assert_eq!(classify(50.0).needle_degrees, 30.0);
        assert!((classify(10.0).needle_degrees - 6.0).abs() < 1e-6);
        assert!((classify(-25.0).needle_degrees + 15.0).abs() < 1e-6);
    }

    #[test]
    fn non_finite_cents_are_out_of_tune_with_centred_needle() {
        let indicator = classify(f32::NAN);
        assert_eq!(indicator.zone, TuningZone::OutOfTune);
        assert_eq!(indicator.needle_degrees, 0.0);
        assert_eq!(classify(f32::INFINITY).needle_degrees, 30.0);
    }

    #[test]
    fn zone_colors() {
        assert_eq!(TuningZone::InTune.color_name(), "green");
        assert_eq!(TuningZone::Close.color_name(), "amber");
        assert_eq!(TuningZone::OutOfTune.color_name(), "red");
        assert_eq!(TuningZone::InTune.color().hex(), "#2ecc71");
        assert_eq!(TuningZone::Close.color().hex(), "#f39c12");
        assert_eq!(TuningZone::OutOfTune.color().hex(), "#e74c3c");
    }

    #[test]
    fn feedback_tells_direction() {
        assert_eq!(
            feedback(TuningZone::OutOfTune, -30.0),
            "Flat - tighten the string to raise the pitch."
        );
        assert_eq!(
            feedback(TuningZone::OutOfTune, 30.0),
            "Sharp - loosen the string to lower the pitch."
        );
        assert_eq!(feedback(TuningZone::InTune, 1.0), "Perfectly in tune!");
    }

    #[test]
    fn custom_thresholds() {
        let strict = ZoneThresholds {
            in_tune_cents: 2.0,
            close_cents: 10.0,
        };
        assert!(strict.is_valid());
        assert_eq!(classify_with(&strict, 3.0).zone, TuningZone::Close);
        assert_eq!(classify_with(&strict, 12.0).zone, TuningZone::OutOfTune);
        assert!(!ZoneThresholds { in_tune_cents: 10.0, close_cents: 5.0 }.is_valid());
    }
}
