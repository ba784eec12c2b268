//! # Configuration Module
//!
//! Engine settings, stored as pretty-printed JSON. Every field has a
//! default, so a config file only needs the values it changes.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::classifier::ZoneThresholds;
use crate::error::{Result, TunerError};
use crate::note::{A4_HZ, OctaveNumbering};
use crate::pitch::{CorrelationKind, FrequencyBand};
use crate::window::WINDOW_SIZE;

/// Which pitch estimator the analyzer runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimatorKind {
    #[default]
    Autocorrelation,
    Spectral,
}

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerConfig {
    /// Frequency of A4 in Hz.
    pub reference_hz: f32,
    pub octave_numbering: OctaveNumbering,
    pub estimator: EstimatorKind,
    pub correlation: CorrelationKind,
    /// Fundamentals outside this band are never reported.
    pub band: FrequencyBand,
    /// Fraction of the best correlation a peak must reach to be the period.
    pub peak_ratio: f32,
    /// Fraction of the strongest spectral bin the in-band peak must reach.
    pub spectral_relative_height: f32,
    pub thresholds: ZoneThresholds,
    /// Sample rate requested from the capture device.
    pub capture_sample_rate: u32,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            reference_hz: A4_HZ,
            octave_numbering: OctaveNumbering::default(),
            estimator: EstimatorKind::default(),
            correlation: CorrelationKind::default(),
            band: FrequencyBand::default(),
            peak_ratio: 0.9,
            spectral_relative_height: 0.1,
            thresholds: ZoneThresholds::default(),
            capture_sample_rate: 44100,
        }
    }
}

impl TunerConfig {
    /// Checks that every value is usable by the pipeline.
    pub fn validate(&self) -> Result<()> {
        if !(self.reference_hz.is_finite() && self.reference_hz > 0.0) {
            return Err(TunerError::Config(format!(
                "reference_hz must be positive, got {}",
                self.reference_hz
            )));
        }
        if !self.band.is_valid() {
            return Err(TunerError::Config(format!(
                "band must satisfy 0 < min_hz < max_hz, got {}..{}",
                self.band.min_hz, self.band.max_hz
            )));
        }
        if !(self.peak_ratio > 0.0 && self.peak_ratio <= 1.0) {
            return Err(TunerError::Config(format!(
                "peak_ratio must be in (0, 1], got {}",
                self.peak_ratio
            )));
        }
        if !(self.spectral_relative_height >= 0.0 && self.spectral_relative_height <= 1.0) {
            return Err(TunerError::Config(format!(
                "spectral_relative_height must be in [0, 1], got {}",
                self.spectral_relative_height
            )));
        }
        if !self.thresholds.is_valid() {
            return Err(TunerError::Config(format!(
                "thresholds must satisfy 0 < in_tune_cents <= close_cents, got {} / {}",
                self.thresholds.in_tune_cents, self.thresholds.close_cents
            )));
        }
        if self.capture_sample_rate == 0 {
            return Err(TunerError::Config("capture_sample_rate must be positive".into()));
        }
        let reachable_hz =
            FrequencyBand::lowest_reachable_hz(self.capture_sample_rate, WINDOW_SIZE);
        if self.estimator == EstimatorKind::Autocorrelation && self.band.min_hz < reachable_hz {
            return Err(TunerError::Config(format!(
                "band.min_hz {} is below {:.1} Hz, the lowest fundamental a {}-sample window \
                 can resolve at {} Hz",
                self.band.min_hz, reachable_hz, WINDOW_SIZE, self.capture_sample_rate
            )));
        }
        Ok(())
    }

    /// Loads and validates a configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let mut file = File::open(path.as_ref())?;
        let mut data = String::new();
        file.read_to_string(&mut data)?;
        let config: TunerConfig = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` if given, otherwise the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Saves the configuration as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json_string = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path.as_ref())?;
        file.write_all(json_string.as_bytes())?;
        Ok(())
    }
}
