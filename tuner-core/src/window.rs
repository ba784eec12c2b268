//! # Sample Window Module
//!
//! A sample window is one analysis frame: a fixed number of unsigned 8-bit
//! amplitude samples centred at 128, paired with the sampling rate they were
//! captured at. Windows are validated once at construction and immutable
//! afterwards, so every estimator can trust their shape.

use crate::error::{Result, TunerError};

/// Number of samples in one analysis window.
///
/// Larger windows give better low-frequency resolution but the
/// autocorrelation pass grows quadratically with this size.
pub const WINDOW_SIZE: usize = 2048;

/// The byte value representing zero amplitude.
pub const ZERO_LEVEL: u8 = 128;

/// One immutable frame of audio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleWindow {
    samples: Vec<u8>,
    sample_rate: u32,
}

impl SampleWindow {
    /// Builds a window from raw byte samples.
    ///
    /// # Errors
    /// * `InvalidWindow` - sample count is not [`WINDOW_SIZE`] or the sample
    ///   rate is zero
    pub fn new(samples: Vec<u8>, sample_rate: u32) -> Result<Self> {
        if samples.len() != WINDOW_SIZE || sample_rate == 0 {
            return Err(TunerError::InvalidWindow {
                expected: WINDOW_SIZE,
                actual: samples.len(),
                sample_rate,
            });
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Builds a window from normalised float samples in `[-1, 1]`.
    ///
    /// Each sample is quantised as `floor(128 * (1 + x))` and clamped to the
    /// byte range, matching a byte time-domain analyser.
    pub fn from_f32(samples: &[f32], sample_rate: u32) -> Result<Self> {
        let bytes = samples.iter().map(|&x| quantize(x)).collect();
        Self::new(bytes, sample_rate)
    }

    /// Raw byte samples.
    pub fn samples(&self) -> &[u8] {
        &self.samples
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of samples (always [`WINDOW_SIZE`]).
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always `false`; a valid window is never empty.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples shifted so that zero amplitude is 0.
    pub fn centered(&self) -> impl Iterator<Item = i32> + '_ {
        self.samples
            .iter()
            .map(|&s| i32::from(s) - i32::from(ZERO_LEVEL))
    }
}

fn quantize(x: f32) -> u8 {
    if !x.is_finite() {
        return ZERO_LEVEL;
    }
    (128.0 * (1.0 + x)).floor().clamp(0.0, 255.0) as u8
}
