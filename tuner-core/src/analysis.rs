//! # Frame Analysis
//!
//! Runs the three per-frame stages on one window: pitch estimation, note
//! mapping and tuning classification. A frame either produces a complete
//! [`TuningReading`] or nothing.

use serde::Serialize;
use tracing::debug;

use crate::classifier::{self, TuningIndicator, ZoneThresholds};
use crate::config::{EstimatorKind, TunerConfig};
use crate::error::{Result, TunerError};
use crate::note::{NoteMapper, NoteMatch};
use crate::pitch::{AutocorrelationEstimator, PitchEstimator, SpectralPeakEstimator};
use crate::window::{SampleWindow, WINDOW_SIZE};

/// Everything the display needs for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TuningReading {
    /// The detected frequency in Hz.
    pub frequency_hz: f32,
    /// The nearest note and the deviation from it.
    pub note: NoteMatch,
    /// Zone and needle position.
    pub indicator: TuningIndicator,
}

impl TuningReading {
    /// Frequency rounded to one decimal, e.g. `"440.0 Hz"`.
    pub fn display_frequency(&self) -> String {
        format!("{:.1} Hz", self.frequency_hz)
    }

    /// Note name and octave, e.g. `"A4"`.
    pub fn note_label(&self) -> String {
        self.note.label()
    }

    /// Tuning advice for this reading.
    pub fn feedback(&self) -> &'static str {
        classifier::feedback(self.indicator.zone, self.note.cents_offset)
    }
}

/// The per-frame pipeline.
pub struct Analyzer {
    estimator: Box<dyn PitchEstimator + Send>,
    mapper: NoteMapper,
    thresholds: ZoneThresholds,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(
            AutocorrelationEstimator::default(),
            NoteMapper::default(),
            ZoneThresholds::default(),
        )
    }
}

impl Analyzer {
    /// Assembles a pipeline from its three stages.
    ///
    /// # Arguments
    /// * `estimator` - Pitch estimator run on every window
    /// * `mapper` - Frequency to note mapping
    /// * `thresholds` - Cent limits of the tuning zones
    pub fn new(
        estimator: impl PitchEstimator + Send + 'static,
        mapper: NoteMapper,
        thresholds: ZoneThresholds,
    ) -> Self {
        Self {
            estimator: Box::new(estimator),
            mapper,
            thresholds,
        }
    }

    /// Builds the pipeline described by a validated config.
    pub fn from_config(config: &TunerConfig) -> Result<Self> {
        config.validate()?;
        let mapper = NoteMapper::new(config.reference_hz, config.octave_numbering);
        let analyzer = match config.estimator {
            EstimatorKind::Autocorrelation => Self::new(
                AutocorrelationEstimator::new(config.correlation, config.band, config.peak_ratio),
                mapper,
                config.thresholds,
            ),
            EstimatorKind::Spectral => Self::new(
                SpectralPeakEstimator::new(
                    config.band,
                    config.spectral_relative_height,
                    WINDOW_SIZE,
                ),
                mapper,
                config.thresholds,
            ),
        };
        Ok(analyzer)
    }

    /// Analyzes one window.
    ///
    /// # Errors
    /// * `NoPitchFound` - the estimator found no fundamental; skip the frame
    pub fn analyze(&self, window: &SampleWindow) -> Result<TuningReading> {
        let frequency_hz = self
            .estimator
            .estimate(window)
            .frequency_hz()
            .ok_or(TunerError::NoPitchFound)?;
        let note = self.mapper.map(frequency_hz).ok_or(TunerError::NoPitchFound)?;
        let indicator = classifier::classify_with(&self.thresholds, note.cents_offset);

        debug!(
            frequency_hz,
            note = %note,
            cents = note.cents_offset,
            zone = ?indicator.zone,
            "frame analyzed"
        );
        Ok(TuningReading {
            frequency_hz,
            note,
            indicator,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::TuningZone;
    use crate::window::test_signals::{constant_window, sine_window};

    #[test]
    fn a440_sine_reads_a4_in_tune() {
        let reading = Analyzer::default()
            .analyze(&sine_window(440.0, 100.0, 44100))
            .unwrap();
        assert_eq!(reading.note_label(), "A4");
        assert!(reading.note.cents_offset.abs() < 10.0);
        assert!((reading.frequency_hz - 440.0).abs() < 2.0);
        let shown = reading.display_frequency();
        let value: f32 = shown.strip_suffix(" Hz").unwrap().parse().unwrap();
        assert!((value - reading.frequency_hz).abs() <= 0.05 + 1e-3, "{shown}");
    }

    #[test]
    fn silence_is_skipped() {
        let err = Analyzer::default()
            .analyze(&constant_window(128, 44100))
            .unwrap_err();
        assert!(matches!(err, TunerError::NoPitchFound));
    }

    #[test]
    fn detuned_tone_is_out_of_tune() {
        // Thirty cents above A4.
        let freq = 440.0 * 2f32.powf(0.3 / 12.0);
        let reading = Analyzer::default()
            .analyze(&sine_window(freq, 100.0, 44100))
            .unwrap();
        assert_eq!(reading.indicator.zone, TuningZone::OutOfTune);
        assert!(reading.indicator.needle_degrees > 12.0);
    }

    #[test]
    fn spectral_config_builds_spectral_pipeline() {
        let config = TunerConfig {
            estimator: EstimatorKind::Spectral,
            ..TunerConfig::default()
        };
        let reading = Analyzer::from_config(&config)
            .unwrap()
            .analyze(&sine_window(440.0, 100.0, 44100))
            .unwrap();
        assert_eq!(reading.note_label(), "A4");
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = TunerConfig {
            peak_ratio: 0.0,
            ..TunerConfig::default()
        };
        assert!(Analyzer::from_config(&config).is_err());
    }
}
