//! # Pitch Detection Module
//!
//! Fundamental frequency estimation for a single [`SampleWindow`].
//!
//! ## Features
//! - Time-domain autocorrelation over a frequency-plausible lag range
//! - Signed or rectified correlation of the centred samples
//! - First-strong-peak selection to avoid octave errors
//! - Parabolic interpolation for sub-sample accuracy
//! - Spectral peak estimator as an FFT based alternative

use rustfft::{Fft, Length};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;
use tracing::trace;

use crate::fft;
use crate::window::SampleWindow;

/// Outcome of pitch estimation for one window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PitchEstimate {
    /// A periodic signal was detected.
    Found { frequency_hz: f32 },
    /// Silence, noise, or no correlation peak.
    NotFound,
}

impl PitchEstimate {
    /// Wraps a frequency, rejecting non-finite and non-positive values.
    pub fn from_frequency(frequency_hz: f32) -> Self {
        if frequency_hz.is_finite() && frequency_hz > 0.0 {
            PitchEstimate::Found { frequency_hz }
        } else {
            PitchEstimate::NotFound
        }
    }

    /// Whether a pitch was detected.
    pub fn is_found(&self) -> bool {
        matches!(self, PitchEstimate::Found { .. })
    }

    /// The detected frequency in Hz, if any.
    pub fn frequency_hz(&self) -> Option<f32> {
        match *self {
            PitchEstimate::Found { frequency_hz } => Some(frequency_hz),
            PitchEstimate::NotFound => None,
        }
    }
}

/// Anything that turns a window into a frequency estimate.
pub trait PitchEstimator {
    /// Estimates the fundamental of one window.
    fn estimate(&self, window: &SampleWindow) -> PitchEstimate;
}

impl<T: PitchEstimator + ?Sized> PitchEstimator for Box<T> {
    fn estimate(&self, window: &SampleWindow) -> PitchEstimate {
        (**self).estimate(window)
    }
}

/// How centred samples are combined in the correlation sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationKind {
    /// `(s[i] - 128) * (s[i + lag] - 128)`
    #[default]
    Signed,
    /// `|s[i] - 128| * |s[i + lag] - 128|`. Rectification makes a pure tone
    /// repeat every half period, so sines report one octave high.
    Rectified,
}

/// The range of fundamentals an estimator will report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrequencyBand {
    pub min_hz: f32,
    pub max_hz: f32,
}

impl Default for FrequencyBand {
    /// 50 Hz to 2000 Hz. The low edge is reachable with a 2048-sample
    /// window at capture rates up to 51.2 kHz.
    fn default() -> Self {
        Self {
            min_hz: 50.0,
            max_hz: 2000.0,
        }
    }
}

impl FrequencyBand {
    /// True when both edges are finite and `0 < min_hz < max_hz`.
    pub fn is_valid(&self) -> bool {
        self.min_hz.is_finite()
            && self.max_hz.is_finite()
            && self.min_hz > 0.0
            && self.max_hz > self.min_hz
    }

    /// Lowest fundamental the autocorrelation search can reach.
    ///
    /// Lags are capped at half the window so every lag averages over at
    /// least half the samples.
    ///
    /// # Arguments
    /// * `sample_rate` - Sample rate in Hz
    /// * `window_len` - Samples per window
    ///
    /// # Returns
    /// The frequency whose period is `window_len / 2` samples.
    pub fn lowest_reachable_hz(sample_rate: u32, window_len: usize) -> f32 {
        sample_rate as f32 / (window_len / 2).max(1) as f32
    }

    /// Candidate period lags (in samples) for this band.
    ///
    /// The range runs from `floor(sample_rate / max_hz)` to
    /// `ceil(sample_rate / min_hz)`, so a period anywhere inside the band
    /// has its nearest lag in range. The upper end is capped at half the
    /// window and lag 0 is never a candidate.
    ///
    /// # Returns
    /// * `Some(lags)` - Candidate lags, at least one
    /// * `None` - Invalid band, zero sample rate, or no lag left after the cap
    pub fn lag_range(&self, sample_rate: u32, window_len: usize) -> Option<RangeInclusive<usize>> {
        if !self.is_valid() || sample_rate == 0 {
            return None;
        }
        let sr = sample_rate as f32;
        let min_lag = ((sr / self.max_hz).floor() as usize).max(1);
        let max_lag = ((sr / self.min_hz).ceil() as usize).min(window_len / 2);
        if min_lag > max_lag {
            return None;
        }
        Some(min_lag..=max_lag)
    }
}

/// Mean lagged product of a centred signal.
///
/// `correlation(offset) = (1 / (N - offset)) * sum(x[i] * x[i + offset])`
pub fn correlation(centered: &[i32], offset: usize) -> f32 {
    let n = centered.len();
    if offset >= n {
        return 0.0;
    }
    let sum: i64 = centered[..n - offset]
        .iter()
        .zip(&centered[offset..])
        .map(|(&a, &b)| i64::from(a * b))
        .sum();
    sum as f32 / (n - offset) as f32
}

/// Vertex offset of the parabola through three equally spaced points,
/// relative to the middle one, clamped to half a step.
fn parabolic_offset(y1: f32, y2: f32, y3: f32) -> f32 {
    let denominator = y1 - 2.0 * y2 + y3;
    if denominator.abs() < f32::EPSILON {
        return 0.0;
    }
    ((y1 - y3) / (2.0 * denominator)).clamp(-0.5, 0.5)
}

/// Time-domain autocorrelation pitch estimator.
///
/// The best correlation over the lag range sets the scale; the reported
/// period is the first local maximum reaching `peak_ratio` of it. A window
/// whose best correlation is not strictly positive, or whose correlation
/// curve has no such peak (a constant window), yields `NotFound`.
#[derive(Debug, Clone, PartialEq)]
pub struct AutocorrelationEstimator {
    kind: CorrelationKind,
    band: FrequencyBand,
    peak_ratio: f32,
}

impl Default for AutocorrelationEstimator {
    fn default() -> Self {
        Self::new(CorrelationKind::default(), FrequencyBand::default(), 0.9)
    }
}

impl AutocorrelationEstimator {
    /// Creates an estimator.
    ///
    /// # Arguments
    /// * `kind` - Signed or rectified sample products
    /// * `band` - Fundamentals to search for
    /// * `peak_ratio` - Fraction of the best correlation the chosen peak must reach
    pub fn new(kind: CorrelationKind, band: FrequencyBand, peak_ratio: f32) -> Self {
        Self {
            kind,
            band,
            peak_ratio,
        }
    }

    /// Correlation at every candidate lag plus one neighbour on each side,
    /// so the edge lags can be tested as local maxima.
    fn correlation_curve(
        &self,
        window: &SampleWindow,
    ) -> Option<(RangeInclusive<usize>, Vec<f32>)> {
        let lags = self.band.lag_range(window.sample_rate(), window.len())?;
        let centered: Vec<i32> = match self.kind {
            CorrelationKind::Signed => window.centered().collect(),
            CorrelationKind::Rectified => window.centered().map(i32::abs).collect(),
        };
        let curve = (lags.start() - 1..=lags.end() + 1)
            .map(|lag| correlation(&centered, lag))
            .collect();
        Some((lags, curve))
    }
}

impl PitchEstimator for AutocorrelationEstimator {
    fn estimate(&self, window: &SampleWindow) -> PitchEstimate {
        let Some((lags, curve)) = self.correlation_curve(window) else {
            return PitchEstimate::NotFound;
        };
        // curve[0] and curve[last] are neighbours outside the candidate lags.
        let candidates = 1..curve.len() - 1;

        let best = curve[candidates.clone()].iter().copied().fold(0.0_f32, f32::max);
        if best <= 0.0 {
            trace!("no positive correlation in lag range");
            return PitchEstimate::NotFound;
        }

        let threshold = best * self.peak_ratio;
        let peak = candidates.clone().find(|&i| {
            curve[i] > curve[i - 1] && curve[i] >= curve[i + 1] && curve[i] >= threshold
        });
        let Some(i) = peak else {
            trace!(best, "correlation curve has no qualifying peak");
            return PitchEstimate::NotFound;
        };

        let lag = lags.start() + i - 1;
        let period = lag as f32 + parabolic_offset(curve[i - 1], curve[i], curve[i + 1]);
        PitchEstimate::from_frequency(window.sample_rate() as f32 / period)
    }
}

/// Estimates pitch with the default autocorrelation settings.
pub fn estimate(window: &SampleWindow) -> PitchEstimate {
    AutocorrelationEstimator::default().estimate(window)
}

/// Refines a peak bin of a magnitude spectrum to a frequency.
///
/// Fits a parabola through the log magnitudes around the peak for sub-bin
/// accuracy; falls back to the bin centre when the neighbours are unusable.
pub fn refine_from_spectrum(spectrum_magnitudes: &[f32], peak_bin: usize, sample_rate: u32) -> f32 {
    let buffer_size = spectrum_magnitudes.len() * 2;
    let bin_hz = sample_rate as f32 / buffer_size as f32;
    let rough_freq = peak_bin as f32 * bin_hz;

    if peak_bin == 0 || peak_bin + 1 >= spectrum_magnitudes.len() {
        return rough_freq;
    }

    let y1 = spectrum_magnitudes[peak_bin - 1].ln();
    let y2 = spectrum_magnitudes[peak_bin].ln();
    let y3 = spectrum_magnitudes[peak_bin + 1].ln();

    if !y1.is_finite() || !y2.is_finite() || !y3.is_finite() {
        return rough_freq;
    }

    let final_freq = (peak_bin as f32 + parabolic_offset(y1, y2, y3)) * bin_hz;
    if final_freq.is_finite() && final_freq > 0.0 {
        final_freq
    } else {
        rough_freq
    }
}

/// Strongest-bin spectral estimator.
///
/// Picks the strongest magnitude bin inside the band and reports it only if
/// it reaches `relative_height` of the strongest bin in the whole spectrum.
pub struct SpectralPeakEstimator {
    band: FrequencyBand,
    relative_height: f32,
    fft: Arc<dyn Fft<f32>>,
}

impl fmt::Debug for SpectralPeakEstimator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpectralPeakEstimator")
            .field("band", &self.band)
            .field("relative_height", &self.relative_height)
            .field("fft_len", &self.fft.len())
            .finish()
    }
}

impl SpectralPeakEstimator {
    /// Creates an estimator with an FFT plan sized for `window_len`.
    pub fn new(band: FrequencyBand, relative_height: f32, window_len: usize) -> Self {
        Self {
            band,
            relative_height,
            fft: fft::plan_forward(window_len),
        }
    }
}

impl PitchEstimator for SpectralPeakEstimator {
    fn estimate(&self, window: &SampleWindow) -> PitchEstimate {
        if window.len() != self.fft.len() || !self.band.is_valid() {
            return PitchEstimate::NotFound;
        }
        let spectrum = fft::perform_fft(&*self.fft, window);
        let mags = fft::spectrum_to_magnitudes(&spectrum);

        let overall = mags.iter().copied().fold(0.0_f32, f32::max);
        if overall <= 1e-6 {
            return PitchEstimate::NotFound;
        }

        let bin_hz = window.sample_rate() as f32 / window.len() as f32;
        let lo_bin = ((self.band.min_hz / bin_hz).floor() as usize).max(1);
        let hi_bin = ((self.band.max_hz / bin_hz).ceil() as usize).min(mags.len() - 1);
        if lo_bin >= hi_bin {
            return PitchEstimate::NotFound;
        }

        let Some((offset, &magnitude)) = mags[lo_bin..=hi_bin]
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
        else {
            return PitchEstimate::NotFound;
        };
        if magnitude < overall * self.relative_height {
            trace!(magnitude, overall, "spectral peak below height threshold");
            return PitchEstimate::NotFound;
        }

        let peak_bin = lo_bin + offset;
        PitchEstimate::from_frequency(refine_from_spectrum(&mags, peak_bin, window.sample_rate()))
    }
}
