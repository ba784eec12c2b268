//! # Fast Fourier Transform (FFT) Module
//!
//! Frequency domain helpers backing the spectral peak estimator. A window's
//! byte samples are centred and scaled to `[-1, 1]`, the DC offset is
//! removed, a Hann window is applied and the forward transform is run with
//! a plan that the caller creates once and reuses for every frame.

use rustfft::{Fft, FftPlanner, num_complex::Complex};
use std::sync::Arc;

use crate::window::SampleWindow;

/// Plans a forward FFT of the given length.
pub fn plan_forward(len: usize) -> Arc<dyn Fft<f32>> {
    let mut planner = FftPlanner::new();
    planner.plan_fft_forward(len)
}

/// Removes the DC offset from a signal by making its average value zero.
fn remove_dc_offset(signal: &mut [f32]) {
    let len = signal.len();
    if len == 0 {
        return;
    }
    let avg = signal.iter().sum::<f32>() / len as f32;
    if avg.abs() > 1e-6 {
        for sample in signal.iter_mut() {
            *sample -= avg;
        }
    }
}

/// Applies a Hann window to the input buffer to reduce spectral leakage.
fn apply_hann_window(buffer: &mut [f32]) {
    let n = buffer.len();
    if n < 2 {
        return;
    }
    let n_minus_1 = (n - 1) as f32;
    for (i, sample) in buffer.iter_mut().enumerate() {
        let multiplier = 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / n_minus_1).cos());
        *sample *= multiplier;
    }
}

/// Converts a window's byte samples to floats in `[-1, 1]`.
pub fn window_to_signal(window: &SampleWindow) -> Vec<f32> {
    window.centered().map(|s| s as f32 / 128.0).collect()
}

/// Performs a forward FFT on a window and returns the complex spectrum.
///
/// The plan length must equal the window length.
pub fn perform_fft(fft: &dyn Fft<f32>, window: &SampleWindow) -> Vec<Complex<f32>> {
    let mut processed_signal = window_to_signal(window);
    remove_dc_offset(&mut processed_signal);
    apply_hann_window(&mut processed_signal);

    let mut buffer: Vec<Complex<f32>> = processed_signal
        .into_iter()
        .map(|sample| Complex { re: sample, im: 0.0 })
        .collect();

    fft.process(&mut buffer);
    buffer
}

/// Magnitudes of the spectrum up to the Nyquist frequency.
pub fn spectrum_to_magnitudes(spectrum: &[Complex<f32>]) -> Vec<f32> {
    spectrum
        .iter()
        .take(spectrum.len() / 2)
        .map(|c| c.norm())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::WINDOW_SIZE;
    use crate::window::test_signals::{constant_window, sine_window};
    use approx::assert_abs_diff_eq;

    #[test]
    fn hann_window_tapers_edges() {
        let mut buffer = vec![1.0_f32; 9];
        apply_hann_window(&mut buffer);
        assert_abs_diff_eq!(buffer[0], 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(buffer[8], 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(buffer[4], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn dc_offset_is_removed() {
        let mut signal = vec![0.5_f32, 0.7, 0.3, 0.5];
        remove_dc_offset(&mut signal);
        assert_abs_diff_eq!(signal.iter().sum::<f32>(), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn sine_energy_lands_in_expected_bin() {
        let fft = plan_forward(WINDOW_SIZE);
        // Bin 40 at 44100 Hz with 2048 points.
        let freq = 40.0 * 44100.0 / WINDOW_SIZE as f32;
        let window = sine_window(freq, 100.0, 44100);
        let mags = spectrum_to_magnitudes(&perform_fft(&*fft, &window));
        assert_eq!(mags.len(), WINDOW_SIZE / 2);
        let peak = mags
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i);
        assert_eq!(peak, Some(40));
    }

    #[test]
    fn constant_window_has_flat_zero_spectrum() {
        let fft = plan_forward(WINDOW_SIZE);
        let mags = spectrum_to_magnitudes(&perform_fft(&*fft, &constant_window(200, 44100)));
        assert!(mags.iter().all(|&m| m < 1e-3));
    }
}
