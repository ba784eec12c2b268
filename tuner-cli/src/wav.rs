//! WAV file input for offline analysis.

use anyhow::{Context, Result, bail};
use hound::{SampleFormat, WavReader};
use std::path::Path;
use tuner_core::{SampleWindow, WINDOW_SIZE};

/// Decodes a WAV file to mono samples in `[-1, 1]`.
///
/// Integer formats are scaled by their bit depth; multi-channel audio is
/// averaged per frame.
pub fn read_mono(path: &Path) -> Result<(u32, Vec<f32>)> {
    let mut reader = WavReader::open(path).with_context(|| format!("opening {}", path.display()))?;
    let spec = reader.spec();
    if spec.channels == 0 {
        bail!("{} has no channels", path.display());
    }

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        SampleFormat::Int => {
            let scale = 1.0 / (1_i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|s| s as f32 * scale))
                .collect::<Result<_, _>>()?
        }
    };

    let channels = usize::from(spec.channels);
    let mono = interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect();
    Ok((spec.sample_rate, mono))
}

/// Cuts mono samples into consecutive windows, dropping a partial tail.
pub fn to_windows(samples: &[f32], sample_rate: u32) -> Result<Vec<SampleWindow>> {
    samples
        .chunks_exact(WINDOW_SIZE)
        .map(|chunk| SampleWindow::from_f32(chunk, sample_rate).map_err(Into::into))
        .collect()
}

/// Reads a WAV file as analysis windows.
pub fn read_windows(path: &Path) -> Result<(u32, Vec<SampleWindow>)> {
    let (sample_rate, samples) = read_mono(path)?;
    let windows = to_windows(&samples, sample_rate)?;
    if windows.is_empty() {
        bail!(
            "{} is shorter than one analysis window ({} samples)",
            path.display(),
            WINDOW_SIZE
        );
    }
    Ok((sample_rate, windows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{WavSpec, WavWriter};

    fn write_sine(path: &Path, channels: u16, frames: usize) {
        let spec = WavSpec {
            channels,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(path, spec).unwrap();
        for i in 0..frames {
            let x = (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 44100.0).sin();
            for _ in 0..channels {
                writer.write_sample((x * 0.5 * i16::MAX as f32) as i16).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn stereo_file_is_downmixed_and_windowed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a4.wav");
        write_sine(&path, 2, WINDOW_SIZE * 3 + 100);

        let (sample_rate, windows) = read_windows(&path).unwrap();
        assert_eq!(sample_rate, 44100);
        assert_eq!(windows.len(), 3);
        let freq = tuner_core::estimate(&windows[0]).frequency_hz().unwrap();
        assert!((freq - 440.0).abs() < 2.0, "{freq}");
    }

    #[test]
    fn integer_samples_are_normalised() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a4.wav");
        write_sine(&path, 1, 500);
        let (_, samples) = read_mono(&path).unwrap();
        assert_eq!(samples.len(), 500);
        assert!(samples.iter().all(|s| s.abs() <= 0.51));
    }

    #[test]
    fn short_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.wav");
        write_sine(&path, 1, 100);
        assert!(read_windows(&path).is_err());
    }
}
