//! # Audio Capture Module
//!
//! This module handles real-time audio capture using CPAL (Cross-Platform Audio Library).
//! It selects an input device and format, downmixes the incoming audio to mono and
//! hands complete [`SampleWindow`]s to the analysis side over a channel.
//!
//! ## Features
//! - Automatic audio device selection
//! - Configurable sample rate
//! - Mono downmix of multi-channel input
//! - Windows are moved to the receiver, never shared with the callback

use anyhow::{Result, anyhow};
use cpal::SupportedStreamConfigRange;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::Sender;
use tracing::{error, info, warn};

use crate::window::{SampleWindow, WINDOW_SIZE};

/// Starts audio capture from the default input device.
///
/// This function:
/// 1. Selects the default audio input device
/// 2. Picks the f32 input format closest to `target_rate`, preferring mono
/// 3. Sets up a callback that cuts the stream into windows and sends them
///
/// Windows are sent with `try_send`, so a bounded channel drops frames
/// instead of blocking the audio callback when the analysis falls behind.
///
/// # Returns
/// * `Ok((stream, sample_rate))` - Audio stream handle and sample rate
/// * `Err(e)` - Error if audio setup fails
pub fn start_audio_capture(
    sender: Sender<SampleWindow>,
    target_rate: u32,
) -> Result<(cpal::Stream, u32)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("No input device available"))?;

    info!("Using audio input device: {}", device.name()?);

    let configs = device.supported_input_configs()?.collect::<Vec<_>>();
    let supported_config = find_supported_config(configs, target_rate)
        .ok_or_else(|| anyhow!("No suitable f32 input format found"))?;

    let sample_rate = cpal::SampleRate(target_rate.clamp(
        supported_config.min_sample_rate().0,
        supported_config.max_sample_rate().0,
    ));
    let config = supported_config.with_sample_rate(sample_rate);

    let sample_rate_val = config.sample_rate().0;
    let channels = usize::from(config.channels()).max(1);
    let config: cpal::StreamConfig = config.into();

    info!(channels, "Selected sample rate: {} Hz", sample_rate_val);

    let err_fn = |err| error!("An error occurred on the audio stream: {}", err);

    // Mono samples waiting to fill a window.
    let mut audio_buffer: Vec<f32> = Vec::with_capacity(WINDOW_SIZE * 2);

    let stream = device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            audio_buffer.extend(
                data.chunks(channels)
                    .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32),
            );

            while audio_buffer.len() >= WINDOW_SIZE {
                match SampleWindow::from_f32(&audio_buffer[..WINDOW_SIZE], sample_rate_val) {
                    // Ignore a full channel; the next window is fresher anyway.
                    Ok(window) => {
                        let _ = sender.try_send(window);
                    }
                    Err(e) => warn!("Dropping captured window: {}", e),
                }
                audio_buffer.drain(..WINDOW_SIZE);
            }
        },
        err_fn,
        None,
    )?;

    stream.play()?;

    Ok((stream, sample_rate_val))
}

/// Finds the best supported audio configuration for the target sample rate.
///
/// Only 32-bit float formats qualify. Mono is preferred, then the range
/// closest to the target rate; a range containing the target counts as
/// an exact match.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.sample_format() == cpal::SampleFormat::F32)
        .min_by_key(|c| {
            let min = c.min_sample_rate().0;
            let max = c.max_sample_rate().0;
            let rate_diff = if (min..=max).contains(&target_rate) {
                0
            } else {
                (min as i64 - target_rate as i64).abs().min((max as i64 - target_rate as i64).abs())
            };
            (c.channels() != 1, rate_diff)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpal::{SampleFormat, SampleRate, SupportedBufferSize};

    fn range(
        channels: u16,
        min: u32,
        max: u32,
        format: SampleFormat,
    ) -> SupportedStreamConfigRange {
        SupportedStreamConfigRange::new(
            channels,
            SampleRate(min),
            SampleRate(max),
            SupportedBufferSize::Unknown,
            format,
        )
    }

    #[test]
    fn prefers_mono_float_covering_target_rate() {
        let configs = vec![
            range(2, 8000, 96000, SampleFormat::F32),
            range(1, 48000, 48000, SampleFormat::F32),
            range(1, 8000, 96000, SampleFormat::I16),
            range(1, 44100, 44100, SampleFormat::F32),
        ];
        let chosen = find_supported_config(configs, 44100).unwrap();
        assert_eq!(chosen.channels(), 1);
        assert_eq!(chosen.min_sample_rate().0, 44100);
        assert_eq!(chosen.sample_format(), SampleFormat::F32);
    }

    #[test]
    fn falls_back_to_stereo() {
        let configs = vec![range(2, 44100, 48000, SampleFormat::F32)];
        assert_eq!(find_supported_config(configs, 44100).unwrap().channels(), 2);
    }

    #[test]
    fn no_float_format_is_none() {
        let configs = vec![range(1, 44100, 44100, SampleFormat::I16)];
        assert!(find_supported_config(configs, 44100).is_none());
    }
}
