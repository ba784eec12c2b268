//! # Tuner Display
//!
//! Terminal rendering of tuning readings: a one-line needle meter with the
//! note and frequency, or one JSON object per reading for other programs.

use serde::Serialize;
use tuner_core::TuningReading;
use tuner_core::classifier::NEEDLE_MAX_DEGREES;

/// Width of the text meter, in characters. Odd so there is a centre mark.
const METER_WIDTH: usize = 41;

/// The fields a display collaborator consumes for one frame.
#[derive(Debug, Serialize)]
pub struct DisplayFrame<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_s: Option<f32>,
    /// Frequency rounded to one decimal.
    pub frequency_hz: f32,
    pub note: String,
    pub cents: f32,
    pub zone: tuner_core::TuningZone,
    pub color: &'a str,
    pub color_hex: String,
    pub needle_degrees: f32,
    pub feedback: &'a str,
}

impl<'a> DisplayFrame<'a> {
    /// Collects the display fields of a reading.
    pub fn new(reading: &'a TuningReading, time_s: Option<f32>) -> Self {
        let zone = reading.indicator.zone;
        Self {
            time_s,
            frequency_hz: (reading.frequency_hz * 10.0).round() / 10.0,
            note: reading.note_label(),
            cents: reading.note.cents_offset,
            zone,
            color: zone.color_name(),
            color_hex: zone.color().hex(),
            needle_degrees: reading.indicator.needle_degrees,
            feedback: reading.feedback(),
        }
    }
}

/// Draws the needle on a text dial, e.g. `[--------|---------]`.
pub fn render_meter(needle_degrees: f32) -> String {
    let clamped = needle_degrees.clamp(-NEEDLE_MAX_DEGREES, NEEDLE_MAX_DEGREES);
    let span = (METER_WIDTH - 1) as f32;
    let needle_pos =
        ((clamped + NEEDLE_MAX_DEGREES) / (2.0 * NEEDLE_MAX_DEGREES) * span).round() as usize;
    let centre = METER_WIDTH / 2;

    let dial: String = (0..METER_WIDTH)
        .map(|i| {
            if i == needle_pos {
                '|'
            } else if i == centre {
                '+'
            } else {
                '-'
            }
        })
        .collect();
    format!("[{dial}]")
}

/// One human-readable line for a reading.
pub fn render_line(reading: &TuningReading) -> String {
    format!(
        "{:<4} {:>10}  {:>+6.1} cents  {}  {} ({})",
        reading.note_label(),
        reading.display_frequency(),
        reading.note.cents_offset,
        render_meter(reading.indicator.needle_degrees),
        reading.indicator.zone,
        reading.indicator.zone.color_name(),
    )
}

/// Writes readings to stdout as text or JSON lines.
pub struct Display {
    json: bool,
}

impl Display {
    /// `json` selects JSON lines instead of the text meter.
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    /// Prints one reading, prefixed with its time offset if given.
    pub fn show(&self, reading: &TuningReading, time_s: Option<f32>) {
        if self.json {
            match serde_json::to_string(&DisplayFrame::new(reading, time_s)) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::warn!("Could not serialize reading: {}", e),
            }
        } else {
            match time_s {
                Some(t) => println!("{t:>8.3}s  {}", render_line(reading)),
                None => println!("{}", render_line(reading)),
            }
        }
    }

    /// Marks a frame without a pitch; text mode only.
    pub fn show_silence(&self, time_s: f32) {
        if !self.json {
            println!("{time_s:>8.3}s  --");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tuner_core::classifier::classify;
    use tuner_core::map_to_note;

    fn reading(freq: f32) -> TuningReading {
        let note = map_to_note(freq).unwrap();
        TuningReading {
            frequency_hz: freq,
            note,
            indicator: classify(note.cents_offset),
        }
    }

    #[test]
    fn centred_needle_sits_on_the_centre_mark() {
        let meter = render_meter(0.0);
        assert_eq!(meter.chars().count(), METER_WIDTH + 2);
        assert_eq!(meter.chars().nth(METER_WIDTH / 2 + 1), Some('|'));
        assert!(!meter.contains('+'));
    }

    #[test]
    fn needle_hits_the_ends_when_clamped() {
        assert!(render_meter(-30.0).starts_with("[|"));
        assert!(render_meter(90.0).ends_with("|]"));
        assert!(render_meter(10.0).contains('+'));
    }

    #[test]
    fn text_line_names_note_and_zone() {
        let line = render_line(&reading(440.0));
        assert!(line.starts_with("A4"));
        assert!(line.contains("440.0 Hz"));
        assert!(line.contains("in tune (green)"));
    }

    #[test]
    fn json_frame_rounds_frequency() {
        let r = reading(440.04);
        let value = serde_json::to_value(DisplayFrame::new(&r, None)).unwrap();
        assert_eq!(value["note"], "A4");
        assert_eq!(value["color"], "green");
        assert_eq!(value["color_hex"], "#2ecc71");
        assert!((value["frequency_hz"].as_f64().unwrap() - 440.0).abs() < 1e-4);
        assert!(value.get("time_s").is_none());
    }
}
