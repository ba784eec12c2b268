//! # Note Mapping Module
//!
//! Maps a frequency to the nearest note of the twelve-tone equal-tempered
//! scale and measures the deviation in cents.
//!
//! ## Features
//! - Configurable reference pitch (A4 = 440 Hz by default)
//! - Ties at exactly half a semitone resolve to the lower note
//! - Correct pitch class and octave for notes far below A4
//! - A-relative or scientific (C-relative) octave numbering

use serde::{Deserialize, Serialize};
use std::fmt;

/// Standard concert pitch for A4.
pub const A4_HZ: f32 = 440.0;

/// The twelve pitch classes, starting at C.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PitchClass {
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

impl PitchClass {
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::CSharp,
        PitchClass::D,
        PitchClass::DSharp,
        PitchClass::E,
        PitchClass::F,
        PitchClass::FSharp,
        PitchClass::G,
        PitchClass::GSharp,
        PitchClass::A,
        PitchClass::ASharp,
        PitchClass::B,
    ];

    /// Position of A within [`PitchClass::ALL`].
    const A_INDEX: i32 = 9;

    /// Sharp-spelled name, e.g. `"C#"`.
    pub fn name(self) -> &'static str {
        const NOTE_NAMES: [&str; 12] = [
            "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
        ];
        NOTE_NAMES[self as usize]
    }

    /// Pitch class of a note a signed number of semitones away from A.
    pub fn from_semitones_from_a(semitones: i32) -> Self {
        Self::ALL[(semitones + Self::A_INDEX).rem_euclid(12) as usize]
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where octave numbers change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OctaveNumbering {
    /// `floor(semitones / 12) + 4`: octaves change between G# and A.
    #[default]
    FromA,
    /// Scientific pitch notation: octaves change between B and C.
    Scientific,
}

impl OctaveNumbering {
    fn octave(self, semitones_from_a4: i32) -> i32 {
        match self {
            OctaveNumbering::FromA => semitones_from_a4.div_euclid(12) + 4,
            OctaveNumbering::Scientific => {
                (semitones_from_a4 + PitchClass::A_INDEX).div_euclid(12) + 4
            }
        }
    }
}

/// The nearest equal-tempered note to a frequency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteMatch {
    pub pitch_class: PitchClass,
    pub octave: i32,
    /// Signed deviation from the note, in `(-50, +50]`.
    pub cents_offset: f32,
    /// Semitones between the note and the reference A4.
    pub semitones_from_a4: i32,
}

impl NoteMatch {
    /// Note name and octave, e.g. `"A4"` or `"C#3"`.
    pub fn label(&self) -> String {
        format!("{}{}", self.pitch_class, self.octave)
    }
}

impl fmt::Display for NoteMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.pitch_class, self.octave)
    }
}

/// Signed distance in (fractional) semitones from `reference_hz`.
pub fn semitones_from_reference(freq: f32, reference_hz: f32) -> f64 {
    12.0 * (f64::from(freq) / f64::from(reference_hz)).log2()
}

/// Calculates the deviation from a target frequency in cents.
///
/// Positive values are sharp, negative values flat.
pub fn calculate_cents_deviation(freq: f32, target_freq: f32) -> f32 {
    (1200.0 * (f64::from(freq) / f64::from(target_freq)).log2()) as f32
}

/// Frequency of the note `semitones` away from `reference_hz`.
pub fn frequency_of(semitones: i32, reference_hz: f32) -> f32 {
    (f64::from(reference_hz) * 2f64.powf(f64::from(semitones) / 12.0)) as f32
}

/// Nearest integer, with exact halves going down.
fn round_half_down(x: f64) -> f64 {
    (x - 0.5).ceil()
}

/// Frequency to note mapper.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteMapper {
    reference_hz: f32,
    numbering: OctaveNumbering,
}

impl Default for NoteMapper {
    fn default() -> Self {
        Self::new(A4_HZ, OctaveNumbering::default())
    }
}

impl NoteMapper {
    /// Creates a mapper.
    ///
    /// # Arguments
    /// * `reference_hz` - Frequency of A4 in Hz
    /// * `numbering` - Where octave numbers change
    pub fn new(reference_hz: f32, numbering: OctaveNumbering) -> Self {
        Self {
            reference_hz,
            numbering,
        }
    }

    /// Finds the closest note to `freq`.
    ///
    /// Returns `None` unless `freq` is finite and positive.
    pub fn map(&self, freq: f32) -> Option<NoteMatch> {
        if !freq.is_finite() || freq <= 0.0 {
            return None;
        }
        let semitones = semitones_from_reference(freq, self.reference_hz);
        if !semitones.is_finite() {
            return None;
        }
        let rounded = round_half_down(semitones);
        let cents_offset = (100.0 * (semitones - rounded)) as f32;
        // |semitones| is bounded by a few thousand for any finite f32.
        let rounded = rounded as i32;

        Some(NoteMatch {
            pitch_class: PitchClass::from_semitones_from_a(rounded),
            octave: self.numbering.octave(rounded),
            cents_offset,
            semitones_from_a4: rounded,
        })
    }

    /// Target frequency of a note under this mapper's reference.
    pub fn frequency_of(&self, note: &NoteMatch) -> f32 {
        frequency_of(note.semitones_from_a4, self.reference_hz)
    }
}

/// Maps a frequency against A4 = 440 Hz with A-relative octaves.
pub fn map_to_note(freq: f32) -> Option<NoteMatch> {
    NoteMapper::default().map(freq)
}
