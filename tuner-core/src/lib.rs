// tuner-core/src/lib.rs

//! The core logic for the instrument tuner.
//! This crate is responsible for pitch detection on fixed-size sample
//! windows, mapping frequencies to equal-tempered notes and classifying
//! the deviation for a tuning needle. It is completely headless and
//! contains no display code.
//!
//! A frame flows through [`pitch`] → [`note`] → [`classifier`], wrapped
//! by [`analysis::Analyzer`] and driven by [`scheduler::Scheduler`].

pub mod analysis;
pub mod audio;
pub mod classifier;
pub mod config;
pub mod error;
pub mod fft;
pub mod note;
pub mod pitch;
pub mod scheduler;
pub mod window;

pub use analysis::{Analyzer, TuningReading};
pub use classifier::{TuningIndicator, TuningZone, classify};
pub use config::{EstimatorKind, TunerConfig};
pub use error::{Result, TunerError};
pub use note::{NoteMatch, PitchClass, map_to_note};
pub use pitch::{PitchEstimate, PitchEstimator, estimate};
pub use scheduler::{ChannelSource, FrameStream, ListeningFlag, Scheduler, SessionSummary};
pub use window::{SampleWindow, WINDOW_SIZE};
