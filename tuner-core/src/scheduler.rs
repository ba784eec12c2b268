//! # Frame Scheduler
//!
//! Pull-based driver for the per-frame pipeline. A [`FrameStream`] pulls one
//! window at a time from any source, analyzes it completely and yields the
//! result, for as long as its [`ListeningFlag`] is set. Clearing the flag
//! ends the stream at the next frame boundary; a frame that has started is
//! always finished before the stream observes the flag.

use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::analysis::{Analyzer, TuningReading};
use crate::error::Result;
use crate::window::SampleWindow;

/// Shared on/off switch for a listening session.
///
/// Clones observe the same flag, so a capture thread, a signal handler or
/// the display can all stop the session.
#[derive(Debug, Clone, Default)]
pub struct ListeningFlag(Arc<AtomicBool>);

impl ListeningFlag {
    /// Creates a flag in the given state.
    pub fn new(listening: bool) -> Self {
        Self(Arc::new(AtomicBool::new(listening)))
    }

    /// Resumes listening for streams created afterwards.
    pub fn start(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Ends every stream at its next frame boundary.
    pub fn stop(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    /// Current state of the flag.
    pub fn is_listening(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Lazy sequence of frame results, one per window pulled from `windows`.
pub struct FrameStream<'a, I> {
    analyzer: &'a Analyzer,
    windows: I,
    flag: ListeningFlag,
    finished: bool,
}

impl<I: Iterator<Item = SampleWindow>> Iterator for FrameStream<'_, I> {
    type Item = Result<TuningReading>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished || !self.flag.is_listening() {
            self.finished = true;
            return None;
        }
        let Some(window) = self.windows.next() else {
            self.finished = true;
            return None;
        };
        // The flag may have been cleared while the source was waiting.
        if !self.flag.is_listening() {
            self.finished = true;
            return None;
        }
        Some(self.analyzer.analyze(&window))
    }
}

/// Counters for one listening session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    /// Windows analyzed.
    pub frames: usize,
    /// Frames that produced a reading.
    pub readings: usize,
    /// Frames skipped because no pitch was found.
    pub skipped: usize,
}

/// Owns the pipeline and the listening flag of a session.
pub struct Scheduler {
    analyzer: Analyzer,
    flag: ListeningFlag,
}

impl Scheduler {
    /// A scheduler whose flag starts set.
    pub fn new(analyzer: Analyzer) -> Self {
        Self::with_flag(analyzer, ListeningFlag::new(true))
    }

    /// A scheduler controlled by an existing flag.
    pub fn with_flag(analyzer: Analyzer, flag: ListeningFlag) -> Self {
        Self { analyzer, flag }
    }

    /// The flag shared by every stream of this scheduler.
    pub fn flag(&self) -> &ListeningFlag {
        &self.flag
    }

    /// Starts a new lazy stream over `windows`.
    ///
    /// Streams are independent, so a finished session can be restarted by
    /// setting the flag again and calling this with a fresh source.
    pub fn frames<I>(&self, windows: I) -> FrameStream<'_, I::IntoIter>
    where
        I: IntoIterator<Item = SampleWindow>,
    {
        FrameStream {
            analyzer: &self.analyzer,
            windows: windows.into_iter(),
            flag: self.flag.clone(),
            finished: false,
        }
    }

    /// Drains `windows`, handing every reading to `sink`.
    pub fn run<I, F>(&self, windows: I, mut sink: F) -> SessionSummary
    where
        I: IntoIterator<Item = SampleWindow>,
        F: FnMut(&TuningReading),
    {
        info!("listening session started");
        let mut summary = SessionSummary::default();
        for result in self.frames(windows) {
            summary.frames += 1;
            match result {
                Ok(reading) => {
                    summary.readings += 1;
                    sink(&reading);
                }
                Err(e) if !e.is_fatal() => {
                    summary.skipped += 1;
                }
                Err(e) => {
                    warn!("frame skipped: {}", e);
                    summary.skipped += 1;
                }
            }
        }
        info!(
            frames = summary.frames,
            readings = summary.readings,
            skipped = summary.skipped,
            "listening session finished"
        );
        summary
    }
}

/// Window source backed by a crossbeam channel.
///
/// Waits at most `poll_interval` at a time, so a cleared flag ends the
/// source even if the producer has gone quiet.
pub struct ChannelSource {
    receiver: Receiver<SampleWindow>,
    flag: ListeningFlag,
    poll_interval: Duration,
}

impl ChannelSource {
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(16);

    /// Source polling every [`Self::DEFAULT_POLL_INTERVAL`].
    pub fn new(receiver: Receiver<SampleWindow>, flag: ListeningFlag) -> Self {
        Self::with_poll_interval(receiver, flag, Self::DEFAULT_POLL_INTERVAL)
    }

    /// Source polling every `poll_interval`.
    pub fn with_poll_interval(
        receiver: Receiver<SampleWindow>,
        flag: ListeningFlag,
        poll_interval: Duration,
    ) -> Self {
        Self {
            receiver,
            flag,
            poll_interval,
        }
    }
}

impl Iterator for ChannelSource {
    type Item = SampleWindow;

    fn next(&mut self) -> Option<SampleWindow> {
        loop {
            if !self.flag.is_listening() {
                return None;
            }
            match self.receiver.recv_timeout(self.poll_interval) {
                Ok(window) => return Some(window),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    debug!("window channel closed");
                    return None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TunerError;
    use crate::window::test_signals::{constant_window, sine_window};
    use std::thread;

    fn mixed_windows() -> Vec<SampleWindow> {
        vec![
            sine_window(440.0, 100.0, 44100),
            constant_window(128, 44100),
            sine_window(329.63, 100.0, 44100),
        ]
    }

    #[test]
    fn yields_one_result_per_window() {
        let scheduler = Scheduler::new(Analyzer::default());
        let results: Vec<_> = scheduler.frames(mixed_windows()).collect();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().note_label(), "A4");
        assert!(matches!(results[1], Err(TunerError::NoPitchFound)));
        assert_eq!(results[2].as_ref().unwrap().note.pitch_class.name(), "E");
    }

    #[test]
    fn cleared_flag_yields_nothing() {
        let scheduler = Scheduler::with_flag(Analyzer::default(), ListeningFlag::new(false));
        assert_eq!(scheduler.frames(mixed_windows()).count(), 0);
    }

    #[test]
    fn clearing_the_flag_stops_at_frame_boundary() {
        let scheduler = Scheduler::new(Analyzer::default());
        let flag = scheduler.flag().clone();
        let mut stream = scheduler.frames(mixed_windows());
        assert!(stream.next().unwrap().is_ok());
        flag.stop();
        assert!(stream.next().is_none());
        // Stays finished even if listening resumes.
        flag.start();
        assert!(stream.next().is_none());
    }

    #[test]
    fn sessions_restart_with_a_fresh_stream() {
        let scheduler = Scheduler::new(Analyzer::default());
        scheduler.flag().stop();
        assert_eq!(scheduler.frames(mixed_windows()).count(), 0);
        scheduler.flag().start();
        assert_eq!(scheduler.frames(mixed_windows()).count(), 3);
    }

    #[test]
    fn run_counts_readings_and_skips() {
        let scheduler = Scheduler::new(Analyzer::default());
        let mut labels = Vec::new();
        let summary = scheduler.run(mixed_windows(), |reading| labels.push(reading.note_label()));
        assert_eq!(
            summary,
            SessionSummary {
                frames: 3,
                readings: 2,
                skipped: 1
            }
        );
        assert_eq!(labels.len(), 2);
    }

    #[test]
    fn sink_can_stop_the_session() {
        let scheduler = Scheduler::new(Analyzer::default());
        let flag = scheduler.flag().clone();
        let summary = scheduler.run(mixed_windows(), |_| flag.stop());
        assert_eq!(summary.frames, 1);
    }

    #[test]
    fn channel_source_ends_when_sender_drops() {
        let (tx, rx) = crossbeam_channel::unbounded();
        tx.send(sine_window(440.0, 100.0, 44100)).unwrap();
        drop(tx);
        let flag = ListeningFlag::new(true);
        let scheduler = Scheduler::with_flag(Analyzer::default(), flag.clone());
        let source = ChannelSource::new(rx, flag);
        let summary = scheduler.run(source, |_| {});
        assert_eq!(summary.readings, 1);
    }

    #[test]
    fn channel_source_observes_flag_while_idle() {
        let (tx, rx) = crossbeam_channel::unbounded::<SampleWindow>();
        let flag = ListeningFlag::new(true);
        let mut source =
            ChannelSource::with_poll_interval(rx, flag.clone(), Duration::from_millis(5));
        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            flag.stop();
        });
        assert!(source.next().is_none());
        stopper.join().unwrap();
        drop(tx);
    }
}
