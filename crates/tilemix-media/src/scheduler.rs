// crates/tilemix-media/src/scheduler.rs
//
// Playback scheduling for both mosaic pipelines.
//
// Video is cooperative and single-threaded: the app shell polls a
// FrameCadence once per UI pass and calls render_tick when a redraw is due
// (or immediately after a navigation command). The cadence re-arms
// unconditionally, so a failed tick skips one redraw and nothing else.
//
// Audio runs on a dedicated thread owned by AudioLoop: regenerate a
// shuffled stream, hand it to the sink, then block for the stream's
// playback length before regenerating. Stopping is cooperative — the
// controlling thread flips the shared flag, wakes the pacing wait through
// a channel, and silences the sink immediately; the loop thread exits at
// its next iteration boundary.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use tilemix_core::audio::SegmentSet;
use tilemix_core::blur::blur_frame;
use tilemix_core::frame::Frame;
use tilemix_core::media_types::{AudioSink, FrameSource, MediaError};
use tilemix_core::mosaic::mosaic_frame;
use tilemix_core::session::MosaicConfig;

/// Re-arm interval when a stream came out empty (a session whose clips all
/// lack audio). Keeps the loop responsive to stop without spinning.
const EMPTY_REARM: Duration = Duration::from_millis(50);

// ── Video tick ────────────────────────────────────────────────────────────────

/// One pass of the video pipeline: decode the frame at `at_secs`, shuffle
/// its tiles, optionally soften the result. Pure with respect to everything
/// but `rng` — the caller owns position state and the display.
pub fn render_tick(
    source:  &dyn FrameSource,
    at_secs: f64,
    config:  &MosaicConfig,
    rng:     &mut impl Rng,
) -> Result<Frame, MediaError> {
    let decoded  = source.frame_at(at_secs)?;
    let shuffled = mosaic_frame(&decoded, &config.grid, rng);
    Ok(match config.blur_kernel {
        Some(kernel) => blur_frame(&shuffled, kernel),
        None         => shuffled,
    })
}

/// Periodic redraw timer for the video loop. Pure Instant arithmetic —
/// the caller supplies `now`, so tests never sleep.
pub struct FrameCadence {
    interval: Duration,
    next_due: Option<Instant>,
}

impl FrameCadence {
    pub fn new(interval: Duration) -> Self {
        Self { interval, next_due: None }
    }

    /// Arm the timer; the first tick is due immediately.
    pub fn arm(&mut self, now: Instant) {
        self.next_due = Some(now);
    }

    pub fn disarm(&mut self) {
        self.next_due = None;
    }

    pub fn armed(&self) -> bool {
        self.next_due.is_some()
    }

    /// True when a redraw is due. Always re-arms for one interval from
    /// `now`, whether or not the caller's tick then succeeds — a transient
    /// decode failure must never stall the cadence.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.next_due {
            Some(due) if now >= due => {
                self.next_due = Some(now + self.interval);
                true
            }
            _ => false,
        }
    }

    /// Time remaining until the next tick, if armed. Lets the shell ask its
    /// event loop for a wakeup instead of polling hot.
    pub fn until_due(&self, now: Instant) -> Option<Duration> {
        self.next_due.map(|due| due.saturating_duration_since(now))
    }
}

// ── Audio loop ────────────────────────────────────────────────────────────────

/// The continuous audio remix: {Idle → Playing (start) → Idle (stop)}.
///
/// While Playing, the loop thread repeatedly concatenates a fresh random
/// permutation of the segment set, submits it to the sink, and waits out
/// the stream's playback length so submissions never overlap. Stream
/// exhaustion is not a state change — it just begins the next iteration.
pub struct AudioLoop {
    playing: Arc<AtomicBool>,
    stop_tx: Option<Sender<()>>,
    sink:    Option<Arc<dyn AudioSink>>,
    handle:  Option<JoinHandle<()>>,
}

impl AudioLoop {
    pub fn new() -> Self {
        Self {
            playing: Arc::new(AtomicBool::new(false)),
            stop_tx: None,
            sink:    None,
            handle:  None,
        }
    }

    /// True between a start and the matching stop (or a sink failure).
    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    /// Launch the loop over `segments`. An already-running loop is stopped
    /// first, so start doubles as restart-with-new-material.
    ///
    /// `seed` pins the permutation sequence; None draws from entropy.
    pub fn start(&mut self, segments: SegmentSet, sink: Arc<dyn AudioSink>, seed: Option<u64>) {
        self.stop();

        let (stop_tx, stop_rx) = bounded::<()>(1);
        self.playing.store(true, Ordering::SeqCst);

        let playing     = Arc::clone(&self.playing);
        let thread_sink = Arc::clone(&sink);
        let handle = thread::spawn(move || {
            let mut rng = match seed {
                Some(s) => StdRng::seed_from_u64(s),
                None    => StdRng::from_entropy(),
            };
            while playing.load(Ordering::SeqCst) {
                let stream = segments.mix(&mut rng);
                if let Err(e) = thread_sink.play(&stream, segments.spec()) {
                    log::warn!("[audio] {e} — leaving the loop");
                    break;
                }

                // Pace: block until the stream has had time to play out.
                // The stop channel doubles as the wakeup, so a stop command
                // interrupts the wait instead of riding it out.
                let mut span = segments.spec().duration_of(stream.len());
                if span.is_zero() {
                    span = EMPTY_REARM;
                }
                match stop_rx.recv_timeout(span) {
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    Err(RecvTimeoutError::Timeout) => {}
                }
            }
            playing.store(false, Ordering::SeqCst);
        });

        self.stop_tx = Some(stop_tx);
        self.sink    = Some(sink);
        self.handle  = Some(handle);
    }

    /// Stop the loop and silence the sink immediately. Idempotent, and a
    /// harmless no-op when nothing is playing.
    pub fn stop(&mut self) {
        self.playing.store(false, Ordering::SeqCst);
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.try_send(());
        }
        if let Some(sink) = self.sink.take() {
            sink.stop_all();
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Default for AudioLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AudioLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tilemix_core::audio::{AudioBuffer, AudioSpec};
    use tilemix_core::mosaic::GridSpec;

    // ── Test doubles ─────────────────────────────────────────────────────────

    /// Records every stream it is handed; optionally rejects them all.
    struct RecordingSink {
        streams: Mutex<Vec<Vec<u8>>>,
        stopped: AtomicBool,
        fail:    bool,
    }

    impl RecordingSink {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                streams: Mutex::new(Vec::new()),
                stopped: AtomicBool::new(false),
                fail,
            })
        }

        fn stream_count(&self) -> usize {
            self.streams.lock().unwrap().len()
        }
    }

    impl AudioSink for RecordingSink {
        fn play(&self, pcm: &[u8], _spec: AudioSpec) -> Result<(), MediaError> {
            if self.fail {
                return Err(MediaError::Sink("device gone".into()));
            }
            self.streams.lock().unwrap().push(pcm.to_vec());
            Ok(())
        }

        fn stop_all(&self) {
            self.stopped.store(true, Ordering::SeqCst);
        }
    }

    struct SolidSource(Frame);

    impl FrameSource for SolidSource {
        fn frame_at(&self, _secs: f64) -> Result<Frame, MediaError> {
            Ok(self.0.clone())
        }
    }

    struct BrokenSource;

    impl FrameSource for BrokenSource {
        fn frame_at(&self, secs: f64) -> Result<Frame, MediaError> {
            Err(MediaError::Decode(format!("no frame at {secs}")))
        }
    }

    /// Mono 8-bit at 1 kHz: 1 byte per millisecond.
    fn short_segments(len_ms: usize, segment_ms: u64) -> SegmentSet {
        let spec = AudioSpec { sample_rate: 1000, channels: 1, bits_per_sample: 8 };
        let buf  = AudioBuffer::new(spec, (0..len_ms).map(|i| i as u8).collect());
        SegmentSet::split(&buf, Duration::from_millis(segment_ms))
    }

    fn wait_until(deadline_ms: u64, mut done: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_millis(deadline_ms);
        while Instant::now() < deadline {
            if done() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        done()
    }

    // ── AudioLoop ────────────────────────────────────────────────────────────

    #[test]
    fn loop_resubmits_fresh_streams_until_stopped() {
        let sink = RecordingSink::new(false);
        let mut audio = AudioLoop::new();
        audio.start(short_segments(40, 10), Arc::clone(&sink) as Arc<dyn AudioSink>, Some(1));

        assert!(audio.is_playing());
        assert!(wait_until(1000, || sink.stream_count() >= 2));
        audio.stop();

        assert!(!audio.is_playing());
        assert!(sink.stopped.load(Ordering::SeqCst));
        // Every submission is the full remix, never a partial stream.
        for s in sink.streams.lock().unwrap().iter() {
            assert_eq!(s.len(), 40);
        }
    }

    #[test]
    fn stop_on_idle_loop_is_a_no_op() {
        let mut audio = AudioLoop::new();
        audio.stop();
        audio.stop();
        assert!(!audio.is_playing());
    }

    #[test]
    fn sink_failure_returns_the_loop_to_idle() {
        let sink = RecordingSink::new(true);
        let mut audio = AudioLoop::new();
        audio.start(short_segments(40, 10), sink as Arc<dyn AudioSink>, Some(2));
        assert!(wait_until(1000, || !audio.is_playing()));
    }

    #[test]
    fn same_seed_plays_the_same_first_remix() {
        let a = RecordingSink::new(false);
        let b = RecordingSink::new(false);
        let mut la = AudioLoop::new();
        let mut lb = AudioLoop::new();
        la.start(short_segments(60, 10), Arc::clone(&a) as Arc<dyn AudioSink>, Some(77));
        lb.start(short_segments(60, 10), Arc::clone(&b) as Arc<dyn AudioSink>, Some(77));
        assert!(wait_until(1000, || a.stream_count() >= 1 && b.stream_count() >= 1));
        la.stop();
        lb.stop();
        assert_eq!(
            a.streams.lock().unwrap()[0],
            b.streams.lock().unwrap()[0],
        );
    }

    #[test]
    fn restart_swaps_material_without_an_explicit_stop() {
        let sink = RecordingSink::new(false);
        let mut audio = AudioLoop::new();
        audio.start(short_segments(40, 10), Arc::clone(&sink) as Arc<dyn AudioSink>, Some(3));
        audio.start(short_segments(20, 10), Arc::clone(&sink) as Arc<dyn AudioSink>, Some(3));
        assert!(audio.is_playing());
        assert!(wait_until(1000, || {
            sink.streams.lock().unwrap().iter().any(|s| s.len() == 20)
        }));
        audio.stop();
    }

    #[test]
    fn empty_material_keeps_the_loop_responsive_to_stop() {
        let spec = AudioSpec { sample_rate: 1000, channels: 1, bits_per_sample: 8 };
        let set  = SegmentSet::split(&AudioBuffer::empty(spec), Duration::from_millis(500));
        let sink = RecordingSink::new(false);
        let mut audio = AudioLoop::new();
        audio.start(set, sink as Arc<dyn AudioSink>, None);
        assert!(audio.is_playing());
        audio.stop();
        assert!(!audio.is_playing());
    }

    // ── FrameCadence ─────────────────────────────────────────────────────────

    #[test]
    fn cadence_fires_immediately_on_arm_then_waits_an_interval() {
        let mut cadence = FrameCadence::new(Duration::from_millis(1000));
        let t0 = Instant::now();
        assert!(!cadence.poll(t0));

        cadence.arm(t0);
        assert!(cadence.poll(t0));
        assert!(!cadence.poll(t0 + Duration::from_millis(500)));
        assert!(cadence.poll(t0 + Duration::from_millis(1000)));
    }

    #[test]
    fn cadence_rearms_even_when_the_caller_tick_fails() {
        let mut cadence = FrameCadence::new(Duration::from_millis(1000));
        let t0 = Instant::now();
        cadence.arm(t0);
        assert!(cadence.poll(t0));
        // The caller's render failed; the cadence neither knows nor cares.
        assert!(cadence.poll(t0 + Duration::from_millis(1001)));
        assert!(cadence.until_due(t0 + Duration::from_millis(1001)).is_some());
    }

    #[test]
    fn disarm_silences_the_cadence() {
        let mut cadence = FrameCadence::new(Duration::from_millis(10));
        let t0 = Instant::now();
        cadence.arm(t0);
        cadence.disarm();
        assert!(!cadence.armed());
        assert!(!cadence.poll(t0 + Duration::from_secs(10)));
        assert_eq!(cadence.until_due(t0), None);
    }

    // ── render_tick ──────────────────────────────────────────────────────────

    #[test]
    fn render_tick_produces_a_canvas_sized_frame() {
        let source = SolidSource(Frame::filled(64, 48, [120, 30, 200]));
        let config = MosaicConfig {
            grid: GridSpec::new(2, 1),
            blur_kernel: None,
            ..MosaicConfig::default()
        };
        let frame = render_tick(&source, 1.0, &config, &mut StdRng::seed_from_u64(4)).unwrap();
        assert_eq!((frame.width, frame.height), (64, 48));
    }

    #[test]
    fn render_tick_reports_decode_failures() {
        let config = MosaicConfig::default();
        let err = render_tick(&BrokenSource, 2.5, &config, &mut StdRng::seed_from_u64(0))
            .unwrap_err();
        assert!(matches!(err, MediaError::Decode(_)));
    }
}
