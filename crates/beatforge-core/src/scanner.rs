use crate::config::{ConfigError, ScannerConfig};
use crate::params::PlaybackParams;
use beatforge_domain_chart::{Note, TempoMap, BEAT_EPSILON};
use beatforge_ports::clock::Clock;
use beatforge_ports::playback::PlaybackState;
use beatforge_ports::types::{Beat, Lane, Millis};
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Anything with a beat position the scanner can schedule.
pub trait ScanEvent: Copy + Send + Sync + 'static {
    fn beat(&self) -> Beat;

    fn lane(&self) -> Option<Lane> {
        None
    }
}

impl ScanEvent for Beat {
    fn beat(&self) -> Beat {
        *self
    }
}

impl ScanEvent for Note {
    fn beat(&self) -> Beat {
        self.beat
    }

    fn lane(&self) -> Option<Lane> {
        Some(self.lane)
    }
}

/// Sound output for due events. Must not block; false means the hit was not voiced.
pub trait Trigger: Send + Sync {
    fn trigger(&self, lane: Option<Lane>) -> bool;
}

/// Observer of one scanner. Every poll tick that has events left is bracketed by
/// `scan_begin` and `scan_finish`; hits arrive in beat order in between.
/// All calls happen on the scan thread.
pub trait ScanHooks<E>: Send {
    fn scan_begin(&mut self) {}

    fn on_late_hit(&mut self, _event: &E, _played: bool) {}

    fn on_hit(&mut self, _event: &E, _played: bool) {}

    fn scan_finish(&mut self) {}
}

pub struct NoHooks;

impl<E> ScanHooks<E> for NoHooks {}

#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    #[error("failed to spawn scan thread: {0}")]
    Spawn(#[from] std::io::Error),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    pub late: usize,
    pub on_time: usize,
    pub dropped: usize,
}

/// State of one scan: the event snapshot, its tempo map, a forward-only cursor and
/// the song clock.
pub struct ScanSession<E> {
    events: Arc<[E]>,
    tempo: Arc<TempoMap>,
    cursor: usize,
    anchor_elapsed: Duration,
    anchor_ms: Millis,
    scale: f64,
}

impl<E: ScanEvent> ScanSession<E> {
    /// `events` must be sorted by beat. The cursor starts at the first event at or
    /// after the beat of `offset_ms`.
    pub fn new(
        events: Arc<[E]>,
        tempo: Arc<TempoMap>,
        offset_ms: Millis,
        started_at: Duration,
        scale: f64,
    ) -> Self {
        let start_beat = tempo.time_to_beat(offset_ms);
        let cursor = events.partition_point(|event| event.beat() < start_beat - BEAT_EPSILON);
        Self {
            events,
            tempo,
            cursor,
            anchor_elapsed: started_at,
            anchor_ms: offset_ms,
            scale,
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.events.len()
    }

    /// Song position at clock reading `now`. A changed `scale` only applies from `now` on.
    pub fn song_time(&mut self, now: Duration, scale: f64) -> Millis {
        if scale != self.scale {
            self.anchor_ms = self.position_at(now);
            self.anchor_elapsed = now;
            self.scale = scale;
        }
        self.position_at(now)
    }

    fn position_at(&self, now: Duration) -> Millis {
        let elapsed = now.saturating_sub(self.anchor_elapsed);
        self.anchor_ms + elapsed.as_secs_f64() * 1000.0 * self.scale
    }

    fn due_time(&self, idx: usize) -> Option<(E, Millis)> {
        let event = *self.events.get(idx)?;
        Some((event, self.tempo.beat_to_time(event.beat())))
    }

    /// One scheduling step at song time `current_ms`. Events left behind by a stalled
    /// tick fire as late hits before anything fires on time.
    pub fn poll(
        &mut self,
        current_ms: Millis,
        config: &ScannerConfig,
        trigger: &dyn Trigger,
        hooks: &mut dyn ScanHooks<E>,
    ) -> TickReport {
        let mut report = TickReport::default();
        if self.is_finished() {
            return report;
        }

        hooks.scan_begin();

        while let Some((event, due)) = self.due_time(self.cursor) {
            if current_ms - due < config.late_threshold_ms {
                break;
            }
            let played = trigger.trigger(event.lane());
            if !played {
                report.dropped += 1;
                tracing::debug!(beat = event.beat(), "late hit dropped, no free voice");
            }
            tracing::debug!(beat = event.beat(), late_by_ms = current_ms - due, "late hit");
            hooks.on_late_hit(&event, played);
            report.late += 1;
            self.cursor += 1;
        }

        while let Some((event, due)) = self.due_time(self.cursor) {
            if (current_ms - due).abs() >= config.detection_delta_ms {
                break;
            }
            let played = trigger.trigger(event.lane());
            if !played {
                report.dropped += 1;
                tracing::debug!(beat = event.beat(), "hit dropped, no free voice");
            }
            hooks.on_hit(&event, played);
            report.on_time += 1;
            self.cursor += 1;
        }

        hooks.scan_finish();
        report
    }
}

struct ActiveScan {
    stop_tx: mpsc::Sender<()>,
    join_handle: Option<JoinHandle<()>>,
    running: Arc<AtomicBool>,
}

impl ActiveScan {
    fn stop(mut self) {
        let _ = self.stop_tx.send(());
        if let Some(handle) = self.join_handle.take() {
            let _ = handle.join();
        }
    }
}

/// Runs one [`ScanSession`] at a time on a background thread.
pub struct BeatScanner<E: ScanEvent> {
    config: ScannerConfig,
    clock: Arc<dyn Clock>,
    trigger: Arc<dyn Trigger>,
    hooks: Arc<Mutex<Box<dyn ScanHooks<E>>>>,
    params: Arc<PlaybackParams>,
    active: Option<ActiveScan>,
    stopped: bool,
}

impl<E: ScanEvent> BeatScanner<E> {
    pub fn new(
        config: ScannerConfig,
        clock: Arc<dyn Clock>,
        trigger: Arc<dyn Trigger>,
        hooks: Box<dyn ScanHooks<E>>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            clock,
            trigger,
            hooks: Arc::new(Mutex::new(hooks)),
            params: Arc::new(PlaybackParams::default()),
            active: None,
            stopped: false,
        })
    }

    /// Share tempo scale with other scanners.
    pub fn with_params(mut self, params: Arc<PlaybackParams>) -> Self {
        self.params = params;
        self
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    pub fn set_tempo_scale(&self, factor: f64) -> bool {
        self.params.set_tempo_scale(factor)
    }

    pub fn state(&self) -> PlaybackState {
        match &self.active {
            Some(scan) if scan.running.load(Ordering::Acquire) => PlaybackState::Scanning,
            _ if self.stopped => PlaybackState::Stopped,
            _ => PlaybackState::Idle,
        }
    }

    /// Stops any running session, then scans `events` from song time `offset_ms`.
    pub fn start(
        &mut self,
        offset_ms: Millis,
        events: &[E],
        tempo: Arc<TempoMap>,
    ) -> Result<(), ScanError> {
        self.stop();

        let mut sorted = events.to_vec();
        sorted.sort_by(|a, b| a.beat().total_cmp(&b.beat()));
        let mut session = ScanSession::new(
            Arc::from(sorted),
            tempo,
            offset_ms,
            self.clock.now(),
            self.params.tempo_scale(),
        );

        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let running = Arc::new(AtomicBool::new(true));
        let config = self.config;
        let clock = self.clock.clone();
        let trigger = self.trigger.clone();
        let hooks = self.hooks.clone();
        let params = self.params.clone();
        let thread_running = running.clone();

        tracing::debug!(offset_ms, cursor = session.cursor(), "scan started");
        let join_handle = thread::Builder::new()
            .name("beat-scanner".to_string())
            .spawn(move || {
                let interval = config.poll_interval();
                loop {
                    let outcome = catch_unwind(AssertUnwindSafe(|| {
                        let current_ms = session.song_time(clock.now(), params.tempo_scale());
                        let mut hooks = hooks.lock();
                        session.poll(current_ms, &config, &*trigger, &mut **hooks)
                    }));
                    if let Err(panic) = outcome {
                        tracing::error!(reason = %panic_message(&*panic), "scan tick panicked");
                    }
                    if session.is_finished() {
                        tracing::debug!("scan reached the last event");
                        break;
                    }
                    match stop_rx.recv_timeout(interval) {
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                        Err(RecvTimeoutError::Timeout) => {}
                    }
                }
                thread_running.store(false, Ordering::Release);
            })?;

        self.active = Some(ActiveScan {
            stop_tx,
            join_handle: Some(join_handle),
            running,
        });
        self.stopped = false;
        Ok(())
    }

    /// Cancels the session and waits for an in-flight tick. No-op when idle.
    pub fn stop(&mut self) {
        if let Some(scan) = self.active.take() {
            scan.stop();
            self.stopped = true;
            tracing::debug!("scan stopped");
        }
    }
}

impl<E: ScanEvent> Drop for BeatScanner<E> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
