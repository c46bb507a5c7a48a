//! Playback session - canonical playback state on top of an asynchronous engine.
//!
//! **Architecture**: Session owns exactly one engine adapter at a time plus the
//! receiving end of the status channel. Commands go out fire-and-forget; the
//! engine's answer comes back later as an [`EngineEvent`] and is the only thing
//! allowed to rewrite [`PlaybackStatus`].
//!
//! **Used by**: Shell (event dispatch), UI (read-only snapshots)
//!
//! # Status flow
//!
//! ```text
//! UI event -> Shell -> session.toggle_play_pause() -> adapter.play()
//!                                                       |
//! UI frame <- session.status() <- session.pump() <- StatusSink (epoch-tagged)
//! ```
//!
//! # Epochs
//!
//! Each started adapter gets a fresh epoch from a monotonic counter. `pump()`
//! applies only events whose epoch equals the current adapter's; `release()`
//! clears the current epoch so late events from a dead adapter are dropped.
//!
//! # Optimistic play flag
//!
//! `toggle_play_pause()` records the requested state as an override so the UI
//! reacts on the same frame. The override is cleared by the next accepted
//! event, whatever it says. It is never merged into `status`.

use crossbeam_channel::{Receiver, Sender, unbounded};
use log::{debug, info, trace};

use super::engine::{
    EngineAdapter, EngineEvent, EngineStatus, MediaEngine, OpenError, StatusSink, VideoFrame,
};
use super::speed::{self, SpeedTable};

/// Canonical, sanitized playback snapshot. Replaced wholesale per event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackStatus {
    pub is_loaded: bool,
    pub is_playing: bool,
    pub position_ms: u64,
    /// None until the engine knows it
    pub duration_ms: Option<u64>,
    pub rate: f64,
}

impl Default for PlaybackStatus {
    fn default() -> Self {
        Self {
            is_loaded: false,
            is_playing: false,
            position_ms: 0,
            duration_ms: None,
            rate: 1.0,
        }
    }
}

impl PlaybackStatus {
    /// Clamp a raw engine status. `fallback_rate` is kept when the engine
    /// reports no rate or a nonsensical one.
    pub fn from_raw(raw: &EngineStatus, fallback_rate: f64) -> Self {
        let duration_ms = raw.duration_ms.filter(|d| *d >= 0).map(|d| d as u64);
        let mut position_ms = raw.position_ms.max(0) as u64;
        if let Some(duration) = duration_ms {
            position_ms = position_ms.min(duration);
        }
        let rate = raw
            .rate
            .filter(|r| r.is_finite() && *r > 0.0)
            .unwrap_or(fallback_rate);

        Self {
            is_loaded: raw.is_loaded,
            is_playing: raw.is_playing,
            position_ms,
            duration_ms,
            rate,
        }
    }

    /// Position / duration in [0, 1]; 0 while duration is unknown or zero
    pub fn progress(&self) -> f64 {
        match self.duration_ms {
            Some(duration) if duration > 0 => {
                (self.position_ms as f64 / duration as f64).clamp(0.0, 1.0)
            }
            _ => 0.0,
        }
    }
}

/// Errors from session operations.
///
/// Only `Load` is meant for the user; `NotLoaded` is swallowed by the control surface.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    Load(OpenError),
    NotLoaded,
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::Load(e) => write!(f, "Load failed: {}", e),
            SessionError::NotLoaded => write!(f, "No media loaded"),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Load(e) => Some(e),
            SessionError::NotLoaded => None,
        }
    }
}

impl From<OpenError> for SessionError {
    fn from(e: OpenError) -> Self {
        SessionError::Load(e)
    }
}

/// Single playback session (one per player surface)
pub struct PlaybackSession<E: MediaEngine> {
    engine: E,
    adapter: Option<E::Adapter>,

    media_ref: Option<String>,
    file_name: String,
    status: PlaybackStatus,
    /// Requested play state not yet confirmed by the engine
    playing_override: Option<bool>,

    speed: SpeedTable,
    speed_index: usize,

    /// Last epoch handed out (monotonic)
    epoch_counter: u64,
    /// Epoch of the live adapter, None when empty
    current_epoch: Option<u64>,
    events_tx: Sender<EngineEvent>,
    events_rx: Receiver<EngineEvent>,
}

impl<E: MediaEngine> PlaybackSession<E> {
    /// Create an empty session (nothing loaded)
    pub fn new(engine: E, speed: SpeedTable) -> Self {
        let (events_tx, events_rx) = unbounded();
        let speed_index = speed.normal_index();
        Self {
            engine,
            adapter: None,
            media_ref: None,
            file_name: String::new(),
            status: PlaybackStatus::default(),
            playing_override: None,
            speed,
            speed_index,
            epoch_counter: 0,
            current_epoch: None,
            events_tx,
            events_rx,
        }
    }

    // === Read-only views ===

    pub fn status(&self) -> &PlaybackStatus {
        &self.status
    }

    pub fn media_ref(&self) -> Option<&str> {
        self.media_ref.as_deref()
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Check if an adapter is live
    pub fn has_media(&self) -> bool {
        self.adapter.is_some()
    }

    /// Play state the UI should show: pending request first, engine state otherwise
    pub fn effective_is_playing(&self) -> bool {
        self.playing_override.unwrap_or(self.status.is_playing)
    }

    /// Check if a play/pause request awaits confirmation
    pub fn has_pending_toggle(&self) -> bool {
        self.playing_override.is_some()
    }

    pub fn progress(&self) -> f64 {
        self.status.progress()
    }

    pub fn speed_index(&self) -> usize {
        self.speed_index
    }

    pub fn speed_label(&self) -> String {
        self.speed.label(self.speed_index)
    }

    pub fn current_epoch(&self) -> Option<u64> {
        self.current_epoch
    }

    /// Newest picture from the live adapter, if it decoded one since the last call.
    pub fn take_video_frame(&mut self) -> Option<VideoFrame> {
        self.adapter.as_mut().and_then(|adapter| adapter.take_frame())
    }

    // === Lifecycle ===

    /// Load a source, naming it after the last path segment.
    pub fn load(&mut self, source: &str) -> Result<(), SessionError> {
        let name = crate::utils::display_name(source);
        self.load_named(source, &name)
    }

    /// Replace the current media with `source`.
    ///
    /// A probe failure leaves the session untouched (old adapter keeps
    /// playing). Otherwise the old adapter is dropped before the new one
    /// starts, so two adapters never coexist.
    pub fn load_named(&mut self, source: &str, name: &str) -> Result<(), SessionError> {
        let probe = self.engine.probe(source).map_err(|e| {
            debug!("Probe failed for {}: {}", source, e);
            SessionError::from(e)
        })?;

        self.release();

        self.epoch_counter += 1;
        let epoch = self.epoch_counter;
        let sink = StatusSink::new(epoch, self.events_tx.clone());
        let mut adapter = self.engine.start(probe, sink)?;

        let normal = self.speed.normal_index();
        let rate = self.speed.rate(normal);
        if rate != 1.0 {
            adapter.set_rate(rate);
        }

        self.adapter = Some(adapter);
        self.current_epoch = Some(epoch);
        self.media_ref = Some(source.to_string());
        self.file_name = name.to_string();
        self.status = PlaybackStatus {
            rate,
            ..PlaybackStatus::default()
        };
        self.playing_override = None;
        self.speed_index = normal;

        info!("Loaded {} (epoch {})", source, epoch);
        Ok(())
    }

    /// Drop the adapter and reset to empty. Safe to call repeatedly.
    pub fn release(&mut self) {
        if let Some(adapter) = self.adapter.take() {
            drop(adapter);
            info!(
                "Released {} (epoch {:?})",
                self.media_ref.as_deref().unwrap_or("<unnamed>"),
                self.current_epoch
            );
        }
        self.current_epoch = None;
        self.media_ref = None;
        self.file_name.clear();
        self.status = PlaybackStatus::default();
        self.playing_override = None;
        self.speed_index = self.speed.normal_index();
    }

    // === Controls ===

    /// Play if paused, pause if playing. Returns the requested play state.
    pub fn toggle_play_pause(&mut self) -> Result<bool, SessionError> {
        if !self.status.is_loaded {
            return Err(SessionError::NotLoaded);
        }
        let playing = self.effective_is_playing();
        let Some(adapter) = self.adapter.as_mut() else {
            return Err(SessionError::NotLoaded);
        };

        if playing {
            adapter.pause();
        } else {
            adapter.play();
        }
        self.playing_override = Some(!playing);
        debug!("TogglePlayPause: requested playing={}", !playing);
        Ok(!playing)
    }

    /// Seek relative to the last reported position. Returns the target.
    ///
    /// Target is clamped to `[0, duration]`; with unknown duration the upper
    /// bound is the current position (forward seeks wait for metadata).
    pub fn seek_by(&mut self, delta_ms: i64) -> Result<u64, SessionError> {
        if !self.status.is_loaded {
            return Err(SessionError::NotLoaded);
        }
        let Some(adapter) = self.adapter.as_mut() else {
            return Err(SessionError::NotLoaded);
        };

        let position = self.status.position_ms;
        let upper = self.status.duration_ms.unwrap_or(position);
        let target = (position as i128 + delta_ms as i128).clamp(0, upper as i128) as u64;

        adapter.seek(target);
        trace!("SeekBy {}: {} -> {}", delta_ms, position, target);
        Ok(target)
    }

    /// Advance to the next rate in the table. Returns its label.
    pub fn cycle_speed(&mut self) -> String {
        self.speed_index = speed::cycle(&self.speed, self.speed_index);
        let rate = self.speed.rate(self.speed_index);
        if let Some(adapter) = self.adapter.as_mut() {
            adapter.set_rate(rate);
        }
        let label = self.speed.label(self.speed_index);
        debug!("Speed -> {}", label);
        label
    }

    // === Engine events ===

    /// Apply one engine event. Returns true if the visible state changed.
    pub fn on_engine_event(&mut self, event: EngineEvent) -> bool {
        if self.current_epoch != Some(event.epoch) {
            trace!(
                "Discarding stale status (epoch {}, current {:?})",
                event.epoch, self.current_epoch
            );
            return false;
        }

        let next = PlaybackStatus::from_raw(&event.status, self.status.rate);
        let had_override = self.playing_override.take().is_some();
        let changed = had_override || next != self.status;
        if next.is_loaded != self.status.is_loaded || next.is_playing != self.status.is_playing {
            debug!(
                "Status: loaded={} playing={} pos={}ms dur={:?}",
                next.is_loaded, next.is_playing, next.position_ms, next.duration_ms
            );
        }
        self.status = next;
        changed
    }

    /// Drain the status channel in arrival order. Returns true if anything changed.
    pub fn pump(&mut self) -> bool {
        let mut changed = false;
        while let Ok(event) = self.events_rx.try_recv() {
            changed |= self.on_engine_event(event);
        }
        changed
    }
}

impl<E: MediaEngine> Drop for PlaybackSession<E> {
    fn drop(&mut self) {
        self.release();
    }
}
