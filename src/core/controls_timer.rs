//! Controls visibility timer - hides the transport overlay after inactivity.
//!
//! Debounce semantics: every interaction replaces the pending deadline, so a
//! burst of pointer moves ends in exactly one hide, `threshold` after the last
//! move. While paused nothing is scheduled and the overlay stays up.
//!
//! Polled, not callback-driven: the UI loop calls `tick()` each frame and asks
//! `next_deadline()` how long it may sleep.
//!
//! # Usage
//! ```ignore
//! // On pointer move / key press:
//! timer.force_show();
//!
//! // On play state change:
//! timer.on_playback_state_changed(session.effective_is_playing());
//!
//! // In update loop:
//! if timer.tick() {
//!     ctx.request_repaint();
//! }
//! ```

use std::time::{Duration, Instant};

/// Default idle threshold before controls hide
pub const DEFAULT_HIDE_DELAY_MS: u64 = 3000;

#[derive(Debug, Clone)]
pub struct ControlsVisibilityTimer {
    /// Idle time before hide
    threshold: Duration,
    visible: bool,
    /// Last known play state (only playing media auto-hides)
    playing: bool,
    /// At most one pending hide
    hide_at: Option<Instant>,
}

impl Default for ControlsVisibilityTimer {
    fn default() -> Self {
        Self::new(DEFAULT_HIDE_DELAY_MS)
    }
}

impl ControlsVisibilityTimer {
    pub fn new(threshold_ms: u64) -> Self {
        Self {
            threshold: Duration::from_millis(threshold_ms),
            visible: true,
            playing: false,
            hide_at: None,
        }
    }

    pub fn threshold_ms(&self) -> u64 {
        self.threshold.as_millis() as u64
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Check if a hide is scheduled
    pub fn is_pending(&self) -> bool {
        self.hide_at.is_some()
    }

    /// When the pending hide fires (for repaint scheduling)
    pub fn next_deadline(&self) -> Option<Instant> {
        self.hide_at
    }

    pub fn touch(&mut self) {
        self.touch_at(Instant::now());
    }

    /// Cancel pending hide; reschedule only while playing.
    pub fn touch_at(&mut self, now: Instant) {
        self.hide_at = None;
        if self.playing {
            self.hide_at = Some(now + self.threshold);
            log::trace!(
                "ControlsTimer: hide scheduled in {}ms",
                self.threshold.as_millis()
            );
        }
    }

    pub fn force_show(&mut self) {
        self.force_show_at(Instant::now());
    }

    /// Any interaction: show now, restart the countdown
    pub fn force_show_at(&mut self, now: Instant) {
        if !self.visible {
            log::trace!("ControlsTimer: shown");
        }
        self.visible = true;
        self.touch_at(now);
    }

    pub fn on_playback_state_changed(&mut self, is_playing: bool) {
        self.on_playback_state_changed_at(is_playing, Instant::now());
    }

    /// Pause keeps controls up; play starts the countdown.
    pub fn on_playback_state_changed_at(&mut self, is_playing: bool, now: Instant) {
        self.playing = is_playing;
        if is_playing {
            self.touch_at(now);
        } else {
            if self.hide_at.take().is_some() {
                log::trace!("ControlsTimer: cancelled pending hide (paused)");
            }
            self.visible = true;
        }
    }

    pub fn tick(&mut self) -> bool {
        self.tick_at(Instant::now())
    }

    /// Fire the pending hide if due. Returns true exactly once per scheduled hide.
    pub fn tick_at(&mut self, now: Instant) -> bool {
        let Some(hide_at) = self.hide_at else {
            return false;
        };
        if now >= hide_at {
            self.hide_at = None;
            self.visible = false;
            log::trace!("ControlsTimer: hidden after idle");
            true
        } else {
            false
        }
    }
}
