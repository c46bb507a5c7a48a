//! Player shell: session + controls timer + library, driven by UI events.
//!
//! The UI never mutates core state directly. Widgets emit events onto the
//! [`EventBus`]; once per frame the front end calls [`Shell::handle_events`]
//! and then [`Shell::update`], and renders from read-only snapshots.
//!
//! Every control event, pointer activity included, reveals the overlay and
//! restarts its countdown. Status updates from the engine never do.

use std::time::{Duration, Instant};

use log::{debug, info, trace, warn};
use uuid::Uuid;

use crate::config::PlayerSettings;
use crate::core::controls_timer::ControlsVisibilityTimer;
use crate::core::engine::MediaEngine;
use crate::core::event_bus::{BoxedEvent, EventBus, EventEmitter, downcast_event};
use crate::core::library_events::*;
use crate::core::player_events::*;
use crate::core::session::{PlaybackSession, SessionError};
use crate::entities::catalog::LibraryCatalog;
use crate::entities::media::PickedFile;

/// Deferred actions the front end has to carry out
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventResult {
    pub show_open_dialog: bool,
    /// New fullscreen state to apply through viewport commands
    pub fullscreen_changed: Option<bool>,
}

impl EventResult {
    pub fn merge(&mut self, other: EventResult) {
        self.show_open_dialog |= other.show_open_dialog;
        if other.fullscreen_changed.is_some() {
            self.fullscreen_changed = other.fullscreen_changed;
        }
    }
}

pub struct Shell<E: MediaEngine> {
    pub session: PlaybackSession<E>,
    pub controls: ControlsVisibilityTimer,
    pub catalog: LibraryCatalog,
    pub event_bus: EventBus,
    pub error_msg: Option<String>,
    seek_step_ms: i64,
    autoplay: bool,
    /// Play once the freshly loaded source reports ready
    autoplay_pending: bool,
    is_fullscreen: bool,
    /// Library entry currently in the session
    now_playing: Option<Uuid>,
}

impl<E: MediaEngine> Shell<E> {
    pub fn new(engine: E, settings: &PlayerSettings) -> Self {
        Self {
            session: PlaybackSession::new(engine, settings.speed_table()),
            controls: ControlsVisibilityTimer::new(settings.controls_hide_ms),
            catalog: LibraryCatalog::new(),
            event_bus: EventBus::new(),
            error_msg: None,
            seek_step_ms: settings.seek_step_ms.min(i64::MAX as u64) as i64,
            autoplay: settings.autoplay,
            autoplay_pending: false,
            is_fullscreen: settings.start_fullscreen,
            now_playing: None,
        }
    }

    pub fn emitter(&self) -> EventEmitter {
        self.event_bus.emitter()
    }

    pub fn is_fullscreen(&self) -> bool {
        self.is_fullscreen
    }

    pub fn now_playing(&self) -> Option<Uuid> {
        self.now_playing
    }

    pub fn seek_step_ms(&self) -> i64 {
        self.seek_step_ms
    }

    pub fn set_autoplay(&mut self, autoplay: bool) {
        self.autoplay = autoplay;
    }

    // === Library ===

    /// Append files to the library. Returns their ids in input order.
    pub fn add_files(&mut self, files: Vec<PickedFile>) -> Vec<Uuid> {
        self.catalog.add(files)
    }

    /// Load a file and add it to the library once it opened.
    /// Returns its library id, None if the open failed.
    pub fn open_file(&mut self, file: PickedFile, now: Instant) -> Option<Uuid> {
        if !self.load_source(&file.uri, &file.name, now) {
            return None;
        }
        let id = self.catalog.add([file])[0];
        self.now_playing = Some(id);
        Some(id)
    }

    /// Load a library entry into the session.
    pub fn load_entry(&mut self, id: Uuid, now: Instant) -> bool {
        let Some(entry) = self.catalog.get(id) else {
            warn!("PlayEntry: {} not in library", id);
            return false;
        };
        let (uri, name) = (entry.uri.clone(), entry.name.clone());
        if !self.load_source(&uri, &name, now) {
            return false;
        }
        self.now_playing = Some(id);
        true
    }

    /// Failure is reported through `error_msg`. A failed probe keeps the
    /// previous media playing; a failed start leaves the session empty.
    fn load_source(&mut self, uri: &str, name: &str, now: Instant) -> bool {
        match self.session.load_named(uri, name) {
            Ok(()) => {
                self.error_msg = None;
                self.now_playing = None;
                self.autoplay_pending = self.autoplay;
                self.controls.force_show_at(now);
                self.sync_controls(now);
                true
            }
            Err(e) => {
                warn!("Failed to open {}: {}", uri, e);
                self.error_msg = Some(format!("Cannot open {}: {}", name, e));
                if !self.session.has_media() {
                    self.now_playing = None;
                    self.autoplay_pending = false;
                    self.sync_controls(now);
                }
                false
            }
        }
    }

    pub fn dismiss_error(&mut self) {
        self.error_msg = None;
    }

    // === Event dispatch ===

    /// Drain the bus and apply every event in emit order.
    pub fn handle_events(&mut self, now: Instant) -> EventResult {
        let mut merged = EventResult::default();
        for event in self.event_bus.poll() {
            match self.handle_event(&event, now) {
                Some(r) => merged.merge(r),
                None => trace!("Unhandled event: {}", (*event).type_name()),
            }
        }
        self.sync_controls(now);
        merged
    }

    /// Handle a single event. Returns Some(result) if the event was handled.
    pub fn handle_event(&mut self, event: &BoxedEvent, now: Instant) -> Option<EventResult> {
        let mut result = EventResult::default();

        // === Playback Control ===
        if downcast_event::<TogglePlayPauseEvent>(event).is_some() {
            self.controls.force_show_at(now);
            ignore_not_loaded(self.session.toggle_play_pause());
            self.sync_controls(now);
            return Some(result);
        }
        if let Some(e) = downcast_event::<SeekByEvent>(event) {
            self.controls.force_show_at(now);
            ignore_not_loaded(self.session.seek_by(e.0));
            return Some(result);
        }
        if downcast_event::<SeekForwardEvent>(event).is_some() {
            self.controls.force_show_at(now);
            ignore_not_loaded(self.session.seek_by(self.seek_step_ms));
            return Some(result);
        }
        if downcast_event::<SeekBackwardEvent>(event).is_some() {
            self.controls.force_show_at(now);
            ignore_not_loaded(self.session.seek_by(-self.seek_step_ms));
            return Some(result);
        }
        if downcast_event::<CycleSpeedEvent>(event).is_some() {
            self.controls.force_show_at(now);
            self.session.cycle_speed();
            return Some(result);
        }
        if downcast_event::<UnloadEvent>(event).is_some() {
            self.session.release();
            self.now_playing = None;
            self.autoplay_pending = false;
            self.sync_controls(now);
            return Some(result);
        }

        // === Controls overlay ===
        if downcast_event::<PointerActivityEvent>(event).is_some() {
            self.controls.force_show_at(now);
            return Some(result);
        }
        if downcast_event::<ToggleFullscreenEvent>(event).is_some() {
            self.controls.force_show_at(now);
            self.is_fullscreen = !self.is_fullscreen;
            debug!("Fullscreen: {}", self.is_fullscreen);
            result.fullscreen_changed = Some(self.is_fullscreen);
            return Some(result);
        }
        if downcast_event::<ExitFullscreenEvent>(event).is_some() {
            if self.is_fullscreen {
                self.is_fullscreen = false;
                result.fullscreen_changed = Some(false);
            }
            return Some(result);
        }

        // === Dialogs / notices ===
        if downcast_event::<ShowOpenDialogEvent>(event).is_some() {
            result.show_open_dialog = true;
            return Some(result);
        }
        if downcast_event::<DismissErrorEvent>(event).is_some() {
            self.dismiss_error();
            return Some(result);
        }

        // === Library ===
        if let Some(e) = downcast_event::<AddFilesEvent>(event) {
            self.add_files(e.0.clone());
            return Some(result);
        }
        if let Some(e) = downcast_event::<OpenFileEvent>(event) {
            self.open_file(e.0.clone(), now);
            return Some(result);
        }
        if let Some(e) = downcast_event::<PlayEntryEvent>(event) {
            self.load_entry(e.0, now);
            return Some(result);
        }
        if let Some(e) = downcast_event::<RemoveEntryEvent>(event) {
            // Playback is not tied to the library: removing the playing entry keeps it playing
            if self.catalog.remove(e.0).is_some() && self.now_playing == Some(e.0) {
                self.now_playing = None;
            }
            return Some(result);
        }

        None
    }

    // === Frame update ===

    /// Apply engine status, run autoplay, fire a due hide.
    /// Returns true if anything visible changed.
    pub fn update(&mut self, now: Instant) -> bool {
        let mut changed = self.session.pump();

        if self.autoplay_pending && self.session.status().is_loaded {
            self.autoplay_pending = false;
            if !self.session.effective_is_playing() {
                info!("Autoplay: {}", self.session.file_name());
                ignore_not_loaded(self.session.toggle_play_pause());
                changed = true;
            }
        }

        self.sync_controls(now);
        changed | self.controls.tick_at(now)
    }

    /// How long the front end may sleep before the next hide is due
    pub fn next_wakeup(&self, now: Instant) -> Option<Duration> {
        self.controls
            .next_deadline()
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    /// Forward play-state transitions to the timer. Periodic position updates
    /// do not count as activity.
    fn sync_controls(&mut self, now: Instant) {
        let playing = self.session.effective_is_playing();
        if playing != self.controls.is_playing() {
            self.controls.on_playback_state_changed_at(playing, now);
        }
    }
}

/// NotLoaded is expected from the control surface and means "do nothing".
fn ignore_not_loaded<T>(result: Result<T, SessionError>) {
    match result {
        Ok(_) => {}
        Err(SessionError::NotLoaded) => trace!("Control ignored: nothing loaded"),
        Err(e) => warn!("Control failed: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::engine::testing::{Command, ScriptedEngine};

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn shell(engine: &ScriptedEngine) -> Shell<ScriptedEngine> {
        Shell::new(engine.clone(), &PlayerSettings::default())
    }

    fn video(name: &str) -> PickedFile {
        PickedFile::new(name, name, "video/mp4", 100)
    }

    /// Open a file and let the engine confirm it
    fn loaded(engine: &ScriptedEngine, t0: Instant) -> Shell<ScriptedEngine> {
        let mut shell = shell(engine);
        shell.open_file(video("a.mp4"), t0);
        shell.update(t0);
        engine.clear_commands();
        shell
    }

    #[test]
    fn test_controls_on_unloaded_do_nothing() {
        let engine = ScriptedEngine::new(Some(60_000));
        let mut shell = shell(&engine);
        let t0 = Instant::now();

        shell.event_bus.emit(TogglePlayPauseEvent);
        shell.event_bus.emit(SeekForwardEvent);
        shell.handle_events(t0);

        assert!(engine.commands().is_empty());
        assert!(shell.error_msg.is_none());
        assert!(!shell.session.effective_is_playing());
    }

    #[test]
    fn test_open_file_adds_and_loads() {
        let engine = ScriptedEngine::new(Some(60_000));
        let mut shell = shell(&engine);
        let t0 = Instant::now();

        shell.emitter().emit(OpenFileEvent(video("a.mp4")));
        shell.handle_events(t0);
        assert_eq!(shell.catalog.len(), 1);
        assert_eq!(shell.session.file_name(), "a.mp4");
        assert_eq!(shell.now_playing(), shell.catalog.iter().next().map(|e| e.id));

        assert!(shell.update(t0));
        assert!(shell.session.status().is_loaded);
    }

    #[test]
    fn test_failed_open_sets_dismissible_error() {
        let engine = ScriptedEngine::new(Some(60_000)).failing("missing.mp4");
        let t0 = Instant::now();
        let mut shell = loaded(&engine, t0);

        let playing = shell.now_playing();
        shell.event_bus.emit(OpenFileEvent(video("missing.mp4")));
        shell.handle_events(t0);

        let msg = shell.error_msg.clone().unwrap();
        assert!(msg.contains("missing.mp4"), "{}", msg);
        // Previous media untouched, nothing unplayable added to the library
        assert_eq!(shell.session.file_name(), "a.mp4");
        assert!(shell.session.status().is_loaded);
        assert_eq!(shell.now_playing(), playing);
        assert_eq!(shell.catalog.len(), 1);
        assert_eq!(shell.open_file(video("missing.mp4"), t0), None);
        assert_eq!(shell.catalog.len(), 1);

        shell.event_bus.emit(DismissErrorEvent);
        shell.handle_events(t0);
        assert!(shell.error_msg.is_none());
    }

    #[test]
    fn test_start_failure_clears_now_playing() {
        let engine = ScriptedEngine::new(Some(60_000)).failing_start("b.mp4");
        let settings = PlayerSettings {
            autoplay: true,
            ..Default::default()
        };
        let mut shell = Shell::new(engine.clone(), &settings);
        let t0 = Instant::now();
        let id_a = shell.open_file(video("a.mp4"), t0);
        assert!(id_a.is_some());
        assert!(shell.autoplay_pending);
        let id_b = shell.add_files(vec![video("b.mp4")])[0];

        shell.event_bus.emit(PlayEntryEvent(id_b));
        shell.handle_events(t0);

        assert!(shell.error_msg.as_deref().is_some_and(|m| m.contains("b.mp4")));
        assert!(!shell.session.has_media());
        assert_eq!(shell.session.current_epoch(), None);
        assert_eq!(engine.live_adapters(), 0);
        assert_eq!(shell.now_playing(), None);
        assert!(!shell.autoplay_pending);
        // Both entries stay in the library
        assert_eq!(shell.catalog.len(), 2);

        // Controls stay usable and inert
        shell.update(t0);
        shell.event_bus.emit(TogglePlayPauseEvent);
        shell.handle_events(t0);
        assert!(!engine.commands().contains(&Command::Play));
        assert!(shell.controls.is_visible());
    }

    #[test]
    fn test_foreign_event_is_left_unhandled() {
        #[derive(Clone)]
        struct Unrelated;

        let engine = ScriptedEngine::new(None);
        let mut shell = shell(&engine);
        let t0 = Instant::now();

        shell.event_bus.emit(Unrelated);
        assert!(shell.handle_event(&(Box::new(Unrelated) as BoxedEvent), t0).is_none());
        assert_eq!(shell.handle_events(t0), EventResult::default());
        assert!(shell.event_bus.poll().is_empty());
    }

    #[test]
    fn test_play_hides_controls_after_idle() {
        let engine = ScriptedEngine::new(Some(60_000));
        let t0 = Instant::now();
        let mut shell = loaded(&engine, t0);

        shell.event_bus.emit(TogglePlayPauseEvent);
        shell.handle_events(t0);
        assert!(shell.controls.is_visible());
        assert_eq!(shell.next_wakeup(t0), Some(ms(3000)));

        // Engine confirmation is not activity
        shell.update(t0 + ms(1000));
        assert!(shell.session.status().is_playing);
        assert!(shell.controls.is_visible());

        assert!(shell.update(t0 + ms(3000)));
        assert!(!shell.controls.is_visible());
    }

    #[test]
    fn test_pointer_activity_restarts_countdown() {
        let engine = ScriptedEngine::new(Some(60_000));
        let t0 = Instant::now();
        let mut shell = loaded(&engine, t0);
        shell.event_bus.emit(TogglePlayPauseEvent);
        shell.handle_events(t0);
        shell.update(t0);

        shell.event_bus.emit(PointerActivityEvent);
        shell.handle_events(t0 + ms(2000));
        shell.update(t0 + ms(4000));
        assert!(shell.controls.is_visible());
        shell.update(t0 + ms(5000));
        assert!(!shell.controls.is_visible());

        // Activity while hidden reveals again
        shell.event_bus.emit(PointerActivityEvent);
        shell.handle_events(t0 + ms(6000));
        assert!(shell.controls.is_visible());
    }

    #[test]
    fn test_pause_keeps_controls_visible() {
        let engine = ScriptedEngine::new(Some(60_000));
        let t0 = Instant::now();
        let mut shell = loaded(&engine, t0);
        shell.event_bus.emit(TogglePlayPauseEvent);
        shell.handle_events(t0);
        shell.update(t0 + ms(3000));
        assert!(!shell.controls.is_visible());

        shell.event_bus.emit(TogglePlayPauseEvent);
        shell.handle_events(t0 + ms(4000));
        assert!(shell.controls.is_visible());
        shell.update(t0 + ms(60_000));
        assert!(shell.controls.is_visible());
        assert_eq!(shell.next_wakeup(t0), None);
    }

    #[test]
    fn test_seek_step_events() {
        let engine = ScriptedEngine::new(Some(60_000));
        let t0 = Instant::now();
        let mut shell = loaded(&engine, t0);

        shell.event_bus.emit(SeekForwardEvent);
        shell.handle_events(t0);
        shell.update(t0);
        shell.event_bus.emit(SeekBackwardEvent);
        shell.event_bus.emit(SeekBackwardEvent);
        shell.handle_events(t0);

        // Both backward seeks are computed from the last confirmed position
        assert_eq!(
            engine.commands(),
            vec![Command::Seek(10_000), Command::Seek(0), Command::Seek(0)]
        );
    }

    #[test]
    fn test_cycle_speed_event() {
        let engine = ScriptedEngine::new(Some(60_000));
        let t0 = Instant::now();
        let mut shell = loaded(&engine, t0);
        shell.event_bus.emit(CycleSpeedEvent);
        shell.handle_events(t0);
        assert_eq!(shell.session.speed_label(), "1.25x");
        assert_eq!(engine.commands(), vec![Command::SetRate(1.25)]);
    }

    #[test]
    fn test_autoplay_after_loaded_event() {
        let engine = ScriptedEngine::new(Some(60_000));
        let settings = PlayerSettings {
            autoplay: true,
            ..Default::default()
        };
        let mut shell = Shell::new(engine.clone(), &settings);
        let t0 = Instant::now();

        shell.open_file(video("a.mp4"), t0);
        assert!(!engine.commands().contains(&Command::Play));

        shell.update(t0);
        assert!(shell.session.effective_is_playing());
        assert_eq!(engine.commands().last(), Some(&Command::Play));

        // Only once per load
        shell.update(t0);
        assert_eq!(engine.commands().iter().filter(|c| **c == Command::Play).count(), 1);
    }

    #[test]
    fn test_fullscreen_toggle() {
        let engine = ScriptedEngine::new(None);
        let mut shell = shell(&engine);
        let t0 = Instant::now();

        shell.event_bus.emit(ToggleFullscreenEvent);
        assert_eq!(shell.handle_events(t0).fullscreen_changed, Some(true));
        assert!(shell.is_fullscreen());

        shell.event_bus.emit(ExitFullscreenEvent);
        assert_eq!(shell.handle_events(t0).fullscreen_changed, Some(false));

        // Already windowed: nothing to apply
        shell.event_bus.emit(ExitFullscreenEvent);
        assert_eq!(shell.handle_events(t0).fullscreen_changed, None);
    }

    #[test]
    fn test_library_events() {
        let engine = ScriptedEngine::new(Some(1000));
        let mut shell = shell(&engine);
        let t0 = Instant::now();

        shell.event_bus.emit(AddFilesEvent(vec![
            video("a.mp4"),
            PickedFile::new("b.mp3", "b.mp3", "audio/mpeg", 5),
        ]));
        shell.handle_events(t0);
        assert_eq!(shell.catalog.len(), 2);
        assert!(!shell.session.has_media());

        let id_b = shell.catalog.iter().nth(1).map(|e| e.id).unwrap();
        shell.event_bus.emit(PlayEntryEvent(id_b));
        shell.handle_events(t0);
        assert_eq!(shell.session.media_ref(), Some("b.mp3"));
        assert_eq!(shell.now_playing(), Some(id_b));

        shell.event_bus.emit(RemoveEntryEvent(id_b));
        shell.handle_events(t0);
        assert_eq!(shell.catalog.len(), 1);
        assert_eq!(shell.now_playing(), None);
        assert!(shell.session.has_media());
    }

    #[test]
    fn test_unload_releases_adapter() {
        let engine = ScriptedEngine::new(Some(1000));
        let t0 = Instant::now();
        let mut shell = loaded(&engine, t0);

        shell.event_bus.emit(UnloadEvent);
        shell.handle_events(t0);
        assert!(!shell.session.has_media());
        assert_eq!(engine.live_adapters(), 0);
    }

    #[test]
    fn test_open_dialog_request() {
        let engine = ScriptedEngine::new(None);
        let mut shell = shell(&engine);
        shell.event_bus.emit(ShowOpenDialogEvent);
        assert!(shell.handle_events(Instant::now()).show_open_dialog);
    }
}
